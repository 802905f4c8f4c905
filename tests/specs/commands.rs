// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Command dispatch specs: payload-extended CLI and usage errors.

use crate::prelude::*;

#[test]
fn payload_preflight_command_is_dispatched() {
    let app = App::new();
    app.run(&["ping"]).code(0).stdout_has("pong");
}

#[test]
fn unknown_command_is_a_usage_error() {
    let app = App::new();
    app.run(&["frobnicate"]).code(2).stderr_has("unhandled command");
}

#[test]
fn bogus_top_level_flag_is_a_usage_error() {
    let app = App::new();
    app.run(&["--bogus"]).code(2);
}

#[test]
fn no_command_prints_usage() {
    let app = App::new();
    app.run(&[]).code(2).stdout_has("Usage");
}
