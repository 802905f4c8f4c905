// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tracing initialization.
//!
//! One stderr subscriber serves every realm: the console logs to the
//! invoker's terminal, and the daemon realm's stderr is pointed at the
//! log file during the fork (see `forker::detach_stdio`), so the same
//! writer lands in the sink after detachment.

use tracing_subscriber::EnvFilter;

use warden_core::Options;

use crate::env;

/// Install the global subscriber. Level comes from the `loglevel`
/// option, overridable with `WARDEN_LOG` (EnvFilter syntax). Safe to
/// call more than once; later calls are no-ops.
pub fn init(options: &Options) {
    let filter = match env::log_filter() {
        Some(directive) => EnvFilter::new(directive),
        None => EnvFilter::new(options.loglevel.as_filter()),
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
