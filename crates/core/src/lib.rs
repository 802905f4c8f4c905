// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![forbid(unsafe_code)]

//! warden-core: shared domain types for the warden daemon supervisor.
//!
//! Everything a payload application and the supervisor need to agree on
//! lives here: process realms, supervisor options, per-worker launch
//! configuration, and the run-outcome / exit-code contract.

pub mod exit;
pub mod options;
pub mod realm;
pub mod worker;

pub use exit::{ExitAggregate, ExitPolicy, RunOutcome};
pub use options::{LogLevel, Mode, Options, OptionsError};
pub use realm::Realm;
pub use worker::{Admission, WorkerConfig};
