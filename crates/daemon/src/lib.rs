// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! warden-daemon: the UNIX daemon supervisor.
//!
//! An embedding application registers a payload factory and a set of
//! [`Options`], then hands its command-line arguments to
//! [`Daemon::attach`]. The dispatcher routes the built-in lifecycle
//! commands (`start`, `stop`, `restart`, `status`) against the PID-file
//! lock; `start` detaches into a daemon that either runs the payload
//! directly (single mode) or supervises a fleet of forked workers.

pub mod dispatch;
pub mod env;
pub mod errors;
pub mod forker;
pub mod host;
pub mod lock;
pub mod logging;
pub mod payload;
pub mod procs;
pub mod signals;
pub mod supervisor;

pub use dispatch::Daemon;
pub use errors::{DaemonError, ErrorBridge, ErrorEvent, Flow, MASK_ALL};
pub use forker::ChildKind;
pub use payload::{Payload, PayloadError, PayloadFactory};
pub use signals::Sig;

// The PID type appears in hook signatures; re-export it so payloads
// don't need a direct nix dependency.
pub use nix::unistd::Pid;

pub use warden_core::{
    Admission, ExitAggregate, ExitPolicy, LogLevel, Mode, Options, Realm, RunOutcome, WorkerConfig,
};
