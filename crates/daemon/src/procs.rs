// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process-control seam between the supervisor loop and the OS.
//!
//! The supervisor is generic over this trait so the fleet loop's
//! admission, reaping, and teardown invariants are testable without
//! forking; [`UnixProcs`] is the production implementation.

use std::time::Duration;

use nix::sys::signal::{kill, Signal};
use nix::sys::wait::{waitpid, WaitPidFlag, WaitStatus};
use nix::unistd::Pid;
use tracing::debug;

use warden_core::Options;

use crate::errors::DaemonError;
use crate::forker::{self, ForkKind, Forked};
use crate::lock::PidLock;

pub trait Procs {
    /// Fork one worker. Parent gets the child PID; the child branch
    /// lands in the worker realm and must never return to the loop.
    fn fork_worker(&mut self) -> Result<Forked, DaemonError>;

    /// Non-blocking wait for any child; `(pid, exit code)` per reaped
    /// child, `None` when nothing is reapable.
    fn reap(&mut self) -> Option<(Pid, i32)>;

    /// Best-effort SIGKILL, used by force-reap.
    fn kill_worker(&mut self, pid: Pid);

    fn sleep(&mut self, duration: Duration);
}

/// Real fork/wait/kill against the host OS.
pub struct UnixProcs {
    options: Options,
    pidlock: PidLock,
}

impl UnixProcs {
    pub fn new(options: &Options, pidlock: &PidLock) -> Self {
        Self { options: options.clone(), pidlock: pidlock.clone() }
    }
}

impl Procs for UnixProcs {
    fn fork_worker(&mut self) -> Result<Forked, DaemonError> {
        forker::fork_realm(ForkKind::Fleet, false, &self.options, &self.pidlock)
    }

    fn reap(&mut self) -> Option<(Pid, i32)> {
        match waitpid(None::<Pid>, Some(WaitPidFlag::WNOHANG)) {
            Ok(WaitStatus::Exited(pid, code)) => Some((pid, code)),
            // Shell convention for signal deaths; keeps worst-case
            // aggregation monotone for crashed workers.
            Ok(WaitStatus::Signaled(pid, sig, _)) => Some((pid, 128 + sig as i32)),
            Ok(_) => None,
            Err(err) => {
                debug!("waitpid: {err}");
                None
            }
        }
    }

    fn kill_worker(&mut self, pid: Pid) {
        if let Err(err) = kill(pid, Signal::SIGKILL) {
            debug!(%pid, "kill failed: {err}");
        }
    }

    fn sleep(&mut self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

#[cfg(test)]
#[path = "procs_tests.rs"]
mod tests;
