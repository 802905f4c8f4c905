// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! PID-file lock with stale-lock recovery.
//!
//! The lock is the recorded PID, not an fd lock: a lock is held iff the
//! file exists and the PID inside refers to a live process that is not
//! the caller. A stale lock (dead PID) is removed the moment it is
//! observed. Filesystem errors are logged and non-fatal; the caller
//! treats a failed acquisition as "already running".

use std::fs;
use std::io::ErrorKind;
use std::os::unix::fs::DirBuilderExt;
use std::path::{Path, PathBuf};

use nix::errno::Errno;
use nix::sys::signal::kill;
use nix::unistd::Pid;
use tracing::{debug, warn};

use warden_core::Options;

use crate::env;

/// Lock directory creation mode.
const LOCK_DIR_MODE: u32 = 0o744;

/// Resolve the PID file path: explicit `pidfile` option, else
/// `<run_dir>/<appname-lowercase>.pid`.
pub fn pidfile_path(options: &Options) -> PathBuf {
    match &options.pidfile {
        Some(path) => path.clone(),
        None => env::run_dir().join(format!("{}.pid", options.appname.to_lowercase())),
    }
}

/// True when the PID refers to a live process.
///
/// Zero-signal probe: success or EPERM means alive, ESRCH means dead.
pub fn pid_alive(pid: Pid) -> bool {
    match kill(pid, None) {
        Ok(()) => true,
        Err(Errno::EPERM) => true,
        Err(_) => false,
    }
}

/// A PID file at a fixed path.
#[derive(Debug, Clone)]
pub struct PidLock {
    path: PathBuf,
}

impl PidLock {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Acquire the lock for `pid` (the caller's own PID when `None`).
    ///
    /// Succeeds iff no non-stale lock exists. Creates the lock directory
    /// (mode 0744) when missing.
    pub fn acquire(&self, pid: Option<Pid>) -> bool {
        if self.is_held() {
            return false;
        }
        let pid = pid.unwrap_or_else(Pid::this);

        if let Some(parent) = self.path.parent() {
            if !parent.exists() {
                let mut builder = fs::DirBuilder::new();
                builder.recursive(true).mode(LOCK_DIR_MODE);
                if let Err(err) = builder.create(parent) {
                    warn!(dir = %parent.display(), "failed to create lock directory: {err}");
                    return false;
                }
            }
        }

        match fs::write(&self.path, format!("{pid}\n")) {
            Ok(()) => {
                debug!(pidfile = %self.path.display(), %pid, "lock acquired");
                true
            }
            Err(err) => {
                warn!(pidfile = %self.path.display(), "failed to write lock: {err}");
                false
            }
        }
    }

    /// Remove the lock file. Idempotent.
    pub fn release(&self) {
        match fs::remove_file(&self.path) {
            Ok(()) => debug!(pidfile = %self.path.display(), "lock released"),
            Err(err) if err.kind() == ErrorKind::NotFound => {}
            Err(err) => warn!(pidfile = %self.path.display(), "failed to remove lock: {err}"),
        }
    }

    /// The recorded PID, without any staleness check.
    pub fn holder(&self) -> Option<Pid> {
        let content = fs::read_to_string(&self.path).ok()?;
        let pid: i32 = content.split_whitespace().next()?.parse().ok()?;
        Some(Pid::from_raw(pid))
    }

    /// Is the lock held by another live process?
    ///
    /// False when the file is absent, records the caller's own PID, or
    /// records a dead PID. A stale lock is released before returning
    /// (recover-on-check).
    pub fn is_held(&self) -> bool {
        let Some(pid) = self.holder() else {
            return false;
        };
        if pid == Pid::this() {
            return false;
        }
        if pid_alive(pid) {
            return true;
        }
        debug!(pidfile = %self.path.display(), %pid, "recovering stale lock");
        self.release();
        false
    }
}

#[cfg(test)]
#[path = "lock_tests.rs"]
mod tests;
