// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fork wrapper: realm tagging and post-fork child setup.
//!
//! Every fork goes through [`fork_realm`]. The child re-acquires the PID
//! lock when asked (daemon split), creates a new session, applies the
//! optional group-then-user identity switch, and — for the daemon split —
//! detaches stdio from the controlling terminal. Lock or setsid failure
//! ends the child immediately with a nonzero status; a failed fork is an
//! error for the caller to treat as fatal.

use std::fs::{File, OpenOptions};
use std::os::unix::io::AsRawFd;
use std::path::PathBuf;
use std::process;

use nix::libc::{STDERR_FILENO, STDIN_FILENO, STDOUT_FILENO};
use nix::unistd::{self, ForkResult, Gid, Group, Pid, Uid, User};
use tracing::{error, info, warn};

use warden_core::{Options, Realm};

use crate::errors::DaemonError;
use crate::lock::{self, PidLock};

/// Which lifecycle split this fork performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForkKind {
    /// console → daemon
    Daemon,
    /// daemon → worker
    Fleet,
}

impl ForkKind {
    fn child_realm(self) -> Realm {
        match self {
            ForkKind::Daemon => Realm::Daemon,
            ForkKind::Fleet => Realm::Worker,
        }
    }

    fn child_kind(self) -> ChildKind {
        match self {
            ForkKind::Daemon => ChildKind::Daemon,
            ForkKind::Fleet => ChildKind::Worker,
        }
    }
}

/// Tag recorded for a child in the supervisor's child table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildKind {
    Daemon,
    Worker,
}

impl std::fmt::Display for ChildKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChildKind::Daemon => write!(f, "daemon"),
            ChildKind::Worker => write!(f, "worker"),
        }
    }
}

/// Which side of a successful fork the caller is on.
#[derive(Debug)]
pub enum Forked {
    Parent { child: Pid, kind: ChildKind },
    Child { realm: Realm },
}

/// Fork once and set up the child for its realm.
pub fn fork_realm(
    kind: ForkKind,
    relock: bool,
    options: &Options,
    pidlock: &PidLock,
) -> Result<Forked, DaemonError> {
    // SAFETY: the supervisor is single-threaded by design; the child
    // only runs async-signal-safe setup before either returning into the
    // worker branch or exiting.
    match unsafe { unistd::fork() } {
        Ok(ForkResult::Parent { child }) => Ok(Forked::Parent { child, kind: kind.child_kind() }),
        Ok(ForkResult::Child) => {
            if relock && !pidlock.acquire(None) {
                error!(pidfile = %pidlock.path().display(), "child failed to re-acquire lock");
                process::exit(1);
            }
            if let Err(err) = unistd::setsid() {
                error!("setsid failed in {} child: {err}", kind.child_realm());
                process::exit(1);
            }
            switch_identity(options);
            if kind == ForkKind::Daemon {
                if let Err(err) = detach_stdio(options) {
                    warn!("failed to detach stdio: {err}");
                }
            }
            Ok(Forked::Child { realm: kind.child_realm() })
        }
        Err(errno) => Err(DaemonError::Fork(errno)),
    }
}

/// Apply the optional group then user identity switch.
///
/// Unknown names log a warning and proceed without switching; a failed
/// switch for a known identity is logged per identity.
fn switch_identity(options: &Options) {
    if let Some(name) = &options.runasgroup {
        match resolve_group(name) {
            Some(gid) => match unistd::setegid(gid) {
                Ok(()) => info!(group = %name, "switched effective group"),
                Err(err) => warn!(group = %name, "setegid failed: {err}"),
            },
            None => warn!(group = %name, "unknown group, not switching"),
        }
    }
    if let Some(name) = &options.runasuser {
        match resolve_user(name) {
            Some(uid) => match unistd::seteuid(uid) {
                Ok(()) => info!(user = %name, "switched effective user"),
                Err(err) => warn!(user = %name, "seteuid failed: {err}"),
            },
            None => warn!(user = %name, "unknown user, not switching"),
        }
    }
}

fn resolve_group(name: &str) -> Option<Gid> {
    Group::from_name(name).ok().flatten().map(|g| g.gid)
}

fn resolve_user(name: &str) -> Option<Uid> {
    User::from_name(name).ok().flatten().map(|u| u.uid)
}

/// Default daemon log sink: `<appdir>/<appname>.log`, or next to an
/// explicit pidfile when no appdir is set.
pub fn log_path(options: &Options) -> PathBuf {
    match &options.appdir {
        Some(dir) => dir.join(format!("{}.log", options.appname.to_lowercase())),
        None => lock::pidfile_path(options).with_extension("log"),
    }
}

/// Point stdin at /dev/null and stdout/stderr at the daemon log file.
/// After this, the tracing stderr writer lands in the log sink.
fn detach_stdio(options: &Options) -> std::io::Result<()> {
    let devnull = File::open("/dev/null")?;
    let path = log_path(options);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let sink = OpenOptions::new().create(true).append(true).open(&path)?;

    unistd::dup2(devnull.as_raw_fd(), STDIN_FILENO).map_err(std::io::Error::from)?;
    unistd::dup2(sink.as_raw_fd(), STDOUT_FILENO).map_err(std::io::Error::from)?;
    unistd::dup2(sink.as_raw_fd(), STDERR_FILENO).map_err(std::io::Error::from)?;
    Ok(())
}

#[cfg(test)]
#[path = "forker_tests.rs"]
mod tests;
