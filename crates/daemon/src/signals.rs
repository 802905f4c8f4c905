// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Signal routing.
//!
//! Handlers installed here only record delivery (signal-hook's
//! self-pipe); all real work happens when the supervisor drains the
//! inbox at an iteration boundary. Workers restore the default
//! dispositions immediately after fork so TERM and friends behave
//! normally inside the payload.

use nix::libc::c_int;
use nix::sys::signal::{signal as set_disposition, SigHandler, Signal};
use signal_hook::consts::signal::{SIGCHLD, SIGHUP, SIGINT, SIGTERM, SIGUSR1, SIGUSR2};
use signal_hook::iterator::Signals;
use tracing::warn;

use crate::errors::DaemonError;

/// The signals the supervisor routes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sig {
    Hup,
    Int,
    Term,
    Chld,
    Usr1,
    Usr2,
}

impl Sig {
    pub fn from_raw(raw: c_int) -> Option<Sig> {
        match raw {
            SIGHUP => Some(Sig::Hup),
            SIGINT => Some(Sig::Int),
            SIGTERM => Some(Sig::Term),
            SIGCHLD => Some(Sig::Chld),
            SIGUSR1 => Some(Sig::Usr1),
            SIGUSR2 => Some(Sig::Usr2),
            _ => None,
        }
    }

    pub fn as_signal(self) -> Signal {
        match self {
            Sig::Hup => Signal::SIGHUP,
            Sig::Int => Signal::SIGINT,
            Sig::Term => Signal::SIGTERM,
            Sig::Chld => Signal::SIGCHLD,
            Sig::Usr1 => Signal::SIGUSR1,
            Sig::Usr2 => Signal::SIGUSR2,
        }
    }
}

impl std::fmt::Display for Sig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_signal().as_str())
    }
}

const ROUTED: [c_int; 6] = [SIGHUP, SIGINT, SIGTERM, SIGCHLD, SIGUSR1, SIGUSR2];

/// Something the supervisor can drain pending signals from.
///
/// Production uses [`SignalRouter`]; supervisor tests script a fake.
pub trait SignalSource {
    fn drain(&mut self) -> Vec<Sig>;
}

/// Installs handlers for the routed set and collects deliveries.
pub struct SignalRouter {
    signals: Signals,
}

impl SignalRouter {
    pub fn install() -> Result<Self, DaemonError> {
        let signals = Signals::new(ROUTED).map_err(DaemonError::Signals)?;
        Ok(Self { signals })
    }
}

impl SignalSource for SignalRouter {
    /// Non-blocking drain of everything delivered since the last call.
    /// Repeat deliveries of one signal collapse into a single entry.
    fn drain(&mut self) -> Vec<Sig> {
        let mut seen = Vec::new();
        for raw in self.signals.pending() {
            if let Some(sig) = Sig::from_raw(raw) {
                if !seen.contains(&sig) {
                    seen.push(sig);
                }
            }
        }
        seen
    }
}

/// Restore default dispositions for the full routed set. Called in the
/// worker branch immediately after fork.
pub fn reset_worker_dispositions() {
    for raw in ROUTED {
        restore_default(raw);
    }
}

/// Restore default dispositions for HUP/INT/TERM/CHLD when the
/// supervisor loop exits.
pub fn restore_supervisor_defaults() {
    for raw in [SIGHUP, SIGINT, SIGTERM, SIGCHLD] {
        restore_default(raw);
    }
}

fn restore_default(raw: c_int) {
    let Ok(sig) = Signal::try_from(raw) else {
        return;
    };
    // SAFETY: SigDfl carries no handler function; restoring the default
    // disposition is async-signal-safe and valid in the forked child.
    if let Err(err) = unsafe { set_disposition(sig, SigHandler::SigDfl) } {
        warn!(signal = %sig, "failed to restore default disposition: {err}");
    }
}

#[cfg(test)]
#[path = "signals_tests.rs"]
mod tests;
