// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process realm labels.

use serde::{Deserialize, Serialize};

/// The role the current process plays in the supervisor lifecycle.
///
/// A process has exactly one realm, fixed at fork time. The invoking
/// process starts in [`Realm::Console`]; when daemonization is disabled
/// it becomes [`Realm::Foreground`] and plays the supervisor role itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Realm {
    /// Pre-fork invoker: parses the command and dispatches it.
    Console,
    /// Detached supervisor process.
    Daemon,
    /// Forked payload process in fleet mode.
    Worker,
    /// The invoker acting as supervisor (daemonization disabled).
    Foreground,
}

impl Realm {
    /// True for the realms that drive the supervision loop.
    pub fn is_supervisor(self) -> bool {
        matches!(self, Realm::Daemon | Realm::Foreground)
    }
}

impl std::fmt::Display for Realm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Realm::Console => "console",
            Realm::Daemon => "daemon",
            Realm::Worker => "worker",
            Realm::Foreground => "foreground",
        };
        write!(f, "{name}")
    }
}
