// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Run outcomes and exit-code aggregation.
//!
//! The codes in [`RunOutcome::exit_code`] are the contract the surrounding
//! OS supervisor (cron, systemd, a process manager) reads; they are stable.

use serde::{Deserialize, Serialize};

/// What the payload asks for when `run` returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunOutcome {
    /// Normal halt, exit 0.
    Halt,
    /// Error halt, exit 8.
    Exit,
    /// Cron-style restart requested, exit 2.
    Restart,
    /// Reload, exit 1. Also the default reading of an unknown outcome.
    #[default]
    #[serde(other)]
    Reload,
}

impl RunOutcome {
    pub fn exit_code(self) -> i32 {
        match self {
            RunOutcome::Halt => 0,
            RunOutcome::Exit => 8,
            RunOutcome::Restart => 2,
            RunOutcome::Reload => 1,
        }
    }
}

impl std::str::FromStr for RunOutcome {
    type Err = std::convert::Infallible;

    /// Unknown strings fold into the default (`Reload`), matching the
    /// "also default" row of the translation table.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_ascii_lowercase().as_str() {
            "halt" => RunOutcome::Halt,
            "exit" => RunOutcome::Exit,
            "restart" => RunOutcome::Restart,
            _ => RunOutcome::Reload,
        })
    }
}

/// Policy for folding reaped worker exit codes into one daemon exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExitPolicy {
    /// Always exit 0 regardless of worker codes.
    #[default]
    Success,
    /// Exit with `max(|code|)` over all reaped workers.
    WorstCase,
}

/// Aggregated exit code, monotonic under [`ExitPolicy::WorstCase`].
#[derive(Debug, Clone, Copy)]
pub struct ExitAggregate {
    policy: ExitPolicy,
    code: i32,
}

impl ExitAggregate {
    pub fn new(policy: ExitPolicy) -> Self {
        Self { policy, code: 0 }
    }

    /// Fold one reaped worker's exit code into the aggregate.
    pub fn observe(&mut self, code: i32) {
        if self.policy == ExitPolicy::WorstCase {
            self.code = self.code.max(code.abs());
        }
    }

    pub fn code(&self) -> i32 {
        self.code
    }

    /// Reset to the starting state, keeping the policy.
    pub fn reset(&mut self) {
        self.code = 0;
    }
}

#[cfg(test)]
#[path = "exit_tests.rs"]
mod tests;
