// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-worker launch configuration and the admission decision.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Flat key→value configuration handed to one worker at launch.
///
/// The supervisor treats it as opaque: it is produced by the payload's
/// `worker_config` hook, passed to the worker's `run`, and echoed to the
/// `spawned_worker` hook in the parent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerConfig {
    pub vars: HashMap<String, String>,
}

impl WorkerConfig {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.vars.insert(key.into(), value.into());
        self
    }
}

impl<const N: usize> From<[(&str, &str); N]> for WorkerConfig {
    fn from(pairs: [(&str, &str); N]) -> Self {
        Self {
            vars: pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
        }
    }
}

/// The payload's answer to "may I launch one more worker?".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission {
    /// Launch a worker with this configuration.
    Launch(WorkerConfig),
    /// Refuse this launch; the admission phase ends but launching stays on.
    Refuse,
    /// Stop launching altogether: drain outstanding workers and exit.
    Stop,
}

impl Default for Admission {
    fn default() -> Self {
        Admission::Launch(WorkerConfig::default())
    }
}
