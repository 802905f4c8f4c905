// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the daemon crate.

use std::path::PathBuf;

/// Directory for default PID files: `WARDEN_RUN_DIR` > `/var/run`.
///
/// The override exists for sandboxed environments (tests, containers
/// without a writable `/var/run`).
pub fn run_dir() -> PathBuf {
    match std::env::var("WARDEN_RUN_DIR") {
        Ok(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => PathBuf::from("/var/run"),
    }
}

/// Log filter override in `EnvFilter` syntax, e.g. `WARDEN_LOG=debug`.
pub fn log_filter() -> Option<String> {
    std::env::var("WARDEN_LOG").ok().filter(|s| !s.is_empty())
}
