// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared spec harness: a temp sandbox per test plus helpers for
//! driving the `warden-app` binary and watching its side effects.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use assert_cmd::assert::Assert;
use assert_cmd::Command;
use nix::errno::Errno;
use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use tempfile::TempDir;

/// Generous ceiling for daemons to reach an observable state.
pub const WAIT_MAX_MS: u64 = 10_000;

pub struct App {
    tmp: TempDir,
    envs: Vec<(String, String)>,
}

impl App {
    pub fn new() -> Self {
        let tmp = TempDir::new().expect("create sandbox");
        let mut app = Self { tmp, envs: Vec::new() };
        let pidfile = app.pidfile().display().to_string();
        let dir = app.tmp.path().display().to_string();
        let journal = app.journal_path().display().to_string();
        app = app
            .env("WARDEN_APP_PIDFILE", &pidfile)
            .env("WARDEN_APP_DIR", &dir)
            .env("WARDEN_APP_JOURNAL", &journal);
        app
    }

    pub fn env(mut self, key: &str, value: &str) -> Self {
        self.envs.push((key.to_string(), value.to_string()));
        self
    }

    pub fn pidfile(&self) -> PathBuf {
        self.tmp.path().join("warden-app.pid")
    }

    pub fn journal_path(&self) -> PathBuf {
        self.tmp.path().join("journal.log")
    }

    pub fn journal(&self) -> Vec<String> {
        match std::fs::read_to_string(self.journal_path()) {
            Ok(content) => content.lines().map(str::to_string).collect(),
            Err(_) => Vec::new(),
        }
    }

    pub fn journal_count(&self, prefix: &str) -> usize {
        self.journal().iter().filter(|line| line.starts_with(prefix)).count()
    }

    /// PIDs recorded by `spawned` journal entries.
    pub fn spawned_pids(&self) -> Vec<i32> {
        self.journal()
            .iter()
            .filter_map(|line| {
                let mut parts = line.split_whitespace();
                match parts.next() {
                    Some("spawned") => parts.next().and_then(|pid| pid.parse().ok()),
                    _ => None,
                }
            })
            .collect()
    }

    /// The PID currently recorded in the lock file.
    pub fn holder(&self) -> Option<i32> {
        let content = std::fs::read_to_string(self.pidfile()).ok()?;
        content.split_whitespace().next()?.parse().ok()
    }

    pub fn run(&self, args: &[&str]) -> Assert {
        let mut cmd = Command::cargo_bin("warden-app").expect("warden-app binary");
        for (key, value) in &self.envs {
            cmd.env(key, value);
        }
        cmd.args(args);
        cmd.assert()
    }
}

impl Drop for App {
    /// Kill anything the test leaked: the daemon named in the pidfile
    /// and every worker recorded in the journal.
    fn drop(&mut self) {
        let mut leaked: Vec<i32> = self.spawned_pids();
        if let Some(pid) = self.holder() {
            leaked.push(pid);
        }
        for pid in leaked {
            let _ = kill(Pid::from_raw(pid), Signal::SIGKILL);
        }
    }
}

pub fn pid_alive(pid: i32) -> bool {
    match kill(Pid::from_raw(pid), None) {
        Ok(()) => true,
        Err(Errno::EPERM) => true,
        Err(_) => false,
    }
}

/// Content assertions on top of `assert_cmd`'s `Assert`.
pub trait AssertExt {
    fn stdout_has(self, needle: &str) -> Self;
    fn stderr_has(self, needle: &str) -> Self;
}

impl AssertExt for Assert {
    fn stdout_has(self, needle: &str) -> Self {
        let output = String::from_utf8_lossy(&self.get_output().stdout).into_owned();
        assert!(output.contains(needle), "stdout missing {needle:?}:\n{output}");
        self
    }

    fn stderr_has(self, needle: &str) -> Self {
        let output = String::from_utf8_lossy(&self.get_output().stderr).into_owned();
        assert!(output.contains(needle), "stderr missing {needle:?}:\n{output}");
        self
    }
}

/// Poll `check` until it holds or `timeout_ms` elapses.
pub fn wait_for(timeout_ms: u64, mut check: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_millis(timeout_ms);
    loop {
        if check() {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        std::thread::sleep(Duration::from_millis(25));
    }
}
