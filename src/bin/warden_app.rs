// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Reference payload for the workspace specs.
//!
//! Behavior is scripted through `WARDEN_APP_*` environment variables so
//! the integration specs can drive every lifecycle path end to end:
//! single or fleet mode, scripted worker outcomes, blocking workers,
//! and a journal file recording each hook invocation.

use std::collections::VecDeque;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

use warden_core::{Admission, ExitPolicy, Mode, Options, Realm, RunOutcome, WorkerConfig};
use warden_daemon::{ChildKind, Daemon, Payload, PayloadError, Pid, Sig};

struct AppPayload {
    journal: Option<PathBuf>,
    outcomes: Option<VecDeque<String>>,
    block: bool,
    sleep: Duration,
    single_outcome: RunOutcome,
}

impl AppPayload {
    fn from_env() -> Self {
        let outcomes = std::env::var("WARDEN_APP_OUTCOMES").ok().map(|list| {
            list.split(',')
                .map(str::trim)
                .filter(|entry| !entry.is_empty())
                .map(str::to_string)
                .collect()
        });
        Self {
            journal: std::env::var("WARDEN_APP_JOURNAL").ok().map(PathBuf::from),
            outcomes,
            block: env_flag("WARDEN_APP_BLOCK"),
            sleep: Duration::from_millis(env_u64("WARDEN_APP_SLEEP_MS", 0)),
            single_outcome: std::env::var("WARDEN_APP_OUTCOME")
                .ok()
                .map(|value| value.parse().unwrap_or_default())
                .unwrap_or(RunOutcome::Halt),
        }
    }

    fn record(&self, line: &str) {
        let Some(path) = &self.journal else {
            return;
        };
        let entry = format!("{line}\n");
        let result = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .and_then(|mut file| file.write_all(entry.as_bytes()));
        if let Err(err) = result {
            eprintln!("warden-app: journal write failed: {err}");
        }
    }
}

impl Payload for AppPayload {
    fn run(&mut self, worker: Option<&WorkerConfig>) -> Result<RunOutcome, PayloadError> {
        let tag = worker.and_then(|config| config.get("outcome")).unwrap_or("single");
        self.record(&format!("run {tag} pid={}", std::process::id()));

        if self.block {
            // Workers keep default signal dispositions, so TERM/KILL
            // from the supervisor ends this loop.
            loop {
                std::thread::sleep(Duration::from_millis(50));
            }
        }
        if !self.sleep.is_zero() {
            std::thread::sleep(self.sleep);
        }

        let outcome = match worker.and_then(|config| config.get("outcome")) {
            Some(scripted) => scripted.parse().unwrap_or_default(),
            None => self.single_outcome,
        };
        Ok(outcome)
    }

    fn preflight(&mut self, cli: clap::Command) -> clap::Command {
        cli.subcommand(clap::Command::new("ping").about("Payload liveness check"))
    }

    fn cli_command(&mut self, command: &str, _args: &[String]) -> Option<i32> {
        match command {
            "ping" => {
                println!("pong");
                Some(0)
            }
            _ => None,
        }
    }

    fn worker_config(&mut self) -> Admission {
        match &mut self.outcomes {
            None => Admission::default(),
            Some(outcomes) => match outcomes.pop_front() {
                Some(outcome) => {
                    let mut config = WorkerConfig::default();
                    config.set("outcome", outcome);
                    Admission::Launch(config)
                }
                None => Admission::Stop,
            },
        }
    }

    fn shutdown(&mut self) {
        self.record("shutdown");
    }

    fn dismiss(&mut self) {
        self.record("dismiss");
    }

    fn signal(&mut self, sig: Sig) -> bool {
        self.record(&format!("signal {sig}"));
        false
    }

    fn spawned_worker(&mut self, pid: Pid, _parent: Realm, config: &WorkerConfig) {
        self.record(&format!("spawned {pid} {}", config.get("outcome").unwrap_or("-")));
    }

    fn reaped_worker(&mut self, pid: Pid, kind: ChildKind) {
        self.record(&format!("reaped {pid} {kind}"));
    }
}

fn env_flag(name: &str) -> bool {
    matches!(std::env::var(name).as_deref(), Ok("1") | Ok("true"))
}

fn env_u64(name: &str, default: u64) -> u64 {
    std::env::var(name).ok().and_then(|value| value.parse().ok()).unwrap_or(default)
}

fn options_from_env() -> Result<Options> {
    let mut options = Options::new(
        std::env::var("WARDEN_APP_NAME").unwrap_or_else(|_| "warden-app".to_string()),
    );
    options.appdescription = "warden reference payload".to_string();
    options.appdir = std::env::var("WARDEN_APP_DIR").ok().map(PathBuf::from);
    options.pidfile = std::env::var("WARDEN_APP_PIDFILE").ok().map(PathBuf::from);
    options.daemonize = !env_flag("WARDEN_APP_FOREGROUND");
    options.concurrent = env_flag("WARDEN_APP_CONCURRENT");
    options.mode = match std::env::var("WARDEN_APP_MODE").as_deref() {
        Ok("fleet") => Mode::Fleet,
        _ => Mode::Single,
    };
    options.fleet = env_u64("WARDEN_APP_FLEET", 1) as u32;
    options.exitmode = match std::env::var("WARDEN_APP_EXITMODE").as_deref() {
        Ok("worst-case") => ExitPolicy::WorstCase,
        _ => ExitPolicy::Success,
    };
    if let Ok(level) = std::env::var("WARDEN_APP_LOGLEVEL") {
        options.loglevel = level.parse().context("WARDEN_APP_LOGLEVEL")?;
    }
    Ok(options)
}

fn main() {
    let code = match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("warden-app: {err:#}");
            1
        }
    };
    std::process::exit(code);
}

fn run() -> Result<i32> {
    let options = options_from_env()?;
    let daemon = Daemon::new(
        options,
        Box::new(|| Box::new(AppPayload::from_env()) as Box<dyn Payload>),
    )?;
    let code = daemon.attach(std::env::args().skip(1))?;
    Ok(code)
}
