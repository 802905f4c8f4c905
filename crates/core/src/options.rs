// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Supervisor options.
//!
//! An explicitly-owned configuration object, created by the embedding
//! application before `attach` and read-mostly thereafter. The few fields
//! the supervisor records at startup (effective user, invoking user,
//! controlling tty) are appended during the start sequence.

use std::path::PathBuf;

use thiserror::Error;

use crate::exit::ExitPolicy;

/// Execution model for the supervised payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// One payload instance, run directly in the supervisor realm.
    #[default]
    Single,
    /// A fleet of forked worker processes, each running the payload.
    Fleet,
}

/// Minimum severity emitted to the log sink and the error bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    #[default]
    Warning,
    Error,
}

impl LogLevel {
    /// Directive string understood by `tracing_subscriber::EnvFilter`.
    pub fn as_filter(self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warning => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl std::str::FromStr for LogLevel {
    type Err = OptionsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warning),
            "error" => Ok(LogLevel::Error),
            other => Err(OptionsError::BadLogLevel(other.to_string())),
        }
    }
}

/// Process-wide supervisor configuration.
///
/// `appname` is required; `appdir` or an explicit `pidfile` must be
/// present so the lock path can be derived. Everything else defaults.
#[derive(Debug, Clone)]
pub struct Options {
    /// Application name; basis for the default pidfile and the CLI name.
    pub appname: String,
    /// CLI description text.
    pub appdescription: String,
    /// Application directory, used for the default log sink.
    pub appdir: Option<PathBuf>,
    /// Explicit PID file path, overriding the `/var/run` derivation.
    pub pidfile: Option<PathBuf>,
    /// Detach from the controlling terminal on `start`.
    pub daemonize: bool,
    /// Skip the single-instance lock check.
    pub concurrent: bool,
    /// Execution model.
    pub mode: Mode,
    /// Maximum concurrent workers in fleet mode (>= 1).
    pub fleet: u32,
    /// Aggregate-exit policy for reaped worker codes.
    pub exitmode: ExitPolicy,
    /// Drop to this user after forking (requires root).
    pub runasuser: Option<String>,
    /// Drop to this group after forking (requires root).
    pub runasgroup: Option<String>,
    /// Minimum severity emitted to the log sink.
    pub loglevel: LogLevel,

    /// Effective user at start, recorded during the start sequence.
    pub effective_user: Option<String>,
    /// Invoking user (from the login name), recorded at start.
    pub invoked_by: Option<String>,
    /// Controlling tty of the invoker, recorded at start.
    pub tty: Option<String>,
}

impl Options {
    pub fn new(appname: impl Into<String>) -> Self {
        Self {
            appname: appname.into(),
            appdescription: String::new(),
            appdir: None,
            pidfile: None,
            daemonize: true,
            concurrent: false,
            mode: Mode::Single,
            fleet: 1,
            exitmode: ExitPolicy::Success,
            runasuser: None,
            runasgroup: None,
            loglevel: LogLevel::default(),
            effective_user: None,
            invoked_by: None,
            tty: None,
        }
    }

    /// Check the invariants that must hold before `attach`.
    pub fn validate(&self) -> Result<(), OptionsError> {
        if self.appname.trim().is_empty() {
            return Err(OptionsError::MissingAppname);
        }
        if self.appdir.is_none() && self.pidfile.is_none() {
            return Err(OptionsError::MissingRunDir);
        }
        if self.fleet < 1 {
            return Err(OptionsError::FleetTooSmall(self.fleet));
        }
        Ok(())
    }

    /// True when an identity switch was requested for forked children.
    pub fn wants_identity_switch(&self) -> bool {
        self.runasuser.is_some() || self.runasgroup.is_some()
    }
}

/// Configuration errors surfaced to the invoker before anything forks.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum OptionsError {
    #[error("appname is required")]
    MissingAppname,

    #[error("either appdir or an explicit pidfile path is required")]
    MissingRunDir,

    #[error("fleet must be at least 1 (got {0})")]
    FleetTooSmall(u32),

    #[error("unknown log level: {0}")]
    BadLogLevel(String),
}

#[cfg(test)]
#[path = "options_tests.rs"]
mod tests;
