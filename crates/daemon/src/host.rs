// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Payload host: instance lifecycle and hook dispatch.
//!
//! Holds the registered factory, constructs the payload lazily on first
//! hook dispatch, and contains payload faults: an `Err` from `run` or a
//! panic inside it is routed through the error bridge and translated to
//! exit code 1 instead of taking the supervisor down.

use std::panic::{catch_unwind, AssertUnwindSafe};

use clap::{ArgMatches, Command};
use nix::unistd::Pid;
use tracing::debug;

use warden_core::{Admission, LogLevel, Realm, WorkerConfig};

use crate::errors::{DaemonError, ErrorBridge};
use crate::forker::ChildKind;
use crate::payload::{Payload, PayloadFactory};
use crate::signals::Sig;

pub struct PayloadHost {
    factory: PayloadFactory,
    instance: Option<Box<dyn Payload>>,
    pub bridge: ErrorBridge,
}

impl PayloadHost {
    pub fn new(factory: PayloadFactory, threshold: LogLevel) -> Self {
        Self { factory, instance: None, bridge: ErrorBridge::new(threshold) }
    }

    fn ensure_instance(&mut self) {
        if self.instance.is_none() {
            debug!("constructing payload instance");
            self.instance = Some((self.factory)());
        }
    }

    fn payload(&mut self) -> &mut Box<dyn Payload> {
        self.ensure_instance();
        match self.instance.as_mut() {
            Some(payload) => payload,
            None => unreachable!("instance constructed above"),
        }
    }

    pub fn preflight(&mut self, cli: Command) -> Command {
        self.payload().preflight(cli)
    }

    pub fn initialize(&mut self, args: &ArgMatches) -> Result<(), DaemonError> {
        self.payload().initialize(args).map_err(|err| DaemonError::Payload(err.to_string()))
    }

    pub fn cli_command(&mut self, command: &str, args: &[String]) -> Option<i32> {
        self.payload().cli_command(command, args)
    }

    pub fn shutdown(&mut self) {
        self.payload().shutdown();
    }

    pub fn dismiss(&mut self) {
        self.payload().dismiss();
    }

    pub fn signal(&mut self, sig: Sig) -> bool {
        self.payload().signal(sig)
    }

    pub fn worker_config(&mut self) -> Admission {
        self.payload().worker_config()
    }

    pub fn launch_override(&mut self) -> bool {
        self.payload().launch_override()
    }

    pub fn spawned_worker(&mut self, pid: Pid, parent: Realm, config: &WorkerConfig) {
        self.payload().spawned_worker(pid, parent, config);
    }

    pub fn reaped_worker(&mut self, pid: Pid, kind: ChildKind) {
        self.payload().reaped_worker(pid, kind);
    }

    /// Attach the payload's `on_error` hook to the bridge chain.
    pub fn attach_error_hook(&mut self) {
        self.bridge.attach_payload_hook();
    }

    /// Run the payload and translate the result to a process exit code.
    /// Faults (error returns and panics) are contained: logged through
    /// the bridge, exit code 1.
    pub fn run_supervised(&mut self, worker: Option<&WorkerConfig>) -> i32 {
        self.ensure_instance();
        let Some(payload) = self.instance.as_mut() else {
            unreachable!("instance constructed above")
        };
        let result = catch_unwind(AssertUnwindSafe(|| payload.run(worker)));
        match result {
            Ok(Ok(outcome)) => outcome.exit_code(),
            Ok(Err(err)) => {
                self.bridge.exception(&err.to_string(), payload.as_mut());
                1
            }
            Err(panic) => {
                self.bridge.exception(&panic_message(panic.as_ref()), payload.as_mut());
                1
            }
        }
    }

    /// Worker-realm run: a fresh instance per worker, dropped when the
    /// run completes.
    pub fn run_worker(&mut self, config: &WorkerConfig) -> i32 {
        self.instance = Some((self.factory)());
        let code = self.run_supervised(Some(config));
        self.instance = None;
        code
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = panic.downcast_ref::<&str>() {
        format!("payload panicked: {msg}")
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        format!("payload panicked: {msg}")
    } else {
        "payload panicked".to_string()
    }
}

#[cfg(test)]
#[path = "host_tests.rs"]
mod tests;
