// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The host↔payload contract.
//!
//! A payload implements [`Payload`]: `run` is required, everything else
//! defaults to a no-op. The supervisor calls each hook at a fixed point
//! in the lifecycle with a fixed argument list; hooks the payload does
//! not override simply keep their default behavior.

use clap::{ArgMatches, Command};
use nix::unistd::Pid;

use warden_core::{Admission, Realm, RunOutcome, WorkerConfig};

use crate::errors::{ErrorEvent, Flow};
use crate::forker::ChildKind;
use crate::signals::Sig;

/// Error type payload hooks may fail with.
pub type PayloadError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Constructs one payload instance. Registered at supervisor
/// construction; called once in the supervisor realm and once per
/// worker.
pub type PayloadFactory = Box<dyn Fn() -> Box<dyn Payload>>;

/// The application running under the supervisor.
pub trait Payload {
    /// The payload body. Single mode: runs in the supervisor realm with
    /// no worker config. Fleet mode: runs in each worker with the config
    /// its admission produced. The returned outcome selects the process
    /// exit code; an error is logged and exits 1.
    fn run(&mut self, worker: Option<&WorkerConfig>) -> Result<RunOutcome, PayloadError>;

    /// Extend the CLI after the built-in commands are registered and
    /// before parsing.
    fn preflight(&mut self, cli: Command) -> Command {
        cli
    }

    /// Post-daemonize, before `run` or the fleet loop.
    fn initialize(&mut self, _args: &ArgMatches) -> Result<(), PayloadError> {
        Ok(())
    }

    /// Fall-through for commands the dispatcher does not know. Return
    /// the process exit code, or `None` when the command is unhandled.
    fn cli_command(&mut self, _command: &str, _args: &[String]) -> Option<i32> {
        None
    }

    /// On INT/TERM, before outstanding children are reaped.
    fn shutdown(&mut self) {}

    /// After the supervisor loop exits cleanly.
    fn dismiss(&mut self) {}

    /// Signal notification. On HUP a `true` return suppresses the
    /// default fleet restart. USR1/USR2 have no default behavior.
    fn signal(&mut self, _sig: Sig) -> bool {
        false
    }

    /// Fleet admission: produce the next worker's configuration, refuse
    /// this launch, or stop launching altogether.
    fn worker_config(&mut self) -> Admission {
        Admission::default()
    }

    /// Polled once per admission attempt when the fleet cap is reached;
    /// `true` admits one worker beyond the cap.
    fn launch_override(&mut self) -> bool {
        false
    }

    /// Just after a successful fork, in the parent.
    fn spawned_worker(&mut self, _pid: Pid, _parent: Realm, _config: &WorkerConfig) {}

    /// Just after a child is removed from the child table.
    fn reaped_worker(&mut self, _pid: Pid, _kind: ChildKind) {}

    /// Structured error events routed via the error bridge.
    fn on_error(&mut self, _event: &ErrorEvent) -> Flow {
        Flow::Continue
    }
}
