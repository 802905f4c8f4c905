// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Lifecycle dispatcher.
//!
//! [`Daemon::attach`] is the embedding application's whole entry point:
//! it parses the argument list, routes the built-in lifecycle commands
//! against the PID lock, falls through to the payload's `cli_command`
//! hook for anything else, and — for `start` — performs the daemonize
//! fork and hands control to the payload or the fleet supervisor.

use std::thread;
use std::time::Duration;

use clap::{Arg, ArgAction, ArgMatches, Command};
use nix::sys::signal::{kill, Signal};
use nix::unistd::{geteuid, getuid, Pid, User};
use tracing::{info, warn};

use warden_core::{Mode, Options, Realm};

use crate::errors::DaemonError;
use crate::forker::{self, ForkKind, Forked};
use crate::host::PayloadHost;
use crate::lock::{self, pid_alive, PidLock};
use crate::logging;
use crate::payload::PayloadFactory;
use crate::procs::UnixProcs;
use crate::signals::SignalRouter;
use crate::supervisor::Supervisor;

/// Exit code for unparseable or unhandled commands.
const USAGE_ERROR: i32 = 2;

/// Grace period after each signal in the stop ladder.
const STOP_GRACE: Duration = Duration::from_secs(1);

pub struct Daemon {
    options: Options,
    host: PayloadHost,
    pidlock: PidLock,
}

impl Daemon {
    /// Register the payload and validate the options. Nothing touches
    /// the filesystem until a command runs.
    pub fn new(options: Options, factory: PayloadFactory) -> Result<Self, DaemonError> {
        options.validate()?;
        let pidlock = PidLock::new(lock::pidfile_path(&options));
        let host = PayloadHost::new(factory, options.loglevel);
        Ok(Self { options, host, pidlock })
    }

    /// Dispatch one command. Returns the process exit code the embedder
    /// should exit with; configuration errors surface as `Err`.
    pub fn attach<I, T>(mut self, args: I) -> Result<i32, DaemonError>
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        logging::init(&self.options);
        let args: Vec<String> = args.into_iter().map(Into::into).collect();

        let cli = self.build_cli();
        let cli = self.host.preflight(cli);
        let mut help_cli = cli.clone();
        let matches = match cli.try_get_matches_from(&args) {
            Ok(matches) => matches,
            Err(err) => {
                let _ = err.print();
                return Ok(USAGE_ERROR);
            }
        };

        // Foreground mode forces `start` regardless of the parsed
        // command; everything after the fork point is shared.
        if !self.options.daemonize {
            let watchdog = start_watchdog_flag(&matches);
            return self.start(watchdog, &matches);
        }

        match matches.subcommand() {
            Some(("status", _)) => Ok(self.status()),
            Some(("stop", _)) => Ok(self.stop()),
            Some(("restart", _)) => {
                let _ = self.stop();
                self.start(false, &matches)
            }
            Some(("start", sub)) => {
                let watchdog = sub.get_flag("watchdog");
                self.start(watchdog, &matches)
            }
            Some((command, _)) => {
                let command = command.to_string();
                let tail = args_after(&args, &command);
                match self.host.cli_command(&command, &tail) {
                    Some(code) => Ok(code),
                    None => {
                        eprintln!("unhandled command: {command}");
                        Ok(USAGE_ERROR)
                    }
                }
            }
            None => {
                let _ = help_cli.print_help();
                Ok(USAGE_ERROR)
            }
        }
    }

    fn build_cli(&self) -> Command {
        Command::new(self.options.appname.clone())
            .about(self.options.appdescription.clone())
            .no_binary_name(true)
            .allow_external_subcommands(true)
            .subcommand(
                Command::new("start").about("Start the daemon").arg(
                    Arg::new("watchdog")
                        .short('w')
                        .long("watchdog")
                        .action(ArgAction::SetTrue)
                        .help("Treat an already-running daemon as success"),
                ),
            )
            .subcommand(Command::new("stop").about("Stop the daemon"))
            .subcommand(Command::new("restart").about("Stop and restart the daemon"))
            .subcommand(Command::new("status").about("Check daemon status"))
    }

    /// `status`: 0 when the lock is held by a live daemon, 1 otherwise.
    fn status(&self) -> i32 {
        if self.pidlock.is_held() {
            match self.pidlock.holder() {
                Some(pid) => println!("{}: running (pid {pid})", self.options.appname),
                None => println!("{}: running", self.options.appname),
            }
            0
        } else {
            println!("{}: not running", self.options.appname);
            1
        }
    }

    /// `stop`: TERM, wait, KILL, wait. The lock file is cleared only
    /// once the PID is confirmed dead.
    fn stop(&mut self) -> i32 {
        let Some(pid) = self.pidlock.holder() else {
            println!("{}: not running", self.options.appname);
            return 1;
        };
        if pid == Pid::this() || !pid_alive(pid) {
            self.pidlock.release();
            println!("{}: not running", self.options.appname);
            return 1;
        }

        info!(%pid, "sending SIGTERM");
        let _ = kill(pid, Signal::SIGTERM);
        thread::sleep(STOP_GRACE);

        if pid_alive(pid) {
            warn!(%pid, "still alive after SIGTERM, sending SIGKILL");
            let _ = kill(pid, Signal::SIGKILL);
            thread::sleep(STOP_GRACE);
        }

        if pid_alive(pid) {
            warn!(%pid, "daemon did not exit after SIGKILL");
            return 1;
        }

        self.pidlock.release();
        println!("{}: stopped", self.options.appname);
        0
    }

    /// The start sequence: lock check, identity pre-check, daemonize
    /// fork, signal handlers, payload initialization, then single-run
    /// or fleet supervision.
    fn start(&mut self, watchdog: bool, matches: &ArgMatches) -> Result<i32, DaemonError> {
        if !self.options.concurrent && self.pidlock.is_held() {
            println!("{}: already running", self.options.appname);
            return Ok(if watchdog { 0 } else { 1 });
        }

        self.record_invoker();

        if self.options.wants_identity_switch() && !geteuid().is_root() {
            return Err(DaemonError::IdentityRequiresRoot { euid: geteuid().as_raw() });
        }

        let realm = if self.options.daemonize {
            match forker::fork_realm(ForkKind::Daemon, true, &self.options, &self.pidlock)? {
                Forked::Parent { child, .. } => {
                    println!("{}: detached (pid {child})", self.options.appname);
                    return Ok(0);
                }
                Forked::Child { realm } => realm,
            }
        } else {
            Realm::Foreground
        };

        let router = SignalRouter::install()?;
        info!(
            realm = %realm,
            app = %self.options.appname,
            invoked_by = self.options.invoked_by.as_deref().unwrap_or("unknown"),
            tty = self.options.tty.as_deref().unwrap_or("none"),
            "supervisor starting"
        );

        self.host.initialize(matches)?;
        self.host.attach_error_hook();

        let code = match self.options.mode {
            Mode::Single => {
                // Signals recorded by the router are not delivered while
                // a single payload blocks; the stop ladder's KILL is the
                // backstop for unresponsive payloads.
                let _router = router;
                self.host.run_supervised(None)
            }
            Mode::Fleet => {
                let procs = UnixProcs::new(&self.options, &self.pidlock);
                Supervisor::new(
                    &mut self.host,
                    procs,
                    router,
                    self.options.fleet,
                    self.options.exitmode,
                )
                .run()
            }
        };

        self.host.dismiss();
        if realm == Realm::Daemon {
            self.pidlock.release();
        }
        info!(code, "supervisor exiting");
        Ok(code)
    }

    /// Record who started us: effective user, invoking login, and the
    /// controlling tty. Captured before the fork while the terminal is
    /// still attached.
    fn record_invoker(&mut self) {
        self.options.effective_user =
            User::from_uid(geteuid()).ok().flatten().map(|user| user.name);
        self.options.invoked_by = std::env::var("LOGNAME")
            .ok()
            .filter(|name| !name.is_empty())
            .or_else(|| User::from_uid(getuid()).ok().flatten().map(|user| user.name));
        self.options.tty =
            nix::unistd::ttyname(std::io::stdin()).ok().map(|path| path.display().to_string());
    }
}

/// The argument tail after the named subcommand, handed to the payload's
/// `cli_command` hook.
fn args_after(args: &[String], command: &str) -> Vec<String> {
    match args.iter().position(|arg| arg == command) {
        Some(index) => args[index + 1..].to_vec(),
        None => Vec::new(),
    }
}

fn start_watchdog_flag(matches: &ArgMatches) -> bool {
    match matches.subcommand() {
        Some(("start", sub)) => sub.get_flag("watchdog"),
        _ => false,
    }
}

#[cfg(test)]
#[path = "dispatch_tests.rs"]
mod tests;
