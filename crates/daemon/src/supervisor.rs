// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fleet supervisor loop.
//!
//! Each iteration runs admission, signal drain, reap, then a one-second
//! quiesce, in that order. Signals never do work at delivery time; the
//! drain phase inspects what arrived and folds it into the `Directive`
//! state the loop head acts on. The loop ends when launching has stopped
//! and every child has been reaped, or on a shutdown directive.

use std::collections::BTreeMap;
use std::time::Duration;

use nix::unistd::Pid;
use tracing::{info, warn};

use warden_core::{Admission, ExitAggregate, ExitPolicy, Realm};

use crate::forker::{ChildKind, Forked};
use crate::host::PayloadHost;
use crate::procs::Procs;
use crate::signals::{self, Sig, SignalSource};

/// Sleep between loop iterations.
pub const QUIESCE_INTERVAL: Duration = Duration::from_secs(1);

/// Sleep between force-reap passes.
pub const FORCE_REAP_INTERVAL: Duration = Duration::from_millis(10);

/// What the loop head should do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum Directive {
    #[default]
    Continue,
    /// HUP with no payload override: tear the fleet down and re-enter.
    Restart,
    /// INT/TERM: exit the loop with the aggregate code.
    Shutdown,
}

/// Live workers spawned by this supervisor and not yet reaped.
#[derive(Debug, Default)]
pub struct ChildTable {
    children: BTreeMap<Pid, ChildKind>,
}

impl ChildTable {
    pub fn insert(&mut self, pid: Pid, kind: ChildKind) {
        self.children.insert(pid, kind);
    }

    pub fn remove(&mut self, pid: Pid) -> Option<ChildKind> {
        self.children.remove(&pid)
    }

    pub fn contains(&self, pid: Pid) -> bool {
        self.children.contains_key(&pid)
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    pub fn pids(&self) -> Vec<Pid> {
        self.children.keys().copied().collect()
    }
}

pub struct Supervisor<'h, P, S> {
    host: &'h mut PayloadHost,
    procs: P,
    signals: S,
    fleet: u32,
    children: ChildTable,
    aggregate: ExitAggregate,
    launching: bool,
    directive: Directive,
    force_reaped: bool,
}

impl<'h, P: Procs, S: SignalSource> Supervisor<'h, P, S> {
    pub fn new(
        host: &'h mut PayloadHost,
        procs: P,
        signals: S,
        fleet: u32,
        exitmode: ExitPolicy,
    ) -> Self {
        Self {
            host,
            procs,
            signals,
            fleet,
            children: ChildTable::default(),
            aggregate: ExitAggregate::new(exitmode),
            launching: true,
            directive: Directive::Continue,
            force_reaped: false,
        }
    }

    /// Drive the fleet until it drains. Returns the aggregate exit code.
    pub fn run(&mut self) -> i32 {
        info!(fleet = self.fleet, "fleet supervisor started");
        loop {
            match self.directive {
                Directive::Shutdown => break,
                Directive::Restart => {
                    info!("restarting fleet");
                    self.force_reap();
                    self.reset_for_reentry();
                }
                Directive::Continue => {}
            }

            self.admit();
            self.dispatch_signals();
            self.reap_children();
            if self.directive == Directive::Shutdown {
                break;
            }
            self.procs.sleep(QUIESCE_INTERVAL);
            if !self.launching && self.children.is_empty() {
                break;
            }
        }
        signals::restore_supervisor_defaults();
        let code = self.aggregate.code();
        info!(code, "fleet supervisor finished");
        code
    }

    /// Admission phase: launch workers until the fleet cap is reached,
    /// plus one per launch override. The worker branch of each fork runs
    /// the payload and exits; it never returns from here.
    fn admit(&mut self) {
        if !self.launching || self.fleet == 0 {
            return;
        }
        while (self.children.len() as u32) < self.fleet || self.host.launch_override() {
            let config = match self.host.worker_config() {
                Admission::Launch(config) => config,
                Admission::Refuse => return,
                Admission::Stop => {
                    info!("payload requested launch stop; draining fleet");
                    self.launching = false;
                    return;
                }
            };
            match self.procs.fork_worker() {
                Ok(Forked::Parent { child, kind }) => {
                    info!(pid = %child, "worker launched");
                    self.children.insert(child, kind);
                    self.host.spawned_worker(child, Realm::Daemon, &config);
                }
                Ok(Forked::Child { .. }) => {
                    signals::reset_worker_dispositions();
                    let code = self.host.run_worker(&config);
                    std::process::exit(code);
                }
                Err(err) => {
                    warn!("worker launch failed, halting admissions: {err}");
                    self.launching = false;
                    return;
                }
            }
        }
    }

    /// Drain pending signals and act on them at this safe point.
    fn dispatch_signals(&mut self) {
        for sig in self.signals.drain() {
            match sig {
                Sig::Chld => self.reap_children(),
                Sig::Hup => {
                    if !self.host.signal(Sig::Hup) {
                        self.directive = Directive::Restart;
                    }
                }
                Sig::Int | Sig::Term => {
                    info!(signal = %sig, "shutdown requested");
                    self.host.shutdown();
                    self.force_reap();
                    self.host.signal(sig);
                    self.directive = Directive::Shutdown;
                }
                Sig::Usr1 | Sig::Usr2 => {
                    self.host.signal(sig);
                }
            }
        }
    }

    /// Reap phase: collect every currently reapable child.
    fn reap_children(&mut self) {
        while let Some((pid, code)) = self.procs.reap() {
            match self.children.remove(pid) {
                Some(kind) => {
                    info!(%pid, code, "worker reaped");
                    self.aggregate.observe(code);
                    self.host.reaped_worker(pid, kind);
                }
                None => warn!(%pid, "reaped unknown child"),
            }
        }
    }

    /// Kill and collect every outstanding child. Latching: a second call
    /// is a no-op until the loop re-enters after a restart.
    fn force_reap(&mut self) {
        if self.force_reaped {
            return;
        }
        self.force_reaped = true;
        for pid in self.children.pids() {
            self.procs.kill_worker(pid);
        }
        let _ = self.signals.drain();
        while !self.children.is_empty() {
            self.reap_children();
            if self.children.is_empty() {
                break;
            }
            self.procs.sleep(FORCE_REAP_INTERVAL);
        }
    }

    fn reset_for_reentry(&mut self) {
        self.launching = true;
        self.force_reaped = false;
        self.aggregate.reset();
        self.directive = Directive::Continue;
    }
}

#[cfg(test)]
#[path = "supervisor_tests.rs"]
mod tests;
