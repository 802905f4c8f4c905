// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle specs: start/stop/status round trips, foreground
//! mode, stale-lock recovery, and the watchdog flag.

use crate::prelude::*;

/// A daemon whose payload blocks until the stop ladder kills it.
fn blocking_daemon() -> App {
    App::new().env("WARDEN_APP_BLOCK", "1")
}

#[test]
fn status_before_start_reports_not_running() {
    let app = App::new();
    app.run(&["status"]).code(1).stdout_has("not running");
}

#[test]
fn foreground_single_halt_exits_zero_without_pidfile() {
    let app = App::new().env("WARDEN_APP_FOREGROUND", "1");
    app.run(&["start"]).code(0);
    assert!(!app.pidfile().exists(), "foreground mode must not create a pidfile");
    assert_eq!(app.journal_count("run single"), 1);
}

#[test]
fn background_start_detaches_and_status_sees_it() {
    let app = blocking_daemon();
    app.run(&["start"]).success();

    assert!(wait_for(WAIT_MAX_MS, || app.pidfile().exists()), "pidfile appears");
    let pid = app.holder().expect("pid recorded");
    assert!(pid_alive(pid), "daemon process is alive");

    app.run(&["status"]).code(0);
    app.run(&["stop"]).code(0);
    app.run(&["status"]).code(1);
    assert!(!app.pidfile().exists(), "stop removes the pidfile");
    assert!(wait_for(WAIT_MAX_MS, || !pid_alive(pid)), "daemon is gone after stop");
}

#[test]
fn clean_halt_releases_the_lock_by_itself() {
    let app = App::new().env("WARDEN_APP_SLEEP_MS", "500");
    app.run(&["start"]).success();

    assert!(wait_for(WAIT_MAX_MS, || app.pidfile().exists()), "pidfile during the run");
    assert!(
        wait_for(WAIT_MAX_MS, || !app.pidfile().exists()),
        "clean halt must release the lock"
    );
    app.run(&["status"]).code(1);
}

#[test]
fn stop_without_daemon_fails() {
    let app = App::new();
    app.run(&["stop"]).code(1);
}

#[test]
fn stale_lock_is_recovered_on_status() {
    let app = App::new();
    std::fs::write(app.pidfile(), "4194999\n").unwrap();

    app.run(&["status"]).code(1);
    assert!(!app.pidfile().exists(), "stale pidfile removed");
}

#[test]
fn start_proceeds_over_stale_lock() {
    let app = App::new().env("WARDEN_APP_FOREGROUND", "1");
    std::fs::write(app.pidfile(), "4194999\n").unwrap();

    app.run(&["start"]).code(0);
    assert!(!app.pidfile().exists());
}

#[test]
fn second_start_fails_unless_watchdog() {
    let app = blocking_daemon();
    app.run(&["start"]).success();
    assert!(wait_for(WAIT_MAX_MS, || app.pidfile().exists()));

    app.run(&["start"]).code(1).stdout_has("already running");
    app.run(&["start", "-w"]).code(0).stdout_has("already running");
    app.run(&["start", "--watchdog"]).code(0);

    app.run(&["stop"]).code(0);
}

#[test]
fn restart_replaces_the_running_daemon() {
    let app = blocking_daemon();
    app.run(&["start"]).success();
    assert!(wait_for(WAIT_MAX_MS, || app.holder().is_some()));
    let first = app.holder().unwrap();

    app.run(&["restart"]).code(0);
    assert!(wait_for(WAIT_MAX_MS, || app.holder().is_some_and(|pid| pid != first)));
    let second = app.holder().unwrap();
    assert!(pid_alive(second));
    assert!(!pid_alive(first), "old daemon is gone after restart");

    app.run(&["stop"]).code(0);
}

#[test]
fn restart_when_stopped_just_starts() {
    let app = blocking_daemon();
    app.run(&["restart"]).code(0);
    assert!(wait_for(WAIT_MAX_MS, || app.pidfile().exists()));
    app.run(&["stop"]).code(0);
}

/// An unrelated process that traps TERM: the stop ladder must escalate
/// to KILL and still report success.
///
/// The stand-in is double-spawned so it reparents to init; a direct
/// child of the test binary would linger as a zombie after SIGKILL and
/// read as alive to the zero-signal probe.
#[test]
fn stop_escalates_to_kill_for_unresponsive_process() {
    let app = App::new();
    let output = std::process::Command::new("sh")
        .args(["-c", "sh -c 'trap \"\" TERM; while :; do sleep 0.1; done' >/dev/null 2>&1 & echo $!"])
        .output()
        .unwrap();
    let pid: i32 = String::from_utf8_lossy(&output.stdout).trim().parse().unwrap();
    assert!(pid_alive(pid), "stand-in process is running");
    std::fs::write(app.pidfile(), format!("{pid}\n")).unwrap();

    app.run(&["stop"]).code(0);
    assert!(wait_for(WAIT_MAX_MS, || !pid_alive(pid)), "process killed by escalation");
    assert!(!app.pidfile().exists(), "lock cleared once the pid is dead");
}
