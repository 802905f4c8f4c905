// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fleet supervision specs: steady-state capacity, orderly teardown on
//! TERM, and worst-case exit aggregation.

use crate::prelude::*;

#[test]
fn fleet_holds_steady_at_capacity_and_drains_on_stop() {
    let app = App::new()
        .env("WARDEN_APP_MODE", "fleet")
        .env("WARDEN_APP_FLEET", "3")
        .env("WARDEN_APP_BLOCK", "1");
    app.run(&["start"]).success();

    assert!(
        wait_for(WAIT_MAX_MS, || app.journal_count("spawned") == 3),
        "three workers launch; journal: {:?}",
        app.journal()
    );

    // Steady state: a couple of supervisor ticks later the fleet has
    // not grown past the cap.
    std::thread::sleep(std::time::Duration::from_millis(2500));
    assert_eq!(app.journal_count("spawned"), 3, "capacity cap holds");
    let workers = app.spawned_pids();
    assert!(workers.iter().all(|&pid| pid_alive(pid)), "workers are running");
    app.run(&["status"]).code(0);

    app.run(&["stop"]).code(0);
    assert!(
        wait_for(WAIT_MAX_MS, || workers.iter().all(|&pid| !pid_alive(pid))),
        "all workers reaped after stop"
    );
    assert!(wait_for(WAIT_MAX_MS, || app.journal_count("reaped") == 3));
    app.run(&["status"]).code(1);
}

#[test]
fn term_teardown_runs_shutdown_hook_before_reaping() {
    let app = App::new()
        .env("WARDEN_APP_MODE", "fleet")
        .env("WARDEN_APP_FLEET", "2")
        .env("WARDEN_APP_BLOCK", "1");
    app.run(&["start"]).success();
    assert!(wait_for(WAIT_MAX_MS, || app.journal_count("spawned") == 2));

    app.run(&["stop"]).code(0);
    assert!(wait_for(WAIT_MAX_MS, || app.journal_count("reaped") == 2));

    let journal = app.journal();
    let shutdown = journal.iter().position(|line| line == "shutdown");
    let first_reap = journal.iter().position(|line| line.starts_with("reaped"));
    assert!(shutdown.is_some(), "shutdown hook ran; journal: {journal:?}");
    assert!(shutdown < first_reap, "shutdown precedes reaping; journal: {journal:?}");
}

/// Worst-case aggregation, run in the foreground so the supervisor's
/// exit code is directly observable: workers return reload (1) and
/// exit (8); the fleet exit code is 8.
#[test]
fn worst_case_aggregation_surfaces_largest_code() {
    let app = App::new()
        .env("WARDEN_APP_FOREGROUND", "1")
        .env("WARDEN_APP_MODE", "fleet")
        .env("WARDEN_APP_FLEET", "2")
        .env("WARDEN_APP_EXITMODE", "worst-case")
        .env("WARDEN_APP_OUTCOMES", "reload,exit");

    app.run(&["start"]).code(8);
    assert_eq!(app.journal_count("spawned"), 2);
    assert_eq!(app.journal_count("reaped"), 2);
    assert_eq!(app.journal_count("dismiss"), 1, "dismiss runs after the loop");
}

/// Same scripted fleet under the success policy exits 0.
#[test]
fn success_policy_ignores_worker_failures() {
    let app = App::new()
        .env("WARDEN_APP_FOREGROUND", "1")
        .env("WARDEN_APP_MODE", "fleet")
        .env("WARDEN_APP_FLEET", "2")
        .env("WARDEN_APP_OUTCOMES", "reload,exit");

    app.run(&["start"]).code(0);
    assert_eq!(app.journal_count("reaped"), 2);
}

/// A reaped worker frees its slot: with a one-worker fleet and three
/// scripted outcomes, workers run one after another.
#[test]
fn reaped_workers_are_replaced_up_to_the_cap() {
    let app = App::new()
        .env("WARDEN_APP_FOREGROUND", "1")
        .env("WARDEN_APP_MODE", "fleet")
        .env("WARDEN_APP_FLEET", "1")
        .env("WARDEN_APP_OUTCOMES", "halt,halt,halt");

    app.run(&["start"]).code(0);
    assert_eq!(app.journal_count("spawned"), 3);
    assert_eq!(app.journal_count("reaped"), 3);
    assert_eq!(app.journal_count("run"), 3);
}
