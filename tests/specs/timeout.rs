// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! S4: a handler overrunning its deadline fails with a timeout message.

use super::prelude::*;
use mend_core::JobState;
use mend_service::webhook::WebhookOutcome;
use std::time::Duration;

#[tokio::test(start_paused = true)]
async fn slow_planner_times_out() {
    let h = harness(config_toml(
        r#"
[background]
plan_timeout_seconds = 1

[background.retry]
enabled = false
"#,
    ));
    h.agent.set_delay(Duration::from_secs(5));
    h.runtime.start();

    let outcome = h.runtime.webhook().handle(&labeled_event("acme", "proj", 42), "d-1").unwrap();
    let WebhookOutcome::Dispatched { job_id, .. } = outcome else {
        panic!("expected dispatch");
    };

    let status = wait_for_terminal_job(&h, job_id).await;
    assert_eq!(status.state, JobState::Failed);
    let message = status.error_message.unwrap_or_default();
    assert!(message.contains("timed out"), "message: {message}");
    assert!(message.contains("1 seconds"), "message: {message}");

    h.runtime.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn fast_handler_beats_the_deadline() {
    let h = harness(config_toml("[background]\nplan_timeout_seconds = 60"));
    h.runtime.start();

    h.runtime.webhook().handle(&labeled_event("acme", "proj", 7), "d-1").unwrap();
    let task_id = mend_core::TaskId::compose("acme", "proj", 7);
    wait_for_task_state(&h, &task_id, mend_core::TaskState::Completed).await;

    h.runtime.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn zero_timeout_means_no_deadline() {
    let h = harness(config_toml("[background]\nplan_timeout_seconds = 0"));
    h.agent.set_delay(Duration::from_secs(30));
    h.runtime.start();

    h.runtime.webhook().handle(&labeled_event("acme", "proj", 8), "d-1").unwrap();
    let task_id = mend_core::TaskId::compose("acme", "proj", 8);
    wait_for_task_state(&h, &task_id, mend_core::TaskState::Completed).await;

    h.runtime.shutdown().await;
}
