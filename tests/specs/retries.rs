// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! S3: retry exhaustion dead-letters with the original error.

use super::prelude::*;
use mend_adapters::agent::AgentError;
use mend_core::{JobState, TaskId};
use mend_service::webhook::WebhookOutcome;

fn retry_config() -> mend_service::Config {
    config_toml(
        r#"
[background.retry]
enabled = true
max_retries = 2
base_delay_ms = 50
max_delay_ms = 1000
strategy = "constant"
min_jitter = 0.0
max_jitter = 0.0
"#,
    )
}

#[tokio::test(start_paused = true)]
async fn plan_failures_exhaust_into_dead_letter() {
    let h = harness(retry_config());
    // Planner fails on every attempt: initial + 2 retries.
    for _ in 0..3 {
        h.agent.push_failure(AgentError::Provider("boom".into()));
    }
    h.runtime.start();

    let outcome = h.runtime.webhook().handle(&labeled_event("acme", "proj", 42), "d-1").unwrap();
    let WebhookOutcome::Dispatched { job_id, .. } = outcome else {
        panic!("expected dispatch, got {outcome:?}");
    };

    let status = wait_for_terminal_job(&h, job_id).await;
    assert_eq!(status.state, JobState::DeadLetter);
    assert_eq!(status.retry_count, 2);
    assert!(status.error_message.as_deref().unwrap_or_default().contains("boom"));
    // Three invocations: one initial, two retries.
    assert_eq!(h.agent.plan_calls(), 3);

    h.runtime.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn transient_failure_recovers_within_budget() {
    let h = harness(retry_config());
    // Only the first attempt fails.
    h.agent.push_failure(AgentError::Provider("hiccup".into()));
    h.runtime.start();

    h.runtime.webhook().handle(&labeled_event("acme", "proj", 7), "d-1").unwrap();
    let task_id = TaskId::compose("acme", "proj", 7);
    wait_for_task_state(&h, &task_id, mend_core::TaskState::Completed).await;

    assert_eq!(h.agent.plan_calls(), 2);
    // The plan job records exactly one retry.
    let plan_status = h
        .runtime
        .statuses()
        .list_by_type("generate_plan", 0, 10)
        .unwrap()
        .into_iter()
        .next()
        .unwrap();
    assert_eq!(plan_status.retry_count, 1);
    assert_eq!(plan_status.state, JobState::Completed);

    h.runtime.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn retry_count_never_exceeds_budget() {
    let h = harness(retry_config());
    for _ in 0..10 {
        h.agent.push_failure(AgentError::Provider("boom".into()));
    }
    h.runtime.start();

    let outcome = h.runtime.webhook().handle(&labeled_event("acme", "proj", 1), "d-1").unwrap();
    let WebhookOutcome::Dispatched { job_id, .. } = outcome else {
        panic!("expected dispatch");
    };
    let status = wait_for_terminal_job(&h, job_id).await;
    assert!(status.retry_count <= status.max_retries);

    h.runtime.shutdown().await;
}
