// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! S2: duplicate webhooks collapse to one in-flight job.

use super::prelude::*;
use mend_core::{TaskId, TaskState};
use mend_service::webhook::WebhookOutcome;

#[tokio::test(start_paused = true)]
async fn rapid_duplicate_webhooks_yield_one_job() {
    let h = harness(config_toml(""));
    // Processor intentionally not started: both deliveries land while
    // the first job is still queued.
    let first = h.runtime.webhook().handle(&labeled_event("acme", "proj", 42), "d-1").unwrap();
    let second = h.runtime.webhook().handle(&labeled_event("acme", "proj", 42), "d-2").unwrap();

    assert!(matches!(first, WebhookOutcome::Dispatched { .. }));
    // The task already exists, so the second delivery is absorbed
    // before dispatch is even attempted.
    assert!(matches!(second, WebhookOutcome::AlreadyTracked { .. }));
    assert_eq!(h.runtime.queue_depth(), 1);

    h.runtime.start();
    let task_id = TaskId::compose("acme", "proj", 42);
    wait_for_task_state(&h, &task_id, TaskState::Completed).await;
    assert_eq!(h.agent.plan_calls(), 1);
    assert_eq!(h.platform.pull_requests().len(), 1);

    h.runtime.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn dispatcher_level_dedup_reports_existing_job() {
    use mend_core::Job;

    let h = harness(config_toml(""));
    // Two jobs with the same idempotency key, dispatched directly.
    let job1 = Job::new("generate_plan", b"{}".to_vec(), &h.clock)
        .with_idempotency_key("same-key")
        .with_source("Test");
    let job2 = Job::new("generate_plan", b"{}".to_vec(), &h.clock)
        .with_idempotency_key("same-key")
        .with_source("Test");
    let id1 = job1.id;

    let first = h.runtime.dispatcher().dispatch(job1).unwrap();
    let second = h.runtime.dispatcher().dispatch(job2).unwrap();

    assert!(first.is_accepted());
    assert!(
        matches!(second, mend_engine::dispatch::DispatchOutcome::Deduplicated { existing } if existing == id1)
    );
    assert_eq!(h.runtime.queue_depth(), 1);
}

#[tokio::test(start_paused = true)]
async fn distinct_issues_are_not_deduplicated() {
    let h = harness(config_toml(""));
    h.runtime.webhook().handle(&labeled_event("acme", "proj", 1), "d-1").unwrap();
    h.runtime.webhook().handle(&labeled_event("acme", "proj", 2), "d-2").unwrap();
    assert_eq!(h.runtime.queue_depth(), 2);
}
