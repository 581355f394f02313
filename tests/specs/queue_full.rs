// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! S5: a full queue rejects work without losing track of it.

use super::prelude::*;
use mend_core::JobState;
use mend_service::webhook::WebhookOutcome;

#[tokio::test(start_paused = true)]
async fn second_job_is_rejected_when_queue_is_full() {
    let h = harness(config_toml("[background]\nmax_queue_size = 1"));
    // Processor not started, so the first job occupies the only slot.
    let first = h.runtime.webhook().handle(&labeled_event("acme", "proj", 1), "d-1").unwrap();
    assert!(matches!(first, WebhookOutcome::Dispatched { .. }));

    let second = h.runtime.webhook().handle(&labeled_event("acme", "proj", 2), "d-2").unwrap();
    let WebhookOutcome::Rejected { task_id, reason } = second else {
        panic!("expected rejection, got {second:?}");
    };
    assert_eq!(reason, "queue full");

    // The rejected job's status is Failed with the overflow reason.
    let failed = h.runtime.statuses().list_by_state(JobState::Failed, 0, 10).unwrap();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].error_message.as_deref(), Some("queue full"));
    // Its idempotency key was released, so a later dispatch can retry.
    assert_eq!(task_id.as_str(), "acme/proj/issues/2");
    assert_eq!(h.runtime.queue_depth(), 1);
}

#[tokio::test(start_paused = true)]
async fn queue_drains_and_accepts_again() {
    let h = harness(config_toml("[background]\nmax_queue_size = 1"));
    h.runtime.webhook().handle(&labeled_event("acme", "proj", 1), "d-1").unwrap();
    let rejected = h.runtime.webhook().handle(&labeled_event("acme", "proj", 2), "d-2").unwrap();
    assert!(matches!(rejected, WebhookOutcome::Rejected { .. }));

    h.runtime.start();
    let first = mend_core::TaskId::compose("acme", "proj", 1);
    wait_for_task_state(&h, &first, mend_core::TaskState::Completed).await;

    // With the queue drained, a fresh issue sails through.
    let third = h.runtime.webhook().handle(&labeled_event("acme", "proj", 3), "d-3").unwrap();
    assert!(matches!(third, WebhookOutcome::Dispatched { .. }));
    let task3 = mend_core::TaskId::compose("acme", "proj", 3);
    wait_for_task_state(&h, &task3, mend_core::TaskState::Completed).await;

    h.runtime.shutdown().await;
}
