// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! S1: a labeled webhook plans, executes, and opens a draft PR.

use super::prelude::*;
use mend_core::{TaskId, TaskState};
use mend_service::webhook::WebhookOutcome;

#[tokio::test(start_paused = true)]
async fn happy_plan_and_execute() {
    let h = harness(config_toml(""));
    h.runtime.start();

    let outcome = h.runtime.webhook().handle(&labeled_event("acme", "proj", 42), "d-1").unwrap();
    let task_id = TaskId::compose("acme", "proj", 42);
    assert!(
        matches!(outcome, WebhookOutcome::Dispatched { task_id: ref t, .. } if *t == task_id)
    );

    // The task starts in planning and ends completed.
    let task = h.runtime.tasks().get(&task_id).unwrap().unwrap();
    assert!(matches!(
        task.state,
        TaskState::PendingPlanning | TaskState::Planned | TaskState::Executing | TaskState::Completed
    ));
    wait_for_task_state(&h, &task_id, TaskState::Completed).await;

    // Planner ran once, each step executed once in order.
    assert_eq!(h.agent.plan_calls(), 1);
    assert_eq!(h.agent.step_calls(), vec!["step-1".to_string(), "step-2".to_string()]);

    // One draft PR on the expected branch, announced on the issue.
    let prs = h.platform.pull_requests();
    assert_eq!(prs.len(), 1);
    assert!(prs[0].draft);
    assert_eq!(prs[0].head, "mend/issue-42");
    let comments = h.platform.comments();
    assert_eq!(comments.len(), 1);
    assert_eq!(comments[0].0, 42);
    assert!(comments[0].1.contains(&prs[0].url));

    // The container was cleaned up.
    assert_eq!(h.containers.cleaned().len(), 1);

    // Both jobs reached Completed and released their dedup keys.
    let statuses = h.runtime.statuses().list_by_state(mend_core::JobState::Completed, 0, 10).unwrap();
    assert_eq!(statuses.len(), 2);

    h.runtime.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn execute_job_carries_lineage_from_plan_job() {
    let h = harness(config_toml(""));
    h.runtime.start();

    h.runtime.webhook().handle(&labeled_event("acme", "proj", 9), "delivery-guid-7").unwrap();
    let task_id = TaskId::compose("acme", "proj", 9);
    wait_for_task_state(&h, &task_id, TaskState::Completed).await;

    let completed =
        h.runtime.statuses().list_by_state(mend_core::JobState::Completed, 0, 10).unwrap();
    let plan_status = completed.iter().find(|s| s.job_type == "generate_plan").unwrap();
    let exec_status = completed.iter().find(|s| s.job_type == "execute_plan").unwrap();

    assert_eq!(exec_status.parent_id, Some(plan_status.job_id));
    // Correlation id from the delivery guid flows through both jobs.
    assert_eq!(
        exec_status.correlation_id.as_ref().map(|c| c.as_str()),
        Some("delivery-guid-7")
    );
    assert_eq!(plan_status.correlation_id, exec_status.correlation_id);

    h.runtime.shutdown().await;
}
