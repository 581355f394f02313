// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers for use across crates.
//!
//! Gated behind `#[cfg(any(test, feature = "test-support"))]`.

use crate::clock::Clock;
use crate::job::Job;
use crate::task::{Plan, PlanStep, Task, TaskState};

// ── Proptest strategies ─────────────────────────────────────────────────

/// Proptest strategies for core job types.
pub mod strategies {
    use crate::status::JobState;
    use proptest::prelude::*;

    pub fn arb_job_state() -> impl Strategy<Value = JobState> {
        prop_oneof![
            Just(JobState::Queued),
            Just(JobState::Processing),
            Just(JobState::Completed),
            Just(JobState::Failed),
            Just(JobState::Cancelled),
            Just(JobState::Retried),
            Just(JobState::DeadLetter),
        ]
    }

    pub fn arb_priority() -> impl Strategy<Value = u8> {
        0u8..4
    }
}

// ── Factory functions ───────────────────────────────────────────────────

/// Job with the given type and an empty JSON payload.
pub fn test_job(job_type: &str, clock: &impl Clock) -> Job {
    Job::new(job_type, b"{}".to_vec(), clock).with_source("Test")
}

/// Task for `acme/proj` issue `issue_number`.
pub fn test_task(issue_number: u64, now_ms: u64) -> Task {
    Task::new(7, "acme", "proj", issue_number, now_ms)
}

/// Task already advanced to `state`, carrying a two-step plan when past
/// planning.
pub fn test_task_in(state: TaskState, issue_number: u64, now_ms: u64) -> Task {
    let mut task = test_task(issue_number, now_ms);
    if !matches!(state, TaskState::PendingPlanning) {
        task.plan = Some(test_plan());
    }
    task.state = state;
    task
}

/// Two-step plan touching one file.
pub fn test_plan() -> Plan {
    Plan {
        problem_summary: "widget counter drifts under load".to_string(),
        constraints: vec!["keep the public API unchanged".to_string()],
        steps: vec![
            PlanStep {
                id: "step-1".to_string(),
                title: "guard the counter".to_string(),
                details: "wrap increments in the existing lock".to_string(),
                done: false,
            },
            PlanStep {
                id: "step-2".to_string(),
                title: "add a regression test".to_string(),
                details: "concurrent increments keep the total".to_string(),
                done: false,
            },
        ],
        checklist: vec!["tests pass".to_string()],
        file_targets: vec!["src/counter.rs".to_string()],
    }
}
