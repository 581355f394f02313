// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[test]
fn task_id_compose_and_parts() {
    let id = TaskId::compose("acme", "proj", 42);
    assert_eq!(id.as_str(), "acme/proj/issues/42");
    assert_eq!(id.parts(), Some(("acme", "proj", 42)));
}

#[test]
fn task_id_parts_rejects_malformed() {
    assert!(TaskId::from_string("acme/proj/pulls/42").parts().is_none());
    assert!(TaskId::from_string("acme/proj").parts().is_none());
    assert!(TaskId::from_string("acme/proj/issues/notanumber").parts().is_none());
}

#[parameterized(
    plan = { TaskState::PendingPlanning, TaskState::Planned, true },
    execute = { TaskState::Planned, TaskState::Executing, true },
    complete = { TaskState::Executing, TaskState::Completed, true },
    unblock = { TaskState::Blocked, TaskState::PendingPlanning, true },
    skip_planning = { TaskState::PendingPlanning, TaskState::Executing, false },
    rewind = { TaskState::Executing, TaskState::Planned, false },
    reopen_completed = { TaskState::Completed, TaskState::Executing, false },
)]
fn state_machine_transitions(from: TaskState, to: TaskState, allowed: bool) {
    assert_eq!(from.permits(to), allowed);
}

#[parameterized(
    pending = { TaskState::PendingPlanning },
    planned = { TaskState::Planned },
    executing = { TaskState::Executing },
    blocked = { TaskState::Blocked },
)]
fn any_live_state_may_fail_or_block(state: TaskState) {
    assert!(state.permits(TaskState::Failed));
    assert!(state.permits(TaskState::Blocked));
}

#[test]
fn terminal_states_permit_nothing() {
    assert!(!TaskState::Completed.permits(TaskState::Failed));
    assert!(!TaskState::Failed.permits(TaskState::Blocked));
}

#[test]
fn new_task_starts_pending() {
    let task = Task::new(7, "acme", "proj", 42, 1_000);
    assert_eq!(task.id.as_str(), "acme/proj/issues/42");
    assert_eq!(task.state, TaskState::PendingPlanning);
    assert!(task.plan.is_none());
    assert_eq!(task.created_at_ms, 1_000);
}

#[test]
fn transition_stamps_updated_at() {
    let mut task = Task::new(7, "acme", "proj", 42, 1_000);
    task.transition(TaskState::Planned, 2_000);
    assert_eq!(task.state, TaskState::Planned);
    assert_eq!(task.updated_at_ms, 2_000);
    assert_eq!(task.created_at_ms, 1_000);
}

#[test]
fn plan_is_done_when_all_steps_done() {
    let mut plan = Plan {
        problem_summary: "fix the bug".into(),
        constraints: vec!["keep API stable".into()],
        steps: vec![
            PlanStep { id: "1".into(), title: "reproduce".into(), details: String::new(), done: true },
            PlanStep { id: "2".into(), title: "patch".into(), details: String::new(), done: false },
        ],
        checklist: vec!["tests pass".into()],
        file_targets: vec!["src/lib.rs".into()],
    };
    assert!(!plan.is_done());
    plan.steps[1].done = true;
    assert!(plan.is_done());
}

#[test]
fn plan_serde_preserves_order() {
    let plan = Plan {
        problem_summary: "s".into(),
        constraints: vec!["c1".into(), "c2".into()],
        steps: vec![
            PlanStep { id: "a".into(), title: "first".into(), details: String::new(), done: false },
            PlanStep { id: "b".into(), title: "second".into(), details: String::new(), done: false },
        ],
        checklist: vec![],
        file_targets: vec!["x".into(), "y".into()],
    };
    let json = serde_json::to_string(&plan).unwrap();
    let parsed: Plan = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, plan);
    assert_eq!(parsed.steps[0].id, "a");
    assert_eq!(parsed.file_targets, vec!["x", "y"]);
}
