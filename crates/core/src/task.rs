// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-issue task model and lifecycle state machine

use serde::{Deserialize, Serialize};

/// Identifier for a task: `{owner}/{repo}/issues/{issue_number}`.
///
/// Composed from the webhook payload so repeated deliveries for the same
/// issue land on the same task.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    pub fn compose(owner: &str, repo: &str, issue_number: u64) -> Self {
        Self(format!("{owner}/{repo}/issues/{issue_number}"))
    }

    pub fn from_string(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Split back into `(owner, repo, issue_number)` if well formed.
    pub fn parts(&self) -> Option<(&str, &str, u64)> {
        let mut it = self.0.splitn(4, '/');
        let owner = it.next()?;
        let repo = it.next()?;
        if it.next()? != "issues" {
            return None;
        }
        let number = it.next()?.parse().ok()?;
        Some((owner, repo, number))
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Task lifecycle state.
///
/// The happy path is `PendingPlanning → Planned → Executing → Completed`.
/// Any state may move to `Blocked` (manual intervention) or `Failed`
/// (terminal error). Handlers drive transitions; the store only checks
/// that the task exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    PendingPlanning,
    Planned,
    Executing,
    Completed,
    Failed,
    Blocked,
}

impl TaskState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskState::Completed | TaskState::Failed)
    }

    /// Whether the state machine permits moving to `next`.
    pub fn permits(&self, next: TaskState) -> bool {
        if matches!(next, TaskState::Blocked | TaskState::Failed) {
            return !self.is_terminal();
        }
        matches!(
            (self, next),
            (TaskState::PendingPlanning, TaskState::Planned)
                | (TaskState::Planned, TaskState::Executing)
                | (TaskState::Executing, TaskState::Completed)
                | (TaskState::Blocked, TaskState::PendingPlanning)
        )
    }
}

crate::simple_display! {
    TaskState {
        PendingPlanning => "pending_planning",
        Planned => "planned",
        Executing => "executing",
        Completed => "completed",
        Failed => "failed",
        Blocked => "blocked",
    }
}

/// One step of a plan. Order within [`Plan::steps`] is significant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanStep {
    pub id: String,
    pub title: String,
    pub details: String,
    pub done: bool,
}

/// A code-change plan produced by the planner agent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    pub problem_summary: String,
    pub constraints: Vec<String>,
    pub steps: Vec<PlanStep>,
    pub checklist: Vec<String>,
    pub file_targets: Vec<String>,
}

impl Plan {
    pub fn is_done(&self) -> bool {
        self.steps.iter().all(|s| s.done)
    }
}

/// Unit of agent work tied to one issue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub installation_id: i64,
    pub owner: String,
    pub repo: String,
    pub issue_number: u64,
    pub plan: Option<Plan>,
    pub state: TaskState,
    pub created_at_ms: u64,
    pub updated_at_ms: u64,
}

impl Task {
    /// New task in the initial `PendingPlanning` state.
    pub fn new(
        installation_id: i64,
        owner: impl Into<String>,
        repo: impl Into<String>,
        issue_number: u64,
        now_ms: u64,
    ) -> Self {
        let owner = owner.into();
        let repo = repo.into();
        Self {
            id: TaskId::compose(&owner, &repo, issue_number),
            installation_id,
            owner,
            repo,
            issue_number,
            plan: None,
            state: TaskState::PendingPlanning,
            created_at_ms: now_ms,
            updated_at_ms: now_ms,
        }
    }

    /// Move to `next`, stamping `updated_at_ms`.
    ///
    /// Callers are responsible for legality; see [`TaskState::permits`].
    pub fn transition(&mut self, next: TaskState, now_ms: u64) {
        self.state = next;
        self.updated_at_ms = now_ms;
    }
}

#[cfg(test)]
#[path = "task_tests.rs"]
mod tests;
