// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Webhook intake boundary

use crate::payload::{PlanRequest, GENERATE_PLAN};
use mend_engine::audit_log::AuditLog;
use mend_engine::dispatch::{DispatchOutcome, Dispatcher};
use mend_engine::error::{DispatchError, StoreError};
use mend_engine::task_store::TaskStore;
use mend_core::{Clock, CorrelationId, Job, JobId, Task, TaskId};
use serde::Deserialize;
use std::sync::Arc;
use thiserror::Error;

/// Issues carrying this label enter the pipeline.
pub const TRIGGER_LABEL: &str = "copilot-assisted";

/// Deserialized issue event, the shape the HTTP shell hands over.
#[derive(Debug, Clone, Deserialize)]
pub struct IssueEvent {
    pub action: String,
    #[serde(default)]
    pub label: Option<Label>,
    pub issue: Issue,
    pub repository: RepositoryInfo,
    pub installation: Installation,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Label {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Issue {
    pub number: u64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub body: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RepositoryInfo {
    pub name: String,
    pub full_name: String,
    pub owner: Owner,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Owner {
    pub login: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Installation {
    pub id: i64,
}

/// What intake did with an event. The HTTP shell answers 200 in every
/// case; semantic rejections are audit-only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookOutcome {
    /// Event did not qualify (wrong action or label).
    Ignored { reason: String },
    /// A task for this issue already exists; nothing new was started.
    AlreadyTracked { task_id: TaskId },
    /// Task created and planning job queued.
    Dispatched { task_id: TaskId, job_id: JobId },
    /// A planning job for this issue is already in flight.
    Deduplicated { task_id: TaskId },
    /// The job queue refused the work.
    Rejected { task_id: TaskId, reason: String },
}

/// Errors intake cannot absorb (store or dispatch plumbing).
#[derive(Debug, Error)]
pub enum WebhookError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
    #[error("payload serialization failed: {0}")]
    Payload(#[from] serde_json::Error),
}

/// Turns qualifying issue events into tasks and planning jobs.
pub struct WebhookHandler<C: Clock> {
    tasks: Arc<dyn TaskStore>,
    dispatcher: Arc<Dispatcher<C>>,
    audit: AuditLog<C>,
    clock: C,
    /// Retry budget stamped onto dispatched jobs (the policy default).
    max_retries: u32,
}

impl<C: Clock> WebhookHandler<C> {
    pub fn new(
        tasks: Arc<dyn TaskStore>,
        dispatcher: Arc<Dispatcher<C>>,
        audit: AuditLog<C>,
        clock: C,
        max_retries: u32,
    ) -> Self {
        Self { tasks, dispatcher, audit, clock, max_retries }
    }

    /// Process one delivery. `delivery_id` is the platform's delivery
    /// guid; it doubles as the correlation id for everything the event
    /// causes.
    pub fn handle(
        &self,
        event: &IssueEvent,
        delivery_id: &str,
    ) -> Result<WebhookOutcome, WebhookError> {
        let correlation = if delivery_id.is_empty() {
            CorrelationId::new()
        } else {
            CorrelationId::from_string(delivery_id)
        };
        self.audit.webhook_received(delivery_id, &event.action, &correlation);

        if event.action != "labeled" {
            let reason = format!("action {} does not trigger", event.action);
            self.audit.webhook_ignored(&reason, &correlation);
            return Ok(WebhookOutcome::Ignored { reason });
        }
        let label = event.label.as_ref().map(|l| l.name.as_str()).unwrap_or_default();
        if label != TRIGGER_LABEL {
            let reason = format!("label {label:?} does not trigger");
            self.audit.webhook_ignored(&reason, &correlation);
            return Ok(WebhookOutcome::Ignored { reason });
        }

        let owner = &event.repository.owner.login;
        let repo = &event.repository.name;
        let issue_number = event.issue.number;
        let task_id = TaskId::compose(owner, repo, issue_number);

        if self.tasks.get(&task_id)?.is_some() {
            self.audit.webhook_ignored("task already tracked", &correlation);
            return Ok(WebhookOutcome::AlreadyTracked { task_id });
        }

        let now_ms = self.clock.epoch_ms();
        let task = Task::new(event.installation.id, owner.clone(), repo.clone(), issue_number, now_ms);
        match self.tasks.create(task) {
            Ok(()) => {}
            // Lost a race with a concurrent delivery for the same issue.
            Err(StoreError::AlreadyExists(_)) => {
                return Ok(WebhookOutcome::AlreadyTracked { task_id });
            }
            Err(error) => return Err(error.into()),
        }
        tracing::info!(task = %task_id, "task created");

        let request = PlanRequest {
            task_id: task_id.clone(),
            installation_id: event.installation.id,
            owner: owner.clone(),
            repo: repo.clone(),
            issue_number,
            issue_title: event.issue.title.clone(),
            issue_body: event.issue.body.clone(),
            webhook_id: delivery_id.to_string(),
        };
        let job = Job::new(GENERATE_PLAN, request.to_bytes()?, &self.clock)
            .with_idempotency_key(task_id.as_str())
            .with_correlation(correlation)
            .with_source("Webhook")
            .with_max_retries(self.max_retries);

        match self.dispatcher.dispatch(job)? {
            DispatchOutcome::Accepted { job_id } => {
                Ok(WebhookOutcome::Dispatched { task_id, job_id })
            }
            DispatchOutcome::Deduplicated { .. } => Ok(WebhookOutcome::Deduplicated { task_id }),
            DispatchOutcome::RejectedQueueFull { .. } => {
                Ok(WebhookOutcome::Rejected { task_id, reason: "queue full".to_string() })
            }
            DispatchOutcome::RejectedUnknownType { job_type } => Ok(WebhookOutcome::Rejected {
                task_id,
                reason: format!("no handler for {job_type}"),
            }),
        }
    }
}

#[cfg(test)]
#[path = "webhook_tests.rs"]
mod tests;
