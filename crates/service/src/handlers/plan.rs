// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Planning phase: issue → plan → follow-up execute job

use crate::payload::{ExecuteRequest, PlanRequest, EXECUTE_PLAN, GENERATE_PLAN};
use async_trait::async_trait;
use mend_adapters::agent::{AgentAdapter, IssueContext};
use mend_core::{AuditEvent, AuditKind, Clock, Job, TaskState};
use mend_engine::audit_log::AuditLog;
use mend_engine::dispatch::{DispatchOutcome, Dispatcher};
use mend_engine::handler::{JobContext, JobHandler, JobResult};
use mend_engine::task_store::TaskStore;
use std::sync::Arc;

/// Generates a plan for a labeled issue and queues its execution.
///
/// Re-runs are idempotent: a retry that finds the plan already stored
/// skips the agent call and only re-dispatches the follow-up, which the
/// dedup registry collapses.
pub struct GeneratePlanJobHandler<C: Clock, A: AgentAdapter> {
    tasks: Arc<dyn TaskStore>,
    dispatcher: Arc<Dispatcher<C>>,
    agent: Arc<A>,
    audit: AuditLog<C>,
    clock: C,
}

impl<C: Clock, A: AgentAdapter> GeneratePlanJobHandler<C, A> {
    pub fn new(
        tasks: Arc<dyn TaskStore>,
        dispatcher: Arc<Dispatcher<C>>,
        agent: Arc<A>,
        audit: AuditLog<C>,
        clock: C,
    ) -> Self {
        Self { tasks, dispatcher, agent, audit, clock }
    }
}

#[async_trait]
impl<C: Clock, A: AgentAdapter> JobHandler for GeneratePlanJobHandler<C, A> {
    fn job_type(&self) -> &str {
        GENERATE_PLAN
    }

    async fn execute(&self, job: &Job, ctx: JobContext) -> JobResult {
        let request = match PlanRequest::from_bytes(&job.payload) {
            Ok(request) => request,
            Err(error) => return JobResult::permanent(format!("malformed payload: {error}")),
        };

        let mut task = match self.tasks.get(&request.task_id) {
            Ok(Some(task)) => task,
            Ok(None) => {
                return JobResult::permanent(format!("task not found: {}", request.task_id))
            }
            Err(error) => return JobResult::retryable(format!("task store: {error}")),
        };

        if task.plan.is_none() {
            if ctx.cancel.is_cancelled() {
                return JobResult::retryable("cancelled before planning");
            }
            let issue = IssueContext {
                owner: request.owner.clone(),
                repo: request.repo.clone(),
                issue_number: request.issue_number,
                title: request.issue_title.clone(),
                body: request.issue_body.clone(),
            };
            let started = self.clock.now();
            let outcome = self.agent.plan(&issue).await;
            let duration_ms =
                self.clock.now().saturating_duration_since(started).as_millis() as u64;

            let mut event =
                AuditEvent::new(AuditKind::PlanGeneration, format!("plan for {}", task.id))
                    .with_correlation(ctx.correlation_id.clone())
                    .with_target(task.id.to_string())
                    .with_duration_ms(duration_ms);
            let plan = match outcome {
                Ok(plan) => {
                    event = event
                        .with_result("success")
                        .with_data("steps", plan.steps.len())
                        .with_data("file_targets", plan.file_targets.len());
                    self.audit.record(event);
                    plan
                }
                Err(error) => {
                    self.audit.record(event.with_result("failure").with_error(error.to_string()));
                    let message = format!("plan generation failed: {error}");
                    return if error.is_transient() {
                        JobResult::retryable(message)
                    } else {
                        JobResult::permanent(message)
                    };
                }
            };

            let from = task.state;
            task.plan = Some(plan);
            task.transition(TaskState::Planned, self.clock.epoch_ms());
            if let Err(error) = self.tasks.update(task.clone()) {
                return JobResult::retryable(format!("task store: {error}"));
            }
            self.audit.task_state_transition(
                &task.id,
                from,
                TaskState::Planned,
                ctx.correlation_id.clone(),
            );
        }

        let follow_up = ExecuteRequest {
            task_id: request.task_id.clone(),
            installation_id: request.installation_id,
            owner: request.owner.clone(),
            repo: request.repo.clone(),
            issue_number: request.issue_number,
        };
        let payload = match follow_up.to_bytes() {
            Ok(payload) => payload,
            Err(error) => return JobResult::permanent(format!("payload encoding: {error}")),
        };
        let execute_job = Job::new(EXECUTE_PLAN, payload, &self.clock)
            .with_idempotency_key(format!("{}/execute", request.task_id))
            .with_max_retries(job.max_retries)
            .with_parent(job.id)
            .with_correlation(
                ctx.correlation_id
                    .clone()
                    .unwrap_or_else(mend_core::CorrelationId::new),
            )
            .with_source(job.source.clone())
            .with_priority(job.priority);

        match self.dispatcher.dispatch(execute_job) {
            Ok(DispatchOutcome::Accepted { .. }) | Ok(DispatchOutcome::Deduplicated { .. }) => {}
            Ok(DispatchOutcome::RejectedQueueFull { .. }) => {
                return JobResult::retryable("execute queue full");
            }
            Ok(DispatchOutcome::RejectedUnknownType { job_type }) => {
                return JobResult::permanent(format!("no handler for {job_type}"));
            }
            Err(error) => return JobResult::retryable(format!("dispatch: {error}")),
        }

        if task.state == TaskState::Planned {
            let from = task.state;
            task.transition(TaskState::Executing, self.clock.epoch_ms());
            if let Err(error) = self.tasks.update(task.clone()) {
                return JobResult::retryable(format!("task store: {error}"));
            }
            self.audit.task_state_transition(
                &task.id,
                from,
                TaskState::Executing,
                ctx.correlation_id,
            );
        }

        JobResult::Success
    }
}

#[cfg(test)]
#[path = "plan_tests.rs"]
mod tests;
