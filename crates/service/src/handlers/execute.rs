// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Execution phase: plan → container edits → draft pull request

use crate::payload::{ExecuteRequest, EXECUTE_PLAN};
use async_trait::async_trait;
use mend_adapters::agent::{AgentAdapter, AgentError};
use mend_adapters::container::{ContainerAdapter, ContainerError, ContainerScope};
use mend_adapters::platform::{NewPullRequest, PlatformAdapter, PlatformError};
use mend_adapters::workspace::WorkspacePath;
use mend_core::{AuditEvent, AuditKind, Clock, CorrelationId, Job, Plan, TaskState};
use mend_engine::audit_log::AuditLog;
use mend_engine::handler::{JobContext, JobHandler, JobResult};
use mend_engine::task_store::TaskStore;
use std::future::Future;
use std::sync::Arc;

/// Executes a stored plan inside a container and publishes the result
/// as a draft pull request on the issue's repository.
///
/// The container is held in a [`ContainerScope`], so cleanup runs on
/// every exit path including errors. Already-completed steps are
/// skipped on retry.
pub struct ExecutePlanJobHandler<C, P, K, A>
where
    C: Clock,
    P: PlatformAdapter,
    K: ContainerAdapter,
    A: AgentAdapter,
{
    tasks: Arc<dyn TaskStore>,
    platform: Arc<P>,
    containers: Arc<K>,
    agent: Arc<A>,
    audit: AuditLog<C>,
    clock: C,
}

/// Internal failure classification; decides retry vs task failure.
enum ExecFailure {
    Retryable(String),
    Permanent(String),
}

impl ExecFailure {
    fn message(&self) -> &str {
        match self {
            ExecFailure::Retryable(m) | ExecFailure::Permanent(m) => m,
        }
    }
}

impl<C, P, K, A> ExecutePlanJobHandler<C, P, K, A>
where
    C: Clock,
    P: PlatformAdapter,
    K: ContainerAdapter,
    A: AgentAdapter,
{
    pub fn new(
        tasks: Arc<dyn TaskStore>,
        platform: Arc<P>,
        containers: Arc<K>,
        agent: Arc<A>,
        audit: AuditLog<C>,
        clock: C,
    ) -> Self {
        Self { tasks, platform, containers, agent, audit, clock }
    }

    /// Run a platform call with timing and audit.
    async fn platform_call<T, F>(
        &self,
        operation: &str,
        correlation: &Option<CorrelationId>,
        call: F,
    ) -> Result<T, PlatformError>
    where
        F: Future<Output = Result<T, PlatformError>>,
    {
        let started = self.clock.now();
        let result = call.await;
        let duration_ms = self.clock.now().saturating_duration_since(started).as_millis() as u64;
        match &result {
            Ok(_) => {
                self.audit
                    .platform_api_call(operation, duration_ms, true, None, correlation.clone());
            }
            Err(error) => {
                self.audit.platform_api_call(
                    operation,
                    duration_ms,
                    false,
                    Some(&error.to_string()),
                    correlation.clone(),
                );
            }
        }
        result
    }

    fn classify_platform(operation: &str, error: PlatformError) -> ExecFailure {
        let message = format!("{operation}: {error}");
        if error.is_transient() {
            ExecFailure::Retryable(message)
        } else {
            ExecFailure::Permanent(message)
        }
    }

    fn classify_container(operation: &str, error: ContainerError) -> ExecFailure {
        let message = format!("{operation}: {error}");
        match error {
            ContainerError::Runtime(_) => ExecFailure::Retryable(message),
            ContainerError::OutOfWorkspace { .. }
            | ContainerError::NotFound(_)
            | ContainerError::CommandFailed { .. } => ExecFailure::Permanent(message),
        }
    }

    fn classify_agent(error: AgentError) -> ExecFailure {
        let message = format!("step execution failed: {error}");
        if error.is_transient() {
            ExecFailure::Retryable(message)
        } else {
            ExecFailure::Permanent(message)
        }
    }

    async fn run(&self, request: &ExecuteRequest, ctx: &JobContext) -> Result<(), ExecFailure> {
        let corr = &ctx.correlation_id;
        let mut task = match self.tasks.get(&request.task_id) {
            Ok(Some(task)) => task,
            Ok(None) => {
                return Err(ExecFailure::Permanent(format!(
                    "task not found: {}",
                    request.task_id
                )))
            }
            Err(error) => return Err(ExecFailure::Retryable(format!("task store: {error}"))),
        };
        if task.state == TaskState::Completed {
            return Ok(());
        }
        let plan = task
            .plan
            .clone()
            .ok_or_else(|| ExecFailure::Permanent(format!("task has no plan: {}", task.id)))?;

        let owner = &request.owner;
        let repo = &request.repo;
        let branch = format!("mend/issue-{}", request.issue_number);

        let token = self
            .platform_call("InstallationToken", corr, self.platform.installation_token(request.installation_id))
            .await
            .map_err(|e| Self::classify_platform("InstallationToken", e))?;
        let repository = self
            .platform_call("GetRepository", corr, self.platform.get_repository(owner, repo))
            .await
            .map_err(|e| Self::classify_platform("GetRepository", e))?;
        let base = self
            .platform_call(
                "GetReference",
                corr,
                self.platform.get_reference(owner, repo, &format!("heads/{}", repository.default_branch)),
            )
            .await
            .map_err(|e| Self::classify_platform("GetReference", e))?;
        match self
            .platform_call(
                "CreateReference",
                corr,
                self.platform.create_reference(owner, repo, &format!("heads/{branch}"), &base.sha),
            )
            .await
        {
            Ok(_) => {}
            // The branch survives a retried attempt; reuse it.
            Err(PlatformError::Api { status: 422, .. }) => {}
            Err(error) => return Err(Self::classify_platform("CreateReference", error)),
        }

        let scope = ContainerScope::create(
            Arc::clone(&self.containers),
            owner,
            repo,
            &token,
            &branch,
            None,
        )
        .await
        .map_err(|e| Self::classify_container("Create", e))?;
        self.audit.record(
            AuditEvent::new(AuditKind::ContainerOperation, format!("container for {}", task.id))
                .with_correlation(corr.clone())
                .with_target(scope.id().to_string())
                .with_data("branch", branch.clone()),
        );

        let total_steps = plan.steps.len();
        for index in 0..total_steps {
            let step = &plan.steps[index];
            if task.plan.as_ref().is_some_and(|p| p.steps[index].done) {
                continue;
            }
            if ctx.cancel.is_cancelled() {
                return Err(ExecFailure::Retryable("cancelled during execution".to_string()));
            }

            let edits = self
                .agent
                .execute_step(&plan, step)
                .await
                .map_err(Self::classify_agent)?;
            for edit in &edits {
                let path = WorkspacePath::new(&edit.path).map_err(|error| {
                    self.audit.record(
                        AuditEvent::new(AuditKind::FileOperation, "rejected file edit")
                            .with_correlation(corr.clone())
                            .with_data("path", edit.path.clone())
                            .with_error(error.to_string()),
                    );
                    ExecFailure::Permanent(format!("step {}: {error}", step.id))
                })?;
                scope
                    .adapter()
                    .write_file(scope.id(), &path, &edit.contents)
                    .await
                    .map_err(|e| Self::classify_container("WriteFile", e))?;
                self.audit.record(
                    AuditEvent::new(AuditKind::FileOperation, format!("wrote {path}"))
                        .with_correlation(corr.clone())
                        .with_target(scope.id().to_string()),
                );
            }

            if let Some(stored) = task.plan.as_mut() {
                stored.steps[index].done = true;
            }
            task.transition(task.state, self.clock.epoch_ms());
            if let Err(error) = self.tasks.update(task.clone()) {
                return Err(ExecFailure::Retryable(format!("task store: {error}")));
            }
        }

        scope
            .adapter()
            .commit_and_push(scope.id(), &format!("Apply plan for issue #{}", request.issue_number))
            .await
            .map_err(|e| Self::classify_container("CommitAndPush", e))?;
        self.audit.record(
            AuditEvent::new(AuditKind::ContainerOperation, "committed and pushed")
                .with_correlation(corr.clone())
                .with_target(scope.id().to_string()),
        );

        let pull_request = self
            .platform_call(
                "CreatePullRequest",
                corr,
                self.platform.create_pull_request(
                    owner,
                    repo,
                    NewPullRequest {
                        title: format!("Fix #{}: {}", request.issue_number, plan.problem_summary),
                        body: pull_request_body(&plan, request.issue_number),
                        head: branch.clone(),
                        base: repository.default_branch.clone(),
                        draft: true,
                    },
                ),
            )
            .await
            .map_err(|e| Self::classify_platform("CreatePullRequest", e))?;

        self.platform_call(
            "CreateIssueComment",
            corr,
            self.platform.create_issue_comment(
                owner,
                repo,
                request.issue_number,
                &format!("Opened draft pull request {} for this issue.", pull_request.url),
            ),
        )
        .await
        .map_err(|e| Self::classify_platform("CreateIssueComment", e))?;

        let from = task.state;
        task.transition(TaskState::Completed, self.clock.epoch_ms());
        if let Err(error) = self.tasks.update(task.clone()) {
            return Err(ExecFailure::Retryable(format!("task store: {error}")));
        }
        self.audit.task_state_transition(&task.id, from, TaskState::Completed, corr.clone());
        self.audit.record(
            AuditEvent::new(AuditKind::PlanExecution, format!("plan executed for {}", task.id))
                .with_correlation(corr.clone())
                .with_result("success")
                .with_data("pull_request", pull_request.url.clone()),
        );

        if let Err(error) = scope.close().await {
            tracing::warn!(%error, "container cleanup failed after success");
        }
        Ok(())
    }

    /// Permanent failures end the task.
    fn fail_task(&self, request: &ExecuteRequest, message: &str, corr: &Option<CorrelationId>) {
        let Ok(Some(mut task)) = self.tasks.get(&request.task_id) else {
            return;
        };
        if task.state.is_terminal() {
            return;
        }
        let from = task.state;
        task.transition(TaskState::Failed, self.clock.epoch_ms());
        if self.tasks.update(task).is_ok() {
            self.audit.task_state_transition(&request.task_id, from, TaskState::Failed, corr.clone());
        }
        self.audit.record(
            AuditEvent::new(AuditKind::PlanExecution, format!("plan failed for {}", request.task_id))
                .with_correlation(corr.clone())
                .with_result("failure")
                .with_error(message),
        );
    }
}

fn pull_request_body(plan: &Plan, issue_number: u64) -> String {
    let mut body = format!("Automated change for issue #{issue_number}.\n\n{}\n", plan.problem_summary);
    if !plan.checklist.is_empty() {
        body.push_str("\nChecklist:\n");
        for item in &plan.checklist {
            body.push_str(&format!("- [ ] {item}\n"));
        }
    }
    body
}

#[async_trait]
impl<C, P, K, A> JobHandler for ExecutePlanJobHandler<C, P, K, A>
where
    C: Clock,
    P: PlatformAdapter,
    K: ContainerAdapter,
    A: AgentAdapter,
{
    fn job_type(&self) -> &str {
        EXECUTE_PLAN
    }

    async fn execute(&self, job: &Job, ctx: JobContext) -> JobResult {
        let request = match ExecuteRequest::from_bytes(&job.payload) {
            Ok(request) => request,
            Err(error) => return JobResult::permanent(format!("malformed payload: {error}")),
        };
        match self.run(&request, &ctx).await {
            Ok(()) => JobResult::Success,
            Err(ExecFailure::Retryable(message)) => JobResult::retryable(message),
            Err(failure) => {
                self.fail_task(&request, failure.message(), &ctx.correlation_id);
                JobResult::permanent(failure.message().to_string())
            }
        }
    }
}

#[cfg(test)]
#[path = "execute_tests.rs"]
mod tests;
