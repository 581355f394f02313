// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job handler contract

use async_trait::async_trait;
use mend_core::{CorrelationId, Job};
use tokio_util::sync::CancellationToken;

/// Outcome of one handler attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobResult {
    Success,
    Failure { message: String, retryable: bool },
}

impl JobResult {
    pub fn failure(message: impl Into<String>, retryable: bool) -> Self {
        JobResult::Failure { message: message.into(), retryable }
    }

    /// Transient failure worth retrying per policy.
    pub fn retryable(message: impl Into<String>) -> Self {
        Self::failure(message, true)
    }

    /// Permanent failure; the job goes straight to `Failed`.
    pub fn permanent(message: impl Into<String>) -> Self {
        Self::failure(message, false)
    }

    pub fn is_success(&self) -> bool {
        matches!(self, JobResult::Success)
    }
}

/// Per-attempt execution context handed to a handler.
///
/// Handlers must watch `cancel` and return promptly once it fires; the
/// processor cancels it on job timeout, explicit cancellation, and
/// shutdown.
#[derive(Debug, Clone)]
pub struct JobContext {
    pub cancel: CancellationToken,
    pub correlation_id: Option<CorrelationId>,
    /// 0 on the first attempt, incremented per retry.
    pub attempt: u32,
}

/// A component that executes one kind of background job.
///
/// Registered with the dispatcher before the processor starts; invoked
/// at most once per attempt. Re-invocation only happens through queue
/// re-enqueue after a `Retried` transition.
#[async_trait]
pub trait JobHandler: Send + Sync + 'static {
    /// The job type this handler serves. Must be stable: it routes
    /// queued payloads back to the handler.
    fn job_type(&self) -> &str;

    async fn execute(&self, job: &Job, ctx: JobContext) -> JobResult;
}

#[cfg(test)]
#[path = "handler_tests.rs"]
mod tests;
