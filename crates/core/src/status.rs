// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job status record and derived metrics

use crate::id::{CorrelationId, JobId};
use crate::job::Job;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Lifecycle state of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Queued,
    Processing,
    Completed,
    Failed,
    Cancelled,
    Retried,
    DeadLetter,
}

impl JobState {
    /// Terminal states never transition again.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobState::Completed | JobState::Failed | JobState::Cancelled | JobState::DeadLetter
        )
    }
}

crate::simple_display! {
    JobState {
        Queued => "queued",
        Processing => "processing",
        Completed => "completed",
        Failed => "failed",
        Cancelled => "cancelled",
        Retried => "retried",
        DeadLetter => "dead_letter",
    }
}

/// Status record for a job, maintained by the dispatcher and processor.
///
/// Transitions happen through the `mark_*` methods so timestamps and
/// durations stay consistent with the state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobStatus {
    pub job_id: JobId,
    pub job_type: String,
    pub state: JobState,
    pub created_at_ms: u64,
    pub started_at_ms: Option<u64>,
    pub completed_at_ms: Option<u64>,
    pub processing_duration_ms: Option<u64>,
    pub queue_wait_ms: Option<u64>,
    pub retry_count: u32,
    pub max_retries: u32,
    pub last_retry_at_ms: Option<u64>,
    pub error_message: Option<String>,
    pub parent_id: Option<JobId>,
    pub correlation_id: Option<CorrelationId>,
    pub source: String,
    pub metadata: BTreeMap<String, String>,
}

impl JobStatus {
    /// Initial record for a freshly dispatched job.
    pub fn queued(job: &Job, now_ms: u64) -> Self {
        Self {
            job_id: job.id,
            job_type: job.job_type.clone(),
            state: JobState::Queued,
            created_at_ms: now_ms,
            started_at_ms: None,
            completed_at_ms: None,
            processing_duration_ms: None,
            queue_wait_ms: None,
            retry_count: 0,
            max_retries: job.max_retries,
            last_retry_at_ms: None,
            error_message: None,
            parent_id: job.parent_id,
            correlation_id: job.correlation_id.clone(),
            source: job.source.clone(),
            metadata: BTreeMap::new(),
        }
    }

    pub fn mark_processing(&mut self, now_ms: u64) {
        self.state = JobState::Processing;
        self.started_at_ms = Some(now_ms);
        self.queue_wait_ms = Some(now_ms.saturating_sub(self.created_at_ms));
    }

    pub fn mark_completed(&mut self, now_ms: u64) {
        self.state = JobState::Completed;
        self.finish(now_ms);
    }

    pub fn mark_failed(&mut self, now_ms: u64, message: impl Into<String>) {
        self.state = JobState::Failed;
        self.error_message = Some(message.into());
        self.finish(now_ms);
    }

    pub fn mark_cancelled(&mut self, now_ms: u64) {
        self.state = JobState::Cancelled;
        self.finish(now_ms);
    }

    pub fn mark_dead_letter(&mut self, now_ms: u64, message: impl Into<String>) {
        self.state = JobState::DeadLetter;
        self.error_message = Some(message.into());
        self.finish(now_ms);
    }

    /// Record one more retry attempt; the job goes back to the queue.
    pub fn mark_retried(&mut self, now_ms: u64, message: impl Into<String>) {
        self.state = JobState::Retried;
        self.retry_count += 1;
        self.last_retry_at_ms = Some(now_ms);
        self.error_message = Some(message.into());
    }

    fn finish(&mut self, now_ms: u64) {
        self.completed_at_ms = Some(now_ms);
        if let Some(started) = self.started_at_ms {
            self.processing_duration_ms = Some(now_ms.saturating_sub(started));
        }
    }
}

/// Per-type metric slice.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TypeMetrics {
    pub total: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub avg_processing_ms: f64,
    pub failure_rate: f64,
}

/// Metrics derived from the status store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobMetrics {
    pub queue_depth: u64,
    pub processing: u64,
    pub completed: u64,
    pub failed: u64,
    pub cancelled: u64,
    pub retried: u64,
    pub dead_letter: u64,
    pub total_jobs: u64,
    pub failure_rate: f64,
    pub avg_processing_ms: f64,
    pub avg_queue_wait_ms: f64,
    pub by_type: IndexMap<String, TypeMetrics>,
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod tests;
