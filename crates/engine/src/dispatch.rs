// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job dispatch: validate, deduplicate, record, enqueue

use crate::audit_log::AuditLog;
use crate::cancel::CancelLedger;
use crate::dedup::DedupRegistry;
use crate::error::DispatchError;
use crate::handler::JobHandler;
use crate::queue::JobQueue;
use crate::status_store::JobStatusStore;
use mend_core::{Clock, Job, JobId, JobState, JobStatus};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Result of a dispatch attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Job accepted and queued.
    Accepted { job_id: JobId },
    /// An equivalent job is already in flight; nothing was enqueued.
    /// Deduplication is a silent success: the caller may read the
    /// existing job's status instead.
    Deduplicated { existing: JobId },
    /// No handler is registered for the job type. No status was written.
    RejectedUnknownType { job_type: String },
    /// The queue is full. The job's status is `Failed` with reason
    /// "queue full".
    RejectedQueueFull { job_id: JobId },
}

impl DispatchOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, DispatchOutcome::Accepted { .. })
    }

    pub fn is_deduplicated(&self) -> bool {
        matches!(self, DispatchOutcome::Deduplicated { .. })
    }
}

/// Single entry point for submitting background work.
///
/// Owns the handler registry; the processor reads handlers through
/// [`lookup_handler`](Self::lookup_handler) and never mutates dispatcher
/// state except through the shared queue and stores.
pub struct Dispatcher<C: Clock> {
    queue: Arc<JobQueue>,
    statuses: Arc<dyn JobStatusStore>,
    dedup: Arc<DedupRegistry>,
    cancels: Arc<CancelLedger>,
    // Written only during startup registration; read-only once the
    // processor is running.
    handlers: RwLock<HashMap<String, Arc<dyn JobHandler>>>,
    audit: AuditLog<C>,
    clock: C,
}

impl<C: Clock> Dispatcher<C> {
    pub fn new(
        queue: Arc<JobQueue>,
        statuses: Arc<dyn JobStatusStore>,
        dedup: Arc<DedupRegistry>,
        cancels: Arc<CancelLedger>,
        audit: AuditLog<C>,
        clock: C,
    ) -> Self {
        Self {
            queue,
            statuses,
            dedup,
            cancels,
            handlers: RwLock::new(HashMap::new()),
            audit,
            clock,
        }
    }

    /// Register a handler under its declared job type.
    pub fn register_handler(&self, handler: Arc<dyn JobHandler>) {
        let job_type = handler.job_type().to_string();
        if self.handlers.write().insert(job_type.clone(), handler).is_some() {
            tracing::warn!(%job_type, "handler replaced for job type");
        }
    }

    pub fn lookup_handler(&self, job_type: &str) -> Option<Arc<dyn JobHandler>> {
        self.handlers.read().get(job_type).cloned()
    }

    pub fn handler_types(&self) -> Vec<String> {
        self.handlers.read().keys().cloned().collect()
    }

    /// Submit a job.
    ///
    /// In order: unknown type is rejected with no side effect; an
    /// in-flight idempotency key short-circuits as deduplicated; then
    /// the initial `Queued` status is written, the key registered, and
    /// the job enqueued. Overflow fails the job with reason
    /// "queue full".
    pub fn dispatch(&self, job: Job) -> Result<DispatchOutcome, DispatchError> {
        if job.validate().is_err() || self.lookup_handler(&job.job_type).is_none() {
            tracing::warn!(job_type = %job.job_type, "dispatch rejected: no handler");
            return Ok(DispatchOutcome::RejectedUnknownType { job_type: job.job_type });
        }
        if let Some(key) = &job.idempotency_key {
            if key.is_empty() {
                return Err(DispatchError::EmptyIdempotencyKey);
            }
            if let Some(existing) = self.dedup.lookup_in_flight(key) {
                tracing::debug!(%key, %existing, "dispatch deduplicated");
                return Ok(DispatchOutcome::Deduplicated { existing });
            }
        }

        let now_ms = self.clock.epoch_ms();
        self.statuses.set(JobStatus::queued(&job, now_ms))?;
        if let Some(key) = &job.idempotency_key {
            self.dedup.register(job.id, key)?;
        }

        let job_id = job.id;
        let job_type = job.job_type.clone();
        let correlation = job.correlation_id.clone();
        if self.queue.enqueue(job) {
            tracing::info!(job_id = %job_id.short(), %job_type, "job queued");
            self.audit.job_dispatched(job_id, &job_type, correlation);
            Ok(DispatchOutcome::Accepted { job_id })
        } else {
            self.dedup.unregister(job_id);
            if let Some(mut status) = self.statuses.get(job_id)? {
                status.mark_failed(self.clock.epoch_ms(), "queue full");
                self.statuses.set(status)?;
            }
            self.audit.job_state_transition(
                job_id,
                &job_type,
                JobState::Queued,
                JobState::Failed,
                correlation,
                Some("queue full"),
            );
            tracing::warn!(job_id = %job_id.short(), %job_type, "dispatch rejected: queue full");
            Ok(DispatchOutcome::RejectedQueueFull { job_id })
        }
    }

    /// Request cancellation of a queued or running job.
    ///
    /// Queued jobs are skipped lazily at dequeue; running jobs have
    /// their per-attempt token cancelled and the handler is expected to
    /// return promptly. Returns `false` for unknown or already terminal
    /// jobs.
    pub fn cancel(&self, job_id: JobId) -> Result<bool, DispatchError> {
        let Some(status) = self.statuses.get(job_id)? else {
            return Ok(false);
        };
        if status.state.is_terminal() {
            return Ok(false);
        }
        self.cancels.request(job_id);
        tracing::info!(job_id = %job_id.short(), state = %status.state, "cancellation requested");
        Ok(true)
    }
}

#[cfg(test)]
#[path = "dispatch_tests.rs"]
mod tests;
