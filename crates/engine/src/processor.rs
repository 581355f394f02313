// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker pool: dequeue, execute, retry, dead-letter

use crate::audit_log::AuditLog;
use crate::cancel::CancelLedger;
use crate::dedup::DedupRegistry;
use crate::dispatch::Dispatcher;
use crate::handler::{JobContext, JobHandler, JobResult};
use crate::queue::JobQueue;
use crate::status_store::JobStatusStore;
use mend_core::{Clock, Job, JobState, JobStatus, RetryPolicy};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::{JoinError, JoinHandle};
use tokio_util::sync::CancellationToken;

/// Processor tuning.
#[derive(Debug, Clone)]
pub struct ProcessorConfig {
    /// Number of concurrent workers.
    pub max_concurrency: usize,
    pub retry: RetryPolicy,
    /// Per-job-type execution deadline. Absent or zero disables.
    pub timeouts: HashMap<String, Duration>,
    /// How long shutdown waits for in-flight jobs.
    pub drain: Duration,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            max_concurrency: 4,
            retry: RetryPolicy::default(),
            timeouts: HashMap::new(),
            drain: Duration::from_secs(10),
        }
    }
}

impl ProcessorConfig {
    fn timeout_for(&self, job_type: &str) -> Option<Duration> {
        self.timeouts.get(job_type).copied().filter(|d| !d.is_zero())
    }
}

/// Long-running worker pool.
///
/// Each worker dequeues, enforces the per-type timeout, invokes the
/// registered handler, and interprets the result: complete, requeue
/// with backoff, or dead-letter. Handler panics are contained; the
/// worker loop survives them.
pub struct Processor<C: Clock> {
    dispatcher: Arc<Dispatcher<C>>,
    queue: Arc<JobQueue>,
    statuses: Arc<dyn JobStatusStore>,
    dedup: Arc<DedupRegistry>,
    cancels: Arc<CancelLedger>,
    audit: AuditLog<C>,
    clock: C,
    config: ProcessorConfig,
    shutdown: CancellationToken,
    started: AtomicBool,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl<C: Clock> Processor<C> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        dispatcher: Arc<Dispatcher<C>>,
        queue: Arc<JobQueue>,
        statuses: Arc<dyn JobStatusStore>,
        dedup: Arc<DedupRegistry>,
        cancels: Arc<CancelLedger>,
        audit: AuditLog<C>,
        clock: C,
        config: ProcessorConfig,
    ) -> Self {
        Self {
            dispatcher,
            queue,
            statuses,
            dedup,
            cancels,
            audit,
            clock,
            config,
            shutdown: CancellationToken::new(),
            started: AtomicBool::new(false),
            workers: Mutex::new(Vec::new()),
        }
    }

    /// Spawn the worker pool. Subsequent calls are no-ops.
    pub fn start(self: &Arc<Self>) {
        if self.started.swap(true, Ordering::SeqCst) {
            return;
        }
        let mut workers = self.workers.lock();
        for index in 0..self.config.max_concurrency {
            let processor = Arc::clone(self);
            workers.push(tokio::spawn(async move { processor.worker_loop(index).await }));
        }
        tracing::info!(workers = self.config.max_concurrency, "processor started");
    }

    /// Stop accepting work and drain.
    ///
    /// Cancels the processor context (which propagates to every job
    /// context), closes the queue, and waits up to the drain window.
    /// Jobs still running after the window are marked `Failed` with
    /// reason "shutdown".
    pub async fn shutdown(&self) {
        self.queue.close();
        self.shutdown.cancel();

        let deadline = tokio::time::Instant::now() + self.config.drain;
        let workers: Vec<JoinHandle<()>> = std::mem::take(&mut *self.workers.lock());
        let abort_handles: Vec<_> = workers.iter().map(|w| w.abort_handle()).collect();
        let mut drained = true;
        for worker in workers {
            let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
            match tokio::time::timeout(remaining, worker).await {
                Ok(_) => {}
                Err(_) => {
                    drained = false;
                    break;
                }
            }
        }
        if !drained {
            for handle in abort_handles {
                handle.abort();
            }
            let now_ms = self.clock.epoch_ms();
            for job_id in self.cancels.running_ids() {
                self.cancels.finish(job_id);
                self.dedup.unregister(job_id);
                if let Ok(Some(mut status)) = self.statuses.get(job_id) {
                    let from = status.state;
                    status.mark_failed(now_ms, "shutdown");
                    let correlation = status.correlation_id.clone();
                    let job_type = status.job_type.clone();
                    self.log_store(self.statuses.set(status));
                    self.audit.job_state_transition(
                        job_id,
                        &job_type,
                        from,
                        JobState::Failed,
                        correlation,
                        Some("shutdown"),
                    );
                }
            }
            tracing::warn!("drain window elapsed with jobs still in flight");
        }
        tracing::info!("processor stopped");
    }

    async fn worker_loop(self: Arc<Self>, index: usize) {
        tracing::debug!(worker = index, "worker started");
        loop {
            let Some(job) = self.queue.dequeue(&self.shutdown).await else {
                break;
            };
            self.process(job).await;
        }
        tracing::debug!(worker = index, "worker stopped");
    }

    async fn process(&self, job: Job) {
        let job_id = job.id;

        // Cancellation requested while the job sat in the queue.
        if self.cancels.take_requested(job_id) {
            self.finalize(&job, JobState::Queued, |status, now_ms| status.mark_cancelled(now_ms));
            return;
        }

        let now_ms = self.clock.epoch_ms();
        let mut status = match self.statuses.get(job_id) {
            Ok(Some(status)) => status,
            Ok(None) => JobStatus::queued(&job, now_ms),
            Err(error) => {
                tracing::warn!(%error, job_id = %job_id.short(), "status read failed");
                JobStatus::queued(&job, now_ms)
            }
        };
        status.mark_processing(now_ms);
        let attempt_number = status.retry_count;
        self.log_store(self.statuses.set(status.clone()));

        let token = self.shutdown.child_token();
        self.cancels.begin(job_id, token.clone());

        let (result, timed_out) = self.run_attempt(&job, token.clone(), attempt_number).await;
        self.cancels.finish(job_id);

        match result {
            JobResult::Success => {
                self.finalize(&job, JobState::Processing, |status, now_ms| {
                    status.mark_completed(now_ms)
                });
            }
            JobResult::Failure { message, retryable } => {
                let cancelled_externally =
                    token.is_cancelled() && !timed_out && !self.shutdown.is_cancelled();
                if cancelled_externally {
                    self.finalize(&job, JobState::Processing, |status, now_ms| {
                        status.mark_cancelled(now_ms)
                    });
                } else if self.shutdown.is_cancelled() && !timed_out {
                    self.finalize(&job, JobState::Processing, |status, now_ms| {
                        status.mark_failed(now_ms, "shutdown")
                    });
                } else {
                    self.conclude_failure(&job, status.retry_count, message, retryable).await;
                }
            }
        }
    }

    /// Run one handler attempt on its own task so panics stay contained.
    /// Returns the result and whether the per-type deadline fired.
    async fn run_attempt(
        &self,
        job: &Job,
        token: CancellationToken,
        attempt: u32,
    ) -> (JobResult, bool) {
        let Some(handler) = self.dispatcher.lookup_handler(&job.job_type) else {
            // Dispatch validated the type; hitting this means the
            // registry changed under us.
            return (JobResult::permanent(format!("no handler for type {}", job.job_type)), false);
        };

        let ctx = JobContext {
            cancel: token.clone(),
            correlation_id: job.correlation_id.clone(),
            attempt,
        };
        let owned_job = job.clone();
        let mut attempt_task =
            tokio::spawn(async move { handler.execute(&owned_job, ctx).await });

        match self.config.timeout_for(&job.job_type) {
            Some(limit) => {
                tokio::select! {
                    join = &mut attempt_task => (interpret_join(join), false),
                    _ = tokio::time::sleep(limit) => {
                        token.cancel();
                        attempt_task.abort();
                        let message = format!("timed out after {} seconds", limit.as_secs());
                        (JobResult::permanent(message), true)
                    }
                }
            }
            None => (interpret_join(attempt_task.await), false),
        }
    }

    /// Retry per policy, dead-letter on exhaustion, fail otherwise.
    async fn conclude_failure(&self, job: &Job, retry_count: u32, message: String, retryable: bool) {
        let policy = &self.config.retry;
        if policy.should_retry(i64::from(retry_count), i64::from(job.max_retries), retryable) {
            let delay = policy.delay_ms(retry_count as i32).max(0) as u64;
            tracing::info!(
                job_id = %job.id.short(),
                attempt = retry_count + 1,
                delay_ms = delay,
                "retrying job"
            );
            tokio::select! {
                _ = tokio::time::sleep(Duration::from_millis(delay)) => {}
                _ = self.shutdown.cancelled() => {
                    self.finalize(job, JobState::Processing, |status, now_ms| {
                        status.mark_failed(now_ms, "shutdown")
                    });
                    return;
                }
            }

            let now_ms = self.clock.epoch_ms();
            if let Ok(Some(mut status)) = self.statuses.get(job.id) {
                status.mark_retried(now_ms, message.clone());
                self.log_store(self.statuses.set(status));
            }
            self.audit.job_state_transition(
                job.id,
                &job.job_type,
                JobState::Processing,
                JobState::Retried,
                job.correlation_id.clone(),
                Some(&message),
            );
            // Re-enqueue the same job: id, payload, idempotency key, and
            // correlation id all survive the round trip.
            if !self.queue.enqueue(job.clone()) {
                self.finalize(job, JobState::Retried, |status, now_ms| {
                    status.mark_dead_letter(now_ms, "queue full")
                });
            }
        } else if retryable && policy.enabled && retry_count >= job.max_retries {
            self.finalize(job, JobState::Processing, move |status, now_ms| {
                status.mark_dead_letter(now_ms, message.clone())
            });
        } else {
            self.finalize(job, JobState::Processing, move |status, now_ms| {
                status.mark_failed(now_ms, message.clone())
            });
        }
    }

    /// Write the terminal status, release the dedup entry, audit.
    fn finalize(&self, job: &Job, from: JobState, mark: impl Fn(&mut JobStatus, u64)) {
        let now_ms = self.clock.epoch_ms();
        let mut status = match self.statuses.get(job.id) {
            Ok(Some(status)) => status,
            _ => JobStatus::queued(job, now_ms),
        };
        mark(&mut status, now_ms);
        let to = status.state;
        let error = status.error_message.clone();
        self.log_store(self.statuses.set(status));
        self.dedup.unregister(job.id);
        self.audit.job_state_transition(
            job.id,
            &job.job_type,
            from,
            to,
            job.correlation_id.clone(),
            error.as_deref(),
        );
        tracing::info!(job_id = %job.id.short(), state = %to, "job finished");
    }

    fn log_store(&self, result: Result<(), crate::error::StoreError>) {
        if let Err(error) = result {
            tracing::warn!(%error, "status write failed");
        }
    }
}

fn interpret_join(join: Result<JobResult, JoinError>) -> JobResult {
    match join {
        Ok(result) => result,
        Err(error) if error.is_panic() => {
            let panic = error.into_panic();
            let message = panic
                .downcast_ref::<&str>()
                .map(|s| (*s).to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "handler panicked".to_string());
            tracing::error!(message = %message, "handler panicked");
            JobResult::permanent(message)
        }
        Err(_) => JobResult::permanent("handler task cancelled"),
    }
}

#[cfg(test)]
#[path = "processor_tests.rs"]
mod tests;
