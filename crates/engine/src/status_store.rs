// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job status store: upsert, query, metric aggregation

use crate::error::StoreError;
use mend_core::{JobId, JobMetrics, JobState, JobStatus};
use parking_lot::RwLock;
use std::collections::HashMap;

/// Filter for status listing. Empty filter matches everything.
#[derive(Debug, Clone, Default)]
pub struct StatusFilter {
    pub state: Option<JobState>,
    pub job_type: Option<String>,
    pub source: Option<String>,
}

impl StatusFilter {
    pub fn by_state(state: JobState) -> Self {
        Self { state: Some(state), ..Self::default() }
    }

    pub fn by_type(job_type: impl Into<String>) -> Self {
        Self { job_type: Some(job_type.into()), ..Self::default() }
    }

    pub fn by_source(source: impl Into<String>) -> Self {
        Self { source: Some(source.into()), ..Self::default() }
    }

    fn matches(&self, status: &JobStatus) -> bool {
        self.state.is_none_or(|s| s == status.state)
            && self.job_type.as_deref().is_none_or(|t| t == status.job_type)
            && self.source.as_deref().is_none_or(|s| s == status.source)
    }
}

/// Store of per-job status records.
///
/// All operations are atomic with respect to each other; listing sees a
/// consistent snapshot but no cross-key transaction is implied. The
/// in-memory implementation never fails; persistence collaborators
/// surface backend errors through [`StoreError`].
pub trait JobStatusStore: Send + Sync {
    /// Upsert keyed on `status.job_id`.
    fn set(&self, status: JobStatus) -> Result<(), StoreError>;

    fn get(&self, job_id: JobId) -> Result<Option<JobStatus>, StoreError>;

    /// Returns whether a record was removed.
    fn delete(&self, job_id: JobId) -> Result<bool, StoreError>;

    /// Page through matching records, newest `created_at` first,
    /// ties broken by job id.
    fn list(
        &self,
        filter: &StatusFilter,
        skip: usize,
        take: usize,
    ) -> Result<Vec<JobStatus>, StoreError>;

    /// Remove terminal records created before `cutoff_ms`. Returns the
    /// number removed.
    fn prune_terminal_before(&self, cutoff_ms: u64) -> Result<usize, StoreError>;

    fn metrics(&self) -> Result<JobMetrics, StoreError>;

    fn list_by_state(
        &self,
        state: JobState,
        skip: usize,
        take: usize,
    ) -> Result<Vec<JobStatus>, StoreError> {
        self.list(&StatusFilter::by_state(state), skip, take)
    }

    fn list_by_type(
        &self,
        job_type: &str,
        skip: usize,
        take: usize,
    ) -> Result<Vec<JobStatus>, StoreError> {
        self.list(&StatusFilter::by_type(job_type), skip, take)
    }

    fn list_by_source(
        &self,
        source: &str,
        skip: usize,
        take: usize,
    ) -> Result<Vec<JobStatus>, StoreError> {
        self.list(&StatusFilter::by_source(source), skip, take)
    }
}

/// Process-local status store.
#[derive(Default)]
pub struct InMemoryStatusStore {
    records: RwLock<HashMap<JobId, JobStatus>>,
}

impl InMemoryStatusStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl JobStatusStore for InMemoryStatusStore {
    fn set(&self, status: JobStatus) -> Result<(), StoreError> {
        self.records.write().insert(status.job_id, status);
        Ok(())
    }

    fn get(&self, job_id: JobId) -> Result<Option<JobStatus>, StoreError> {
        Ok(self.records.read().get(&job_id).cloned())
    }

    fn delete(&self, job_id: JobId) -> Result<bool, StoreError> {
        Ok(self.records.write().remove(&job_id).is_some())
    }

    fn list(
        &self,
        filter: &StatusFilter,
        skip: usize,
        take: usize,
    ) -> Result<Vec<JobStatus>, StoreError> {
        let records = self.records.read();
        let mut matching: Vec<&JobStatus> =
            records.values().filter(|s| filter.matches(s)).collect();
        matching.sort_by(|a, b| {
            b.created_at_ms.cmp(&a.created_at_ms).then_with(|| a.job_id.cmp(&b.job_id))
        });
        Ok(matching.into_iter().skip(skip).take(take).cloned().collect())
    }

    fn prune_terminal_before(&self, cutoff_ms: u64) -> Result<usize, StoreError> {
        let mut records = self.records.write();
        let before = records.len();
        records.retain(|_, s| !(s.state.is_terminal() && s.created_at_ms < cutoff_ms));
        Ok(before - records.len())
    }

    fn metrics(&self) -> Result<JobMetrics, StoreError> {
        let records = self.records.read();
        Ok(aggregate(records.values()))
    }
}

/// Fold status records into [`JobMetrics`].
pub fn aggregate<'a>(statuses: impl Iterator<Item = &'a JobStatus>) -> JobMetrics {
    let mut metrics = JobMetrics::default();
    let mut processing_sum = 0u64;
    let mut processing_n = 0u64;
    let mut wait_sum = 0u64;
    let mut wait_n = 0u64;
    let mut type_processing: HashMap<String, (u64, u64)> = HashMap::new();

    for status in statuses {
        metrics.total_jobs += 1;
        match status.state {
            JobState::Queued => metrics.queue_depth += 1,
            JobState::Processing => metrics.processing += 1,
            JobState::Completed => metrics.completed += 1,
            JobState::Failed => metrics.failed += 1,
            JobState::Cancelled => metrics.cancelled += 1,
            JobState::Retried => metrics.retried += 1,
            JobState::DeadLetter => metrics.dead_letter += 1,
        }
        if let Some(d) = status.processing_duration_ms {
            processing_sum += d;
            processing_n += 1;
        }
        if let Some(w) = status.queue_wait_ms {
            wait_sum += w;
            wait_n += 1;
        }

        let per_type = metrics.by_type.entry(status.job_type.clone()).or_default();
        per_type.total += 1;
        match status.state {
            JobState::Completed => per_type.succeeded += 1,
            JobState::Failed => per_type.failed += 1,
            _ => {}
        }
        if let Some(d) = status.processing_duration_ms {
            let (sum, n) = type_processing.entry(status.job_type.clone()).or_default();
            *sum += d;
            *n += 1;
        }
    }

    if metrics.total_jobs > 0 {
        metrics.failure_rate = metrics.failed as f64 / metrics.total_jobs as f64;
    }
    if processing_n > 0 {
        metrics.avg_processing_ms = processing_sum as f64 / processing_n as f64;
    }
    if wait_n > 0 {
        metrics.avg_queue_wait_ms = wait_sum as f64 / wait_n as f64;
    }
    for (job_type, per_type) in metrics.by_type.iter_mut() {
        if per_type.total > 0 {
            per_type.failure_rate = per_type.failed as f64 / per_type.total as f64;
        }
        if let Some((sum, n)) = type_processing.get(job_type) {
            if *n > 0 {
                per_type.avg_processing_ms = *sum as f64 / *n as f64;
            }
        }
    }
    metrics
}

#[cfg(test)]
#[path = "status_store_tests.rs"]
mod tests;
