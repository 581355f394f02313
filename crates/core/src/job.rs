// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Background job model

use crate::clock::Clock;
use crate::id::{CorrelationId, JobId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default retry budget for jobs that do not override it.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Errors from job construction and validation
#[derive(Debug, Error, PartialEq, Eq)]
pub enum JobError {
    #[error("job type must not be empty")]
    EmptyType,
}

/// A unit of background work.
///
/// The payload is an opaque byte string, typically a serialized DTO the
/// registered handler for `job_type` knows how to read. Priority 0 is the
/// highest; within a priority level the queue is FIFO.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub job_type: String,
    pub payload: Vec<u8>,
    pub priority: u8,
    pub max_retries: u32,
    pub idempotency_key: Option<String>,
    pub parent_id: Option<JobId>,
    pub correlation_id: Option<CorrelationId>,
    pub source: String,
    pub created_at_ms: u64,
}

impl Job {
    /// Create a job of the given type with default priority and retries.
    pub fn new(job_type: impl Into<String>, payload: Vec<u8>, clock: &impl Clock) -> Self {
        Self {
            id: JobId::new(),
            job_type: job_type.into(),
            payload,
            priority: 0,
            max_retries: DEFAULT_MAX_RETRIES,
            idempotency_key: None,
            parent_id: None,
            correlation_id: None,
            source: "Unknown".to_string(),
            created_at_ms: clock.epoch_ms(),
        }
    }

    pub fn with_priority(mut self, priority: u8) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_idempotency_key(mut self, key: impl Into<String>) -> Self {
        self.idempotency_key = Some(key.into());
        self
    }

    pub fn with_parent(mut self, parent: JobId) -> Self {
        self.parent_id = Some(parent);
        self
    }

    pub fn with_correlation(mut self, correlation: CorrelationId) -> Self {
        self.correlation_id = Some(correlation);
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    /// Check construction invariants.
    pub fn validate(&self) -> Result<(), JobError> {
        if self.job_type.is_empty() {
            return Err(JobError::EmptyType);
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
