// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Append-only audit log with a pluggable store

use crate::error::StoreError;
use mend_core::{AuditEvent, AuditKind, Clock, CorrelationId, JobId, JobState, TaskId, TaskState};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

/// Persistence for audit events.
pub trait AuditStore: Send + Sync {
    fn append(&self, event: AuditEvent) -> Result<(), StoreError>;

    /// Newest events first, at most `limit`.
    fn recent(&self, limit: usize) -> Result<Vec<AuditEvent>, StoreError>;

    fn by_kind(&self, kind: AuditKind, limit: usize) -> Result<Vec<AuditEvent>, StoreError>;

    fn by_correlation(
        &self,
        correlation: &CorrelationId,
        limit: usize,
    ) -> Result<Vec<AuditEvent>, StoreError>;

    /// Remove events older than `cutoff_ms`. Returns the number removed.
    fn prune_before(&self, cutoff_ms: u64) -> Result<usize, StoreError>;
}

/// Capped in-memory ring of audit events.
pub struct InMemoryAuditStore {
    events: Mutex<VecDeque<AuditEvent>>,
    capacity: usize,
}

impl InMemoryAuditStore {
    pub fn new(capacity: usize) -> Self {
        Self { events: Mutex::new(VecDeque::new()), capacity }
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }
}

impl Default for InMemoryAuditStore {
    fn default() -> Self {
        Self::new(10_000)
    }
}

impl AuditStore for InMemoryAuditStore {
    fn append(&self, event: AuditEvent) -> Result<(), StoreError> {
        let mut events = self.events.lock();
        if events.len() == self.capacity {
            events.pop_front();
        }
        events.push_back(event);
        Ok(())
    }

    fn recent(&self, limit: usize) -> Result<Vec<AuditEvent>, StoreError> {
        Ok(self.events.lock().iter().rev().take(limit).cloned().collect())
    }

    fn by_kind(&self, kind: AuditKind, limit: usize) -> Result<Vec<AuditEvent>, StoreError> {
        Ok(self
            .events
            .lock()
            .iter()
            .rev()
            .filter(|e| e.kind == kind)
            .take(limit)
            .cloned()
            .collect())
    }

    fn by_correlation(
        &self,
        correlation: &CorrelationId,
        limit: usize,
    ) -> Result<Vec<AuditEvent>, StoreError> {
        Ok(self
            .events
            .lock()
            .iter()
            .rev()
            .filter(|e| e.correlation_id.as_ref() == Some(correlation))
            .take(limit)
            .cloned()
            .collect())
    }

    fn prune_before(&self, cutoff_ms: u64) -> Result<usize, StoreError> {
        let mut events = self.events.lock();
        let before = events.len();
        events.retain(|e| e.timestamp_ms >= cutoff_ms);
        Ok(before - events.len())
    }
}

/// Front door for recording audit events.
///
/// Stamps the timestamp, persists to the store, and mirrors each event
/// to `tracing` under the `audit` target so records land in regular
/// logs too. Store failures are logged and swallowed: auditing never
/// takes down the path being audited.
#[derive(Clone)]
pub struct AuditLog<C: Clock> {
    store: Arc<dyn AuditStore>,
    clock: C,
}

impl<C: Clock> AuditLog<C> {
    pub fn new(store: Arc<dyn AuditStore>, clock: C) -> Self {
        Self { store, clock }
    }

    pub fn store(&self) -> &Arc<dyn AuditStore> {
        &self.store
    }

    /// Stamp and persist `event`.
    pub fn record(&self, mut event: AuditEvent) {
        event.timestamp_ms = self.clock.epoch_ms();
        tracing::info!(
            target: "audit",
            kind = %event.kind,
            timestamp = %event.iso_timestamp(),
            correlation = event.correlation_id.as_ref().map(|c| c.as_str()),
            description = %event.description,
            data = %serde_json::Value::Object(
                event.data.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
            ),
            "AUDIT"
        );
        if let Err(error) = self.store.append(event) {
            tracing::warn!(%error, "audit append failed");
        }
    }

    pub fn webhook_received(&self, delivery: &str, action: &str, correlation: &CorrelationId) {
        self.record(
            AuditEvent::new(AuditKind::WebhookReceived, format!("webhook {action} received"))
                .with_correlation(Some(correlation.clone()))
                .with_data("delivery", delivery)
                .with_data("action", action),
        );
    }

    pub fn webhook_ignored(&self, reason: &str, correlation: &CorrelationId) {
        self.record(
            AuditEvent::new(AuditKind::WebhookValidation, format!("webhook ignored: {reason}"))
                .with_correlation(Some(correlation.clone()))
                .with_result("ignored"),
        );
    }

    pub fn job_dispatched(&self, job_id: JobId, job_type: &str, correlation: Option<CorrelationId>) {
        self.record(
            AuditEvent::new(AuditKind::JobStateTransition, "job dispatched")
                .with_correlation(correlation)
                .with_target(job_id.to_string())
                .with_data("job_type", job_type)
                .with_data("to", JobState::Queued.to_string()),
        );
    }

    pub fn job_state_transition(
        &self,
        job_id: JobId,
        job_type: &str,
        from: JobState,
        to: JobState,
        correlation: Option<CorrelationId>,
        error: Option<&str>,
    ) {
        let mut event =
            AuditEvent::new(AuditKind::JobStateTransition, format!("job {from} -> {to}"))
                .with_correlation(correlation)
                .with_target(job_id.to_string())
                .with_data("job_type", job_type)
                .with_data("from", from.to_string())
                .with_data("to", to.to_string());
        if let Some(error) = error {
            event = event.with_error(error);
        }
        self.record(event);
    }

    pub fn task_state_transition(
        &self,
        task_id: &TaskId,
        from: TaskState,
        to: TaskState,
        correlation: Option<CorrelationId>,
    ) {
        self.record(
            AuditEvent::new(AuditKind::TaskStateTransition, format!("task {from} -> {to}"))
                .with_correlation(correlation)
                .with_target(task_id.to_string())
                .with_data("from", from.to_string())
                .with_data("to", to.to_string()),
        );
    }

    pub fn platform_api_call(
        &self,
        operation: &str,
        duration_ms: u64,
        success: bool,
        error: Option<&str>,
        correlation: Option<CorrelationId>,
    ) {
        let mut event =
            AuditEvent::new(AuditKind::PlatformApiCall, format!("platform call {operation}"))
                .with_correlation(correlation)
                .with_data("operation", operation)
                .with_duration_ms(duration_ms)
                .with_result(if success { "success" } else { "failure" });
        if let Some(error) = error {
            event = event.with_error(error);
        }
        self.record(event);
    }
}

#[cfg(test)]
#[path = "audit_log_tests.rs"]
mod tests;
