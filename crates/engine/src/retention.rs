// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Periodic pruning of old audit and status records

use crate::audit_log::{AuditLog, AuditStore};
use crate::error::StoreError;
use crate::status_store::JobStatusStore;
use mend_core::{AuditEvent, AuditKind, Clock};
use std::sync::Arc;

const MS_PER_DAY: u64 = 24 * 60 * 60 * 1_000;

/// What a cleanup pass removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanupReport {
    pub audit_removed: usize,
    pub statuses_removed: usize,
}

/// Deletes audit events and terminal job statuses older than the
/// retention horizon. Driven by an external scheduler; each invocation
/// is one pass.
pub struct RetentionCleaner<C: Clock> {
    audit_store: Arc<dyn AuditStore>,
    statuses: Arc<dyn JobStatusStore>,
    audit: AuditLog<C>,
    clock: C,
    retention_days: u32,
}

impl<C: Clock> RetentionCleaner<C> {
    pub fn new(
        audit_store: Arc<dyn AuditStore>,
        statuses: Arc<dyn JobStatusStore>,
        audit: AuditLog<C>,
        clock: C,
        retention_days: u32,
    ) -> Self {
        Self { audit_store, statuses, audit, clock, retention_days }
    }

    /// Run one cleanup pass.
    ///
    /// Store failures are recorded as an error audit entry and then
    /// propagated to the scheduler.
    pub fn cleanup(&self) -> Result<CleanupReport, StoreError> {
        let cutoff_ms = self
            .clock
            .epoch_ms()
            .saturating_sub(u64::from(self.retention_days) * MS_PER_DAY);

        let result = self.run_pass(cutoff_ms);
        match &result {
            Ok(report) => {
                tracing::info!(
                    audit_removed = report.audit_removed,
                    statuses_removed = report.statuses_removed,
                    retention_days = self.retention_days,
                    "retention cleanup complete"
                );
            }
            Err(error) => {
                self.audit.record(
                    AuditEvent::new(AuditKind::FileOperation, "retention cleanup failed")
                        .with_error(error.to_string()),
                );
            }
        }
        result
    }

    fn run_pass(&self, cutoff_ms: u64) -> Result<CleanupReport, StoreError> {
        let audit_removed = self.audit_store.prune_before(cutoff_ms)?;
        let statuses_removed = self.statuses.prune_terminal_before(cutoff_ms)?;
        Ok(CleanupReport { audit_removed, statuses_removed })
    }
}

#[cfg(test)]
#[path = "retention_tests.rs"]
mod tests;
