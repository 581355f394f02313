// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Typed audit events

use crate::clock::iso_timestamp;
use crate::id::CorrelationId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Category of an audit event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditKind {
    WebhookReceived,
    WebhookValidation,
    TaskStateTransition,
    PlatformApiCall,
    JobStateTransition,
    ContainerOperation,
    FileOperation,
    PlanGeneration,
    PlanExecution,
}

crate::simple_display! {
    AuditKind {
        WebhookReceived => "webhook_received",
        WebhookValidation => "webhook_validation",
        TaskStateTransition => "task_state_transition",
        PlatformApiCall => "platform_api_call",
        JobStateTransition => "job_state_transition",
        ContainerOperation => "container_operation",
        FileOperation => "file_operation",
        PlanGeneration => "plan_generation",
        PlanExecution => "plan_execution",
    }
}

/// One append-only audit record.
///
/// `data` holds event-specific structured fields; the free-text
/// `description` is for humans. Both must survive serialization so
/// records stay machine-searchable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    pub kind: AuditKind,
    pub timestamp_ms: u64,
    pub correlation_id: Option<CorrelationId>,
    pub description: String,
    pub data: BTreeMap<String, serde_json::Value>,
    pub initiator: Option<String>,
    pub target: Option<String>,
    pub result: Option<String>,
    pub duration_ms: Option<u64>,
    pub error_message: Option<String>,
}

impl AuditEvent {
    /// New event; the audit log stamps `timestamp_ms` at append time.
    pub fn new(kind: AuditKind, description: impl Into<String>) -> Self {
        Self {
            kind,
            timestamp_ms: 0,
            correlation_id: None,
            description: description.into(),
            data: BTreeMap::new(),
            initiator: None,
            target: None,
            result: None,
            duration_ms: None,
            error_message: None,
        }
    }

    pub fn with_correlation(mut self, correlation: Option<CorrelationId>) -> Self {
        self.correlation_id = correlation;
        self
    }

    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    pub fn with_initiator(mut self, initiator: impl Into<String>) -> Self {
        self.initiator = Some(initiator.into());
        self
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    pub fn with_result(mut self, result: impl Into<String>) -> Self {
        self.result = Some(result.into());
        self
    }

    pub fn with_duration_ms(mut self, duration_ms: u64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error_message = Some(error.into());
        self
    }

    /// ISO-8601 rendering of the event timestamp.
    pub fn iso_timestamp(&self) -> String {
        iso_timestamp(self.timestamp_ms)
    }
}

#[cfg(test)]
#[path = "audit_tests.rs"]
mod tests;
