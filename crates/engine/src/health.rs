// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tri-state health aggregation over stores and queue

use crate::queue::JobQueue;
use crate::status_store::JobStatusStore;
use mend_core::{Clock, JobMetrics};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Queue depth above which the queue component degrades.
pub const QUEUE_DEPTH_DEGRADED: usize = 1_000;
/// Failure rate above which processing degrades.
pub const FAILURE_RATE_DEGRADED: f64 = 0.20;
/// Failure rate above which processing is unhealthy.
pub const FAILURE_RATE_UNHEALTHY: f64 = 0.50;

/// Component or overall health. Ordered so the worst wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

mend_core::simple_display! {
    HealthStatus {
        Healthy => "healthy",
        Degraded => "degraded",
        Unhealthy => "unhealthy",
    }
}

/// One component's contribution to the report.
#[derive(Debug, Clone, Serialize)]
pub struct ComponentHealth {
    pub status: HealthStatus,
    pub description: String,
    pub details: BTreeMap<String, serde_json::Value>,
}

impl ComponentHealth {
    fn new(status: HealthStatus, description: impl Into<String>) -> Self {
        Self { status, description: description.into(), details: BTreeMap::new() }
    }

    fn with_detail(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.details.insert(key.to_string(), value.into());
        self
    }
}

/// Snapshot of overall service health.
#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub timestamp_ms: u64,
    pub components: BTreeMap<String, ComponentHealth>,
    pub metrics: Option<JobMetrics>,
}

/// Builds health reports from the status store and queue.
pub struct HealthAggregator<C: Clock> {
    statuses: Arc<dyn JobStatusStore>,
    queue: Arc<JobQueue>,
    clock: C,
}

impl<C: Clock> HealthAggregator<C> {
    pub fn new(statuses: Arc<dyn JobStatusStore>, queue: Arc<JobQueue>, clock: C) -> Self {
        Self { statuses, queue, clock }
    }

    /// Evaluate all components. Overall status is the worst component.
    ///
    /// Thresholds are inclusive at the healthy side: a failure rate of
    /// exactly 0.20 and a depth of exactly 1000 are still healthy.
    pub fn check(&self) -> HealthReport {
        let mut components = BTreeMap::new();
        let metrics = self.statuses.metrics();

        let database = match &metrics {
            Ok(_) => ComponentHealth::new(HealthStatus::Healthy, "status store reachable"),
            Err(error) => ComponentHealth::new(
                HealthStatus::Unhealthy,
                format!("status store failed: {error}"),
            ),
        };
        components.insert("database".to_string(), database);

        let depth = self.queue.len();
        let queue_status = if depth <= QUEUE_DEPTH_DEGRADED {
            HealthStatus::Healthy
        } else {
            HealthStatus::Degraded
        };
        components.insert(
            "job_queue".to_string(),
            ComponentHealth::new(queue_status, format!("queue depth {depth}"))
                .with_detail("depth", depth),
        );

        let processing = match &metrics {
            Ok(metrics) => {
                let rate = metrics.failure_rate;
                let status = if rate <= FAILURE_RATE_DEGRADED {
                    HealthStatus::Healthy
                } else if rate <= FAILURE_RATE_UNHEALTHY {
                    HealthStatus::Degraded
                } else {
                    HealthStatus::Unhealthy
                };
                ComponentHealth::new(status, format!("failure rate {rate:.2}"))
                    .with_detail("failure_rate", rate)
                    .with_detail("total_jobs", metrics.total_jobs)
            }
            Err(error) => ComponentHealth::new(
                HealthStatus::Unhealthy,
                format!("metrics unavailable: {error}"),
            ),
        };
        components.insert("job_processing".to_string(), processing);

        let status = components
            .values()
            .map(|c| c.status)
            .max()
            .unwrap_or(HealthStatus::Healthy);

        HealthReport {
            status,
            timestamp_ms: self.clock.epoch_ms(),
            components,
            metrics: metrics.ok(),
        }
    }
}

#[cfg(test)]
#[path = "health_tests.rs"]
mod tests;
