// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! S6: health degrades and recovers with the failure rate.

use super::prelude::*;
use mend_core::test_support::test_job;
use mend_core::{FakeClock, JobStatus};
use mend_engine::health::HealthStatus;

fn seed(h: &Harness, failed: usize, completed: usize) {
    let clock = FakeClock::new();
    for i in 0..(failed + completed) {
        let job = test_job("t", &clock);
        let mut status = JobStatus::queued(&job, 1_000 + i as u64);
        status.mark_processing(1_010);
        if i < failed {
            status.mark_failed(1_020, "boom");
        } else {
            status.mark_completed(1_020);
        }
        h.runtime.statuses().set(status).unwrap();
    }
}

#[tokio::test(start_paused = true)]
async fn failure_rate_drives_overall_status() {
    let h = harness(config_toml(""));
    seed(&h, 6, 4);
    let report = h.runtime.health().check();
    assert_eq!(report.components["job_processing"].status, HealthStatus::Unhealthy);
    assert_eq!(report.status, HealthStatus::Unhealthy);
}

#[tokio::test(start_paused = true)]
async fn thirty_percent_failures_is_degraded() {
    let h = harness(config_toml(""));
    seed(&h, 3, 7);
    let report = h.runtime.health().check();
    assert_eq!(report.components["job_processing"].status, HealthStatus::Degraded);
    assert_eq!(report.status, HealthStatus::Degraded);
}

#[tokio::test(start_paused = true)]
async fn twenty_percent_failures_is_healthy() {
    let h = harness(config_toml(""));
    seed(&h, 2, 8);
    let report = h.runtime.health().check();
    assert_eq!(report.components["job_processing"].status, HealthStatus::Healthy);
    assert_eq!(report.status, HealthStatus::Healthy);
}

#[tokio::test(start_paused = true)]
async fn metrics_identities_hold_in_report() {
    let h = harness(config_toml(""));
    seed(&h, 3, 7);
    let report = h.runtime.health().check();
    let metrics = report.metrics.expect("metrics present");
    assert_eq!(metrics.total_jobs, 10);
    assert_eq!(
        metrics.total_jobs,
        metrics.queue_depth
            + metrics.processing
            + metrics.completed
            + metrics.failed
            + metrics.cancelled
            + metrics.retried
            + metrics.dead_letter
    );
    assert!((metrics.failure_rate - 0.3).abs() < f64::EPSILON);
}

#[tokio::test(start_paused = true)]
async fn retention_cleanup_prunes_old_records() {
    let h = harness(config_toml("[audit]\nretention_days = 1"));
    // Terminal record well past the horizon.
    let clock = FakeClock::new();
    let job = test_job("t", &clock);
    let mut status = JobStatus::queued(&job, 0);
    status.mark_processing(1);
    status.mark_completed(2);
    h.runtime.statuses().set(status).unwrap();

    let report = h.runtime.cleaner().cleanup().unwrap();
    assert_eq!(report.statuses_removed, 1);
}
