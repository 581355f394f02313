// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use mend_core::test_support::{strategies::arb_job_state, test_job};
use mend_core::{Clock, FakeClock};
use proptest::prelude::*;

fn status_at(job_type: &str, state: JobState, created_at_ms: u64) -> JobStatus {
    let clock = FakeClock::new();
    clock.set_epoch_ms(created_at_ms);
    let job = test_job(job_type, &clock);
    let mut status = JobStatus::queued(&job, clock.epoch_ms());
    match state {
        JobState::Queued => {}
        JobState::Processing => status.mark_processing(created_at_ms + 10),
        JobState::Completed => {
            status.mark_processing(created_at_ms + 10);
            status.mark_completed(created_at_ms + 110);
        }
        JobState::Failed => {
            status.mark_processing(created_at_ms + 10);
            status.mark_failed(created_at_ms + 110, "boom");
        }
        JobState::Cancelled => status.mark_cancelled(created_at_ms + 10),
        JobState::Retried => {
            status.mark_processing(created_at_ms + 10);
            status.mark_retried(created_at_ms + 110, "transient");
        }
        JobState::DeadLetter => {
            status.mark_processing(created_at_ms + 10);
            status.mark_dead_letter(created_at_ms + 110, "exhausted");
        }
    }
    status
}

#[test]
fn set_get_delete_roundtrip() {
    let store = InMemoryStatusStore::new();
    let status = status_at("generate_plan", JobState::Queued, 1_000);
    let id = status.job_id;
    store.set(status).unwrap();
    assert!(store.get(id).unwrap().is_some());
    assert!(store.delete(id).unwrap());
    assert!(store.get(id).unwrap().is_none());
    assert!(!store.delete(id).unwrap());
}

#[test]
fn set_is_upsert() {
    let store = InMemoryStatusStore::new();
    let mut status = status_at("generate_plan", JobState::Queued, 1_000);
    let id = status.job_id;
    store.set(status.clone()).unwrap();
    status.mark_processing(1_100);
    store.set(status).unwrap();
    let got = store.get(id).unwrap().unwrap();
    assert_eq!(got.state, JobState::Processing);
}

#[test]
fn list_orders_newest_first() {
    let store = InMemoryStatusStore::new();
    let older = status_at("a", JobState::Queued, 1_000);
    let newer = status_at("b", JobState::Queued, 2_000);
    store.set(older.clone()).unwrap();
    store.set(newer.clone()).unwrap();
    let listed = store.list(&StatusFilter::default(), 0, 10).unwrap();
    assert_eq!(listed[0].job_id, newer.job_id);
    assert_eq!(listed[1].job_id, older.job_id);
}

#[test]
fn list_ties_broken_by_job_id() {
    let store = InMemoryStatusStore::new();
    let a = status_at("a", JobState::Queued, 1_000);
    let b = status_at("b", JobState::Queued, 1_000);
    store.set(a.clone()).unwrap();
    store.set(b.clone()).unwrap();
    let listed = store.list(&StatusFilter::default(), 0, 10).unwrap();
    let mut expected = vec![a.job_id, b.job_id];
    expected.sort();
    assert_eq!(vec![listed[0].job_id, listed[1].job_id], expected);
}

#[test]
fn list_paging() {
    let store = InMemoryStatusStore::new();
    for i in 0..5 {
        store.set(status_at("t", JobState::Queued, 1_000 + i)).unwrap();
    }
    let page = store.list(&StatusFilter::default(), 2, 2).unwrap();
    assert_eq!(page.len(), 2);
    assert_eq!(page[0].created_at_ms, 1_002);
    assert_eq!(page[1].created_at_ms, 1_001);
}

#[test]
fn list_filters_compose() {
    let store = InMemoryStatusStore::new();
    store.set(status_at("plan", JobState::Completed, 1_000)).unwrap();
    store.set(status_at("plan", JobState::Failed, 1_001)).unwrap();
    store.set(status_at("execute", JobState::Failed, 1_002)).unwrap();

    assert_eq!(store.list_by_state(JobState::Failed, 0, 10).unwrap().len(), 2);
    assert_eq!(store.list_by_type("plan", 0, 10).unwrap().len(), 2);
    assert_eq!(store.list_by_source("Test", 0, 10).unwrap().len(), 3);

    let filter = StatusFilter {
        state: Some(JobState::Failed),
        job_type: Some("plan".into()),
        source: None,
    };
    assert_eq!(store.list(&filter, 0, 10).unwrap().len(), 1);
}

#[test]
fn metrics_counts_and_rates() {
    let store = InMemoryStatusStore::new();
    for i in 0..6 {
        store.set(status_at("t", JobState::Failed, 1_000 + i)).unwrap();
    }
    for i in 0..4 {
        store.set(status_at("t", JobState::Completed, 2_000 + i)).unwrap();
    }
    let metrics = store.metrics().unwrap();
    assert_eq!(metrics.total_jobs, 10);
    assert_eq!(metrics.failed, 6);
    assert_eq!(metrics.completed, 4);
    assert!((metrics.failure_rate - 0.6).abs() < f64::EPSILON);
    assert!((metrics.avg_processing_ms - 100.0).abs() < f64::EPSILON);
}

#[test]
fn metrics_empty_store_is_zero() {
    let store = InMemoryStatusStore::new();
    let metrics = store.metrics().unwrap();
    assert_eq!(metrics.total_jobs, 0);
    assert_eq!(metrics.failure_rate, 0.0);
    assert_eq!(metrics.avg_processing_ms, 0.0);
}

#[test]
fn metrics_by_type_breakdown() {
    let store = InMemoryStatusStore::new();
    store.set(status_at("plan", JobState::Completed, 1_000)).unwrap();
    store.set(status_at("plan", JobState::Failed, 1_001)).unwrap();
    store.set(status_at("execute", JobState::Completed, 1_002)).unwrap();

    let metrics = store.metrics().unwrap();
    let plan = &metrics.by_type["plan"];
    assert_eq!(plan.total, 2);
    assert_eq!(plan.succeeded, 1);
    assert_eq!(plan.failed, 1);
    assert!((plan.failure_rate - 0.5).abs() < f64::EPSILON);
    assert_eq!(metrics.by_type["execute"].failed, 0);
}

#[test]
fn prune_removes_only_old_terminal_records() {
    let store = InMemoryStatusStore::new();
    store.set(status_at("t", JobState::Completed, 1_000)).unwrap();
    store.set(status_at("t", JobState::Queued, 1_000)).unwrap();
    store.set(status_at("t", JobState::Completed, 5_000)).unwrap();

    let removed = store.prune_terminal_before(2_000).unwrap();
    assert_eq!(removed, 1);
    assert_eq!(store.list(&StatusFilter::default(), 0, 10).unwrap().len(), 2);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Total always equals the sum of per-state counts, and the failure
    /// rate identity holds whenever any jobs exist.
    #[test]
    fn metrics_identities(states in proptest::collection::vec(arb_job_state(), 0..32)) {
        let store = InMemoryStatusStore::new();
        for (i, state) in states.iter().enumerate() {
            store.set(status_at("t", *state, 1_000 + i as u64)).unwrap();
        }
        let m = store.metrics().unwrap();
        prop_assert_eq!(
            m.total_jobs,
            m.queue_depth + m.processing + m.completed + m.failed
                + m.cancelled + m.retried + m.dead_letter
        );
        if m.total_jobs > 0 {
            prop_assert!((m.failure_rate - m.failed as f64 / m.total_jobs as f64).abs() < f64::EPSILON);
        } else {
            prop_assert_eq!(m.failure_rate, 0.0);
        }
    }
}
