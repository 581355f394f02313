// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Clock abstraction for testable time handling

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// A clock providing monotonic and wall-clock time
pub trait Clock: Clone + Send + Sync + 'static {
    fn now(&self) -> Instant;
    fn epoch_ms(&self) -> u64;
}

/// Real system clock
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn epoch_ms(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64
    }
}

struct FakeNow {
    instant: Instant,
    epoch_ms: u64,
}

/// Fake clock for testing with manually advanced time
#[derive(Clone)]
pub struct FakeClock {
    inner: Arc<Mutex<FakeNow>>,
}

impl FakeClock {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(FakeNow {
                instant: Instant::now(),
                epoch_ms: 1_700_000_000_000,
            })),
        }
    }

    /// Advance both the monotonic and wall clock by the given duration
    pub fn advance(&self, duration: Duration) {
        let mut now = self.inner.lock();
        now.instant += duration;
        now.epoch_ms += duration.as_millis() as u64;
    }

    /// Set the wall-clock epoch milliseconds
    pub fn set_epoch_ms(&self, ms: u64) {
        self.inner.lock().epoch_ms = ms;
    }
}

impl Default for FakeClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for FakeClock {
    fn now(&self) -> Instant {
        self.inner.lock().instant
    }

    fn epoch_ms(&self) -> u64 {
        self.inner.lock().epoch_ms
    }
}

/// Format epoch milliseconds as an ISO-8601 UTC timestamp.
///
/// Out-of-range values fall back to the epoch origin rather than failing.
pub fn iso_timestamp(epoch_ms: u64) -> String {
    chrono::DateTime::from_timestamp_millis(epoch_ms as i64)
        .unwrap_or_default()
        .to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

#[cfg(test)]
#[path = "clock_tests.rs"]
mod tests;
