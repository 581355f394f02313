// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Retry policy and pure backoff math

use serde::{Deserialize, Serialize};

/// How the base delay grows with the attempt number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackoffStrategy {
    Constant,
    Linear,
    Exponential,
}

crate::simple_display! {
    BackoffStrategy {
        Constant => "constant",
        Linear => "linear",
        Exponential => "exponential",
    }
}

/// Retry configuration for the processor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    pub enabled: bool,
    pub max_retries: u32,
    pub base_delay_ms: i64,
    pub max_delay_ms: i64,
    pub strategy: BackoffStrategy,
    pub min_jitter: f64,
    pub max_jitter: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            max_retries: 3,
            base_delay_ms: 1_000,
            max_delay_ms: 60_000,
            strategy: BackoffStrategy::Exponential,
            min_jitter: -0.1,
            max_jitter: 0.1,
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    pub fn disabled() -> Self {
        Self { enabled: false, ..Self::default() }
    }

    /// Backoff delay in milliseconds before retry number `attempt`
    /// (0-based), with uniformly sampled jitter.
    pub fn delay_ms(&self, attempt: i32) -> i64 {
        let (lo, hi) = ordered(self.min_jitter, self.max_jitter);
        let jitter = if hi > lo { rand::Rng::gen_range(&mut rand::thread_rng(), lo..=hi) } else { lo };
        self.delay_ms_with_jitter(attempt, jitter)
    }

    /// Deterministic core of [`delay_ms`](Self::delay_ms).
    ///
    /// All arithmetic is f64 and the upper clamp applies before converting
    /// back to integer milliseconds, so no intermediate can overflow.
    /// There is no lower clamp: a negative base delay yields a negative
    /// result, reported as-is.
    pub fn delay_ms_with_jitter(&self, attempt: i32, jitter: f64) -> i64 {
        let factor = match self.strategy {
            BackoffStrategy::Constant => 1.0,
            BackoffStrategy::Linear => f64::from(attempt) + 1.0,
            BackoffStrategy::Exponential => 2f64.powi(attempt),
        };
        let raw = self.base_delay_ms as f64 * factor * (1.0 + jitter);
        let clamped = raw.min(self.max_delay_ms as f64);
        clamped as i64
    }

    /// Whether a failed attempt should be retried.
    ///
    /// `hint` is the handler's own judgement (`retryable` on the failure);
    /// a negative `max_retries` disables retrying outright.
    pub fn should_retry(&self, retry_count: i64, max_retries: i64, hint: bool) -> bool {
        if !self.enabled || max_retries < 0 {
            return false;
        }
        retry_count < max_retries && hint
    }
}

fn ordered(a: f64, b: f64) -> (f64, f64) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

#[cfg(test)]
#[path = "retry_tests.rs"]
mod tests;
