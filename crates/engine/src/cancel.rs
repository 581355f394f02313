// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cancellation intents and per-job tokens

use mend_core::JobId;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use tokio_util::sync::CancellationToken;

#[derive(Default)]
struct LedgerState {
    /// Jobs cancelled while still queued; honored lazily at dequeue.
    requested: HashSet<JobId>,
    /// Tokens of jobs currently executing.
    running: HashMap<JobId, CancellationToken>,
}

/// Tracks cancellation intents and the tokens of running jobs.
///
/// The dispatcher records intents; the processor consults them at
/// dequeue time and registers a token for the duration of each attempt.
#[derive(Default)]
pub struct CancelLedger {
    state: Mutex<LedgerState>,
}

impl CancelLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Cancels the live token if the job is
    /// running; otherwise marks an intent for the dequeue check.
    /// Returns `true` if a running job was signalled.
    pub fn request(&self, job_id: JobId) -> bool {
        let mut state = self.state.lock();
        if let Some(token) = state.running.get(&job_id) {
            token.cancel();
            return true;
        }
        state.requested.insert(job_id);
        false
    }

    /// Consume a pending intent for `job_id`.
    pub fn take_requested(&self, job_id: JobId) -> bool {
        self.state.lock().requested.remove(&job_id)
    }

    /// Register the token for a starting attempt. If an intent raced in
    /// while the job sat in the queue, the token is cancelled
    /// immediately.
    pub fn begin(&self, job_id: JobId, token: CancellationToken) {
        let mut state = self.state.lock();
        if state.requested.remove(&job_id) {
            token.cancel();
        }
        state.running.insert(job_id, token);
    }

    /// Remove the token after the attempt finishes.
    pub fn finish(&self, job_id: JobId) {
        self.state.lock().running.remove(&job_id);
    }

    /// Ids of jobs currently executing.
    pub fn running_ids(&self) -> Vec<JobId> {
        self.state.lock().running.keys().copied().collect()
    }
}

#[cfg(test)]
#[path = "cancel_tests.rs"]
mod tests;
