// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bounded job queue, FIFO or prioritized

use mend_core::Job;
use parking_lot::Mutex;
use std::collections::{BTreeMap, VecDeque};
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

enum Buffer {
    Fifo(VecDeque<Job>),
    // Keyed by priority; 0 drains first. FIFO within a level.
    Prioritized(BTreeMap<u8, VecDeque<Job>>),
}

impl Buffer {
    fn push(&mut self, job: Job) {
        match self {
            Buffer::Fifo(q) => q.push_back(job),
            Buffer::Prioritized(levels) => {
                levels.entry(job.priority).or_default().push_back(job);
            }
        }
    }

    fn pop(&mut self) -> Option<Job> {
        match self {
            Buffer::Fifo(q) => q.pop_front(),
            Buffer::Prioritized(levels) => {
                let (&priority, _) = levels.iter().find(|(_, q)| !q.is_empty())?;
                let job = levels.get_mut(&priority)?.pop_front();
                if levels.get(&priority).is_some_and(|q| q.is_empty()) {
                    levels.remove(&priority);
                }
                job
            }
        }
    }

    fn len(&self) -> usize {
        match self {
            Buffer::Fifo(q) => q.len(),
            Buffer::Prioritized(levels) => levels.values().map(VecDeque::len).sum(),
        }
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

struct QueueState {
    buffer: Buffer,
    closed: bool,
}

/// Bounded multi-consumer job queue.
///
/// `enqueue` never blocks: it reports overflow by returning `false` and
/// the caller decides what to do with the job. `dequeue` suspends until
/// an item arrives, the queue closes empty, or the token is cancelled.
pub struct JobQueue {
    state: Mutex<QueueState>,
    notify: Notify,
    max_depth: usize,
}

impl JobQueue {
    /// Strict-FIFO queue holding at most `max_depth` jobs.
    pub fn bounded(max_depth: usize) -> Self {
        Self {
            state: Mutex::new(QueueState { buffer: Buffer::Fifo(VecDeque::new()), closed: false }),
            notify: Notify::new(),
            max_depth,
        }
    }

    /// Priority queue (0 highest, FIFO within a level) holding at most
    /// `max_depth` jobs.
    pub fn prioritized(max_depth: usize) -> Self {
        Self {
            state: Mutex::new(QueueState {
                buffer: Buffer::Prioritized(BTreeMap::new()),
                closed: false,
            }),
            notify: Notify::new(),
            max_depth,
        }
    }

    /// Add a job. Returns `false` if the queue is full or closed.
    pub fn enqueue(&self, job: Job) -> bool {
        {
            let mut state = self.state.lock();
            if state.closed || state.buffer.len() >= self.max_depth {
                return false;
            }
            state.buffer.push(job);
        }
        self.notify.notify_one();
        true
    }

    /// Wait for the next job.
    ///
    /// Returns `None` when `cancel` fires or the queue is closed and
    /// drained. Lower-numbered priorities drain first; within a level,
    /// dequeue order equals enqueue order.
    pub async fn dequeue(&self, cancel: &CancellationToken) -> Option<Job> {
        loop {
            // Register the waiter before inspecting state so a wakeup
            // issued between the check and the await is not lost.
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            {
                let mut state = self.state.lock();
                if let Some(job) = state.buffer.pop() {
                    if !state.buffer.is_empty() {
                        // Notify permits do not accumulate past one, so
                        // each consumer re-arms the next while items remain.
                        self.notify.notify_one();
                    }
                    return Some(job);
                }
                if state.closed {
                    return None;
                }
            }
            tokio::select! {
                _ = cancel.cancelled() => return None,
                _ = &mut notified => {}
            }
        }
    }

    /// Current depth. Approximate under concurrent access.
    pub fn len(&self) -> usize {
        self.state.lock().buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Reject further enqueues and wake all waiting consumers.
    pub fn close(&self) {
        self.state.lock().closed = true;
        self.notify.notify_waiters();
    }
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
