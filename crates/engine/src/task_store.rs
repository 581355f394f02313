// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Task store

use crate::error::StoreError;
use mend_core::{Task, TaskId};
use parking_lot::RwLock;
use std::collections::HashMap;

/// Store of per-issue tasks.
///
/// The store enforces id uniqueness on `create` and existence on
/// `update`; state-machine legality is the caller's concern (webhook
/// intake and the plan/execute handlers drive transitions).
pub trait TaskStore: Send + Sync {
    /// Insert a new task. A duplicate id is an [`StoreError::AlreadyExists`].
    fn create(&self, task: Task) -> Result<(), StoreError>;

    fn get(&self, task_id: &TaskId) -> Result<Option<Task>, StoreError>;

    /// Replace an existing task. Missing id is a [`StoreError::NotFound`].
    fn update(&self, task: Task) -> Result<(), StoreError>;
}

/// Process-local task store.
#[derive(Default)]
pub struct InMemoryTaskStore {
    tasks: RwLock<HashMap<TaskId, Task>>,
}

impl InMemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.tasks.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.read().is_empty()
    }
}

impl TaskStore for InMemoryTaskStore {
    fn create(&self, task: Task) -> Result<(), StoreError> {
        let mut tasks = self.tasks.write();
        if tasks.contains_key(&task.id) {
            return Err(StoreError::AlreadyExists(task.id.to_string()));
        }
        tasks.insert(task.id.clone(), task);
        Ok(())
    }

    fn get(&self, task_id: &TaskId) -> Result<Option<Task>, StoreError> {
        Ok(self.tasks.read().get(task_id).cloned())
    }

    fn update(&self, task: Task) -> Result<(), StoreError> {
        let mut tasks = self.tasks.write();
        if !tasks.contains_key(&task.id) {
            return Err(StoreError::NotFound(task.id.to_string()));
        }
        tasks.insert(task.id.clone(), task);
        Ok(())
    }
}

#[cfg(test)]
#[path = "task_store_tests.rs"]
mod tests;
