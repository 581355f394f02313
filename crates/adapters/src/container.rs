// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Container runtime contract

use crate::workspace::WorkspacePath;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

mend_core::define_str_id! {
    /// Identifier for a provisioned container.
    pub struct ContainerId("ctr-");
}

/// Errors from container operations.
#[derive(Debug, Error)]
pub enum ContainerError {
    #[error("path escapes workspace: {path}")]
    OutOfWorkspace { path: String },
    #[error("container not found: {0}")]
    NotFound(ContainerId),
    #[error("command failed with exit code {exit_code}: {stderr}")]
    CommandFailed { exit_code: i32, stderr: String },
    #[error("runtime error: {0}")]
    Runtime(String),
}

/// Captured output of an in-container command.
#[derive(Debug, Clone, Default)]
pub struct ExecOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl ExecOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Isolated execution environment for one task.
///
/// All file paths are [`WorkspacePath`]s: the escape check happens
/// before any call reaches the runtime. `create` clones the repository
/// at `branch` into the workspace using `token` for authentication.
#[async_trait]
pub trait ContainerAdapter: Send + Sync + 'static {
    async fn create(
        &self,
        owner: &str,
        repo: &str,
        token: &str,
        branch: &str,
        image: Option<&str>,
    ) -> Result<ContainerId, ContainerError>;

    async fn exec(
        &self,
        id: &ContainerId,
        cmd: &str,
        args: &[String],
    ) -> Result<ExecOutput, ContainerError>;

    async fn read_file(
        &self,
        id: &ContainerId,
        path: &WorkspacePath,
    ) -> Result<String, ContainerError>;

    async fn write_file(
        &self,
        id: &ContainerId,
        path: &WorkspacePath,
        contents: &str,
    ) -> Result<(), ContainerError>;

    async fn make_dir(&self, id: &ContainerId, path: &WorkspacePath)
        -> Result<(), ContainerError>;

    async fn dir_exists(
        &self,
        id: &ContainerId,
        path: &WorkspacePath,
    ) -> Result<bool, ContainerError>;

    async fn move_path(
        &self,
        id: &ContainerId,
        from: &WorkspacePath,
        to: &WorkspacePath,
    ) -> Result<(), ContainerError>;

    async fn copy_path(
        &self,
        id: &ContainerId,
        from: &WorkspacePath,
        to: &WorkspacePath,
    ) -> Result<(), ContainerError>;

    async fn delete_path(
        &self,
        id: &ContainerId,
        path: &WorkspacePath,
    ) -> Result<(), ContainerError>;

    async fn list_dir(
        &self,
        id: &ContainerId,
        path: &WorkspacePath,
    ) -> Result<Vec<String>, ContainerError>;

    /// Commit the workspace and push to the container's branch.
    async fn commit_and_push(
        &self,
        id: &ContainerId,
        message: &str,
    ) -> Result<(), ContainerError>;

    async fn cleanup(&self, id: &ContainerId) -> Result<(), ContainerError>;
}

/// Scoped container handle guaranteeing cleanup on every exit path.
///
/// Prefer [`close`](Self::close) for an awaited cleanup; if the scope
/// is dropped without it (early return, error, panic unwind), cleanup
/// is fired on a background task instead.
pub struct ContainerScope<A: ContainerAdapter> {
    adapter: Arc<A>,
    id: ContainerId,
    closed: bool,
}

impl<A: ContainerAdapter> ContainerScope<A> {
    /// Provision a container and wrap it in a scope.
    pub async fn create(
        adapter: Arc<A>,
        owner: &str,
        repo: &str,
        token: &str,
        branch: &str,
        image: Option<&str>,
    ) -> Result<Self, ContainerError> {
        let id = adapter.create(owner, repo, token, branch, image).await?;
        tracing::debug!(container = %id, "container scope opened");
        Ok(Self { adapter, id, closed: false })
    }

    pub fn id(&self) -> &ContainerId {
        &self.id
    }

    pub fn adapter(&self) -> &A {
        &self.adapter
    }

    /// Clean up the container and consume the scope.
    pub async fn close(mut self) -> Result<(), ContainerError> {
        self.closed = true;
        let result = self.adapter.cleanup(&self.id).await;
        if let Err(error) = &result {
            tracing::warn!(container = %self.id, %error, "container cleanup failed");
        }
        result
    }
}

impl<A: ContainerAdapter> Drop for ContainerScope<A> {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        let adapter = Arc::clone(&self.adapter);
        let id = self.id.clone();
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            handle.spawn(async move {
                if let Err(error) = adapter.cleanup(&id).await {
                    tracing::warn!(container = %id, %error, "deferred container cleanup failed");
                }
            });
        } else {
            tracing::warn!(container = %id, "container scope dropped outside a runtime");
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
#[cfg_attr(coverage_nightly, coverage(off))]
mod fake {
    use super::*;
    use parking_lot::Mutex;
    use std::collections::{BTreeMap, HashMap, VecDeque};

    /// Recorded container operation.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct ContainerOp {
        pub container: ContainerId,
        pub operation: String,
        pub detail: String,
    }

    #[derive(Default)]
    struct FakeContainer {
        files: BTreeMap<String, String>,
        dirs: Vec<String>,
        commits: Vec<String>,
        branch: String,
    }

    #[derive(Default)]
    struct FakeContainersState {
        containers: HashMap<ContainerId, FakeContainer>,
        ops: Vec<ContainerOp>,
        failures: VecDeque<ContainerError>,
        cleaned: Vec<ContainerId>,
    }

    /// Fake container runtime with an in-memory filesystem per
    /// container.
    #[derive(Clone, Default)]
    pub struct FakeContainers {
        inner: Arc<Mutex<FakeContainersState>>,
    }

    impl FakeContainers {
        pub fn new() -> Self {
            Self::default()
        }

        /// Queue an error for the next operation.
        pub fn push_failure(&self, error: ContainerError) {
            self.inner.lock().failures.push_back(error);
        }

        pub fn ops(&self) -> Vec<ContainerOp> {
            self.inner.lock().ops.clone()
        }

        pub fn cleaned(&self) -> Vec<ContainerId> {
            self.inner.lock().cleaned.clone()
        }

        /// Contents of a file inside a (possibly cleaned) container.
        pub fn file(&self, id: &ContainerId, path: &str) -> Option<String> {
            self.inner.lock().containers.get(id).and_then(|c| c.files.get(path).cloned())
        }

        pub fn commits(&self, id: &ContainerId) -> Vec<String> {
            self.inner
                .lock()
                .containers
                .get(id)
                .map(|c| c.commits.clone())
                .unwrap_or_default()
        }

        fn begin(
            &self,
            container: &ContainerId,
            operation: &str,
            detail: String,
        ) -> Result<(), ContainerError> {
            let mut state = self.inner.lock();
            state.ops.push(ContainerOp {
                container: container.clone(),
                operation: operation.to_string(),
                detail,
            });
            match state.failures.pop_front() {
                Some(error) => Err(error),
                None => Ok(()),
            }
        }
    }

    #[async_trait]
    impl ContainerAdapter for FakeContainers {
        async fn create(
            &self,
            owner: &str,
            repo: &str,
            _token: &str,
            branch: &str,
            _image: Option<&str>,
        ) -> Result<ContainerId, ContainerError> {
            let id = ContainerId::new();
            self.begin(&id, "Create", format!("{owner}/{repo}@{branch}"))?;
            let mut state = self.inner.lock();
            state.containers.insert(
                id.clone(),
                FakeContainer { branch: branch.to_string(), ..FakeContainer::default() },
            );
            Ok(id)
        }

        async fn exec(
            &self,
            id: &ContainerId,
            cmd: &str,
            args: &[String],
        ) -> Result<ExecOutput, ContainerError> {
            self.begin(id, "Exec", format!("{cmd} {}", args.join(" ")))?;
            let state = self.inner.lock();
            if !state.containers.contains_key(id) {
                return Err(ContainerError::NotFound(id.clone()));
            }
            Ok(ExecOutput { exit_code: 0, stdout: String::new(), stderr: String::new() })
        }

        async fn read_file(
            &self,
            id: &ContainerId,
            path: &WorkspacePath,
        ) -> Result<String, ContainerError> {
            self.begin(id, "ReadFile", path.to_string())?;
            let state = self.inner.lock();
            let container =
                state.containers.get(id).ok_or_else(|| ContainerError::NotFound(id.clone()))?;
            container
                .files
                .get(path.as_str())
                .cloned()
                .ok_or_else(|| ContainerError::Runtime(format!("no such file: {path}")))
        }

        async fn write_file(
            &self,
            id: &ContainerId,
            path: &WorkspacePath,
            contents: &str,
        ) -> Result<(), ContainerError> {
            self.begin(id, "WriteFile", path.to_string())?;
            let mut state = self.inner.lock();
            let container =
                state.containers.get_mut(id).ok_or_else(|| ContainerError::NotFound(id.clone()))?;
            container.files.insert(path.as_str().to_string(), contents.to_string());
            Ok(())
        }

        async fn make_dir(
            &self,
            id: &ContainerId,
            path: &WorkspacePath,
        ) -> Result<(), ContainerError> {
            self.begin(id, "MakeDir", path.to_string())?;
            let mut state = self.inner.lock();
            let container =
                state.containers.get_mut(id).ok_or_else(|| ContainerError::NotFound(id.clone()))?;
            container.dirs.push(path.as_str().to_string());
            Ok(())
        }

        async fn dir_exists(
            &self,
            id: &ContainerId,
            path: &WorkspacePath,
        ) -> Result<bool, ContainerError> {
            self.begin(id, "DirExists", path.to_string())?;
            let state = self.inner.lock();
            let container =
                state.containers.get(id).ok_or_else(|| ContainerError::NotFound(id.clone()))?;
            Ok(container.dirs.iter().any(|d| d == path.as_str()))
        }

        async fn move_path(
            &self,
            id: &ContainerId,
            from: &WorkspacePath,
            to: &WorkspacePath,
        ) -> Result<(), ContainerError> {
            self.begin(id, "Move", format!("{from} -> {to}"))?;
            let mut state = self.inner.lock();
            let container =
                state.containers.get_mut(id).ok_or_else(|| ContainerError::NotFound(id.clone()))?;
            if let Some(contents) = container.files.remove(from.as_str()) {
                container.files.insert(to.as_str().to_string(), contents);
            }
            Ok(())
        }

        async fn copy_path(
            &self,
            id: &ContainerId,
            from: &WorkspacePath,
            to: &WorkspacePath,
        ) -> Result<(), ContainerError> {
            self.begin(id, "Copy", format!("{from} -> {to}"))?;
            let mut state = self.inner.lock();
            let container =
                state.containers.get_mut(id).ok_or_else(|| ContainerError::NotFound(id.clone()))?;
            if let Some(contents) = container.files.get(from.as_str()).cloned() {
                container.files.insert(to.as_str().to_string(), contents);
            }
            Ok(())
        }

        async fn delete_path(
            &self,
            id: &ContainerId,
            path: &WorkspacePath,
        ) -> Result<(), ContainerError> {
            self.begin(id, "Delete", path.to_string())?;
            let mut state = self.inner.lock();
            let container =
                state.containers.get_mut(id).ok_or_else(|| ContainerError::NotFound(id.clone()))?;
            container.files.remove(path.as_str());
            Ok(())
        }

        async fn list_dir(
            &self,
            id: &ContainerId,
            path: &WorkspacePath,
        ) -> Result<Vec<String>, ContainerError> {
            self.begin(id, "List", path.to_string())?;
            let state = self.inner.lock();
            let container =
                state.containers.get(id).ok_or_else(|| ContainerError::NotFound(id.clone()))?;
            let prefix = format!("{}/", path.as_str());
            Ok(container
                .files
                .keys()
                .filter(|f| f.starts_with(&prefix))
                .cloned()
                .collect())
        }

        async fn commit_and_push(
            &self,
            id: &ContainerId,
            message: &str,
        ) -> Result<(), ContainerError> {
            self.begin(id, "CommitAndPush", message.to_string())?;
            let mut state = self.inner.lock();
            let container =
                state.containers.get_mut(id).ok_or_else(|| ContainerError::NotFound(id.clone()))?;
            container.commits.push(message.to_string());
            Ok(())
        }

        async fn cleanup(&self, id: &ContainerId) -> Result<(), ContainerError> {
            self.begin(id, "Cleanup", String::new())?;
            self.inner.lock().cleaned.push(id.clone());
            Ok(())
        }
    }

    impl FakeContainers {
        /// Branch a container was created on.
        pub fn branch(&self, id: &ContainerId) -> Option<String> {
            self.inner.lock().containers.get(id).map(|c| c.branch.clone())
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::{ContainerOp, FakeContainers};

#[cfg(test)]
#[path = "container_tests.rs"]
mod tests;
