// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Hosting-platform API contract

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from platform calls.
#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("rate limited{}", .retry_after_s.map(|s| format!(", retry after {s}s")).unwrap_or_default())]
    RateLimited { retry_after_s: Option<u64> },
    #[error("api error {status}: {message}")]
    Api { status: u16, message: String },
    #[error("network error: {0}")]
    Network(String),
    #[error("authentication failed: {0}")]
    Auth(String),
}

impl PlatformError {
    /// Whether a retry may succeed: rate limits, 5xx responses, and
    /// transport failures are transient; other 4xx are permanent.
    pub fn is_transient(&self) -> bool {
        match self {
            PlatformError::RateLimited { .. } | PlatformError::Network(_) => true,
            PlatformError::Api { status, .. } => *status >= 500,
            PlatformError::Auth(_) => false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Repository {
    pub owner: String,
    pub name: String,
    pub default_branch: String,
}

/// A git reference (branch head).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reference {
    pub ref_name: String,
    pub sha: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PullRequest {
    pub number: u64,
    pub url: String,
    pub title: String,
    pub draft: bool,
    pub head: String,
    pub base: String,
}

/// Parameters for opening a pull request.
#[derive(Debug, Clone)]
pub struct NewPullRequest {
    pub title: String,
    pub body: String,
    pub head: String,
    pub base: String,
    pub draft: bool,
}

/// Narrow surface of the hosting platform used by the job handlers.
///
/// Implementations authenticate per installation; `installation_token`
/// mints the scoped token the container needs for pushes.
#[async_trait]
pub trait PlatformAdapter: Send + Sync + 'static {
    async fn installation_token(&self, installation_id: i64) -> Result<String, PlatformError>;

    async fn get_repository(&self, owner: &str, repo: &str) -> Result<Repository, PlatformError>;

    async fn get_reference(
        &self,
        owner: &str,
        repo: &str,
        ref_name: &str,
    ) -> Result<Reference, PlatformError>;

    async fn create_reference(
        &self,
        owner: &str,
        repo: &str,
        ref_name: &str,
        sha: &str,
    ) -> Result<Reference, PlatformError>;

    async fn create_pull_request(
        &self,
        owner: &str,
        repo: &str,
        params: NewPullRequest,
    ) -> Result<PullRequest, PlatformError>;

    async fn update_pull_request(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
        title: Option<String>,
        body: Option<String>,
    ) -> Result<PullRequest, PlatformError>;

    async fn list_pull_requests(
        &self,
        owner: &str,
        repo: &str,
        head: Option<&str>,
    ) -> Result<Vec<PullRequest>, PlatformError>;

    async fn create_issue_comment(
        &self,
        owner: &str,
        repo: &str,
        issue_number: u64,
        body: &str,
    ) -> Result<(), PlatformError>;
}

#[cfg(any(test, feature = "test-support"))]
#[cfg_attr(coverage_nightly, coverage(off))]
mod fake {
    use super::*;
    use parking_lot::Mutex;
    use std::collections::VecDeque;
    use std::sync::Arc;

    /// Recorded platform call.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct PlatformCall {
        pub operation: String,
        pub detail: String,
    }

    struct FakePlatformState {
        calls: Vec<PlatformCall>,
        failures: VecDeque<PlatformError>,
        op_failures: std::collections::HashMap<String, VecDeque<PlatformError>>,
        pull_requests: Vec<PullRequest>,
        comments: Vec<(u64, String)>,
        next_pr_number: u64,
    }

    /// Fake platform adapter recording calls and replaying scripted
    /// failures.
    #[derive(Clone)]
    pub struct FakePlatform {
        inner: Arc<Mutex<FakePlatformState>>,
    }

    impl Default for FakePlatform {
        fn default() -> Self {
            Self {
                inner: Arc::new(Mutex::new(FakePlatformState {
                    calls: Vec::new(),
                    failures: VecDeque::new(),
                    op_failures: std::collections::HashMap::new(),
                    pull_requests: Vec::new(),
                    comments: Vec::new(),
                    next_pr_number: 1,
                })),
            }
        }
    }

    impl FakePlatform {
        pub fn new() -> Self {
            Self::default()
        }

        /// Queue an error for the next call; calls consume failures in
        /// FIFO order before succeeding.
        pub fn push_failure(&self, error: PlatformError) {
            self.inner.lock().failures.push_back(error);
        }

        /// Queue an error for the next call of one specific operation,
        /// leaving other operations untouched.
        pub fn fail_operation(&self, operation: &str, error: PlatformError) {
            self.inner
                .lock()
                .op_failures
                .entry(operation.to_string())
                .or_default()
                .push_back(error);
        }

        pub fn calls(&self) -> Vec<PlatformCall> {
            self.inner.lock().calls.clone()
        }

        pub fn comments(&self) -> Vec<(u64, String)> {
            self.inner.lock().comments.clone()
        }

        pub fn pull_requests(&self) -> Vec<PullRequest> {
            self.inner.lock().pull_requests.clone()
        }

        fn begin(&self, operation: &str, detail: String) -> Result<(), PlatformError> {
            let mut state = self.inner.lock();
            state
                .calls
                .push(PlatformCall { operation: operation.to_string(), detail });
            if let Some(error) = state
                .op_failures
                .get_mut(operation)
                .and_then(|queue| queue.pop_front())
            {
                return Err(error);
            }
            match state.failures.pop_front() {
                Some(error) => Err(error),
                None => Ok(()),
            }
        }
    }

    #[async_trait]
    impl PlatformAdapter for FakePlatform {
        async fn installation_token(&self, installation_id: i64) -> Result<String, PlatformError> {
            self.begin("InstallationToken", installation_id.to_string())?;
            Ok(format!("token-{installation_id}"))
        }

        async fn get_repository(
            &self,
            owner: &str,
            repo: &str,
        ) -> Result<Repository, PlatformError> {
            self.begin("GetRepository", format!("{owner}/{repo}"))?;
            Ok(Repository {
                owner: owner.to_string(),
                name: repo.to_string(),
                default_branch: "main".to_string(),
            })
        }

        async fn get_reference(
            &self,
            owner: &str,
            repo: &str,
            ref_name: &str,
        ) -> Result<Reference, PlatformError> {
            self.begin("GetReference", format!("{owner}/{repo}@{ref_name}"))?;
            Ok(Reference { ref_name: ref_name.to_string(), sha: "abc123".to_string() })
        }

        async fn create_reference(
            &self,
            owner: &str,
            repo: &str,
            ref_name: &str,
            sha: &str,
        ) -> Result<Reference, PlatformError> {
            self.begin("CreateReference", format!("{owner}/{repo}@{ref_name}"))?;
            Ok(Reference { ref_name: ref_name.to_string(), sha: sha.to_string() })
        }

        async fn create_pull_request(
            &self,
            owner: &str,
            repo: &str,
            params: NewPullRequest,
        ) -> Result<PullRequest, PlatformError> {
            self.begin("CreatePullRequest", format!("{owner}/{repo}: {}", params.title))?;
            let mut state = self.inner.lock();
            let number = state.next_pr_number;
            state.next_pr_number += 1;
            let pr = PullRequest {
                number,
                url: format!("https://example.test/{owner}/{repo}/pull/{number}"),
                title: params.title,
                draft: params.draft,
                head: params.head,
                base: params.base,
            };
            state.pull_requests.push(pr.clone());
            Ok(pr)
        }

        async fn update_pull_request(
            &self,
            owner: &str,
            repo: &str,
            number: u64,
            title: Option<String>,
            _body: Option<String>,
        ) -> Result<PullRequest, PlatformError> {
            self.begin("UpdatePullRequest", format!("{owner}/{repo}#{number}"))?;
            let mut state = self.inner.lock();
            let pr = state
                .pull_requests
                .iter_mut()
                .find(|pr| pr.number == number)
                .ok_or(PlatformError::Api { status: 404, message: format!("pr {number}") })?;
            if let Some(title) = title {
                pr.title = title;
            }
            Ok(pr.clone())
        }

        async fn list_pull_requests(
            &self,
            owner: &str,
            repo: &str,
            head: Option<&str>,
        ) -> Result<Vec<PullRequest>, PlatformError> {
            self.begin("ListPullRequests", format!("{owner}/{repo}"))?;
            let state = self.inner.lock();
            Ok(state
                .pull_requests
                .iter()
                .filter(|pr| head.is_none_or(|h| pr.head == h))
                .cloned()
                .collect())
        }

        async fn create_issue_comment(
            &self,
            owner: &str,
            repo: &str,
            issue_number: u64,
            body: &str,
        ) -> Result<(), PlatformError> {
            self.begin("CreateIssueComment", format!("{owner}/{repo}#{issue_number}"))?;
            self.inner.lock().comments.push((issue_number, body.to_string()));
            Ok(())
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakePlatform, PlatformCall};

#[cfg(test)]
#[path = "platform_tests.rs"]
mod tests;
