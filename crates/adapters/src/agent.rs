// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! LLM agent contract: planner and executor

use async_trait::async_trait;
use mend_core::{Plan, PlanStep};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Supported model providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provider {
    OpenAi,
    AzureOpenAi,
}

mend_core::simple_display! {
    Provider {
        OpenAi => "openai",
        AzureOpenAi => "azure_openai",
    }
}

/// Connection settings for one agent role.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    pub provider: Provider,
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub model_id: String,
    #[serde(default)]
    pub azure_endpoint: Option<String>,
    #[serde(default)]
    pub azure_deployment: Option<String>,
}

impl AgentConfig {
    /// Provider-specific completeness check. `role` names the agent in
    /// error messages ("planner", "executor", "thinker").
    pub fn validate(&self, role: &str) -> Result<(), AgentError> {
        let mut missing = Vec::new();
        if self.api_key.is_empty() {
            missing.push("api_key");
        }
        match self.provider {
            Provider::OpenAi => {
                if self.model_id.is_empty() {
                    missing.push("model_id");
                }
            }
            Provider::AzureOpenAi => {
                if self.azure_endpoint.as_deref().unwrap_or_default().is_empty() {
                    missing.push("azure_endpoint");
                }
                if self.azure_deployment.as_deref().unwrap_or_default().is_empty() {
                    missing.push("azure_deployment");
                }
            }
        }
        if missing.is_empty() {
            Ok(())
        } else {
            Err(AgentError::Config(format!("{role}: missing {}", missing.join(", "))))
        }
    }
}

/// Issue context handed to the planner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssueContext {
    pub owner: String,
    pub repo: String,
    pub issue_number: u64,
    pub title: String,
    pub body: String,
}

/// One file change produced by the executor agent for a plan step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEdit {
    /// Workspace-relative path; validated before it reaches the
    /// container.
    pub path: String,
    pub contents: String,
}

/// Errors from agent calls.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("invalid agent configuration: {0}")]
    Config(String),
    #[error("provider error: {0}")]
    Provider(String),
    #[error("model returned an unusable response: {0}")]
    InvalidResponse(String),
}

impl AgentError {
    /// Provider hiccups are transient; config and malformed responses
    /// are not.
    pub fn is_transient(&self) -> bool {
        matches!(self, AgentError::Provider(_))
    }
}

/// The language-model side of the pipeline.
///
/// `plan` turns an issue into an ordered [`Plan`]; `execute_step`
/// produces the concrete file edits for one step of it.
#[async_trait]
pub trait AgentAdapter: Send + Sync + 'static {
    async fn plan(&self, issue: &IssueContext) -> Result<Plan, AgentError>;

    async fn execute_step(
        &self,
        plan: &Plan,
        step: &PlanStep,
    ) -> Result<Vec<FileEdit>, AgentError>;
}

#[cfg(any(test, feature = "test-support"))]
#[cfg_attr(coverage_nightly, coverage(off))]
mod fake {
    use super::*;
    use parking_lot::Mutex;
    use std::collections::VecDeque;
    use std::sync::Arc;

    struct FakeAgentState {
        plan: Plan,
        edits_per_step: Vec<FileEdit>,
        failures: VecDeque<AgentError>,
        plan_calls: u32,
        step_calls: Vec<String>,
        delay: Option<std::time::Duration>,
    }

    /// Fake agent returning a scripted plan and edits.
    #[derive(Clone)]
    pub struct FakeAgent {
        inner: Arc<Mutex<FakeAgentState>>,
    }

    impl FakeAgent {
        /// Agent that answers every `plan` with `plan` and every step
        /// with `edits`.
        pub fn scripted(plan: Plan, edits: Vec<FileEdit>) -> Self {
            Self {
                inner: Arc::new(Mutex::new(FakeAgentState {
                    plan,
                    edits_per_step: edits,
                    failures: VecDeque::new(),
                    plan_calls: 0,
                    step_calls: Vec::new(),
                    delay: None,
                })),
            }
        }

        /// Queue an error for the next call.
        pub fn push_failure(&self, error: AgentError) {
            self.inner.lock().failures.push_back(error);
        }

        /// Make every call sleep first, to exercise timeouts.
        pub fn set_delay(&self, delay: std::time::Duration) {
            self.inner.lock().delay = Some(delay);
        }

        pub fn plan_calls(&self) -> u32 {
            self.inner.lock().plan_calls
        }

        /// Step ids in invocation order.
        pub fn step_calls(&self) -> Vec<String> {
            self.inner.lock().step_calls.clone()
        }
    }

    #[async_trait]
    impl AgentAdapter for FakeAgent {
        async fn plan(&self, _issue: &IssueContext) -> Result<Plan, AgentError> {
            let (delay, outcome) = {
                let mut state = self.inner.lock();
                state.plan_calls += 1;
                let outcome = match state.failures.pop_front() {
                    Some(error) => Err(error),
                    None => Ok(state.plan.clone()),
                };
                (state.delay, outcome)
            };
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            outcome
        }

        async fn execute_step(
            &self,
            _plan: &Plan,
            step: &PlanStep,
        ) -> Result<Vec<FileEdit>, AgentError> {
            let (delay, outcome) = {
                let mut state = self.inner.lock();
                state.step_calls.push(step.id.clone());
                let outcome = match state.failures.pop_front() {
                    Some(error) => Err(error),
                    None => Ok(state.edits_per_step.clone()),
                };
                (state.delay, outcome)
            };
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            outcome
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeAgent;

#[cfg(test)]
#[path = "agent_tests.rs"]
mod tests;
