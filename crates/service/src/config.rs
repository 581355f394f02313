// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Service configuration: TOML file + defaults + validation

use mend_adapters::agent::AgentConfig;
use mend_core::{BackoffStrategy, RetryPolicy};
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

/// Errors from loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid configuration: {}", .0.join("; "))]
    Invalid(Vec<String>),
}

/// Top-level service configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub audit: AuditConfig,
    #[serde(default)]
    pub background: BackgroundConfig,
    pub agents: AgentsConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    /// Days to keep audit events and terminal job statuses.
    pub retention_days: u32,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self { retention_days: 90 }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BackgroundConfig {
    pub max_concurrency: usize,
    pub max_queue_size: usize,
    pub enable_prioritization: bool,
    /// 0 disables the deadline.
    pub plan_timeout_seconds: u64,
    /// 0 disables the deadline.
    pub execution_timeout_seconds: u64,
    pub retry: RetryConfig,
}

impl Default for BackgroundConfig {
    fn default() -> Self {
        Self {
            max_concurrency: 4,
            max_queue_size: 1_000,
            enable_prioritization: false,
            plan_timeout_seconds: 300,
            execution_timeout_seconds: 1_800,
            retry: RetryConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub enabled: bool,
    pub max_retries: u32,
    pub base_delay_ms: i64,
    pub max_delay_ms: i64,
    pub strategy: BackoffStrategy,
    pub min_jitter: f64,
    pub max_jitter: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        let policy = RetryPolicy::default();
        Self {
            enabled: policy.enabled,
            max_retries: policy.max_retries,
            base_delay_ms: policy.base_delay_ms,
            max_delay_ms: policy.max_delay_ms,
            strategy: policy.strategy,
            min_jitter: policy.min_jitter,
            max_jitter: policy.max_jitter,
        }
    }
}

impl RetryConfig {
    pub fn to_policy(&self) -> RetryPolicy {
        RetryPolicy {
            enabled: self.enabled,
            max_retries: self.max_retries,
            base_delay_ms: self.base_delay_ms,
            max_delay_ms: self.max_delay_ms,
            strategy: self.strategy,
            min_jitter: self.min_jitter,
            max_jitter: self.max_jitter,
        }
    }
}

/// LLM connections per agent role. Planner and executor are required;
/// the thinker is optional.
#[derive(Debug, Clone, Deserialize)]
pub struct AgentsConfig {
    pub planner: AgentConfig,
    pub executor: AgentConfig,
    #[serde(default)]
    pub thinker: Option<AgentConfig>,
}

impl Config {
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(raw)?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }

    /// Collect every violation rather than stopping at the first.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut problems = Vec::new();
        if self.background.max_concurrency == 0 {
            problems.push("background.max_concurrency must be at least 1".to_string());
        }
        if self.background.max_queue_size == 0 {
            problems.push("background.max_queue_size must be at least 1".to_string());
        }
        if self.audit.retention_days == 0 {
            problems.push("audit.retention_days must be at least 1".to_string());
        }
        if let Err(error) = self.agents.planner.validate("planner") {
            problems.push(error.to_string());
        }
        if let Err(error) = self.agents.executor.validate("executor") {
            problems.push(error.to_string());
        }
        if let Some(thinker) = &self.agents.thinker {
            if let Err(error) = thinker.validate("thinker") {
                problems.push(error.to_string());
            }
        }
        if problems.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Invalid(problems))
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
