// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::io::Write;

const MINIMAL: &str = r#"
[agents.planner]
provider = "open_ai"
api_key = "sk-plan"
model_id = "gpt-plan"

[agents.executor]
provider = "open_ai"
api_key = "sk-exec"
model_id = "gpt-exec"
"#;

#[test]
fn minimal_config_uses_defaults() {
    let config = Config::from_toml_str(MINIMAL).unwrap();
    assert_eq!(config.audit.retention_days, 90);
    assert_eq!(config.background.max_concurrency, 4);
    assert_eq!(config.background.max_queue_size, 1_000);
    assert!(!config.background.enable_prioritization);
    assert_eq!(config.background.plan_timeout_seconds, 300);
    assert_eq!(config.background.execution_timeout_seconds, 1_800);
    assert!(config.agents.thinker.is_none());
    assert!(config.validate().is_ok());
}

#[test]
fn overrides_are_honored() {
    let raw = format!(
        r#"
[audit]
retention_days = 30

[background]
max_concurrency = 8
max_queue_size = 64
enable_prioritization = true
plan_timeout_seconds = 0

[background.retry]
max_retries = 5
strategy = "linear"
base_delay_ms = 250
{MINIMAL}
"#
    );
    let config = Config::from_toml_str(&raw).unwrap();
    assert_eq!(config.audit.retention_days, 30);
    assert_eq!(config.background.max_concurrency, 8);
    assert!(config.background.enable_prioritization);
    assert_eq!(config.background.plan_timeout_seconds, 0);

    let policy = config.background.retry.to_policy();
    assert_eq!(policy.max_retries, 5);
    assert_eq!(policy.strategy, mend_core::BackoffStrategy::Linear);
    assert_eq!(policy.base_delay_ms, 250);
    // Unspecified retry fields keep their defaults.
    assert_eq!(policy.max_delay_ms, RetryPolicy::default().max_delay_ms);
}

#[test]
fn azure_agent_parses() {
    let raw = r#"
[agents.planner]
provider = "azure_open_ai"
api_key = "key"
azure_endpoint = "https://unit.openai.azure.test"
azure_deployment = "plan-deploy"

[agents.executor]
provider = "open_ai"
api_key = "sk-exec"
model_id = "gpt-exec"
"#;
    let config = Config::from_toml_str(raw).unwrap();
    assert!(config.validate().is_ok());
}

#[test]
fn missing_agents_section_fails_parse() {
    assert!(Config::from_toml_str("[audit]\nretention_days = 5").is_err());
}

#[test]
fn validation_collects_all_problems() {
    let raw = r#"
[background]
max_concurrency = 0
max_queue_size = 0

[agents.planner]
provider = "open_ai"

[agents.executor]
provider = "azure_open_ai"
api_key = "key"
"#;
    let config = Config::from_toml_str(raw).unwrap();
    let err = config.validate().unwrap_err();
    let message = err.to_string();
    assert!(message.contains("max_concurrency"));
    assert!(message.contains("max_queue_size"));
    assert!(message.contains("planner"));
    assert!(message.contains("azure_endpoint"));
}

#[test]
fn load_reads_from_disk() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(MINIMAL.as_bytes()).unwrap();
    let config = Config::load(file.path()).unwrap();
    assert_eq!(config.agents.planner.model_id, "gpt-plan");
}

#[test]
fn load_missing_file_is_io_error() {
    let err = Config::load(Path::new("/nonexistent/mend.toml")).unwrap_err();
    assert!(matches!(err, ConfigError::Io(_)));
}
