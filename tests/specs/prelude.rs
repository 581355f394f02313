// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared fixture for scenario tests.

use mend_adapters::agent::{FakeAgent, FileEdit};
use mend_adapters::container::FakeContainers;
use mend_adapters::platform::FakePlatform;
use mend_core::test_support::test_plan;
use mend_core::{FakeClock, TaskId, TaskState};
use mend_service::webhook::{Installation, Issue, IssueEvent, Label, Owner, RepositoryInfo};
use mend_service::{Config, ServiceDeps, ServiceRuntime, TRIGGER_LABEL};
use std::sync::Arc;
use std::time::Duration;

// Store traits in scope for every scenario module.
pub use mend_engine::status_store::JobStatusStore;
pub use mend_engine::task_store::TaskStore;

pub type Runtime = ServiceRuntime<FakeClock, FakePlatform, FakeContainers, FakeAgent>;

pub struct Harness {
    pub runtime: Runtime,
    pub platform: Arc<FakePlatform>,
    pub containers: Arc<FakeContainers>,
    pub agent: FakeAgent,
    pub clock: FakeClock,
}

pub fn config_toml(extra: &str) -> Config {
    let raw = format!(
        r#"
{extra}

[agents.planner]
provider = "open_ai"
api_key = "sk-plan"
model_id = "gpt-plan"

[agents.executor]
provider = "open_ai"
api_key = "sk-exec"
model_id = "gpt-exec"
"#
    );
    Config::from_toml_str(&raw).expect("valid test config")
}

/// Wired service with scripted fakes; not yet started.
pub fn harness(config: Config) -> Harness {
    let platform = Arc::new(FakePlatform::new());
    let containers = Arc::new(FakeContainers::new());
    let agent = FakeAgent::scripted(
        test_plan(),
        vec![FileEdit { path: "src/counter.rs".into(), contents: "locked".into() }],
    );
    let clock = FakeClock::new();
    let deps = ServiceDeps {
        platform: platform.clone(),
        containers: containers.clone(),
        agent: Arc::new(agent.clone()),
    };
    let runtime = ServiceRuntime::build(config, deps, clock.clone()).expect("runtime builds");
    Harness { runtime, platform, containers, agent, clock }
}

pub fn labeled_event(owner: &str, repo: &str, issue_number: u64) -> IssueEvent {
    IssueEvent {
        action: "labeled".into(),
        label: Some(Label { name: TRIGGER_LABEL.into() }),
        issue: Issue {
            number: issue_number,
            title: "counter drifts under load".into(),
            body: "increments vanish when hammered".into(),
        },
        repository: RepositoryInfo {
            name: repo.into(),
            full_name: format!("{owner}/{repo}"),
            owner: Owner { login: owner.into() },
        },
        installation: Installation { id: 7 },
    }
}

/// Poll until the task reaches `state` (paused-time friendly).
pub async fn wait_for_task_state(harness: &Harness, task_id: &TaskId, state: TaskState) {
    for _ in 0..2_000 {
        if let Some(task) = harness.runtime.tasks().get(task_id).unwrap() {
            if task.state == state {
                return;
            }
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    let got = harness.runtime.tasks().get(task_id).unwrap().map(|t| t.state);
    panic!("task {task_id} never reached {state:?}, last seen {got:?}");
}

/// Poll until the job reaches a terminal state and return it.
pub async fn wait_for_terminal_job(
    harness: &Harness,
    job_id: mend_core::JobId,
) -> mend_core::JobStatus {
    for _ in 0..2_000 {
        if let Some(status) = harness.runtime.statuses().get(job_id).unwrap() {
            if status.state.is_terminal() {
                return status;
            }
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("job {job_id} never reached a terminal state");
}
