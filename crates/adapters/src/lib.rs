// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! mend-adapters: Capability contracts for external collaborators
//!
//! The engine and service consume the hosting platform, the container
//! runtime, and the LLM agents exclusively through the traits defined
//! here, so every one of them can be swapped for a fake in tests.

pub mod agent;
pub mod container;
pub mod platform;
pub mod workspace;

pub use agent::{AgentAdapter, AgentConfig, AgentError, FileEdit, IssueContext, Provider};
pub use container::{ContainerAdapter, ContainerError, ContainerId, ContainerScope, ExecOutput};
pub use platform::{
    NewPullRequest, PlatformAdapter, PlatformError, PullRequest, Reference, Repository,
};
pub use workspace::WorkspacePath;

#[cfg(any(test, feature = "test-support"))]
pub use agent::FakeAgent;
#[cfg(any(test, feature = "test-support"))]
pub use container::FakeContainers;
#[cfg(any(test, feature = "test-support"))]
pub use platform::FakePlatform;
