// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job payload DTOs

use mend_core::TaskId;
use serde::{Deserialize, Serialize};

/// Job type handled by [`crate::GeneratePlanJobHandler`].
pub const GENERATE_PLAN: &str = "generate_plan";
/// Job type handled by [`crate::ExecutePlanJobHandler`].
pub const EXECUTE_PLAN: &str = "execute_plan";

/// Payload of a `generate_plan` job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanRequest {
    pub task_id: TaskId,
    pub installation_id: i64,
    pub owner: String,
    pub repo: String,
    pub issue_number: u64,
    pub issue_title: String,
    pub issue_body: String,
    pub webhook_id: String,
}

/// Payload of an `execute_plan` job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecuteRequest {
    pub task_id: TaskId,
    pub installation_id: i64,
    pub owner: String,
    pub repo: String,
    pub issue_number: u64,
}

impl PlanRequest {
    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}

impl ExecuteRequest {
    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}

#[cfg(test)]
#[path = "payload_tests.rs"]
mod tests;
