// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Identifier types

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Random 19-character suffix for [`crate::define_str_id!`] ids.
pub fn random_suffix() -> String {
    nanoid::nanoid!(19)
}

/// Unique identifier for a background job.
///
/// Jobs are identified by a UUID so ids can be minted anywhere (webhook
/// intake, handlers dispatching follow-ups) without coordination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(Uuid);

impl JobId {
    /// Generate a new random job id
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }

    /// First eight hex characters, for log lines
    pub fn short(&self) -> String {
        let mut s = self.0.simple().to_string();
        s.truncate(8);
        s
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

crate::define_str_id! {
    /// Correlation identifier tying related audit records together.
    ///
    /// Minted once per inbound webhook and carried on every job, status
    /// record, and audit event that work produces.
    pub struct CorrelationId("cor-");
}

#[cfg(test)]
#[path = "id_tests.rs"]
mod tests;
