// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Engine error types

use thiserror::Error;

/// Errors from the status, task, and audit stores.
///
/// The in-memory implementations never fail; persistence collaborators
/// surface their backend errors through these variants.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("task already exists: {0}")]
    AlreadyExists(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("backend error: {0}")]
    Backend(String),
}

/// Errors from job dispatch.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("idempotency key must not be empty")]
    EmptyIdempotencyKey,
    #[error(transparent)]
    Store(#[from] StoreError),
}
