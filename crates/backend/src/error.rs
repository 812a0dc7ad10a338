// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Backend error taxonomy
//!
//! The split drives retry and tolerance policy: transient errors and
//! timeouts are retried with backoff, not-found and permission-denied on
//! deletes are tolerated (eventual consistency leaves tombstones), anything
//! else surfaces.

use std::time::Duration;
use syftbox_core::CodecError;
use thiserror::Error;

/// Errors surfaced by backend connections
#[derive(Debug, Error)]
pub enum BackendError {
    /// Timeouts, 5xx-style failures, quota pressure. Retried by callers.
    #[error("transient backend error: {0}")]
    Transient(String),

    #[error("backend call timed out after {0:?}")]
    Timeout(Duration),

    #[error("object not found: {0}")]
    NotFound(String),

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// Unparseable object name or payload. Logged and skipped by listings.
    #[error("malformed object {name}: {reason}")]
    Malformed { name: String, reason: String },

    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("{0}")]
    Invalid(String),
}

impl BackendError {
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_) | Self::Timeout(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    pub fn is_permission_denied(&self) -> bool {
        matches!(self, Self::PermissionDenied(_))
    }
}

pub type BackendResult<T> = Result<T, BackendError>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
