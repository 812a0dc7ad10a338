// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Client error type

use crate::config::Role;
use syftbox_backend::BackendError;
use syftbox_engine::{SyncError, VersionError};
use thiserror::Error;

/// Errors surfaced by the manager façade
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("sync error: {0}")]
    Sync(#[from] SyncError),

    #[error("backend error: {0}")]
    Backend(#[from] BackendError),

    #[error("version error: {0}")]
    Version(#[from] VersionError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{operation} requires the {required:?} role")]
    WrongRole { operation: &'static str, required: Role },
}
