// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Engine error type

use syftbox_backend::BackendError;
use syftbox_core::CodecError;
use thiserror::Error;

/// Errors surfaced by the sync loops and caches
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("backend error: {0}")]
    Backend(#[from] BackendError),

    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid change path {path}: {reason}")]
    InvalidChangePath { path: String, reason: String },

    #[error("no rolling state to checkpoint")]
    EmptyRollingState,

    #[error("no incremental checkpoints to compact")]
    NothingToCompact,

    #[error("worker task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}
