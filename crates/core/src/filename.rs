// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Canonical object-name grammar
//!
//! Every durable object carries its timestamp in its name so that backends
//! can order listings by name and terminate early. The shared shape is
//! `<prefix>_<timestamp>_<uuid>.tar.gz`; checkpoints and rolling state use
//! reduced forms defined alongside their models.

use crate::clock::format_timestamp;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Extension shared by every compressed envelope.
pub const ARCHIVE_EXTENSION: &str = ".tar.gz";

/// Prefix for proposed-change messages.
pub const PROPOSED_PREFIX: &str = "msgv2";

/// Prefix for accepted-events messages.
pub const ACCEPTED_PREFIX: &str = "syfteventsmessagev3";

/// Prefix for full checkpoints.
pub const CHECKPOINT_PREFIX: &str = "checkpoint";

/// Prefix for incremental checkpoints.
pub const INCREMENTAL_CHECKPOINT_PREFIX: &str = "incremental_checkpoint";

/// Prefix for rolling-state objects.
pub const ROLLING_STATE_PREFIX: &str = "rolling_state";

/// Errors from parsing object names
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FileNameError {
    #[error("invalid object name: {0}")]
    Invalid(String),
}

/// The `<timestamp>_<uuid>` core of a message object name.
///
/// Serialized inside message payloads as a plain struct; rendered into the
/// object name with a type-specific prefix.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StampedFileName {
    pub timestamp: f64,
    pub id: Uuid,
}

impl StampedFileName {
    /// New name stamped at `timestamp` with a fresh id
    pub fn at(timestamp: f64) -> Self {
        Self { timestamp, id: Uuid::new_v4() }
    }

    pub fn render(&self, prefix: &str) -> String {
        format!(
            "{prefix}_{}_{}{ARCHIVE_EXTENSION}",
            format_timestamp(self.timestamp),
            self.id
        )
    }

    pub fn parse(prefix: &str, name: &str) -> Result<Self, FileNameError> {
        let invalid = || FileNameError::Invalid(name.to_string());

        let rest = name
            .strip_prefix(prefix)
            .and_then(|s| s.strip_prefix('_'))
            .ok_or_else(invalid)?;
        let rest = rest.strip_suffix(ARCHIVE_EXTENSION).ok_or_else(invalid)?;

        let (timestamp, id) = rest.split_once('_').ok_or_else(invalid)?;
        let timestamp: f64 = timestamp.parse().map_err(|_| invalid())?;
        let id: Uuid = id.parse().map_err(|_| invalid())?;
        Ok(Self { timestamp, id })
    }
}

/// Extract the timestamp from any message object name, if it carries one.
///
/// Understands proposed and accepted message names. Used by listings for
/// early termination; names without a parseable timestamp yield `None` and
/// are kept by callers.
pub fn message_timestamp(name: &str) -> Option<f64> {
    for prefix in [PROPOSED_PREFIX, ACCEPTED_PREFIX] {
        if let Ok(parsed) = StampedFileName::parse(prefix, name) {
            return Some(parsed.timestamp);
        }
    }
    None
}

/// True when the name matches any known durable-object prefix.
///
/// The orphan sweep in `delete_syftbox` uses this to reclaim objects that
/// survived their parent folder under eventual consistency.
pub fn is_known_object_name(name: &str) -> bool {
    [
        PROPOSED_PREFIX,
        ACCEPTED_PREFIX,
        // Also covers incremental checkpoints via the shared stem.
        CHECKPOINT_PREFIX,
        INCREMENTAL_CHECKPOINT_PREFIX,
        ROLLING_STATE_PREFIX,
    ]
    .iter()
    .any(|prefix| name.starts_with(&format!("{prefix}_")))
}

#[cfg(test)]
#[path = "filename_tests.rs"]
mod tests;
