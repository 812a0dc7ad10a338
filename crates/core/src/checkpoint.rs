// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Checkpoints: snapshots and event batches that collapse sync history
//!
//! A full [`Checkpoint`] is a complete file-state snapshot; an
//! [`IncrementalCheckpoint`] is a deduplicated batch of events between
//! snapshots. Compaction folds the latest full checkpoint plus all
//! incrementals into one new full checkpoint, latest-wins by path.

use crate::clock::format_timestamp;
use crate::event::{ContentType, FileChangeEvent};
use crate::filename::{ARCHIVE_EXTENSION, CHECKPOINT_PREFIX, INCREMENTAL_CHECKPOINT_PREFIX};
use crate::path::DatasitePath;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Checkpoint schema version
pub const CHECKPOINT_VERSION: u32 = 1;

/// Compact once this many incremental checkpoints exist.
pub const DEFAULT_COMPACTING_THRESHOLD: usize = 4;

fn checkpoint_version() -> u32 {
    CHECKPOINT_VERSION
}

/// One file inside a full checkpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointFile {
    pub path: DatasitePath,
    pub hash: String,
    pub content: String,
    #[serde(default)]
    pub content_type: ContentType,
}

/// Complete snapshot of an owner's tracked file state.
///
/// Excludes dataset-collection paths and deleted files. Used to bootstrap a
/// fresh client without replaying event history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    #[serde(default = "checkpoint_version")]
    pub version: u32,
    pub email: String,
    pub timestamp: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_event_timestamp: Option<f64>,
    #[serde(default)]
    pub files: Vec<CheckpointFile>,
}

impl Checkpoint {
    pub fn new(email: impl Into<String>, timestamp: f64) -> Self {
        Self {
            version: CHECKPOINT_VERSION,
            email: email.into(),
            timestamp,
            last_event_timestamp: None,
            files: Vec::new(),
        }
    }

    /// Object name: `checkpoint_<timestamp>.tar.gz`
    pub fn file_name(&self) -> String {
        format!(
            "{CHECKPOINT_PREFIX}_{}{ARCHIVE_EXTENSION}",
            format_timestamp(self.timestamp)
        )
    }

    /// Timestamp carried by a checkpoint object name, `None` when the name
    /// is not a full-checkpoint name.
    pub fn file_name_timestamp(name: &str) -> Option<f64> {
        let rest = name
            .strip_prefix(CHECKPOINT_PREFIX)?
            .strip_prefix('_')?
            .strip_suffix(ARCHIVE_EXTENSION)?;
        rest.parse().ok()
    }

    pub fn file_hashes(&self) -> BTreeMap<DatasitePath, String> {
        self.files
            .iter()
            .map(|file| (file.path.clone(), file.hash.clone()))
            .collect()
    }
}

/// A deduplicated batch of events between full checkpoints.
///
/// Sequence numbers are 1-based and gap-free within a compaction epoch;
/// compaction deletes all incrementals and the numbering restarts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncrementalCheckpoint {
    #[serde(default = "checkpoint_version")]
    pub version: u32,
    pub email: String,
    pub sequence_number: u64,
    pub timestamp: f64,
    #[serde(default)]
    pub events: Vec<FileChangeEvent>,
}

impl IncrementalCheckpoint {
    /// Object name: `incremental_checkpoint_<seq>_<timestamp>.tar.gz`
    pub fn file_name(&self) -> String {
        format!(
            "{INCREMENTAL_CHECKPOINT_PREFIX}_{}_{}{ARCHIVE_EXTENSION}",
            self.sequence_number,
            format_timestamp(self.timestamp)
        )
    }

    /// Sequence number carried by an incremental-checkpoint object name.
    pub fn file_name_sequence(name: &str) -> Option<u64> {
        let rest = name
            .strip_prefix(INCREMENTAL_CHECKPOINT_PREFIX)?
            .strip_prefix('_')?
            .strip_suffix(ARCHIVE_EXTENSION)?;
        let (sequence, _timestamp) = rest.split_once('_')?;
        sequence.parse().ok()
    }

    pub fn event_count(&self) -> usize {
        self.events.len()
    }
}

/// Fold a previous full checkpoint and a set of incrementals into a new full
/// checkpoint.
///
/// Incrementals are applied in sequence order, later events overwriting
/// earlier ones per path. Deleted files and dataset-collection paths are
/// excluded from the result.
pub fn compact_checkpoints(
    email: &str,
    base: Option<&Checkpoint>,
    incrementals: &[IncrementalCheckpoint],
    timestamp: f64,
) -> Checkpoint {
    let mut merged: BTreeMap<DatasitePath, FileChangeEvent> = BTreeMap::new();
    let mut last_event_timestamp = base.and_then(|checkpoint| checkpoint.last_event_timestamp);

    if let Some(base) = base {
        for file in &base.files {
            let event = FileChangeEvent {
                id: Uuid::new_v4(),
                datasite_email: email.to_string(),
                path_in_datasite: file.path.clone(),
                content: Some(file.content.clone()),
                content_type: file.content_type,
                old_hash: None,
                new_hash: Some(file.hash.clone()),
                is_deleted: false,
                submitted_timestamp: base.timestamp,
                timestamp: base.timestamp,
            };
            merged.insert(file.path.clone(), event);
        }
    }

    let mut ordered: Vec<&IncrementalCheckpoint> = incrementals.iter().collect();
    ordered.sort_by_key(|checkpoint| checkpoint.sequence_number);

    for checkpoint in ordered {
        for event in &checkpoint.events {
            if last_event_timestamp.map_or(true, |latest| event.timestamp > latest) {
                last_event_timestamp = Some(event.timestamp);
            }
            merged.insert(event.path_in_datasite.clone(), event.clone());
        }
    }

    let files = merged
        .into_values()
        .filter(|event| !event.is_deleted && !event.path_in_datasite.is_excluded())
        .filter_map(|event| {
            let content = event.content?;
            let hash = event.new_hash?;
            Some(CheckpointFile {
                path: event.path_in_datasite,
                hash,
                content,
                content_type: event.content_type,
            })
        })
        .collect();

    Checkpoint {
        version: CHECKPOINT_VERSION,
        email: email.to_string(),
        timestamp,
        last_event_timestamp,
        files,
    }
}

#[cfg(test)]
#[path = "checkpoint_tests.rs"]
mod tests;
