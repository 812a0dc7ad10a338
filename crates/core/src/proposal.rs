// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Proposed changes, the pre-acceptance side of the protocol
//!
//! A scientist bundles one or more [`ProposedChange`]s into a
//! [`ProposedChangeMessage`] and drops it into the recipient owner's inbox.
//! The owner stamps whatever survives the hash check into accepted events.

use crate::event::{encode_content, ContentType};
use crate::filename::{FileNameError, StampedFileName, PROPOSED_PREFIX};
use crate::hash::content_hash;
use crate::path::DatasitePath;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// One not-yet-accepted change, shaped like an event minus the acceptance
/// timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProposedChange {
    pub id: Uuid,
    pub datasite_email: String,
    pub path_in_datasite: DatasitePath,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default)]
    pub content_type: ContentType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_hash: Option<String>,
    #[serde(default)]
    pub is_deleted: bool,
    pub submitted_timestamp: f64,
}

impl ProposedChange {
    /// Propose a creation or update; `new_hash` is computed from the raw
    /// bytes, `old_hash` is the proposer's view of the current hash.
    pub fn update(
        datasite_email: impl Into<String>,
        path_in_datasite: DatasitePath,
        data: &[u8],
        old_hash: Option<String>,
        submitted_timestamp: f64,
    ) -> Self {
        let (content, content_type) = encode_content(data);
        Self {
            id: Uuid::new_v4(),
            datasite_email: datasite_email.into(),
            path_in_datasite,
            content: Some(content),
            content_type,
            old_hash,
            new_hash: Some(content_hash(data)),
            is_deleted: false,
            submitted_timestamp,
        }
    }

    /// Propose a deletion of a path the proposer believes exists.
    pub fn deletion(
        datasite_email: impl Into<String>,
        path_in_datasite: DatasitePath,
        old_hash: Option<String>,
        submitted_timestamp: f64,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            datasite_email: datasite_email.into(),
            path_in_datasite,
            content: None,
            content_type: ContentType::Text,
            old_hash,
            new_hash: None,
            is_deleted: true,
            submitted_timestamp,
        }
    }
}

/// Name of a proposed-change message object.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProposalFileName(StampedFileName);

impl ProposalFileName {
    pub fn at(timestamp: f64) -> Self {
        Self(StampedFileName::at(timestamp))
    }

    pub fn timestamp(&self) -> f64 {
        self.0.timestamp
    }

    pub fn id(&self) -> Uuid {
        self.0.id
    }
}

impl fmt::Display for ProposalFileName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.render(PROPOSED_PREFIX))
    }
}

impl FromStr for ProposalFileName {
    type Err = FileNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(StampedFileName::parse(PROPOSED_PREFIX, s)?))
    }
}

/// A bundle of proposed changes from one sender.
///
/// Bundling is the primary write-amplification reducer: one backend write
/// carries the sender's whole pending queue for a recipient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProposedChangeMessage {
    pub id: Uuid,
    pub sender_email: String,
    pub file_name: ProposalFileName,
    pub proposed_changes: Vec<ProposedChange>,
}

impl ProposedChangeMessage {
    pub fn new(
        sender_email: impl Into<String>,
        proposed_changes: Vec<ProposedChange>,
        timestamp: f64,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            sender_email: sender_email.into(),
            file_name: ProposalFileName::at(timestamp),
            proposed_changes,
        }
    }

    pub fn timestamp(&self) -> f64 {
        self.file_name.timestamp()
    }
}

#[cfg(test)]
#[path = "proposal_tests.rs"]
mod tests;
