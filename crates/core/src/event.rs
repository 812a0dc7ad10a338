// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! File-change events and accepted-events messages
//!
//! A [`FileChangeEvent`] is the atomic unit of the protocol: one accepted
//! change to one path, stamped by the owner. Events travel bundled in an
//! [`AcceptedEventsMessage`] whose filename timestamp is the monotone clock
//! used for sync ordering.

use crate::envelope::CodecError;
use crate::filename::{FileNameError, StampedFileName, ACCEPTED_PREFIX};
use crate::path::DatasitePath;
use crate::proposal::ProposedChange;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// How file content is carried inside the JSON payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    #[default]
    Text,
    Binary,
}

/// Encode raw bytes for the wire: UTF-8 stays text, everything else is
/// base64-tagged binary.
pub fn encode_content(data: &[u8]) -> (String, ContentType) {
    match std::str::from_utf8(data) {
        Ok(text) => (text.to_string(), ContentType::Text),
        Err(_) => (BASE64.encode(data), ContentType::Binary),
    }
}

/// Decode wire content back to raw bytes.
pub fn decode_content(content_type: ContentType, content: &str) -> Result<Vec<u8>, CodecError> {
    match content_type {
        ContentType::Text => Ok(content.as_bytes().to_vec()),
        ContentType::Binary => Ok(BASE64.decode(content)?),
    }
}

/// One accepted change to one datasite path.
///
/// Invariants: `is_deleted` implies `new_hash == None` and `content == None`;
/// otherwise `new_hash` is the SHA-256 of the decoded content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileChangeEvent {
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
    pub timestamp: f64,
}

impl FileChangeEvent {
    /// Stamp a validated proposed change with its acceptance time.
    pub fn from_proposed(proposed: &ProposedChange, timestamp: f64) -> Self {
        Self {
            id: proposed.id,
            datasite_email: proposed.datasite_email.clone(),
            path_in_datasite: proposed.path_in_datasite.clone(),
            content: proposed.content.clone(),
            content_type: proposed.content_type,
            old_hash: proposed.old_hash.clone(),
            new_hash: proposed.new_hash.clone(),
            is_deleted: proposed.is_deleted,
            submitted_timestamp: proposed.submitted_timestamp,
            timestamp,
        }
    }

    /// Decoded content bytes, `None` for deletions.
    pub fn content_bytes(&self) -> Result<Option<Vec<u8>>, CodecError> {
        match &self.content {
            Some(content) => Ok(Some(decode_content(self.content_type, content)?)),
            None => Ok(None),
        }
    }

    /// Syftbox-relative path: `<datasite_email>/<path_in_datasite>`.
    pub fn path_in_syftbox(&self) -> String {
        self.path_in_datasite.in_syftbox(&self.datasite_email)
    }
}

/// Name of an accepted-events message object.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventsMessageFileName(StampedFileName);

impl EventsMessageFileName {
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

impl fmt::Display for EventsMessageFileName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.render(ACCEPTED_PREFIX))
    }
}

impl FromStr for EventsMessageFileName {
    type Err = FileNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(StampedFileName::parse(ACCEPTED_PREFIX, s)?))
    }
}

/// A bundle of accepted events from one owner sync tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcceptedEventsMessage {
    pub file_name: EventsMessageFileName,
    pub events: Vec<FileChangeEvent>,
}

impl AcceptedEventsMessage {
    pub fn new(events: Vec<FileChangeEvent>, timestamp: f64) -> Self {
        Self { file_name: EventsMessageFileName::at(timestamp), events }
    }

    /// Message-level timestamp, the sync-ordering clock.
    pub fn timestamp(&self) -> f64 {
        self.file_name.timestamp()
    }

    pub fn id(&self) -> Uuid {
        self.file_name.id()
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
