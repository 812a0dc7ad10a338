// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Rolling state: the live buffer of events since the last checkpoint
//!
//! Uploaded eagerly so a fresh client can resync with two reads (checkpoint
//! plus rolling state) instead of one read per event message. Deduplicated
//! by path on insert: one surviving event per path, latest wins.

use crate::clock::format_timestamp;
use crate::event::{AcceptedEventsMessage, FileChangeEvent};
use crate::filename::{ARCHIVE_EXTENSION, ROLLING_STATE_PREFIX};
use serde::{Deserialize, Serialize};

/// Rolling-state schema version
pub const ROLLING_STATE_VERSION: u32 = 1;

fn rolling_state_version() -> u32 {
    ROLLING_STATE_VERSION
}

/// Events accumulated since the last checkpoint, one per path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RollingState {
    #[serde(default = "rolling_state_version")]
    pub version: u32,
    pub email: String,
    pub timestamp: f64,
    pub base_checkpoint_timestamp: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_event_timestamp: Option<f64>,
    #[serde(default)]
    pub events: Vec<FileChangeEvent>,
}

impl RollingState {
    pub fn new(email: impl Into<String>, base_checkpoint_timestamp: f64, now: f64) -> Self {
        Self {
            version: ROLLING_STATE_VERSION,
            email: email.into(),
            timestamp: now,
            base_checkpoint_timestamp,
            last_event_timestamp: None,
            events: Vec::new(),
        }
    }

    pub fn event_count(&self) -> usize {
        self.events.len()
    }

    /// Add one event; an existing entry for the same path is replaced in
    /// place rather than appended.
    pub fn add_event(&mut self, event: FileChangeEvent, now: f64) {
        if self.last_event_timestamp.map_or(true, |latest| event.timestamp > latest) {
            self.last_event_timestamp = Some(event.timestamp);
        }
        match self
            .events
            .iter_mut()
            .find(|existing| existing.path_in_datasite == event.path_in_datasite)
        {
            Some(existing) => *existing = event,
            None => self.events.push(event),
        }
        self.timestamp = now;
    }

    /// Add every event of an accepted message, deduplicating per path.
    pub fn add_events_message(&mut self, message: &AcceptedEventsMessage, now: f64) {
        for event in &message.events {
            self.add_event(event.clone(), now);
        }
    }

    /// Reset after a checkpoint has been cut.
    pub fn clear(&mut self, new_base_checkpoint_timestamp: f64, now: f64) {
        self.events.clear();
        self.base_checkpoint_timestamp = new_base_checkpoint_timestamp;
        self.last_event_timestamp = None;
        self.timestamp = now;
    }

    /// Object name: `rolling_state_<timestamp>.tar.gz`
    pub fn file_name(&self) -> String {
        format!(
            "{ROLLING_STATE_PREFIX}_{}{ARCHIVE_EXTENSION}",
            format_timestamp(self.timestamp)
        )
    }

    /// Timestamp carried by a rolling-state object name.
    pub fn file_name_timestamp(name: &str) -> Option<f64> {
        let rest = name
            .strip_prefix(ROLLING_STATE_PREFIX)?
            .strip_prefix('_')?
            .strip_suffix(ARCHIVE_EXTENSION)?;
        rest.parse().ok()
    }
}

#[cfg(test)]
#[path = "rolling_tests.rs"]
mod tests;
