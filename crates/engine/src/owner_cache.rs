// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The owner's event cache
//!
//! Authoritative local state of a datasite: for every tracked path the cache
//! holds the SHA-256 of its materialized content, and every applied event is
//! recorded by id so re-delivery is a no-op. The store behind it is either
//! in-memory (tests) or the filesystem (production).
//!
//! Invariant: `file_hashes[path]` always equals the hash of the bytes the
//! file store holds for `path`, and excluded prefixes never appear.

use crate::error::SyncError;
use crate::store::{CacheStore, DiskFileStore, MemoryFileStore};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;
use syftbox_core::checkpoint::CHECKPOINT_VERSION;
use syftbox_core::{
    content_hash, decode_content, encode_content, AcceptedEventsMessage, Checkpoint,
    CheckpointFile, CodecError, DatasitePath, FileChangeEvent, ProposedChange,
    ProposedChangeMessage,
};
use uuid::Uuid;

/// Hook fired after every local materialization; `None` content means the
/// path was deleted.
pub type EventWriteHook = Arc<dyn Fn(&DatasitePath, Option<&[u8]>) + Send + Sync>;

pub struct EventCache {
    email: String,
    files: Box<dyn CacheStore>,
    events: Box<dyn CacheStore>,
    file_hashes: BTreeMap<DatasitePath, String>,
    collection_hashes: HashMap<String, String>,
    applied_event_ids: HashSet<Uuid>,
    latest_cached_timestamp: Option<f64>,
    write_hook: Option<EventWriteHook>,
}

impl EventCache {
    /// Cache held entirely in memory.
    pub fn in_memory(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            files: Box::new(MemoryFileStore::new()),
            events: Box::new(MemoryFileStore::new()),
            file_hashes: BTreeMap::new(),
            collection_hashes: HashMap::new(),
            applied_event_ids: HashSet::new(),
            latest_cached_timestamp: None,
            write_hook: None,
        }
    }

    /// Cache materializing into `<syftbox_folder>/<email>`, with applied
    /// events recorded next to it in `<syftbox_folder>-events`.
    pub fn on_disk(email: impl Into<String>, syftbox_folder: &Path) -> std::io::Result<Self> {
        let email = email.into();
        let datasite_dir = syftbox_folder.join(&email);
        let folder_name = syftbox_folder
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "syftbox".to_string());
        let events_dir = syftbox_folder
            .parent()
            .unwrap_or(syftbox_folder)
            .join(format!("{folder_name}-events"));
        Ok(Self {
            email,
            files: Box::new(DiskFileStore::new(datasite_dir)?),
            events: Box::new(DiskFileStore::new(events_dir)?),
            file_hashes: BTreeMap::new(),
            collection_hashes: HashMap::new(),
            applied_event_ids: HashSet::new(),
            latest_cached_timestamp: None,
            write_hook: None,
        })
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn set_event_write_hook(&mut self, hook: EventWriteHook) {
        self.write_hook = Some(hook);
    }

    pub fn file_hashes(&self) -> &BTreeMap<DatasitePath, String> {
        &self.file_hashes
    }

    pub fn current_hash(&self, path: &DatasitePath) -> Option<&str> {
        self.file_hashes.get(path).map(String::as_str)
    }

    /// Max message timestamp ever applied; monotone non-decreasing.
    pub fn latest_cached_timestamp(&self) -> Option<f64> {
        self.latest_cached_timestamp
    }

    pub fn read_file(&self, key: &str) -> std::io::Result<Option<Vec<u8>>> {
        self.files.read(key)
    }

    /// Place raw bytes into the materialized store without tracking them;
    /// the next local-change scan turns them into an event.
    pub fn stage_local_file(&mut self, key: &str, data: &[u8]) -> std::io::Result<()> {
        self.files.write(key, data)
    }

    pub fn collection_hash(&self, tag: &str) -> Option<&str> {
        self.collection_hashes.get(tag).map(String::as_str)
    }

    pub fn set_collection_hash(&mut self, tag: impl Into<String>, hash: impl Into<String>) {
        self.collection_hashes.insert(tag.into(), hash.into());
    }

    pub fn clear(&mut self) -> std::io::Result<()> {
        self.files.clear()?;
        self.events.clear()?;
        self.file_hashes.clear();
        self.collection_hashes.clear();
        self.applied_event_ids.clear();
        self.latest_cached_timestamp = None;
        Ok(())
    }

    fn bump_latest(&mut self, timestamp: f64) {
        if self.latest_cached_timestamp.map_or(true, |latest| timestamp > latest) {
            self.latest_cached_timestamp = Some(timestamp);
        }
    }

    fn fire_hook(&self, path: &DatasitePath, content: Option<&[u8]>) {
        if let Some(hook) = &self.write_hook {
            hook(path, content);
        }
    }

    /// Apply one event: hash table, materialized file, durable event record.
    fn apply_event(&mut self, event: &FileChangeEvent, write_file: bool) -> Result<(), SyncError> {
        let key = event.path_in_datasite.as_str().to_string();
        if event.is_deleted {
            self.file_hashes.remove(&event.path_in_datasite);
            if write_file {
                self.files.delete(&key)?;
            }
            self.fire_hook(&event.path_in_datasite, None);
        } else {
            let bytes = event.content_bytes()?.unwrap_or_default();
            if let Some(hash) = &event.new_hash {
                self.file_hashes.insert(event.path_in_datasite.clone(), hash.clone());
            }
            if write_file {
                self.files.write(&key, &bytes)?;
            }
            self.fire_hook(&event.path_in_datasite, Some(&bytes));
        }

        self.applied_event_ids.insert(event.id);
        let record = serde_json::to_vec(event).map_err(CodecError::from)?;
        self.events.write(&event.id.to_string(), &record)?;
        Ok(())
    }

    /// Walk the materialized datasite and emit events for every content
    /// change: creations, modifications, and vanished tracked files.
    pub fn process_local_file_changes(
        &mut self,
        now: f64,
    ) -> Result<Option<AcceptedEventsMessage>, SyncError> {
        let mut events = Vec::new();
        let mut present = HashSet::new();

        for key in self.files.keys()? {
            let Ok(path) = DatasitePath::new(key.clone()) else {
                continue;
            };
            if path.is_excluded() {
                continue;
            }
            present.insert(path.clone());

            let data = self.files.read(&key)?.unwrap_or_default();
            let hash = content_hash(&data);
            if self.current_hash(&path) == Some(hash.as_str()) {
                continue;
            }

            let old_hash = self.file_hashes.get(&path).cloned();
            let (content, content_type) = encode_content(&data);
            let event = FileChangeEvent {
                id: Uuid::new_v4(),
                datasite_email: self.email.clone(),
                path_in_datasite: path,
                content: Some(content),
                content_type,
                old_hash,
                new_hash: Some(hash),
                is_deleted: false,
                submitted_timestamp: now,
                timestamp: now,
            };
            // Content is already on disk; only the bookkeeping changes.
            self.apply_event(&event, false)?;
            events.push(event);
        }

        let vanished: Vec<DatasitePath> = self
            .file_hashes
            .keys()
            .filter(|path| !present.contains(*path))
            .cloned()
            .collect();
        for path in vanished {
            let old_hash = self.file_hashes.get(&path).cloned();
            let event = FileChangeEvent {
                id: Uuid::new_v4(),
                datasite_email: self.email.clone(),
                path_in_datasite: path,
                content: None,
                content_type: Default::default(),
                old_hash,
                new_hash: None,
                is_deleted: true,
                submitted_timestamp: now,
                timestamp: now,
            };
            self.apply_event(&event, false)?;
            events.push(event);
        }

        if events.is_empty() {
            return Ok(None);
        }
        self.bump_latest(now);
        Ok(Some(AcceptedEventsMessage::new(events, now)))
    }

    /// A change conflicts when the proposer's `old_hash` disagrees with the
    /// cache (absent path ≡ no hash). Deleting a path that does not exist
    /// is a no-op conflict.
    fn is_conflict(&self, change: &ProposedChange) -> bool {
        let current = self.current_hash(&change.path_in_datasite);
        if current != change.old_hash.as_deref() {
            return true;
        }
        change.is_deleted && current.is_none()
    }

    /// Validate and apply each proposed change in list order. Conflicting
    /// changes are dropped silently; the survivors come back stamped as one
    /// accepted message, `None` if nothing survived.
    pub fn process_proposed_events_message(
        &mut self,
        message: &ProposedChangeMessage,
        now: f64,
    ) -> Result<Option<AcceptedEventsMessage>, SyncError> {
        let mut accepted = Vec::new();
        for change in &message.proposed_changes {
            if self.is_conflict(change) {
                tracing::debug!(
                    path = %change.path_in_datasite,
                    sender = %message.sender_email,
                    "dropping conflicting proposed change"
                );
                continue;
            }
            let event = FileChangeEvent::from_proposed(change, now);
            self.apply_event(&event, true)?;
            accepted.push(event);
        }

        if accepted.is_empty() {
            return Ok(None);
        }
        self.bump_latest(now);
        Ok(Some(AcceptedEventsMessage::new(accepted, now)))
    }

    /// Idempotently apply an accepted message; events already seen by id
    /// are ignored.
    pub fn add_events_message_to_local_cache(
        &mut self,
        message: &AcceptedEventsMessage,
    ) -> Result<(), SyncError> {
        for event in &message.events {
            if self.applied_event_ids.contains(&event.id) {
                continue;
            }
            self.apply_event(event, true)?;
        }
        self.bump_latest(message.timestamp());
        Ok(())
    }

    /// Replace cache state with a checkpoint snapshot.
    pub fn apply_checkpoint(
        &mut self,
        checkpoint: &Checkpoint,
        write_files: bool,
    ) -> Result<(), SyncError> {
        self.file_hashes.clear();
        for file in &checkpoint.files {
            self.file_hashes.insert(file.path.clone(), file.hash.clone());
            if write_files {
                let bytes = decode_content(file.content_type, &file.content)?;
                self.files.write(file.path.as_str(), &bytes)?;
            }
        }
        Ok(())
    }

    /// Apply events restored from incremental checkpoints or rolling state.
    pub fn apply_restored_events(
        &mut self,
        events: &[FileChangeEvent],
        write_files: bool,
    ) -> Result<(), SyncError> {
        for event in events {
            self.apply_event(event, write_files)?;
            self.bump_latest(event.timestamp);
        }
        Ok(())
    }

    /// Snapshot the current state into a full checkpoint.
    pub fn create_checkpoint(
        &self,
        timestamp: f64,
        last_event_timestamp: Option<f64>,
    ) -> Result<Checkpoint, SyncError> {
        let mut files = Vec::new();
        for (path, hash) in &self.file_hashes {
            if path.is_excluded() {
                continue;
            }
            let Some(data) = self.files.read(path.as_str())? else {
                continue;
            };
            let (content, content_type) = encode_content(&data);
            files.push(CheckpointFile {
                path: path.clone(),
                hash: hash.clone(),
                content,
                content_type,
            });
        }
        Ok(Checkpoint {
            version: CHECKPOINT_VERSION,
            email: self.email.clone(),
            timestamp,
            last_event_timestamp,
            files,
        })
    }
}

#[cfg(test)]
#[path = "owner_cache_tests.rs"]
mod tests;
