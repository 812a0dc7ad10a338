// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The data owner's sync loop
//!
//! One `sync()` tick: restore initial state if needed, turn local file
//! changes into accepted events, drain each approved peer's proposed-change
//! inbox through the event cache, fan accepted events out to the syftbox
//! log and per-recipient outboxes, and keep the rolling-state /
//! incremental-checkpoint / compaction ladder moving.
//!
//! Layering of durable history (each layer is advanced before the previous
//! one may be deleted): raw accepted-event objects, per-recipient outbox
//! copies, rolling state, incremental checkpoints, full checkpoint.

use crate::error::SyncError;
use crate::jobs;
use crate::owner_cache::EventCache;
use crate::parallel;
use std::collections::{BTreeMap, VecDeque};
use std::path::PathBuf;
use syftbox_backend::ConnectionRouter;
use syftbox_core::checkpoint::{compact_checkpoints, CHECKPOINT_VERSION};
use syftbox_core::{
    directory_hash, AcceptedEventsMessage, Checkpoint, Clock, DatasitePath, FileChangeEvent,
    IncrementalCheckpoint, RollingState, DEFAULT_COMPACTING_THRESHOLD,
};

/// Cut an incremental checkpoint once the rolling state holds this many
/// events.
pub const DEFAULT_CHECKPOINT_EVENT_THRESHOLD: usize = 50;

/// Upload the rolling state after this many accepted events.
/// Correctness-first default: every acceptance is immediately durable.
pub const DEFAULT_ROLLING_UPLOAD_THRESHOLD: usize = 1;

/// Configuration for the owner sync loop.
#[derive(Debug, Clone)]
pub struct OwnerSyncerConfig {
    pub email: String,
    pub syftbox_folder: Option<PathBuf>,
    pub write_files: bool,
    pub in_memory_cache: bool,
    pub rolling_upload_threshold: usize,
    pub checkpoint_threshold: usize,
    pub compacting_threshold: usize,
    pub fanout_limit: usize,
}

impl OwnerSyncerConfig {
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            syftbox_folder: None,
            write_files: true,
            in_memory_cache: true,
            rolling_upload_threshold: DEFAULT_ROLLING_UPLOAD_THRESHOLD,
            checkpoint_threshold: DEFAULT_CHECKPOINT_EVENT_THRESHOLD,
            compacting_threshold: DEFAULT_COMPACTING_THRESHOLD,
            fanout_limit: parallel::DEFAULT_FANOUT_LIMIT,
        }
    }
}

/// Drives the owner's side of the protocol.
pub struct OwnerSyncer<C: Clock> {
    config: OwnerSyncerConfig,
    clock: C,
    router: ConnectionRouter,
    event_cache: EventCache,
    initial_sync_done: bool,
    log_queue: VecDeque<AcceptedEventsMessage>,
    outbox_queue: VecDeque<(String, AcceptedEventsMessage)>,
    rolling_state: Option<RollingState>,
    events_since_rolling_upload: usize,
    any_shared_collections: Vec<(String, String)>,
}

impl<C: Clock> OwnerSyncer<C> {
    pub fn new(
        config: OwnerSyncerConfig,
        router: ConnectionRouter,
        clock: C,
    ) -> std::io::Result<Self> {
        let event_cache = match (&config.syftbox_folder, config.in_memory_cache) {
            (Some(folder), false) => EventCache::on_disk(&config.email, folder)?,
            _ => EventCache::in_memory(&config.email),
        };
        Ok(Self {
            config,
            clock,
            router,
            event_cache,
            initial_sync_done: false,
            log_queue: VecDeque::new(),
            outbox_queue: VecDeque::new(),
            rolling_state: None,
            events_since_rolling_upload: 0,
            any_shared_collections: Vec::new(),
        })
    }

    pub fn event_cache(&self) -> &EventCache {
        &self.event_cache
    }

    pub fn event_cache_mut(&mut self) -> &mut EventCache {
        &mut self.event_cache
    }

    pub fn router(&self) -> &ConnectionRouter {
        &self.router
    }

    pub fn initial_sync_done(&self) -> bool {
        self.initial_sync_done
    }

    pub fn rolling_event_count(&self) -> usize {
        self.rolling_state.as_ref().map_or(0, RollingState::event_count)
    }

    /// `(tag, content_hash)` of collections shared with anyone; consulted
    /// when a newly approved peer needs explicit grants.
    pub fn any_shared_collections(&self) -> &[(String, String)] {
        &self.any_shared_collections
    }

    pub fn note_any_shared_collection(&mut self, tag: impl Into<String>, hash: impl Into<String>) {
        let entry = (tag.into(), hash.into());
        if !self.any_shared_collections.contains(&entry) {
            self.any_shared_collections.push(entry);
        }
    }

    /// One full sync tick over the given approved peers.
    pub async fn sync(&mut self, peer_emails: &[String]) -> Result<(), SyncError> {
        self.sync_with(peer_emails, true).await
    }

    pub async fn sync_with(
        &mut self,
        peer_emails: &[String],
        recompute_hashes: bool,
    ) -> Result<(), SyncError> {
        if !self.initial_sync_done {
            self.pull_initial_state().await?;
        }

        if recompute_hashes {
            self.process_local_changes(peer_emails).await?;
        }

        for peer_email in peer_emails {
            while self.pull_and_process_next(peer_email, peer_emails).await? {}
        }

        if self.should_compact_checkpoints().await? {
            self.compact_checkpoints().await?;
        }
        Ok(())
    }

    /// Restore state from the backend in layer order: full checkpoint,
    /// incrementals, rolling state, then any event messages newer than all
    /// of them. With no checkpoint layers at all, fall back to the full
    /// event log.
    pub async fn pull_initial_state(&mut self) -> Result<(), SyncError> {
        let write_files = self.config.write_files;
        let mut since: Option<f64> = None;

        let checkpoint = self.router.latest_checkpoint().await?;
        if let Some(checkpoint) = &checkpoint {
            tracing::info!(files = checkpoint.files.len(), "restoring full checkpoint");
            self.event_cache.apply_checkpoint(checkpoint, write_files)?;
            since = checkpoint.last_event_timestamp;
        }

        let incrementals = self.router.incremental_checkpoints().await?;
        if !incrementals.is_empty() {
            tracing::info!(count = incrementals.len(), "applying incremental checkpoints");
        }
        for incremental in &incrementals {
            self.event_cache.apply_restored_events(&incremental.events, write_files)?;
            for event in &incremental.events {
                if since.map_or(true, |mark| event.timestamp > mark) {
                    since = Some(event.timestamp);
                }
            }
        }

        let now = self.clock.epoch_secs();
        match self.router.rolling_state().await? {
            Some(rolling) if rolling.event_count() > 0 => {
                tracing::info!(events = rolling.event_count(), "applying rolling state");
                self.event_cache.apply_restored_events(&rolling.events, write_files)?;
                if let Some(last) = rolling.last_event_timestamp {
                    if since.map_or(true, |mark| last > mark) {
                        since = Some(last);
                    }
                }
                self.rolling_state = Some(rolling);
            }
            _ => {
                self.rolling_state =
                    Some(RollingState::new(&self.config.email, since.unwrap_or(0.0), now));
            }
        }
        self.events_since_rolling_upload = 0;

        if let Some(since) = since {
            let messages = self.router.events_messages_since(since).await?;
            if !messages.is_empty() {
                tracing::info!(count = messages.len(), "downloading events newer than restored state");
            }
            for message in messages {
                self.event_cache.add_events_message_to_local_cache(&message)?;
                self.add_events_to_rolling_state(&message).await?;
            }
        } else if checkpoint.is_none() && incrementals.is_empty() {
            self.pull_full_event_log().await?;
        }

        self.pull_collections().await?;
        self.pull_private_collections().await?;

        self.initial_sync_done = true;
        Ok(())
    }

    async fn pull_full_event_log(&mut self) -> Result<(), SyncError> {
        let since = self.event_cache.latest_cached_timestamp();
        let ids = self.router.accepted_event_ids(since).await?;
        if ids.is_empty() {
            return Ok(());
        }
        tracing::info!(count = ids.len(), "no checkpoints found, downloading full event log");

        let results =
            parallel::download_events_messages(&self.router, ids, self.config.fanout_limit)
                .await?;
        let mut messages: Vec<AcceptedEventsMessage> = results
            .into_iter()
            .filter_map(|result| match result {
                Ok(message) => Some(message),
                Err(err) => {
                    tracing::warn!(error = %err, "skipping undownloadable events message");
                    None
                }
            })
            .collect();
        messages.sort_by(|a, b| {
            a.timestamp()
                .partial_cmp(&b.timestamp())
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.id().cmp(&b.id()))
        });
        for message in messages {
            self.event_cache.add_events_message_to_local_cache(&message)?;
        }
        Ok(())
    }

    /// Submitter of the job a path belongs to, read from the job's config
    /// file in the materialized datasite.
    fn job_submitter(&self, path: &DatasitePath) -> Option<String> {
        let name = jobs::job_name(path)?;
        let config = self.event_cache.read_file(&jobs::job_config_key(name)).ok()??;
        jobs::submitter_from_config(&config)
    }

    /// Turn local file changes into accepted events, routed per recipient
    /// through the job gate.
    pub async fn process_local_changes(&mut self, recipients: &[String]) -> Result<(), SyncError> {
        let now = self.clock.epoch_secs();
        let Some(message) = self.event_cache.process_local_file_changes(now)? else {
            return Ok(());
        };
        tracing::info!(events = message.events.len(), "accepted local file changes");

        self.route_and_queue(&message, recipients, now);
        self.flush_queues().await?;
        self.add_events_to_rolling_state(&message).await?;
        Ok(())
    }

    /// Pull and fully process the next proposed message from one sender,
    /// fanning acceptances out to every approved peer of this tick.
    /// Returns false when the inbox is empty.
    pub async fn pull_and_process_next(
        &mut self,
        sender_email: &str,
        recipients: &[String],
    ) -> Result<bool, SyncError> {
        let Some(message) = self.router.next_proposed_message(sender_email).await? else {
            return Ok(false);
        };

        let now = self.clock.epoch_secs();
        let accepted = self.event_cache.process_proposed_events_message(&message, now)?;
        if let Some(accepted) = &accepted {
            tracing::info!(
                sender = %message.sender_email,
                accepted = accepted.events.len(),
                proposed = message.proposed_changes.len(),
                "accepted proposed changes"
            );
            self.route_and_queue(accepted, recipients, now);
            self.flush_queues().await?;
        }

        self.router.archive_proposed_message(&message).await?;

        if let Some(accepted) = accepted {
            self.add_events_to_rolling_state(&accepted).await?;
        }
        Ok(true)
    }

    /// Queue a message to the syftbox log plus per-recipient outbox copies
    /// filtered through the job gate.
    fn route_and_queue(
        &mut self,
        message: &AcceptedEventsMessage,
        recipients: &[String],
        now: f64,
    ) {
        self.log_queue.push_back(message.clone());

        let mut per_recipient: BTreeMap<String, Vec<FileChangeEvent>> = BTreeMap::new();
        for event in &message.events {
            let submitter = self.job_submitter(&event.path_in_datasite);
            let targets =
                jobs::recipients_for(&event.path_in_datasite, submitter.as_deref(), recipients);
            if targets.is_empty() && jobs::is_job_path(&event.path_in_datasite) {
                tracing::debug!(path = %event.path_in_datasite, "job event not routed: submitter unknown or unapproved");
            }
            for recipient in targets {
                per_recipient.entry(recipient).or_default().push(event.clone());
            }
        }
        for (recipient, events) in per_recipient {
            self.outbox_queue.push_back((recipient, AcceptedEventsMessage::new(events, now)));
        }
    }

    async fn flush_queues(&mut self) -> Result<(), SyncError> {
        while let Some(message) = self.log_queue.pop_front() {
            self.router.write_events_message_to_log(&message).await?;
        }
        while let Some((recipient, message)) = self.outbox_queue.pop_front() {
            self.router.write_events_message_to_outbox(&recipient, &message).await?;
        }
        Ok(())
    }

    async fn add_events_to_rolling_state(
        &mut self,
        message: &AcceptedEventsMessage,
    ) -> Result<(), SyncError> {
        let now = self.clock.epoch_secs();
        let Some(rolling) = self.rolling_state.as_mut() else {
            return Ok(());
        };
        rolling.add_events_message(message, now);
        self.events_since_rolling_upload += message.events.len();

        if self.events_since_rolling_upload >= self.config.rolling_upload_threshold {
            self.upload_rolling_state().await?;
        }
        if self.should_create_checkpoint() {
            self.create_incremental_checkpoint().await?;
        }
        Ok(())
    }

    async fn upload_rolling_state(&mut self) -> Result<(), SyncError> {
        let Some(rolling) = &self.rolling_state else {
            return Ok(());
        };
        if rolling.event_count() == 0 {
            return Ok(());
        }
        self.router.upload_rolling_state(rolling).await?;
        self.events_since_rolling_upload = 0;
        Ok(())
    }

    pub fn should_create_checkpoint(&self) -> bool {
        self.rolling_event_count() >= self.config.checkpoint_threshold
    }

    pub async fn should_compact_checkpoints(&self) -> Result<bool, SyncError> {
        Ok(self.router.incremental_checkpoint_count().await? >= self.config.compacting_threshold)
    }

    /// Freeze the rolling state into the next incremental checkpoint, then
    /// reset it. The rolling state deduplicates on insert, so the events
    /// are already latest-wins per path.
    pub async fn create_incremental_checkpoint(
        &mut self,
    ) -> Result<IncrementalCheckpoint, SyncError> {
        let (events, last_event_timestamp) = match &self.rolling_state {
            Some(rolling) if rolling.event_count() > 0 => {
                (rolling.events.clone(), rolling.last_event_timestamp)
            }
            _ => return Err(SyncError::EmptyRollingState),
        };

        let sequence_number = self.router.next_incremental_sequence_number().await?;
        let checkpoint = IncrementalCheckpoint {
            version: CHECKPOINT_VERSION,
            email: self.config.email.clone(),
            sequence_number,
            timestamp: self.clock.epoch_secs(),
            events,
        };
        tracing::info!(
            sequence_number,
            events = checkpoint.event_count(),
            "creating incremental checkpoint"
        );
        self.router.upload_incremental_checkpoint(&checkpoint).await?;
        self.router.delete_rolling_state().await?;

        let base = last_event_timestamp.unwrap_or(checkpoint.timestamp);
        self.rolling_state =
            Some(RollingState::new(&self.config.email, base, self.clock.epoch_secs()));
        self.events_since_rolling_upload = 0;
        Ok(checkpoint)
    }

    /// Snapshot the full cache state into a new full checkpoint and reset
    /// the rolling state.
    pub async fn create_checkpoint(&mut self) -> Result<Checkpoint, SyncError> {
        let now = self.clock.epoch_secs();
        let last_event_timestamp = self.event_cache.latest_cached_timestamp();
        let checkpoint = self.event_cache.create_checkpoint(now, last_event_timestamp)?;
        tracing::info!(files = checkpoint.files.len(), "creating full checkpoint");
        self.router.upload_checkpoint(&checkpoint).await?;
        self.router.delete_rolling_state().await?;

        let base = last_event_timestamp.unwrap_or(checkpoint.timestamp);
        self.rolling_state = Some(RollingState::new(&self.config.email, base, now));
        self.events_since_rolling_upload = 0;
        Ok(checkpoint)
    }

    /// Fold the previous full checkpoint and all incrementals into one new
    /// full checkpoint, then delete the incrementals.
    pub async fn compact_checkpoints(&mut self) -> Result<Checkpoint, SyncError> {
        let existing = self.router.latest_checkpoint().await?;
        let incrementals = self.router.incremental_checkpoints().await?;
        if incrementals.is_empty() {
            return Err(SyncError::NothingToCompact);
        }

        let compacted = compact_checkpoints(
            &self.config.email,
            existing.as_ref(),
            &incrementals,
            self.clock.epoch_secs(),
        );
        tracing::info!(
            incrementals = incrementals.len(),
            files = compacted.files.len(),
            "compacting checkpoints"
        );
        self.router.upload_checkpoint(&compacted).await?;
        self.router.delete_incremental_checkpoints().await?;
        Ok(compacted)
    }

    /// Incremental + compaction check in one call, for callers driving the
    /// ladder manually.
    pub async fn try_create_checkpoint(&mut self) -> Result<(), SyncError> {
        if self.should_create_checkpoint() {
            self.create_incremental_checkpoint().await?;
        }
        if self.should_compact_checkpoints().await? {
            self.compact_checkpoints().await?;
        }
        Ok(())
    }

    async fn pull_collections(&mut self) -> Result<(), SyncError> {
        let Some(folder) = self.config.syftbox_folder.clone() else {
            return Ok(());
        };
        let collections = self.router.collections_as_do(false).await?;
        for collection in &collections {
            if collection.shared_with_anyone {
                self.note_any_shared_collection(&collection.tag, &collection.content_hash);
            }
        }

        let collections_dir = folder.join(&self.config.email).join("public/syft_datasets");
        for collection in collections {
            let cached = match self.event_cache.collection_hash(&collection.tag) {
                Some(hash) => Some(hash.to_string()),
                None => {
                    let from_disk = directory_hash(&collections_dir.join(&collection.tag))?;
                    if let Some(hash) = &from_disk {
                        self.event_cache.set_collection_hash(&collection.tag, hash.clone());
                    }
                    from_disk
                }
            };
            if cached.as_deref() == Some(collection.content_hash.as_str()) {
                continue;
            }

            let metas = self
                .router
                .collection_file_metas(
                    &self.config.email,
                    &collection.tag,
                    &collection.content_hash,
                    false,
                )
                .await?;
            let ids: Vec<String> = metas.iter().map(|meta| meta.id.clone()).collect();
            let results =
                parallel::download_files(&self.router, ids, self.config.fanout_limit).await?;

            let target = collections_dir.join(&collection.tag);
            std::fs::create_dir_all(&target)?;
            for (meta, result) in metas.iter().zip(results) {
                match result {
                    Ok(data) => std::fs::write(target.join(&meta.name), data)?,
                    Err(err) => {
                        tracing::warn!(name = %meta.name, error = %err, "skipping undownloadable collection file");
                    }
                }
            }
            self.event_cache
                .set_collection_hash(&collection.tag, collection.content_hash.clone());
        }
        Ok(())
    }

    /// Cold-restore owner-private collections; they never travel through
    /// the event channel.
    async fn pull_private_collections(&mut self) -> Result<(), SyncError> {
        let Some(folder) = self.config.syftbox_folder.clone() else {
            return Ok(());
        };
        let collections = self.router.collections_as_do(true).await?;
        for collection in collections {
            let target = folder.join("private/syft_datasets").join(&collection.tag);
            let populated = std::fs::read_dir(&target)
                .map(|mut entries| entries.next().is_some())
                .unwrap_or(false);
            if populated {
                continue;
            }

            let metas = self
                .router
                .collection_file_metas(
                    &self.config.email,
                    &collection.tag,
                    &collection.content_hash,
                    true,
                )
                .await?;
            let ids: Vec<String> = metas.iter().map(|meta| meta.id.clone()).collect();
            let results =
                parallel::download_files(&self.router, ids, self.config.fanout_limit).await?;

            std::fs::create_dir_all(&target)?;
            for (meta, result) in metas.iter().zip(results) {
                match result {
                    Ok(data) => std::fs::write(target.join(&meta.name), data)?,
                    Err(err) => {
                        tracing::warn!(name = %meta.name, error = %err, "skipping undownloadable private file");
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "owner_tests.rs"]
mod tests;
