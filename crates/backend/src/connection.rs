// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The backend connection contract
//!
//! One implementation per object-store product. Connections are NOT
//! thread-safe; fan-out callers must take a [`BackendConnection::copy`] per
//! task. Listings are name-ordered descending and terminate early at the
//! caller's high-water mark, which is what keeps steady-state syncs at
//! O(new events) backend cost.

use crate::error::BackendResult;
use async_trait::async_trait;
use std::collections::BTreeMap;
use syftbox_core::{
    AcceptedEventsMessage, Checkpoint, IncrementalCheckpoint, PeerState, ProposedChangeMessage,
    RollingState, VersionInfo,
};

/// Object metadata returned by listings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileMeta {
    pub id: String,
    pub name: String,
}

/// A discoverable dataset collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileCollection {
    pub folder_id: String,
    pub owner_email: String,
    pub tag: String,
    pub content_hash: String,
    /// Shared with "anyone with the link".
    pub shared_with_anyone: bool,
}

/// Who a collection is shared with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShareTarget {
    Anyone,
    Users(Vec<String>),
}

/// Contract every concrete object-store binding must satisfy.
///
/// All operations act on behalf of the connection's user (`email()`);
/// cross-user visibility is decided by the store's ACLs.
#[async_trait]
pub trait BackendConnection: Send + Sync {
    /// The user this connection acts as.
    fn email(&self) -> &str;

    /// A sibling connection with an independent client, safe to move into a
    /// worker task.
    fn copy(&self) -> Box<dyn BackendConnection>;

    /// Drop any cached folder/file ids.
    fn reset_caches(&self);

    // --- peer lifecycle ---

    /// As DS: create the two inbox/outbox folders to/from `owner_email`,
    /// grant the owner write access, and record the outgoing request in our
    /// own peer-state JSON.
    async fn register_peer_request(&self, owner_email: &str) -> BackendResult<()>;

    /// As DS: every peer recorded in our own peer-state JSON.
    async fn peers_as_ds(&self) -> BackendResult<Vec<String>>;

    /// As DO: peers marked accepted in our peer-state JSON.
    async fn approved_peers_as_do(&self) -> BackendResult<Vec<String>>;

    /// As DO: senders with an inbox folder pointed at us that our
    /// peer-state JSON has not yet accepted or rejected.
    async fn peer_requests_as_do(&self) -> BackendResult<Vec<String>>;

    /// Read-modify-write one entry of our peer-state JSON.
    async fn update_peer_state(&self, peer_email: &str, state: PeerState) -> BackendResult<()>;

    // --- proposed changes ---

    /// As DS: drop a proposed-change message into the recipient's inbox.
    async fn send_proposed_message(
        &self,
        recipient: &str,
        message: &ProposedChangeMessage,
    ) -> BackendResult<()>;

    /// As DO: oldest unprocessed message from `sender_email`, or `None`.
    /// Malformed objects are skipped, never fatal.
    async fn next_proposed_message(
        &self,
        sender_email: &str,
    ) -> BackendResult<Option<ProposedChangeMessage>>;

    /// As DO: move a processed message from the sender's inbox to their
    /// archive folder. Single parent-swap call; never copy-then-delete.
    async fn archive_proposed_message(&self, message: &ProposedChangeMessage)
        -> BackendResult<()>;

    // --- accepted events ---

    /// Append an accepted-events message to our own syftbox log.
    async fn write_events_message_to_log(
        &self,
        message: &AcceptedEventsMessage,
    ) -> BackendResult<String>;

    /// Write an accepted-events message into the outbox toward `recipient`.
    async fn write_events_message_to_outbox(
        &self,
        recipient: &str,
        message: &AcceptedEventsMessage,
    ) -> BackendResult<String>;

    /// Ids of log messages newer than `since_timestamp` (all when `None`).
    async fn accepted_event_ids(
        &self,
        since_timestamp: Option<f64>,
    ) -> BackendResult<Vec<String>>;

    /// Log messages strictly newer than `since_timestamp`, early-terminated.
    async fn events_messages_since(
        &self,
        since_timestamp: f64,
    ) -> BackendResult<Vec<AcceptedEventsMessage>>;

    /// Download one accepted-events message by object id.
    async fn download_events_message(&self, file_id: &str)
        -> BackendResult<AcceptedEventsMessage>;

    /// As DS: metadata of outbox messages from `peer_email` newer than
    /// `since_timestamp`, without downloading payloads.
    async fn outbox_file_metas(
        &self,
        peer_email: &str,
        since_timestamp: Option<f64>,
    ) -> BackendResult<Vec<FileMeta>>;

    // --- checkpoints ---

    /// Upload a full checkpoint, then delete older full checkpoints.
    async fn upload_checkpoint(&self, checkpoint: &Checkpoint) -> BackendResult<String>;

    /// Most recent full checkpoint, `None` when none exists.
    async fn latest_checkpoint(&self) -> BackendResult<Option<Checkpoint>>;

    /// Upload one incremental checkpoint; existing ones accumulate.
    async fn upload_incremental_checkpoint(
        &self,
        checkpoint: &IncrementalCheckpoint,
    ) -> BackendResult<String>;

    /// All incremental checkpoints, sorted by sequence number.
    async fn incremental_checkpoints(&self) -> BackendResult<Vec<IncrementalCheckpoint>>;

    async fn incremental_checkpoint_count(&self) -> BackendResult<usize>;

    /// `max existing sequence + 1`, starting at 1.
    async fn next_incremental_sequence_number(&self) -> BackendResult<u64>;

    /// Delete every incremental checkpoint (after compaction).
    async fn delete_incremental_checkpoints(&self) -> BackendResult<()>;

    // --- rolling state ---

    /// Upload the rolling state. With a cached prior object id this is an
    /// in-place update (one call); on failure it falls back to create.
    async fn upload_rolling_state(&self, state: &RollingState) -> BackendResult<String>;

    async fn rolling_state(&self) -> BackendResult<Option<RollingState>>;

    async fn delete_rolling_state(&self) -> BackendResult<()>;

    // --- dataset collections ---

    /// Idempotently create the content-addressed collection folder.
    async fn create_collection_folder(
        &self,
        tag: &str,
        content_hash: &str,
        private: bool,
    ) -> BackendResult<String>;

    async fn upload_collection_files(
        &self,
        tag: &str,
        content_hash: &str,
        private: bool,
        files: &BTreeMap<String, Vec<u8>>,
    ) -> BackendResult<()>;

    async fn share_collection(
        &self,
        tag: &str,
        content_hash: &str,
        target: &ShareTarget,
    ) -> BackendResult<()>;

    /// Our own collections, shared or private.
    async fn collections_as_do(&self, private: bool) -> BackendResult<Vec<FileCollection>>;

    /// Collections other owners shared with us (or with anyone).
    async fn collections_as_ds(&self) -> BackendResult<Vec<FileCollection>>;

    async fn collection_file_metas(
        &self,
        owner_email: &str,
        tag: &str,
        content_hash: &str,
        private: bool,
    ) -> BackendResult<Vec<FileMeta>>;

    /// Raw object download; thread-safe under the copy discipline.
    async fn download_file(&self, file_id: &str) -> BackendResult<Vec<u8>>;

    // --- version files ---

    /// Create or update our version file at the datasite root.
    async fn write_version_file(&self, info: &VersionInfo) -> BackendResult<()>;

    /// A peer's version file, `None` when missing or unreadable.
    async fn read_peer_version_file(&self, peer_email: &str)
        -> BackendResult<Option<VersionInfo>>;

    /// Grant a peer read access to our version file.
    async fn share_version_file(&self, peer_email: &str) -> BackendResult<()>;

    // --- maintenance ---

    /// Every object id owned by this user.
    async fn all_object_ids(&self) -> BackendResult<Vec<String>>;

    /// Batch delete with configurable tolerance for the two failure kinds
    /// eventual consistency makes common.
    async fn delete_objects(
        &self,
        ids: &[String],
        ignore_permission_denied: bool,
        ignore_not_found: bool,
    ) -> BackendResult<()>;

    /// Objects owned by us whose name matches a known durable prefix.
    /// Used to reclaim orphans after folder deletion.
    async fn find_orphaned_message_files(&self) -> BackendResult<Vec<String>>;
}
