// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Connection routing
//!
//! Dispatches each logical protocol operation to a concrete backend
//! connection and wraps every call in the transient-retry policy. The
//! strategy table is trivial today (everything resolves to the first
//! connection) but is the seam where multi-backend routing would land;
//! `connection_for_parallel_download` is the one strategy that matters now,
//! since it must hand out a fresh copy per worker task.

use crate::connection::{BackendConnection, FileCollection, FileMeta, ShareTarget};
use crate::error::{BackendError, BackendResult};
use crate::retry::{self, RetryPolicy};
use std::collections::BTreeMap;
use syftbox_core::{
    AcceptedEventsMessage, Checkpoint, IncrementalCheckpoint, PeerState, ProposedChangeMessage,
    RollingState, VersionInfo,
};

/// Routes protocol operations to backend connections.
pub struct ConnectionRouter {
    connections: Vec<Box<dyn BackendConnection>>,
    policy: RetryPolicy,
}

impl ConnectionRouter {
    pub fn new(connection: Box<dyn BackendConnection>) -> Self {
        Self { connections: vec![connection], policy: RetryPolicy::default() }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn add_connection(&mut self, connection: Box<dyn BackendConnection>) {
        self.connections.push(connection);
    }

    fn primary(&self) -> BackendResult<&dyn BackendConnection> {
        self.connections
            .first()
            .map(|connection| connection.as_ref())
            .ok_or_else(|| BackendError::Invalid("no backend connections configured".to_string()))
    }

    // --- strategy table ---

    pub fn connection_for_eventlog(&self) -> BackendResult<&dyn BackendConnection> {
        self.primary()
    }

    pub fn connection_for_outbox(&self) -> BackendResult<&dyn BackendConnection> {
        self.primary()
    }

    pub fn connection_for_datasite_watcher(&self) -> BackendResult<&dyn BackendConnection> {
        self.primary()
    }

    pub fn connection_for_own_syftbox(&self) -> BackendResult<&dyn BackendConnection> {
        self.primary()
    }

    /// A fresh copy, safe to move into a worker task.
    pub fn connection_for_parallel_download(&self) -> BackendResult<Box<dyn BackendConnection>> {
        Ok(self.connection_for_datasite_watcher()?.copy())
    }

    /// A fresh copy for parallel version-file reads.
    pub fn connection_for_version_read(&self) -> BackendResult<Box<dyn BackendConnection>> {
        Ok(self.primary()?.copy())
    }

    pub fn reset_caches(&self) -> BackendResult<()> {
        for connection in &self.connections {
            connection.reset_caches();
        }
        Ok(())
    }

    // --- peer lifecycle ---

    pub async fn register_peer_request(&self, owner_email: &str) -> BackendResult<()> {
        let connection = self.primary()?;
        retry::call(&self.policy, || connection.register_peer_request(owner_email)).await
    }

    pub async fn peers_as_ds(&self) -> BackendResult<Vec<String>> {
        let connection = self.primary()?;
        retry::call(&self.policy, || connection.peers_as_ds()).await
    }

    pub async fn approved_peers_as_do(&self) -> BackendResult<Vec<String>> {
        let connection = self.primary()?;
        retry::call(&self.policy, || connection.approved_peers_as_do()).await
    }

    pub async fn peer_requests_as_do(&self) -> BackendResult<Vec<String>> {
        let connection = self.primary()?;
        retry::call(&self.policy, || connection.peer_requests_as_do()).await
    }

    pub async fn update_peer_state(
        &self,
        peer_email: &str,
        state: PeerState,
    ) -> BackendResult<()> {
        let connection = self.primary()?;
        retry::call(&self.policy, || connection.update_peer_state(peer_email, state)).await
    }

    // --- proposed changes ---

    pub async fn send_proposed_message(
        &self,
        recipient: &str,
        message: &ProposedChangeMessage,
    ) -> BackendResult<()> {
        let connection = self.connection_for_outbox()?;
        retry::call(&self.policy, || connection.send_proposed_message(recipient, message)).await
    }

    pub async fn next_proposed_message(
        &self,
        sender_email: &str,
    ) -> BackendResult<Option<ProposedChangeMessage>> {
        let connection = self.primary()?;
        retry::call(&self.policy, || connection.next_proposed_message(sender_email)).await
    }

    pub async fn archive_proposed_message(
        &self,
        message: &ProposedChangeMessage,
    ) -> BackendResult<()> {
        let connection = self.primary()?;
        retry::call(&self.policy, || connection.archive_proposed_message(message)).await
    }

    // --- accepted events ---

    pub async fn write_events_message_to_log(
        &self,
        message: &AcceptedEventsMessage,
    ) -> BackendResult<String> {
        let connection = self.connection_for_eventlog()?;
        retry::call(&self.policy, || connection.write_events_message_to_log(message)).await
    }

    pub async fn write_events_message_to_outbox(
        &self,
        recipient: &str,
        message: &AcceptedEventsMessage,
    ) -> BackendResult<String> {
        let connection = self.connection_for_outbox()?;
        retry::call(&self.policy, || {
            connection.write_events_message_to_outbox(recipient, message)
        })
        .await
    }

    pub async fn accepted_event_ids(
        &self,
        since_timestamp: Option<f64>,
    ) -> BackendResult<Vec<String>> {
        let connection = self.connection_for_eventlog()?;
        retry::call(&self.policy, || connection.accepted_event_ids(since_timestamp)).await
    }

    pub async fn events_messages_since(
        &self,
        since_timestamp: f64,
    ) -> BackendResult<Vec<AcceptedEventsMessage>> {
        let connection = self.connection_for_eventlog()?;
        retry::call(&self.policy, || connection.events_messages_since(since_timestamp)).await
    }

    pub async fn download_events_message(
        &self,
        file_id: &str,
    ) -> BackendResult<AcceptedEventsMessage> {
        let connection = self.connection_for_eventlog()?;
        retry::call(&self.policy, || connection.download_events_message(file_id)).await
    }

    pub async fn outbox_file_metas(
        &self,
        peer_email: &str,
        since_timestamp: Option<f64>,
    ) -> BackendResult<Vec<FileMeta>> {
        let connection = self.connection_for_datasite_watcher()?;
        retry::call(&self.policy, || connection.outbox_file_metas(peer_email, since_timestamp))
            .await
    }

    // --- checkpoints ---

    pub async fn upload_checkpoint(&self, checkpoint: &Checkpoint) -> BackendResult<String> {
        let connection = self.connection_for_own_syftbox()?;
        retry::call(&self.policy, || connection.upload_checkpoint(checkpoint)).await
    }

    pub async fn latest_checkpoint(&self) -> BackendResult<Option<Checkpoint>> {
        let connection = self.connection_for_own_syftbox()?;
        retry::call(&self.policy, || connection.latest_checkpoint()).await
    }

    pub async fn upload_incremental_checkpoint(
        &self,
        checkpoint: &IncrementalCheckpoint,
    ) -> BackendResult<String> {
        let connection = self.connection_for_own_syftbox()?;
        retry::call(&self.policy, || connection.upload_incremental_checkpoint(checkpoint)).await
    }

    pub async fn incremental_checkpoints(&self) -> BackendResult<Vec<IncrementalCheckpoint>> {
        let connection = self.connection_for_own_syftbox()?;
        retry::call(&self.policy, || connection.incremental_checkpoints()).await
    }

    pub async fn incremental_checkpoint_count(&self) -> BackendResult<usize> {
        let connection = self.connection_for_own_syftbox()?;
        retry::call(&self.policy, || connection.incremental_checkpoint_count()).await
    }

    pub async fn next_incremental_sequence_number(&self) -> BackendResult<u64> {
        let connection = self.connection_for_own_syftbox()?;
        retry::call(&self.policy, || connection.next_incremental_sequence_number()).await
    }

    pub async fn delete_incremental_checkpoints(&self) -> BackendResult<()> {
        let connection = self.connection_for_own_syftbox()?;
        retry::call(&self.policy, || connection.delete_incremental_checkpoints()).await
    }

    // --- rolling state ---

    pub async fn upload_rolling_state(&self, state: &RollingState) -> BackendResult<String> {
        let connection = self.connection_for_own_syftbox()?;
        retry::call(&self.policy, || connection.upload_rolling_state(state)).await
    }

    pub async fn rolling_state(&self) -> BackendResult<Option<RollingState>> {
        let connection = self.connection_for_own_syftbox()?;
        retry::call(&self.policy, || connection.rolling_state()).await
    }

    pub async fn delete_rolling_state(&self) -> BackendResult<()> {
        let connection = self.connection_for_own_syftbox()?;
        retry::call(&self.policy, || connection.delete_rolling_state()).await
    }

    // --- dataset collections ---

    pub async fn create_collection_folder(
        &self,
        tag: &str,
        content_hash: &str,
        private: bool,
    ) -> BackendResult<String> {
        let connection = self.primary()?;
        retry::call(&self.policy, || {
            connection.create_collection_folder(tag, content_hash, private)
        })
        .await
    }

    pub async fn upload_collection_files(
        &self,
        tag: &str,
        content_hash: &str,
        private: bool,
        files: &BTreeMap<String, Vec<u8>>,
    ) -> BackendResult<()> {
        let connection = self.primary()?;
        retry::call(&self.policy, || {
            connection.upload_collection_files(tag, content_hash, private, files)
        })
        .await
    }

    pub async fn share_collection(
        &self,
        tag: &str,
        content_hash: &str,
        target: &ShareTarget,
    ) -> BackendResult<()> {
        let connection = self.primary()?;
        retry::call(&self.policy, || connection.share_collection(tag, content_hash, target)).await
    }

    pub async fn collections_as_do(&self, private: bool) -> BackendResult<Vec<FileCollection>> {
        let connection = self.primary()?;
        retry::call(&self.policy, || connection.collections_as_do(private)).await
    }

    pub async fn collections_as_ds(&self) -> BackendResult<Vec<FileCollection>> {
        let connection = self.connection_for_datasite_watcher()?;
        retry::call(&self.policy, || connection.collections_as_ds()).await
    }

    pub async fn collection_file_metas(
        &self,
        owner_email: &str,
        tag: &str,
        content_hash: &str,
        private: bool,
    ) -> BackendResult<Vec<FileMeta>> {
        let connection = self.connection_for_datasite_watcher()?;
        retry::call(&self.policy, || {
            connection.collection_file_metas(owner_email, tag, content_hash, private)
        })
        .await
    }

    pub async fn download_file(&self, file_id: &str) -> BackendResult<Vec<u8>> {
        let connection = self.connection_for_datasite_watcher()?;
        retry::call(&self.policy, || connection.download_file(file_id)).await
    }

    // --- version files ---

    pub async fn write_version_file(&self, info: &VersionInfo) -> BackendResult<()> {
        let connection = self.connection_for_own_syftbox()?;
        retry::call(&self.policy, || connection.write_version_file(info)).await
    }

    pub async fn read_peer_version_file(
        &self,
        peer_email: &str,
    ) -> BackendResult<Option<VersionInfo>> {
        let connection = self.connection_for_datasite_watcher()?;
        retry::call(&self.policy, || connection.read_peer_version_file(peer_email)).await
    }

    pub async fn share_version_file(&self, peer_email: &str) -> BackendResult<()> {
        let connection = self.connection_for_own_syftbox()?;
        retry::call(&self.policy, || connection.share_version_file(peer_email)).await
    }

    // --- maintenance ---

    pub async fn all_object_ids(&self) -> BackendResult<Vec<String>> {
        let connection = self.connection_for_own_syftbox()?;
        retry::call(&self.policy, || connection.all_object_ids()).await
    }

    pub async fn delete_objects(
        &self,
        ids: &[String],
        ignore_permission_denied: bool,
        ignore_not_found: bool,
    ) -> BackendResult<()> {
        let connection = self.connection_for_own_syftbox()?;
        retry::call(&self.policy, || {
            connection.delete_objects(ids, ignore_permission_denied, ignore_not_found)
        })
        .await
    }

    pub async fn find_orphaned_message_files(&self) -> BackendResult<Vec<String>> {
        let connection = self.connection_for_own_syftbox()?;
        retry::call(&self.policy, || connection.find_orphaned_message_files()).await
    }
}

#[cfg(test)]
#[path = "router_tests.rs"]
mod tests;
