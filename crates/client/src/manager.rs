// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The role-aware manager façade
//!
//! Composes the role-specific syncer, version manager, peer directory, and
//! file writer over one backend connection. Owner managers run the
//! acceptance loop; scientist managers propose changes and mirror peers.

use crate::config::{ManagerConfig, Role};
use crate::error::ClientError;
use crate::writer::{FileChange, FileWriter};
use std::collections::BTreeMap;
use syftbox_backend::{BackendConnection, ConnectionRouter, ShareTarget};
use syftbox_core::{collection_hash, Clock, Peer, SystemClock, VersionInfo};
use syftbox_engine::{
    OwnerSyncer, OwnerSyncerConfig, PeerDirectory, VersionManager, WatcherCache, WatcherSyncer,
};
use tokio::sync::mpsc;

/// One participant's entry point to the synchronization engine.
pub struct Manager<C: Clock = SystemClock> {
    config: ManagerConfig,
    writer: FileWriter,
    changes_rx: mpsc::UnboundedReceiver<FileChange>,
    owner: Option<OwnerSyncer<C>>,
    watcher: Option<WatcherSyncer<C>>,
    versions: VersionManager,
    peers: PeerDirectory,
    /// The manager's own router, over a copy of the connection; the
    /// syncers hold their own.
    router: ConnectionRouter,
}

impl<C: Clock> Manager<C> {
    pub fn from_config(
        config: ManagerConfig,
        connection: Box<dyn BackendConnection>,
        clock: C,
    ) -> Result<Self, ClientError> {
        let (writer, changes_rx) =
            FileWriter::new(config.syftbox_folder.clone(), config.write_files);
        let router = ConnectionRouter::new(connection.copy());

        let mut owner = None;
        let mut watcher = None;
        match config.role {
            Role::Owner => {
                let owner_config = OwnerSyncerConfig {
                    email: config.email.clone(),
                    syftbox_folder: config.syftbox_folder.clone(),
                    write_files: config.write_files,
                    in_memory_cache: config.in_memory_cache,
                    rolling_upload_threshold: config.rolling_upload_threshold,
                    checkpoint_threshold: config.checkpoint_threshold,
                    compacting_threshold: config.compacting_threshold,
                    fanout_limit: config.fanout_limit,
                };
                owner = Some(OwnerSyncer::new(
                    owner_config,
                    ConnectionRouter::new(connection),
                    clock.clone(),
                )?);
            }
            Role::Scientist => {
                let cache = match (&config.syftbox_folder, config.in_memory_cache) {
                    (Some(folder), false) => WatcherCache::on_disk(folder)?,
                    _ => WatcherCache::in_memory(),
                };
                watcher = Some(WatcherSyncer::new(
                    config.email.clone(),
                    config.syftbox_folder.clone(),
                    ConnectionRouter::new(connection),
                    cache,
                    clock.clone(),
                    config.fanout_limit,
                ));
            }
        }

        let versions = VersionManager::new(config.check_versions);
        Ok(Self {
            config,
            writer,
            changes_rx,
            owner,
            watcher,
            versions,
            peers: PeerDirectory::new(),
            router,
        })
    }

    pub fn email(&self) -> &str {
        &self.config.email
    }

    pub fn role(&self) -> Role {
        self.config.role
    }

    pub fn is_owner(&self) -> bool {
        self.config.role == Role::Owner
    }

    pub fn versions(&self) -> &VersionManager {
        &self.versions
    }

    pub fn writer(&self) -> &FileWriter {
        &self.writer
    }

    pub fn owner_syncer(&self) -> Option<&OwnerSyncer<C>> {
        self.owner.as_ref()
    }

    pub fn owner_syncer_mut(&mut self) -> Option<&mut OwnerSyncer<C>> {
        self.owner.as_mut()
    }

    pub fn watcher_syncer(&self) -> Option<&WatcherSyncer<C>> {
        self.watcher.as_ref()
    }

    pub fn watcher_syncer_mut(&mut self) -> Option<&mut WatcherSyncer<C>> {
        self.watcher.as_mut()
    }

    fn require_owner(
        &mut self,
        operation: &'static str,
    ) -> Result<&mut OwnerSyncer<C>, ClientError> {
        self.owner
            .as_mut()
            .ok_or(ClientError::WrongRole { operation, required: Role::Owner })
    }

    fn require_watcher(
        &mut self,
        operation: &'static str,
    ) -> Result<&mut WatcherSyncer<C>, ClientError> {
        self.watcher
            .as_mut()
            .ok_or(ClientError::WrongRole { operation, required: Role::Scientist })
    }

    /// Publish our version file so peers can check compatibility.
    pub async fn publish_version(&self) -> Result<(), ClientError> {
        self.versions.publish_own_version(&self.router).await?;
        Ok(())
    }

    /// Refresh the peer directory from the backend.
    pub async fn load_peers(&mut self) -> Result<(), ClientError> {
        match self.config.role {
            Role::Owner => self.peers.load_as_do(&self.router).await?,
            Role::Scientist => self.peers.load_as_ds(&self.router).await?,
        }
        Ok(())
    }

    /// Current peer view without syncing: approved + pending for owners,
    /// outgoing requests for scientists.
    pub fn peer_list(&self) -> Vec<Peer> {
        match self.config.role {
            Role::Owner => {
                let mut peers = self.peers.approved().to_vec();
                peers.extend_from_slice(self.peers.pending());
                peers
            }
            Role::Scientist => self.peers.outstanding().to_vec(),
        }
    }

    /// Peer view, optionally preceded by a sync (`sync_before_read`).
    pub async fn peers(&mut self) -> Result<Vec<Peer>, ClientError> {
        if self.config.sync_before_read {
            self.sync().await?;
        } else {
            self.load_peers().await?;
        }
        Ok(self.peer_list())
    }

    /// Drain the file-writer channel into the watcher queue.
    fn drain_file_changes(&mut self) {
        let Some(watcher) = self.watcher.as_mut() else {
            return;
        };
        while let Ok(change) = self.changes_rx.try_recv() {
            watcher.on_file_change(&change.relative_path, change.content);
        }
    }

    /// One protocol tick for this participant.
    pub async fn sync(&mut self) -> Result<(), ClientError> {
        self.load_peers().await?;
        match self.config.role {
            Role::Owner => {
                let emails = self.peers.approved_emails();
                let emails = if self.config.check_versions {
                    self.versions
                        .load_peer_versions(&self.router, &emails, self.config.fanout_limit)
                        .await?;
                    self.versions.compatible_peers(&emails)
                } else {
                    emails
                };
                self.require_owner("sync")?.sync(&emails).await?;
            }
            Role::Scientist => {
                self.drain_file_changes();
                let emails = self.peers.outstanding_emails();
                if self.config.check_versions {
                    self.versions
                        .load_peer_versions(&self.router, &emails, self.config.fanout_limit)
                        .await?;
                    if !emails.is_empty() && self.versions.compatible_peers(&emails).is_empty() {
                        tracing::warn!(
                            peers = emails.len(),
                            "all connected peers have incompatible versions"
                        );
                    }
                }
                let watcher = self.require_watcher("sync")?;
                watcher.process_queue().await?;
                watcher.sync_down(&emails).await?;
            }
        }
        Ok(())
    }

    // --- peer lifecycle ---

    /// As DS: request a peering with a datasite owner. Our version file is
    /// shared alongside so the owner can gate on compatibility.
    pub async fn add_peer(&mut self, owner_email: &str) -> Result<Peer, ClientError> {
        if self.config.role != Role::Scientist {
            return Err(ClientError::WrongRole { operation: "add_peer", required: Role::Scientist });
        }
        let peer = self.peers.add_peer(&self.router, owner_email).await?;
        self.router.share_version_file(owner_email).await?;
        Ok(peer)
    }

    pub async fn check_peer_request_exists(&mut self, email: &str) -> Result<bool, ClientError> {
        self.load_peers().await?;
        Ok(self.peers.request_exists(email))
    }

    /// As DO: accept a pending request, share any-shared datasets with the
    /// new peer (anyone-with-link objects are not discoverable), and grant
    /// them our version file.
    pub async fn approve_peer_request(&mut self, peer_email: &str) -> Result<(), ClientError> {
        if self.config.role != Role::Owner {
            return Err(ClientError::WrongRole {
                operation: "approve_peer_request",
                required: Role::Owner,
            });
        }
        self.peers.approve(&self.router, peer_email).await?;

        let any_shared: Vec<(String, String)> = self
            .owner
            .as_ref()
            .map(|owner| owner.any_shared_collections().to_vec())
            .unwrap_or_default();
        for (tag, content_hash) in any_shared {
            let target = ShareTarget::Users(vec![peer_email.to_string()]);
            if let Err(err) = self.router.share_collection(&tag, &content_hash, &target).await {
                tracing::warn!(%tag, error = %err, "failed to share collection with new peer");
            }
        }

        self.router.share_version_file(peer_email).await?;
        Ok(())
    }

    /// As DO: reject a pending request; the peer's messages are ignored on
    /// subsequent ticks.
    pub async fn reject_peer_request(&mut self, peer_email: &str) -> Result<(), ClientError> {
        if self.config.role != Role::Owner {
            return Err(ClientError::WrongRole {
                operation: "reject_peer_request",
                required: Role::Owner,
            });
        }
        self.peers.reject(&self.router, peer_email).await?;
        Ok(())
    }

    // --- file changes ---

    /// As DS: write a file and propose the change to its datasite owner.
    /// `relative_path` is `<owner_email>/<path_in_datasite>`.
    pub async fn send_file_change(
        &mut self,
        relative_path: &str,
        content: impl AsRef<[u8]>,
    ) -> Result<(), ClientError> {
        if self.config.role != Role::Scientist {
            return Err(ClientError::WrongRole {
                operation: "send_file_change",
                required: Role::Scientist,
            });
        }
        self.writer.write_file(relative_path, content.as_ref())?;
        self.drain_file_changes();
        self.require_watcher("send_file_change")?.process_queue().await?;
        Ok(())
    }

    /// As DO: place a file into our own datasite; the next sync turns it
    /// into an accepted event.
    pub fn write_local_file(
        &mut self,
        path_in_datasite: &str,
        content: impl AsRef<[u8]>,
    ) -> Result<(), ClientError> {
        let email = self.config.email.clone();
        let write_to_disk = self.config.write_files && self.config.syftbox_folder.is_some();
        self.require_owner("write_local_file")?
            .event_cache_mut()
            .stage_local_file(path_in_datasite, content.as_ref())?;
        if write_to_disk {
            self.writer.write_file(&format!("{email}/{path_in_datasite}"), content.as_ref())?;
        }
        Ok(())
    }

    // --- version gates ---

    /// As DS: refuse submission toward an incompatible or unknown owner
    /// unless forced.
    pub async fn ensure_submittable(
        &mut self,
        owner_email: &str,
        force: bool,
    ) -> Result<(), ClientError> {
        if force || !self.versions.checks_enabled() {
            return Ok(());
        }
        if self.versions.peer_version(owner_email).is_none() {
            self.versions.load_peer_version(&self.router, owner_email).await?;
        }
        self.versions.check_for_submission(owner_email, false)?;
        Ok(())
    }

    /// As DO: gate job execution on the submitter's version.
    pub fn check_execution_version(
        &self,
        submitter_email: &str,
        force: bool,
    ) -> Result<(), ClientError> {
        self.versions.check_for_execution(submitter_email, force)?;
        Ok(())
    }

    // --- dataset collections ---

    /// As DO: upload a prepared dataset collection and share it. File
    /// enumeration stays with the external dataset manager; this consumes
    /// its bytes.
    pub async fn upload_dataset_collection(
        &mut self,
        tag: &str,
        files: BTreeMap<String, Vec<u8>>,
        target: ShareTarget,
    ) -> Result<String, ClientError> {
        if self.config.role != Role::Owner {
            return Err(ClientError::WrongRole {
                operation: "upload_dataset_collection",
                required: Role::Owner,
            });
        }
        let content_hash = collection_hash(&files);
        self.router.create_collection_folder(tag, &content_hash, false).await?;
        self.router.upload_collection_files(tag, &content_hash, false, &files).await?;
        self.router.share_collection(tag, &content_hash, &target).await?;

        if let Some(owner) = self.owner.as_mut() {
            owner.event_cache_mut().set_collection_hash(tag, content_hash.clone());
            if target == ShareTarget::Anyone {
                owner.note_any_shared_collection(tag, content_hash.clone());
            }
        }
        Ok(content_hash)
    }

    /// As DO: upload an owner-private collection (no sharing ever applied).
    pub async fn upload_private_collection(
        &mut self,
        tag: &str,
        files: BTreeMap<String, Vec<u8>>,
    ) -> Result<String, ClientError> {
        if self.config.role != Role::Owner {
            return Err(ClientError::WrongRole {
                operation: "upload_private_collection",
                required: Role::Owner,
            });
        }
        let content_hash = collection_hash(&files);
        self.router.create_collection_folder(tag, &content_hash, true).await?;
        self.router.upload_collection_files(tag, &content_hash, true, &files).await?;
        Ok(content_hash)
    }

    // --- maintenance ---

    /// Delete everything we own on the backend, then sweep for orphans
    /// left behind by eventual consistency.
    pub async fn delete_syftbox(&mut self) -> Result<(), ClientError> {
        let ids = self.router.all_object_ids().await?;
        tracing::info!(objects = ids.len(), "deleting syftbox objects");
        self.router.delete_objects(&ids, true, true).await?;

        let orphans = self.router.find_orphaned_message_files().await?;
        if !orphans.is_empty() {
            tracing::info!(orphans = orphans.len(), "reclaiming orphaned message objects");
            self.router.delete_objects(&orphans, true, true).await?;
        }
        self.router.reset_caches()?;
        Ok(())
    }

    pub fn clear_caches(&mut self) -> Result<(), ClientError> {
        if let Some(owner) = self.owner.as_mut() {
            owner.event_cache_mut().clear()?;
        }
        if let Some(watcher) = self.watcher.as_mut() {
            watcher.cache_mut().clear()?;
        }
        Ok(())
    }

    /// Version info published for this client.
    pub fn own_version(&self) -> &VersionInfo {
        self.versions.own_version()
    }

    /// As DO: register the hook fired after every local materialization.
    /// The external job facility uses this to pick up job file changes.
    pub fn set_event_write_hook(
        &mut self,
        hook: syftbox_engine::EventWriteHook,
    ) -> Result<(), ClientError> {
        self.require_owner("set_event_write_hook")?
            .event_cache_mut()
            .set_event_write_hook(hook);
        Ok(())
    }
}

#[cfg(test)]
#[path = "manager_tests.rs"]
mod tests;
