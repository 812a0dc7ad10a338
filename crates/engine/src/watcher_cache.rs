// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The scientist's watcher cache
//!
//! Mirrors peers' outboxes into a local read-only view. Keys are
//! syftbox-relative (`<owner_email>/<path>`) so two peers can never collide.
//! Per-peer high-water marks make each sync O(new events): the listing
//! terminates early at the mark, and messages at the mark are deduplicated
//! by message id.

use crate::error::SyncError;
use crate::parallel;
use crate::store::{CacheStore, DiskFileStore, MemoryFileStore};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use syftbox_backend::ConnectionRouter;
use syftbox_core::FileChangeEvent;
use uuid::Uuid;

pub struct WatcherCache {
    files: Box<dyn CacheStore>,
    file_hashes: HashMap<String, String>,
    collection_hashes: HashMap<String, String>,
    high_water: HashMap<String, f64>,
    applied_message_ids: HashSet<Uuid>,
}

impl WatcherCache {
    pub fn in_memory() -> Self {
        Self {
            files: Box::new(MemoryFileStore::new()),
            file_hashes: HashMap::new(),
            collection_hashes: HashMap::new(),
            high_water: HashMap::new(),
            applied_message_ids: HashSet::new(),
        }
    }

    pub fn on_disk(syftbox_folder: &Path) -> std::io::Result<Self> {
        Ok(Self {
            files: Box::new(DiskFileStore::new(syftbox_folder)?),
            file_hashes: HashMap::new(),
            collection_hashes: HashMap::new(),
            high_water: HashMap::new(),
            applied_message_ids: HashSet::new(),
        })
    }

    /// Current hash for a syftbox-relative path, the proposer's `old_hash`.
    pub fn current_hash_for_file(&self, syftbox_path: &str) -> Option<String> {
        self.file_hashes.get(syftbox_path).cloned()
    }

    /// Monotone non-decreasing per peer.
    pub fn high_water(&self, peer_email: &str) -> Option<f64> {
        self.high_water.get(peer_email).copied()
    }

    pub fn read_file(&self, syftbox_path: &str) -> std::io::Result<Option<Vec<u8>>> {
        self.files.read(syftbox_path)
    }

    pub fn clear(&mut self) -> std::io::Result<()> {
        self.files.clear()?;
        self.file_hashes.clear();
        self.collection_hashes.clear();
        self.high_water.clear();
        self.applied_message_ids.clear();
        Ok(())
    }

    fn apply_event(&mut self, event: &FileChangeEvent) -> Result<(), SyncError> {
        let key = event.path_in_syftbox();
        if event.is_deleted {
            self.file_hashes.remove(&key);
            self.files.delete(&key)?;
        } else {
            let bytes = event.content_bytes()?.unwrap_or_default();
            self.files.write(&key, &bytes)?;
            if let Some(hash) = &event.new_hash {
                self.file_hashes.insert(key, hash.clone());
            }
        }
        Ok(())
    }

    /// Pull new outbox messages from one peer, download them in parallel
    /// over copied connections, and apply them in message-timestamp order
    /// (ties broken by message id). Returns the number applied.
    pub async fn sync_down_parallel(
        &mut self,
        peer_email: &str,
        router: &ConnectionRouter,
        limit: usize,
    ) -> Result<usize, SyncError> {
        let since = self.high_water(peer_email);
        let metas = router.outbox_file_metas(peer_email, since).await?;
        if metas.is_empty() {
            return Ok(0);
        }

        let ids: Vec<String> = metas.iter().map(|meta| meta.id.clone()).collect();
        let results = parallel::download_events_messages(router, ids, limit).await?;

        let mut messages = Vec::new();
        for (meta, result) in metas.iter().zip(results) {
            match result {
                Ok(message) => messages.push(message),
                Err(err) => {
                    tracing::warn!(name = %meta.name, error = %err, "skipping undownloadable outbox message");
                }
            }
        }
        messages.sort_by(|a, b| {
            a.timestamp()
                .partial_cmp(&b.timestamp())
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.id().cmp(&b.id()))
        });

        let mut applied = 0;
        for message in messages {
            let timestamp = message.timestamp();
            if let Some(mark) = self.high_water(peer_email) {
                if timestamp < mark {
                    continue;
                }
            }
            if self.applied_message_ids.contains(&message.id()) {
                continue;
            }

            for event in &message.events {
                self.apply_event(event)?;
            }
            self.applied_message_ids.insert(message.id());

            let mark = self.high_water.entry(peer_email.to_string()).or_insert(timestamp);
            if timestamp > *mark {
                *mark = timestamp;
            }
            applied += 1;
        }

        tracing::info!(peer = %peer_email, applied, "synced down outbox messages");
        Ok(applied)
    }

    /// Materialize one peer's shared dataset collections whose content hash
    /// differs from the cached per-collection hash.
    pub async fn sync_down_datasets_parallel(
        &mut self,
        peer_email: &str,
        router: &ConnectionRouter,
        limit: usize,
    ) -> Result<usize, SyncError> {
        let collections = router.collections_as_ds().await?;
        let mut synced = 0;

        for collection in collections {
            if collection.owner_email != peer_email {
                continue;
            }
            let cache_key = format!("{}/{}", collection.owner_email, collection.tag);
            if self.collection_hashes.get(&cache_key) == Some(&collection.content_hash) {
                continue;
            }

            let metas = router
                .collection_file_metas(
                    &collection.owner_email,
                    &collection.tag,
                    &collection.content_hash,
                    false,
                )
                .await?;
            let ids: Vec<String> = metas.iter().map(|meta| meta.id.clone()).collect();
            let results = parallel::download_files(router, ids, limit).await?;

            for (meta, result) in metas.iter().zip(results) {
                match result {
                    Ok(data) => {
                        let key =
                            format!("public/syft_datasets/{}/{}", collection.tag, meta.name);
                        self.files.write(&key, &data)?;
                    }
                    Err(err) => {
                        tracing::warn!(name = %meta.name, error = %err, "skipping undownloadable dataset file");
                    }
                }
            }

            self.collection_hashes.insert(cache_key, collection.content_hash.clone());
            synced += 1;
        }

        if synced > 0 {
            tracing::info!(peer = %peer_email, synced, "synced down dataset collections");
        }
        Ok(synced)
    }
}

#[cfg(test)]
#[path = "watcher_cache_tests.rs"]
mod tests;
