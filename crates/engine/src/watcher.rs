// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The data scientist's sync loop
//!
//! Pushes proposed file changes toward datasite owners and pulls accepted
//! events back down. Changes queue up and ship as one bundled message per
//! recipient, the primary write-amplification reducer against a
//! rate-limited backend.

use crate::error::SyncError;
use crate::watcher_cache::WatcherCache;
use std::collections::BTreeMap;
use std::collections::VecDeque;
use std::path::PathBuf;
use syftbox_backend::ConnectionRouter;
use syftbox_core::{Clock, DatasitePath, ProposedChange, ProposedChangeMessage};

/// A locally observed change waiting to be proposed.
#[derive(Debug, Clone)]
struct QueuedChange {
    /// Syftbox-relative path: `<owner_email>/<path_in_datasite>`.
    relative_path: String,
    /// Raw bytes; `None` means read from disk (or propose deletion when
    /// the file is gone).
    content: Option<Vec<u8>>,
}

/// Drives the scientist's side of the protocol.
pub struct WatcherSyncer<C: Clock> {
    email: String,
    syftbox_folder: Option<PathBuf>,
    clock: C,
    router: ConnectionRouter,
    cache: WatcherCache,
    queue: VecDeque<QueuedChange>,
    fanout_limit: usize,
}

impl<C: Clock> WatcherSyncer<C> {
    pub fn new(
        email: impl Into<String>,
        syftbox_folder: Option<PathBuf>,
        router: ConnectionRouter,
        cache: WatcherCache,
        clock: C,
        fanout_limit: usize,
    ) -> Self {
        Self {
            email: email.into(),
            syftbox_folder,
            clock,
            router,
            cache,
            queue: VecDeque::new(),
            fanout_limit,
        }
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn cache(&self) -> &WatcherCache {
        &self.cache
    }

    pub fn cache_mut(&mut self) -> &mut WatcherCache {
        &mut self.cache
    }

    pub fn router(&self) -> &ConnectionRouter {
        &self.router
    }

    pub fn queued_changes(&self) -> usize {
        self.queue.len()
    }

    /// Record a local change for the next bundle. The first path segment
    /// names the datasite owner and thereby the recipient.
    pub fn on_file_change(&mut self, relative_path: &str, content: Option<Vec<u8>>) {
        self.queue.push_back(QueuedChange { relative_path: relative_path.to_string(), content });
    }

    /// Record a change and ship the whole queue immediately.
    pub async fn send_file_change(
        &mut self,
        relative_path: &str,
        content: Option<Vec<u8>>,
    ) -> Result<(), SyncError> {
        self.on_file_change(relative_path, content);
        self.process_queue().await
    }

    fn split_relative_path(&self, relative_path: &str) -> Result<(String, DatasitePath), SyncError> {
        let (owner, rest) = relative_path.split_once('/').ok_or_else(|| {
            SyncError::InvalidChangePath {
                path: relative_path.to_string(),
                reason: "expected <owner_email>/<path_in_datasite>".to_string(),
            }
        })?;
        let path = DatasitePath::new(rest).map_err(|err| SyncError::InvalidChangePath {
            path: relative_path.to_string(),
            reason: err.to_string(),
        })?;
        Ok((owner.to_string(), path))
    }

    fn build_change(
        &self,
        relative_path: &str,
        content: Option<Vec<u8>>,
        now: f64,
    ) -> Result<(String, ProposedChange), SyncError> {
        let (owner, path_in_datasite) = self.split_relative_path(relative_path)?;
        let old_hash = self.cache.current_hash_for_file(relative_path);

        let content = match content {
            Some(bytes) => Some(bytes),
            None => match &self.syftbox_folder {
                Some(folder) => match std::fs::read(folder.join(relative_path)) {
                    Ok(bytes) => Some(bytes),
                    Err(err) if err.kind() == std::io::ErrorKind::NotFound => None,
                    Err(err) => return Err(err.into()),
                },
                None => None,
            },
        };

        let change = match content {
            Some(bytes) => {
                ProposedChange::update(owner.clone(), path_in_datasite, &bytes, old_hash, now)
            }
            None => ProposedChange::deletion(owner.clone(), path_in_datasite, old_hash, now),
        };
        Ok((owner, change))
    }

    /// Bundle every queued change into one proposed message per recipient
    /// and submit them.
    pub async fn process_queue(&mut self) -> Result<(), SyncError> {
        if self.queue.is_empty() {
            return Ok(());
        }
        let now = self.clock.epoch_secs();

        let mut per_recipient: BTreeMap<String, Vec<ProposedChange>> = BTreeMap::new();
        while let Some(queued) = self.queue.pop_front() {
            let (recipient, change) = self.build_change(&queued.relative_path, queued.content, now)?;
            per_recipient.entry(recipient).or_default().push(change);
        }

        for (recipient, changes) in per_recipient {
            let count = changes.len();
            let message = ProposedChangeMessage::new(&self.email, changes, now);
            self.router.send_proposed_message(&recipient, &message).await?;
            tracing::info!(recipient = %recipient, changes = count, "submitted proposed changes");
        }
        Ok(())
    }

    /// Pull accepted events and dataset collections down from each peer.
    pub async fn sync_down(&mut self, peer_emails: &[String]) -> Result<(), SyncError> {
        for peer_email in peer_emails {
            self.cache.sync_down_parallel(peer_email, &self.router, self.fanout_limit).await?;
            self.cache
                .sync_down_datasets_parallel(peer_email, &self.router, self.fanout_limit)
                .await?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "watcher_tests.rs"]
mod tests;
