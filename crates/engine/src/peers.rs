// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Peer directory and lifecycle
//!
//! A scientist registers a request (which creates the inbox/outbox folder
//! pair on the backend); the owner discovers it by folder pattern, then
//! approves or rejects. Transitions are one-way.

use crate::error::SyncError;
use syftbox_backend::ConnectionRouter;
use syftbox_core::{Peer, PeerState};

/// Local view of approved, pending, and outgoing peers.
#[derive(Debug, Default)]
pub struct PeerDirectory {
    approved: Vec<Peer>,
    pending: Vec<Peer>,
    outstanding: Vec<Peer>,
}

impl PeerDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Refresh the owner-side view: accepted peers and pending requests.
    pub async fn load_as_do(&mut self, router: &ConnectionRouter) -> Result<(), SyncError> {
        self.approved =
            router.approved_peers_as_do().await?.into_iter().map(Peer::accepted).collect();
        self.pending =
            router.peer_requests_as_do().await?.into_iter().map(Peer::pending).collect();
        Ok(())
    }

    /// Refresh the scientist-side view: our outgoing requests.
    pub async fn load_as_ds(&mut self, router: &ConnectionRouter) -> Result<(), SyncError> {
        self.outstanding =
            router.peers_as_ds().await?.into_iter().map(Peer::outstanding).collect();
        Ok(())
    }

    pub fn approved(&self) -> &[Peer] {
        &self.approved
    }

    pub fn pending(&self) -> &[Peer] {
        &self.pending
    }

    pub fn outstanding(&self) -> &[Peer] {
        &self.outstanding
    }

    pub fn approved_emails(&self) -> Vec<String> {
        self.approved.iter().map(|peer| peer.email.clone()).collect()
    }

    pub fn outstanding_emails(&self) -> Vec<String> {
        self.outstanding.iter().map(|peer| peer.email.clone()).collect()
    }

    pub fn request_exists(&self, peer_email: &str) -> bool {
        self.pending.iter().any(|peer| peer.email == peer_email)
    }

    /// As DS: request a peering with a datasite owner.
    pub async fn add_peer(
        &mut self,
        router: &ConnectionRouter,
        owner_email: &str,
    ) -> Result<Peer, SyncError> {
        router.register_peer_request(owner_email).await?;
        let peer = Peer::outstanding(owner_email);
        if !self.outstanding.iter().any(|existing| existing.email == owner_email) {
            self.outstanding.push(peer.clone());
        }
        tracing::info!(owner = %owner_email, "registered peer request");
        Ok(peer)
    }

    /// As DO: accept a pending request.
    pub async fn approve(
        &mut self,
        router: &ConnectionRouter,
        peer_email: &str,
    ) -> Result<(), SyncError> {
        router.update_peer_state(peer_email, PeerState::Accepted).await?;
        self.pending.retain(|peer| peer.email != peer_email);
        if !self.approved.iter().any(|peer| peer.email == peer_email) {
            self.approved.push(Peer::accepted(peer_email));
        }
        tracing::info!(peer = %peer_email, "approved peer request");
        Ok(())
    }

    /// As DO: reject a pending request. The peer's messages are ignored
    /// from now on.
    pub async fn reject(
        &mut self,
        router: &ConnectionRouter,
        peer_email: &str,
    ) -> Result<(), SyncError> {
        router.update_peer_state(peer_email, PeerState::Rejected).await?;
        self.pending.retain(|peer| peer.email != peer_email);
        self.approved.retain(|peer| peer.email != peer_email);
        tracing::info!(peer = %peer_email, "rejected peer request");
        Ok(())
    }
}

#[cfg(test)]
#[path = "peers_tests.rs"]
mod tests;
