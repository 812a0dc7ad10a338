// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Version negotiation
//!
//! Each client publishes its version file and reads peers' files before
//! syncing. Incompatible peers are filtered out of sync with a warning;
//! submissions and job execution are gated hard unless forced.

use crate::error::SyncError;
use crate::parallel;
use std::collections::HashMap;
use syftbox_backend::ConnectionRouter;
use syftbox_core::VersionInfo;
use thiserror::Error;

/// Errors from version gates
#[derive(Debug, Error)]
pub enum VersionError {
    #[error("version mismatch with peer {peer_email}: {reason}")]
    Mismatch { peer_email: String, reason: String },

    #[error("version for peer {peer_email} is unknown; cannot {operation}")]
    Unknown { peer_email: String, operation: &'static str },
}

/// Manages the client's own version file and cached peer versions.
pub struct VersionManager {
    own: VersionInfo,
    peer_versions: HashMap<String, Option<VersionInfo>>,
    check_client: bool,
    check_protocol: bool,
}

impl VersionManager {
    pub fn new(check_versions: bool) -> Self {
        Self {
            own: VersionInfo::current(),
            peer_versions: HashMap::new(),
            check_client: check_versions,
            check_protocol: check_versions,
        }
    }

    pub fn own_version(&self) -> &VersionInfo {
        &self.own
    }

    pub fn checks_enabled(&self) -> bool {
        self.check_client || self.check_protocol
    }

    /// Publish our version file to the backend.
    pub async fn publish_own_version(&self, router: &ConnectionRouter) -> Result<(), SyncError> {
        router.write_version_file(&self.own).await?;
        Ok(())
    }

    /// Load one peer's version (blocking path, used before submission).
    pub async fn load_peer_version(
        &mut self,
        router: &ConnectionRouter,
        peer_email: &str,
    ) -> Result<(), SyncError> {
        let version = router.read_peer_version_file(peer_email).await?;
        self.peer_versions.insert(peer_email.to_string(), version);
        Ok(())
    }

    /// Load many peers' versions in parallel over copied connections.
    pub async fn load_peer_versions(
        &mut self,
        router: &ConnectionRouter,
        peer_emails: &[String],
        limit: usize,
    ) -> Result<(), SyncError> {
        if peer_emails.is_empty() {
            return Ok(());
        }
        let loaded = parallel::read_peer_versions(router, peer_emails.to_vec(), limit).await?;
        for (email, version) in loaded {
            self.peer_versions.insert(email, version);
        }
        Ok(())
    }

    /// Cached version for a peer, `None` when unloaded or unavailable.
    pub fn peer_version(&self, peer_email: &str) -> Option<&VersionInfo> {
        self.peer_versions.get(peer_email).and_then(|version| version.as_ref())
    }

    pub fn is_compatible(&self, peer_email: &str) -> bool {
        if !self.checks_enabled() {
            return true;
        }
        match self.peer_version(peer_email) {
            Some(peer) => {
                self.own.is_compatible_with(peer, self.check_client, self.check_protocol)
            }
            None => false,
        }
    }

    /// Filter to compatible peers, warning once per peer dropped.
    pub fn compatible_peers(&self, peer_emails: &[String]) -> Vec<String> {
        if !self.checks_enabled() {
            return peer_emails.to_vec();
        }
        peer_emails
            .iter()
            .filter(|email| {
                if self.is_compatible(email) {
                    return true;
                }
                match self.peer_version(email) {
                    Some(peer) => {
                        let reason = self
                            .own
                            .incompatibility_reason(peer, self.check_client, self.check_protocol)
                            .unwrap_or_else(|| "unknown".to_string());
                        tracing::warn!(peer = %email, %reason, "skipping incompatible peer");
                    }
                    None => {
                        tracing::warn!(peer = %email, "skipping peer: version not available");
                    }
                }
                false
            })
            .cloned()
            .collect()
    }

    fn check(&self, peer_email: &str, operation: &'static str) -> Result<(), VersionError> {
        if !self.checks_enabled() {
            return Ok(());
        }
        let Some(peer) = self.peer_version(peer_email) else {
            return Err(VersionError::Unknown { peer_email: peer_email.to_string(), operation });
        };
        match self.own.incompatibility_reason(peer, self.check_client, self.check_protocol) {
            None => Ok(()),
            Some(reason) => {
                Err(VersionError::Mismatch { peer_email: peer_email.to_string(), reason })
            }
        }
    }

    /// Gate for job submission toward an owner (DS side).
    pub fn check_for_submission(
        &self,
        owner_email: &str,
        force: bool,
    ) -> Result<(), VersionError> {
        if force {
            return Ok(());
        }
        self.check(owner_email, "submit job")
    }

    /// Gate for executing a submitted job (DO side).
    pub fn check_for_execution(
        &self,
        submitter_email: &str,
        force: bool,
    ) -> Result<(), VersionError> {
        if force {
            return Ok(());
        }
        self.check(submitter_email, "execute job")
    }

    /// Inject a peer version directly; test seam.
    #[doc(hidden)]
    pub fn set_peer_version(&mut self, peer_email: impl Into<String>, version: Option<VersionInfo>) {
        self.peer_versions.insert(peer_email.into(), version);
    }
}

#[cfg(test)]
#[path = "version_tests.rs"]
mod tests;
