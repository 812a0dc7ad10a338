// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Folder-name grammar of a datasite root
//!
//! Every folder a backend creates has a parseable name; discovery works by
//! listing names and parsing them back, never by side tables. The owner's
//! personal folder is simply named by their email.

use std::fmt;

/// Peer-state JSON object at the datasite root.
pub const PEERS_FILE: &str = "SYFT_peers.json";

/// Version-info JSON object at the datasite root.
pub const VERSION_FILE: &str = "SYFT_version.json";

/// Prefix of inbox/outbox pair folders.
pub const INBOX_OUTBOX_PREFIX: &str = "syft_outbox_inbox";

/// Prefix of shared dataset-collection folders.
pub const DATASET_COLLECTION_PREFIX: &str = "syft_datasetcollection";

/// Prefix of owner-private collection folders.
pub const PRIVATE_COLLECTION_PREFIX: &str = "syft_privatecollection";

/// `syft_outbox_inbox_<sender>_to_<recipient>`: the sender's outbox is the
/// recipient's inbox.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboxOutboxFolder {
    pub sender_email: String,
    pub recipient_email: String,
}

impl InboxOutboxFolder {
    pub fn new(sender_email: impl Into<String>, recipient_email: impl Into<String>) -> Self {
        Self { sender_email: sender_email.into(), recipient_email: recipient_email.into() }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        let rest = name.strip_prefix(INBOX_OUTBOX_PREFIX)?.strip_prefix('_')?;
        let (sender, recipient) = rest.split_once("_to_")?;
        if sender.is_empty() || recipient.is_empty() {
            return None;
        }
        Some(Self::new(sender, recipient))
    }
}

impl fmt::Display for InboxOutboxFolder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{INBOX_OUTBOX_PREFIX}_{}_to_{}", self.sender_email, self.recipient_email)
    }
}

/// `syft_<sender>_to_<recipient>_archive`: proposed messages parked after
/// acceptance processing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveFolder {
    pub sender_email: String,
    pub recipient_email: String,
}

impl ArchiveFolder {
    pub fn new(sender_email: impl Into<String>, recipient_email: impl Into<String>) -> Self {
        Self { sender_email: sender_email.into(), recipient_email: recipient_email.into() }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        let rest = name.strip_prefix("syft_")?.strip_suffix("_archive")?;
        let (sender, recipient) = rest.split_once("_to_")?;
        if sender.is_empty() || recipient.is_empty() {
            return None;
        }
        Some(Self::new(sender, recipient))
    }
}

impl fmt::Display for ArchiveFolder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "syft_{}_to_{}_archive", self.sender_email, self.recipient_email)
    }
}

/// `syft_datasetcollection_<tag>_<hash>` or
/// `syft_privatecollection_<tag>_<hash>`: content-addressed dataset folders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionFolder {
    pub tag: String,
    pub content_hash: String,
    pub private: bool,
}

impl CollectionFolder {
    pub fn shared(tag: impl Into<String>, content_hash: impl Into<String>) -> Self {
        Self { tag: tag.into(), content_hash: content_hash.into(), private: false }
    }

    pub fn private(tag: impl Into<String>, content_hash: impl Into<String>) -> Self {
        Self { tag: tag.into(), content_hash: content_hash.into(), private: true }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        let (rest, private) = match name.strip_prefix(DATASET_COLLECTION_PREFIX) {
            Some(rest) => (rest, false),
            None => (name.strip_prefix(PRIVATE_COLLECTION_PREFIX)?, true),
        };
        // Tags may contain underscores; the hash never does.
        let (tag, hash) = rest.strip_prefix('_')?.rsplit_once('_')?;
        if tag.is_empty() || hash.is_empty() {
            return None;
        }
        Some(Self { tag: tag.to_string(), content_hash: hash.to_string(), private })
    }
}

impl fmt::Display for CollectionFolder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix = if self.private {
            PRIVATE_COLLECTION_PREFIX
        } else {
            DATASET_COLLECTION_PREFIX
        };
        write!(f, "{prefix}_{}_{}", self.tag, self.content_hash)
    }
}

/// `<email>-checkpoints`: full and incremental checkpoint objects.
pub fn checkpoints_folder(email: &str) -> String {
    format!("{email}-checkpoints")
}

/// `<email>-rolling-state`: the rolling-state object.
pub fn rolling_state_folder(email: &str) -> String {
    format!("{email}-rolling-state")
}

#[cfg(test)]
#[path = "folders_tests.rs"]
mod tests;
