// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! syftbox-engine: the synchronization engine proper
//!
//! Two role-specific loops drive the protocol: the [`OwnerSyncer`] accepts
//! or rejects proposed changes and maintains the checkpoint/rolling-state
//! compaction scheme, the [`WatcherSyncer`] pushes proposals and mirrors
//! peers' outboxes. Both sit on authoritative local caches that hold the
//! hash-indexed materialization of each datasite.

pub mod error;
pub mod jobs;
pub mod owner;
pub mod owner_cache;
pub mod parallel;
pub mod peers;
pub mod store;
pub mod version;
pub mod watcher;
pub mod watcher_cache;

pub use error::SyncError;
pub use owner::{OwnerSyncer, OwnerSyncerConfig};
pub use owner_cache::{EventCache, EventWriteHook};
pub use peers::PeerDirectory;
pub use store::{CacheStore, DiskFileStore, MemoryFileStore};
pub use version::{VersionError, VersionManager};
pub use watcher::WatcherSyncer;
pub use watcher_cache::WatcherCache;
