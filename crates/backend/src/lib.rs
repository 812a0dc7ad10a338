// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! syftbox-backend: the object-store transport layer
//!
//! Defines the [`BackendConnection`] contract every transport must satisfy,
//! the folder-name grammar of a datasite root, an in-memory backend used for
//! tests and local development, and the [`ConnectionRouter`] that dispatches
//! each protocol operation to a concrete connection.

pub mod connection;
pub mod error;
pub mod folders;
pub mod memory;
pub mod retry;
pub mod router;

pub use connection::{BackendConnection, FileCollection, FileMeta, ShareTarget};
pub use error::{BackendError, BackendResult};
pub use folders::{ArchiveFolder, CollectionFolder, InboxOutboxFolder};
pub use memory::{ApiCounters, MemoryBackend, MemoryStore, SharedStore};
pub use retry::RetryPolicy;
pub use router::ConnectionRouter;
