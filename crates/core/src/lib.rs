// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! syftbox-core: models and codecs for the syftbox synchronization protocol
//!
//! Everything on the wire is defined here: file-change events, proposed and
//! accepted message bundles, checkpoints, rolling state, and the compressed
//! envelope they travel in. Higher layers (backend, engine) consume these
//! types but never re-define wire shapes.

pub mod checkpoint;
pub mod clock;
pub mod envelope;
pub mod event;
pub mod filename;
pub mod hash;
pub mod path;
pub mod peer;
pub mod proposal;
pub mod rolling;
pub mod version;

pub use checkpoint::{
    compact_checkpoints, Checkpoint, CheckpointFile, IncrementalCheckpoint,
    DEFAULT_COMPACTING_THRESHOLD,
};
pub use clock::{format_timestamp, Clock, FakeClock, SystemClock};
pub use envelope::{CodecError, Envelope};
pub use event::{
    decode_content, encode_content, AcceptedEventsMessage, ContentType, EventsMessageFileName,
    FileChangeEvent,
};
pub use filename::{FileNameError, StampedFileName};
pub use hash::{collection_hash, content_hash, directory_hash};
pub use path::{DatasitePath, PathError};
pub use peer::{Peer, PeerState};
pub use proposal::{ProposalFileName, ProposedChange, ProposedChangeMessage};
pub use rolling::RollingState;
pub use version::VersionInfo;
