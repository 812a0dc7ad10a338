// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

#![allow(dead_code)]

//! Shared helpers for scenario specs

pub use std::collections::BTreeMap;
pub use syftbox_backend::{
    BackendConnection, MemoryBackend, MemoryStore, ShareTarget, SharedStore,
};
pub use syftbox_client::{
    pair_connected, pair_unconnected, ClientError, Manager, ManagerConfig, ManagerPair, Role,
};
pub use syftbox_core::{content_hash, DatasitePath, FakeClock};

pub const DO: &str = "do@example.com";
pub const DS: &str = "ds@example.com";
pub const DS_B: &str = "ds-b@example.com";

pub fn clock() -> FakeClock {
    FakeClock::at(1_000.0)
}

/// Owner + scientist with the peering already approved.
pub async fn connected() -> ManagerPair<FakeClock> {
    pair_connected(ManagerConfig::owner(DO), ManagerConfig::scientist(DS), clock())
        .await
        .expect("pairing failed")
}

/// An extra scientist attached to an existing pair's store.
pub fn attach_scientist(store: &SharedStore, email: &str) -> Manager<FakeClock> {
    Manager::from_config(
        ManagerConfig::scientist(email),
        Box::new(MemoryBackend::new(store.clone(), email)),
        clock(),
    )
    .expect("manager construction failed")
}

pub fn datasite_path(path: &str) -> DatasitePath {
    DatasitePath::new(path).expect("invalid datasite path")
}
