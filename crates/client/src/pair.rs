// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pairing helpers over a shared in-memory backend
//!
//! Wires an owner manager and a scientist manager to one backing store so
//! messages actually travel, mirroring how integration environments pair
//! clients against a real drive.

use crate::config::ManagerConfig;
use crate::error::ClientError;
use crate::manager::Manager;
use syftbox_backend::{MemoryBackend, MemoryStore, SharedStore};
use syftbox_core::Clock;

/// A connected owner/scientist pair plus the store behind them.
pub struct ManagerPair<C: Clock> {
    pub owner: Manager<C>,
    pub scientist: Manager<C>,
    pub store: SharedStore,
}

/// Managers sharing a store, with no peering established.
pub async fn pair_unconnected<C: Clock>(
    owner_config: ManagerConfig,
    scientist_config: ManagerConfig,
    clock: C,
) -> Result<ManagerPair<C>, ClientError> {
    let store = MemoryStore::shared();
    let owner = Manager::from_config(
        owner_config.clone(),
        Box::new(MemoryBackend::new(store.clone(), owner_config.email.clone())),
        clock.clone(),
    )?;
    let scientist = Manager::from_config(
        scientist_config.clone(),
        Box::new(MemoryBackend::new(store.clone(), scientist_config.email.clone())),
        clock,
    )?;

    owner.publish_version().await?;
    scientist.publish_version().await?;
    Ok(ManagerPair { owner, scientist, store })
}

/// Managers sharing a store with the peering already requested, approved,
/// and version files exchanged.
pub async fn pair_connected<C: Clock>(
    owner_config: ManagerConfig,
    scientist_config: ManagerConfig,
    clock: C,
) -> Result<ManagerPair<C>, ClientError> {
    let mut pair = pair_unconnected(owner_config, scientist_config, clock).await?;

    let owner_email = pair.owner.email().to_string();
    let scientist_email = pair.scientist.email().to_string();
    pair.scientist.add_peer(&owner_email).await?;
    pair.owner.load_peers().await?;
    pair.owner.approve_peer_request(&scientist_email).await?;
    Ok(pair)
}
