// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bounded parallel fan-out over copied connections
//!
//! Backend connections are not thread-safe, so every worker task gets its
//! own copy from the router. Concurrency is bounded by a semaphore and the
//! fan-out joins explicitly before returning, preserving input order.

use crate::error::SyncError;
use std::future::Future;
use std::sync::Arc;
use syftbox_backend::{BackendConnection, BackendResult, ConnectionRouter};
use syftbox_core::{AcceptedEventsMessage, VersionInfo};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Default worker-task bound.
pub const DEFAULT_FANOUT_LIMIT: usize = 10;

/// Run `op` over every item on its own connection copy, at most `limit` at
/// a time. Results come back in input order.
pub async fn fan_out<I, T, F, Fut>(
    router: &ConnectionRouter,
    items: Vec<I>,
    limit: usize,
    op: F,
) -> Result<Vec<T>, SyncError>
where
    I: Send + 'static,
    T: Send + 'static,
    F: Fn(Box<dyn BackendConnection>, I) -> Fut + Clone + Send + 'static,
    Fut: Future<Output = T> + Send + 'static,
{
    let semaphore = Arc::new(Semaphore::new(limit.max(1)));
    let mut join_set = JoinSet::new();

    let count = items.len();
    for (index, item) in items.into_iter().enumerate() {
        let connection = router.connection_for_parallel_download()?;
        let op = op.clone();
        let semaphore = Arc::clone(&semaphore);
        join_set.spawn(async move {
            let _permit = semaphore.acquire_owned().await.ok();
            (index, op(connection, item).await)
        });
    }

    let mut slots: Vec<Option<T>> = (0..count).map(|_| None).collect();
    while let Some(joined) = join_set.join_next().await {
        let (index, value) = joined?;
        slots[index] = Some(value);
    }
    Ok(slots.into_iter().flatten().collect())
}

/// Download raw objects in parallel.
pub async fn download_files(
    router: &ConnectionRouter,
    file_ids: Vec<String>,
    limit: usize,
) -> Result<Vec<BackendResult<Vec<u8>>>, SyncError> {
    fan_out(router, file_ids, limit, |connection, id| async move {
        connection.download_file(&id).await
    })
    .await
}

/// Download accepted-events messages in parallel.
pub async fn download_events_messages(
    router: &ConnectionRouter,
    file_ids: Vec<String>,
    limit: usize,
) -> Result<Vec<BackendResult<AcceptedEventsMessage>>, SyncError> {
    fan_out(router, file_ids, limit, |connection, id| async move {
        connection.download_events_message(&id).await
    })
    .await
}

/// Fetch peer version files in parallel; failures degrade to `None` with a
/// warning, never abort the sweep.
pub async fn read_peer_versions(
    router: &ConnectionRouter,
    peer_emails: Vec<String>,
    limit: usize,
) -> Result<Vec<(String, Option<VersionInfo>)>, SyncError> {
    fan_out(router, peer_emails, limit, |connection, email| async move {
        let version = match connection.read_peer_version_file(&email).await {
            Ok(version) => version,
            Err(err) => {
                tracing::warn!(peer = %email, error = %err, "failed to load peer version");
                None
            }
        };
        (email, version)
    })
    .await
}

#[cfg(test)]
#[path = "parallel_tests.rs"]
mod tests;
