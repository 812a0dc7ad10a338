// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Listing cost specs
//!
//! Early termination is the contract that keeps steady-state syncs at
//! O(new events): with page size 2 and a high-water mark of 30, a backlog
//! of five messages costs two list calls and two downloads.

use super::prelude::*;
use syftbox_engine::WatcherCache;

#[tokio::test]
async fn early_termination_bounds_backend_calls() {
    let store = MemoryStore::shared();
    let owner = MemoryBackend::new(store.clone(), DO);
    let scientist = MemoryBackend::new(store.clone(), DS).with_page_size(2);
    scientist.register_peer_request(DO).await.unwrap();

    let router = syftbox_backend::ConnectionRouter::new(Box::new(scientist))
        .with_policy(syftbox_backend::RetryPolicy::none());
    let mut cache = WatcherCache::in_memory();

    // First three messages establish a high-water mark of 30
    for timestamp in [10.0, 20.0, 30.0] {
        let message = syftbox_core::AcceptedEventsMessage::new(vec![], timestamp);
        owner.write_events_message_to_outbox(DS, &message).await.unwrap();
    }
    cache.sync_down_parallel(DO, &router, 4).await.unwrap();
    assert_eq!(cache.high_water(DO), Some(30.0));

    for timestamp in [40.0, 50.0] {
        let message = syftbox_core::AcceptedEventsMessage::new(vec![], timestamp);
        owner.write_events_message_to_outbox(DS, &message).await.unwrap();
    }

    store.lock().reset_counters();
    let applied = cache.sync_down_parallel(DO, &router, 4).await.unwrap();
    let counters = store.lock().counters();

    // Page [50,40] is all new; page [30,20] stops at the mark
    assert_eq!(applied, 2);
    assert_eq!(counters.lists, 2);
    assert_eq!(counters.downloads, 2);
}

#[tokio::test]
async fn no_new_messages_costs_one_list_and_no_downloads() {
    let store = MemoryStore::shared();
    let owner = MemoryBackend::new(store.clone(), DO);
    let scientist = MemoryBackend::new(store.clone(), DS).with_page_size(2);
    scientist.register_peer_request(DO).await.unwrap();

    let router = syftbox_backend::ConnectionRouter::new(Box::new(scientist))
        .with_policy(syftbox_backend::RetryPolicy::none());
    let mut cache = WatcherCache::in_memory();

    let message = syftbox_core::AcceptedEventsMessage::new(vec![], 10.0);
    owner.write_events_message_to_outbox(DS, &message).await.unwrap();
    cache.sync_down_parallel(DO, &router, 4).await.unwrap();

    store.lock().reset_counters();
    let applied = cache.sync_down_parallel(DO, &router, 4).await.unwrap();
    let counters = store.lock().counters();

    assert_eq!(applied, 0);
    assert_eq!(counters.lists, 1);
    assert_eq!(counters.downloads, 0);
}
