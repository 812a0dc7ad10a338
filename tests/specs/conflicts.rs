// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Conflict-freedom specs
//!
//! Two scientists racing on the same base hash: exactly one wins, the
//! other's change is dropped, and both proposals end up archived.

use super::prelude::*;

#[tokio::test]
async fn two_proposals_on_the_same_hash_accept_exactly_one() {
    let mut pair = connected().await;
    let mut second = attach_scientist(&pair.store, DS_B);
    second.add_peer(DO).await.unwrap();
    pair.owner.load_peers().await.unwrap();
    pair.owner.approve_peer_request(DS_B).await.unwrap();

    // Seed a.txt = "v1" through the first scientist
    pair.scientist.send_file_change(&format!("{DO}/a.txt"), "v1").await.unwrap();
    pair.owner.sync().await.unwrap();
    let baseline_log = pair
        .owner
        .owner_syncer()
        .unwrap()
        .router()
        .accepted_event_ids(None)
        .await
        .unwrap()
        .len();

    // Both scientists observe v1, then race
    pair.scientist.sync().await.unwrap();
    second.sync().await.unwrap();
    pair.scientist.send_file_change(&format!("{DO}/a.txt"), "v2").await.unwrap();
    second.send_file_change(&format!("{DO}/a.txt"), "v3").await.unwrap();

    pair.owner.sync().await.unwrap();

    // Exactly one acceptance; the loser's change was dropped silently
    let log = pair
        .owner
        .owner_syncer()
        .unwrap()
        .router()
        .accepted_event_ids(None)
        .await
        .unwrap();
    assert_eq!(log.len() - baseline_log, 1);

    let winner_hash = pair
        .owner
        .owner_syncer()
        .unwrap()
        .event_cache()
        .current_hash(&datasite_path("a.txt"))
        .map(str::to_string)
        .unwrap();
    assert!(winner_hash == content_hash(b"v2") || winner_hash == content_hash(b"v3"));

    // Both proposed messages were archived, win or lose
    let router = pair.owner.owner_syncer().unwrap().router();
    assert!(router.next_proposed_message(DS).await.unwrap().is_none());
    assert!(router.next_proposed_message(DS_B).await.unwrap().is_none());
}

#[tokio::test]
async fn loser_recovers_by_reproposing_with_the_fresh_hash() {
    let mut pair = connected().await;
    pair.scientist.send_file_change(&format!("{DO}/a.txt"), "v1").await.unwrap();
    pair.owner.sync().await.unwrap();

    // Propose against a stale view (never synced down): conflict
    pair.scientist.send_file_change(&format!("{DO}/a.txt"), "v2").await.unwrap();
    pair.owner.sync().await.unwrap();
    let owner_hash = |pair: &ManagerPair<FakeClock>| {
        pair.owner
            .owner_syncer()
            .unwrap()
            .event_cache()
            .current_hash(&datasite_path("a.txt"))
            .map(str::to_string)
    };
    assert_eq!(owner_hash(&pair), Some(content_hash(b"v1")));

    // Observing the accepted state refreshes old_hash; the retry lands
    pair.scientist.sync().await.unwrap();
    pair.scientist.send_file_change(&format!("{DO}/a.txt"), "v2").await.unwrap();
    pair.owner.sync().await.unwrap();
    assert_eq!(owner_hash(&pair), Some(content_hash(b"v2")));
}

#[tokio::test]
async fn empty_proposed_message_is_archived_without_events() {
    let mut pair = connected().await;
    let ds_backend = MemoryBackend::new(pair.store.clone(), DS);
    let empty = syftbox_core::ProposedChangeMessage::new(DS, vec![], 10.0);
    ds_backend.send_proposed_message(DO, &empty).await.unwrap();

    pair.owner.sync().await.unwrap();

    let router = pair.owner.owner_syncer().unwrap().router();
    assert!(router.next_proposed_message(DS).await.unwrap().is_none());
    assert!(router.accepted_event_ids(None).await.unwrap().is_empty());
}
