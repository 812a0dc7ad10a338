// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use syftbox_core::{DatasitePath, ProposedChange};

const DO: &str = "do@example.com";
const DS: &str = "ds@example.com";

fn pair() -> (MemoryBackend, MemoryBackend) {
    let store = MemoryStore::shared();
    (MemoryBackend::new(Arc::clone(&store), DO), MemoryBackend::new(store, DS))
}

fn proposed(path: &str, content: &[u8], timestamp: f64) -> ProposedChangeMessage {
    let change = ProposedChange::update(
        DO,
        DatasitePath::new(path).unwrap(),
        content,
        None,
        timestamp,
    );
    ProposedChangeMessage::new(DS, vec![change], timestamp)
}

fn accepted(timestamp: f64) -> AcceptedEventsMessage {
    AcceptedEventsMessage::new(vec![], timestamp)
}

#[tokio::test]
async fn peer_request_becomes_discoverable() {
    let (owner, scientist) = pair();
    scientist.register_peer_request(DO).await.unwrap();

    assert_eq!(scientist.peers_as_ds().await.unwrap(), vec![DO.to_string()]);
    assert_eq!(owner.peer_requests_as_do().await.unwrap(), vec![DS.to_string()]);
    assert!(owner.approved_peers_as_do().await.unwrap().is_empty());
}

#[tokio::test]
async fn accepting_a_peer_clears_the_request() {
    let (owner, scientist) = pair();
    scientist.register_peer_request(DO).await.unwrap();
    owner.update_peer_state(DS, PeerState::Accepted).await.unwrap();

    assert_eq!(owner.approved_peers_as_do().await.unwrap(), vec![DS.to_string()]);
    assert!(owner.peer_requests_as_do().await.unwrap().is_empty());
}

#[tokio::test]
async fn rejected_peer_stays_out_of_requests() {
    let (owner, scientist) = pair();
    scientist.register_peer_request(DO).await.unwrap();
    owner.update_peer_state(DS, PeerState::Rejected).await.unwrap();

    assert!(owner.peer_requests_as_do().await.unwrap().is_empty());
    assert!(owner.approved_peers_as_do().await.unwrap().is_empty());
}

#[tokio::test]
async fn proposed_messages_flow_oldest_first() {
    let (owner, scientist) = pair();
    scientist.register_peer_request(DO).await.unwrap();

    scientist.send_proposed_message(DO, &proposed("b.txt", b"2", 20.0)).await.unwrap();
    scientist.send_proposed_message(DO, &proposed("a.txt", b"1", 10.0)).await.unwrap();

    let first = owner.next_proposed_message(DS).await.unwrap().unwrap();
    assert_eq!(first.timestamp(), 10.0);

    owner.archive_proposed_message(&first).await.unwrap();
    let second = owner.next_proposed_message(DS).await.unwrap().unwrap();
    assert_eq!(second.timestamp(), 20.0);
}

#[tokio::test]
async fn archive_moves_message_out_of_inbox() {
    let (owner, scientist) = pair();
    scientist.register_peer_request(DO).await.unwrap();

    let message = proposed("a.txt", b"1", 10.0);
    scientist.send_proposed_message(DO, &message).await.unwrap();
    owner.archive_proposed_message(&message).await.unwrap();

    assert!(owner.next_proposed_message(DS).await.unwrap().is_none());
    // The object still exists, parked in the archive folder
    let store = owner.store();
    let store = store.lock();
    assert!(store.object_count() > 0);
}

#[tokio::test]
async fn send_without_registration_fails() {
    let (_owner, scientist) = pair();
    let err = scientist
        .send_proposed_message(DO, &proposed("a.txt", b"1", 10.0))
        .await
        .unwrap_err();
    assert!(matches!(err, BackendError::Invalid(_)));
}

#[tokio::test]
async fn outbox_round_trip_with_high_water() {
    let (owner, scientist) = pair();
    scientist.register_peer_request(DO).await.unwrap();

    for timestamp in [10.0, 20.0, 30.0] {
        owner.write_events_message_to_outbox(DS, &accepted(timestamp)).await.unwrap();
    }

    let all = scientist.outbox_file_metas(DO, None).await.unwrap();
    assert_eq!(all.len(), 3);

    let newer = scientist.outbox_file_metas(DO, Some(20.0)).await.unwrap();
    assert_eq!(newer.len(), 1);
}

#[tokio::test]
async fn early_termination_bounds_list_calls() {
    let (owner, scientist) = pair();
    scientist.register_peer_request(DO).await.unwrap();
    for timestamp in [10.0, 20.0, 30.0, 40.0, 50.0] {
        owner.write_events_message_to_outbox(DS, &accepted(timestamp)).await.unwrap();
    }

    let scientist = MemoryBackend::new(scientist.store(), DS).with_page_size(2);
    let before = scientist.counters();
    let metas = scientist.outbox_file_metas(DO, Some(30.0)).await.unwrap();
    let after = scientist.counters();

    assert_eq!(metas.len(), 2);
    assert_eq!(after.lists - before.lists, 2);
}

#[tokio::test]
async fn events_messages_since_skips_old_ones() {
    let (owner, _scientist) = pair();
    for timestamp in [10.0, 20.0, 30.0] {
        owner.write_events_message_to_log(&accepted(timestamp)).await.unwrap();
    }

    let newer = owner.events_messages_since(15.0).await.unwrap();
    let timestamps: Vec<f64> = newer.iter().map(|message| message.timestamp()).collect();
    assert_eq!(timestamps, vec![20.0, 30.0]);
}

#[tokio::test]
async fn checkpoint_upload_replaces_previous_full() {
    let (owner, _scientist) = pair();
    owner.upload_checkpoint(&Checkpoint::new(DO, 100.0)).await.unwrap();
    owner.upload_checkpoint(&Checkpoint::new(DO, 200.0)).await.unwrap();

    let latest = owner.latest_checkpoint().await.unwrap().unwrap();
    assert_eq!(latest.timestamp, 200.0);

    // Only one full checkpoint object remains
    let orphans = owner.find_orphaned_message_files().await.unwrap();
    assert_eq!(orphans.len(), 1);
}

#[tokio::test]
async fn incremental_checkpoints_accumulate_in_sequence() {
    let (owner, _scientist) = pair();
    assert_eq!(owner.next_incremental_sequence_number().await.unwrap(), 1);

    for sequence in [1, 2] {
        let checkpoint = IncrementalCheckpoint {
            version: 1,
            email: DO.to_string(),
            sequence_number: sequence,
            timestamp: 100.0 + sequence as f64,
            events: vec![],
        };
        owner.upload_incremental_checkpoint(&checkpoint).await.unwrap();
    }

    assert_eq!(owner.incremental_checkpoint_count().await.unwrap(), 2);
    assert_eq!(owner.next_incremental_sequence_number().await.unwrap(), 3);

    owner.delete_incremental_checkpoints().await.unwrap();
    assert_eq!(owner.incremental_checkpoint_count().await.unwrap(), 0);
}

#[tokio::test]
async fn rolling_state_update_is_single_call() {
    let (owner, _scientist) = pair();
    let mut state = RollingState::new(DO, 0.0, 10.0);
    owner.upload_rolling_state(&state).await.unwrap();

    state.timestamp = 20.0;
    let before = owner.counters();
    owner.upload_rolling_state(&state).await.unwrap();
    let after = owner.counters();

    assert_eq!(after.uploads - before.uploads, 1);
    let loaded = owner.rolling_state().await.unwrap().unwrap();
    assert_eq!(loaded.timestamp, 20.0);
}

#[tokio::test]
async fn rolling_state_delete_then_none() {
    let (owner, _scientist) = pair();
    owner.upload_rolling_state(&RollingState::new(DO, 0.0, 10.0)).await.unwrap();
    owner.delete_rolling_state().await.unwrap();
    assert!(owner.rolling_state().await.unwrap().is_none());
}

#[tokio::test]
async fn collections_respect_sharing() {
    let (owner, scientist) = pair();
    let mut files = BTreeMap::new();
    files.insert("data.csv".to_string(), b"1,2".to_vec());

    owner.create_collection_folder("census", "abc123", false).await.unwrap();
    owner.upload_collection_files("census", "abc123", false, &files).await.unwrap();

    // Not shared yet: invisible to the scientist
    assert!(scientist.collections_as_ds().await.unwrap().is_empty());

    owner
        .share_collection("census", "abc123", &ShareTarget::Users(vec![DS.to_string()]))
        .await
        .unwrap();
    let visible = scientist.collections_as_ds().await.unwrap();
    assert_eq!(visible.len(), 1);
    assert_eq!(visible[0].tag, "census");

    let metas = scientist.collection_file_metas(DO, "census", "abc123", false).await.unwrap();
    assert_eq!(metas.len(), 1);
    let data = scientist.download_file(&metas[0].id).await.unwrap();
    assert_eq!(data, b"1,2");
}

#[tokio::test]
async fn anyone_share_is_visible_to_everyone() {
    let (owner, scientist) = pair();
    owner.create_collection_folder("census", "abc123", false).await.unwrap();
    owner.share_collection("census", "abc123", &ShareTarget::Anyone).await.unwrap();

    let visible = scientist.collections_as_ds().await.unwrap();
    assert_eq!(visible.len(), 1);
    assert!(visible[0].shared_with_anyone);
}

#[tokio::test]
async fn private_collections_stay_private() {
    let (owner, scientist) = pair();
    owner.create_collection_folder("secret", "abc123", true).await.unwrap();

    assert!(scientist.collections_as_ds().await.unwrap().is_empty());
    let own = owner.collections_as_do(true).await.unwrap();
    assert_eq!(own.len(), 1);
    assert!(owner.collections_as_do(false).await.unwrap().is_empty());
}

#[tokio::test]
async fn version_file_needs_a_grant() {
    let (owner, scientist) = pair();
    owner.write_version_file(&VersionInfo::current()).await.unwrap();

    assert!(scientist.read_peer_version_file(DO).await.unwrap().is_none());

    owner.share_version_file(DS).await.unwrap();
    let info = scientist.read_peer_version_file(DO).await.unwrap().unwrap();
    assert_eq!(info.protocol_version, syftbox_core::version::PROTOCOL_VERSION);
}

#[tokio::test]
async fn delete_objects_tolerates_missing_and_foreign() {
    let (owner, scientist) = pair();
    scientist.register_peer_request(DO).await.unwrap();
    let foreign = scientist.all_object_ids().await.unwrap();

    // Missing ids and unreadable foreign objects are skipped
    let mut ids = vec!["obj-9999".to_string()];
    ids.extend(foreign);
    owner.delete_objects(&ids, true, true).await.unwrap();

    let err = owner.delete_objects(&["obj-9999".to_string()], true, false).await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn strict_delete_surfaces_permission_denied() {
    let (owner, scientist) = pair();
    scientist.write_version_file(&VersionInfo::current()).await.unwrap();
    let ids = scientist.all_object_ids().await.unwrap();
    assert_eq!(ids.len(), 1);

    let err = owner.delete_objects(&ids, false, true).await.unwrap_err();
    assert!(err.is_permission_denied());
}

#[tokio::test]
async fn orphan_sweep_finds_message_objects() {
    let (owner, _scientist) = pair();
    owner.write_events_message_to_log(&accepted(10.0)).await.unwrap();
    owner.upload_rolling_state(&RollingState::new(DO, 0.0, 10.0)).await.unwrap();
    owner.write_version_file(&VersionInfo::current()).await.unwrap();

    let orphans = owner.find_orphaned_message_files().await.unwrap();
    assert_eq!(orphans.len(), 2);
}

#[tokio::test]
async fn copies_share_the_store_but_not_caches() {
    let (owner, _scientist) = pair();
    owner.write_events_message_to_log(&accepted(10.0)).await.unwrap();

    let copy = owner.copy();
    assert_eq!(copy.email(), DO);
    let ids = copy.accepted_event_ids(None).await.unwrap();
    assert_eq!(ids.len(), 1);
}
