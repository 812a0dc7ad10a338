// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use syftbox_backend::{
    BackendConnection, MemoryBackend, MemoryStore, RetryPolicy, SharedStore,
};
use syftbox_core::{content_hash, AcceptedEventsMessage, FakeClock};

const DO: &str = "do@example.com";
const DS: &str = "ds@example.com";

struct Rig {
    store: SharedStore,
    owner: MemoryBackend,
    syncer: WatcherSyncer<FakeClock>,
}

async fn rig() -> Rig {
    let store = MemoryStore::shared();
    let owner = MemoryBackend::new(store.clone(), DO);
    let ds_backend = MemoryBackend::new(store.clone(), DS);
    ds_backend.register_peer_request(DO).await.unwrap();

    let router = ConnectionRouter::new(Box::new(ds_backend)).with_policy(RetryPolicy::none());
    let syncer = WatcherSyncer::new(
        DS,
        None,
        router,
        WatcherCache::in_memory(),
        FakeClock::at(1_000.0),
        4,
    );
    Rig { store, owner, syncer }
}

#[tokio::test]
async fn send_file_change_lands_in_owner_inbox() {
    let mut rig = rig().await;
    rig.syncer
        .send_file_change(&format!("{DO}/t.txt"), Some(b"x".to_vec()))
        .await
        .unwrap();

    let message = rig.owner.next_proposed_message(DS).await.unwrap().unwrap();
    assert_eq!(message.sender_email, DS);
    assert_eq!(message.proposed_changes.len(), 1);
    let change = &message.proposed_changes[0];
    assert_eq!(change.path_in_datasite.as_str(), "t.txt");
    assert_eq!(change.datasite_email, DO);
    assert_eq!(change.new_hash, Some(content_hash(b"x")));
    assert_eq!(change.old_hash, None);
}

#[tokio::test]
async fn queued_changes_bundle_into_one_message() {
    let mut rig = rig().await;
    rig.syncer.on_file_change(&format!("{DO}/a.txt"), Some(b"1".to_vec()));
    rig.syncer.on_file_change(&format!("{DO}/b.txt"), Some(b"2".to_vec()));
    assert_eq!(rig.syncer.queued_changes(), 2);

    rig.syncer.process_queue().await.unwrap();
    assert_eq!(rig.syncer.queued_changes(), 0);

    let message = rig.owner.next_proposed_message(DS).await.unwrap().unwrap();
    assert_eq!(message.proposed_changes.len(), 2);
    rig.owner.archive_proposed_message(&message).await.unwrap();
    assert!(rig.owner.next_proposed_message(DS).await.unwrap().is_none());
}

#[tokio::test]
async fn changes_group_per_recipient() {
    let mut rig = rig().await;
    let second_owner = MemoryBackend::new(rig.store.clone(), "do2@example.com");
    // Register the second peering so the outbox folder exists
    rig.syncer.router().register_peer_request("do2@example.com").await.unwrap();

    rig.syncer.on_file_change(&format!("{DO}/a.txt"), Some(b"1".to_vec()));
    rig.syncer.on_file_change("do2@example.com/b.txt", Some(b"2".to_vec()));
    rig.syncer.process_queue().await.unwrap();

    assert!(rig.owner.next_proposed_message(DS).await.unwrap().is_some());
    assert!(second_owner.next_proposed_message(DS).await.unwrap().is_some());
}

#[tokio::test]
async fn old_hash_comes_from_the_mirror() {
    let mut rig = rig().await;
    let event_path = format!("{DO}/t.txt");

    // Owner's acceptance lands in the DS mirror first
    let event = syftbox_core::FileChangeEvent {
        id: uuid::Uuid::new_v4(),
        datasite_email: DO.to_string(),
        path_in_datasite: syftbox_core::DatasitePath::new("t.txt").unwrap(),
        content: Some("v1".to_string()),
        content_type: Default::default(),
        old_hash: None,
        new_hash: Some(content_hash(b"v1")),
        is_deleted: false,
        submitted_timestamp: 10.0,
        timestamp: 10.0,
    };
    let message = AcceptedEventsMessage::new(vec![event], 10.0);
    rig.owner.write_events_message_to_outbox(DS, &message).await.unwrap();
    rig.syncer.sync_down(&[DO.to_string()]).await.unwrap();
    assert_eq!(rig.syncer.cache().read_file(&event_path).unwrap(), Some(b"v1".to_vec()));

    // The next proposal for that path carries the mirrored hash
    rig.syncer.send_file_change(&event_path, Some(b"v2".to_vec())).await.unwrap();
    let proposed = rig.owner.next_proposed_message(DS).await.unwrap().unwrap();
    assert_eq!(proposed.proposed_changes[0].old_hash, Some(content_hash(b"v1")));
}

#[tokio::test]
async fn missing_file_becomes_a_deletion_proposal() {
    let temp = tempfile::tempdir().unwrap();
    let store = MemoryStore::shared();
    let owner = MemoryBackend::new(store.clone(), DO);
    let ds_backend = MemoryBackend::new(store, DS);
    ds_backend.register_peer_request(DO).await.unwrap();

    let router = ConnectionRouter::new(Box::new(ds_backend)).with_policy(RetryPolicy::none());
    let mut syncer = WatcherSyncer::new(
        DS,
        Some(temp.path().to_path_buf()),
        router,
        WatcherCache::in_memory(),
        FakeClock::at(1_000.0),
        4,
    );

    syncer.send_file_change(&format!("{DO}/gone.txt"), None).await.unwrap();
    let message = owner.next_proposed_message(DS).await.unwrap().unwrap();
    assert!(message.proposed_changes[0].is_deleted);
}

#[tokio::test]
async fn content_read_from_disk_when_not_provided() {
    let temp = tempfile::tempdir().unwrap();
    let store = MemoryStore::shared();
    let owner = MemoryBackend::new(store.clone(), DO);
    let ds_backend = MemoryBackend::new(store, DS);
    ds_backend.register_peer_request(DO).await.unwrap();

    let file_dir = temp.path().join(DO);
    std::fs::create_dir_all(&file_dir).unwrap();
    std::fs::write(file_dir.join("t.txt"), b"from-disk").unwrap();

    let router = ConnectionRouter::new(Box::new(ds_backend)).with_policy(RetryPolicy::none());
    let mut syncer = WatcherSyncer::new(
        DS,
        Some(temp.path().to_path_buf()),
        router,
        WatcherCache::in_memory(),
        FakeClock::at(1_000.0),
        4,
    );

    syncer.send_file_change(&format!("{DO}/t.txt"), None).await.unwrap();
    let message = owner.next_proposed_message(DS).await.unwrap().unwrap();
    assert_eq!(
        message.proposed_changes[0].new_hash,
        Some(content_hash(b"from-disk"))
    );
}

#[tokio::test]
async fn pathless_change_is_rejected() {
    let mut rig = rig().await;
    let err = rig.syncer.send_file_change("no-slash", Some(b"x".to_vec())).await.unwrap_err();
    assert!(matches!(err, SyncError::InvalidChangePath { .. }));
}
