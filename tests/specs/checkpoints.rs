// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Checkpoint ladder specs: snapshot round-trips, incremental thresholds,
//! compaction, and the two-read fresh login.

use super::prelude::*;
use syftbox_client::pair_connected;
use syftbox_core::Clock;

#[tokio::test]
async fn checkpoint_round_trip_rematerializes_the_datasite() {
    let temp = tempfile::tempdir().unwrap();
    let owner_config =
        ManagerConfig::owner(DO).with_syftbox_folder(temp.path().join("syftbox"));
    let mut pair =
        pair_connected(owner_config, ManagerConfig::scientist(DS), clock()).await.unwrap();

    pair.owner.write_local_file("p1", "c1").unwrap();
    pair.owner.write_local_file("p2", "c2").unwrap();
    pair.owner.sync().await.unwrap();
    pair.owner.owner_syncer_mut().unwrap().create_checkpoint().await.unwrap();

    pair.owner.clear_caches().unwrap();
    assert!(pair.owner.owner_syncer().unwrap().event_cache().file_hashes().is_empty());

    pair.owner.owner_syncer_mut().unwrap().pull_initial_state().await.unwrap();

    let cache = pair.owner.owner_syncer().unwrap().event_cache();
    assert_eq!(cache.file_hashes().len(), 2);
    assert_eq!(cache.current_hash(&datasite_path("p1")), Some(content_hash(b"c1").as_str()));
    assert_eq!(cache.current_hash(&datasite_path("p2")), Some(content_hash(b"c2").as_str()));

    // On-disk files came back byte-identical
    let datasite = temp.path().join("syftbox").join(DO);
    assert_eq!(std::fs::read(datasite.join("p1")).unwrap(), b"c1");
    assert_eq!(std::fs::read(datasite.join("p2")).unwrap(), b"c2");
}

#[tokio::test]
async fn nine_changes_compact_into_one_full_checkpoint() {
    let mut owner_config = ManagerConfig::owner(DO);
    owner_config.checkpoint_threshold = 3;
    owner_config.compacting_threshold = 2;
    let mut pair =
        pair_connected(owner_config, ManagerConfig::scientist(DS), clock()).await.unwrap();

    for index in 0..9 {
        pair.scientist
            .send_file_change(&format!("{DO}/file-{index}"), format!("content-{index}"))
            .await
            .unwrap();
    }

    let router = pair.owner.owner_syncer().unwrap().router();
    assert_eq!(router.incremental_checkpoint_count().await.unwrap(), 0);

    pair.owner.sync().await.unwrap();

    // Sequences 1..3 were cut and the end-of-tick compaction folded them
    let router = pair.owner.owner_syncer().unwrap().router();
    assert_eq!(router.incremental_checkpoint_count().await.unwrap(), 0);
    let checkpoint = router.latest_checkpoint().await.unwrap().unwrap();
    assert_eq!(checkpoint.files.len(), 9);
}

#[tokio::test]
async fn fresh_login_reads_checkpoint_and_rolling_state_only() {
    let tick = clock();
    let mut pair = pair_connected(
        ManagerConfig::owner(DO),
        ManagerConfig::scientist(DS),
        tick.clone(),
    )
    .await
    .unwrap();

    pair.scientist.send_file_change(&format!("{DO}/p1"), "c1").await.unwrap();
    pair.scientist.send_file_change(&format!("{DO}/p2"), "c2").await.unwrap();
    pair.owner.sync().await.unwrap();
    pair.owner.owner_syncer_mut().unwrap().create_checkpoint().await.unwrap();

    tick.advance(100.0);
    pair.scientist.send_file_change(&format!("{DO}/p3"), "c3").await.unwrap();
    pair.scientist.send_file_change(&format!("{DO}/p4"), "c4").await.unwrap();
    pair.owner.sync().await.unwrap();

    // A brand-new owner manager on the same backend
    let mut fresh = Manager::from_config(
        ManagerConfig::owner(DO),
        Box::new(MemoryBackend::new(pair.store.clone(), DO)),
        FakeClock::at(tick.epoch_secs() + 100.0),
    )
    .unwrap();

    let before = pair.store.lock().counters();
    fresh.owner_syncer_mut().unwrap().pull_initial_state().await.unwrap();
    let after = pair.store.lock().counters();

    assert_eq!(after.downloads - before.downloads, 2);
    let cache = fresh.owner_syncer().unwrap().event_cache();
    assert_eq!(cache.file_hashes().len(), 4);
    for path in ["p1", "p2", "p3", "p4"] {
        assert!(cache.file_hashes().contains_key(&datasite_path(path)), "missing {path}");
    }
}
