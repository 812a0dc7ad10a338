// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Peer-request gate and job-routing specs

use super::prelude::*;

#[tokio::test]
async fn unapproved_changes_never_reach_the_cache() {
    let mut pair = pair_unconnected(
        ManagerConfig::owner(DO),
        ManagerConfig::scientist(DS),
        clock(),
    )
    .await
    .unwrap();

    pair.scientist.add_peer(DO).await.unwrap();
    pair.scientist.send_file_change(&format!("{DO}/t.txt"), "x").await.unwrap();

    pair.owner.sync().await.unwrap();
    assert!(pair.owner.owner_syncer().unwrap().event_cache().file_hashes().is_empty());

    pair.owner.approve_peer_request(DS).await.unwrap();
    pair.owner.sync().await.unwrap();
    assert_eq!(
        pair.owner
            .owner_syncer()
            .unwrap()
            .event_cache()
            .current_hash(&datasite_path("t.txt")),
        Some(content_hash(b"x").as_str())
    );
}

#[tokio::test]
async fn job_results_reach_only_the_submitter() {
    let mut pair = connected().await;
    let mut second = attach_scientist(&pair.store, DS_B);
    second.add_peer(DO).await.unwrap();
    pair.owner.load_peers().await.unwrap();
    pair.owner.approve_peer_request(DS_B).await.unwrap();

    // The job facility wrote the job directory; the engine reads its config
    pair.owner
        .write_local_file(
            "app_data/job/train/config.yaml",
            format!("submitted_by: {DS}\nstatus: approved\n"),
        )
        .unwrap();
    pair.owner.write_local_file("app_data/job/train/output.txt", "result").unwrap();
    pair.owner.write_local_file("README.md", "public notes").unwrap();
    pair.owner.sync().await.unwrap();

    pair.scientist.sync().await.unwrap();
    second.sync().await.unwrap();

    // Submitter mirrors the job output
    let submitter_view = pair.scientist.watcher_syncer().unwrap().cache();
    assert!(submitter_view
        .read_file(&format!("{DO}/app_data/job/train/output.txt"))
        .unwrap()
        .is_some());

    // The other peer only sees the broadcast file
    let other_view = second.watcher_syncer().unwrap().cache();
    assert!(other_view
        .read_file(&format!("{DO}/app_data/job/train/output.txt"))
        .unwrap()
        .is_none());
    assert!(other_view.read_file(&format!("{DO}/README.md")).unwrap().is_some());
}

#[tokio::test]
async fn rejected_peers_stay_silent_forever() {
    let mut pair = pair_unconnected(
        ManagerConfig::owner(DO),
        ManagerConfig::scientist(DS),
        clock(),
    )
    .await
    .unwrap();

    pair.scientist.add_peer(DO).await.unwrap();
    pair.owner.load_peers().await.unwrap();
    pair.owner.reject_peer_request(DS).await.unwrap();

    pair.scientist.send_file_change(&format!("{DO}/t.txt"), "x").await.unwrap();
    pair.owner.sync().await.unwrap();
    assert!(pair.owner.owner_syncer().unwrap().event_cache().file_hashes().is_empty());

    // The rejected request never reappears as pending
    assert!(!pair.owner.check_peer_request_exists(DS).await.unwrap());
}
