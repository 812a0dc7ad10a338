// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use syftbox_backend::{BackendConnection, MemoryBackend, MemoryStore, RetryPolicy};

const DO: &str = "do@example.com";
const DS: &str = "ds@example.com";

fn mismatched() -> VersionInfo {
    let mut info = VersionInfo::current();
    info.protocol_version = "2".to_string();
    info
}

#[test]
fn checks_disabled_accepts_everyone() {
    let versions = VersionManager::new(false);
    assert!(versions.is_compatible("anyone@example.com"));
    assert!(versions.check_for_submission("anyone@example.com", false).is_ok());

    let peers = vec![DO.to_string()];
    assert_eq!(versions.compatible_peers(&peers), peers);
}

#[test]
fn unknown_peer_is_incompatible_when_checking() {
    let versions = VersionManager::new(true);
    assert!(!versions.is_compatible(DO));
    let err = versions.check_for_submission(DO, false).unwrap_err();
    assert!(matches!(err, VersionError::Unknown { .. }));
}

#[test]
fn matching_version_passes_all_gates() {
    let mut versions = VersionManager::new(true);
    versions.set_peer_version(DO, Some(VersionInfo::current()));

    assert!(versions.is_compatible(DO));
    assert!(versions.check_for_submission(DO, false).is_ok());
    assert!(versions.check_for_execution(DO, false).is_ok());
}

#[test]
fn mismatch_is_filtered_and_gated() {
    let mut versions = VersionManager::new(true);
    versions.set_peer_version(DO, Some(mismatched()));

    assert!(versions.compatible_peers(&[DO.to_string()]).is_empty());
    let err = versions.check_for_execution(DO, false).unwrap_err();
    assert!(matches!(err, VersionError::Mismatch { .. }));
}

#[test]
fn force_overrides_the_gate() {
    let mut versions = VersionManager::new(true);
    versions.set_peer_version(DO, Some(mismatched()));
    assert!(versions.check_for_submission(DO, true).is_ok());
    assert!(versions.check_for_execution(DO, true).is_ok());
}

#[tokio::test]
async fn versions_round_trip_through_backend() {
    let store = MemoryStore::shared();
    let owner = MemoryBackend::new(store.clone(), DO);
    let scientist = ConnectionRouter::new(Box::new(MemoryBackend::new(store, DS)))
        .with_policy(RetryPolicy::none());

    owner.write_version_file(&VersionInfo::current()).await.unwrap();
    owner.share_version_file(DS).await.unwrap();

    let mut versions = VersionManager::new(true);
    versions.load_peer_versions(&scientist, &[DO.to_string()], 2).await.unwrap();
    assert!(versions.is_compatible(DO));
}

#[tokio::test]
async fn unreadable_version_degrades_to_unknown() {
    let store = MemoryStore::shared();
    let owner = MemoryBackend::new(store.clone(), DO);
    let scientist = ConnectionRouter::new(Box::new(MemoryBackend::new(store, DS)))
        .with_policy(RetryPolicy::none());

    // Version file exists but was never shared
    owner.write_version_file(&VersionInfo::current()).await.unwrap();

    let mut versions = VersionManager::new(true);
    versions.load_peer_version(&scientist, DO).await.unwrap();
    assert_eq!(versions.peer_version(DO), None);
    assert!(!versions.is_compatible(DO));
}
