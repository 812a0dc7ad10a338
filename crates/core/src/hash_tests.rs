// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn content_hash_is_sha256_hex() {
    assert_eq!(
        content_hash(b"x"),
        "2d711642b726b04401627ca9fbac32f5c8530fb1903cc4db02258717921a4881"
    );
}

#[test]
fn content_hash_differs_per_content() {
    assert_ne!(content_hash(b"a"), content_hash(b"b"));
}

#[test]
fn collection_hash_is_truncated() {
    let mut files = BTreeMap::new();
    files.insert("a.csv".to_string(), b"1,2,3".to_vec());
    let hash = collection_hash(&files);
    assert_eq!(hash.len(), 12);
    assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
}

#[test]
fn collection_hash_covers_names_and_contents() {
    let mut files = BTreeMap::new();
    files.insert("a".to_string(), b"x".to_vec());
    let base = collection_hash(&files);

    let mut renamed = BTreeMap::new();
    renamed.insert("b".to_string(), b"x".to_vec());
    assert_ne!(base, collection_hash(&renamed));

    let mut edited = BTreeMap::new();
    edited.insert("a".to_string(), b"y".to_vec());
    assert_ne!(base, collection_hash(&edited));
}

#[test]
fn directory_hash_missing_dir_is_none() {
    let temp = tempfile::tempdir().unwrap();
    let hash = directory_hash(&temp.path().join("nope")).unwrap();
    assert_eq!(hash, None);
}

#[test]
fn directory_hash_empty_dir_is_none() {
    let temp = tempfile::tempdir().unwrap();
    assert_eq!(directory_hash(temp.path()).unwrap(), None);
}

#[test]
fn directory_hash_matches_collection_hash() {
    let temp = tempfile::tempdir().unwrap();
    std::fs::write(temp.path().join("a.txt"), b"hello").unwrap();
    std::fs::write(temp.path().join("b.txt"), b"world").unwrap();

    let mut files = BTreeMap::new();
    files.insert("a.txt".to_string(), b"hello".to_vec());
    files.insert("b.txt".to_string(), b"world".to_vec());

    assert_eq!(
        directory_hash(temp.path()).unwrap(),
        Some(collection_hash(&files))
    );
}
