// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::event::decode_content;

#[test]
fn update_computes_new_hash() {
    let path = DatasitePath::new("a.txt").unwrap();
    let change = ProposedChange::update("do@example.com", path, b"v2", Some("h1".into()), 5.0);
    assert_eq!(change.new_hash, Some(content_hash(b"v2")));
    assert_eq!(change.old_hash, Some("h1".to_string()));
    assert!(!change.is_deleted);
}

#[test]
fn update_encodes_binary_content() {
    let path = DatasitePath::new("blob.bin").unwrap();
    let data = [0u8, 159, 146, 150];
    let change = ProposedChange::update("do@example.com", path, &data, None, 5.0);
    assert_eq!(change.content_type, ContentType::Binary);
    let decoded =
        decode_content(change.content_type, change.content.as_deref().unwrap()).unwrap();
    assert_eq!(decoded, data);
}

#[test]
fn deletion_has_no_content_or_new_hash() {
    let path = DatasitePath::new("a.txt").unwrap();
    let change = ProposedChange::deletion("do@example.com", path, Some("h1".into()), 5.0);
    assert!(change.is_deleted);
    assert_eq!(change.content, None);
    assert_eq!(change.new_hash, None);
}

#[test]
fn filename_round_trip() {
    let name = ProposalFileName::at(99.125);
    let parsed: ProposalFileName = name.to_string().parse().unwrap();
    assert_eq!(parsed, name);
}

#[test]
fn message_serde_round_trip() {
    let path = DatasitePath::new("a.txt").unwrap();
    let change = ProposedChange::update("do@example.com", path, b"v1", None, 5.0);
    let message = ProposedChangeMessage::new("ds@example.com", vec![change], 6.0);

    let json = serde_json::to_string(&message).unwrap();
    let back: ProposedChangeMessage = serde_json::from_str(&json).unwrap();
    assert_eq!(back, message);
    assert_eq!(back.timestamp(), 6.0);
}
