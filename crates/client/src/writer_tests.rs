// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn writes_publish_changes_in_order() {
    let (writer, mut changes) = FileWriter::new(None, false);
    writer.write_file("do@x.com/a.txt", b"1").unwrap();
    writer.delete_file("do@x.com/a.txt").unwrap();

    let first = changes.try_recv().unwrap();
    assert_eq!(first.relative_path, "do@x.com/a.txt");
    assert_eq!(first.content, Some(b"1".to_vec()));

    let second = changes.try_recv().unwrap();
    assert_eq!(second.content, None);
    assert!(changes.try_recv().is_err());
}

#[test]
fn writes_materialize_under_the_base_dir() {
    let temp = tempfile::tempdir().unwrap();
    let (writer, _changes) = FileWriter::new(Some(temp.path().to_path_buf()), true);

    writer.write_file("do@x.com/deep/a.txt", b"content").unwrap();
    let on_disk = std::fs::read(temp.path().join("do@x.com/deep/a.txt")).unwrap();
    assert_eq!(on_disk, b"content");

    writer.delete_file("do@x.com/deep/a.txt").unwrap();
    assert!(!temp.path().join("do@x.com/deep/a.txt").exists());
    // Deleting again is a no-op
    writer.delete_file("do@x.com/deep/a.txt").unwrap();
}

#[test]
fn disabled_writer_only_publishes() {
    let temp = tempfile::tempdir().unwrap();
    let (writer, mut changes) = FileWriter::new(Some(temp.path().to_path_buf()), false);
    writer.write_file("do@x.com/a.txt", b"1").unwrap();

    assert!(!temp.path().join("do@x.com/a.txt").exists());
    assert!(changes.try_recv().is_ok());
}
