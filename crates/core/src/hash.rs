// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Content hashing for events and dataset collections

use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::Path;

/// Length of truncated dataset-collection hashes.
const COLLECTION_HASH_LEN: usize = 12;

/// SHA-256 of raw content bytes as lowercase hex.
pub fn content_hash(data: &[u8]) -> String {
    format!("{:x}", Sha256::digest(data))
}

/// Hash over a named file set, independent of insertion order.
///
/// Truncated to 12 hex chars; used in dataset-collection folder names where
/// the full digest would blow past backend name limits.
pub fn collection_hash(files: &BTreeMap<String, Vec<u8>>) -> String {
    let mut hasher = Sha256::new();
    for (name, data) in files {
        hasher.update(name.as_bytes());
        hasher.update(data);
    }
    let digest = format!("{:x}", hasher.finalize());
    digest[..COLLECTION_HASH_LEN].to_string()
}

/// Collection hash of the files directly inside `dir` (non-recursive).
///
/// Returns `Ok(None)` when the directory is missing or holds no files.
pub fn directory_hash(dir: &Path) -> io::Result<Option<String>> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(err),
    };

    let mut files = BTreeMap::new();
    for entry in entries {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            let name = entry.file_name().to_string_lossy().into_owned();
            files.insert(name, fs::read(entry.path())?);
        }
    }

    if files.is_empty() {
        return Ok(None);
    }
    Ok(Some(collection_hash(&files)))
}

#[cfg(test)]
#[path = "hash_tests.rs"]
mod tests;
