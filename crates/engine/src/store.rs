// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Key-sorted byte stores backing the caches
//!
//! The caches persist either entirely in memory (tests) or on the local
//! filesystem (production). Keys are `/`-separated relative paths; both
//! stores return them sorted, matching filesystem enumeration order.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Byte store keyed by relative path.
pub trait CacheStore: Send {
    fn write(&mut self, key: &str, data: &[u8]) -> io::Result<()>;
    fn read(&self, key: &str) -> io::Result<Option<Vec<u8>>>;
    fn delete(&mut self, key: &str) -> io::Result<()>;
    /// All keys, sorted ascending.
    fn keys(&self) -> io::Result<Vec<String>>;
    fn clear(&mut self) -> io::Result<()>;
}

/// In-memory store for tests and cache-only runs.
#[derive(Debug, Default)]
pub struct MemoryFileStore {
    files: BTreeMap<String, Vec<u8>>,
}

impl MemoryFileStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CacheStore for MemoryFileStore {
    fn write(&mut self, key: &str, data: &[u8]) -> io::Result<()> {
        self.files.insert(key.to_string(), data.to_vec());
        Ok(())
    }

    fn read(&self, key: &str) -> io::Result<Option<Vec<u8>>> {
        Ok(self.files.get(key).cloned())
    }

    fn delete(&mut self, key: &str) -> io::Result<()> {
        self.files.remove(key);
        Ok(())
    }

    fn keys(&self) -> io::Result<Vec<String>> {
        Ok(self.files.keys().cloned().collect())
    }

    fn clear(&mut self) -> io::Result<()> {
        self.files.clear();
        Ok(())
    }
}

/// Filesystem-backed store rooted at one directory.
#[derive(Debug)]
pub struct DiskFileStore {
    base_dir: PathBuf,
}

impl DiskFileStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> io::Result<Self> {
        let base_dir = base_dir.into();
        fs::create_dir_all(&base_dir)?;
        Ok(Self { base_dir })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Keys come from the wire; refuse anything that could escape the root.
    fn resolve(&self, key: &str) -> io::Result<PathBuf> {
        let escapes = key.starts_with('/') || key.split('/').any(|segment| segment == "..");
        if escapes || key.is_empty() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("key escapes store root: {key}"),
            ));
        }
        Ok(self.base_dir.join(key))
    }

    fn collect_keys(&self, dir: &Path, prefix: &str, out: &mut Vec<String>) -> io::Result<()> {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(err) => return Err(err),
        };
        for entry in entries {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().into_owned();
            let key = if prefix.is_empty() { name.clone() } else { format!("{prefix}/{name}") };
            if entry.file_type()?.is_dir() {
                self.collect_keys(&entry.path(), &key, out)?;
            } else {
                out.push(key);
            }
        }
        Ok(())
    }
}

impl CacheStore for DiskFileStore {
    fn write(&mut self, key: &str, data: &[u8]) -> io::Result<()> {
        let path = self.resolve(key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, data)
    }

    fn read(&self, key: &str) -> io::Result<Option<Vec<u8>>> {
        let path = self.resolve(key)?;
        match fs::read(path) {
            Ok(data) => Ok(Some(data)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err),
        }
    }

    fn delete(&mut self, key: &str) -> io::Result<()> {
        let path = self.resolve(key)?;
        match fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err),
        }
    }

    fn keys(&self) -> io::Result<Vec<String>> {
        let mut keys = Vec::new();
        self.collect_keys(&self.base_dir, "", &mut keys)?;
        keys.sort();
        Ok(keys)
    }

    fn clear(&mut self) -> io::Result<()> {
        for entry in fs::read_dir(&self.base_dir)? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                fs::remove_dir_all(entry.path())?;
            } else {
                fs::remove_file(entry.path())?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
