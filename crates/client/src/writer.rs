// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! File writer with a typed change channel
//!
//! Writes land on disk (when enabled) and every change is published on an
//! mpsc channel the manager drains into the watcher queue. This is the
//! seam an external filesystem watcher plugs into as well.

use std::fs;
use std::io;
use std::path::PathBuf;
use tokio::sync::mpsc;

/// One observed local change; `None` content means deletion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileChange {
    /// Syftbox-relative path: `<owner_email>/<path_in_datasite>`.
    pub relative_path: String,
    pub content: Option<Vec<u8>>,
}

/// Writes local files and publishes the changes.
pub struct FileWriter {
    base_dir: Option<PathBuf>,
    write_files: bool,
    changes_tx: mpsc::UnboundedSender<FileChange>,
}

impl FileWriter {
    pub fn new(
        base_dir: Option<PathBuf>,
        write_files: bool,
    ) -> (Self, mpsc::UnboundedReceiver<FileChange>) {
        let (changes_tx, changes_rx) = mpsc::unbounded_channel();
        (Self { base_dir, write_files, changes_tx }, changes_rx)
    }

    fn publish(&self, relative_path: &str, content: Option<Vec<u8>>) {
        let change = FileChange { relative_path: relative_path.to_string(), content };
        if self.changes_tx.send(change).is_err() {
            tracing::warn!(path = %relative_path, "file change dropped: receiver closed");
        }
    }

    /// Write a file and publish the change.
    pub fn write_file(&self, relative_path: &str, content: &[u8]) -> io::Result<()> {
        if self.write_files {
            if let Some(base_dir) = &self.base_dir {
                let path = base_dir.join(relative_path);
                if let Some(parent) = path.parent() {
                    fs::create_dir_all(parent)?;
                }
                fs::write(path, content)?;
            }
        }
        self.publish(relative_path, Some(content.to_vec()));
        Ok(())
    }

    /// Delete a file and publish the deletion.
    pub fn delete_file(&self, relative_path: &str) -> io::Result<()> {
        if self.write_files {
            if let Some(base_dir) = &self.base_dir {
                match fs::remove_file(base_dir.join(relative_path)) {
                    Ok(()) => {}
                    Err(err) if err.kind() == io::ErrorKind::NotFound => {}
                    Err(err) => return Err(err),
                }
            }
        }
        self.publish(relative_path, None);
        Ok(())
    }
}

#[cfg(test)]
#[path = "writer_tests.rs"]
mod tests;
