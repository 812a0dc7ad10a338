// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Manager configuration

use std::path::PathBuf;
use syftbox_core::DEFAULT_COMPACTING_THRESHOLD;
use syftbox_engine::owner::{
    DEFAULT_CHECKPOINT_EVENT_THRESHOLD, DEFAULT_ROLLING_UPLOAD_THRESHOLD,
};
use syftbox_engine::parallel::DEFAULT_FANOUT_LIMIT;

/// Which side of the protocol a manager drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Data owner: accepts or rejects proposed changes, owns the datasite.
    Owner,
    /// Data scientist: proposes changes and consumes results.
    Scientist,
}

/// Configuration for one [`crate::Manager`].
#[derive(Debug, Clone)]
pub struct ManagerConfig {
    pub email: String,
    pub role: Role,
    /// Local materialization root; `None` keeps everything in memory.
    pub syftbox_folder: Option<PathBuf>,
    pub write_files: bool,
    pub in_memory_cache: bool,
    /// Sync before read accessors like `peers()` return.
    pub sync_before_read: bool,
    pub check_versions: bool,
    pub rolling_upload_threshold: usize,
    pub checkpoint_threshold: usize,
    pub compacting_threshold: usize,
    pub fanout_limit: usize,
}

impl ManagerConfig {
    fn new(email: impl Into<String>, role: Role) -> Self {
        Self {
            email: email.into(),
            role,
            syftbox_folder: None,
            write_files: true,
            in_memory_cache: true,
            sync_before_read: false,
            check_versions: false,
            rolling_upload_threshold: DEFAULT_ROLLING_UPLOAD_THRESHOLD,
            checkpoint_threshold: DEFAULT_CHECKPOINT_EVENT_THRESHOLD,
            compacting_threshold: DEFAULT_COMPACTING_THRESHOLD,
            fanout_limit: DEFAULT_FANOUT_LIMIT,
        }
    }

    pub fn owner(email: impl Into<String>) -> Self {
        Self::new(email, Role::Owner)
    }

    pub fn scientist(email: impl Into<String>) -> Self {
        Self::new(email, Role::Scientist)
    }

    pub fn with_syftbox_folder(mut self, folder: impl Into<PathBuf>) -> Self {
        self.syftbox_folder = Some(folder.into());
        self.in_memory_cache = false;
        self
    }

    pub fn with_version_checks(mut self) -> Self {
        self.check_versions = true;
        self
    }

    pub fn with_sync_before_read(mut self) -> Self {
        self.sync_before_read = true;
        self
    }
}
