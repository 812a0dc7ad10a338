// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the client crate.
//!
//! The engine itself never reads the environment; callers resolve these
//! once and pass explicit configuration in.

use std::path::PathBuf;

/// Root folder override: `SYFTBOX_FOLDER`.
pub fn syftbox_folder() -> Option<PathBuf> {
    std::env::var("SYFTBOX_FOLDER").ok().filter(|value| !value.is_empty()).map(PathBuf::from)
}

/// Identity override: `SYFTBOX_EMAIL`.
pub fn syftbox_email() -> Option<String> {
    std::env::var("SYFTBOX_EMAIL").ok().filter(|value| !value.is_empty())
}

/// Whether read accessors should sync first: `SYFTBOX_PRE_SYNC`, default
/// true. Feeds `ManagerConfig::sync_before_read`.
pub fn sync_before_read() -> bool {
    match std::env::var("SYFTBOX_PRE_SYNC") {
        Ok(value) => !value.eq_ignore_ascii_case("false"),
        Err(_) => true,
    }
}

/// Default root folder for an identity: `~/SyftBox_<email>`.
pub fn default_syftbox_folder(email: &str) -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(format!("SyftBox_{email}")))
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
