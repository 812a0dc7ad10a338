// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Datasite-relative paths
//!
//! Every path on the wire is POSIX-style and relative to a datasite root:
//! never absolute, never escaping upward. Validation happens once at the
//! boundary so the rest of the engine can treat paths as plain keys.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Prefixes that are never tracked by the event cache.
///
/// `private/` never leaves the owner's host, `.venv` trees are local build
/// artifacts, and dataset collections travel over their own channel.
const EXCLUDED_PREFIXES: [&str; 2] = ["private", "public/syft_datasets"];

/// Errors from validating a datasite path
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PathError {
    #[error("datasite path is empty")]
    Empty,
    #[error("datasite path is absolute: {0}")]
    Absolute(String),
    #[error("datasite path escapes the datasite: {0}")]
    ParentTraversal(String),
    #[error("datasite path contains a backslash: {0}")]
    Backslash(String),
}

/// POSIX-style path relative to a datasite root.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DatasitePath(String);

impl DatasitePath {
    pub fn new(path: impl Into<String>) -> Result<Self, PathError> {
        let path = path.into();
        if path.is_empty() {
            return Err(PathError::Empty);
        }
        if path.starts_with('/') {
            return Err(PathError::Absolute(path));
        }
        if path.contains('\\') {
            return Err(PathError::Backslash(path));
        }
        if path.split('/').any(|segment| segment == "..") {
            return Err(PathError::ParentTraversal(path));
        }
        Ok(Self(path))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/')
    }

    /// Segment-aware prefix test: `a/b` is under `a` but `ab` is not.
    pub fn is_under(&self, prefix: &str) -> bool {
        match self.0.strip_prefix(prefix) {
            Some(rest) => rest.is_empty() || rest.starts_with('/'),
            None => false,
        }
    }

    /// True for paths the sync engine never tracks.
    pub fn is_excluded(&self) -> bool {
        EXCLUDED_PREFIXES.iter().any(|prefix| self.is_under(prefix))
            || self.segments().any(|segment| segment == ".venv")
    }

    /// Syftbox-relative form: `<datasite_email>/<path>`.
    pub fn in_syftbox(&self, datasite_email: &str) -> String {
        format!("{datasite_email}/{}", self.0)
    }
}

impl fmt::Display for DatasitePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for DatasitePath {
    type Error = PathError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<DatasitePath> for String {
    fn from(value: DatasitePath) -> Self {
        value.0
    }
}

#[cfg(test)]
#[path = "path_tests.rs"]
mod tests;
