// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Version information and compatibility checks
//!
//! Compatibility is currently exact-match on client and protocol versions;
//! the `min_supported_*` fields are carried on the wire so range-based
//! checks can ship without another protocol bump.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Client version (from Cargo.toml)
pub const CLIENT_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Wire-protocol version; bumped together with message filename prefixes.
pub const PROTOCOL_VERSION: &str = "3";

/// Oldest client version peers may run.
pub const MIN_SUPPORTED_CLIENT_VERSION: &str = CLIENT_VERSION;

/// Oldest protocol version peers may speak.
pub const MIN_SUPPORTED_PROTOCOL_VERSION: &str = PROTOCOL_VERSION;

/// Version information published by one client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionInfo {
    pub syft_client_version: String,
    pub min_supported_syft_client_version: String,
    pub protocol_version: String,
    pub min_supported_protocol_version: String,
    pub updated_at: DateTime<Utc>,
}

impl VersionInfo {
    /// Version info for the running client.
    pub fn current() -> Self {
        Self {
            syft_client_version: CLIENT_VERSION.to_string(),
            min_supported_syft_client_version: MIN_SUPPORTED_CLIENT_VERSION.to_string(),
            protocol_version: PROTOCOL_VERSION.to_string(),
            min_supported_protocol_version: MIN_SUPPORTED_PROTOCOL_VERSION.to_string(),
            updated_at: Utc::now(),
        }
    }

    pub fn is_compatible_with(
        &self,
        other: &VersionInfo,
        check_client: bool,
        check_protocol: bool,
    ) -> bool {
        if check_protocol && self.protocol_version != other.protocol_version {
            return false;
        }
        if check_client && self.syft_client_version != other.syft_client_version {
            return false;
        }
        true
    }

    /// Why two versions are incompatible, `None` when they match.
    pub fn incompatibility_reason(
        &self,
        other: &VersionInfo,
        check_client: bool,
        check_protocol: bool,
    ) -> Option<String> {
        let mut reasons = Vec::new();

        if check_protocol && self.protocol_version != other.protocol_version {
            reasons.push(format!(
                "protocol version mismatch: local={}, peer={}",
                self.protocol_version, other.protocol_version
            ));
        }
        if check_client && self.syft_client_version != other.syft_client_version {
            reasons.push(format!(
                "client version mismatch: local={}, peer={}",
                self.syft_client_version, other.syft_client_version
            ));
        }

        if reasons.is_empty() {
            None
        } else {
            Some(reasons.join("; "))
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
#[path = "version_tests.rs"]
mod tests;
