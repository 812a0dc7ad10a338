// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Peer model
//!
//! State transitions are one-way: `pending` becomes `accepted` or
//! `rejected` and never moves again. `outstanding` is the scientist's view
//! of their own outgoing request.

use crate::version::VersionInfo;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PeerState {
    Accepted,
    Pending,
    Rejected,
    Outstanding,
}

/// A synchronization counterpart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Peer {
    pub email: String,
    pub state: PeerState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<VersionInfo>,
}

impl Peer {
    pub fn new(email: impl Into<String>, state: PeerState) -> Self {
        Self { email: email.into(), state, version: None }
    }

    pub fn accepted(email: impl Into<String>) -> Self {
        Self::new(email, PeerState::Accepted)
    }

    pub fn pending(email: impl Into<String>) -> Self {
        Self::new(email, PeerState::Pending)
    }

    pub fn outstanding(email: impl Into<String>) -> Self {
        Self::new(email, PeerState::Outstanding)
    }

    pub fn is_approved(&self) -> bool {
        self.state == PeerState::Accepted
    }

    pub fn is_pending(&self) -> bool {
        self.state == PeerState::Pending
    }

    pub fn is_outstanding(&self) -> bool {
        self.state == PeerState::Outstanding
    }
}

#[cfg(test)]
#[path = "peer_tests.rs"]
mod tests;
