// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Compressed message envelope
//!
//! Every durable object is a gzip'd tar with a single member holding the
//! canonical JSON serialization of the model. The tar layer exists for
//! debuggability: any archive tool can crack a message open.

use crate::checkpoint::{Checkpoint, IncrementalCheckpoint};
use crate::event::AcceptedEventsMessage;
use crate::proposal::ProposedChangeMessage;
use crate::rolling::RollingState;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::io::Read;
use thiserror::Error;

/// The single tar member inside every envelope.
pub const ENVELOPE_MEMBER: &str = "message.json";

/// Errors from packing or unpacking an envelope
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid base64 content: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("envelope has no {ENVELOPE_MEMBER} member")]
    MissingMember,
}

/// Pack canonical JSON bytes into a single-member gzip'd tar.
pub fn compress(json: &[u8]) -> Result<Vec<u8>, CodecError> {
    let encoder = GzEncoder::new(Vec::new(), Compression::default());
    let mut builder = tar::Builder::new(encoder);

    let mut header = tar::Header::new_gnu();
    header.set_size(json.len() as u64);
    header.set_mode(0o644);
    builder.append_data(&mut header, ENVELOPE_MEMBER, json)?;

    let encoder = builder.into_inner()?;
    Ok(encoder.finish()?)
}

/// Unpack an envelope back to its JSON bytes.
pub fn uncompress(data: &[u8]) -> Result<Vec<u8>, CodecError> {
    let mut archive = tar::Archive::new(GzDecoder::new(data));
    for entry in archive.entries()? {
        let mut entry = entry?;
        let is_member = entry.path()?.to_str() == Some(ENVELOPE_MEMBER);
        if is_member {
            let mut json = Vec::new();
            entry.read_to_end(&mut json)?;
            return Ok(json);
        }
    }
    Err(CodecError::MissingMember)
}

/// Self-describing compressed serialization, implemented by every message
/// type that lives on the backend.
pub trait Envelope: Serialize + DeserializeOwned {
    fn to_compressed(&self) -> Result<Vec<u8>, CodecError> {
        compress(&serde_json::to_vec(self)?)
    }

    fn from_compressed(data: &[u8]) -> Result<Self, CodecError> {
        Ok(serde_json::from_slice(&uncompress(data)?)?)
    }
}

impl Envelope for ProposedChangeMessage {}
impl Envelope for AcceptedEventsMessage {}
impl Envelope for Checkpoint {}
impl Envelope for IncrementalCheckpoint {}
impl Envelope for RollingState {}

#[cfg(test)]
#[path = "envelope_tests.rs"]
mod tests;
