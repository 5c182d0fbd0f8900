//! Content fingerprints for conditional responses.
//!
//! A fingerprint is a strong ETag: the SHA-256 of a canonical JSON
//! rendering, base64url encoded without padding and wrapped in quotes.
//!
//! Payloads are fingerprinted through [`Fingerprinted`], which borrows the
//! payload's content without its `generatedAt` timestamp and tags it with
//! the payload type. Boards are also tagged with the call that produced
//! them. Two snapshots that differ only in when they were generated share a
//! fingerprint; the same fields in two different payload types do not.

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::darwin::{
    BoardContent, BoardShape, DeparturesBoard, DeparturesContent, DeparturesShape,
    ServiceDetails, ServiceDetailsContent, StationBoard,
};
use crate::delays::{DelaysResponse, DelaysSummary};

/// Error returned when a payload cannot be rendered for hashing.
#[derive(Debug, thiserror::Error)]
#[error("failed to serialize payload for fingerprint: {0}")]
pub struct ChecksumError(#[from] serde_json::Error);

/// The hashed view of a payload, tagged with its type.
#[derive(Debug, Clone, Copy, Serialize)]
pub enum Fingerprinted<'a> {
    StationBoard {
        shape: BoardShape,
        board: &'a BoardContent,
    },
    Departures {
        shape: DeparturesShape,
        board: &'a DeparturesContent,
    },
    ServiceDetails(&'a ServiceDetailsContent),
    Delays(&'a DelaysSummary),
}

/// A payload with a stable content fingerprint.
pub trait Fingerprint {
    fn fingerprinted(&self) -> Fingerprinted<'_>;

    /// Quoted ETag for this payload.
    fn fingerprint(&self) -> Result<String, ChecksumError> {
        let bytes = serde_json::to_vec(&self.fingerprinted())?;
        Ok(etag_for_bytes(&bytes))
    }
}

impl Fingerprint for StationBoard {
    fn fingerprinted(&self) -> Fingerprinted<'_> {
        Fingerprinted::StationBoard {
            shape: self.shape,
            board: &self.content,
        }
    }
}

impl Fingerprint for DeparturesBoard {
    fn fingerprinted(&self) -> Fingerprinted<'_> {
        Fingerprinted::Departures {
            shape: self.shape,
            board: &self.content,
        }
    }
}

impl Fingerprint for ServiceDetails {
    fn fingerprinted(&self) -> Fingerprinted<'_> {
        Fingerprinted::ServiceDetails(&self.content)
    }
}

impl Fingerprint for DelaysResponse {
    fn fingerprinted(&self) -> Fingerprinted<'_> {
        Fingerprinted::Delays(&self.summary)
    }
}

/// Quoted, base64url SHA-256 of raw bytes.
pub fn etag_for_bytes(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    format!("\"{}\"", URL_SAFE_NO_PAD.encode(digest))
}
