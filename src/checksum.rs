//! Checksum utilities for persisted snapshot integrity

use sha2::{Digest, Sha256};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Result, SchemaError};
use crate::snapshot::SnapshotEnvelope;

/// SHA256 checksum over an envelope's canonical JSON encoding
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Checksum(String);

impl Checksum {
    /// Compute checksum from raw bytes
    pub fn from_bytes(data: &[u8]) -> Self {
        let hash = Sha256::digest(data);
        Self(format!("{:x}", hash))
    }

    /// Compute checksum of an envelope.
    ///
    /// Config maps are ordered, so the compact JSON encoding is canonical.
    pub fn of_envelope(envelope: &SnapshotEnvelope) -> Result<Self> {
        let canonical = serde_json::to_vec(envelope)?;
        Ok(Self::from_bytes(&canonical))
    }

    /// Get the hex string representation
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Verify that an envelope matches this checksum
    pub fn verify_envelope(&self, envelope: &SnapshotEnvelope) -> Result<()> {
        let actual = Self::of_envelope(envelope)?;
        if actual == *self {
            Ok(())
        } else {
            Err(SchemaError::ChecksumMismatch {
                expected: self.to_string(),
                actual: actual.to_string(),
            })
        }
    }
}

impl fmt::Display for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for Checksum {
    fn from(s: String) -> Self {
        Self(s)
    }
}
