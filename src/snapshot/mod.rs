//! Serializer snapshots
//!
//! A [`SnapshotEnvelope`] records what an encoder looked like when state was
//! written: its kind, the kind-local format version, its configuration, and
//! the envelopes of the encoders it owns, in the order it rebuilds them.
//! Envelopes are immutable once built; evolution produces new envelopes.
//!
//! ## Persisted layout
//!
//! ```text
//! {
//!   "layout_version": 1,
//!   "written_at": "2026-01-01T00:00:00Z",
//!   "checksum": "<sha256 of envelope>",
//!   "envelope": {
//!     "encoder_id": "row",
//!     "format_version": 1,
//!     "config": { "field_names": ["name", "age"] },
//!     "nested": [ { "encoder_id": "string", ... }, { "encoder_id": "int", ... } ]
//!   }
//! }
//! ```
//!
//! Encoder ids are plain strings, so a snapshot of a kind this program does
//! not know can still be read and compared (it resolves as incompatible).

pub mod encoder;

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::checksum::Checksum;
use crate::config::OutputFormat;
use crate::error::{Result, SchemaError};

pub use encoder::{ConfigCompatibility, CustomEncoder, Encoder, EncoderFactory};

/// Newest persisted layout this program reads and the one it writes
pub const LAYOUT_VERSION: u32 = 1;

// =============================================================================
// Encoder configuration
// =============================================================================

/// Structured, ordered encoder configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EncoderConfig(BTreeMap<String, Value>);

impl EncoderConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of this config with `key` set
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn get_u32(&self, key: &str) -> Option<u32> {
        self.0
            .get(key)
            .and_then(Value::as_u64)
            .and_then(|v| u32::try_from(v).ok())
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.0.get(key).and_then(Value::as_bool)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    pub fn get_strings(&self, key: &str) -> Option<Vec<String>> {
        self.0
            .get(key)
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(|v| v.as_str().map(String::from)).collect())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

// =============================================================================
// Envelope
// =============================================================================

/// Versioned description of one encoder and its nested encoders
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotEnvelope {
    encoder_id: String,
    format_version: u32,
    #[serde(default, skip_serializing_if = "EncoderConfig::is_empty")]
    config: EncoderConfig,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    nested: Vec<SnapshotEnvelope>,
}

impl SnapshotEnvelope {
    pub fn new(
        encoder_id: impl Into<String>,
        format_version: u32,
        config: EncoderConfig,
        nested: Vec<SnapshotEnvelope>,
    ) -> Self {
        Self {
            encoder_id: encoder_id.into(),
            format_version,
            config,
            nested,
        }
    }

    pub fn encoder_id(&self) -> &str {
        &self.encoder_id
    }

    pub fn format_version(&self) -> u32 {
        self.format_version
    }

    pub fn config(&self) -> &EncoderConfig {
        &self.config
    }

    /// Nested envelopes in the owning encoder's reconstruction order
    pub fn nested(&self) -> &[SnapshotEnvelope] {
        &self.nested
    }

    /// Wrap for persistence
    pub fn persist(&self) -> Result<PersistedSnapshot> {
        PersistedSnapshot::new(self.clone())
    }
}

// =============================================================================
// Persisted form
// =============================================================================

/// An envelope as stored by the checkpoint layer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedSnapshot {
    pub layout_version: u32,
    pub written_at: DateTime<Utc>,
    pub checksum: Checksum,
    pub envelope: SnapshotEnvelope,
}

impl PersistedSnapshot {
    pub fn new(envelope: SnapshotEnvelope) -> Result<Self> {
        let checksum = Checksum::of_envelope(&envelope)?;
        Ok(Self {
            layout_version: LAYOUT_VERSION,
            written_at: Utc::now(),
            checksum,
            envelope,
        })
    }

    pub fn to_bytes(&self, format: OutputFormat) -> Result<Vec<u8>> {
        Ok(match format {
            OutputFormat::Pretty => serde_json::to_vec_pretty(self)?,
            OutputFormat::Compact => serde_json::to_vec(self)?,
        })
    }

    /// Decode persisted bytes. The layout version is checked before the rest
    /// of the document is interpreted.
    pub fn from_bytes(bytes: &[u8], verify_checksum: bool) -> Result<Self> {
        let raw: Value = serde_json::from_slice(bytes)?;
        let found = raw
            .get("layout_version")
            .and_then(Value::as_u64)
            .ok_or_else(|| SchemaError::Parse("snapshot missing 'layout_version'".into()))?;
        if found > u64::from(LAYOUT_VERSION) {
            return Err(SchemaError::UnsupportedLayoutVersion {
                found: u32::try_from(found).unwrap_or(u32::MAX),
                supported: LAYOUT_VERSION,
            });
        }

        let snapshot: PersistedSnapshot = serde_json::from_value(raw)?;
        if verify_checksum {
            snapshot.checksum.verify_envelope(&snapshot.envelope)?;
        }
        debug!(
            encoder = snapshot.envelope.encoder_id(),
            written_at = %snapshot.written_at,
            "read persisted snapshot"
        );
        Ok(snapshot)
    }

    pub fn write_to(&self, path: impl AsRef<Path>, format: OutputFormat) -> Result<()> {
        fs::write(path, self.to_bytes(format)?)?;
        Ok(())
    }

    pub fn read_from(path: impl AsRef<Path>, verify_checksum: bool) -> Result<Self> {
        let bytes = fs::read(path)?;
        Self::from_bytes(&bytes, verify_checksum)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row_envelope() -> SnapshotEnvelope {
        SnapshotEnvelope::new(
            "row",
            1,
            EncoderConfig::new().with("field_names", vec!["name", "age"]),
            vec![
                SnapshotEnvelope::new("string", 1, EncoderConfig::new(), Vec::new()),
                SnapshotEnvelope::new("int", 1, EncoderConfig::new(), Vec::new()),
            ],
        )
    }

    #[test]
    fn test_config_accessors() {
        let config = EncoderConfig::new()
            .with("precision", 10u32)
            .with("zoned", true)
            .with("type_name", "union<int,string>")
            .with("field_names", vec!["a", "b"]);
        assert_eq!(config.get_u32("precision"), Some(10));
        assert_eq!(config.get_bool("zoned"), Some(true));
        assert_eq!(config.get_str("type_name"), Some("union<int,string>"));
        assert_eq!(config.get_strings("field_names"), Some(vec!["a".to_string(), "b".to_string()]));
        assert_eq!(config.get_u32("missing"), None);
    }

    #[test]
    fn test_persisted_bytes_read_back() {
        let persisted = row_envelope().persist().unwrap();
        let bytes = persisted.to_bytes(OutputFormat::Compact).unwrap();
        let read = PersistedSnapshot::from_bytes(&bytes, true).unwrap();
        assert_eq!(read.envelope, row_envelope());
        assert_eq!(read.envelope.nested().len(), 2);
    }

    #[test]
    fn test_tampered_snapshot_fails_checksum() {
        let persisted = row_envelope().persist().unwrap();
        let text = String::from_utf8(persisted.to_bytes(OutputFormat::Compact).unwrap()).unwrap();
        let tampered = text.replace("\"age\"", "\"years\"");

        let err = PersistedSnapshot::from_bytes(tampered.as_bytes(), true).unwrap_err();
        assert!(matches!(err, SchemaError::ChecksumMismatch { .. }));
        assert!(PersistedSnapshot::from_bytes(tampered.as_bytes(), false).is_ok());
    }

    #[test]
    fn test_future_layout_rejected() {
        let persisted = row_envelope().persist().unwrap();
        let mut value = serde_json::to_value(&persisted).unwrap();
        value["layout_version"] = serde_json::json!(LAYOUT_VERSION + 1);
        value["envelope"]["shape_from_the_future"] = serde_json::json!({"x": 1});
        let bytes = serde_json::to_vec(&value).unwrap();

        let err = PersistedSnapshot::from_bytes(&bytes, true).unwrap_err();
        assert!(matches!(
            err,
            SchemaError::UnsupportedLayoutVersion { found, supported } if found == LAYOUT_VERSION + 1 && supported == LAYOUT_VERSION
        ));
    }

    #[test]
    fn test_write_and_read_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("encoder.snapshot.json");
        row_envelope().persist().unwrap().write_to(&path, OutputFormat::Pretty).unwrap();
        let read = PersistedSnapshot::read_from(&path, true).unwrap();
        assert_eq!(read.envelope, row_envelope());
    }
}
