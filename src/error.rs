//! Error types for schema bridging and snapshot compatibility

use thiserror::Error;

/// Result type for evolution operations
pub type Result<T> = std::result::Result<T, SchemaError>;

/// Schema evolution errors
#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("Could not parse schema: {0}")]
    Parse(String),

    #[error("Unsupported type {category}: {detail}")]
    UnsupportedType { category: String, detail: String },

    #[error("Avro does not support {type_name} type with precision: {requested}, it only supports precision up to {max}")]
    PrecisionRange {
        type_name: String,
        requested: u32,
        max: u32,
    },

    #[error("Incompatible schema at {path}: {reason}")]
    IncompatibleSchema { path: String, reason: String },

    #[error("Invalid logical type: {0}")]
    InvalidType(String),

    #[error("Checksum mismatch: expected {expected}, got {actual}")]
    ChecksumMismatch { expected: String, actual: String },

    #[error("Unsupported snapshot layout version {found}, newest readable is {supported}")]
    UnsupportedLayoutVersion { found: u32, supported: u32 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Avro error: {0}")]
    Avro(#[from] apache_avro::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config_crate::ConfigError),
}

impl SchemaError {
    pub(crate) fn unsupported(category: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::UnsupportedType {
            category: category.into(),
            detail: detail.into(),
        }
    }
}
