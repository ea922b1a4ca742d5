//! Configuration management for schema evolution
//!
//! Supports loading configuration from:
//! - Default values
//! - Config file (evolution.toml)
//! - Environment variables (EVOLUTION__*)
//!
//! ## Example config file (evolution.toml):
//! ```toml
//! [bridge]
//! legacy_timestamp_mapping = false
//! root_record_name = "event"
//! validate_with_avro = true
//!
//! [snapshot]
//! verify_checksums = true
//! output_format = "compact"
//! ```

use config_crate::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::Result;

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EvolutionConfig {
    /// Schema conversion settings
    #[serde(default)]
    pub bridge: BridgeSettings,

    /// Snapshot persistence settings
    #[serde(default)]
    pub snapshot: SnapshotSettings,
}

/// Schema conversion settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeSettings {
    /// Map every Avro timestamp to a local timestamp and refuse zoned
    /// timestamps on export
    #[serde(default = "default_true")]
    pub legacy_timestamp_mapping: bool,

    /// Record name used when exporting a logical type
    #[serde(default = "default_root_record_name")]
    pub root_record_name: String,

    /// Cross-check parsed and emitted documents with apache-avro
    #[serde(default = "default_true")]
    pub validate_with_avro: bool,
}

/// Snapshot persistence settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotSettings {
    /// Reject persisted snapshots whose checksum does not match
    #[serde(default = "default_true")]
    pub verify_checksums: bool,

    /// Output format (pretty or compact)
    #[serde(default)]
    pub output_format: OutputFormat,
}

/// Output format for JSON
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Pretty,
    Compact,
}

fn default_true() -> bool {
    true
}

fn default_root_record_name() -> String {
    "record".to_string()
}

impl Default for BridgeSettings {
    fn default() -> Self {
        Self {
            legacy_timestamp_mapping: true,
            root_record_name: default_root_record_name(),
            validate_with_avro: true,
        }
    }
}

impl Default for SnapshotSettings {
    fn default() -> Self {
        Self {
            verify_checksums: true,
            output_format: OutputFormat::Pretty,
        }
    }
}

impl EvolutionConfig {
    /// Load configuration from default locations
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration, layering an explicit file over the default locations
    pub fn load_from(config_path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();

        for location in ["evolution.toml", ".evolution.toml", "config/evolution.toml"] {
            builder = builder.add_source(File::with_name(location).required(false));
        }

        if let Some(dirs) = directories::ProjectDirs::from("dev", "familiar", "evolution") {
            let xdg_config = dirs.config_dir().join("evolution.toml");
            if xdg_config.exists() {
                builder = builder.add_source(File::from(xdg_config).required(false));
            }
        }

        if let Some(path) = config_path {
            builder = builder.add_source(File::from(path).required(true));
        }

        // EVOLUTION__BRIDGE__ROOT_RECORD_NAME=event
        builder = builder.add_source(
            Environment::with_prefix("EVOLUTION")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        Ok(builder.build()?.try_deserialize()?)
    }

    /// Save configuration to a file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
