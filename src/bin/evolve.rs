//! Schema Evolution CLI
//!
//! Converts Avro schemas to logical types and back, snapshots the encoder
//! for a schema, and checks a stored snapshot against an evolved schema.
//!
//! Usage:
//!   schema-evolve logical user.avsc
//!   schema-evolve export user.logical.json --name user
//!   schema-evolve snapshot user.avsc -o user.snapshot.json
//!   schema-evolve check user.snapshot.json user-v2.avsc

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use familiar_evolution::{
    CompatibilityResolver, CompatibilityVerdict, Encoder, EncoderFactory, EvolutionConfig, LogicalType,
    PersistedSnapshot, SchemaBridge,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "schema-evolve")]
#[command(about = "Convert Avro schemas and check encoder snapshot compatibility")]
struct Cli {
    /// Configuration file (layered over evolution.toml and EVOLUTION__*)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Distinguish zoned and local timestamps
    #[arg(long)]
    modern_timestamps: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the logical type of an Avro schema
    Logical {
        /// Avro schema file
        schema: PathBuf,

        /// Print the logical type as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the Avro schema of a logical type given as JSON
    Export {
        /// Logical type file (JSON)
        logical: PathBuf,

        /// Root record name
        #[arg(short, long)]
        name: Option<String>,
    },

    /// Persist the encoder snapshot for an Avro schema
    Snapshot {
        /// Avro schema file
        schema: PathBuf,

        /// Output file
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Check a stored snapshot against the encoder for an Avro schema
    Check {
        /// Snapshot file
        snapshot: PathBuf,

        /// Avro schema file
        schema: PathBuf,

        /// Treat required migrations as incompatible
        #[arg(long)]
        strict: bool,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(true) => {}
        Ok(false) => std::process::exit(2),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Returns false when a checked snapshot is incompatible
fn run(cli: Cli) -> anyhow::Result<bool> {
    let mut config = EvolutionConfig::load_from(cli.config.as_deref()).context("loading configuration")?;
    if cli.modern_timestamps {
        config.bridge.legacy_timestamp_mapping = false;
    }
    let bridge = SchemaBridge::new(config.bridge.clone());

    match cli.command {
        Commands::Logical { schema, json } => {
            let logical = bridge.ingest(&read(&schema)?)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&logical)?);
            } else {
                println!("{}", logical);
            }
        }

        Commands::Export { logical: path, name } => {
            let logical: LogicalType = serde_json::from_str(&read(&path)?)
                .with_context(|| format!("parsing logical type {:?}", path))?;
            let name = name.unwrap_or_else(|| config.bridge.root_record_name.clone());
            let schema = bridge.to_external(&logical, &name)?;
            if config.bridge.validate_with_avro {
                schema.to_avro()?;
            }
            println!("{}", schema.to_json_pretty()?);
        }

        Commands::Snapshot { schema, output } => {
            let encoder = Encoder::for_logical(&bridge.ingest(&read(&schema)?)?);
            let persisted = encoder.snapshot().persist()?;
            persisted.write_to(&output, config.snapshot.output_format)?;
            println!("✅ Wrote {} snapshot to {:?}", encoder.encoder_id(), output);
            println!("  Checksum: {}", persisted.checksum);
        }

        Commands::Check { snapshot, schema, strict } => {
            let persisted = PersistedSnapshot::read_from(&snapshot, config.snapshot.verify_checksums)
                .with_context(|| format!("reading snapshot {:?}", snapshot))?;
            let encoder = Encoder::for_logical(&bridge.ingest(&read(&schema)?)?);
            let resolver = if strict {
                CompatibilityResolver::strict()
            } else {
                CompatibilityResolver::new()
            };

            println!("🔍 Checking snapshot written {}", persisted.written_at);
            match resolver.resolve(&persisted.envelope, &encoder) {
                CompatibilityVerdict::CompatibleAsIs => println!("✅ Compatible as is"),
                CompatibilityVerdict::CompatibleAfterMigration(migrated) => {
                    println!("⚠️  Compatible after migration");
                    println!("{}", serde_json::to_string_pretty(&migrated.snapshot())?);
                }
                CompatibilityVerdict::Incompatible(incompatibility) => {
                    println!("❌ Incompatible at {}", incompatibility.path);
                    println!("  {}", incompatibility.reason);
                    return Ok(false);
                }
            }
        }
    }

    Ok(true)
}

fn read(path: &Path) -> anyhow::Result<String> {
    if !path.exists() {
        bail!("file not found: {:?}", path);
    }
    fs::read_to_string(path).with_context(|| format!("reading {:?}", path))
}
