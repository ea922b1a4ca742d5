//! Familiar Schema Evolution
//!
//! Converts external (Avro) record schemas to and from a logical type model,
//! and decides whether encoder state persisted by an older program version can
//! be restored by the current one.
//!
//! ## Features
//!
//! - **Schema Bridge**: Avro schema ⇄ logical type, with nullable unions,
//!   decimals, timestamp variants and structurally unique record names
//! - **Runtime Descriptors**: the runtime identity that selects an encoder
//! - **Snapshots**: versioned, checksummed encoder snapshots with nested
//!   encoder snapshots in reconstruction order
//! - **Compatibility Resolution**: one combined verdict over arbitrarily
//!   nested encoders, with a migrated encoder when re-encoding is needed
//!
//! ## Architecture
//!
//! ```text
//!  schema.avsc ──SchemaBridge──▶ LogicalType ──▶ TypeDescriptor ──▶ Encoder
//!                                                                    │
//!                                         snapshot() at checkpoint   ▼
//!  restore: CompatibilityResolver(old SnapshotEnvelope, Encoder) ◀── SnapshotEnvelope
//! ```

pub mod bridge;
pub mod checksum;
pub mod compatibility;
pub mod config;
pub mod descriptor;
pub mod error;
pub mod logical;
pub mod schema;
pub mod snapshot;

pub use bridge::SchemaBridge;
pub use checksum::Checksum;
pub use compatibility::{CompatibilityResolver, CompatibilityVerdict, Incompatibility, NestedPath};
pub use config::{BridgeSettings, EvolutionConfig, OutputFormat, SnapshotSettings};
pub use descriptor::TypeDescriptor;
pub use error::{Result, SchemaError};
pub use logical::{IntWidth, LogicalType, RowField, TypeRoot};
pub use schema::{Annotation, ExternalSchema, Name, RecordBuilder, RecordField, RecordSchema};
pub use snapshot::{
    ConfigCompatibility, CustomEncoder, Encoder, EncoderConfig, EncoderFactory, PersistedSnapshot, SnapshotEnvelope,
};
