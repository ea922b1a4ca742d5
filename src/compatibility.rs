//! Compatibility resolution between a restored snapshot and the current encoder
//!
//! The resolver walks the old [`SnapshotEnvelope`] tree alongside the encoder
//! the current program would build, and folds every local decision into one
//! [`CompatibilityVerdict`]. Verdicts are ordered
//! `CompatibleAsIs < CompatibleAfterMigration < Incompatible` and combine by
//! taking the maximum; the first incompatibility found wins.

use std::fmt;

use tracing::{debug, trace};

use crate::error::{Result, SchemaError};
use crate::snapshot::{ConfigCompatibility, Encoder, EncoderFactory, SnapshotEnvelope};

/// Position of a failing envelope, as nested indices from the root
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NestedPath(Vec<usize>);

impl NestedPath {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn indices(&self) -> &[usize] {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    fn under(mut self, index: usize) -> Self {
        self.0.insert(0, index);
        self
    }
}

impl fmt::Display for NestedPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return write!(f, "own-config");
        }
        let segments: Vec<String> = self.0.iter().map(|i| format!("nested[{}]", i)).collect();
        write!(f, "{}", segments.join("."))
    }
}

/// Why a snapshot cannot be restored, and where
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Incompatibility {
    pub path: NestedPath,
    pub reason: String,
}

impl Incompatibility {
    fn at_root(reason: impl Into<String>) -> Self {
        Self {
            path: NestedPath::root(),
            reason: reason.into(),
        }
    }
}

/// Outcome of comparing a restored snapshot with the current encoder
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompatibilityVerdict {
    /// Old state can be read verbatim
    CompatibleAsIs,
    /// Old state must be re-encoded with the carried encoder
    CompatibleAfterMigration(Encoder),
    /// Restore is forbidden
    Incompatible(Incompatibility),
}

impl CompatibilityVerdict {
    fn incompatible(reason: impl Into<String>) -> Self {
        CompatibilityVerdict::Incompatible(Incompatibility::at_root(reason))
    }

    fn rank(&self) -> u8 {
        match self {
            CompatibilityVerdict::CompatibleAsIs => 0,
            CompatibilityVerdict::CompatibleAfterMigration(_) => 1,
            CompatibilityVerdict::Incompatible(_) => 2,
        }
    }

    /// Maximum of two verdicts; ties keep `self`
    pub fn combine(self, other: CompatibilityVerdict) -> CompatibilityVerdict {
        if other.rank() > self.rank() {
            other
        } else {
            self
        }
    }

    pub fn is_compatible_as_is(&self) -> bool {
        matches!(self, CompatibilityVerdict::CompatibleAsIs)
    }

    pub fn requires_migration(&self) -> bool {
        matches!(self, CompatibilityVerdict::CompatibleAfterMigration(_))
    }

    pub fn is_incompatible(&self) -> bool {
        matches!(self, CompatibilityVerdict::Incompatible(_))
    }

    /// The migrated encoder, if migration is required, or the
    /// incompatibility as an error
    pub fn into_result(self) -> Result<Option<Encoder>> {
        match self {
            CompatibilityVerdict::CompatibleAsIs => Ok(None),
            CompatibilityVerdict::CompatibleAfterMigration(encoder) => Ok(Some(encoder)),
            CompatibilityVerdict::Incompatible(Incompatibility { path, reason }) => {
                Err(SchemaError::IncompatibleSchema {
                    path: path.to_string(),
                    reason,
                })
            }
        }
    }

    fn nested_under(self, index: usize) -> Self {
        match self {
            CompatibilityVerdict::Incompatible(Incompatibility { path, reason }) => {
                CompatibilityVerdict::Incompatible(Incompatibility {
                    path: path.under(index),
                    reason,
                })
            }
            other => other,
        }
    }
}

impl fmt::Display for CompatibilityVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompatibilityVerdict::CompatibleAsIs => write!(f, "compatible as is"),
            CompatibilityVerdict::CompatibleAfterMigration(encoder) => {
                write!(f, "compatible after migration to {}", encoder.encoder_id())
            }
            CompatibilityVerdict::Incompatible(Incompatibility { path, reason }) => {
                write!(f, "incompatible at {}: {}", path, reason)
            }
        }
    }
}

/// Resolves restored snapshots against current encoders
#[derive(Debug, Clone, Default)]
pub struct CompatibilityResolver {
    /// Treat any required migration as incompatible
    strict: bool,
}

impl CompatibilityResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolver that refuses migrations
    pub fn strict() -> Self {
        Self { strict: true }
    }

    /// Compare `previous` with what `current` builds.
    ///
    /// The previous envelope is only read. In strict mode a verdict that
    /// would require migration is reported as incompatible.
    pub fn resolve(&self, previous: &SnapshotEnvelope, current: &dyn EncoderFactory) -> CompatibilityVerdict {
        let verdict = resolve_envelope(previous, current);
        debug!(
            encoder = current.encoder_id(),
            previous = previous.encoder_id(),
            verdict = %verdict,
            "resolved snapshot compatibility"
        );
        match verdict {
            CompatibilityVerdict::CompatibleAfterMigration(_) if self.strict => {
                CompatibilityVerdict::incompatible("migration required but resolver is strict")
            }
            other => other,
        }
    }

    /// Resolve and convert the verdict with [`CompatibilityVerdict::into_result`]
    pub fn check(&self, previous: &SnapshotEnvelope, current: &dyn EncoderFactory) -> Result<Option<Encoder>> {
        self.resolve(previous, current).into_result()
    }
}

fn resolve_envelope(previous: &SnapshotEnvelope, current: &dyn EncoderFactory) -> CompatibilityVerdict {
    match current.readable_version(previous.encoder_id()) {
        Some(readable) if previous.format_version() > readable => {
            return CompatibilityVerdict::incompatible(format!(
                "future format version {} of {} (understands up to {})",
                previous.format_version(),
                previous.encoder_id(),
                readable
            ));
        }
        // unknown kinds fall through to the config check, which rejects them
        _ => {}
    }

    let own = match current.resolve_config(previous) {
        ConfigCompatibility::Incompatible(reason) => return CompatibilityVerdict::incompatible(reason),
        ConfigCompatibility::CompatibleAsIs => false,
        ConfigCompatibility::CompatibleAfterMigration => true,
    };
    trace!(encoder = current.encoder_id(), migrate = own, "own config resolved");

    let nested = current.nested();
    if nested.len() != previous.nested().len() {
        return CompatibilityVerdict::incompatible(format!(
            "nested arity mismatch: snapshot has {}, {} encoder has {}",
            previous.nested().len(),
            current.encoder_id(),
            nested.len()
        ));
    }

    let mut needs_migration = own;
    let mut migrated = Vec::with_capacity(nested.len());
    for (index, (old, new)) in previous.nested().iter().zip(nested).enumerate() {
        match resolve_envelope(old, &new).nested_under(index) {
            CompatibilityVerdict::Incompatible(incompatibility) => {
                return CompatibilityVerdict::Incompatible(incompatibility);
            }
            CompatibilityVerdict::CompatibleAfterMigration(encoder) => {
                needs_migration = true;
                migrated.push(encoder);
            }
            CompatibilityVerdict::CompatibleAsIs => migrated.push(new),
        }
    }

    if !needs_migration {
        return CompatibilityVerdict::CompatibleAsIs;
    }
    match current.with_nested(migrated) {
        Ok(encoder) => CompatibilityVerdict::CompatibleAfterMigration(encoder),
        Err(err) => CompatibilityVerdict::incompatible(format!("cannot assemble migrated encoder: {}", err)),
    }
}
