//! Encoders and the factory capability used for compatibility resolution
//!
//! [`Encoder`] is the closed set of built-in encoders selected from a
//! [`TypeDescriptor`]. Composite encoders own nested encoders in a fixed
//! order, which is also the order of their snapshot's nested envelopes:
//!
//! | encoder    | nested encoders             |
//! |------------|-----------------------------|
//! | `array`    | `[element]`                 |
//! | `map`      | `[key, value]`              |
//! | `row`      | fields in declaration order |
//! | `nullable` | `[inner]`                   |
//! | `either`   | `[left, right]`             |
//!
//! [`EncoderFactory`] is the seam the resolver works against; it is
//! implemented for [`Encoder`] and may be implemented for other kinds.
//! [`Encoder::custom`] wraps such a factory so it can be nested inside
//! built-in encoders and carried by a migration verdict.

use std::fmt;
use std::sync::Arc;

use crate::descriptor::TypeDescriptor;
use crate::error::{Result, SchemaError};
use crate::logical::LogicalType;
use crate::snapshot::{EncoderConfig, SnapshotEnvelope};

/// Verdict on an encoder's own configuration, ignoring nested encoders
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigCompatibility {
    CompatibleAsIs,
    CompatibleAfterMigration,
    Incompatible(String),
}

/// Capability to describe, snapshot and rebuild an encoder
pub trait EncoderFactory: fmt::Debug + Send + Sync {
    /// Identifier persisted in snapshots
    fn encoder_id(&self) -> &str;

    /// Current format version of this encoder kind
    fn format_version(&self) -> u32;

    /// Newest format version this encoder can interpret for snapshots of
    /// `encoder_id`, or `None` when it knows nothing about that kind
    fn readable_version(&self, encoder_id: &str) -> Option<u32> {
        (encoder_id == self.encoder_id()).then(|| self.format_version())
    }

    /// Own configuration, excluding nested encoders
    fn config(&self) -> EncoderConfig;

    /// Freshly constructed nested encoders, in reconstruction order
    fn nested(&self) -> Vec<Encoder>;

    /// Compare a previous snapshot's own configuration with this encoder
    fn resolve_config(&self, previous: &SnapshotEnvelope) -> ConfigCompatibility;

    /// Build this encoder's shape around the given nested encoders
    fn with_nested(&self, nested: Vec<Encoder>) -> Result<Encoder>;

    fn snapshot(&self) -> SnapshotEnvelope {
        SnapshotEnvelope::new(
            self.encoder_id(),
            self.format_version(),
            self.config(),
            self.nested().iter().map(EncoderFactory::snapshot).collect(),
        )
    }
}

/// Built-in runtime encoders
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Encoder {
    Void,
    Boolean,
    Byte,
    Short,
    Int,
    Long,
    Float,
    Double,
    String,
    Bytes { length: Option<usize> },
    Decimal { precision: u32, scale: u32 },
    Date,
    Time { precision: u32 },
    Timestamp { precision: u32, zoned: bool },
    Array(Box<Encoder>),
    Map { key: Box<Encoder>, value: Box<Encoder> },
    Row { field_names: Vec<String>, fields: Vec<Encoder> },
    Nullable(Box<Encoder>),
    Either { left: Box<Encoder>, right: Box<Encoder> },
    Generic { type_name: String },
    Custom(CustomEncoder),
}

/// A user-supplied [`EncoderFactory`] held inside an [`Encoder`].
///
/// Two custom encoders are equal when their snapshots are equal.
#[derive(Clone)]
pub struct CustomEncoder(Arc<dyn EncoderFactory>);

impl CustomEncoder {
    pub fn factory(&self) -> &dyn EncoderFactory {
        self.0.as_ref()
    }
}

impl fmt::Debug for CustomEncoder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("CustomEncoder").field(&self.0).finish()
    }
}

impl PartialEq for CustomEncoder {
    fn eq(&self, other: &Self) -> bool {
        self.0.snapshot() == other.0.snapshot()
    }
}

impl Eq for CustomEncoder {}

/// Current format version of each built-in encoder kind
fn builtin_version(encoder_id: &str) -> Option<u32> {
    match encoder_id {
        // v1 recorded precision only; v2 adds scale
        "decimal" => Some(2),
        // v1 did not record the zone flag
        "timestamp" => Some(2),
        "void" | "boolean" | "byte" | "short" | "int" | "long" | "float" | "double" | "string"
        | "bytes" | "date" | "time" | "array" | "map" | "row" | "nullable" | "either" | "generic" => Some(1),
        _ => None,
    }
}

/// Widenings that can be applied by re-encoding
fn widens_from(current: &str, previous: &str) -> bool {
    matches!(
        (current, previous),
        ("short", "byte") | ("int", "byte" | "short") | ("long", "byte" | "short" | "int") | ("double", "float")
    )
}

impl Encoder {
    /// Select the encoder for a runtime descriptor
    pub fn for_descriptor(descriptor: &TypeDescriptor) -> Self {
        match descriptor {
            TypeDescriptor::Void => Encoder::Void,
            TypeDescriptor::Boolean => Encoder::Boolean,
            TypeDescriptor::Byte => Encoder::Byte,
            TypeDescriptor::Short => Encoder::Short,
            TypeDescriptor::Int => Encoder::Int,
            TypeDescriptor::Long => Encoder::Long,
            TypeDescriptor::Float => Encoder::Float,
            TypeDescriptor::Double => Encoder::Double,
            TypeDescriptor::String => Encoder::String,
            TypeDescriptor::PrimitiveBytes { length } => Encoder::Bytes { length: *length },
            TypeDescriptor::BigDecimal { precision, scale } => Encoder::Decimal {
                precision: *precision,
                scale: *scale,
            },
            TypeDescriptor::SqlDate => Encoder::Date,
            TypeDescriptor::SqlTime { precision } => Encoder::Time { precision: *precision },
            TypeDescriptor::SqlTimestamp { precision } => Encoder::Timestamp {
                precision: *precision,
                zoned: false,
            },
            TypeDescriptor::Instant { precision } => Encoder::Timestamp {
                precision: *precision,
                zoned: true,
            },
            TypeDescriptor::ObjectArray { element } => Encoder::Array(Box::new(Self::for_descriptor(element))),
            TypeDescriptor::Map { key, value } => Encoder::Map {
                key: Box::new(Self::for_descriptor(key)),
                value: Box::new(Self::for_descriptor(value)),
            },
            TypeDescriptor::Row { fields } => Encoder::Row {
                field_names: fields.iter().map(|(name, _)| name.clone()).collect(),
                fields: fields.iter().map(|(_, d)| Self::for_descriptor(d)).collect(),
            },
            TypeDescriptor::Nullable { inner } => Encoder::Nullable(Box::new(Self::for_descriptor(inner))),
            TypeDescriptor::Generic { type_name } => Encoder::Generic {
                type_name: type_name.clone(),
            },
        }
    }

    /// Select the encoder for a logical type
    pub fn for_logical(logical: &LogicalType) -> Self {
        Self::for_descriptor(&TypeDescriptor::of(logical))
    }

    pub fn row<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = (S, Encoder)>,
        S: Into<String>,
    {
        let (field_names, fields) = fields.into_iter().map(|(n, e)| (n.into(), e)).unzip();
        Encoder::Row { field_names, fields }
    }

    /// Wrap a factory that is not one of the built-in kinds
    pub fn custom(factory: impl EncoderFactory + 'static) -> Self {
        Encoder::Custom(CustomEncoder(Arc::new(factory)))
    }

    pub fn either(left: Encoder, right: Encoder) -> Self {
        Encoder::Either {
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    fn expect_arity(&self, nested: &[Encoder], expected: usize) -> Result<()> {
        if nested.len() == expected {
            Ok(())
        } else {
            Err(SchemaError::InvalidType(format!(
                "{} encoder takes {} nested encoders, got {}",
                self.encoder_id(),
                expected,
                nested.len()
            )))
        }
    }

    fn resolve_same_kind(&self, previous: &SnapshotEnvelope) -> ConfigCompatibility {
        let old = previous.config();
        match self {
            Encoder::Decimal { precision, scale } => {
                let Some(old_precision) = old.get_u32("precision") else {
                    return missing("precision");
                };
                let old_scale = if previous.format_version() < 2 {
                    0
                } else {
                    match old.get_u32("scale") {
                        Some(s) => s,
                        None => return missing("scale"),
                    }
                };
                if old_scale != *scale {
                    ConfigCompatibility::Incompatible(format!(
                        "decimal scale changed from {} to {}",
                        old_scale, scale
                    ))
                } else {
                    compare_precision("decimal", old_precision, *precision)
                }
            }
            Encoder::Time { precision } => match old.get_u32("precision") {
                Some(old_precision) => compare_precision("time", old_precision, *precision),
                None => missing("precision"),
            },
            Encoder::Timestamp { precision, zoned } => {
                let old_zoned = if previous.format_version() < 2 {
                    false
                } else {
                    match old.get_bool("zoned") {
                        Some(z) => z,
                        None => return missing("zoned"),
                    }
                };
                if old_zoned != *zoned {
                    return ConfigCompatibility::Incompatible(format!(
                        "timestamp zone flag changed from {} to {}",
                        old_zoned, zoned
                    ));
                }
                match old.get_u32("precision") {
                    Some(old_precision) => compare_precision("timestamp", old_precision, *precision),
                    None => missing("precision"),
                }
            }
            Encoder::Bytes { length } => {
                let old_length = old.get_u32("length").map(|l| l as usize);
                if old_length == *length {
                    ConfigCompatibility::CompatibleAsIs
                } else {
                    ConfigCompatibility::Incompatible(format!(
                        "binary length changed from {:?} to {:?}",
                        old_length, length
                    ))
                }
            }
            Encoder::Row { field_names, .. } => {
                let Some(old_names) = old.get_strings("field_names") else {
                    return missing("field_names");
                };
                // arity changes are reported by the nested comparison
                let renamed = old_names
                    .iter()
                    .zip(field_names)
                    .enumerate()
                    .find(|(_, (old_name, new_name))| old_name != new_name);
                match renamed {
                    Some((index, (old_name, new_name))) => ConfigCompatibility::Incompatible(format!(
                        "row field {} renamed from '{}' to '{}'",
                        index, old_name, new_name
                    )),
                    None => ConfigCompatibility::CompatibleAsIs,
                }
            }
            Encoder::Generic { type_name } => match old.get_str("type_name") {
                Some(old_name) if old_name == type_name => ConfigCompatibility::CompatibleAsIs,
                old_name => ConfigCompatibility::Incompatible(format!(
                    "generic type changed from {} to {}",
                    old_name.unwrap_or("<unknown>"),
                    type_name
                )),
            },
            _ => ConfigCompatibility::CompatibleAsIs,
        }
    }
}

fn missing(key: &str) -> ConfigCompatibility {
    ConfigCompatibility::Incompatible(format!("snapshot config is missing '{}'", key))
}

fn compare_precision(kind: &str, old: u32, new: u32) -> ConfigCompatibility {
    if old == new {
        ConfigCompatibility::CompatibleAsIs
    } else if new > old {
        ConfigCompatibility::CompatibleAfterMigration
    } else {
        ConfigCompatibility::Incompatible(format!(
            "{} precision narrowed from {} to {}",
            kind, old, new
        ))
    }
}

impl EncoderFactory for Encoder {
    fn encoder_id(&self) -> &str {
        match self {
            Encoder::Void => "void",
            Encoder::Boolean => "boolean",
            Encoder::Byte => "byte",
            Encoder::Short => "short",
            Encoder::Int => "int",
            Encoder::Long => "long",
            Encoder::Float => "float",
            Encoder::Double => "double",
            Encoder::String => "string",
            Encoder::Bytes { .. } => "bytes",
            Encoder::Decimal { .. } => "decimal",
            Encoder::Date => "date",
            Encoder::Time { .. } => "time",
            Encoder::Timestamp { .. } => "timestamp",
            Encoder::Array(_) => "array",
            Encoder::Map { .. } => "map",
            Encoder::Row { .. } => "row",
            Encoder::Nullable(_) => "nullable",
            Encoder::Either { .. } => "either",
            Encoder::Generic { .. } => "generic",
            Encoder::Custom(custom) => custom.factory().encoder_id(),
        }
    }

    fn format_version(&self) -> u32 {
        match self {
            Encoder::Custom(custom) => custom.factory().format_version(),
            _ => builtin_version(self.encoder_id()).unwrap_or(1),
        }
    }

    fn readable_version(&self, encoder_id: &str) -> Option<u32> {
        if let Encoder::Custom(custom) = self {
            custom.factory().readable_version(encoder_id)
        } else if encoder_id == self.encoder_id() || widens_from(self.encoder_id(), encoder_id) {
            builtin_version(encoder_id)
        } else {
            None
        }
    }

    fn config(&self) -> EncoderConfig {
        let config = EncoderConfig::new();
        match self {
            Encoder::Bytes { length: Some(length) } => config.with("length", *length as u64),
            Encoder::Decimal { precision, scale } => config.with("precision", *precision).with("scale", *scale),
            Encoder::Time { precision } => config.with("precision", *precision),
            Encoder::Timestamp { precision, zoned } => config.with("precision", *precision).with("zoned", *zoned),
            Encoder::Row { field_names, .. } => config.with("field_names", field_names.clone()),
            Encoder::Generic { type_name } => config.with("type_name", type_name.clone()),
            Encoder::Custom(custom) => custom.factory().config(),
            _ => config,
        }
    }

    fn nested(&self) -> Vec<Encoder> {
        match self {
            Encoder::Array(element) => vec![(**element).clone()],
            Encoder::Map { key, value } => vec![(**key).clone(), (**value).clone()],
            Encoder::Row { fields, .. } => fields.clone(),
            Encoder::Nullable(inner) => vec![(**inner).clone()],
            Encoder::Either { left, right } => vec![(**left).clone(), (**right).clone()],
            Encoder::Custom(custom) => custom.factory().nested(),
            _ => Vec::new(),
        }
    }

    fn resolve_config(&self, previous: &SnapshotEnvelope) -> ConfigCompatibility {
        let previous_id = previous.encoder_id();
        if let Encoder::Custom(custom) = self {
            custom.factory().resolve_config(previous)
        } else if previous_id == self.encoder_id() {
            self.resolve_same_kind(previous)
        } else if widens_from(self.encoder_id(), previous_id) {
            ConfigCompatibility::CompatibleAfterMigration
        } else {
            ConfigCompatibility::Incompatible(format!(
                "encoder changed from {} to {}",
                previous_id,
                self.encoder_id()
            ))
        }
    }

    fn with_nested(&self, nested: Vec<Encoder>) -> Result<Encoder> {
        match self {
            Encoder::Array(_) => {
                self.expect_arity(&nested, 1)?;
                let mut nested = nested.into_iter();
                Ok(Encoder::Array(Box::new(next_nested(&mut nested)?)))
            }
            Encoder::Map { .. } => {
                self.expect_arity(&nested, 2)?;
                let mut nested = nested.into_iter();
                let key = next_nested(&mut nested)?;
                let value = next_nested(&mut nested)?;
                Ok(Encoder::Map {
                    key: Box::new(key),
                    value: Box::new(value),
                })
            }
            Encoder::Row { field_names, .. } => {
                self.expect_arity(&nested, field_names.len())?;
                Ok(Encoder::Row {
                    field_names: field_names.clone(),
                    fields: nested,
                })
            }
            Encoder::Nullable(_) => {
                self.expect_arity(&nested, 1)?;
                let mut nested = nested.into_iter();
                Ok(Encoder::Nullable(Box::new(next_nested(&mut nested)?)))
            }
            Encoder::Either { .. } => {
                self.expect_arity(&nested, 2)?;
                let mut nested = nested.into_iter();
                let left = next_nested(&mut nested)?;
                let right = next_nested(&mut nested)?;
                Ok(Encoder::either(left, right))
            }
            Encoder::Custom(custom) => custom.factory().with_nested(nested),
            leaf => {
                self.expect_arity(&nested, 0)?;
                Ok(leaf.clone())
            }
        }
    }
}

fn next_nested(nested: &mut impl Iterator<Item = Encoder>) -> Result<Encoder> {
    nested
        .next()
        .ok_or_else(|| SchemaError::InvalidType("missing nested encoder".into()))
}
