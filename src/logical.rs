//! Logical type model
//!
//! The engine-internal, nullability-aware description of a value's shape.
//! A [`LogicalType`] is a plain value: cloning is cheap enough for the
//! finite trees produced from schemas, and nothing is shared mutably.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SchemaError};

/// Largest decimal precision a logical type may carry
pub const MAX_DECIMAL_PRECISION: u32 = 38;

/// Bit width of an exact integer type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntWidth {
    Tiny,
    Small,
    Int,
    Big,
}

impl IntWidth {
    pub fn bits(&self) -> u32 {
        match self {
            IntWidth::Tiny => 8,
            IntWidth::Small => 16,
            IntWidth::Int => 32,
            IntWidth::Big => 64,
        }
    }
}

/// A named field of a row type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowField {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: LogicalType,
}

impl RowField {
    pub fn new(name: impl Into<String>, ty: LogicalType) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

/// The category of a logical type, independent of nullability
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TypeRoot {
    Null,
    Boolean,
    Integer { width: IntWidth },
    Float,
    Double,
    String,
    Binary {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        length: Option<usize>,
    },
    Decimal { precision: u32, scale: u32 },
    Date,
    Time { precision: u32 },
    Timestamp { precision: u32, zoned: bool },
    Array { element: Box<LogicalType> },
    Map { key: Box<LogicalType>, value: Box<LogicalType> },
    Multiset { element: Box<LogicalType> },
    Row { fields: Vec<RowField> },
    /// Opaque escape hatch for shapes with no faithful mapping
    Raw { type_name: String },
}

/// A logical type: a [`TypeRoot`] plus whether values may be absent.
///
/// Deserialization goes through the validating constructors, so decoded
/// rows have unique field names and decoded decimals are in range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "LogicalTypeRepr")]
pub struct LogicalType {
    pub nullable: bool,
    #[serde(flatten)]
    pub root: TypeRoot,
}

/// Unchecked wire form of [`LogicalType`]
#[derive(Deserialize)]
struct LogicalTypeRepr {
    nullable: bool,
    #[serde(flatten)]
    root: TypeRoot,
}

impl TryFrom<LogicalTypeRepr> for LogicalType {
    type Error = SchemaError;

    fn try_from(repr: LogicalTypeRepr) -> Result<Self> {
        let ty = match repr.root {
            TypeRoot::Decimal { precision, scale } => Self::decimal(precision, scale)?,
            TypeRoot::Row { fields } => Self::row(fields)?,
            root => Self::new(root),
        };
        Ok(ty.with_nullability(repr.nullable))
    }
}

/// Reject decimal precision outside `1..=38` or scale above precision
pub(crate) fn check_decimal(precision: u32, scale: u32) -> Result<()> {
    if precision == 0 || precision > MAX_DECIMAL_PRECISION {
        return Err(SchemaError::InvalidType(format!(
            "decimal precision must be between 1 and {}, got {}",
            MAX_DECIMAL_PRECISION, precision
        )));
    }
    if scale > precision {
        return Err(SchemaError::InvalidType(format!(
            "decimal scale {} exceeds precision {}",
            scale, precision
        )));
    }
    Ok(())
}

pub(crate) fn check_unique_fields(fields: &[RowField]) -> Result<()> {
    let mut seen = HashSet::new();
    for field in fields {
        if !seen.insert(field.name.as_str()) {
            return Err(SchemaError::InvalidType(format!(
                "duplicate row field name '{}'",
                field.name
            )));
        }
    }
    Ok(())
}

impl LogicalType {
    /// Create a non-nullable type from a root
    pub fn new(root: TypeRoot) -> Self {
        let nullable = matches!(root, TypeRoot::Null);
        Self { nullable, root }
    }

    /// The null type (always nullable)
    pub fn null() -> Self {
        Self::new(TypeRoot::Null)
    }

    pub fn boolean() -> Self {
        Self::new(TypeRoot::Boolean)
    }

    pub fn integer(width: IntWidth) -> Self {
        Self::new(TypeRoot::Integer { width })
    }

    pub fn int() -> Self {
        Self::integer(IntWidth::Int)
    }

    pub fn bigint() -> Self {
        Self::integer(IntWidth::Big)
    }

    pub fn float() -> Self {
        Self::new(TypeRoot::Float)
    }

    pub fn double() -> Self {
        Self::new(TypeRoot::Double)
    }

    pub fn string() -> Self {
        Self::new(TypeRoot::String)
    }

    pub fn bytes() -> Self {
        Self::new(TypeRoot::Binary { length: None })
    }

    pub fn binary(length: usize) -> Self {
        Self::new(TypeRoot::Binary {
            length: Some(length),
        })
    }

    /// Create a decimal type, validating precision and scale
    pub fn decimal(precision: u32, scale: u32) -> Result<Self> {
        check_decimal(precision, scale)?;
        Ok(Self::new(TypeRoot::Decimal { precision, scale }))
    }

    pub fn date() -> Self {
        Self::new(TypeRoot::Date)
    }

    pub fn time(precision: u32) -> Self {
        Self::new(TypeRoot::Time { precision })
    }

    /// Timestamp without a zone (local date-time)
    pub fn timestamp(precision: u32) -> Self {
        Self::new(TypeRoot::Timestamp {
            precision,
            zoned: false,
        })
    }

    /// Timestamp bound to an instant on the time-line
    pub fn zoned_timestamp(precision: u32) -> Self {
        Self::new(TypeRoot::Timestamp {
            precision,
            zoned: true,
        })
    }

    pub fn array(element: LogicalType) -> Self {
        Self::new(TypeRoot::Array {
            element: Box::new(element),
        })
    }

    pub fn map(key: LogicalType, value: LogicalType) -> Self {
        Self::new(TypeRoot::Map {
            key: Box::new(key),
            value: Box::new(value),
        })
    }

    pub fn multiset(element: LogicalType) -> Self {
        Self::new(TypeRoot::Multiset {
            element: Box::new(element),
        })
    }

    /// Create a row type; field names must be unique
    pub fn row(fields: Vec<RowField>) -> Result<Self> {
        check_unique_fields(&fields)?;
        Ok(Self::new(TypeRoot::Row { fields }))
    }

    pub fn raw(type_name: impl Into<String>) -> Self {
        Self::new(TypeRoot::Raw {
            type_name: type_name.into(),
        })
    }

    /// Copy of this type that admits absent values
    pub fn nullable(self) -> Self {
        self.with_nullability(true)
    }

    /// Copy of this type that rejects absent values (null stays nullable)
    pub fn not_null(self) -> Self {
        self.with_nullability(false)
    }

    pub fn with_nullability(mut self, nullable: bool) -> Self {
        self.nullable = nullable || matches!(self.root, TypeRoot::Null);
        self
    }

    /// Whether this type belongs to the character string family
    pub fn is_string_family(&self) -> bool {
        matches!(self.root, TypeRoot::String)
    }

    /// Short category name used in diagnostics
    pub fn category(&self) -> &'static str {
        self.root.category()
    }
}

impl TypeRoot {
    pub fn category(&self) -> &'static str {
        match self {
            TypeRoot::Null => "NULL",
            TypeRoot::Boolean => "BOOLEAN",
            TypeRoot::Integer { width } => match width {
                IntWidth::Tiny => "TINYINT",
                IntWidth::Small => "SMALLINT",
                IntWidth::Int => "INTEGER",
                IntWidth::Big => "BIGINT",
            },
            TypeRoot::Float => "FLOAT",
            TypeRoot::Double => "DOUBLE",
            TypeRoot::String => "STRING",
            TypeRoot::Binary { length: Some(_) } => "BINARY",
            TypeRoot::Binary { length: None } => "BYTES",
            TypeRoot::Decimal { .. } => "DECIMAL",
            TypeRoot::Date => "DATE",
            TypeRoot::Time { .. } => "TIME",
            TypeRoot::Timestamp { zoned: false, .. } => "TIMESTAMP",
            TypeRoot::Timestamp { zoned: true, .. } => "TIMESTAMP_LTZ",
            TypeRoot::Array { .. } => "ARRAY",
            TypeRoot::Map { .. } => "MAP",
            TypeRoot::Multiset { .. } => "MULTISET",
            TypeRoot::Row { .. } => "ROW",
            TypeRoot::Raw { .. } => "RAW",
        }
    }
}

impl fmt::Display for LogicalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.root {
            TypeRoot::Binary { length: Some(n) } => write!(f, "BINARY({})", n)?,
            TypeRoot::Decimal { precision, scale } => write!(f, "DECIMAL({}, {})", precision, scale)?,
            TypeRoot::Time { precision } => write!(f, "TIME({})", precision)?,
            TypeRoot::Timestamp { precision, zoned } => {
                if *zoned {
                    write!(f, "TIMESTAMP_LTZ({})", precision)?
                } else {
                    write!(f, "TIMESTAMP({})", precision)?
                }
            }
            TypeRoot::Array { element } => write!(f, "ARRAY<{}>", element)?,
            TypeRoot::Map { key, value } => write!(f, "MAP<{}, {}>", key, value)?,
            TypeRoot::Multiset { element } => write!(f, "MULTISET<{}>", element)?,
            TypeRoot::Row { fields } => {
                write!(f, "ROW<")?;
                for (i, field) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "`{}` {}", field.name, field.ty)?;
                }
                write!(f, ">")?;
            }
            TypeRoot::Raw { type_name } => write!(f, "RAW('{}')", type_name)?,
            other => write!(f, "{}", other.category())?,
        }
        if !self.nullable {
            write!(f, " NOT NULL")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constructors_are_not_null() {
        assert!(!LogicalType::int().nullable);
        assert!(LogicalType::int().nullable().nullable);
        assert!(LogicalType::null().nullable);
        assert!(LogicalType::null().not_null().nullable);
    }

    #[test]
    fn test_duplicate_row_fields_rejected() {
        let result = LogicalType::row(vec![
            RowField::new("a", LogicalType::int()),
            RowField::new("a", LogicalType::string()),
        ]);
        assert!(matches!(result, Err(SchemaError::InvalidType(_))));
    }

    #[test]
    fn test_decimal_bounds() {
        assert!(LogicalType::decimal(10, 2).is_ok());
        assert!(LogicalType::decimal(0, 0).is_err());
        assert!(LogicalType::decimal(39, 0).is_err());
        assert!(LogicalType::decimal(5, 6).is_err());
    }

    #[test]
    fn test_display() {
        let row = LogicalType::row(vec![
            RowField::new("id", LogicalType::bigint()),
            RowField::new("ts", LogicalType::timestamp(3).nullable()),
        ])
        .unwrap();
        assert_eq!(
            row.to_string(),
            "ROW<`id` BIGINT NOT NULL, `ts` TIMESTAMP(3)> NOT NULL"
        );
    }

    #[test]
    fn test_json_shape() {
        let ty = LogicalType::decimal(10, 2).unwrap();
        let json = serde_json::to_value(&ty).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"nullable": false, "kind": "decimal", "precision": 10, "scale": 2})
        );
        let back: LogicalType = serde_json::from_value(json).unwrap();
        assert_eq!(back, ty);
    }

    #[test]
    fn test_deserialize_validates() {
        let duplicate = serde_json::json!({
            "nullable": false,
            "kind": "row",
            "fields": [
                {"name": "a", "type": {"nullable": false, "kind": "integer", "width": "int"}},
                {"name": "a", "type": {"nullable": true, "kind": "string"}}
            ]
        });
        let err = serde_json::from_value::<LogicalType>(duplicate).unwrap_err();
        assert!(err.to_string().contains("duplicate row field name 'a'"));

        let nested = serde_json::json!({
            "nullable": false,
            "kind": "array",
            "element": {"nullable": false, "kind": "decimal", "precision": 0, "scale": 0}
        });
        assert!(serde_json::from_value::<LogicalType>(nested).is_err());

        let null: LogicalType = serde_json::from_value(serde_json::json!({"nullable": false, "kind": "null"})).unwrap();
        assert!(null.nullable);
    }
}
