//! Runtime type descriptors
//!
//! A [`TypeDescriptor`] names the runtime representation a value of a logical
//! type takes, which is what encoder selection keys on. Descriptors are built
//! fresh for each request and owned by the caller.

use serde::{Deserialize, Serialize};

use crate::logical::{IntWidth, LogicalType, TypeRoot};

/// Runtime identity of a logical type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "descriptor", rename_all = "snake_case")]
pub enum TypeDescriptor {
    Void,
    Boolean,
    Byte,
    Short,
    Int,
    Long,
    Float,
    Double,
    String,
    PrimitiveBytes { length: Option<usize> },
    BigDecimal { precision: u32, scale: u32 },
    SqlDate,
    SqlTime { precision: u32 },
    /// Local date-time without zone
    SqlTimestamp { precision: u32 },
    /// Point on the time-line
    Instant { precision: u32 },
    ObjectArray { element: Box<TypeDescriptor> },
    Map { key: Box<TypeDescriptor>, value: Box<TypeDescriptor> },
    Row { fields: Vec<(String, TypeDescriptor)> },
    Nullable { inner: Box<TypeDescriptor> },
    /// Values handled by a general-purpose fallback encoder
    Generic { type_name: String },
}

impl TypeDescriptor {
    /// Descriptor for a logical type. Multisets are represented as maps from
    /// element to occurrence count.
    pub fn of(logical: &LogicalType) -> Self {
        let descriptor = match &logical.root {
            TypeRoot::Null => return TypeDescriptor::Void,
            TypeRoot::Boolean => TypeDescriptor::Boolean,
            TypeRoot::Integer { width } => match width {
                IntWidth::Tiny => TypeDescriptor::Byte,
                IntWidth::Small => TypeDescriptor::Short,
                IntWidth::Int => TypeDescriptor::Int,
                IntWidth::Big => TypeDescriptor::Long,
            },
            TypeRoot::Float => TypeDescriptor::Float,
            TypeRoot::Double => TypeDescriptor::Double,
            TypeRoot::String => TypeDescriptor::String,
            TypeRoot::Binary { length } => TypeDescriptor::PrimitiveBytes { length: *length },
            TypeRoot::Decimal { precision, scale } => TypeDescriptor::BigDecimal {
                precision: *precision,
                scale: *scale,
            },
            TypeRoot::Date => TypeDescriptor::SqlDate,
            TypeRoot::Time { precision } => TypeDescriptor::SqlTime { precision: *precision },
            TypeRoot::Timestamp { precision, zoned: false } => TypeDescriptor::SqlTimestamp { precision: *precision },
            TypeRoot::Timestamp { precision, zoned: true } => TypeDescriptor::Instant { precision: *precision },
            TypeRoot::Array { element } => TypeDescriptor::ObjectArray {
                element: Box::new(Self::of(element)),
            },
            TypeRoot::Map { key, value } => TypeDescriptor::Map {
                key: Box::new(Self::of(key)),
                value: Box::new(Self::of(value)),
            },
            TypeRoot::Multiset { element } => TypeDescriptor::Map {
                key: Box::new(Self::of(element)),
                value: Box::new(TypeDescriptor::Int),
            },
            TypeRoot::Row { fields } => TypeDescriptor::Row {
                fields: fields.iter().map(|f| (f.name.clone(), Self::of(&f.ty))).collect(),
            },
            TypeRoot::Raw { type_name } => TypeDescriptor::Generic {
                type_name: type_name.clone(),
            },
        };
        if logical.nullable {
            TypeDescriptor::Nullable {
                inner: Box::new(descriptor),
            }
        } else {
            descriptor
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logical::RowField;

    #[test]
    fn test_row_descriptor() {
        let row = LogicalType::row(vec![
            RowField::new("name", LogicalType::string()),
            RowField::new("seen", LogicalType::zoned_timestamp(3).nullable()),
        ])
        .unwrap();
        let descriptor = TypeDescriptor::of(&row);
        assert_eq!(
            descriptor,
            TypeDescriptor::Row {
                fields: vec![
                    ("name".to_string(), TypeDescriptor::String),
                    (
                        "seen".to_string(),
                        TypeDescriptor::Nullable {
                            inner: Box::new(TypeDescriptor::Instant { precision: 3 })
                        }
                    ),
                ]
            }
        );
    }

    #[test]
    fn test_null_is_void() {
        let descriptor = TypeDescriptor::of(&LogicalType::null());
        assert_eq!(descriptor, TypeDescriptor::Void);
    }

    #[test]
    fn test_multiset_is_counted_map() {
        assert_eq!(
            TypeDescriptor::of(&LogicalType::multiset(LogicalType::string())),
            TypeDescriptor::Map {
                key: Box::new(TypeDescriptor::String),
                value: Box::new(TypeDescriptor::Int),
            }
        );
    }
}
