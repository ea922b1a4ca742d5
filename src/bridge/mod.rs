//! Schema Bridge
//!
//! Converts between the external (Avro-style) schema, the logical type model
//! and the runtime type descriptor used to select an encoder.
//!
//! ```text
//! ExternalSchema ──to_logical──▶ LogicalType ──TypeDescriptor::of──▶ TypeDescriptor
//!        ▲                            │
//!        └─────────to_external────────┘
//! ```
//!
//! Both directions are pure functions of their input and the timestamp
//! mapping mode. Lossy cases are documented on [`SchemaBridge::to_logical`]
//! and [`SchemaBridge::to_external`].

pub mod names;
pub mod nullability;

use tracing::{debug, trace};

use crate::config::BridgeSettings;
use crate::descriptor::TypeDescriptor;
use crate::error::{Result, SchemaError};
use crate::logical::{check_decimal, check_unique_fields, IntWidth, LogicalType, RowField, TypeRoot, MAX_DECIMAL_PRECISION};
use crate::schema::{Annotation, ExternalSchema, Name, RecordBuilder};

use names::NameAllocator;
use nullability::UnionShape;

/// Precision ceiling of millisecond annotations
pub const MILLIS_PRECISION: u32 = 3;
/// Precision ceiling of microsecond annotations
pub const MICROS_PRECISION: u32 = 6;

/// Bidirectional schema converter
#[derive(Debug, Clone)]
pub struct SchemaBridge {
    settings: BridgeSettings,
}

impl Default for SchemaBridge {
    fn default() -> Self {
        Self::new(BridgeSettings::default())
    }
}

impl SchemaBridge {
    pub fn new(settings: BridgeSettings) -> Self {
        Self { settings }
    }

    /// Bridge using the legacy timestamp mapping
    pub fn legacy() -> Self {
        Self::new(BridgeSettings {
            legacy_timestamp_mapping: true,
            ..BridgeSettings::default()
        })
    }

    /// Bridge distinguishing zoned and local timestamps
    pub fn modern() -> Self {
        Self::new(BridgeSettings {
            legacy_timestamp_mapping: false,
            ..BridgeSettings::default()
        })
    }

    pub fn settings(&self) -> &BridgeSettings {
        &self.settings
    }

    fn legacy_mode(&self) -> bool {
        self.settings.legacy_timestamp_mapping
    }

    // =========================================================================
    // Documents
    // =========================================================================

    /// Parse a schema document, cross-checking it with `apache_avro` when
    /// validation is enabled
    pub fn parse_schema(&self, text: &str) -> Result<ExternalSchema> {
        let schema = ExternalSchema::parse_str(text)?;
        if self.settings.validate_with_avro {
            apache_avro::Schema::parse_str(text)
                .map_err(|e| SchemaError::Parse(format!("rejected by avro: {}", e)))?;
        }
        Ok(schema)
    }

    /// Schema document text to logical type
    pub fn ingest(&self, text: &str) -> Result<LogicalType> {
        self.to_logical(&self.parse_schema(text)?)
    }

    /// Logical type to schema document text, named with the configured root
    pub fn export(&self, logical: &LogicalType) -> Result<String> {
        let schema = self.to_external(logical, &self.settings.root_record_name)?;
        let text = schema.to_json_string();
        if self.settings.validate_with_avro {
            apache_avro::Schema::parse_str(&text)
                .map_err(|e| SchemaError::Parse(format!("rejected by avro: {}", e)))?;
        }
        Ok(text)
    }

    /// Runtime descriptor for an external schema
    pub fn to_type_descriptor(&self, schema: &ExternalSchema) -> Result<TypeDescriptor> {
        Ok(TypeDescriptor::of(&self.to_logical(schema)?))
    }

    // =========================================================================
    // External -> Logical
    // =========================================================================

    /// Convert an external schema into a logical type.
    ///
    /// Lossy cases: enums become strings, unions without a faithful mapping
    /// become [`TypeRoot::Raw`], map keys are always strings.
    pub fn to_logical(&self, schema: &ExternalSchema) -> Result<LogicalType> {
        let logical = match schema {
            ExternalSchema::Record(record) => {
                let fields = record
                    .fields
                    .iter()
                    .map(|field| Ok(RowField::new(field.name.clone(), self.to_logical(&field.schema)?)))
                    .collect::<Result<Vec<_>>>()?;
                LogicalType::row(fields)?
            }
            ExternalSchema::Enum { .. } => LogicalType::string(),
            ExternalSchema::Array(items) => LogicalType::array(self.to_logical(items)?),
            ExternalSchema::Map(values) => LogicalType::map(LogicalType::string(), self.to_logical(values)?),
            ExternalSchema::Union(members) => match nullability::unwrap_union(members)? {
                UnionShape::Single(inner) => self.to_logical(inner)?,
                UnionShape::Nullable(inner) => self.to_logical(inner)?.nullable(),
                UnionShape::Opaque { nullable } => {
                    let type_name = union_summary(members);
                    debug!(union = %type_name, "union has no logical mapping, using raw type");
                    LogicalType::raw(type_name).with_nullability(nullable)
                }
            },
            ExternalSchema::Fixed {
                size, annotation, ..
            } => match annotation {
                Some(Annotation::Decimal { precision, scale }) => decimal(*precision, *scale)?,
                _ => LogicalType::binary(*size),
            },
            ExternalSchema::String(_) => LogicalType::string(),
            ExternalSchema::Bytes(annotation) => match annotation {
                Some(Annotation::Decimal { precision, scale }) => decimal(*precision, *scale)?,
                _ => LogicalType::bytes(),
            },
            ExternalSchema::Int(annotation) => match annotation {
                Some(Annotation::Date) => LogicalType::date(),
                Some(Annotation::TimeMillis) => LogicalType::time(MILLIS_PRECISION),
                _ => LogicalType::int(),
            },
            ExternalSchema::Long(annotation) => self.long_to_logical(annotation.as_ref()),
            ExternalSchema::Float => LogicalType::float(),
            ExternalSchema::Double => LogicalType::double(),
            ExternalSchema::Boolean => LogicalType::boolean(),
            ExternalSchema::Null => LogicalType::null(),
            ExternalSchema::Ref(name) => {
                return Err(SchemaError::unsupported(
                    "RECORD",
                    format!("recursive reference to {} has no logical mapping", name.fullname()),
                ))
            }
        };
        trace!(external = schema.type_name(), logical = %logical, "converted to logical type");
        Ok(logical)
    }

    fn long_to_logical(&self, annotation: Option<&Annotation>) -> LogicalType {
        match (annotation, self.legacy_mode()) {
            (Some(Annotation::TimeMillis), _) => LogicalType::time(MILLIS_PRECISION),
            (Some(Annotation::TimeMicros), _) => LogicalType::time(MICROS_PRECISION),
            (Some(Annotation::TimestampMillis), true) => LogicalType::timestamp(MILLIS_PRECISION),
            (Some(Annotation::TimestampMicros), true) => LogicalType::timestamp(MICROS_PRECISION),
            (Some(Annotation::TimestampMillis), false) => LogicalType::zoned_timestamp(MILLIS_PRECISION),
            (Some(Annotation::TimestampMicros), false) => LogicalType::zoned_timestamp(MICROS_PRECISION),
            (Some(Annotation::LocalTimestampMillis), false) => LogicalType::timestamp(MILLIS_PRECISION),
            (Some(Annotation::LocalTimestampMicros), false) => LogicalType::timestamp(MICROS_PRECISION),
            _ => LogicalType::bigint(),
        }
    }

    // =========================================================================
    // Logical -> External
    // =========================================================================

    /// Convert a logical type into an external schema; `name` names the
    /// outermost record and prefixes the names of nested ones.
    ///
    /// Lossy cases: integer widths below 32 bits widen to `int`, multisets are
    /// written as `map<int>` counts.
    pub fn to_external(&self, logical: &LogicalType, name: &str) -> Result<ExternalSchema> {
        let mut names = NameAllocator::new();
        let schema = self.convert(logical, name, &mut names)?;
        if names.disambiguated() > 0 {
            debug!(root = name, count = names.disambiguated(), "disambiguated nested record names");
        }
        Ok(schema)
    }

    fn convert(&self, logical: &LogicalType, name: &str, names: &mut NameAllocator) -> Result<ExternalSchema> {
        let schema = match &logical.root {
            TypeRoot::Null => return Ok(ExternalSchema::Null),
            TypeRoot::Boolean => ExternalSchema::Boolean,
            TypeRoot::Integer { width: IntWidth::Big } => ExternalSchema::Long(None),
            TypeRoot::Integer { .. } => ExternalSchema::Int(None),
            TypeRoot::Float => ExternalSchema::Float,
            TypeRoot::Double => ExternalSchema::Double,
            TypeRoot::String => ExternalSchema::String(None),
            TypeRoot::Binary { length: None } => ExternalSchema::Bytes(None),
            TypeRoot::Binary { length: Some(size) } => ExternalSchema::Fixed {
                name: Name::new(&names.claim(name)),
                size: *size,
                annotation: None,
            },
            TypeRoot::Decimal { precision, scale } => {
                check_decimal(*precision, *scale)?;
                ExternalSchema::Bytes(Some(Annotation::Decimal {
                    precision: *precision,
                    scale: *scale,
                }))
            }
            TypeRoot::Date => ExternalSchema::Int(Some(Annotation::Date)),
            TypeRoot::Time { precision } => self.time_to_external(*precision)?,
            TypeRoot::Timestamp { precision, zoned } => self.timestamp_to_external(logical, *precision, *zoned)?,
            TypeRoot::Row { fields } => {
                check_unique_fields(fields)?;
                let record_name = names.claim(name);
                let mut builder = RecordBuilder::new(&record_name);
                for field in fields {
                    let child = NameAllocator::child_name(&record_name, &field.name);
                    let field_schema = self.convert(&field.ty, &child, names)?;
                    builder = if field.ty.nullable {
                        builder.nullable_field(field.name.clone(), field_schema)
                    } else {
                        builder.field(field.name.clone(), field_schema)
                    };
                }
                builder.build()
            }
            TypeRoot::Map { key, value } => {
                require_string_key(logical, key)?;
                ExternalSchema::Map(Box::new(self.convert(value, name, names)?))
            }
            TypeRoot::Multiset { element } => {
                require_string_key(logical, element)?;
                ExternalSchema::Map(Box::new(ExternalSchema::Int(None)))
            }
            TypeRoot::Array { element } => ExternalSchema::Array(Box::new(self.convert(element, name, names)?)),
            TypeRoot::Raw { .. } => {
                return Err(SchemaError::unsupported(
                    logical.category(),
                    format!("Unsupported to derive Schema for type: {}", logical),
                ))
            }
        };
        Ok(nullability::wrap(schema, logical.nullable))
    }

    fn time_to_external(&self, precision: u32) -> Result<ExternalSchema> {
        if precision <= MILLIS_PRECISION {
            return Ok(ExternalSchema::Int(Some(Annotation::TimeMillis)));
        }
        if self.legacy_mode() {
            return Err(precision_error("TIME", precision, MILLIS_PRECISION));
        }
        if precision <= MICROS_PRECISION {
            Ok(ExternalSchema::Long(Some(Annotation::TimeMicros)))
        } else {
            Err(precision_error("TIME", precision, MICROS_PRECISION))
        }
    }

    fn timestamp_to_external(&self, logical: &LogicalType, precision: u32, zoned: bool) -> Result<ExternalSchema> {
        let annotation = match (self.legacy_mode(), zoned) {
            (true, true) => {
                return Err(SchemaError::unsupported(
                    logical.category(),
                    format!("Unsupported to derive Schema for type: {} in legacy timestamp mapping", logical),
                ))
            }
            (true, false) if precision <= MILLIS_PRECISION => Annotation::TimestampMillis,
            (true, false) => return Err(precision_error("TIMESTAMP", precision, MILLIS_PRECISION)),
            (false, true) if precision <= MILLIS_PRECISION => Annotation::TimestampMillis,
            (false, true) if precision <= MICROS_PRECISION => Annotation::TimestampMicros,
            (false, false) if precision <= MILLIS_PRECISION => Annotation::LocalTimestampMillis,
            (false, false) if precision <= MICROS_PRECISION => Annotation::LocalTimestampMicros,
            (false, _) => {
                let type_name = if zoned { "TIMESTAMP_LTZ" } else { "LOCAL TIMESTAMP" };
                return Err(precision_error(type_name, precision, MICROS_PRECISION));
            }
        };
        Ok(ExternalSchema::Long(Some(annotation)))
    }
}

fn decimal(precision: u32, scale: u32) -> Result<LogicalType> {
    if precision > MAX_DECIMAL_PRECISION {
        return Err(precision_error("DECIMAL", precision, MAX_DECIMAL_PRECISION));
    }
    LogicalType::decimal(precision, scale)
}

fn precision_error(type_name: &str, requested: u32, max: u32) -> SchemaError {
    SchemaError::PrecisionRange {
        type_name: type_name.to_string(),
        requested,
        max,
    }
}

fn require_string_key(collection: &LogicalType, key: &LogicalType) -> Result<()> {
    if key.is_string_family() {
        return Ok(());
    }
    Err(SchemaError::unsupported(
        collection.category(),
        format!(
            "Avro format doesn't support non-string as key type of map. The key type is: {}",
            key
        ),
    ))
}

fn union_summary(members: &[ExternalSchema]) -> String {
    let parts: Vec<&str> = members.iter().map(ExternalSchema::type_name).collect();
    format!("union<{}>", parts.join(","))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> ExternalSchema {
        ExternalSchema::parse_str(text).unwrap()
    }

    #[test]
    fn test_legacy_long_annotations() {
        let bridge = SchemaBridge::legacy();
        let cases = [
            ("timestamp-millis", LogicalType::timestamp(3)),
            ("timestamp-micros", LogicalType::timestamp(6)),
            ("time-micros", LogicalType::time(6)),
            ("local-timestamp-millis", LogicalType::bigint()),
        ];
        for (annotation, expected) in cases {
            let schema = parse(&format!(r#"{{"type": "long", "logicalType": "{}"}}"#, annotation));
            assert_eq!(bridge.to_logical(&schema).unwrap(), expected, "{}", annotation);
        }
    }

    #[test]
    fn test_modern_long_annotations() {
        let bridge = SchemaBridge::modern();
        let cases = [
            ("timestamp-millis", LogicalType::zoned_timestamp(3)),
            ("timestamp-micros", LogicalType::zoned_timestamp(6)),
            ("local-timestamp-millis", LogicalType::timestamp(3)),
            ("local-timestamp-micros", LogicalType::timestamp(6)),
        ];
        for (annotation, expected) in cases {
            let schema = parse(&format!(r#"{{"type": "long", "logicalType": "{}"}}"#, annotation));
            assert_eq!(bridge.to_logical(&schema).unwrap(), expected, "{}", annotation);
        }
    }

    #[test]
    fn test_int_annotations() {
        let bridge = SchemaBridge::default();
        assert_eq!(
            bridge.to_logical(&parse(r#"{"type": "int", "logicalType": "date"}"#)).unwrap(),
            LogicalType::date()
        );
        assert_eq!(
            bridge.to_logical(&parse(r#"{"type": "int", "logicalType": "time-millis"}"#)).unwrap(),
            LogicalType::time(3)
        );
    }

    #[test]
    fn test_unions() {
        let bridge = SchemaBridge::default();
        assert_eq!(bridge.to_logical(&parse(r#"["int"]"#)).unwrap(), LogicalType::int());
        assert_eq!(
            bridge.to_logical(&parse(r#"["string", "null"]"#)).unwrap(),
            LogicalType::string().nullable()
        );
        let raw = bridge.to_logical(&parse(r#"["null", "int", "string"]"#)).unwrap();
        assert_eq!(raw, LogicalType::raw("union<null,int,string>").nullable());
        let raw = bridge.to_logical(&parse(r#"["int", "string"]"#)).unwrap();
        assert!(!raw.nullable);
        assert!(matches!(raw.root, TypeRoot::Raw { .. }));
    }

    #[test]
    fn test_fixed_and_enum() {
        let bridge = SchemaBridge::default();
        assert_eq!(
            bridge.to_logical(&parse(r#"{"type": "fixed", "name": "Hash", "size": 32}"#)).unwrap(),
            LogicalType::binary(32)
        );
        assert_eq!(
            bridge
                .to_logical(&parse(r#"{"type": "enum", "name": "Color", "symbols": ["RED", "GREEN"]}"#))
                .unwrap(),
            LogicalType::string()
        );
    }

    #[test]
    fn test_decimal_precision_ceiling_on_ingest() {
        let bridge = SchemaBridge::default();
        let err = bridge
            .to_logical(&parse(r#"{"type": "bytes", "logicalType": "decimal", "precision": 40, "scale": 2}"#))
            .unwrap_err();
        assert!(matches!(
            err,
            SchemaError::PrecisionRange { requested: 40, max: 38, .. }
        ));
    }

    #[test]
    fn test_map_key_must_be_string() {
        let bridge = SchemaBridge::default();
        let err = bridge
            .to_external(&LogicalType::map(LogicalType::int(), LogicalType::string()), "r")
            .unwrap_err();
        match err {
            SchemaError::UnsupportedType { category, detail } => {
                assert_eq!(category, "MAP");
                assert!(detail.contains("INTEGER NOT NULL"));
            }
            other => panic!("unexpected error {:?}", other),
        }
        assert!(bridge
            .to_external(&LogicalType::multiset(LogicalType::bigint()), "r")
            .is_err());
    }

    #[test]
    fn test_multiset_exports_as_count_map() {
        let bridge = SchemaBridge::default();
        let schema = bridge
            .to_external(&LogicalType::multiset(LogicalType::string()), "r")
            .unwrap();
        assert_eq!(schema, ExternalSchema::Map(Box::new(ExternalSchema::Int(None))));
        assert_eq!(
            bridge.to_logical(&schema).unwrap(),
            LogicalType::map(LogicalType::string(), LogicalType::int())
        );
    }

    #[test]
    fn test_raw_and_legacy_zoned_are_unsupported() {
        let bridge = SchemaBridge::legacy();
        assert!(matches!(
            bridge.to_external(&LogicalType::raw("union<int,string>"), "r"),
            Err(SchemaError::UnsupportedType { ref category, .. }) if category == "RAW"
        ));
        assert!(matches!(
            bridge.to_external(&LogicalType::zoned_timestamp(3), "r"),
            Err(SchemaError::UnsupportedType { .. })
        ));
    }

    #[test]
    fn test_timestamp_precision_ceilings() {
        let legacy = SchemaBridge::legacy();
        let modern = SchemaBridge::modern();

        assert!(matches!(
            legacy.to_external(&LogicalType::timestamp(6), "r"),
            Err(SchemaError::PrecisionRange { requested: 6, max: 3, .. })
        ));
        assert_eq!(
            modern.to_external(&LogicalType::timestamp(6), "r").unwrap(),
            ExternalSchema::Long(Some(Annotation::LocalTimestampMicros))
        );
        assert_eq!(
            modern.to_external(&LogicalType::zoned_timestamp(2), "r").unwrap(),
            ExternalSchema::Long(Some(Annotation::TimestampMillis))
        );
        assert!(matches!(
            modern.to_external(&LogicalType::zoned_timestamp(9), "r"),
            Err(SchemaError::PrecisionRange { requested: 9, max: 6, .. })
        ));
        assert!(matches!(
            modern.to_external(&LogicalType::time(7), "r"),
            Err(SchemaError::PrecisionRange { requested: 7, max: 6, .. })
        ));
        assert_eq!(
            modern.to_external(&LogicalType::time(6), "r").unwrap(),
            ExternalSchema::Long(Some(Annotation::TimeMicros))
        );
    }

    #[test]
    fn test_fixed_binary_round_trips() {
        let bridge = SchemaBridge::default();
        let row = LogicalType::row(vec![RowField::new("digest", LogicalType::binary(16))]).unwrap();
        let schema = bridge.to_external(&row, "record").unwrap();
        let json = schema.to_json();
        assert_eq!(json["fields"][0]["type"]["name"], "record_digest");
        assert_eq!(bridge.to_logical(&schema).unwrap(), row);
    }

    #[test]
    fn test_colliding_field_paths_get_distinct_names() {
        let bridge = SchemaBridge::default();
        let leaf = || LogicalType::row(vec![RowField::new("x", LogicalType::int())]).unwrap();
        let row = LogicalType::row(vec![
            RowField::new("a_b", leaf()),
            RowField::new("a", LogicalType::row(vec![RowField::new("b", leaf())]).unwrap()),
        ])
        .unwrap();
        let json = bridge.to_external(&row, "r").unwrap().to_json();
        assert_eq!(json["fields"][0]["type"]["name"], "r_a_b");
        assert_eq!(json["fields"][1]["type"]["fields"][0]["type"]["name"], "r_a_b_2");
    }

    #[test]
    fn test_hand_built_invalid_types_are_rejected() {
        let bridge = SchemaBridge::default();
        let duplicate = LogicalType::new(TypeRoot::Row {
            fields: vec![
                RowField::new("a", LogicalType::int()),
                RowField::new("a", LogicalType::string()),
            ],
        });
        assert!(matches!(
            bridge.to_external(&duplicate, "record"),
            Err(SchemaError::InvalidType(_))
        ));

        let wide = LogicalType::array(LogicalType::new(TypeRoot::Decimal { precision: 40, scale: 2 }));
        assert!(matches!(
            bridge.to_external(&wide, "record"),
            Err(SchemaError::InvalidType(_))
        ));
    }
}
