//! External wire schema
//!
//! An Avro-style schema document, parsed from and written to the Avro JSON
//! grammar. Named types (record, enum, fixed) that are referenced after their
//! definition are inlined by the parser, so consumers can walk the tree
//! without a symbol table. Only a reference to a record that is still being
//! defined (a recursive type) survives as [`ExternalSchema::Ref`].

use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;

use regex::Regex;
use serde_json::{json, Map, Value};

use crate::error::{Result, SchemaError};

// =============================================================================
// Annotations
// =============================================================================

/// A logical annotation refining a physical type
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Annotation {
    Decimal { precision: u32, scale: u32 },
    Date,
    TimeMillis,
    TimeMicros,
    TimestampMillis,
    TimestampMicros,
    LocalTimestampMillis,
    LocalTimestampMicros,
    Uuid,
}

impl Annotation {
    /// The `logicalType` attribute value
    pub fn name(&self) -> &'static str {
        match self {
            Annotation::Decimal { .. } => "decimal",
            Annotation::Date => "date",
            Annotation::TimeMillis => "time-millis",
            Annotation::TimeMicros => "time-micros",
            Annotation::TimestampMillis => "timestamp-millis",
            Annotation::TimestampMicros => "timestamp-micros",
            Annotation::LocalTimestampMillis => "local-timestamp-millis",
            Annotation::LocalTimestampMicros => "local-timestamp-micros",
            Annotation::Uuid => "uuid",
        }
    }

    /// Whether the annotation may refine the given physical type name
    fn applies_to(&self, physical: &str) -> bool {
        match self {
            Annotation::Decimal { .. } => matches!(physical, "bytes" | "fixed"),
            Annotation::Date | Annotation::TimeMillis => physical == "int",
            Annotation::TimeMicros
            | Annotation::TimestampMillis
            | Annotation::TimestampMicros
            | Annotation::LocalTimestampMillis
            | Annotation::LocalTimestampMicros => physical == "long",
            Annotation::Uuid => physical == "string",
        }
    }
}

// =============================================================================
// Schema tree
// =============================================================================

/// A possibly namespace-qualified name of a named type
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Name {
    pub name: String,
    pub namespace: Option<String>,
}

impl Name {
    /// Split a dotted full name into namespace and simple name
    pub fn new(full: &str) -> Self {
        match full.rsplit_once('.') {
            Some((namespace, name)) => Self {
                name: name.to_string(),
                namespace: Some(namespace.to_string()),
            },
            None => Self {
                name: full.to_string(),
                namespace: None,
            },
        }
    }

    /// Resolve against an enclosing namespace when unqualified
    fn qualified(full: &str, explicit_ns: Option<&str>, enclosing_ns: Option<&str>) -> Self {
        let mut name = Self::new(full);
        if name.namespace.is_none() {
            name.namespace = explicit_ns
                .or(enclosing_ns)
                .filter(|ns| !ns.is_empty())
                .map(String::from);
        }
        name
    }

    pub fn fullname(&self) -> String {
        match &self.namespace {
            Some(ns) => format!("{}.{}", ns, self.name),
            None => self.name.clone(),
        }
    }
}

/// A field of a record schema
#[derive(Debug, Clone, PartialEq)]
pub struct RecordField {
    pub name: String,
    pub schema: ExternalSchema,
    pub default: Option<Value>,
}

/// A named record schema
#[derive(Debug, Clone, PartialEq)]
pub struct RecordSchema {
    pub name: Name,
    pub doc: Option<String>,
    pub fields: Vec<RecordField>,
}

/// Avro-style external schema
#[derive(Debug, Clone, PartialEq)]
pub enum ExternalSchema {
    Null,
    Boolean,
    Int(Option<Annotation>),
    Long(Option<Annotation>),
    Float,
    Double,
    String(Option<Annotation>),
    Bytes(Option<Annotation>),
    Fixed {
        name: Name,
        size: usize,
        annotation: Option<Annotation>,
    },
    Enum {
        name: Name,
        symbols: Vec<String>,
    },
    Array(Box<ExternalSchema>),
    Map(Box<ExternalSchema>),
    Union(Vec<ExternalSchema>),
    Record(RecordSchema),
    /// Reference to a record still under definition (recursive type)
    Ref(Name),
}

impl ExternalSchema {
    /// Parse an Avro JSON schema document
    pub fn parse_str(text: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(text)
            .map_err(|e| SchemaError::Parse(format!("invalid JSON: {}", e)))?;
        Self::parse_value(&value)
    }

    /// Parse an already decoded Avro JSON schema
    pub fn parse_value(value: &Value) -> Result<Self> {
        SchemaParser::default().parse(value, None)
    }

    /// Physical type name as used in the JSON grammar
    pub fn type_name(&self) -> &'static str {
        match self {
            ExternalSchema::Null => "null",
            ExternalSchema::Boolean => "boolean",
            ExternalSchema::Int(_) => "int",
            ExternalSchema::Long(_) => "long",
            ExternalSchema::Float => "float",
            ExternalSchema::Double => "double",
            ExternalSchema::String(_) => "string",
            ExternalSchema::Bytes(_) => "bytes",
            ExternalSchema::Fixed { .. } => "fixed",
            ExternalSchema::Enum { .. } => "enum",
            ExternalSchema::Array(_) => "array",
            ExternalSchema::Map(_) => "map",
            ExternalSchema::Union(_) => "union",
            ExternalSchema::Record(_) => "record",
            ExternalSchema::Ref(_) => "ref",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, ExternalSchema::Null)
    }

    /// Render as Avro JSON. A named type emitted twice is referenced by
    /// full name the second time.
    pub fn to_json(&self) -> Value {
        let mut emitted = HashSet::new();
        self.write_json(&mut emitted)
    }

    pub fn to_json_string(&self) -> String {
        self.to_json().to_string()
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.to_json())?)
    }

    /// Convert into an `apache_avro` schema, validating the document
    pub fn to_avro(&self) -> Result<apache_avro::Schema> {
        Ok(apache_avro::Schema::parse(&self.to_json())?)
    }

    fn write_json(&self, emitted: &mut HashSet<String>) -> Value {
        match self {
            ExternalSchema::Null
            | ExternalSchema::Boolean
            | ExternalSchema::Float
            | ExternalSchema::Double
            | ExternalSchema::Int(None)
            | ExternalSchema::Long(None)
            | ExternalSchema::String(None)
            | ExternalSchema::Bytes(None) => Value::String(self.type_name().to_string()),
            ExternalSchema::Int(Some(a))
            | ExternalSchema::Long(Some(a))
            | ExternalSchema::String(Some(a))
            | ExternalSchema::Bytes(Some(a)) => {
                let mut obj = Map::new();
                obj.insert("type".into(), json!(self.type_name()));
                write_annotation(&mut obj, a);
                Value::Object(obj)
            }
            ExternalSchema::Fixed {
                name,
                size,
                annotation,
            } => {
                let fullname = name.fullname();
                if !emitted.insert(fullname.clone()) {
                    return Value::String(fullname);
                }
                let mut obj = Map::new();
                obj.insert("type".into(), json!("fixed"));
                obj.insert("name".into(), json!(fullname));
                obj.insert("size".into(), json!(size));
                if let Some(a) = annotation {
                    write_annotation(&mut obj, a);
                }
                Value::Object(obj)
            }
            ExternalSchema::Enum { name, symbols } => {
                let fullname = name.fullname();
                if !emitted.insert(fullname.clone()) {
                    return Value::String(fullname);
                }
                json!({ "type": "enum", "name": fullname, "symbols": symbols })
            }
            ExternalSchema::Array(items) => {
                json!({ "type": "array", "items": items.write_json(emitted) })
            }
            ExternalSchema::Map(values) => {
                json!({ "type": "map", "values": values.write_json(emitted) })
            }
            ExternalSchema::Union(members) => {
                Value::Array(members.iter().map(|m| m.write_json(emitted)).collect())
            }
            ExternalSchema::Record(record) => {
                let fullname = record.name.fullname();
                if !emitted.insert(fullname.clone()) {
                    return Value::String(fullname);
                }
                let fields: Vec<Value> = record
                    .fields
                    .iter()
                    .map(|field| {
                        let mut obj = Map::new();
                        obj.insert("name".into(), json!(field.name));
                        obj.insert("type".into(), field.schema.write_json(emitted));
                        if let Some(default) = &field.default {
                            obj.insert("default".into(), default.clone());
                        }
                        Value::Object(obj)
                    })
                    .collect();
                let mut obj = Map::new();
                obj.insert("type".into(), json!("record"));
                obj.insert("name".into(), json!(fullname));
                if let Some(doc) = &record.doc {
                    obj.insert("doc".into(), json!(doc));
                }
                obj.insert("fields".into(), Value::Array(fields));
                Value::Object(obj)
            }
            ExternalSchema::Ref(name) => Value::String(name.fullname()),
        }
    }
}

fn write_annotation(obj: &mut Map<String, Value>, annotation: &Annotation) {
    obj.insert("logicalType".into(), json!(annotation.name()));
    if let Annotation::Decimal { precision, scale } = annotation {
        obj.insert("precision".into(), json!(precision));
        obj.insert("scale".into(), json!(scale));
    }
}

// =============================================================================
// Record builder
// =============================================================================

/// Assembles a record schema field by field; every step yields a new builder
#[derive(Debug, Clone)]
pub struct RecordBuilder {
    name: Name,
    fields: Vec<RecordField>,
}

impl RecordBuilder {
    pub fn new(fullname: &str) -> Self {
        Self {
            name: Name::new(fullname),
            fields: Vec::new(),
        }
    }

    /// Append a field without a default value
    pub fn field(self, name: impl Into<String>, schema: ExternalSchema) -> Self {
        self.push(name.into(), schema, None)
    }

    /// Append a field whose default is `null`
    pub fn nullable_field(self, name: impl Into<String>, schema: ExternalSchema) -> Self {
        self.push(name.into(), schema, Some(Value::Null))
    }

    fn push(mut self, name: String, schema: ExternalSchema, default: Option<Value>) -> Self {
        self.fields.push(RecordField {
            name,
            schema,
            default,
        });
        self
    }

    pub fn build(self) -> ExternalSchema {
        ExternalSchema::Record(RecordSchema {
            name: self.name,
            doc: None,
            fields: self.fields,
        })
    }
}

// =============================================================================
// Parser
// =============================================================================

const PRIMITIVES: &[&str] = &[
    "null", "boolean", "int", "long", "float", "double", "bytes", "string",
];

fn name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("static pattern"))
}

fn validate_name(name: &Name) -> Result<()> {
    let valid_simple = name_pattern().is_match(&name.name);
    let valid_ns = name
        .namespace
        .as_deref()
        .map(|ns| ns.split('.').all(|part| name_pattern().is_match(part)))
        .unwrap_or(true);
    if valid_simple && valid_ns {
        Ok(())
    } else {
        Err(SchemaError::Parse(format!("invalid name '{}'", name.fullname())))
    }
}

/// Largest decimal precision representable in `size` two's-complement bytes
fn max_fixed_precision(size: usize) -> u32 {
    if size == 0 {
        return 0;
    }
    let bits = size.saturating_mul(8).saturating_sub(1) as f64;
    (bits * std::f64::consts::LOG10_2).floor() as u32
}

#[derive(Default)]
struct SchemaParser {
    /// Completed named types by full name
    named: HashMap<String, ExternalSchema>,
    /// Records whose fields are still being parsed
    pending: HashSet<String>,
}

impl SchemaParser {
    fn parse(&mut self, value: &Value, ns: Option<&str>) -> Result<ExternalSchema> {
        match value {
            Value::String(name) => self.parse_reference(name, ns),
            Value::Array(members) => self.parse_union(members, ns),
            Value::Object(obj) => self.parse_complex(obj, ns),
            other => Err(SchemaError::Parse(format!(
                "expected a type name, union or object, got {}",
                other
            ))),
        }
    }

    fn parse_reference(&mut self, name: &str, ns: Option<&str>) -> Result<ExternalSchema> {
        if let Some(primitive) = primitive(name, None) {
            return Ok(primitive);
        }
        let candidates = [Name::qualified(name, None, ns).fullname(), name.to_string()];
        for candidate in &candidates {
            if let Some(schema) = self.named.get(candidate) {
                return Ok(schema.clone());
            }
            if self.pending.contains(candidate) {
                return Ok(ExternalSchema::Ref(Name::new(candidate)));
            }
        }
        Err(SchemaError::Parse(format!("undefined name: {}", name)))
    }

    fn parse_union(&mut self, members: &[Value], ns: Option<&str>) -> Result<ExternalSchema> {
        if members.is_empty() {
            return Err(SchemaError::Parse("union must have at least one member".into()));
        }
        let mut parsed = Vec::with_capacity(members.len());
        let mut seen = HashSet::new();
        for member in members {
            let schema = self.parse(member, ns)?;
            let key = match &schema {
                ExternalSchema::Union(_) => {
                    return Err(SchemaError::Parse("unions may not immediately contain other unions".into()))
                }
                ExternalSchema::Record(r) => r.name.fullname(),
                ExternalSchema::Fixed { name, .. } | ExternalSchema::Enum { name, .. } => name.fullname(),
                ExternalSchema::Ref(name) => name.fullname(),
                other => other.type_name().to_string(),
            };
            if !seen.insert(key.clone()) {
                return Err(SchemaError::Parse(format!("duplicate union member: {}", key)));
            }
            parsed.push(schema);
        }
        Ok(ExternalSchema::Union(parsed))
    }

    fn parse_complex(&mut self, obj: &Map<String, Value>, ns: Option<&str>) -> Result<ExternalSchema> {
        let type_value = obj
            .get("type")
            .ok_or_else(|| SchemaError::Parse("schema object missing 'type'".into()))?;
        let type_name = match type_value {
            Value::String(s) => s.as_str(),
            nested => return self.parse(nested, ns),
        };
        let annotation = parse_annotation(obj)?;

        match type_name {
            "record" | "error" => self.parse_record(obj, ns),
            "enum" => {
                let name = self.declare_name(obj, ns)?;
                let symbols = obj
                    .get("symbols")
                    .and_then(Value::as_array)
                    .ok_or_else(|| SchemaError::Parse(format!("enum {} missing 'symbols'", name.fullname())))?
                    .iter()
                    .map(|s| {
                        s.as_str()
                            .map(String::from)
                            .ok_or_else(|| SchemaError::Parse("enum symbols must be strings".into()))
                    })
                    .collect::<Result<Vec<_>>>()?;
                let schema = ExternalSchema::Enum { name: name.clone(), symbols };
                self.register(&name, schema)
            }
            "fixed" => {
                let name = self.declare_name(obj, ns)?;
                let size = obj
                    .get("size")
                    .and_then(Value::as_u64)
                    .ok_or_else(|| SchemaError::Parse(format!("fixed {} missing 'size'", name.fullname())))?;
                // sizes are 32-bit signed on the wire
                let size = usize::try_from(size)
                    .ok()
                    .filter(|s| *s <= i32::MAX as usize)
                    .ok_or_else(|| SchemaError::Parse(format!("fixed {} size {} is too large", name.fullname(), size)))?;
                let annotation = annotation.filter(|a| a.applies_to("fixed"));
                if let Some(Annotation::Decimal { precision, .. }) = &annotation {
                    let max = max_fixed_precision(size);
                    if *precision > max {
                        return Err(SchemaError::Parse(format!(
                            "fixed({}) cannot store {} digits (max {})",
                            size, precision, max
                        )));
                    }
                }
                let schema = ExternalSchema::Fixed {
                    name: name.clone(),
                    size,
                    annotation,
                };
                self.register(&name, schema)
            }
            "array" => {
                let items = obj
                    .get("items")
                    .ok_or_else(|| SchemaError::Parse("array missing 'items'".into()))?;
                Ok(ExternalSchema::Array(Box::new(self.parse(items, ns)?)))
            }
            "map" => {
                let values = obj
                    .get("values")
                    .ok_or_else(|| SchemaError::Parse("map missing 'values'".into()))?;
                Ok(ExternalSchema::Map(Box::new(self.parse(values, ns)?)))
            }
            other => match primitive(other, annotation) {
                Some(schema) => Ok(schema),
                None => self.parse_reference(other, ns),
            },
        }
    }

    fn parse_record(&mut self, obj: &Map<String, Value>, ns: Option<&str>) -> Result<ExternalSchema> {
        let name = self.declare_name(obj, ns)?;
        let fullname = name.fullname();
        let fields_value = obj
            .get("fields")
            .and_then(Value::as_array)
            .ok_or_else(|| SchemaError::Parse(format!("record {} missing 'fields'", fullname)))?;

        self.pending.insert(fullname.clone());
        let mut field_names = HashSet::new();
        let mut fields = Vec::with_capacity(fields_value.len());
        for field in fields_value {
            let field_name = field
                .get("name")
                .and_then(Value::as_str)
                .ok_or_else(|| SchemaError::Parse(format!("field of record {} missing 'name'", fullname)))?;
            if !name_pattern().is_match(field_name) {
                return Err(SchemaError::Parse(format!("invalid field name '{}'", field_name)));
            }
            if !field_names.insert(field_name.to_string()) {
                return Err(SchemaError::Parse(format!(
                    "duplicate field '{}' in record {}",
                    field_name, fullname
                )));
            }
            let field_type = field
                .get("type")
                .ok_or_else(|| SchemaError::Parse(format!("field '{}' missing 'type'", field_name)))?;
            let schema = self.parse(field_type, name.namespace.as_deref())?;
            fields.push(RecordField {
                name: field_name.to_string(),
                schema,
                default: field.get("default").cloned(),
            });
        }
        self.pending.remove(&fullname);

        let record = ExternalSchema::Record(RecordSchema {
            name: name.clone(),
            doc: obj.get("doc").and_then(Value::as_str).map(String::from),
            fields,
        });
        self.register(&name, record)
    }

    fn declare_name(&self, obj: &Map<String, Value>, ns: Option<&str>) -> Result<Name> {
        let raw = obj
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| SchemaError::Parse("named type missing 'name'".into()))?;
        let explicit_ns = obj.get("namespace").and_then(Value::as_str);
        let name = Name::qualified(raw, explicit_ns, ns);
        validate_name(&name)?;
        if PRIMITIVES.contains(&name.name.as_str()) && name.namespace.is_none() {
            return Err(SchemaError::Parse(format!("'{}' cannot be redefined", raw)));
        }
        Ok(name)
    }

    /// Record a completed named type; an identical redefinition is tolerated
    fn register(&mut self, name: &Name, schema: ExternalSchema) -> Result<ExternalSchema> {
        let fullname = name.fullname();
        if let Some(existing) = self.named.get(&fullname) {
            if *existing != schema {
                return Err(SchemaError::Parse(format!(
                    "conflicting definitions for named type {}",
                    fullname
                )));
            }
        }
        self.named.insert(fullname, schema.clone());
        Ok(schema)
    }
}

fn primitive(name: &str, annotation: Option<Annotation>) -> Option<ExternalSchema> {
    let annotation = annotation.filter(|a| a.applies_to(name));
    Some(match name {
        "null" => ExternalSchema::Null,
        "boolean" => ExternalSchema::Boolean,
        "int" => ExternalSchema::Int(annotation),
        "long" => ExternalSchema::Long(annotation),
        "float" => ExternalSchema::Float,
        "double" => ExternalSchema::Double,
        "bytes" => ExternalSchema::Bytes(annotation),
        "string" => ExternalSchema::String(annotation),
        _ => return None,
    })
}

/// Read the `logicalType` attribute. Unknown logical types are ignored, as
/// the Avro specification requires; a malformed decimal is an error.
fn parse_annotation(obj: &Map<String, Value>) -> Result<Option<Annotation>> {
    let Some(logical) = obj.get("logicalType").and_then(Value::as_str) else {
        return Ok(None);
    };
    let annotation = match logical {
        "decimal" => {
            let precision = obj
                .get("precision")
                .and_then(Value::as_u64)
                .filter(|p| *p > 0)
                .ok_or_else(|| SchemaError::Parse("decimal requires a positive 'precision'".into()))?;
            let scale = obj.get("scale").and_then(Value::as_u64).unwrap_or(0);
            if scale > precision {
                return Err(SchemaError::Parse(format!(
                    "decimal scale {} exceeds precision {}",
                    scale, precision
                )));
            }
            let precision = u32::try_from(precision)
                .map_err(|_| SchemaError::Parse(format!("decimal precision {} out of range", precision)))?;
            Annotation::Decimal {
                precision,
                scale: scale as u32,
            }
        }
        "date" => Annotation::Date,
        "time-millis" => Annotation::TimeMillis,
        "time-micros" => Annotation::TimeMicros,
        "timestamp-millis" => Annotation::TimestampMillis,
        "timestamp-micros" => Annotation::TimestampMicros,
        "local-timestamp-millis" => Annotation::LocalTimestampMillis,
        "local-timestamp-micros" => Annotation::LocalTimestampMicros,
        "uuid" => Annotation::Uuid,
        _ => return Ok(None),
    };
    Ok(Some(annotation))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_primitives_and_annotations() {
        assert_eq!(ExternalSchema::parse_str(r#""string""#).unwrap(), ExternalSchema::String(None));
        assert_eq!(
            ExternalSchema::parse_str(r#"{"type": "long", "logicalType": "timestamp-micros"}"#).unwrap(),
            ExternalSchema::Long(Some(Annotation::TimestampMicros))
        );
        // annotation on the wrong physical type is ignored
        assert_eq!(
            ExternalSchema::parse_str(r#"{"type": "int", "logicalType": "timestamp-millis"}"#).unwrap(),
            ExternalSchema::Int(None)
        );
        assert_eq!(
            ExternalSchema::parse_str(r#"{"type": "int", "logicalType": "made-up"}"#).unwrap(),
            ExternalSchema::Int(None)
        );
    }

    #[test]
    fn test_parse_record_with_reference() {
        let schema = ExternalSchema::parse_str(
            r#"{
                "type": "record",
                "name": "Trade",
                "namespace": "markets",
                "fields": [
                    {"name": "price", "type": {"type": "fixed", "name": "Money", "size": 8,
                                                "logicalType": "decimal", "precision": 12, "scale": 2}},
                    {"name": "fee", "type": "Money"}
                ]
            }"#,
        )
        .unwrap();
        let ExternalSchema::Record(record) = schema else {
            panic!("expected record");
        };
        assert_eq!(record.name.fullname(), "markets.Trade");
        assert_eq!(record.fields[0].schema, record.fields[1].schema);
        match &record.fields[1].schema {
            ExternalSchema::Fixed { name, size, .. } => {
                assert_eq!(name.fullname(), "markets.Money");
                assert_eq!(*size, 8);
            }
            other => panic!("expected fixed, got {:?}", other),
        }
    }

    #[test]
    fn test_conflicting_record_definitions_rejected() {
        let result = ExternalSchema::parse_str(
            r#"{
                "type": "record", "name": "Outer", "fields": [
                    {"name": "a", "type": {"type": "record", "name": "Inner", "fields": [{"name": "x", "type": "int"}]}},
                    {"name": "b", "type": {"type": "record", "name": "Inner", "fields": [{"name": "y", "type": "int"}]}}
                ]
            }"#,
        );
        assert!(matches!(result, Err(SchemaError::Parse(_))));
    }

    #[test]
    fn test_recursive_record_keeps_reference() {
        let schema = ExternalSchema::parse_str(
            r#"{"type": "record", "name": "Node", "fields": [
                {"name": "next", "type": ["null", "Node"]}
            ]}"#,
        )
        .unwrap();
        let ExternalSchema::Record(record) = schema else {
            panic!("expected record");
        };
        assert_eq!(
            record.fields[0].schema,
            ExternalSchema::Union(vec![ExternalSchema::Null, ExternalSchema::Ref(Name::new("Node"))])
        );
    }

    #[test]
    fn test_malformed_documents() {
        assert!(ExternalSchema::parse_str("{not json").is_err());
        assert!(ExternalSchema::parse_str(r#"[]"#).is_err());
        assert!(ExternalSchema::parse_str(r#"["null", ["int"]]"#).is_err());
        assert!(ExternalSchema::parse_str(r#"["int", "int"]"#).is_err());
        assert!(ExternalSchema::parse_str(r#"{"type": "record", "name": "bad-name", "fields": []}"#).is_err());
        assert!(ExternalSchema::parse_str(r#""Unknown""#).is_err());
        assert!(ExternalSchema::parse_str(
            r#"{"type": "bytes", "logicalType": "decimal", "precision": 2, "scale": 3}"#
        )
        .is_err());
        assert!(ExternalSchema::parse_str(
            r#"{"type": "fixed", "name": "Tiny", "size": 2, "logicalType": "decimal", "precision": 9}"#
        )
        .is_err());
        assert!(matches!(
            ExternalSchema::parse_str(
                r#"{"type": "fixed", "name": "Huge", "size": 4611686018427387904, "logicalType": "decimal", "precision": 5}"#
            ),
            Err(SchemaError::Parse(_))
        ));
    }

    #[test]
    fn test_builder_and_json_output() {
        let record = RecordBuilder::new("user")
            .field("name", ExternalSchema::String(None))
            .nullable_field("age", ExternalSchema::Union(vec![ExternalSchema::Null, ExternalSchema::Int(None)]))
            .build();
        assert_eq!(
            record.to_json(),
            json!({
                "type": "record",
                "name": "user",
                "fields": [
                    {"name": "name", "type": "string"},
                    {"name": "age", "type": ["null", "int"], "default": null}
                ]
            })
        );
        assert_eq!(ExternalSchema::parse_value(&record.to_json()).unwrap(), record);
        assert!(record.to_avro().is_ok());
    }

    #[test]
    fn test_repeated_named_type_written_as_reference() {
        let money = ExternalSchema::Fixed {
            name: Name::new("Money"),
            size: 8,
            annotation: None,
        };
        let record = RecordBuilder::new("Pair")
            .field("a", money.clone())
            .field("b", money)
            .build();
        let json = record.to_json();
        assert_eq!(json["fields"][1]["type"], json!("Money"));
        assert!(record.to_avro().is_ok());
    }

    #[test]
    fn test_max_fixed_precision() {
        assert_eq!(max_fixed_precision(1), 2);
        assert_eq!(max_fixed_precision(8), 18);
        assert_eq!(max_fixed_precision(16), 38);
        assert!(max_fixed_precision(usize::MAX) > 38);
    }
}
