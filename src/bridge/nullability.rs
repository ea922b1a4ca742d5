//! Nullability adapter
//!
//! Nullability is a flag on the logical side and a `["null", T]` union on the
//! external side. Wrapping always puts `null` first so that a record field can
//! carry a `null` default.

use crate::error::{Result, SchemaError};
use crate::schema::ExternalSchema;

/// How a union maps onto the logical model
#[derive(Debug, Clone, PartialEq)]
pub enum UnionShape<'a> {
    /// Exactly one member; unwrapped transparently
    Single(&'a ExternalSchema),
    /// `null` plus exactly one other member
    Nullable(&'a ExternalSchema),
    /// No faithful logical mapping; falls back to an opaque type
    Opaque { nullable: bool },
}

/// Classify the members of a union.
///
/// An [`UnionShape::Opaque`] union is nullable iff one of its members is
/// `null`, so `["null", "int", "string"]` becomes a nullable raw type and
/// `["int", "string"]` a non-null one. Reporting every opaque union as
/// non-null would drop the `null` branch from data that can carry it.
pub fn unwrap_union(members: &[ExternalSchema]) -> Result<UnionShape<'_>> {
    match members {
        [] => Err(SchemaError::unsupported("UNION", "union without members")),
        [only] => Ok(UnionShape::Single(only)),
        [a, b] => match (a.is_null(), b.is_null()) {
            (true, true) => Err(SchemaError::unsupported(
                "UNION",
                "union of two null members has no logical mapping",
            )),
            (true, false) => Ok(UnionShape::Nullable(b)),
            (false, true) => Ok(UnionShape::Nullable(a)),
            (false, false) => Ok(UnionShape::Opaque { nullable: false }),
        },
        many => Ok(UnionShape::Opaque {
            nullable: many.iter().any(ExternalSchema::is_null),
        }),
    }
}

/// Wrap `schema` in a null union when `nullable` is set
pub fn wrap(schema: ExternalSchema, nullable: bool) -> ExternalSchema {
    if !nullable || admits_null(&schema) {
        return schema;
    }
    ExternalSchema::Union(vec![ExternalSchema::Null, schema])
}

/// Whether the external schema already accepts `null`
pub fn admits_null(schema: &ExternalSchema) -> bool {
    match schema {
        ExternalSchema::Null => true,
        ExternalSchema::Union(members) => members.iter().any(ExternalSchema::is_null),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrap() {
        assert_eq!(
            wrap(ExternalSchema::Int(None), true),
            ExternalSchema::Union(vec![ExternalSchema::Null, ExternalSchema::Int(None)])
        );
        assert_eq!(wrap(ExternalSchema::Int(None), false), ExternalSchema::Int(None));
        assert_eq!(wrap(ExternalSchema::Null, true), ExternalSchema::Null);
    }

    #[test]
    fn test_unwrap_union_shapes() {
        let int = ExternalSchema::Int(None);
        let string = ExternalSchema::String(None);

        assert_eq!(unwrap_union(&[int.clone()]).unwrap(), UnionShape::Single(&int));
        assert_eq!(
            unwrap_union(&[ExternalSchema::Null, int.clone()]).unwrap(),
            UnionShape::Nullable(&int)
        );
        assert_eq!(
            unwrap_union(&[int.clone(), ExternalSchema::Null]).unwrap(),
            UnionShape::Nullable(&int)
        );
        assert_eq!(
            unwrap_union(&[int.clone(), string.clone()]).unwrap(),
            UnionShape::Opaque { nullable: false }
        );
        assert_eq!(
            unwrap_union(&[ExternalSchema::Null, int, string]).unwrap(),
            UnionShape::Opaque { nullable: true }
        );
    }

    #[test]
    fn test_degenerate_unions_rejected() {
        assert!(matches!(
            unwrap_union(&[ExternalSchema::Null, ExternalSchema::Null]),
            Err(SchemaError::UnsupportedType { .. })
        ));
        assert!(unwrap_union(&[]).is_err());
    }
}
