//! Translation of source field descriptors into destination column specs.

use std::collections::HashSet;

use crate::error::{Error, Result};
use crate::models::{ColumnSpec, FieldDescriptor, FormatCode};

/// Column name for a field: `name`, or `name[parent]` for an array field.
pub fn column_name(name: &str, parent_name: &str) -> String {
    if parent_name.is_empty() {
        name.to_string()
    } else {
        format!("{}[{}]", name, parent_name)
    }
}

/// Derive the column spec for one field descriptor.
pub fn column_spec(descriptor: &FieldDescriptor) -> ColumnSpec {
    ColumnSpec {
        name: column_name(&descriptor.name, &descriptor.parent_name),
        type_tag: descriptor.type_tag,
        format_code: FormatCode::from(descriptor.type_tag),
        parent: descriptor
            .is_array()
            .then(|| descriptor.parent_name.clone()),
    }
}

/// Translate the source schema into destination columns, preserving declaration order.
///
/// # Errors
///
/// Returns [`Error::Schema`] if there are no fields, a field has an empty
/// name, or two fields map to the same column name.
pub fn translate(descriptors: &[FieldDescriptor]) -> Result<Vec<ColumnSpec>> {
    if descriptors.is_empty() {
        return Err(Error::Schema("input declares no fields".to_string()));
    }

    let mut names = HashSet::with_capacity(descriptors.len());
    let mut columns = Vec::with_capacity(descriptors.len());

    for (idx, descriptor) in descriptors.iter().enumerate() {
        if descriptor.name.is_empty() {
            return Err(Error::Schema(format!("field #{} has an empty name", idx)));
        }

        let spec = column_spec(descriptor);
        if !names.insert(spec.name.clone()) {
            return Err(Error::Schema(format!("duplicate column '{}'", spec.name)));
        }
        columns.push(spec);
    }

    Ok(columns)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TypeTag;

    #[test]
    fn test_hierarchical_column_name() {
        let spec = column_spec(&FieldDescriptor::new("pe", "hit", TypeTag::FloatingPoint));
        assert_eq!(spec.name, "pe[hit]");
        assert_eq!(spec.format_code, FormatCode::F64);
        assert_eq!(spec.parent.as_deref(), Some("hit"));
        assert_eq!(spec.description(), "pe[hit]/D");
    }

    #[test]
    fn test_scalar_column_name() {
        let spec = column_spec(&FieldDescriptor::new("energy", "", TypeTag::UnsignedInteger));
        assert_eq!(spec.name, "energy");
        assert_eq!(spec.format_code, FormatCode::U64);
        assert!(spec.parent.is_none());
        assert_eq!(spec.description(), "energy/l");
    }

    #[test]
    fn test_signed_maps_to_s64() {
        let spec = column_spec(&FieldDescriptor::new("dt", "", TypeTag::SignedInteger));
        assert_eq!(spec.format_code, FormatCode::S64);
    }

    #[test]
    fn test_translate_keeps_order() {
        let columns = translate(&[
            FieldDescriptor::new("nhit", "", TypeTag::UnsignedInteger),
            FieldDescriptor::new("pe", "nhit", TypeTag::FloatingPoint),
            FieldDescriptor::new("dt", "", TypeTag::SignedInteger),
        ])
        .unwrap();
        let names: Vec<_> = columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["nhit", "pe[nhit]", "dt"]);
    }

    #[test]
    fn test_translate_rejects_empty_schema() {
        assert!(matches!(translate(&[]), Err(Error::Schema(_))));
    }

    #[test]
    fn test_translate_rejects_empty_name() {
        let result = translate(&[FieldDescriptor::new("", "", TypeTag::FloatingPoint)]);
        assert!(matches!(result, Err(Error::Schema(_))));
    }

    #[test]
    fn test_translate_rejects_colliding_names() {
        // "a[b]" as a literal scalar name collides with field a under parent b
        let result = translate(&[
            FieldDescriptor::new("b", "", TypeTag::UnsignedInteger),
            FieldDescriptor::new("a", "b", TypeTag::FloatingPoint),
            FieldDescriptor::new("a[b]", "", TypeTag::FloatingPoint),
        ]);
        assert!(matches!(result, Err(Error::Schema(_))));
    }
}
