use serde::{Deserialize, Serialize};

/// Value kind of a source field, as declared in the EVCF header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TypeTag {
    UnsignedInteger,
    SignedInteger,
    FloatingPoint,
}

impl TypeTag {
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(TypeTag::UnsignedInteger),
            1 => Some(TypeTag::SignedInteger),
            2 => Some(TypeTag::FloatingPoint),
            _ => None,
        }
    }

    pub fn code(self) -> u8 {
        match self {
            TypeTag::UnsignedInteger => 0,
            TypeTag::SignedInteger => 1,
            TypeTag::FloatingPoint => 2,
        }
    }
}

/// Storage format of a destination column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FormatCode {
    U64,
    S64,
    F64,
}

impl FormatCode {
    /// Leaf type suffix used in column descriptions (`l`, `L`, `D`).
    pub fn leaf_code(self) -> char {
        match self {
            FormatCode::U64 => 'l',
            FormatCode::S64 => 'L',
            FormatCode::F64 => 'D',
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FormatCode::U64 => "U64",
            FormatCode::S64 => "S64",
            FormatCode::F64 => "F64",
        }
    }
}

impl From<TypeTag> for FormatCode {
    fn from(tag: TypeTag) -> Self {
        match tag {
            TypeTag::UnsignedInteger => FormatCode::U64,
            TypeTag::SignedInteger => FormatCode::S64,
            TypeTag::FloatingPoint => FormatCode::F64,
        }
    }
}

/// One named, typed value channel of the source format.
///
/// An empty `parent_name` means the field is a scalar. Otherwise the field is a
/// variable-length array whose length, per record, is the parent field's value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    pub name: String,
    pub parent_name: String,
    pub type_tag: TypeTag,
}

impl FieldDescriptor {
    pub fn new(name: impl Into<String>, parent_name: impl Into<String>, type_tag: TypeTag) -> Self {
        Self {
            name: name.into(),
            parent_name: parent_name.into(),
            type_tag,
        }
    }

    pub fn is_array(&self) -> bool {
        !self.parent_name.is_empty()
    }
}

/// A destination column derived from a [`FieldDescriptor`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub name: String,
    pub type_tag: TypeTag,
    pub format_code: FormatCode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
}

impl ColumnSpec {
    pub fn is_array(&self) -> bool {
        self.parent.is_some()
    }

    /// Column description in `name/l` notation, e.g. `pe[hit]/D`.
    pub fn description(&self) -> String {
        format!("{}/{}", self.name, self.format_code.leaf_code())
    }
}

/// The values of one field in one decoded record.
///
/// Scalars are one-element slices. Array fields carry as many elements as the
/// parent field's value for that record.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldValues<'a> {
    Unsigned(&'a [u64]),
    Signed(&'a [i64]),
    Float(&'a [f64]),
}

impl<'a> FieldValues<'a> {
    pub fn len(&self) -> usize {
        match self {
            FieldValues::Unsigned(v) => v.len(),
            FieldValues::Signed(v) => v.len(),
            FieldValues::Float(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn type_tag(&self) -> TypeTag {
        match self {
            FieldValues::Unsigned(_) => TypeTag::UnsignedInteger,
            FieldValues::Signed(_) => TypeTag::SignedInteger,
            FieldValues::Float(_) => TypeTag::FloatingPoint,
        }
    }
}

/// Parquet compression codec for the merged table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum Codec {
    None,
    #[default]
    Snappy,
    Lz4,
    Brotli,
}

/// Options controlling how the merged table is written.
#[derive(Debug, Clone)]
pub struct MergeOptions {
    /// Relay comments from the first input into the output metadata
    pub keep_comments: bool,
    /// Maximum number of rows buffered before a row group is written
    pub batch_size: usize,
    pub compression: Codec,
}

impl Default for MergeOptions {
    fn default() -> Self {
        Self {
            keep_comments: false,
            batch_size: 50_000,
            compression: Codec::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_tag_codes() {
        for tag in [
            TypeTag::UnsignedInteger,
            TypeTag::SignedInteger,
            TypeTag::FloatingPoint,
        ] {
            assert_eq!(TypeTag::from_code(tag.code()), Some(tag));
        }
        assert_eq!(TypeTag::from_code(3), None);
    }

    #[test]
    fn test_leaf_codes() {
        assert_eq!(FormatCode::U64.leaf_code(), 'l');
        assert_eq!(FormatCode::S64.leaf_code(), 'L');
        assert_eq!(FormatCode::F64.leaf_code(), 'D');
    }
}
