//! Binding of decoded record fields to output column builders.

use arrow::array::{ArrayBuilder, ArrayRef, Float64Builder, Int64Builder, ListBuilder, UInt64Builder};
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::eventlog::Record;
use crate::models::{ColumnSpec, FieldDescriptor, FieldValues, FormatCode};
use crate::schema::column_spec;

/// Typed Arrow builder for one output column.
pub enum ColumnBuilder {
    U64(UInt64Builder),
    S64(Int64Builder),
    F64(Float64Builder),
    U64List(ListBuilder<UInt64Builder>),
    S64List(ListBuilder<Int64Builder>),
    F64List(ListBuilder<Float64Builder>),
}

impl ColumnBuilder {
    pub fn for_spec(spec: &ColumnSpec) -> Self {
        match (spec.format_code, spec.is_array()) {
            (FormatCode::U64, false) => ColumnBuilder::U64(UInt64Builder::new()),
            (FormatCode::S64, false) => ColumnBuilder::S64(Int64Builder::new()),
            (FormatCode::F64, false) => ColumnBuilder::F64(Float64Builder::new()),
            (FormatCode::U64, true) => ColumnBuilder::U64List(ListBuilder::new(UInt64Builder::new())),
            (FormatCode::S64, true) => ColumnBuilder::S64List(ListBuilder::new(Int64Builder::new())),
            (FormatCode::F64, true) => ColumnBuilder::F64List(ListBuilder::new(Float64Builder::new())),
        }
    }

    /// Append one record's values for this column.
    ///
    /// Scalar columns take the first value, array columns take the whole slice.
    pub fn append(&mut self, values: FieldValues<'_>) -> Result<()> {
        match (self, values) {
            (ColumnBuilder::U64(b), FieldValues::Unsigned(v)) => b.append_value(first(v)?),
            (ColumnBuilder::S64(b), FieldValues::Signed(v)) => b.append_value(first(v)?),
            (ColumnBuilder::F64(b), FieldValues::Float(v)) => b.append_value(first(v)?),
            (ColumnBuilder::U64List(b), FieldValues::Unsigned(v)) => {
                b.values().append_slice(v);
                b.append(true);
            }
            (ColumnBuilder::S64List(b), FieldValues::Signed(v)) => {
                b.values().append_slice(v);
                b.append(true);
            }
            (ColumnBuilder::F64List(b), FieldValues::Float(v)) => {
                b.values().append_slice(v);
                b.append(true);
            }
            (_, values) => {
                return Err(Error::Schema(format!(
                    "{:?} values cannot be stored in this column",
                    values.type_tag()
                )))
            }
        }
        Ok(())
    }

    /// Number of rows appended since the last [`finish`](Self::finish).
    pub fn len(&self) -> usize {
        match self {
            ColumnBuilder::U64(b) => b.len(),
            ColumnBuilder::S64(b) => b.len(),
            ColumnBuilder::F64(b) => b.len(),
            ColumnBuilder::U64List(b) => b.len(),
            ColumnBuilder::S64List(b) => b.len(),
            ColumnBuilder::F64List(b) => b.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Build the array of appended rows and reset the builder.
    pub fn finish(&mut self) -> ArrayRef {
        match self {
            ColumnBuilder::U64(b) => Arc::new(b.finish()),
            ColumnBuilder::S64(b) => Arc::new(b.finish()),
            ColumnBuilder::F64(b) => Arc::new(b.finish()),
            ColumnBuilder::U64List(b) => Arc::new(b.finish()),
            ColumnBuilder::S64List(b) => Arc::new(b.finish()),
            ColumnBuilder::F64List(b) => Arc::new(b.finish()),
        }
    }
}

fn first<T: Copy>(values: &[T]) -> Result<T> {
    values
        .first()
        .copied()
        .ok_or_else(|| Error::Parse("scalar field has no value".to_string()))
}

/// Maps the fields of an open input onto the established output columns.
///
/// Binding only succeeds when the input declares exactly the table's
/// columns in the same order, so record field `i` always feeds column `i`.
/// A binder belongs to one open input: it is created after the file is
/// opened and must be recreated for the next file.
#[derive(Debug, Clone)]
pub struct TypedFieldBinder {
    column_count: usize,
}

impl TypedFieldBinder {
    /// Bind an input's fields to the established columns.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Schema`] if the input's fields differ from the columns
    /// in count, order, name, parent or type.
    pub fn bind(columns: &[ColumnSpec], descriptors: &[FieldDescriptor]) -> Result<Self> {
        if columns.len() != descriptors.len() {
            return Err(Error::Schema(format!(
                "input declares {} fields, table has {} columns",
                descriptors.len(),
                columns.len()
            )));
        }

        for (idx, (column, descriptor)) in columns.iter().zip(descriptors).enumerate() {
            let expected = column_spec(descriptor);
            if &expected != column {
                return Err(Error::Schema(format!(
                    "field #{} is {} ({:?}), table column is {} ({:?})",
                    idx, expected.name, expected.type_tag, column.name, column.type_tag
                )));
            }
        }

        Ok(Self {
            column_count: columns.len(),
        })
    }

    pub fn column_count(&self) -> usize {
        self.column_count
    }

    /// Copy the current record's values into the column builders.
    pub fn fill(&self, record: &Record<'_>, builders: &mut [ColumnBuilder]) -> Result<()> {
        if builders.len() != self.column_count {
            return Err(Error::Schema(format!(
                "binder has {} columns, table has {} builders",
                self.column_count,
                builders.len()
            )));
        }
        for (idx, builder) in builders.iter_mut().enumerate() {
            let values = record
                .field(idx)
                .ok_or_else(|| Error::Schema(format!("record has no field #{}", idx)))?;
            builder.append(values)?;
        }
        Ok(())
    }
}
