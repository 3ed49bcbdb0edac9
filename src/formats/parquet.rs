use arrow::array::{ArrayRef, RecordBatch};
use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use log::{debug, info};
use parquet::arrow::ArrowWriter;
use parquet::basic::{BrotliLevel, Compression};
use parquet::file::metadata::KeyValue;
use parquet::file::properties::WriterProperties;
use std::collections::HashMap;
use std::fs::{create_dir_all, File};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::binder::{ColumnBuilder, TypedFieldBinder};
use crate::error::Result;
use crate::eventlog::Record;
use crate::models::{Codec, ColumnSpec, FormatCode, MergeOptions};

/// Arrow field metadata key holding a column's format code.
pub const FORMAT_METADATA_KEY: &str = "evcf.format";
/// Arrow field metadata key holding an array column's parent field.
pub const PARENT_METADATA_KEY: &str = "evcf.parent";

fn element_type(format: FormatCode) -> DataType {
    match format {
        FormatCode::U64 => DataType::UInt64,
        FormatCode::S64 => DataType::Int64,
        FormatCode::F64 => DataType::Float64,
    }
}

/// Arrow field for a column: a primitive for scalars, a list for array fields.
pub fn arrow_field(spec: &ColumnSpec) -> Field {
    let element = element_type(spec.format_code);
    let data_type = if spec.is_array() {
        DataType::List(Arc::new(Field::new("item", element, true)))
    } else {
        element
    };

    let mut metadata = HashMap::new();
    metadata.insert(
        FORMAT_METADATA_KEY.to_string(),
        spec.format_code.as_str().to_string(),
    );
    if let Some(parent) = &spec.parent {
        metadata.insert(PARENT_METADATA_KEY.to_string(), parent.clone());
    }

    Field::new(spec.name.as_str(), data_type, false).with_metadata(metadata)
}

pub fn arrow_schema(columns: &[ColumnSpec]) -> Schema {
    Schema::new(columns.iter().map(arrow_field).collect::<Vec<_>>())
}

fn compression(codec: Codec) -> Compression {
    match codec {
        Codec::None => Compression::UNCOMPRESSED,
        Codec::Snappy => Compression::SNAPPY,
        Codec::Lz4 => Compression::LZ4_RAW,
        Codec::Brotli => Compression::BROTLI(BrotliLevel::default()),
    }
}

/// Append-only Parquet table that rows are streamed into.
///
/// Rows are buffered in typed column builders. Each time `batch_size` rows
/// are pending, or on [`flush`](Self::flush), they are written out as one
/// row group. The file only becomes readable after [`finalize`](Self::finalize)
/// writes the footer.
pub struct ParquetTable {
    path: PathBuf,
    columns: Vec<ColumnSpec>,
    schema: SchemaRef,
    builders: Vec<ColumnBuilder>,
    writer: ArrowWriter<File>,
    batch_size: usize,
    pending_rows: usize,
    rows_written: u64,
}

impl ParquetTable {
    /// Create (or truncate) the output file with one column per spec.
    pub fn create<P: AsRef<Path>>(
        path: P,
        columns: Vec<ColumnSpec>,
        options: &MergeOptions,
    ) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            create_dir_all(parent)?;
        }

        let schema = Arc::new(arrow_schema(&columns));
        let builders = columns.iter().map(ColumnBuilder::for_spec).collect();

        let file = File::create(&path)?;
        let props = WriterProperties::builder()
            .set_compression(compression(options.compression))
            .build();
        let writer = ArrowWriter::try_new(file, schema.clone(), Some(props))?;

        Ok(Self {
            path,
            columns,
            schema,
            builders,
            writer,
            batch_size: options.batch_size.max(1),
            pending_rows: 0,
            rows_written: 0,
        })
    }

    pub fn columns(&self) -> &[ColumnSpec] {
        &self.columns
    }

    /// Store a named free-text record in the file's key-value metadata.
    pub fn write_metadata(&mut self, key: String, text: &str) {
        self.writer
            .append_key_value_metadata(KeyValue::new(key, text.to_string()));
    }

    /// Append one row holding the record's bound values.
    pub fn append_row(&mut self, binder: &TypedFieldBinder, record: &Record<'_>) -> Result<()> {
        binder.fill(record, &mut self.builders)?;
        self.pending_rows += 1;

        if self.pending_rows >= self.batch_size {
            self.write_pending()?;
        }
        Ok(())
    }

    fn write_pending(&mut self) -> Result<()> {
        if self.pending_rows == 0 {
            return Ok(());
        }

        let arrays: Vec<ArrayRef> = self.builders.iter_mut().map(ColumnBuilder::finish).collect();
        let batch = RecordBatch::try_new(self.schema.clone(), arrays)?;
        self.writer.write(&batch)?;
        self.writer.flush()?;

        debug!("Wrote row group of {} rows", self.pending_rows);
        self.rows_written += self.pending_rows as u64;
        self.pending_rows = 0;
        Ok(())
    }

    /// Write pending rows as a row group.
    pub fn flush(&mut self) -> Result<()> {
        self.write_pending()
    }

    /// Write remaining rows and the file footer, returning the total row count.
    pub fn finalize(mut self) -> Result<u64> {
        self.write_pending()?;
        self.writer.close()?;
        info!(
            "Finalized {} with {} rows in {} columns",
            self.path.display(),
            self.rows_written,
            self.columns.len()
        );
        Ok(self.rows_written)
    }
}
