//! Streaming merge of EVCF inputs into one Parquet table.

use log::{error, info};
use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::binder::TypedFieldBinder;
use crate::comments::relay_comments;
use crate::error::{Error, Result};
use crate::formats::parquet::ParquetTable;
use crate::models::{ColumnSpec, MergeOptions};
use crate::reader::EventReader;
use crate::schema;

/// Externally visible phase of a [`StreamingMerger`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergePhase {
    /// No input opened yet, no output table
    Uninitialized,
    /// Output table exists, no input open
    SchemaEstablished,
    /// An input is open and bound, records are pending
    Draining,
    /// Output table written and closed
    Finalized,
    /// A fatal error stopped the run, output left without a footer
    Aborted,
}

enum MergeState {
    Uninitialized,
    SchemaEstablished {
        table: ParquetTable,
    },
    Draining {
        table: ParquetTable,
        reader: EventReader,
        binder: TypedFieldBinder,
    },
    Finalized,
    Aborted,
}

impl MergeState {
    fn phase(&self) -> MergePhase {
        match self {
            MergeState::Uninitialized => MergePhase::Uninitialized,
            MergeState::SchemaEstablished { .. } => MergePhase::SchemaEstablished,
            MergeState::Draining { .. } => MergePhase::Draining,
            MergeState::Finalized => MergePhase::Finalized,
            MergeState::Aborted => MergePhase::Aborted,
        }
    }
}

/// Record count of one merged input.
#[derive(Debug, Clone, Serialize)]
pub struct FileStats {
    pub path: PathBuf,
    pub entries: u64,
}

/// Statistics about a finished merge.
#[derive(Debug, Clone, Serialize)]
pub struct MergeStats {
    pub output: PathBuf,
    /// Total number of rows in the output table
    pub entries: u64,
    pub columns: Vec<ColumnSpec>,
    pub files: Vec<FileStats>,
    pub comments_written: usize,
}

impl MergeStats {
    /// Get a human-readable summary of the merge.
    pub fn summary(&self) -> String {
        format!(
            "Wrote Parquet file {}: {} entries",
            self.output.display(),
            self.entries
        )
    }
}

/// Merges a sequence of schema-identical EVCF files into one Parquet table.
///
/// The first opened input establishes the table schema (and optionally
/// relays its comments). Every later input is bound against that schema;
/// a file whose fields differ is rejected. Rows are appended in file order,
/// then record order.
///
/// # Examples
///
/// ```no_run
/// use evcf_merge::{MergeOptions, StreamingMerger};
///
/// let mut merger = StreamingMerger::new("merged.parquet", MergeOptions::default());
/// let stats = merger.run(&["run_0001.evcf", "run_0002.evcf"])?;
/// println!("{}", stats.summary());
/// # Ok::<(), evcf_merge::Error>(())
/// ```
pub struct StreamingMerger {
    output: PathBuf,
    options: MergeOptions,
    state: MergeState,
    total_inputs: usize,
    files_opened: usize,
    entry_count: u64,
    files: Vec<FileStats>,
    comments_written: usize,
}

impl StreamingMerger {
    pub fn new<P: AsRef<Path>>(output: P, options: MergeOptions) -> Self {
        Self {
            output: output.as_ref().to_path_buf(),
            options,
            state: MergeState::Uninitialized,
            total_inputs: 0,
            files_opened: 0,
            entry_count: 0,
            files: Vec::new(),
            comments_written: 0,
        }
    }

    pub fn phase(&self) -> MergePhase {
        self.state.phase()
    }

    /// Rows appended so far across all inputs.
    pub fn entry_count(&self) -> u64 {
        self.entry_count
    }

    /// Columns of the output table, once established.
    pub fn columns(&self) -> Option<&[ColumnSpec]> {
        match &self.state {
            MergeState::SchemaEstablished { table } | MergeState::Draining { table, .. } => {
                Some(table.columns())
            }
            _ => None,
        }
    }

    /// Declare how many inputs will be merged, for progress reporting.
    pub fn expect_inputs(&mut self, total: usize) {
        self.total_inputs = total;
    }

    /// Merge all inputs in order and finalize the table.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if `inputs` is empty. Any input failing to
    /// open aborts the run; rows from earlier inputs stay in the unfinalized
    /// output file.
    pub fn run<P: AsRef<Path>>(&mut self, inputs: &[P]) -> Result<MergeStats> {
        if inputs.is_empty() {
            return Err(Error::Config("no input files specified".to_string()));
        }
        self.expect_inputs(inputs.len());

        for input in inputs {
            self.merge_file(input)?;
        }
        self.finish()
    }

    /// Open, bind and drain one input.
    pub fn merge_file<P: AsRef<Path>>(&mut self, path: P) -> Result<u64> {
        self.open_input(path)?;
        self.drain()
    }

    /// Open the next input and bind its fields to the output columns.
    ///
    /// On the first input this creates the output table from the input's
    /// schema and relays its comments. A failure to open or bind the input
    /// aborts the run: the merger moves to [`MergePhase::Aborted`] and the
    /// output table is dropped without a footer.
    pub fn open_input<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let path = path.as_ref();
        let index = self.files_opened + 1;
        let total = self.total_inputs.max(index);

        let table = match std::mem::replace(&mut self.state, MergeState::Aborted) {
            MergeState::Uninitialized => None,
            MergeState::SchemaEstablished { table } => Some(table),
            other => {
                let phase = other.phase();
                self.state = other;
                return Err(Error::State(format!(
                    "cannot open {} while {:?}",
                    path.display(),
                    phase
                )));
            }
        };

        info!("Reading {}/{}: {}", index, total, path.display());
        let reader = EventReader::open(path).map_err(|err| {
            error!("Cannot open {}", path.display());
            Error::InputOpen {
                index,
                total,
                path: path.to_path_buf(),
                source: Box::new(err),
            }
        })?;
        self.files_opened = index;

        let table = match table {
            Some(table) => table,
            None => self.establish_schema(&reader)?,
        };

        let binder = TypedFieldBinder::bind(table.columns(), reader.field_descriptors())
            .map_err(|err| match err {
                Error::Schema(msg) => Error::Schema(format!(
                    "input {}/{} {} does not match the table schema: {}",
                    index,
                    total,
                    path.display(),
                    msg
                )),
                other => other,
            })?;

        self.state = MergeState::Draining {
            table,
            reader,
            binder,
        };
        Ok(())
    }

    fn establish_schema(&mut self, reader: &EventReader) -> Result<ParquetTable> {
        let columns = schema::translate(reader.field_descriptors())?;
        for column in &columns {
            info!("Creating column: {} \"{}\"", column.name, column.description());
        }

        let mut table = ParquetTable::create(&self.output, columns, &self.options)?;
        self.comments_written =
            relay_comments(reader.comments(), self.options.keep_comments, &mut table);
        Ok(table)
    }

    /// Append every record of the open input, then close it.
    ///
    /// Returns the number of records read from this input. Pending rows are
    /// written as a row group before the input is closed. A decode or write
    /// error aborts the run, discarding the rows of this input that were
    /// not yet written.
    pub fn drain(&mut self) -> Result<u64> {
        let (mut table, mut reader, binder) =
            match std::mem::replace(&mut self.state, MergeState::Aborted) {
                MergeState::Draining {
                    table,
                    reader,
                    binder,
                } => (table, reader, binder),
                other => {
                    let phase = other.phase();
                    self.state = other;
                    return Err(Error::State(format!("no input open while {:?}", phase)));
                }
            };

        let entries = drain_records(&mut reader, &mut table, &binder)?;
        table.flush()?;
        self.entry_count += entries;

        let path = reader.path().map(Path::to_path_buf).unwrap_or_default();
        drop(reader);
        self.state = MergeState::SchemaEstablished { table };

        info!("Read {} entries from {}", entries, path.display());
        self.files.push(FileStats { path, entries });
        Ok(entries)
    }

    /// Write the remaining rows and the file footer.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if no input was merged and [`Error::State`]
    /// if an input is still open, the run was aborted or the table was
    /// already finalized.
    pub fn finish(&mut self) -> Result<MergeStats> {
        match std::mem::replace(&mut self.state, MergeState::Aborted) {
            MergeState::SchemaEstablished { table } => {
                let columns = table.columns().to_vec();
                let rows = table.finalize()?;
                debug_assert_eq!(rows, self.entry_count);
                self.state = MergeState::Finalized;

                Ok(MergeStats {
                    output: self.output.clone(),
                    entries: self.entry_count,
                    columns,
                    files: std::mem::take(&mut self.files),
                    comments_written: self.comments_written,
                })
            }
            MergeState::Uninitialized => {
                self.state = MergeState::Uninitialized;
                Err(Error::Config("no input files were merged".to_string()))
            }
            other => {
                let phase = other.phase();
                self.state = other;
                Err(Error::State(format!("cannot finalize while {:?}", phase)))
            }
        }
    }
}

fn drain_records(
    reader: &mut EventReader,
    table: &mut ParquetTable,
    binder: &TypedFieldBinder,
) -> Result<u64> {
    let mut entries = 0;
    while let Some(record) = reader.next_record()? {
        table.append_row(binder, &record)?;
        entries += 1;
    }
    Ok(entries)
}
