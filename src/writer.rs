//! High-level API for configuring and running a merge.

use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::merger::{MergeStats, StreamingMerger};
use crate::models::{Codec, MergeOptions};

/// Builder for configuring a merge of EVCF files into a Parquet table.
///
/// # Examples
///
/// ```no_run
/// use evcf_merge::{Codec, MergeBuilder};
///
/// let stats = MergeBuilder::new()
///     .output("merged.parquet")
///     .keep_comments(true)
///     .batch_size(100_000)
///     .compression(Codec::Lz4)
///     .merge(&["run_0001.evcf", "run_0002.evcf"])?;
///
/// println!("{}", stats.summary());
/// # Ok::<(), evcf_merge::Error>(())
/// ```
pub struct MergeBuilder {
    output: Option<PathBuf>,
    options: MergeOptions,
}

impl MergeBuilder {
    /// Create a new merge builder with default options.
    pub fn new() -> Self {
        Self {
            output: None,
            options: MergeOptions::default(),
        }
    }

    /// Set the output Parquet file path.
    pub fn output<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.output = Some(path.as_ref().to_path_buf());
        self
    }

    /// Relay the first input's comments into the output metadata.
    ///
    /// Default is false.
    pub fn keep_comments(mut self, keep: bool) -> Self {
        self.options.keep_comments = keep;
        self
    }

    /// Set the number of rows buffered before a row group is written.
    ///
    /// Default is 50,000 rows.
    pub fn batch_size(mut self, size: usize) -> Self {
        self.options.batch_size = size;
        self
    }

    /// Set the Parquet compression codec. Default is Snappy.
    pub fn compression(mut self, codec: Codec) -> Self {
        self.options.compression = codec;
        self
    }

    /// Build the merger.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if no output path was set or the batch size is zero.
    pub fn build(self) -> Result<StreamingMerger> {
        let output = self
            .output
            .filter(|p| !p.as_os_str().is_empty())
            .ok_or_else(|| Error::Config("no output file specified".to_string()))?;

        if self.options.batch_size == 0 {
            return Err(Error::Config("batch size must be at least 1".to_string()));
        }

        Ok(StreamingMerger::new(output, self.options))
    }

    /// Build the merger and merge `inputs` into the output file.
    pub fn merge<P: AsRef<Path>>(self, inputs: &[P]) -> Result<MergeStats> {
        if inputs.is_empty() {
            return Err(Error::Config("no input files specified".to_string()));
        }
        self.build()?.run(inputs)
    }
}

impl Default for MergeBuilder {
    fn default() -> Self {
        Self::new()
    }
}
