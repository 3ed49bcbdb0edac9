//! Error types for the EVCF merge library.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for EVCF operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while decoding EVCF files or writing the merged table.
#[derive(Debug, Error)]
pub enum Error {
    /// Missing or inconsistent run configuration (no output, no inputs)
    #[error("Configuration error: {0}")]
    Config(String),

    /// An input file could not be opened or its header is invalid
    #[error("Cannot open input {index}/{total}: {}: {source}", path.display())]
    InputOpen {
        index: usize,
        total: usize,
        path: PathBuf,
        #[source]
        source: Box<Error>,
    },

    /// Invalid EVCF file format (e.g., wrong magic bytes, unsupported version)
    #[error("Invalid EVCF format: {0}")]
    InvalidFormat(String),

    /// Block decoding error (e.g., truncated block)
    #[error("Parse error: {0}")]
    Parse(String),

    /// Malformed field descriptors or a schema that differs between inputs
    #[error("Schema error: {0}")]
    Schema(String),

    /// Merge operation called in a state that does not allow it
    #[error("Invalid merge state: {0}")]
    State(String),

    /// Output error (Parquet or Arrow failure)
    #[error("Output error: {0}")]
    Output(String),

    /// I/O error occurred while reading or writing
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// UTF-8 decoding error in a name or comment
    #[error("UTF-8 error: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

impl From<parquet::errors::ParquetError> for Error {
    fn from(err: parquet::errors::ParquetError) -> Self {
        Error::Output(err.to_string())
    }
}

impl From<arrow::error::ArrowError> for Error {
    fn from(err: arrow::error::ArrowError) -> Self {
        Error::Output(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Output(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_open_names_file_and_index() {
        let err = Error::InputOpen {
            index: 2,
            total: 3,
            path: PathBuf::from("run_0002.evcf"),
            source: Box::new(Error::InvalidFormat("bad magic".to_string())),
        };
        let msg = err.to_string();
        assert!(msg.contains("2/3"));
        assert!(msg.contains("run_0002.evcf"));
        assert!(msg.contains("bad magic"));
    }
}
