//! Destination table formats.

pub mod parquet;
