//! # EVCF Merge
//!
//! A Rust library for merging self-describing columnar event files (`.evcf`)
//! into a single flat Apache Parquet table.
//!
//! ## Features
//!
//! - **Schema-driven**: the output columns are derived from the field
//!   descriptors of the first input, at runtime
//! - **Streaming**: records are decoded block by block from memory-mapped
//!   inputs and appended to the table in bounded row groups
//! - **Typed**: unsigned, signed and floating-point fields map to `UInt64`,
//!   `Int64` and `Float64` columns
//! - **Hierarchical fields**: array fields are stored as list columns named
//!   `name[parent]`, their length given by the parent field
//! - **Checked**: every later input must carry exactly the same schema
//!
//! ## Quick Start
//!
//! ```no_run
//! use evcf_merge::MergeBuilder;
//!
//! let stats = MergeBuilder::new()
//!     .output("merged.parquet")
//!     .merge(&["run_0001.evcf", "run_0002.evcf", "run_0003.evcf"])?;
//!
//! println!("{}", stats.summary());
//! # Ok::<(), evcf_merge::Error>(())
//! ```
//!
//! ## Step-by-step merging
//!
//! [`StreamingMerger`] exposes the individual steps (open, drain, finish)
//! and its current [`MergePhase`]:
//!
//! ```no_run
//! use evcf_merge::{MergeOptions, StreamingMerger};
//!
//! let mut merger = StreamingMerger::new("merged.parquet", MergeOptions::default());
//! merger.open_input("run_0001.evcf")?;
//! let n = merger.drain()?;
//! println!("first file: {} entries", n);
//!
//! merger.merge_file("run_0002.evcf")?;
//! let stats = merger.finish()?;
//! println!("total: {} entries", stats.entries);
//! # Ok::<(), evcf_merge::Error>(())
//! ```
//!
//! ## Error Handling
//!
//! ```no_run
//! use evcf_merge::{Error, MergeBuilder};
//!
//! match MergeBuilder::new().output("out.parquet").merge(&["a.evcf", "b.evcf"]) {
//!     Ok(stats) => println!("{}", stats.summary()),
//!     Err(Error::InputOpen { index, path, .. }) => {
//!         eprintln!("input {} ({}) could not be opened", index, path.display());
//!     }
//!     Err(Error::Schema(msg)) => eprintln!("schema mismatch: {}", msg),
//!     Err(err) => eprintln!("Error: {}", err),
//! }
//! ```

// Public API modules
pub mod error;
pub mod merger;
pub mod reader;
pub mod writer;

// Re-export commonly used types
pub use error::{Error, Result};
pub use merger::{FileStats, MergePhase, MergeStats, StreamingMerger};
pub use reader::EventReader;
pub use writer::MergeBuilder;

// Re-export models for users who need them
pub use models::{Codec, ColumnSpec, FieldDescriptor, FieldValues, FormatCode, MergeOptions, TypeTag};

// Internal modules (public but not part of the high-level API)
pub mod binder;
pub mod comments;
pub mod eventlog;
pub mod formats;
pub mod models;
pub mod schema;
