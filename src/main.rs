//! Command-line interface for merging EVCF files into Parquet.

use anyhow::Result;
use clap::{Parser, ValueEnum};
use evcf_merge::{schema, Codec, EventReader, MergeBuilder};
use log::{info, LevelFilter};
use std::path::{Path, PathBuf};
use std::time::Instant;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Merge .evcf event files into one Parquet table",
    long_about = "Converts self-describing columnar event files (.evcf) into a single flat Parquet table.\n\n\
                  All inputs must share the same field schema; their records are appended in order."
)]
struct Args {
    /// Input .evcf files, merged in the given order
    #[arg(short, long = "input", value_name = "FILE", num_args = 1.., required = true)]
    inputs: Vec<PathBuf>,

    /// Output Parquet file
    #[arg(short, long, value_name = "FILE", required_unless_present = "dump_schema")]
    output: Option<PathBuf>,

    /// Keep the first input's comments as Parquet metadata
    #[arg(long)]
    comment: bool,

    /// Number of rows per Parquet row group
    #[arg(long, default_value = "50000")]
    batch_size: usize,

    /// Compression codec for the output
    #[arg(long, value_enum, default_value_t = Compression::Snappy)]
    compression: Compression,

    /// Print the column schema of the first input as JSON and exit
    #[arg(long)]
    dump_schema: bool,

    /// Print merge statistics as JSON after the run
    #[arg(long)]
    stats: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Compression {
    None,
    Snappy,
    Lz4,
    Brotli,
}

impl From<Compression> for Codec {
    fn from(value: Compression) -> Self {
        match value {
            Compression::None => Codec::None,
            Compression::Snappy => Codec::Snappy,
            Compression::Lz4 => Codec::Lz4,
            Compression::Brotli => Codec::Brotli,
        }
    }
}

fn dump_schema(input: &Path) -> Result<()> {
    let reader = EventReader::open(input)?;
    let columns = schema::translate(reader.field_descriptors())?;
    println!("{}", serde_json::to_string_pretty(&columns)?);
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logger
    env_logger::Builder::new()
        .filter_level(if args.verbose {
            LevelFilter::Debug
        } else {
            LevelFilter::Info
        })
        .format_timestamp(None)
        .init();

    if args.dump_schema {
        return dump_schema(&args.inputs[0]);
    }

    let Some(output) = args.output else {
        anyhow::bail!("No output file specified");
    };

    if args.comment {
        info!("Keep comments");
    }

    let start = Instant::now();
    let stats = MergeBuilder::new()
        .output(&output)
        .keep_comments(args.comment)
        .batch_size(args.batch_size)
        .compression(args.compression.into())
        .merge(&args.inputs)?;

    info!("{}", stats.summary());
    info!("Merged {} file(s) in {:.2?}", stats.files.len(), start.elapsed());

    if args.stats {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inputs_are_required() {
        assert!(Args::try_parse_from(["evcf2parquet", "-o", "out.parquet"]).is_err());
    }

    #[test]
    fn test_compression_maps_to_codec() {
        let args =
            Args::try_parse_from(["evcf2parquet", "-i", "a.evcf", "-o", "out.parquet"]).unwrap();
        assert_eq!(Codec::from(args.compression), Codec::Snappy);

        let args = Args::try_parse_from([
            "evcf2parquet",
            "-i",
            "a.evcf",
            "-o",
            "out.parquet",
            "--compression",
            "lz4",
        ])
        .unwrap();
        assert_eq!(Codec::from(args.compression), Codec::Lz4);
    }
}
