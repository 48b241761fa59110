//! Command-line tools for preparing MaxMind range files.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::info;

use ipatlas::logging::{init_logger, LogFormat, LogLevel};
use ipatlas::rangefile::{compress_ranges, rewrite_range_locations};

#[derive(Parser)]
#[command(name = "ipatlas", version, about = "MaxMind range file tools")]
struct Cli {
    /// Minimum log level to display
    #[arg(long, value_enum, default_value = "info", global = true)]
    log_level: LogLevel,

    /// Log output format
    #[arg(long, value_enum, default_value = "plain", global = true)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Rewrite a block file's location ids to grid-cell codes
    UpdateRange {
        /// City location CSV (id, country, region, city, ..., lat, lon)
        #[arg(long)]
        locations: PathBuf,
        /// Block CSV (start, end, locId)
        #[arg(long)]
        blocks: PathBuf,
        /// Output CSV (start, end, cellCode)
        #[arg(long)]
        output: PathBuf,
    },
    /// Merge adjacent equal-code ranges into compact CSV and binary files
    CompressRange {
        /// Input CSV produced by update-range
        #[arg(long)]
        input: PathBuf,
        /// Merged CSV output
        #[arg(long)]
        output_csv: PathBuf,
        /// Merged binary output (little-endian u32 triples)
        #[arg(long)]
        output_bin: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logger(cli.log_level, cli.log_format);

    match cli.command {
        Command::UpdateRange {
            locations,
            blocks,
            output,
        } => {
            let written = rewrite_range_locations(&locations, &blocks, &output)
                .context("update-range failed")?;
            info!("wrote {} ranges to {}", written, output.display());
        }
        Command::CompressRange {
            input,
            output_csv,
            output_bin,
        } => {
            let written = compress_ranges(&input, &output_csv, &output_bin)
                .context("compress-range failed")?;
            info!(
                "wrote {} ranges to {} and {}",
                written,
                output_csv.display(),
                output_bin.display()
            );
        }
    }
    Ok(())
}
