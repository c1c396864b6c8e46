use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use probes_ingest::logging::initialize_logging;
use probes_ingest::{ingest_file, IngestConfig};

/// Ingest the Android probe packets of a Perfetto trace and print a JSON
/// summary of the resulting tables and stats.
#[derive(Debug, Parser)]
#[command(name = "probes-ingest", version, about)]
struct Command {
    /// Perfetto trace file (.pb, .pftrace, optionally .gz compressed)
    trace: PathBuf,

    /// JSON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Abort on the first undecodable packet
    #[arg(long)]
    strict: bool,

    /// Pretty-print the JSON summary
    #[arg(long)]
    pretty: bool,
}

fn main() -> Result<()> {
    let opts = Command::parse();

    let mut config = match &opts.config {
        Some(path) => IngestConfig::from_json_file(path)?,
        None => IngestConfig::default(),
    };
    if opts.strict {
        config.strict = true;
    }

    initialize_logging(config.log_filter.as_deref())?;

    let ctx = ingest_file(&opts.trace, &config)?;
    let summary = ctx.storage.summary();
    let out = if opts.pretty {
        serde_json::to_string_pretty(&summary)
    } else {
        serde_json::to_string(&summary)
    }
    .context("Failed to serialize summary")?;
    println!("{out}");
    Ok(())
}
