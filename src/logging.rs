//! `tracing` subscriber setup for the command line tool.

use anyhow::{anyhow, Result};
use tracing_subscriber::EnvFilter;

/// Environment variable consulted when `RUST_LOG` is unset.
pub const LOG_ENV: &str = "PROBES_INGEST_LOGLEVEL";

const DEFAULT_FILTER: &str = "probes_ingest=info";

/// Install a stderr `fmt` subscriber.
///
/// The filter comes from `RUST_LOG`, then `PROBES_INGEST_LOGLEVEL`, then
/// `fallback`, then `probes_ingest=info`.
pub fn initialize_logging(fallback: Option<&str>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_from_env(LOG_ENV))
        .or_else(|_| EnvFilter::try_new(fallback.unwrap_or(DEFAULT_FILTER)))
        .map_err(|e| anyhow!("Invalid log filter: {e}"))?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow!("Failed to install log subscriber: {e}"))
}
