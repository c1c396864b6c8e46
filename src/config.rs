//! Ingestion configuration.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

/// Configuration for an ingestion run.
///
/// Loadable from a JSON file; every field is optional there.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IngestConfig {
    /// Abort on the first packet that fails to decode instead of counting it
    /// in `packet_decode_failures` and moving on.
    pub strict: bool,

    /// `tracing` filter directive used when neither `RUST_LOG` nor
    /// `PROBES_INGEST_LOGLEVEL` is set.
    pub log_filter: Option<String>,
}

impl IngestConfig {
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_json_str(&contents)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    pub fn from_json_str(contents: &str) -> Result<Self> {
        Ok(serde_json::from_str(contents)?)
    }
}
