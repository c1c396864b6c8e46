//! probes-ingest library - normalization of Android probe packets.
//!
//! This library turns the Android probe packets of a Perfetto trace into
//! rows of an in-memory trace store, resolving counter tracks, threads,
//! clocks and packages across packets as it goes.
//!
//! # Modules
//!
//! - [`android`] - Normalizers and dispatch for Android probe packets
//! - [`storage`] - Trace store: string pool, tables, stats, metadata
//! - [`tracker`] - Clock, track and thread registries
//! - [`ingest`] - Two-pass ingestion loop over a trace stream
//!
//! # Example
//!
//! ```no_run
//! use probes_ingest::{ingest_file, IngestConfig};
//! use std::path::Path;
//!
//! let ctx = ingest_file(Path::new("./trace.pftrace"), &IngestConfig::default())
//!     .expect("Failed to ingest trace");
//! println!("{} log lines", ctx.storage.android_logs().len());
//! ```

pub mod android;
pub mod config;
pub mod context;
pub mod ingest;
pub mod logging;
pub mod reader;
pub mod storage;
pub mod tracker;

// Re-export for convenience
pub use config::IngestConfig;
pub use context::TraceContext;
pub use ingest::{ingest_file, IngestCounts, TraceIngester};
