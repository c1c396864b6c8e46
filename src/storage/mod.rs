//! In-memory trace store.
//!
//! `TraceStorage` owns the string pool, every row table the normalizers
//! append to, and the stats and metadata side channels. Tables are plain
//! vectors in insertion order; nothing is re-sorted here.

mod metadata;
mod models;
mod stats;

pub use metadata::{Metadata, MetadataKey, Variadic};
pub use models::*;
pub use stats::{StatKey, StatSeverity, Stats};

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

/// Interns strings to small integer handles.
///
/// Interning is idempotent: equal strings always map to the same [`StringId`].
#[derive(Debug)]
pub struct StringPool {
    strings: Vec<String>,
    index: HashMap<String, StringId>,
}

impl StringPool {
    pub fn new() -> Self {
        let mut index = HashMap::new();
        index.insert(String::new(), StringId::NULL);
        Self {
            strings: vec![String::new()],
            index,
        }
    }

    pub fn intern(&mut self, s: &str) -> StringId {
        if let Some(id) = self.index.get(s) {
            return *id;
        }
        let id = StringId(self.strings.len() as u32);
        self.strings.push(s.to_string());
        self.index.insert(s.to_string(), id);
        id
    }

    /// Look up a string without interning it.
    pub fn find(&self, s: &str) -> Option<StringId> {
        self.index.get(s).copied()
    }

    pub fn get(&self, id: StringId) -> Option<&str> {
        self.strings.get(id.0 as usize).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        // The empty string is always present.
        false
    }
}

impl Default for StringPool {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Default)]
pub struct TraceStorage {
    strings: StringPool,
    tracks: Vec<TrackRecord>,
    counters: Vec<CounterRecord>,
    slices: Vec<SliceRecord>,
    processes: Vec<ProcessRecord>,
    threads: Vec<ThreadRecord>,
    android_logs: Vec<AndroidLogRecord>,
    packages: Vec<PackageRecord>,
    game_interventions: Vec<GameInterventionRecord>,
    stats: Stats,
    metadata: Metadata,
}

impl TraceStorage {
    pub fn new() -> Self {
        Self::default()
    }

    // Strings

    pub fn intern_string(&mut self, s: &str) -> StringId {
        self.strings.intern(s)
    }

    pub fn string(&self, id: StringId) -> Option<&str> {
        self.strings.get(id)
    }

    pub fn string_pool(&self) -> &StringPool {
        &self.strings
    }

    // Tracks

    pub(crate) fn insert_track(&mut self, name: StringId, kind: TrackKind) -> TrackId {
        let id = TrackId(self.tracks.len() as u32);
        self.tracks.push(TrackRecord { id, name, kind });
        id
    }

    pub fn tracks(&self) -> &[TrackRecord] {
        &self.tracks
    }

    // Events

    pub fn push_counter(&mut self, ts: i64, value: f64, track_id: TrackId) {
        self.counters.push(CounterRecord {
            ts,
            track_id,
            value,
        });
    }

    pub fn push_slice(&mut self, slice: SliceRecord) {
        self.slices.push(slice);
    }

    pub fn counters(&self) -> &[CounterRecord] {
        &self.counters
    }

    pub fn slices(&self) -> &[SliceRecord] {
        &self.slices
    }

    // Processes and threads

    pub(crate) fn insert_process(&mut self, pid: i32) -> Upid {
        let upid = Upid(self.processes.len() as u32);
        self.processes.push(ProcessRecord { upid, pid });
        upid
    }

    pub(crate) fn insert_thread(&mut self, tid: i32, upid: Upid) -> Utid {
        let utid = Utid(self.threads.len() as u32);
        self.threads.push(ThreadRecord { utid, tid, upid });
        utid
    }

    pub fn processes(&self) -> &[ProcessRecord] {
        &self.processes
    }

    pub fn threads(&self) -> &[ThreadRecord] {
        &self.threads
    }

    // Android tables

    pub fn insert_android_log(&mut self, row: AndroidLogRecord) {
        self.android_logs.push(row);
    }

    pub fn insert_package(&mut self, row: PackageRecord) {
        self.packages.push(row);
    }

    pub fn insert_game_intervention(&mut self, row: GameInterventionRecord) {
        self.game_interventions.push(row);
    }

    pub fn android_logs(&self) -> &[AndroidLogRecord] {
        &self.android_logs
    }

    pub fn packages(&self) -> &[PackageRecord] {
        &self.packages
    }

    pub fn game_interventions(&self) -> &[GameInterventionRecord] {
        &self.game_interventions
    }

    // Stats and metadata

    pub fn increment_stats(&mut self, key: StatKey) {
        self.stats.increment(key, 1);
    }

    pub fn set_stats(&mut self, key: StatKey, value: i64) {
        self.stats.set(key, value);
    }

    pub fn stats(&self) -> &Stats {
        &self.stats
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    pub fn metadata_mut(&mut self) -> &mut Metadata {
        &mut self.metadata
    }

    /// Row counts, non-zero stats and metadata, with strings resolved.
    pub fn summary(&self) -> StorageSummary {
        let mut rows = BTreeMap::new();
        rows.insert("track", self.tracks.len());
        rows.insert("counter", self.counters.len());
        rows.insert("slice", self.slices.len());
        rows.insert("process", self.processes.len());
        rows.insert("thread", self.threads.len());
        rows.insert("android_logs", self.android_logs.len());
        rows.insert("package_list", self.packages.len());
        rows.insert("android_game_intervention_list", self.game_interventions.len());

        let stats = self
            .stats
            .non_zero()
            .map(|(key, value)| StatSummary {
                name: key.name(),
                severity: key.severity(),
                value,
            })
            .collect();

        let metadata = self
            .metadata
            .iter()
            .map(|(key, value)| {
                let value = match value {
                    Variadic::Int(v) => serde_json::Value::from(*v),
                    Variadic::String(id) => {
                        serde_json::Value::from(self.string(*id).unwrap_or_default())
                    }
                };
                (key.name(), value)
            })
            .collect();

        StorageSummary {
            rows,
            stats,
            metadata,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct StatSummary {
    pub name: &'static str,
    pub severity: StatSeverity,
    pub value: i64,
}

/// JSON-friendly overview of a populated [`TraceStorage`].
#[derive(Debug, Serialize)]
pub struct StorageSummary {
    pub rows: BTreeMap<&'static str, usize>,
    pub stats: Vec<StatSummary>,
    pub metadata: BTreeMap<&'static str, serde_json::Value>,
}
