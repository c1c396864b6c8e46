//! Named integer counters reported alongside the ingested tables.

use std::collections::BTreeMap;

use serde::Serialize;

/// How a stat should be read by someone looking at a finished trace.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StatSeverity {
    Info,
    DataLoss,
    Error,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StatKey {
    PowerRailUnknownIndex,
    AndroidLogNumFailed,
    AndroidLogNumSkipped,
    AndroidLogNumTotal,
    PackagesListHasReadErrors,
    PackagesListHasParseErrors,
    GameInterventionHasReadErrors,
    GameInterventionHasParseErrors,
    PacketDecodeFailures,
}

impl StatKey {
    pub const ALL: [StatKey; 9] = [
        StatKey::PowerRailUnknownIndex,
        StatKey::AndroidLogNumFailed,
        StatKey::AndroidLogNumSkipped,
        StatKey::AndroidLogNumTotal,
        StatKey::PackagesListHasReadErrors,
        StatKey::PackagesListHasParseErrors,
        StatKey::GameInterventionHasReadErrors,
        StatKey::GameInterventionHasParseErrors,
        StatKey::PacketDecodeFailures,
    ];

    pub fn name(self) -> &'static str {
        match self {
            StatKey::PowerRailUnknownIndex => "power_rail_unknown_index",
            StatKey::AndroidLogNumFailed => "android_log_num_failed",
            StatKey::AndroidLogNumSkipped => "android_log_num_skipped",
            StatKey::AndroidLogNumTotal => "android_log_num_total",
            StatKey::PackagesListHasReadErrors => "packages_list_has_read_errors",
            StatKey::PackagesListHasParseErrors => "packages_list_has_parse_errors",
            StatKey::GameInterventionHasReadErrors => "game_intervention_has_read_errors",
            StatKey::GameInterventionHasParseErrors => "game_intervention_has_parse_errors",
            StatKey::PacketDecodeFailures => "packet_decode_failures",
        }
    }

    pub fn severity(self) -> StatSeverity {
        match self {
            StatKey::AndroidLogNumTotal => StatSeverity::Info,
            StatKey::PowerRailUnknownIndex
            | StatKey::AndroidLogNumFailed
            | StatKey::AndroidLogNumSkipped => StatSeverity::DataLoss,
            StatKey::PackagesListHasReadErrors
            | StatKey::PackagesListHasParseErrors
            | StatKey::GameInterventionHasReadErrors
            | StatKey::GameInterventionHasParseErrors
            | StatKey::PacketDecodeFailures => StatSeverity::Error,
        }
    }
}

/// Stat values keyed by [`StatKey`]. Unset stats read as zero.
#[derive(Debug, Default)]
pub struct Stats {
    values: BTreeMap<StatKey, i64>,
}

impl Stats {
    pub fn get(&self, key: StatKey) -> i64 {
        self.values.get(&key).copied().unwrap_or(0)
    }

    pub fn increment(&mut self, key: StatKey, by: i64) {
        *self.values.entry(key).or_insert(0) += by;
    }

    pub fn set(&mut self, key: StatKey, value: i64) {
        self.values.insert(key, value);
    }

    /// Stats with a non-zero value, in declaration order.
    pub fn non_zero(&self) -> impl Iterator<Item = (StatKey, i64)> + '_ {
        self.values
            .iter()
            .filter(|(_, v)| **v != 0)
            .map(|(k, v)| (*k, *v))
    }
}
