//! Translation of raw timestamps from other clock domains to trace time.
//!
//! Trace time is `BUILTIN_CLOCK_BOOTTIME`. Other clocks are related to it
//! through `ClockSnapshot` packets, each of which samples several clocks at
//! the same instant.

use perfetto_protos::builtin_clock::BuiltinClock;
use perfetto_protos::clock_snapshot::ClockSnapshot;
use std::collections::BTreeMap;

pub type ClockId = u32;

/// Clock used for every timestamp stored in the trace.
pub const TRACE_CLOCK: ClockId = BuiltinClock::BUILTIN_CLOCK_BOOTTIME as ClockId;

/// Clock of Android log event timestamps.
pub const REALTIME_CLOCK: ClockId = BuiltinClock::BUILTIN_CLOCK_REALTIME as ClockId;

#[derive(Debug, Default)]
pub struct ClockTracker {
    /// Snapshots in arrival order, each mapping clock id -> timestamp.
    snapshots: Vec<BTreeMap<ClockId, i64>>,
}

impl ClockTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one snapshot of simultaneously sampled clocks.
    pub fn add_snapshot(&mut self, clocks: &[(ClockId, i64)]) {
        if clocks.len() < 2 {
            // A single clock cannot relate two domains.
            tracing::debug!("Ignoring clock snapshot with {} clocks", clocks.len());
            return;
        }
        self.snapshots.push(clocks.iter().copied().collect());
    }

    /// Record a `ClockSnapshot` packet. Clocks without an id or timestamp are skipped.
    pub fn add_snapshot_packet(&mut self, snapshot: &ClockSnapshot) {
        let clocks: Vec<(ClockId, i64)> = snapshot
            .clocks
            .iter()
            .filter(|c| c.has_clock_id() && c.has_timestamp())
            .map(|c| (c.clock_id(), c.timestamp() as i64))
            .collect();
        self.add_snapshot(&clocks);
    }

    pub fn has_snapshots(&self) -> bool {
        !self.snapshots.is_empty()
    }

    /// Convert `ts` in `clock` to trace time.
    ///
    /// Returns `None` if no snapshot relates `clock` to the trace clock yet.
    pub fn to_trace_time(&self, clock: ClockId, ts: i64) -> Option<i64> {
        if clock == TRACE_CLOCK {
            return Some(ts);
        }

        let mut candidates = self.snapshots.iter().filter_map(|snap| {
            let src = *snap.get(&clock)?;
            let dst = *snap.get(&TRACE_CLOCK)?;
            Some((src, dst))
        });

        let first = candidates.next()?;
        // Latest snapshot taken at or before `ts`, else the earliest one.
        let (src, dst) = std::iter::once(first)
            .chain(candidates)
            .filter(|(src, _)| *src <= ts)
            .last()
            .unwrap_or(first);

        ts.checked_sub(src)?.checked_add(dst)
    }
}
