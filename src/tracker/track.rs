//! Counter track and async track-set registries.

use std::collections::HashMap;

use crate::storage::{StringId, TraceStorage, TrackId, TrackKind};

/// Interns global counter tracks by name.
#[derive(Debug, Default)]
pub struct TrackTracker {
    global_counters: HashMap<StringId, TrackId>,
}

impl TrackTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get or create the global counter track called `name`.
    ///
    /// The same `name` always yields the same track for the life of the trace.
    pub fn intern_global_counter_track(
        &mut self,
        storage: &mut TraceStorage,
        name: StringId,
    ) -> TrackId {
        *self
            .global_counters
            .entry(name)
            .or_insert_with(|| storage.insert_track(name, TrackKind::GlobalCounter))
    }

    /// Create a new power rail counter track. Never deduplicated; the caller
    /// owns the binding.
    pub fn create_power_rail_track(&mut self, storage: &mut TraceStorage, name: StringId) -> TrackId {
        storage.insert_track(name, TrackKind::PowerRail)
    }
}

/// Handle to a set of async tracks sharing one name.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TrackSetId(pub u32);

#[derive(Debug)]
struct TrackSet {
    name: StringId,
    /// Member tracks and the end timestamp of the last slice placed on each.
    tracks: Vec<(TrackId, i64)>,
}

/// Hands out tracks for scoped (begin and end known up front) slices.
///
/// Slices that do not overlap share a track; overlapping slices get a new
/// track in the same set.
#[derive(Debug, Default)]
pub struct AsyncTrackSetTracker {
    sets: Vec<TrackSet>,
    global_sets: HashMap<StringId, TrackSetId>,
}

impl AsyncTrackSetTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn intern_global_track_set(&mut self, name: StringId) -> TrackSetId {
        let sets = &mut self.sets;
        *self.global_sets.entry(name).or_insert_with(|| {
            let id = TrackSetId(sets.len() as u32);
            sets.push(TrackSet {
                name,
                tracks: Vec::new(),
            });
            id
        })
    }

    /// Track in `set` for a slice spanning `[ts, ts + dur]`.
    pub fn scoped(
        &mut self,
        storage: &mut TraceStorage,
        set: TrackSetId,
        ts: i64,
        dur: i64,
    ) -> TrackId {
        debug_assert!(dur >= 0);
        let set = &mut self.sets[set.0 as usize];
        let end = ts.saturating_add(dur);

        if let Some(slot) = set.tracks.iter_mut().find(|(_, busy_until)| *busy_until <= ts) {
            slot.1 = end;
            return slot.0;
        }

        let track = storage.insert_track(set.name, TrackKind::Async);
        set.tracks.push((track, end));
        track
    }
}
