//! Trace-lifetime state shared by the Android probe tokenizer and parser.

use std::collections::{HashMap, HashSet};

use crate::storage::TrackId;

#[derive(Debug, Default)]
pub struct AndroidProbesTracker {
    /// Rail index -> counter track, filled from rail descriptors at tokenization time.
    power_rail_tracks: HashMap<u32, TrackId>,
    seen_packages: HashSet<String>,
}

impl AndroidProbesTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `index` to `track`. An index that is already bound keeps its
    /// first track; returns whether the binding was created.
    pub fn set_power_rail_track(&mut self, index: u32, track: TrackId) -> bool {
        match self.power_rail_tracks.entry(index) {
            std::collections::hash_map::Entry::Vacant(e) => {
                e.insert(track);
                true
            }
            std::collections::hash_map::Entry::Occupied(_) => false,
        }
    }

    pub fn has_power_rail(&self, index: u32) -> bool {
        self.power_rail_tracks.contains_key(&index)
    }

    /// Track bound to `index`. Never creates a binding.
    pub fn power_rail_track(&self, index: u32) -> Option<TrackId> {
        self.power_rail_tracks.get(&index).copied()
    }

    pub fn should_insert_package(&self, name: &str) -> bool {
        !self.seen_packages.contains(name)
    }

    pub fn inserted_package(&mut self, name: String) {
        self.seen_packages.insert(name);
    }
}
