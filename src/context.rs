//! Per-trace ingestion state.

use crate::android::AndroidProbesTracker;
use crate::storage::TraceStorage;
use crate::tracker::{AsyncTrackSetTracker, ClockTracker, ProcessTracker, TrackTracker};

/// Everything one trace mutates while it is ingested.
///
/// Each trace gets its own context; nothing in here is shared between
/// traces, and every normalizer takes it by `&mut`.
#[derive(Debug, Default)]
pub struct TraceContext {
    pub storage: TraceStorage,
    pub clock_tracker: ClockTracker,
    pub track_tracker: TrackTracker,
    pub async_track_set_tracker: AsyncTrackSetTracker,
    pub process_tracker: ProcessTracker,
    pub probes_tracker: AndroidProbesTracker,
}

impl TraceContext {
    pub fn new() -> Self {
        Self::default()
    }
}
