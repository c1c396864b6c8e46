//! Per-trace identity registries: clocks, tracks and threads.

pub mod clock;
pub mod process;
pub mod track;

pub use clock::{ClockId, ClockTracker, REALTIME_CLOCK, TRACE_CLOCK};
pub use process::ProcessTracker;
pub use track::{AsyncTrackSetTracker, TrackSetId, TrackTracker};
