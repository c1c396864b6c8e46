//! Row types for the tables held by [`TraceStorage`](super::TraceStorage).
//!
//! Rows reference interned strings by [`StringId`] and tracks by [`TrackId`];
//! nothing here owns string data.

use serde::Serialize;

/// Handle to a string in the [`StringPool`](super::StringPool).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct StringId(pub u32);

impl StringId {
    /// The empty string. Always present in a fresh pool.
    pub const NULL: StringId = StringId(0);

    pub fn is_null(self) -> bool {
        self == Self::NULL
    }
}

/// Handle to a row of the track table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct TrackId(pub u32);

/// Unique process ID (internal, not the OS pid).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Upid(pub u32);

/// Unique thread ID (internal, not the OS tid).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Utid(pub u32);

/// What a track is used for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackKind {
    /// Trace-wide counter track, interned by name.
    GlobalCounter,
    /// Counter track bound to a power rail index during tokenization.
    PowerRail,
    /// Member of an async track set, carries scoped slices.
    Async,
}

/// Track information.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TrackRecord {
    pub id: TrackId,
    pub name: StringId,
    pub kind: TrackKind,
}

/// Counter value record.
///
/// Note: Cannot derive `Eq` because `value` is `f64`.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CounterRecord {
    pub ts: i64,
    pub track_id: TrackId,
    pub value: f64,
}

/// Slice on a track.
///
/// # Fields
/// - `ts`: Start timestamp in nanoseconds (trace clock)
/// - `dur`: Duration in nanoseconds (0 for instants)
/// - `category`: Optional category string
/// - `name`: Slice label
/// - `depth`: Nesting depth on the track
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SliceRecord {
    pub ts: i64,
    pub dur: i64,
    pub track_id: TrackId,
    pub category: Option<StringId>,
    pub name: StringId,
    pub depth: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ProcessRecord {
    pub upid: Upid,
    pub pid: i32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ThreadRecord {
    pub utid: Utid,
    pub tid: i32,
    pub upid: Upid,
}

/// One logcat line.
///
/// `utid` is `None` when the source did not name a thread (tid 0).
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AndroidLogRecord {
    pub ts: i64,
    pub utid: Option<Utid>,
    pub prio: u8,
    pub tag: StringId,
    pub msg: StringId,
}

/// An installed package as reported by the packages list data source.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PackageRecord {
    pub package_name: StringId,
    pub uid: i64,
    pub debuggable: bool,
    pub profileable_from_shell: bool,
    pub version_code: i64,
}

/// Per-mode configuration of a game package.
///
/// `supported` is set once any mode info for this mode was seen; the other
/// fields then carry the values of the last such info.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct GameModeConfig {
    pub supported: bool,
    pub downscale: Option<f64>,
    pub use_angle: Option<bool>,
    pub fps: Option<f64>,
}

/// Denormalized game intervention row, one per package entry.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct GameInterventionRecord {
    pub package_name: StringId,
    pub uid: i64,
    pub current_mode: i32,
    pub standard: GameModeConfig,
    pub performance: GameModeConfig,
    pub battery: GameModeConfig,
}
