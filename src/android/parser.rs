//! Normalizers for Android probe packets.
//!
//! Each `parse_*` method takes one decoded packet payload and emits counters,
//! slices, rows and stats into the [`TraceContext`]. None of them fail: absent
//! fields are skipped, identities that should have been registered earlier
//! are counted and dropped.

use std::borrow::Cow;

use perfetto_protos::android_game_intervention_list::android_game_intervention_list::GameModeInfo;
use perfetto_protos::android_game_intervention_list::AndroidGameInterventionList;
use perfetto_protos::android_log::android_log_packet::log_event::arg::Value as LogArgValue;
use perfetto_protos::android_log::android_log_packet::{LogEvent, Stats as LogStats};
use perfetto_protos::android_log::AndroidLogPacket;
use perfetto_protos::android_log_constants::AndroidLogPriority;
use perfetto_protos::android_system_property::AndroidSystemProperty;
use perfetto_protos::battery_counters::BatteryCounters;
use perfetto_protos::initial_display_state::InitialDisplayState;
use perfetto_protos::packages_list::PackagesList;
use perfetto_protos::power_rails::PowerRails;
use perfetto_protos::trace_config::trace_config::StatsdMetadata;

use crate::android::args::{ArgFormatter, ArgValue};
use crate::context::TraceContext;
use crate::storage::{
    AndroidLogRecord, GameInterventionRecord, GameModeConfig, MetadataKey, PackageRecord,
    SliceRecord, StatKey, StringId, TraceStorage, TrackId, Variadic,
};
use crate::tracker::REALTIME_CLOCK;

const PRIO_INFO: u8 = AndroidLogPriority::PRIO_INFO as u8;

const SCREEN_STATE_PROPERTY: &str = "debug.tracing.screen_state";
const DEVICE_STATE_PROPERTY: &str = "debug.tracing.device_state";

/// Game modes reported by the game intervention list, in row column order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum GameMode {
    Standard,
    Performance,
    Battery,
}

impl GameMode {
    const COUNT: usize = 3;

    fn from_raw(mode: u32) -> Option<Self> {
        match mode {
            1 => Some(GameMode::Standard),
            2 => Some(GameMode::Performance),
            3 => Some(GameMode::Battery),
            _ => None,
        }
    }

    fn index(self) -> usize {
        match self {
            GameMode::Standard => 0,
            GameMode::Performance => 1,
            GameMode::Battery => 2,
        }
    }
}

impl From<&GameModeInfo> for GameModeConfig {
    fn from(info: &GameModeInfo) -> Self {
        GameModeConfig {
            supported: true,
            downscale: Some(f64::from(info.resolution_downscale())),
            use_angle: Some(info.use_angle()),
            fps: Some(f64::from(info.fps())),
        }
    }
}

#[derive(Debug)]
pub struct AndroidProbesParser {
    batt_charge_id: StringId,
    batt_capacity_id: StringId,
    batt_current_id: StringId,
    batt_current_avg_id: StringId,
    screen_state_id: StringId,
    device_state_id: StringId,
}

impl AndroidProbesParser {
    pub fn new(storage: &mut TraceStorage) -> Self {
        Self {
            batt_charge_id: storage.intern_string("batt.charge_uah"),
            batt_capacity_id: storage.intern_string("batt.capacity_pct"),
            batt_current_id: storage.intern_string("batt.current_ua"),
            batt_current_avg_id: storage.intern_string("batt.current.avg_ua"),
            screen_state_id: storage.intern_string("ScreenState"),
            device_state_id: storage.intern_string("DeviceStateChanged"),
        }
    }

    fn push_global_counter(&self, ctx: &mut TraceContext, ts: i64, name: StringId, value: f64) {
        let track = ctx
            .track_tracker
            .intern_global_counter_track(&mut ctx.storage, name);
        ctx.storage.push_counter(ts, value, track);
    }

    pub fn parse_battery_counters(&self, ctx: &mut TraceContext, ts: i64, evt: &BatteryCounters) {
        if evt.has_charge_counter_uah() {
            self.push_global_counter(ctx, ts, self.batt_charge_id, evt.charge_counter_uah() as f64);
        }
        if evt.has_capacity_percent() {
            self.push_global_counter(
                ctx,
                ts,
                self.batt_capacity_id,
                f64::from(evt.capacity_percent()),
            );
        }
        if evt.has_current_ua() {
            self.push_global_counter(ctx, ts, self.batt_current_id, evt.current_ua() as f64);
        }
        if evt.has_current_avg_ua() {
            self.push_global_counter(
                ctx,
                ts,
                self.batt_current_avg_id,
                evt.current_avg_ua() as f64,
            );
        }
    }

    /// Parse a power rails packet forged by the tokenizer: exactly one
    /// reading, stamped with the packet timestamp.
    pub fn parse_power_rails(&self, ctx: &mut TraceContext, ts: i64, evt: &PowerRails) {
        // Descriptors were consumed at tokenization time.
        debug_assert_eq!(evt.energy_data.len(), 1, "expected one reading per packet");
        let Some(data) = evt.energy_data.first() else {
            return;
        };

        match ctx.probes_tracker.power_rail_track(data.index()) {
            Some(track) => {
                debug_assert!(data.has_timestamp_ms());
                debug_assert_eq!(ts / 1_000_000, data.timestamp_ms() as i64);
                ctx.storage.push_counter(ts, data.energy() as f64, track);
            }
            None => {
                tracing::debug!("Dropping energy reading for unknown rail {}", data.index());
                ctx.storage.increment_stats(StatKey::PowerRailUnknownIndex);
            }
        }
    }

    pub fn parse_android_log_packet(&self, ctx: &mut TraceContext, packet: &AndroidLogPacket) {
        for evt in &packet.events {
            self.parse_android_log_event(ctx, evt);
        }
        if let Some(stats) = packet.stats.as_ref() {
            self.parse_android_log_stats(ctx, stats);
        }
    }

    fn parse_android_log_event(&self, ctx: &mut TraceContext, evt: &LogEvent) {
        // Nothing is interned or resolved for events we cannot place in time.
        let Some(ts) = ctx
            .clock_tracker
            .to_trace_time(REALTIME_CLOCK, evt.timestamp() as i64)
        else {
            tracing::debug!("Dropping log event with unresolved realtime ts {}", evt.timestamp());
            return;
        };

        let mut args = ArgFormatter::new();
        for arg in evt.args.iter().filter(|a| a.has_name()) {
            args.push_arg(arg.name(), arg.value.as_ref().and_then(log_arg_value));
        }

        let synthesized = args.message();
        debug_assert!(
            synthesized.is_none() || !evt.has_message(),
            "log event has both message and args"
        );
        let literal = evt.has_message().then(|| evt.message());
        let msg_id = ctx
            .storage
            .intern_string(&select_log_message(synthesized, literal));
        let tag_id = ctx.storage.intern_string(evt.tag());

        let tid = evt.tid();
        let utid = if tid != 0 {
            Some(
                ctx.process_tracker
                    .update_thread(&mut ctx.storage, tid, evt.pid()),
            )
        } else {
            None
        };

        let prio = match evt.prio.map_or(0, |p| p.value()) as u8 {
            0 => PRIO_INFO,
            p => p,
        };

        // Log events are not sorted by trace time; readers sort on demand.
        ctx.storage.insert_android_log(AndroidLogRecord {
            ts,
            utid,
            prio,
            tag: tag_id,
            msg: msg_id,
        });
    }

    fn parse_android_log_stats(&self, ctx: &mut TraceContext, stats: &LogStats) {
        if stats.has_num_failed() {
            ctx.storage
                .set_stats(StatKey::AndroidLogNumFailed, stats.num_failed() as i64);
        }
        if stats.has_num_skipped() {
            ctx.storage
                .set_stats(StatKey::AndroidLogNumSkipped, stats.num_skipped() as i64);
        }
        if stats.has_num_total() {
            ctx.storage
                .set_stats(StatKey::AndroidLogNumTotal, stats.num_total() as i64);
        }
    }

    pub fn parse_statsd_metadata(&self, ctx: &mut TraceContext, metadata: &StatsdMetadata) {
        if metadata.has_triggering_subscription_id() {
            ctx.storage.metadata_mut().set(
                MetadataKey::StatsdTriggeringSubscriptionId,
                Variadic::Int(metadata.triggering_subscription_id()),
            );
        }
    }

    pub fn parse_android_packages_list(&self, ctx: &mut TraceContext, list: &PackagesList) {
        ctx.storage
            .set_stats(StatKey::PackagesListHasReadErrors, list.read_error() as i64);
        ctx.storage
            .set_stats(StatKey::PackagesListHasParseErrors, list.parse_error() as i64);

        for pkg in &list.packages {
            let name = pkg.name();
            if !ctx.probes_tracker.should_insert_package(name) {
                continue;
            }
            let package_name = ctx.storage.intern_string(name);
            ctx.storage.insert_package(PackageRecord {
                package_name,
                uid: pkg.uid() as i64,
                debuggable: pkg.debuggable(),
                profileable_from_shell: pkg.profileable_from_shell(),
                version_code: pkg.version_code(),
            });
            ctx.probes_tracker.inserted_package(name.to_string());
        }
    }

    pub fn parse_android_game_intervention(
        &self,
        ctx: &mut TraceContext,
        list: &AndroidGameInterventionList,
    ) {
        ctx.storage.set_stats(
            StatKey::GameInterventionHasReadErrors,
            list.read_error() as i64,
        );
        ctx.storage.set_stats(
            StatKey::GameInterventionHasParseErrors,
            list.parse_error() as i64,
        );

        for pkg in &list.game_packages {
            let mut modes: [GameModeConfig; GameMode::COUNT] = Default::default();
            for info in &pkg.game_mode_info {
                if let Some(mode) = GameMode::from_raw(info.mode()) {
                    modes[mode.index()] = GameModeConfig::from(info);
                }
            }
            let [standard, performance, battery] = modes;

            let package_name = ctx.storage.intern_string(pkg.name());
            ctx.storage.insert_game_intervention(GameInterventionRecord {
                package_name,
                uid: pkg.uid() as i64,
                current_mode: pkg.current_mode() as i32,
                standard,
                performance,
                battery,
            });
        }
    }

    pub fn parse_initial_display_state(
        &self,
        ctx: &mut TraceContext,
        ts: i64,
        state: &InitialDisplayState,
    ) {
        self.push_global_counter(ctx, ts, self.screen_state_id, f64::from(state.display_state()));
    }

    pub fn parse_android_system_property(
        &self,
        ctx: &mut TraceContext,
        ts: i64,
        properties: &AndroidSystemProperty,
    ) {
        for kv in &properties.values {
            match kv.name() {
                SCREEN_STATE_PROPERTY => {
                    if let Ok(state) = kv.value().trim_start().parse::<i32>() {
                        self.push_global_counter(ctx, ts, self.screen_state_id, f64::from(state));
                    }
                }
                DEVICE_STATE_PROPERTY => {
                    let state_id = ctx.storage.intern_string(kv.value());
                    self.push_device_state(ctx, ts, state_id);
                }
                _ => {}
            }
        }
    }

    fn push_device_state(&self, ctx: &mut TraceContext, ts: i64, state_id: StringId) {
        let set = ctx
            .async_track_set_tracker
            .intern_global_track_set(self.device_state_id);
        let track_id: TrackId = ctx
            .async_track_set_tracker
            .scoped(&mut ctx.storage, set, ts, 0);
        ctx.storage.push_slice(SliceRecord {
            ts,
            dur: 0,
            track_id,
            category: None,
            name: state_id,
            depth: 0,
        });
    }
}

fn log_arg_value(value: &LogArgValue) -> Option<ArgValue<'_>> {
    match value {
        LogArgValue::StringValue(s) => Some(ArgValue::String(s)),
        LogArgValue::IntValue(i) => Some(ArgValue::Int(*i)),
        LogArgValue::FloatValue(f) => Some(ArgValue::Float(*f)),
        _ => None,
    }
}

/// Message stored for a log event: the rendered args if there were any,
/// else the literal message, else the empty string.
fn select_log_message<'a>(
    synthesized: Option<Cow<'a, str>>,
    literal: Option<&'a str>,
) -> Cow<'a, str> {
    match (synthesized, literal) {
        (Some(synthesized), Some(_)) => {
            tracing::warn!("Log event has both a message and args, keeping args");
            synthesized
        }
        (Some(synthesized), None) => synthesized,
        (None, literal) => Cow::Borrowed(literal.unwrap_or("")),
    }
}
