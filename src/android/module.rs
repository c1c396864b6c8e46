//! Dispatch of Android probe packets to their normalizers.

use anyhow::{bail, Context, Result};
use perfetto_protos::android_game_intervention_list::AndroidGameInterventionList;
use perfetto_protos::android_log::AndroidLogPacket;
use perfetto_protos::android_system_property::AndroidSystemProperty;
use perfetto_protos::battery_counters::BatteryCounters;
use perfetto_protos::initial_display_state::InitialDisplayState;
use perfetto_protos::packages_list::PackagesList;
use perfetto_protos::power_rails::PowerRails;
use perfetto_protos::trace_config::trace_config::StatsdMetadata;
use perfetto_protos::trace_packet::trace_packet::Data;
use perfetto_protos::trace_packet::TracePacket;
use protobuf::Message;

use crate::android::parser::AndroidProbesParser;
use crate::context::TraceContext;
use crate::storage::StatKey;

/// Packet kinds handled by [`AndroidProbesModule`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PacketKind {
    Battery,
    PowerRails,
    AndroidLog,
    StatsdMetadata,
    PackagesList,
    GameInterventionList,
    InitialDisplayState,
    SystemProperty,
}

impl PacketKind {
    pub fn name(self) -> &'static str {
        match self {
            PacketKind::Battery => "battery",
            PacketKind::PowerRails => "power_rails",
            PacketKind::AndroidLog => "android_log",
            PacketKind::StatsdMetadata => "statsd_metadata",
            PacketKind::PackagesList => "packages_list",
            PacketKind::GameInterventionList => "android_game_intervention_list",
            PacketKind::InitialDisplayState => "initial_display_state",
            PacketKind::SystemProperty => "android_system_property",
        }
    }

    /// Whether the normalizer for this kind needs the packet timestamp.
    pub fn is_time_bearing(self) -> bool {
        matches!(
            self,
            PacketKind::Battery
                | PacketKind::PowerRails
                | PacketKind::InitialDisplayState
                | PacketKind::SystemProperty
        )
    }

    /// Kind of `packet`, if this module handles it.
    pub fn of(packet: &TracePacket) -> Option<PacketKind> {
        let kind = match packet.data.as_ref()? {
            Data::Battery(_) => PacketKind::Battery,
            Data::PowerRails(_) => PacketKind::PowerRails,
            Data::AndroidLog(_) => PacketKind::AndroidLog,
            Data::TraceConfig(cfg) if cfg.statsd_metadata.is_some() => PacketKind::StatsdMetadata,
            Data::PackagesList(_) => PacketKind::PackagesList,
            Data::AndroidGameInterventionList(_) => PacketKind::GameInterventionList,
            Data::InitialDisplayState(_) => PacketKind::InitialDisplayState,
            Data::AndroidSystemProperty(_) => PacketKind::SystemProperty,
            _ => return None,
        };
        Some(kind)
    }
}

#[derive(Debug)]
pub struct AndroidProbesModule {
    parser: AndroidProbesParser,
}

impl AndroidProbesModule {
    pub fn new(ctx: &mut TraceContext) -> Self {
        Self {
            parser: AndroidProbesParser::new(&mut ctx.storage),
        }
    }

    /// Parse a decoded packet at trace time `ts`. Returns `false` for
    /// packets this module does not handle.
    pub fn parse_packet(&self, ctx: &mut TraceContext, ts: i64, packet: &TracePacket) -> bool {
        let p = &self.parser;
        match &packet.data {
            Some(Data::Battery(evt)) => p.parse_battery_counters(ctx, ts, evt),
            Some(Data::PowerRails(evt)) => p.parse_power_rails(ctx, ts, evt),
            Some(Data::AndroidLog(evt)) => p.parse_android_log_packet(ctx, evt),
            Some(Data::TraceConfig(cfg)) => match cfg.statsd_metadata.as_ref() {
                Some(metadata) => p.parse_statsd_metadata(ctx, metadata),
                None => return false,
            },
            Some(Data::PackagesList(evt)) => p.parse_android_packages_list(ctx, evt),
            Some(Data::AndroidGameInterventionList(evt)) => {
                p.parse_android_game_intervention(ctx, evt)
            }
            Some(Data::InitialDisplayState(evt)) => p.parse_initial_display_state(ctx, ts, evt),
            Some(Data::AndroidSystemProperty(evt)) => {
                p.parse_android_system_property(ctx, ts, evt)
            }
            _ => return false,
        }
        true
    }

    /// Decode `payload` as a `kind` message and normalize it.
    ///
    /// `ts` is required for time-bearing kinds and ignored otherwise. A
    /// payload that fails to decode is counted in `packet_decode_failures`.
    pub fn parse_payload(
        &self,
        ctx: &mut TraceContext,
        kind: PacketKind,
        ts: Option<i64>,
        payload: &[u8],
    ) -> Result<()> {
        let ts = match (kind.is_time_bearing(), ts) {
            (true, None) => bail!("{} payload requires a timestamp", kind.name()),
            (_, ts) => ts.unwrap_or_default(),
        };

        let p = &self.parser;
        match kind {
            PacketKind::Battery => {
                let evt: BatteryCounters = decode(ctx, kind, payload)?;
                p.parse_battery_counters(ctx, ts, &evt);
            }
            PacketKind::PowerRails => {
                let evt: PowerRails = decode(ctx, kind, payload)?;
                p.parse_power_rails(ctx, ts, &evt);
            }
            PacketKind::AndroidLog => {
                let evt: AndroidLogPacket = decode(ctx, kind, payload)?;
                p.parse_android_log_packet(ctx, &evt);
            }
            PacketKind::StatsdMetadata => {
                let evt: StatsdMetadata = decode(ctx, kind, payload)?;
                p.parse_statsd_metadata(ctx, &evt);
            }
            PacketKind::PackagesList => {
                let evt: PackagesList = decode(ctx, kind, payload)?;
                p.parse_android_packages_list(ctx, &evt);
            }
            PacketKind::GameInterventionList => {
                let evt: AndroidGameInterventionList = decode(ctx, kind, payload)?;
                p.parse_android_game_intervention(ctx, &evt);
            }
            PacketKind::InitialDisplayState => {
                let evt: InitialDisplayState = decode(ctx, kind, payload)?;
                p.parse_initial_display_state(ctx, ts, &evt);
            }
            PacketKind::SystemProperty => {
                let evt: AndroidSystemProperty = decode(ctx, kind, payload)?;
                p.parse_android_system_property(ctx, ts, &evt);
            }
        }
        Ok(())
    }
}

fn decode<M: Message>(ctx: &mut TraceContext, kind: PacketKind, payload: &[u8]) -> Result<M> {
    match M::parse_from_bytes(payload) {
        Ok(msg) => Ok(msg),
        Err(e) => {
            ctx.storage.increment_stats(StatKey::PacketDecodeFailures);
            Err(e).with_context(|| format!("Failed to decode {} payload", kind.name()))
        }
    }
}
