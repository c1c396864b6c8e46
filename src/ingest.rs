//! Trace ingestion loop.
//!
//! Ingestion runs in two passes, mirroring how a trace processor treats a
//! trace:
//!
//! 1. Tokenization: every packet is decoded, clock snapshots are fed to the
//!    clock tracker, power rail descriptors are registered and power rail
//!    packets are split into one packet per reading. Each remaining packet
//!    this crate understands is queued with its trace timestamp.
//! 2. Parsing: queued packets are stably sorted by timestamp and handed to
//!    the Android probe normalizers.
//!
//! Because all clock snapshots are known before parsing starts, log events
//! can be translated even when the snapshot comes later in the file.

use std::io::BufRead;
use std::path::Path;

use anyhow::{Context, Result};
use perfetto_protos::trace_packet::trace_packet::Data;
use perfetto_protos::trace_packet::TracePacket;
use protobuf::Message;

use crate::android::{tokenize_power_rails, AndroidProbesModule, PacketKind};
use crate::config::IngestConfig;
use crate::context::TraceContext;
use crate::reader::{open_trace_reader, PacketBytesIterator};
use crate::storage::StatKey;
use crate::tracker::TRACE_CLOCK;

#[derive(Debug)]
struct QueuedPacket {
    ts: i64,
    packet: TracePacket,
}

/// Counts reported at the end of an ingestion run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct IngestCounts {
    pub packets_read: u64,
    pub packets_queued: u64,
    pub packets_ignored: u64,
}

pub struct TraceIngester {
    config: IngestConfig,
    ctx: TraceContext,
    module: AndroidProbesModule,
    queue: Vec<QueuedPacket>,
    /// Most recent resolved packet timestamp; used for packets without one.
    last_ts: i64,
    counts: IngestCounts,
}

impl TraceIngester {
    pub fn new(config: IngestConfig) -> Self {
        let mut ctx = TraceContext::new();
        let module = AndroidProbesModule::new(&mut ctx);
        Self {
            config,
            ctx,
            module,
            queue: Vec::new(),
            last_ts: 0,
            counts: IngestCounts::default(),
        }
    }

    pub fn context(&self) -> &TraceContext {
        &self.ctx
    }

    pub fn counts(&self) -> IngestCounts {
        self.counts
    }

    fn resolve_timestamp(&mut self, packet: &TracePacket) -> i64 {
        if !packet.has_timestamp() {
            return self.last_ts;
        }
        let clock = if packet.has_timestamp_clock_id() {
            packet.timestamp_clock_id()
        } else {
            TRACE_CLOCK
        };
        match self
            .ctx
            .clock_tracker
            .to_trace_time(clock, packet.timestamp() as i64)
        {
            Some(ts) => {
                self.last_ts = ts;
                ts
            }
            None => {
                tracing::debug!(
                    "Unresolved packet timestamp {} in clock {}",
                    packet.timestamp(),
                    clock
                );
                self.last_ts
            }
        }
    }

    /// First pass over one decoded packet.
    pub fn tokenize(&mut self, packet: TracePacket) {
        self.counts.packets_read += 1;

        if let Some(Data::ClockSnapshot(snapshot)) = &packet.data {
            self.ctx.clock_tracker.add_snapshot_packet(snapshot);
            return;
        }

        let Some(kind) = PacketKind::of(&packet) else {
            self.counts.packets_ignored += 1;
            return;
        };

        if let Some(Data::PowerRails(rails)) = &packet.data {
            for (ts, single) in tokenize_power_rails(&mut self.ctx, rails) {
                let mut forged = TracePacket::default();
                forged.set_power_rails(single);
                self.queue.push(QueuedPacket { ts, packet: forged });
                self.counts.packets_queued += 1;
            }
            return;
        }

        let ts = self.resolve_timestamp(&packet);
        tracing::trace!("Queued {} packet at {}", kind.name(), ts);
        self.queue.push(QueuedPacket { ts, packet });
        self.counts.packets_queued += 1;
    }

    /// Decode and tokenize one encoded `TracePacket`.
    ///
    /// Decode failures are counted in `packet_decode_failures`; in strict
    /// mode they are also returned as errors.
    pub fn push_packet_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        match TracePacket::parse_from_bytes(bytes) {
            Ok(packet) => {
                self.tokenize(packet);
                Ok(())
            }
            Err(e) => {
                self.ctx
                    .storage
                    .increment_stats(StatKey::PacketDecodeFailures);
                if self.config.strict {
                    return Err(e).context("Failed to decode trace packet");
                }
                tracing::warn!("Skipping undecodable trace packet: {}", e);
                Ok(())
            }
        }
    }

    /// Tokenize every packet of a trace stream.
    pub fn ingest_reader<R: BufRead>(&mut self, reader: R) -> Result<()> {
        for bytes in PacketBytesIterator::new(reader) {
            let bytes = bytes.context("Failed to read trace stream")?;
            self.push_packet_bytes(&bytes)?;
        }
        Ok(())
    }

    /// Sort queued packets, run the normalizers and return the populated context.
    pub fn finish(mut self) -> TraceContext {
        if !self.ctx.clock_tracker.has_snapshots() {
            tracing::warn!("Trace has no clock snapshots, realtime log events will be dropped");
        }

        // Stable, so same-timestamp packets keep file order.
        self.queue.sort_by_key(|q| q.ts);
        for queued in self.queue.drain(..) {
            self.module
                .parse_packet(&mut self.ctx, queued.ts, &queued.packet);
        }

        tracing::info!(
            "Ingested {} packets ({} parsed, {} ignored)",
            self.counts.packets_read,
            self.counts.packets_queued,
            self.counts.packets_ignored
        );
        self.ctx
    }
}

/// Ingest the trace file at `path`.
pub fn ingest_file(path: &Path, config: &IngestConfig) -> Result<TraceContext> {
    let reader = open_trace_reader(path)?;
    let mut ingester = TraceIngester::new(config.clone());
    ingester
        .ingest_reader(reader)
        .with_context(|| format!("Failed to ingest {}", path.display()))?;
    Ok(ingester.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::StringId;
    use crate::tracker::REALTIME_CLOCK;
    use perfetto_protos::android_log::android_log_packet::LogEvent;
    use perfetto_protos::android_log::AndroidLogPacket;
    use perfetto_protos::battery_counters::BatteryCounters;
    use perfetto_protos::clock_snapshot::clock_snapshot::Clock;
    use perfetto_protos::clock_snapshot::ClockSnapshot;
    use perfetto_protos::power_rails::power_rails::{EnergyData, RailDescriptor};
    use perfetto_protos::power_rails::PowerRails;
    use perfetto_protos::process_tree::ProcessTree;

    fn battery_packet(ts: u64, charge: i64) -> TracePacket {
        let mut evt = BatteryCounters::default();
        evt.set_charge_counter_uah(charge);
        let mut packet = TracePacket::default();
        packet.set_timestamp(ts);
        packet.set_battery(evt);
        packet
    }

    fn snapshot_packet(realtime: u64, boottime: u64) -> TracePacket {
        let mut rt = Clock::default();
        rt.set_clock_id(REALTIME_CLOCK);
        rt.set_timestamp(realtime);
        let mut bt = Clock::default();
        bt.set_clock_id(TRACE_CLOCK);
        bt.set_timestamp(boottime);
        let mut snapshot = ClockSnapshot::default();
        snapshot.clocks.push(rt);
        snapshot.clocks.push(bt);
        let mut packet = TracePacket::default();
        packet.set_clock_snapshot(snapshot);
        packet
    }

    #[test]
    fn test_counters_sorted_by_timestamp() {
        let mut ingester = TraceIngester::new(IngestConfig::default());
        ingester.tokenize(battery_packet(300, 3));
        ingester.tokenize(battery_packet(100, 1));
        ingester.tokenize(battery_packet(200, 2));
        let ctx = ingester.finish();

        let values: Vec<_> = ctx.storage.counters().iter().map(|c| (c.ts, c.value)).collect();
        assert_eq!(values, vec![(100, 1.0), (200, 2.0), (300, 3.0)]);
    }

    #[test]
    fn test_log_resolved_by_later_snapshot() {
        let mut ingester = TraceIngester::new(IngestConfig::default());

        let mut evt = LogEvent::default();
        evt.set_timestamp(5_000);
        evt.set_message("hello".to_string());
        let mut log = AndroidLogPacket::default();
        log.events.push(evt);
        let mut packet = TracePacket::default();
        packet.set_android_log(log);

        ingester.tokenize(packet);
        ingester.tokenize(snapshot_packet(4_000, 100));
        let ctx = ingester.finish();

        let logs = ctx.storage.android_logs();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].ts, 1_100);
        assert_ne!(logs[0].msg, StringId::NULL);
    }

    #[test]
    fn test_power_rails_split_and_parsed() {
        let mut ingester = TraceIngester::new(IngestConfig::default());

        let mut desc = RailDescriptor::default();
        desc.set_index(0);
        desc.set_rail_name("VDD_CPU".to_string());
        let mut rails = PowerRails::default();
        rails.rail_descriptor.push(desc);
        for (ts_ms, energy) in [(2u64, 20u64), (1, 10)] {
            let mut data = EnergyData::default();
            data.set_index(0);
            data.set_timestamp_ms(ts_ms);
            data.set_energy(energy);
            rails.energy_data.push(data);
        }
        let mut unknown = EnergyData::default();
        unknown.set_index(5);
        unknown.set_timestamp_ms(3);
        rails.energy_data.push(unknown);

        let mut packet = TracePacket::default();
        packet.set_timestamp(999_999_999);
        packet.set_power_rails(rails);
        ingester.tokenize(packet);
        assert_eq!(ingester.counts().packets_queued, 3);

        let ctx = ingester.finish();
        let values: Vec<_> = ctx.storage.counters().iter().map(|c| (c.ts, c.value)).collect();
        assert_eq!(values, vec![(1_000_000, 10.0), (2_000_000, 20.0)]);
        assert_eq!(ctx.storage.stats().get(StatKey::PowerRailUnknownIndex), 1);
    }

    #[test]
    fn test_unhandled_packets_ignored() {
        let mut ingester = TraceIngester::new(IngestConfig::default());
        let mut packet = TracePacket::default();
        packet.set_process_tree(ProcessTree::default());
        ingester.tokenize(packet);

        assert_eq!(ingester.counts().packets_ignored, 1);
        assert_eq!(ingester.counts().packets_queued, 0);
    }

    #[test]
    fn test_decode_failure_lenient_and_strict() {
        let garbage = [0xff, 0xff, 0xff];

        let mut lenient = TraceIngester::new(IngestConfig::default());
        assert!(lenient.push_packet_bytes(&garbage).is_ok());
        assert_eq!(
            lenient
                .context()
                .storage
                .stats()
                .get(StatKey::PacketDecodeFailures),
            1
        );

        let mut strict = TraceIngester::new(IngestConfig {
            strict: true,
            ..Default::default()
        });
        assert!(strict.push_packet_bytes(&garbage).is_err());
    }

    #[test]
    fn test_packet_without_timestamp_uses_last() {
        let mut ingester = TraceIngester::new(IngestConfig::default());
        ingester.tokenize(battery_packet(500, 1));
        let mut untimed = battery_packet(0, 2);
        untimed.clear_timestamp();
        ingester.tokenize(untimed);
        let ctx = ingester.finish();

        let ts: Vec<_> = ctx.storage.counters().iter().map(|c| c.ts).collect();
        assert_eq!(ts, vec![500, 500]);
    }
}
