//! End-to-end ingestion of trace files built with the Perfetto protos.

use std::io::Write;

use flate2::write::GzEncoder;
use flate2::Compression;
use perfetto_protos::android_game_intervention_list::android_game_intervention_list::{
    GameModeInfo, GamePackageInfo,
};
use perfetto_protos::android_game_intervention_list::AndroidGameInterventionList;
use perfetto_protos::android_log::android_log_packet::log_event::Arg;
use perfetto_protos::android_log::android_log_packet::{LogEvent, Stats};
use perfetto_protos::android_log::AndroidLogPacket;
use perfetto_protos::battery_counters::BatteryCounters;
use perfetto_protos::builtin_clock::BuiltinClock;
use perfetto_protos::clock_snapshot::clock_snapshot::Clock;
use perfetto_protos::clock_snapshot::ClockSnapshot;
use perfetto_protos::packages_list::packages_list::PackageInfo;
use perfetto_protos::packages_list::PackagesList;
use perfetto_protos::power_rails::power_rails::{EnergyData, RailDescriptor};
use perfetto_protos::power_rails::PowerRails;
use perfetto_protos::trace::Trace;
use perfetto_protos::trace_config::trace_config::StatsdMetadata;
use perfetto_protos::trace_config::TraceConfig;
use perfetto_protos::trace_packet::TracePacket;
use protobuf::Message;

use probes_ingest::storage::{MetadataKey, StatKey, Variadic};
use probes_ingest::{ingest_file, IngestConfig, TraceContext};

fn clock_snapshot() -> TracePacket {
    let mut snapshot = ClockSnapshot::default();
    for (id, ts) in [
        (BuiltinClock::BUILTIN_CLOCK_BOOTTIME as u32, 1_000_000_000u64),
        (BuiltinClock::BUILTIN_CLOCK_REALTIME as u32, 1_700_000_000_000_000_000),
    ] {
        let mut clock = Clock::default();
        clock.set_clock_id(id);
        clock.set_timestamp(ts);
        snapshot.clocks.push(clock);
    }
    let mut packet = TracePacket::default();
    packet.set_clock_snapshot(snapshot);
    packet
}

fn battery(ts: u64, capacity: f32) -> TracePacket {
    let mut evt = BatteryCounters::default();
    evt.set_capacity_percent(capacity);
    evt.set_current_ua(-1200);
    let mut packet = TracePacket::default();
    packet.set_timestamp(ts);
    packet.set_battery(evt);
    packet
}

fn packages(names: &[&str]) -> TracePacket {
    let mut list = PackagesList::default();
    for (i, name) in names.iter().enumerate() {
        let mut pkg = PackageInfo::default();
        pkg.set_name(name.to_string());
        pkg.set_uid(10_000 + i as u64);
        pkg.set_version_code(1);
        list.packages.push(pkg);
    }
    let mut packet = TracePacket::default();
    packet.set_packages_list(list);
    packet
}

fn build_trace() -> Trace {
    let mut trace = Trace::default();

    trace.packet.push(battery(2_000_000_000, 50.0));
    trace.packet.push(clock_snapshot());
    trace.packet.push(battery(1_500_000_000, 51.0));

    let mut rails = PowerRails::default();
    let mut desc = RailDescriptor::default();
    desc.set_index(1);
    desc.set_rail_name("VDD_GPU".to_string());
    rails.rail_descriptor.push(desc);
    for (index, ts_ms) in [(1u32, 1_100u64), (1, 1_200), (7, 1_300)] {
        let mut data = EnergyData::default();
        data.set_index(index);
        data.set_timestamp_ms(ts_ms);
        data.set_energy(ts_ms * 10);
        rails.energy_data.push(data);
    }
    let mut packet = TracePacket::default();
    packet.set_power_rails(rails);
    trace.packet.push(packet);

    let mut log = AndroidLogPacket::default();
    let mut evt = LogEvent::default();
    evt.set_timestamp(1_700_000_000_500_000_000);
    evt.set_pid(100);
    evt.set_tid(101);
    evt.set_tag("am_proc_start".to_string());
    let mut arg = Arg::default();
    arg.set_name("pid".to_string());
    arg.set_int_value(4242);
    evt.args.push(arg);
    log.events.push(evt);
    let mut stats = Stats::default();
    stats.set_num_total(12);
    log.stats = Some(stats).into();
    let mut packet = TracePacket::default();
    packet.set_android_log(log);
    trace.packet.push(packet);

    trace.packet.push(packages(&["com.x", "com.y"]));
    trace.packet.push(packages(&["com.x"]));

    let mut info = GameModeInfo::default();
    info.set_mode(3);
    info.set_fps(45.0);
    let mut game = GamePackageInfo::default();
    game.set_name("com.game".to_string());
    game.set_current_mode(3);
    game.game_mode_info.push(info);
    let mut list = AndroidGameInterventionList::default();
    list.game_packages.push(game);
    let mut packet = TracePacket::default();
    packet.set_android_game_intervention_list(list);
    trace.packet.push(packet);

    let mut metadata = StatsdMetadata::default();
    metadata.set_triggering_subscription_id(77);
    let mut config = TraceConfig::default();
    config.statsd_metadata = Some(metadata).into();
    let mut packet = TracePacket::default();
    packet.set_trace_config(config);
    trace.packet.push(packet);

    trace
}

fn check_ingested(ctx: &TraceContext) {
    let storage = &ctx.storage;

    // Battery: two packets, two fields each, sorted by time.
    let battery: Vec<_> = storage
        .counters()
        .iter()
        .filter(|c| {
            let name = storage.tracks()[c.track_id.0 as usize].name;
            storage.string(name) == Some("batt.capacity_pct")
        })
        .map(|c| (c.ts, c.value))
        .collect();
    assert_eq!(battery, vec![(1_500_000_000, 51.0), (2_000_000_000, 50.0)]);

    // Power rails: two known readings, one unknown index.
    let rail = ctx.probes_tracker.power_rail_track(1).unwrap();
    let rail_values: Vec<_> = storage
        .counters()
        .iter()
        .filter(|c| c.track_id == rail)
        .map(|c| (c.ts, c.value))
        .collect();
    assert_eq!(
        rail_values,
        vec![(1_100_000_000, 11_000.0), (1_200_000_000, 12_000.0)]
    );
    assert_eq!(storage.stats().get(StatKey::PowerRailUnknownIndex), 1);

    // Log: realtime translated through the snapshot.
    let logs = storage.android_logs();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].ts, 1_500_000_000);
    assert_eq!(storage.string(logs[0].msg), Some("pid=4242"));
    assert_eq!(storage.string(logs[0].tag), Some("am_proc_start"));
    assert!(logs[0].utid.is_some());
    assert_eq!(storage.stats().get(StatKey::AndroidLogNumTotal), 12);

    // Packages: deduplicated across packets.
    let names: Vec<_> = storage
        .packages()
        .iter()
        .map(|p| storage.string(p.package_name).unwrap())
        .collect();
    assert_eq!(names, vec!["com.x", "com.y"]);

    let games = storage.game_interventions();
    assert_eq!(games.len(), 1);
    assert!(games[0].battery.supported);
    assert_eq!(games[0].battery.fps, Some(45.0));
    assert!(!games[0].standard.supported);

    assert_eq!(
        storage
            .metadata()
            .get(MetadataKey::StatsdTriggeringSubscriptionId),
        Some(&Variadic::Int(77))
    );
}

#[test]
fn test_ingest_plain_trace_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("trace.pftrace");
    std::fs::write(&path, build_trace().write_to_bytes().unwrap()).unwrap();

    let ctx = ingest_file(&path, &IngestConfig::default()).unwrap();
    check_ingested(&ctx);

    let summary = ctx.storage.summary();
    assert_eq!(summary.rows["package_list"], 2);
    assert_eq!(summary.rows["android_logs"], 1);
    let json = serde_json::to_value(&summary).unwrap();
    assert_eq!(json["metadata"]["statsd_triggering_subscription_id"], 77);
}

#[test]
fn test_ingest_gzipped_trace_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("trace.pftrace.gz");
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(&build_trace().write_to_bytes().unwrap())
        .unwrap();
    std::fs::write(&path, encoder.finish().unwrap()).unwrap();

    let ctx = ingest_file(&path, &IngestConfig::default()).unwrap();
    check_ingested(&ctx);
}

#[test]
fn test_truncated_trace_file_is_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("trace.pftrace");
    let bytes = build_trace().write_to_bytes().unwrap();
    std::fs::write(&path, &bytes[..bytes.len() - 3]).unwrap();

    assert!(ingest_file(&path, &IngestConfig::default()).is_err());
}

#[test]
fn test_missing_file_is_error() {
    let err = ingest_file(
        std::path::Path::new("/nonexistent/trace.pftrace"),
        &IngestConfig::default(),
    )
    .unwrap_err();
    assert!(format!("{err:#}").contains("Failed to open"));
}
