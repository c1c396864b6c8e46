//! Tokenization-time handling of power rail packets.
//!
//! A `PowerRails` packet carries rail descriptors plus a batch of readings
//! taken at different times. Descriptors are registered here, before any
//! parsing, and every reading is split out into its own single-reading
//! packet stamped with the reading's own timestamp, so that readings sort
//! correctly against the rest of the trace.

use perfetto_protos::power_rails::PowerRails;

use crate::context::TraceContext;

const NS_PER_MS: i64 = 1_000_000;

/// Register rail descriptors and split readings.
///
/// Returns one `(ts, packet)` per reading; every returned packet holds
/// exactly one `EnergyData` whose `timestamp_ms` equals `ts / 1_000_000`.
pub fn tokenize_power_rails(ctx: &mut TraceContext, rails: &PowerRails) -> Vec<(i64, PowerRails)> {
    for desc in &rails.rail_descriptor {
        if !desc.has_rail_name() {
            tracing::debug!("Skipping power rail descriptor {} without a name", desc.index());
            continue;
        }
        if ctx.probes_tracker.has_power_rail(desc.index()) {
            tracing::debug!("Power rail {} already registered", desc.index());
            continue;
        }
        let name = format!("power.{}_uws", desc.rail_name());
        let name_id = ctx.storage.intern_string(&name);
        let track = ctx
            .track_tracker
            .create_power_rail_track(&mut ctx.storage, name_id);
        ctx.probes_tracker.set_power_rail_track(desc.index(), track);
    }

    rails
        .energy_data
        .iter()
        .filter_map(|data| {
            let Some(ts) = (data.timestamp_ms() as i64).checked_mul(NS_PER_MS) else {
                tracing::debug!("Dropping energy reading with timestamp {}ms", data.timestamp_ms());
                return None;
            };
            let mut single = PowerRails::default();
            single.energy_data.push(data.clone());
            Some((ts, single))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::TrackKind;
    use perfetto_protos::power_rails::power_rails::{EnergyData, RailDescriptor};

    fn descriptor(index: u32, name: &str) -> RailDescriptor {
        let mut desc = RailDescriptor::default();
        desc.set_index(index);
        desc.set_rail_name(name.to_string());
        desc.set_subsys_name("cpu".to_string());
        desc
    }

    fn reading(index: u32, ts_ms: u64, energy: u64) -> EnergyData {
        let mut data = EnergyData::default();
        data.set_index(index);
        data.set_timestamp_ms(ts_ms);
        data.set_energy(energy);
        data
    }

    #[test]
    fn test_registers_descriptors_and_splits_readings() {
        let mut ctx = TraceContext::new();
        let mut rails = PowerRails::default();
        rails.rail_descriptor.push(descriptor(0, "S4M_VDD_CX"));
        rails.rail_descriptor.push(descriptor(1, "L2A_DDR"));
        rails.energy_data.push(reading(0, 10, 100));
        rails.energy_data.push(reading(1, 10, 200));
        rails.energy_data.push(reading(0, 20, 150));

        let split = tokenize_power_rails(&mut ctx, &rails);

        assert_eq!(split.len(), 3);
        for (ts, packet) in &split {
            assert_eq!(packet.energy_data.len(), 1);
            assert!(packet.rail_descriptor.is_empty());
            assert_eq!(*ts / NS_PER_MS, packet.energy_data[0].timestamp_ms() as i64);
        }
        assert_eq!(split[2].0, 20_000_000);

        let track = ctx.probes_tracker.power_rail_track(0).unwrap();
        let record = &ctx.storage.tracks()[track.0 as usize];
        assert_eq!(record.kind, TrackKind::PowerRail);
        assert_eq!(ctx.storage.string(record.name), Some("power.S4M_VDD_CX_uws"));
        assert!(ctx.probes_tracker.power_rail_track(1).is_some());
    }

    #[test]
    fn test_repeated_descriptor_keeps_first_track() {
        let mut ctx = TraceContext::new();
        let mut rails = PowerRails::default();
        rails.rail_descriptor.push(descriptor(0, "A"));
        tokenize_power_rails(&mut ctx, &rails);
        let first = ctx.probes_tracker.power_rail_track(0);

        tokenize_power_rails(&mut ctx, &rails);
        assert_eq!(ctx.probes_tracker.power_rail_track(0), first);
        assert_eq!(ctx.storage.tracks().len(), 1);
    }

    #[test]
    fn test_unnamed_descriptor_is_skipped() {
        let mut ctx = TraceContext::new();
        let mut desc = RailDescriptor::default();
        desc.set_index(4);
        let mut rails = PowerRails::default();
        rails.rail_descriptor.push(desc);

        tokenize_power_rails(&mut ctx, &rails);
        assert_eq!(ctx.probes_tracker.power_rail_track(4), None);
    }
}
