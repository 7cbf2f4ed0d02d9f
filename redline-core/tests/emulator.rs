//! The emulator driving both decoders end to end.

use redline_core::emulator::{Command, Emulator, TX_INTERVAL_MS};
use redline_hal::UartTx;
use redline_protocol::decoder::decode_bus_frame;
use redline_protocol::wire::scale;
use redline_protocol::{DecodeEvent, FrameDecoder, TelemetryRecord};

#[derive(Default)]
struct Wire {
    bytes: Vec<u8>,
}

impl UartTx for Wire {
    type Error = ();

    fn write_blocking(&mut self, data: &[u8]) -> Result<(), ()> {
        self.bytes.extend_from_slice(data);
        Ok(())
    }

    fn flush(&mut self) -> Result<(), ()> {
        Ok(())
    }
}

/// Within half a quantization step, plus float slack
fn close(original: f32, decoded: f32, step: f32) -> bool {
    (original - decoded).abs() <= step * 0.5 + original.abs() * 1e-5 + 1e-5
}

fn decode_serial(bytes: &[u8], decoder: &mut FrameDecoder, record: &mut TelemetryRecord) -> Vec<Option<u8>> {
    bytes
        .iter()
        .filter_map(|&byte| match decoder.feed(byte, record) {
            DecodeEvent::Accepted { slow_variant } => Some(slow_variant),
            _ => None,
        })
        .collect()
}

#[test]
fn test_slow_variants_cycle_on_the_wire() {
    let mut emulator = Emulator::new();
    let mut wire = Wire::default();
    for _ in 0..30 {
        emulator.tick(TX_INTERVAL_MS);
        emulator.send_serial(&mut wire).unwrap();
    }

    let mut decoder = FrameDecoder::new();
    let mut record = TelemetryRecord::new();
    let variants = decode_serial(&wire.bytes, &mut decoder, &mut record);

    let expected: Vec<Option<u8>> = (0..30).map(|i| Some(i % 10)).collect();
    assert_eq!(variants, expected);
    assert_eq!(record.packet_count, 30);
    assert_eq!(record.error_count, 0);
    assert_eq!(record.slow_variant, Some(9));
}

#[test]
fn test_serial_round_trip_matches_model() {
    let mut emulator = Emulator::new();
    emulator.tick(TX_INTERVAL_MS);
    let mut wire = Wire::default();
    for _ in 0..10 {
        emulator.send_serial(&mut wire).unwrap();
    }

    let mut decoder = FrameDecoder::new();
    let mut record = TelemetryRecord::new();
    assert_eq!(decode_serial(&wire.bytes, &mut decoder, &mut record).len(), 10);

    let state = emulator.model().state();
    let period = redline_protocol::wire::period_from_rpm(state.engine.rpm) as f32;
    let rpm_step = state.engine.rpm / period;
    assert!(close(state.engine.rpm, record.engine.rpm, rpm_step));
    assert!(close(state.engine.tps, record.engine.tps, scale::PERCENT_255));
    assert!(close(state.engine.map_kpa, record.engine.map_kpa, scale::PRESSURE_KPA));
    assert!(close(state.engine.lambda, record.engine.lambda, scale::LAMBDA));
    assert!(close(state.engine.ign_angle, record.engine.ign_angle, scale::IGN_ANGLE));
    assert!(close(state.engine.inj_time_ms, record.engine.inj_time_ms, scale::INJ_TIME_MS));
    assert_eq!(record.engine.runlevel, 2);

    assert!(close(state.temperatures.coolant, record.temperatures.coolant, 1.0));
    assert!(close(state.temperatures.oil, record.temperatures.oil, 1.0));
    assert!(close(state.temperatures.oil_pressure, record.temperatures.oil_pressure, scale::TENTH));
    assert_eq!(record.temperatures.egt1, 650.0);
    assert!(close(state.trip.fuel_l, record.trip.fuel_l, scale::HUNDREDTH));
    assert!(close(state.corrections.voltage, record.corrections.voltage, scale::TENTH));
    assert_eq!(record.sensor_adc, state.sensor_adc);
    assert_eq!(record.analog_adc, state.analog_adc);
    assert_eq!(record.valve_timing.vvt1_target, 10);
    assert_eq!(record.io.fuel_level, 128);
    assert!(close(state.pwm.duty[0], record.pwm.duty[0], scale::PERCENT_256));
}

#[test]
fn test_bus_round_trip_matches_model() {
    let mut emulator = Emulator::new();
    emulator.handle(Command::Gear(3));
    emulator.handle(Command::Rpm(3200.0));
    emulator.tick(TX_INTERVAL_MS);

    let mut record = TelemetryRecord::new();
    for frame in emulator.bus_frames() {
        assert!(decode_bus_frame(&frame, &mut record));
    }
    assert_eq!(record.bus_frame_count, 9);
    assert_eq!(record.packet_count, 0);
    assert!(record.connected);

    let state = emulator.model().state();
    assert_eq!(record.engine.rpm, 3200.0);
    assert_eq!(record.corrections.gear, 3);
    assert_eq!(record.bus.rpm_limit, 8000);
    assert!(close(state.engine.tps, record.engine.tps, 0.1));
    assert!(close(state.engine.map_kpa, record.engine.map_kpa, 0.01));
    assert!(close(state.bus.afr1, record.bus.afr1, 0.01));
    assert!(close(state.temperatures.coolant, record.temperatures.coolant, 0.1));
    assert!(close(state.temperatures.oil_pressure, record.temperatures.oil_pressure, 0.001));
    assert!(close(state.corrections.voltage, record.corrections.voltage, 0.1));
    assert!(close(state.temperatures.egt2, record.temperatures.egt2, 0.1));
    assert!(close(state.bus.map_target_kpa, record.bus.map_target_kpa, 0.01));
}

#[test]
fn test_override_reaches_the_decoder() {
    let mut emulator = Emulator::new();
    let mut wire = Wire::default();
    let mut decoder = FrameDecoder::new();
    let mut record = TelemetryRecord::new();

    emulator.handle(Command::parse("oilp=1.2").unwrap());
    emulator.handle(Command::parse("fault=40").unwrap());
    for _ in 0..10 {
        emulator.tick(TX_INTERVAL_MS);
        emulator.send_serial(&mut wire).unwrap();
    }
    decode_serial(&wire.bytes, &mut decoder, &mut record);

    assert!(close(1.2, record.temperatures.oil_pressure, scale::TENTH));
    assert_eq!(record.flags.major.bits(), 0x40);

    // Released channels return to the model on the next step
    emulator.handle(Command::Simulate);
    wire.bytes.clear();
    for _ in 0..10 {
        emulator.tick(TX_INTERVAL_MS);
        emulator.send_serial(&mut wire).unwrap();
    }
    decode_serial(&wire.bytes, &mut decoder, &mut record);
    assert!(record.temperatures.oil_pressure > 3.0);
    assert_eq!(record.flags.major.bits(), 0x40);
}
