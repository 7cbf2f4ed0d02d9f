//! Engine model
//!
//! A warm idle that drifts slowly around its set points. Every channel is
//! held in engineering units inside a [`TelemetryRecord`], which the
//! encoder turns into wire frames unchanged.

use bitflags::bitflags;
use redline_protocol::flags::FlagNotify;
use redline_protocol::slow::{AnalogAdc, ANALOG_INPUTS};
use redline_protocol::wire::{scale, to_u8};
use redline_protocol::TelemetryRecord;

use super::wave::{exp, sin};

/// Stoichiometric air/fuel ratio of petrol
pub const STOICH_AFR: f32 = 14.7;

/// Coolant temperature the warm-up converges on (°C)
const COOLANT_TARGET: f32 = 90.0;

/// Length of the warm-up phase (s)
const WARM_UP_S: f32 = 180.0;

bitflags! {
    /// Channels held at an operator value instead of following the model
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Pinned: u16 {
        const RPM = 1 << 0;
        /// Throttle and drive-by-wire position
        const THROTTLE = 1 << 1;
        const MAP = 1 << 2;
        /// Both lambda sensors
        const LAMBDA = 1 << 3;
        const IGNITION = 1 << 4;
        const COOLANT = 1 << 5;
        const OIL_TEMP = 1 << 6;
        const OIL_PRESSURE = 1 << 7;
    }
}

/// Simulated engine state
#[derive(Debug, Clone)]
pub struct EngineModel {
    state: TelemetryRecord,
    /// Time since start (s)
    sim_time_s: f32,
    pinned: Pinned,
}

impl Default for EngineModel {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineModel {
    /// Warm idle at 850 rpm
    pub fn new() -> Self {
        let mut model = Self {
            state: idle_state(),
            sim_time_s: 0.0,
            pinned: Pinned::empty(),
        };
        model.derive_bus_channels();
        model
    }

    pub fn state(&self) -> &TelemetryRecord {
        &self.state
    }

    /// Direct access for operator overrides
    ///
    /// Callers changing a simulated channel should also [`pin`](Self::pin)
    /// it, or the next step overwrites the change.
    pub fn state_mut(&mut self) -> &mut TelemetryRecord {
        &mut self.state
    }

    pub fn sim_time_s(&self) -> f32 {
        self.sim_time_s
    }

    pub fn pinned(&self) -> Pinned {
        self.pinned
    }

    pub fn pin(&mut self, channels: Pinned) {
        self.pinned.insert(channels);
    }

    /// Return every channel to the simulation
    pub fn release_all(&mut self) {
        self.pinned = Pinned::empty();
    }

    /// Advance the simulation by `dt_s` seconds
    pub fn step(&mut self, dt_s: f32) {
        self.sim_time_s += dt_s;
        let t = self.sim_time_s;
        let pinned = self.pinned;

        let engine = &mut self.state.engine;
        if !pinned.contains(Pinned::RPM) {
            engine.rpm = 850.0 + 30.0 * sin(0.5 * t);
        }
        if !pinned.contains(Pinned::THROTTLE) {
            engine.tps = 5.0 + sin(0.3 * t);
            engine.dbw_pos = engine.tps;
        }
        if !pinned.contains(Pinned::MAP) {
            engine.map_kpa = 35.0 + 3.0 * sin(0.4 * t);
        }
        if !pinned.contains(Pinned::LAMBDA) {
            engine.lambda = 1.0 + 0.02 * sin(2.0 * t);
            self.state.corrections.lambda2 = engine.lambda;
        }
        if !pinned.contains(Pinned::IGNITION) {
            engine.ign_angle = 12.0 + 2.0 * sin(0.6 * t);
        }
        engine.inj_time_ms = 2.5 + 0.3 * sin(0.5 * t);

        // Four cylinders, two firings per crank revolution
        engine.cyl_no = ((t * engine.rpm / 60.0 * 2.0) as u32 % 4) as u8;
        let rpm = engine.rpm;
        let fuel_flow = engine.fuel_flow;

        let corrections = &mut self.state.corrections;
        corrections.voltage = 14.0 + 0.2 * sin(1.5 * t);
        corrections.lambda_corr_fast = (5.0 * sin(2.0 * t)) as i8;
        corrections.lambda_corr_slow = (2.0 * sin(0.2 * t)) as i8;

        let temps = &mut self.state.temperatures;
        if !pinned.contains(Pinned::COOLANT) {
            temps.coolant = if t < WARM_UP_S {
                let alpha = 1.0 - exp(-t / 60.0);
                let k = alpha * dt_s * 0.05;
                (temps.coolant * (1.0 - k) + COOLANT_TARGET * k).min(COOLANT_TARGET)
            } else {
                88.0 + 2.0 * sin(0.1 * t)
            };
        }
        if !pinned.contains(Pinned::OIL_TEMP) {
            let target = (temps.coolant + 10.0 + 3.0 * sin(0.08 * t)).clamp(0.0, 150.0);
            temps.oil += (target - temps.oil) * dt_s * 0.02;
        }
        if !pinned.contains(Pinned::OIL_PRESSURE) {
            temps.oil_pressure = (3.0 + 0.5 * rpm / 1000.0 - 0.1 * sin(0.15 * t)).max(0.5);
        }

        // Fuel flow is in litres per hour
        self.state.trip.fuel_l += fuel_flow * dt_s / 3600.0;

        self.derive_bus_channels();
    }

    /// Bus-only channels that follow from serial-side values
    fn derive_bus_channels(&mut self) {
        let state = &mut self.state;
        state.bus.afr1 = state.engine.lambda * STOICH_AFR;
        state.bus.afr2 = state.corrections.lambda2 * STOICH_AFR;
        state.bus.lambda_trim = state.corrections.lambda_corr_fast as f32;
        state.bus.inj_angle = state.injection.inj_end_angle as f32;
        state.bus.inj_duty_primary = state.injection.inj_duty as f32;
        state.bus.boost_duty = state.flags.boost_duty as f32;
        state.bus.knock2_v = state.engine.knock_v;
    }
}

fn adc_counts(volts: f32) -> u8 {
    to_u8(volts, scale::ADC_VOLTS)
}

/// Warm idle set points
fn idle_state() -> TelemetryRecord {
    let mut state = TelemetryRecord::new();

    let engine = &mut state.engine;
    engine.runlevel = 2;
    engine.ign_angle = 10.0;
    engine.fuel_flow = 1.5;
    engine.rpm = 850.0;
    engine.inj_time_ms = 2.5;
    engine.knock_v = 10.0 * scale::KNOCK_V;
    engine.tps = 5.0;
    engine.dbw_pos = 5.0;
    engine.map_kpa = 35.0;
    engine.lambda = 1.0;
    engine.cyl_no = 0;
    engine.transient_corr = 0;
    engine.speed = 0.0;
    engine.diagnostics = Default::default();

    let corrections = &mut state.corrections;
    corrections.corr_angle = -2;
    corrections.lambda_target = 1.0;
    corrections.lambda_corr_fast = 3;
    corrections.lambda_corr_slow = -1;
    corrections.fuel_pressure_kpa = 300.0;
    corrections.dwell = 35.0;
    corrections.voltage = 14.1;
    corrections.gear = 0;
    corrections.dbw_commanded = 12;
    corrections.lambda2 = 1.02;

    let flags = &mut state.flags;
    flags.major = Default::default();
    flags.minor = Default::default();
    flags.notify = FlagNotify::PHASED_MODE;
    flags.notify2 = Default::default();
    flags.protection = Default::default();
    flags.idle_position = 30.0;
    flags.airflow = 120;
    flags.boost_duty = 0;
    flags.boost_target = 50;

    let injection = &mut state.injection;
    injection.egr_position = 0;
    injection.egr_target = 0;
    injection.inj_duty = 15;
    injection.inj_lag_time = 120;
    injection.inj_end_angle = -20;
    injection.fuel_pressure_coef = 100;
    injection.air_charge_temp = 25;
    injection.air_charge_corr = 0;
    injection.speed2 = 0;
    injection.back_pressure_kpa = 101.0;

    let valve_timing = &mut state.valve_timing;
    valve_timing.ign_accel_corr = 0;
    valve_timing.vvt1_current = 5;
    valve_timing.vvt1_target = 10;
    valve_timing.vvt2_current = 0;
    valve_timing.vvt2_target = 0;
    valve_timing.vvt1b_current = 0;
    valve_timing.vvt2b_current = 0;
    valve_timing.traction_corr = 0;
    valve_timing.pwm3d_target = 0.0;
    valve_timing.pwm3d_current = 0.0;

    let trip = &mut state.trip;
    trip.fuel_l = 3.25;
    trip.distance_km = 42.5;
    trip.current_consumption = 7.6;
    trip.trip_consumption = 7.6;
    trip.fuel_composition = 0.0;

    let adc = &mut state.sensor_adc;
    adc.tps = adc_counts(0.8);
    adc.coolant = adc_counts(2.1);
    adc.intake = adc_counts(2.5);
    adc.dbw1 = adc_counts(0.8);
    adc.dbw2 = adc_counts(3.2);
    adc.map = adc_counts(1.0);
    adc.lambda = adc_counts(0.45);
    adc.slot_no = 0;
    adc.slot_latency = 0;
    adc.slot_time = 0;

    state.analog_adc = AnalogAdc {
        inputs: [adc_counts(1.0); ANALOG_INPUTS],
    };

    let io = &mut state.io;
    io.inputs = 0;
    io.outputs = 0;
    io.dbw_driver_status = 0;
    io.dbw_system_status = 0;
    io.gas_state = 0;
    io.at_temp = 60;
    io.at_state = Default::default();
    io.fuel_level = 128;

    let temps = &mut state.temperatures;
    temps.coolant = 85.0;
    temps.intake = 30.0;
    temps.oil = 95.0;
    temps.fuel = 35.0;
    temps.egt1 = 650.0;
    temps.egt2 = 640.0;
    temps.oil_pressure = 3.5;

    state.pwm.duty = [50.0, 0.0, 0.0, 0.0, 0.0, 0.0];

    let bus = &mut state.bus;
    bus.rpm_limit = 8000;
    bus.inj_duty_secondary = 0.0;
    bus.inj_angle_secondary = 0.0;
    bus.map_target_kpa = 100.0;
    bus.event_mask = 0;
    bus.gpt1 = 0.0;
    bus.gpt2 = 0.0;

    state
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_idle_state_is_complete() {
        let model = EngineModel::new();
        let state = model.state();
        assert_eq!(state.engine.rpm, 850.0);
        assert_eq!(state.sensor_adc.tps, 41);
        assert_eq!(state.sensor_adc.dbw2, 164);
        assert_eq!(state.analog_adc.inputs, [51; ANALOG_INPUTS]);
        assert!((state.bus.afr1 - 14.7).abs() < 1e-4);
        assert!((state.bus.afr2 - 1.02 * 14.7).abs() < 1e-4);
        assert_eq!(state.bus.inj_angle, -20.0);
        assert_eq!(state.bus.knock2_v, state.engine.knock_v);
        assert!(state.flags.notify.contains(FlagNotify::PHASED_MODE));

        // Every slow group carries a value after the first step
        let mut model = model;
        model.step(0.02);
        for id in 0..10 {
            assert!(model.state().slow_packet(id).is_some());
        }
    }

    #[test]
    fn test_simulation_stays_near_idle() {
        let mut model = EngineModel::new();
        for _ in 0..10_000 {
            model.step(0.02);
            let state = model.state();
            assert!((819.0..=881.0).contains(&state.engine.rpm));
            assert!((3.9..=6.1).contains(&state.engine.tps));
            assert_eq!(state.engine.tps, state.engine.dbw_pos);
            assert!((31.9..=38.1).contains(&state.engine.map_kpa));
            assert!(state.engine.cyl_no < 4);
            assert!(state.temperatures.coolant <= COOLANT_TARGET);
            assert!(state.temperatures.oil_pressure >= 0.5);
            assert!((-5..=5).contains(&state.corrections.lambda_corr_fast));
        }
        assert!((model.sim_time_s() - 200.0).abs() < 0.1);
    }

    #[test]
    fn test_coolant_warms_towards_target() {
        let mut model = EngineModel::new();
        let start = model.state().temperatures.coolant;
        for _ in 0..5000 {
            model.step(0.02);
        }
        let warm = model.state().temperatures.coolant;
        assert!(warm > start);
        assert!(warm <= COOLANT_TARGET);
    }

    #[test]
    fn test_trip_fuel_accumulates() {
        let mut model = EngineModel::new();
        // One hour at 1.5 L/h
        for _ in 0..3600 {
            model.step(1.0);
        }
        assert!((model.state().trip.fuel_l - 4.75).abs() < 0.01);
    }

    #[test]
    fn test_pinned_channels_hold() {
        let mut model = EngineModel::new();
        model.state_mut().engine.rpm = 6500.0;
        model.state_mut().temperatures.coolant = 110.0;
        model.pin(Pinned::RPM | Pinned::COOLANT);

        for _ in 0..100 {
            model.step(0.02);
        }
        assert_eq!(model.state().engine.rpm, 6500.0);
        assert_eq!(model.state().temperatures.coolant, 110.0);
        // Oil pressure follows the pinned speed
        assert!(model.state().temperatures.oil_pressure > 6.0);

        model.release_all();
        model.step(0.02);
        assert!(model.state().engine.rpm < 900.0);
        assert!(model.state().temperatures.coolant <= COOLANT_TARGET);
    }
}
