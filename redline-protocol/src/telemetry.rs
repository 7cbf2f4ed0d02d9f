//! Telemetry record
//!
//! The one aggregate both transports decode into and the emulator encodes
//! from. Numeric channels start as NaN until their first update; slow
//! groups keep their last values until their turn in the rotation comes
//! round again.

use crate::bus::{BusChannels, BusMessage};
use crate::fast::FastChannels;
use crate::packet::InfoPacket;
use crate::slow::{
    AnalogAdc, Corrections, Injection, IoState, PwmOutputs, SensorAdc, SlowPacket, StatusFlags,
    Temperatures, TripComputer, ValveTiming,
};
use crate::wire::PACKET_TYPE_INFO;

/// Number of frames in one bus cycle
pub const BUS_MESSAGE_COUNT: usize = 9;

/// Every decoded engine value plus link bookkeeping
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TelemetryRecord {
    /// At least one frame accepted since the link was last considered lost
    pub connected: bool,
    /// Verified serial frames
    pub packet_count: u32,
    /// Serial frames that failed their checksum
    pub error_count: u32,
    /// Recognized bus frames
    pub bus_frame_count: u32,
    /// Packet type of the last info packet
    pub packet_type: u8,
    /// Slow index of the last info packet that carried a known variant
    pub slow_variant: Option<u8>,
    pub engine: FastChannels,
    pub corrections: Corrections,
    pub flags: StatusFlags,
    pub injection: Injection,
    pub valve_timing: ValveTiming,
    pub trip: TripComputer,
    pub sensor_adc: SensorAdc,
    pub analog_adc: AnalogAdc,
    pub io: IoState,
    pub temperatures: Temperatures,
    pub pwm: PwmOutputs,
    /// Values only the bus transport carries
    pub bus: BusChannels,
}

impl TelemetryRecord {
    pub const fn new() -> Self {
        Self {
            connected: false,
            packet_count: 0,
            error_count: 0,
            bus_frame_count: 0,
            packet_type: 0,
            slow_variant: None,
            engine: FastChannels::UNSET,
            corrections: Corrections::UNSET,
            flags: StatusFlags::UNSET,
            injection: Injection::UNSET,
            valve_timing: ValveTiming::UNSET,
            trip: TripComputer::UNSET,
            sensor_adc: SensorAdc::UNSET,
            analog_adc: AnalogAdc::UNSET,
            io: IoState::UNSET,
            temperatures: Temperatures::UNSET,
            pwm: PwmOutputs::UNSET,
            bus: BusChannels::UNSET,
        }
    }

    /// Copy the values of an info packet into the record
    ///
    /// Link bookkeeping (counters, `connected`) is left to the caller.
    pub fn apply_packet(&mut self, packet: &InfoPacket) {
        self.packet_type = packet.packet_type;
        self.engine = packet.fast;
        if let Some(slow) = &packet.slow {
            self.apply_slow(slow);
        }
    }

    pub fn apply_slow(&mut self, slow: &SlowPacket) {
        match *slow {
            SlowPacket::Corrections(group) => self.corrections = group,
            SlowPacket::Flags(group) => self.flags = group,
            SlowPacket::Injection(group) => self.injection = group,
            SlowPacket::ValveTiming(group) => self.valve_timing = group,
            SlowPacket::Trip(group) => self.trip = group,
            SlowPacket::SensorAdc(group) => self.sensor_adc = group,
            SlowPacket::AnalogAdc(group) => self.analog_adc = group,
            SlowPacket::Io(group) => self.io = group,
            SlowPacket::Temperatures(group) => self.temperatures = group,
            SlowPacket::Pwm(group) => self.pwm = group,
        }
        self.slow_variant = Some(slow.id());
    }

    /// Write the fields of one bus message
    pub fn apply_bus(&mut self, message: &BusMessage) {
        match *message {
            BusMessage::Engine {
                rpm,
                tps,
                map_kpa,
                intake_temp,
            } => {
                self.engine.rpm = rpm;
                self.engine.tps = tps;
                self.engine.map_kpa = map_kpa;
                self.temperatures.intake = intake_temp;
            }
            BusMessage::Limits {
                rpm_limit,
                afr1,
                afr2,
                lambda_trim,
            } => {
                self.bus.rpm_limit = rpm_limit;
                self.bus.afr1 = afr1;
                self.bus.afr2 = afr2;
                self.bus.lambda_trim = lambda_trim;
            }
            BusMessage::Ignition {
                ign_angle,
                dwell,
                inj_angle,
                inj_time_ms,
            } => {
                self.engine.ign_angle = ign_angle;
                self.corrections.dwell = dwell;
                self.bus.inj_angle = inj_angle;
                self.engine.inj_time_ms = inj_time_ms;
            }
            BusMessage::Duty {
                primary,
                secondary,
                secondary_angle,
                boost,
            } => {
                self.bus.inj_duty_primary = primary;
                self.bus.inj_duty_secondary = secondary;
                self.bus.inj_angle_secondary = secondary_angle;
                self.bus.boost_duty = boost;
            }
            BusMessage::Fluids {
                oil_temp,
                oil_pressure,
                coolant,
                battery_v,
            } => {
                self.temperatures.oil = oil_temp;
                self.temperatures.oil_pressure = oil_pressure;
                self.temperatures.coolant = coolant;
                self.corrections.voltage = battery_v;
            }
            BusMessage::Drivetrain {
                gear,
                map_target_kpa,
                speed,
                event_mask,
            } => {
                self.corrections.gear = gear;
                self.bus.map_target_kpa = map_target_kpa;
                self.engine.speed = speed;
                self.bus.event_mask = event_mask;
            }
            BusMessage::Knock {
                knock1_v,
                knock2_v,
                fuel_pressure_kpa,
                fuel_temp,
            } => {
                self.engine.knock_v = knock1_v;
                self.bus.knock2_v = knock2_v;
                self.corrections.fuel_pressure_kpa = fuel_pressure_kpa;
                self.temperatures.fuel = fuel_temp;
            }
            BusMessage::Exhaust {
                egt1,
                egt2,
                gpt1,
                gpt2,
            } => {
                self.temperatures.egt1 = egt1;
                self.temperatures.egt2 = egt2;
                self.bus.gpt1 = gpt1;
                self.bus.gpt2 = gpt2;
            }
            BusMessage::VehicleSpeed { speed } => self.engine.speed = speed,
        }
    }

    /// Slow group selected by `id`, `None` outside the rotation
    pub fn slow_packet(&self, id: u8) -> Option<SlowPacket> {
        let packet = match id {
            0 => SlowPacket::Corrections(self.corrections),
            1 => SlowPacket::Flags(self.flags),
            2 => SlowPacket::Injection(self.injection),
            3 => SlowPacket::ValveTiming(self.valve_timing),
            4 => SlowPacket::Trip(self.trip),
            5 => SlowPacket::SensorAdc(self.sensor_adc),
            6 => SlowPacket::AnalogAdc(self.analog_adc),
            7 => SlowPacket::Io(self.io),
            8 => SlowPacket::Temperatures(self.temperatures),
            9 => SlowPacket::Pwm(self.pwm),
            _ => return None,
        };
        Some(packet)
    }

    /// Info packet carrying the fast channels and slow group `slow_id`
    pub fn info_packet(&self, slow_id: u8) -> InfoPacket {
        InfoPacket {
            packet_type: PACKET_TYPE_INFO,
            fast: self.engine,
            slow_id,
            slow: self.slow_packet(slow_id),
        }
    }

    /// One complete bus cycle, in identifier order
    pub fn bus_messages(&self) -> [BusMessage; BUS_MESSAGE_COUNT] {
        let engine = &self.engine;
        let temps = &self.temperatures;
        let corr = &self.corrections;
        let bus = &self.bus;

        [
            BusMessage::Engine {
                rpm: engine.rpm,
                tps: engine.tps,
                map_kpa: engine.map_kpa,
                intake_temp: temps.intake,
            },
            BusMessage::Limits {
                rpm_limit: bus.rpm_limit,
                afr1: bus.afr1,
                afr2: bus.afr2,
                lambda_trim: bus.lambda_trim,
            },
            BusMessage::Ignition {
                ign_angle: engine.ign_angle,
                dwell: corr.dwell,
                inj_angle: bus.inj_angle,
                inj_time_ms: engine.inj_time_ms,
            },
            BusMessage::Duty {
                primary: bus.inj_duty_primary,
                secondary: bus.inj_duty_secondary,
                secondary_angle: bus.inj_angle_secondary,
                boost: bus.boost_duty,
            },
            BusMessage::Fluids {
                oil_temp: temps.oil,
                oil_pressure: temps.oil_pressure,
                coolant: temps.coolant,
                battery_v: corr.voltage,
            },
            BusMessage::Drivetrain {
                gear: corr.gear,
                map_target_kpa: bus.map_target_kpa,
                speed: engine.speed,
                event_mask: bus.event_mask,
            },
            BusMessage::Knock {
                knock1_v: engine.knock_v,
                knock2_v: bus.knock2_v,
                fuel_pressure_kpa: corr.fuel_pressure_kpa,
                fuel_temp: temps.fuel,
            },
            BusMessage::Exhaust {
                egt1: temps.egt1,
                egt2: temps.egt2,
                gpt1: bus.gpt1,
                gpt2: bus.gpt2,
            },
            BusMessage::VehicleSpeed {
                speed: engine.speed,
            },
        ]
    }
}

impl Default for TelemetryRecord {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::BusFrame;

    #[test]
    fn test_new_record_is_unset() {
        let record = TelemetryRecord::new();
        assert!(!record.connected);
        assert_eq!(record.packet_count, 0);
        assert_eq!(record.slow_variant, None);
        assert!(record.engine.rpm.is_nan());
        assert!(record.temperatures.coolant.is_nan());
        assert!(record.bus.afr1.is_nan());
    }

    #[test]
    fn test_apply_slow_keeps_other_groups() {
        let mut record = TelemetryRecord::new();
        let mut temps = Temperatures::UNSET;
        temps.coolant = 85.0;
        record.apply_slow(&SlowPacket::Temperatures(temps));

        let mut pwm = PwmOutputs::UNSET;
        pwm.duty[0] = 50.0;
        record.apply_slow(&SlowPacket::Pwm(pwm));

        assert_eq!(record.temperatures.coolant, 85.0);
        assert_eq!(record.pwm.duty[0], 50.0);
        assert_eq!(record.slow_variant, Some(9));
    }

    #[test]
    fn test_bus_cycle_reaches_every_field() {
        let mut source = TelemetryRecord::new();
        source.engine.rpm = 2500.0;
        source.engine.tps = 5.0;
        source.engine.map_kpa = 100.0;
        source.engine.speed = 88.0;
        source.temperatures.intake = 25.0;
        source.temperatures.oil_pressure = 3.5;
        source.corrections.gear = 3;
        source.bus.rpm_limit = 8000;
        source.bus.gpt2 = 41.5;

        let mut decoded = TelemetryRecord::new();
        for message in source.bus_messages() {
            let frame: BusFrame = message.encode();
            decoded.apply_bus(&BusMessage::decode(&frame).unwrap());
        }

        assert_eq!(decoded.engine.rpm, 2500.0);
        assert_eq!(decoded.engine.tps, 5.0);
        assert_eq!(decoded.engine.map_kpa, 100.0);
        assert_eq!(decoded.engine.speed, 88.0);
        assert_eq!(decoded.temperatures.intake, 25.0);
        assert!((decoded.temperatures.oil_pressure - 3.5).abs() < 1e-5);
        assert_eq!(decoded.corrections.gear, 3);
        assert_eq!(decoded.bus.rpm_limit, 8000);
        assert!((decoded.bus.gpt2 - 41.5).abs() < 1e-4);
        // NaN sources encode as zero
        assert_eq!(decoded.bus.afr1, 0.0);
    }

    #[test]
    fn test_info_packet_outside_rotation() {
        let record = TelemetryRecord::new();
        let packet = record.info_packet(10);
        assert_eq!(packet.slow_id, 10);
        assert_eq!(packet.slow, None);
        assert_eq!(record.info_packet(4).slow.map(|slow| slow.id()), Some(4));
    }
}
