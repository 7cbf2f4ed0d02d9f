//! Rotating slow variants
//!
//! Every info packet ends with one 11-byte group chosen by the slow index
//! byte. Each group is its own struct with explicit per-field
//! serialization; [`SlowPacket`] tags which one a packet carried.
//! Trailing bytes a layout does not use encode as zero.

use crate::flags::{AtState, FlagMajor, FlagMinor, FlagNotify, FlagNotify2, FlagProtection};
use crate::wire::{self, scale, SLOW_PACKET_SIZE};

/// Raw bytes of one slow variant
pub type SlowBytes = [u8; SLOW_PACKET_SIZE];

/// Byte layout of one slow variant
pub trait SlowLayout: Sized {
    /// Slow index that selects this layout
    const ID: u8;

    fn decode(raw: &SlowBytes) -> Self;

    fn encode(&self) -> SlowBytes;
}

/// Variant 0: corrections and electrical
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Corrections {
    /// Ignition correction, degrees
    pub corr_angle: i8,
    pub lambda_target: f32,
    pub lambda_corr_fast: i8,
    pub lambda_corr_slow: i8,
    pub fuel_pressure_kpa: f32,
    /// Coil dwell in ECU units
    pub dwell: f32,
    /// Battery voltage, V
    pub voltage: f32,
    pub gear: i8,
    /// Commanded electronic throttle position (raw)
    pub dbw_commanded: u8,
    pub lambda2: f32,
}

impl Corrections {
    pub const UNSET: Self = Self {
        corr_angle: 0,
        lambda_target: f32::NAN,
        lambda_corr_fast: 0,
        lambda_corr_slow: 0,
        fuel_pressure_kpa: f32::NAN,
        dwell: f32::NAN,
        voltage: f32::NAN,
        gear: 0,
        dbw_commanded: 0,
        lambda2: f32::NAN,
    };
}

impl SlowLayout for Corrections {
    const ID: u8 = 0;

    fn decode(raw: &SlowBytes) -> Self {
        Self {
            corr_angle: raw[0] as i8,
            lambda_target: raw[1] as f32 * scale::LAMBDA,
            lambda_corr_fast: raw[2] as i8,
            lambda_corr_slow: raw[3] as i8,
            fuel_pressure_kpa: wire::read_u16(raw, 4) as f32,
            dwell: raw[6] as f32,
            voltage: raw[7] as f32 * scale::TENTH,
            gear: raw[8] as i8,
            dbw_commanded: raw[9],
            lambda2: raw[10] as f32 * scale::LAMBDA,
        }
    }

    fn encode(&self) -> SlowBytes {
        let mut raw = [0u8; SLOW_PACKET_SIZE];
        raw[0] = self.corr_angle as u8;
        raw[1] = wire::to_u8(self.lambda_target, scale::LAMBDA);
        raw[2] = self.lambda_corr_fast as u8;
        raw[3] = self.lambda_corr_slow as u8;
        wire::write_u16(&mut raw, 4, wire::to_u16(self.fuel_pressure_kpa, 1.0));
        raw[6] = wire::to_u8(self.dwell, 1.0);
        raw[7] = wire::to_u8(self.voltage, scale::TENTH);
        raw[8] = self.gear as u8;
        raw[9] = self.dbw_commanded;
        raw[10] = wire::to_u8(self.lambda2, scale::LAMBDA);
        raw
    }
}

/// Variant 1: status flags and boost
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StatusFlags {
    pub major: FlagMajor,
    pub minor: FlagMinor,
    pub notify: FlagNotify,
    pub notify2: FlagNotify2,
    pub protection: FlagProtection,
    /// Idle air valve position, %
    pub idle_position: f32,
    pub airflow: u16,
    pub boost_duty: u8,
    pub boost_target: u8,
}

impl StatusFlags {
    pub const UNSET: Self = Self {
        major: FlagMajor::empty(),
        minor: FlagMinor::empty(),
        notify: FlagNotify::empty(),
        notify2: FlagNotify2::empty(),
        protection: FlagProtection::empty(),
        idle_position: f32::NAN,
        airflow: 0,
        boost_duty: 0,
        boost_target: 0,
    };
}

impl SlowLayout for StatusFlags {
    const ID: u8 = 1;

    fn decode(raw: &SlowBytes) -> Self {
        Self {
            major: FlagMajor::from_bits_retain(raw[0]),
            minor: FlagMinor::from_bits_retain(raw[1]),
            notify: FlagNotify::from_bits_retain(raw[2]),
            notify2: FlagNotify2::from_bits_retain(raw[3]),
            protection: FlagProtection::from_bits_retain(raw[4]),
            idle_position: raw[5] as f32 * scale::PERCENT_256,
            airflow: wire::read_u16(raw, 6),
            boost_duty: raw[8],
            boost_target: raw[9],
        }
    }

    fn encode(&self) -> SlowBytes {
        let mut raw = [0u8; SLOW_PACKET_SIZE];
        raw[0] = self.major.bits();
        raw[1] = self.minor.bits();
        raw[2] = self.notify.bits();
        raw[3] = self.notify2.bits();
        raw[4] = self.protection.bits();
        raw[5] = wire::to_u8(self.idle_position, scale::PERCENT_256);
        wire::write_u16(&mut raw, 6, self.airflow);
        raw[8] = self.boost_duty;
        raw[9] = self.boost_target;
        raw
    }
}

/// Variant 2: injection details
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Injection {
    pub egr_position: u8,
    pub egr_target: u8,
    /// Injector duty cycle, %
    pub inj_duty: u8,
    pub inj_lag_time: i16,
    pub inj_end_angle: i8,
    pub fuel_pressure_coef: u8,
    pub air_charge_temp: i8,
    pub air_charge_corr: i8,
    /// Secondary speed sensor, km/h
    pub speed2: u8,
    /// Exhaust back pressure, kPa
    pub back_pressure_kpa: f32,
}

impl Injection {
    pub const UNSET: Self = Self {
        egr_position: 0,
        egr_target: 0,
        inj_duty: 0,
        inj_lag_time: 0,
        inj_end_angle: 0,
        fuel_pressure_coef: 0,
        air_charge_temp: 0,
        air_charge_corr: 0,
        speed2: 0,
        back_pressure_kpa: f32::NAN,
    };
}

impl SlowLayout for Injection {
    const ID: u8 = 2;

    fn decode(raw: &SlowBytes) -> Self {
        Self {
            egr_position: raw[0],
            egr_target: raw[1],
            inj_duty: raw[2],
            inj_lag_time: wire::read_i16(raw, 3),
            inj_end_angle: raw[5] as i8,
            fuel_pressure_coef: raw[6],
            air_charge_temp: raw[7] as i8,
            air_charge_corr: raw[8] as i8,
            speed2: raw[9],
            back_pressure_kpa: raw[10] as f32 * scale::PRESSURE_KPA,
        }
    }

    fn encode(&self) -> SlowBytes {
        let mut raw = [0u8; SLOW_PACKET_SIZE];
        raw[0] = self.egr_position;
        raw[1] = self.egr_target;
        raw[2] = self.inj_duty;
        wire::write_i16(&mut raw, 3, self.inj_lag_time);
        raw[5] = self.inj_end_angle as u8;
        raw[6] = self.fuel_pressure_coef;
        raw[7] = self.air_charge_temp as u8;
        raw[8] = self.air_charge_corr as u8;
        raw[9] = self.speed2;
        raw[10] = wire::to_u8(self.back_pressure_kpa, scale::PRESSURE_KPA);
        raw
    }
}

/// Variant 3: variable valve timing and traction
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ValveTiming {
    pub ign_accel_corr: i16,
    pub vvt1_current: i8,
    pub vvt1_target: i8,
    pub vvt2_current: i8,
    pub vvt2_target: i8,
    pub vvt1b_current: i8,
    pub vvt2b_current: i8,
    pub traction_corr: u8,
    /// 3D PWM output target, %
    pub pwm3d_target: f32,
    /// 3D PWM output actual, %
    pub pwm3d_current: f32,
}

impl ValveTiming {
    pub const UNSET: Self = Self {
        ign_accel_corr: 0,
        vvt1_current: 0,
        vvt1_target: 0,
        vvt2_current: 0,
        vvt2_target: 0,
        vvt1b_current: 0,
        vvt2b_current: 0,
        traction_corr: 0,
        pwm3d_target: f32::NAN,
        pwm3d_current: f32::NAN,
    };
}

impl SlowLayout for ValveTiming {
    const ID: u8 = 3;

    fn decode(raw: &SlowBytes) -> Self {
        Self {
            ign_accel_corr: wire::read_i16(raw, 0),
            vvt1_current: raw[2] as i8,
            vvt1_target: raw[3] as i8,
            vvt2_current: raw[4] as i8,
            vvt2_target: raw[5] as i8,
            vvt1b_current: raw[6] as i8,
            vvt2b_current: raw[7] as i8,
            traction_corr: raw[8],
            pwm3d_target: raw[9] as f32 * scale::PERCENT_256,
            pwm3d_current: raw[10] as f32 * scale::PERCENT_256,
        }
    }

    fn encode(&self) -> SlowBytes {
        let mut raw = [0u8; SLOW_PACKET_SIZE];
        wire::write_i16(&mut raw, 0, self.ign_accel_corr);
        raw[2] = self.vvt1_current as u8;
        raw[3] = self.vvt1_target as u8;
        raw[4] = self.vvt2_current as u8;
        raw[5] = self.vvt2_target as u8;
        raw[6] = self.vvt1b_current as u8;
        raw[7] = self.vvt2b_current as u8;
        raw[8] = self.traction_corr;
        raw[9] = wire::to_u8(self.pwm3d_target, scale::PERCENT_256);
        raw[10] = wire::to_u8(self.pwm3d_current, scale::PERCENT_256);
        raw
    }
}

/// Variant 4: trip computer
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TripComputer {
    /// Fuel used this trip, l
    pub fuel_l: f32,
    /// Distance this trip, km
    pub distance_km: f32,
    /// Instant consumption
    pub current_consumption: f32,
    /// Average consumption this trip
    pub trip_consumption: f32,
    /// Ethanol/methanol content, %
    pub fuel_composition: f32,
}

impl TripComputer {
    pub const UNSET: Self = Self {
        fuel_l: f32::NAN,
        distance_km: f32::NAN,
        current_consumption: f32::NAN,
        trip_consumption: f32::NAN,
        fuel_composition: f32::NAN,
    };
}

impl SlowLayout for TripComputer {
    const ID: u8 = 4;

    fn decode(raw: &SlowBytes) -> Self {
        Self {
            fuel_l: wire::read_u16(raw, 0) as f32 * scale::HUNDREDTH,
            distance_km: wire::read_u16(raw, 2) as f32 * scale::TENTH,
            current_consumption: wire::read_u16(raw, 4) as f32 * scale::TENTH,
            trip_consumption: wire::read_u16(raw, 6) as f32 * scale::TENTH,
            fuel_composition: raw[8] as f32 * scale::PERCENT_256,
        }
    }

    fn encode(&self) -> SlowBytes {
        let mut raw = [0u8; SLOW_PACKET_SIZE];
        wire::write_u16(&mut raw, 0, wire::to_u16(self.fuel_l, scale::HUNDREDTH));
        wire::write_u16(&mut raw, 2, wire::to_u16(self.distance_km, scale::TENTH));
        wire::write_u16(&mut raw, 4, wire::to_u16(self.current_consumption, scale::TENTH));
        wire::write_u16(&mut raw, 6, wire::to_u16(self.trip_consumption, scale::TENTH));
        raw[8] = wire::to_u8(self.fuel_composition, scale::PERCENT_256);
        raw
    }
}

/// Variant 5: sensor ADC counts and injection slot timing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SensorAdc {
    pub tps: u8,
    pub coolant: u8,
    pub intake: u8,
    pub dbw1: u8,
    pub dbw2: u8,
    pub map: u8,
    pub lambda: u8,
    pub slot_no: u8,
    pub slot_latency: u8,
    pub slot_time: u8,
}

impl SensorAdc {
    pub const UNSET: Self = Self {
        tps: 0,
        coolant: 0,
        intake: 0,
        dbw1: 0,
        dbw2: 0,
        map: 0,
        lambda: 0,
        slot_no: 0,
        slot_latency: 0,
        slot_time: 0,
    };
}

impl SlowLayout for SensorAdc {
    const ID: u8 = 5;

    fn decode(raw: &SlowBytes) -> Self {
        Self {
            tps: raw[0],
            coolant: raw[1],
            intake: raw[2],
            dbw1: raw[3],
            dbw2: raw[4],
            map: raw[5],
            lambda: raw[6],
            slot_no: raw[7],
            slot_latency: raw[8],
            slot_time: raw[9],
        }
    }

    fn encode(&self) -> SlowBytes {
        [
            self.tps,
            self.coolant,
            self.intake,
            self.dbw1,
            self.dbw2,
            self.map,
            self.lambda,
            self.slot_no,
            self.slot_latency,
            self.slot_time,
            0,
        ]
    }
}

/// Number of auxiliary analog inputs
pub const ANALOG_INPUTS: usize = 10;

/// Variant 6: auxiliary analog input counts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AnalogAdc {
    pub inputs: [u8; ANALOG_INPUTS],
}

impl AnalogAdc {
    pub const UNSET: Self = Self {
        inputs: [0; ANALOG_INPUTS],
    };

    /// Input `index` in volts
    pub fn volts(&self, index: usize) -> Option<f32> {
        self.inputs
            .get(index)
            .map(|&count| count as f32 * scale::ADC_VOLTS)
    }
}

impl SlowLayout for AnalogAdc {
    const ID: u8 = 6;

    fn decode(raw: &SlowBytes) -> Self {
        let mut inputs = [0u8; ANALOG_INPUTS];
        inputs.copy_from_slice(&raw[..ANALOG_INPUTS]);
        Self { inputs }
    }

    fn encode(&self) -> SlowBytes {
        let mut raw = [0u8; SLOW_PACKET_SIZE];
        raw[..ANALOG_INPUTS].copy_from_slice(&self.inputs);
        raw
    }
}

/// Variant 7: discrete I/O and gearbox
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct IoState {
    pub inputs: u8,
    pub outputs: u16,
    pub dbw_driver_status: u8,
    pub dbw_system_status: u8,
    pub gas_state: u8,
    /// Gearbox oil temperature, °C
    pub at_temp: i8,
    pub at_state: AtState,
    pub fuel_level: u8,
}

impl IoState {
    pub const UNSET: Self = Self {
        inputs: 0,
        outputs: 0,
        dbw_driver_status: 0,
        dbw_system_status: 0,
        gas_state: 0,
        at_temp: 0,
        at_state: AtState::empty(),
        fuel_level: 0,
    };
}

impl SlowLayout for IoState {
    const ID: u8 = 7;

    fn decode(raw: &SlowBytes) -> Self {
        Self {
            inputs: raw[0],
            outputs: wire::read_u16(raw, 1),
            dbw_driver_status: raw[3],
            dbw_system_status: raw[4],
            gas_state: raw[5],
            at_temp: raw[6] as i8,
            at_state: AtState::from_bits_retain(raw[7]),
            fuel_level: raw[8],
        }
    }

    fn encode(&self) -> SlowBytes {
        let mut raw = [0u8; SLOW_PACKET_SIZE];
        raw[0] = self.inputs;
        wire::write_u16(&mut raw, 1, self.outputs);
        raw[3] = self.dbw_driver_status;
        raw[4] = self.dbw_system_status;
        raw[5] = self.gas_state;
        raw[6] = self.at_temp as u8;
        raw[7] = self.at_state.bits();
        raw[8] = self.fuel_level;
        raw
    }
}

/// Variant 8: temperatures and pressures
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Temperatures {
    /// Coolant, °C
    pub coolant: f32,
    /// Intake air, °C
    pub intake: f32,
    /// Oil, °C
    pub oil: f32,
    /// Fuel, °C
    pub fuel: f32,
    /// Exhaust gas 1, °C
    pub egt1: f32,
    /// Exhaust gas 2, °C
    pub egt2: f32,
    /// Oil pressure, bar
    pub oil_pressure: f32,
}

impl Temperatures {
    pub const UNSET: Self = Self {
        coolant: f32::NAN,
        intake: f32::NAN,
        oil: f32::NAN,
        fuel: f32::NAN,
        egt1: f32::NAN,
        egt2: f32::NAN,
        oil_pressure: f32::NAN,
    };
}

impl SlowLayout for Temperatures {
    const ID: u8 = 8;

    fn decode(raw: &SlowBytes) -> Self {
        Self {
            coolant: raw[0] as i8 as f32,
            intake: raw[1] as i8 as f32,
            oil: raw[2] as f32,
            fuel: raw[3] as i8 as f32,
            egt1: wire::read_u16(raw, 5) as f32,
            egt2: wire::read_u16(raw, 7) as f32,
            oil_pressure: raw[9] as f32 * scale::TENTH,
        }
    }

    fn encode(&self) -> SlowBytes {
        let mut raw = [0u8; SLOW_PACKET_SIZE];
        raw[0] = wire::to_i8(self.coolant, 1.0) as u8;
        raw[1] = wire::to_i8(self.intake, 1.0) as u8;
        raw[2] = wire::to_u8(self.oil, 1.0);
        raw[3] = wire::to_i8(self.fuel, 1.0) as u8;
        wire::write_u16(&mut raw, 5, wire::to_u16(self.egt1, 1.0));
        wire::write_u16(&mut raw, 7, wire::to_u16(self.egt2, 1.0));
        raw[9] = wire::to_u8(self.oil_pressure, scale::TENTH);
        raw
    }
}

/// Number of PWM outputs reported
pub const PWM_CHANNELS: usize = 6;

/// Variant 9: PWM output duties
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PwmOutputs {
    /// Duty per output, %
    pub duty: [f32; PWM_CHANNELS],
}

impl PwmOutputs {
    pub const UNSET: Self = Self {
        duty: [f32::NAN; PWM_CHANNELS],
    };
}

impl SlowLayout for PwmOutputs {
    const ID: u8 = 9;

    fn decode(raw: &SlowBytes) -> Self {
        let mut duty = [0.0; PWM_CHANNELS];
        for (slot, &byte) in duty.iter_mut().zip(raw.iter()) {
            *slot = byte as f32 * scale::PERCENT_256;
        }
        Self { duty }
    }

    fn encode(&self) -> SlowBytes {
        let mut raw = [0u8; SLOW_PACKET_SIZE];
        for (byte, &duty) in raw.iter_mut().zip(self.duty.iter()) {
            *byte = wire::to_u8(duty, scale::PERCENT_256);
        }
        raw
    }
}

/// One decoded slow variant, tagged by its index
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SlowPacket {
    Corrections(Corrections),
    Flags(StatusFlags),
    Injection(Injection),
    ValveTiming(ValveTiming),
    Trip(TripComputer),
    SensorAdc(SensorAdc),
    AnalogAdc(AnalogAdc),
    Io(IoState),
    Temperatures(Temperatures),
    Pwm(PwmOutputs),
}

impl SlowPacket {
    /// Decode the variant selected by `id`; `None` for ids outside 0..=9
    pub fn decode(id: u8, raw: &SlowBytes) -> Option<Self> {
        let packet = match id {
            Corrections::ID => Self::Corrections(Corrections::decode(raw)),
            StatusFlags::ID => Self::Flags(StatusFlags::decode(raw)),
            Injection::ID => Self::Injection(Injection::decode(raw)),
            ValveTiming::ID => Self::ValveTiming(ValveTiming::decode(raw)),
            TripComputer::ID => Self::Trip(TripComputer::decode(raw)),
            SensorAdc::ID => Self::SensorAdc(SensorAdc::decode(raw)),
            AnalogAdc::ID => Self::AnalogAdc(AnalogAdc::decode(raw)),
            IoState::ID => Self::Io(IoState::decode(raw)),
            Temperatures::ID => Self::Temperatures(Temperatures::decode(raw)),
            PwmOutputs::ID => Self::Pwm(PwmOutputs::decode(raw)),
            _ => return None,
        };
        Some(packet)
    }

    /// Slow index of this variant
    pub fn id(&self) -> u8 {
        match self {
            Self::Corrections(_) => Corrections::ID,
            Self::Flags(_) => StatusFlags::ID,
            Self::Injection(_) => Injection::ID,
            Self::ValveTiming(_) => ValveTiming::ID,
            Self::Trip(_) => TripComputer::ID,
            Self::SensorAdc(_) => SensorAdc::ID,
            Self::AnalogAdc(_) => AnalogAdc::ID,
            Self::Io(_) => IoState::ID,
            Self::Temperatures(_) => Temperatures::ID,
            Self::Pwm(_) => PwmOutputs::ID,
        }
    }

    pub fn encode(&self) -> SlowBytes {
        match self {
            Self::Corrections(group) => group.encode(),
            Self::Flags(group) => group.encode(),
            Self::Injection(group) => group.encode(),
            Self::ValveTiming(group) => group.encode(),
            Self::Trip(group) => group.encode(),
            Self::SensorAdc(group) => group.encode(),
            Self::AnalogAdc(group) => group.encode(),
            Self::Io(group) => group.encode(),
            Self::Temperatures(group) => group.encode(),
            Self::Pwm(group) => group.encode(),
        }
    }
}
