//! Frame bus table
//!
//! Every frame carries eight data bytes split into four little-endian
//! 16-bit slots. The identifier selects which quantities the slots hold
//! and their scale; bus resolutions differ from the serial ones for the
//! same quantity.
//!
//! | ID    | slot 0        | slot 1          | slot 2          | slot 3         |
//! |-------|---------------|-----------------|-----------------|----------------|
//! | 0x300 | rpm           | TPS ×0.1        | MAP ×0.01       | IAT ×0.1       |
//! | 0x301 | rpm limit     | AFR1 ×0.01      | AFR2 ×0.01      | lambda trim ×0.1 |
//! | 0x302 | ignition ×0.1 | dwell ×0.1      | inj angle ×0.1  | inj pulse ×0.001 |
//! | 0x303 | pri duty ×0.1 | sec duty ×0.1   | sec angle ×0.1  | boost duty ×0.1 |
//! | 0x304 | oil T ×0.1    | oil P ×0.1 kPa  | coolant ×0.1    | battery ×0.1   |
//! | 0x305 | gear          | MAP target ×0.01| speed ×0.1      | event mask     |
//! | 0x306 | knock1 ×0.1   | knock2 ×0.1     | fuel P ×0.1     | fuel T ×0.1    |
//! | 0x307 | EGT1 ×0.1     | EGT2 ×0.1       | GPT1 ×0.1       | GPT2 ×0.1      |
//! | 0x340 | speed ×0.1    |                 |                 |                |

use crate::wire;

/// First identifier of the engine block
pub const BASE_ID: u32 = 0x300;

pub const ID_ENGINE: u32 = BASE_ID;
pub const ID_LIMITS: u32 = BASE_ID + 0x01;
pub const ID_IGNITION: u32 = BASE_ID + 0x02;
pub const ID_DUTY: u32 = BASE_ID + 0x03;
pub const ID_FLUIDS: u32 = BASE_ID + 0x04;
pub const ID_DRIVETRAIN: u32 = BASE_ID + 0x05;
pub const ID_KNOCK: u32 = BASE_ID + 0x06;
pub const ID_EXHAUST: u32 = BASE_ID + 0x07;
pub const ID_VEHICLE_SPEED: u32 = BASE_ID + 0x40;

/// Data bytes per frame
pub const BUS_DATA_LEN: usize = 8;

const TENTH: f32 = 0.1;
const HUNDREDTH: f32 = 0.01;
const MILLI: f32 = 0.001;
/// Oil pressure travels in kPa
const KPA_PER_BAR: f32 = 100.0;

/// One received or emitted bus frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BusFrame {
    pub id: u32,
    pub data: [u8; BUS_DATA_LEN],
    /// Declared data length; decoding always reads all eight bytes
    pub dlc: u8,
}

impl BusFrame {
    /// Frame from up to eight data bytes, zero padded
    pub fn new(id: u32, data: &[u8]) -> Self {
        let len = data.len().min(BUS_DATA_LEN);
        let mut padded = [0u8; BUS_DATA_LEN];
        padded[..len].copy_from_slice(&data[..len]);
        Self {
            id,
            data: padded,
            dlc: len as u8,
        }
    }

    fn from_slots(id: u32, slots: [u16; 4]) -> Self {
        let mut data = [0u8; BUS_DATA_LEN];
        for (i, slot) in slots.iter().enumerate() {
            wire::write_u16(&mut data, i * 2, *slot);
        }
        Self {
            id,
            data,
            dlc: BUS_DATA_LEN as u8,
        }
    }

    fn u16_at(&self, slot: usize) -> u16 {
        wire::read_u16(&self.data, slot * 2)
    }

    fn i16_at(&self, slot: usize) -> i16 {
        wire::read_i16(&self.data, slot * 2)
    }
}

/// Quantities that only the bus transport carries
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BusChannels {
    pub rpm_limit: u16,
    pub afr1: f32,
    pub afr2: f32,
    pub lambda_trim: f32,
    /// Injection angle, degrees
    pub inj_angle: f32,
    /// Primary injector duty, %
    pub inj_duty_primary: f32,
    /// Secondary injector duty, %
    pub inj_duty_secondary: f32,
    pub inj_angle_secondary: f32,
    /// Boost solenoid duty, %
    pub boost_duty: f32,
    pub map_target_kpa: f32,
    pub event_mask: u16,
    /// Second knock channel, V
    pub knock2_v: f32,
    /// General-purpose temperatures, °C
    pub gpt1: f32,
    pub gpt2: f32,
}

impl BusChannels {
    pub const UNSET: Self = Self {
        rpm_limit: 0,
        afr1: f32::NAN,
        afr2: f32::NAN,
        lambda_trim: f32::NAN,
        inj_angle: f32::NAN,
        inj_duty_primary: f32::NAN,
        inj_duty_secondary: f32::NAN,
        inj_angle_secondary: f32::NAN,
        boost_duty: f32::NAN,
        map_target_kpa: f32::NAN,
        event_mask: 0,
        knock2_v: f32::NAN,
        gpt1: f32::NAN,
        gpt2: f32::NAN,
    };
}

/// A recognized bus frame in engineering units
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BusMessage {
    Engine {
        rpm: f32,
        tps: f32,
        map_kpa: f32,
        intake_temp: f32,
    },
    Limits {
        rpm_limit: u16,
        afr1: f32,
        afr2: f32,
        lambda_trim: f32,
    },
    Ignition {
        ign_angle: f32,
        dwell: f32,
        inj_angle: f32,
        inj_time_ms: f32,
    },
    Duty {
        primary: f32,
        secondary: f32,
        secondary_angle: f32,
        boost: f32,
    },
    Fluids {
        oil_temp: f32,
        /// bar
        oil_pressure: f32,
        coolant: f32,
        battery_v: f32,
    },
    Drivetrain {
        gear: i8,
        map_target_kpa: f32,
        speed: f32,
        event_mask: u16,
    },
    Knock {
        knock1_v: f32,
        knock2_v: f32,
        fuel_pressure_kpa: f32,
        fuel_temp: f32,
    },
    Exhaust {
        egt1: f32,
        egt2: f32,
        gpt1: f32,
        gpt2: f32,
    },
    VehicleSpeed {
        speed: f32,
    },
}

impl BusMessage {
    /// Decode a frame; `None` when the identifier is not in the table
    pub fn decode(frame: &BusFrame) -> Option<Self> {
        let message = match frame.id {
            ID_ENGINE => Self::Engine {
                rpm: frame.u16_at(0) as f32,
                tps: frame.i16_at(1) as f32 * TENTH,
                map_kpa: frame.u16_at(2) as f32 * HUNDREDTH,
                intake_temp: frame.i16_at(3) as f32 * TENTH,
            },
            ID_LIMITS => Self::Limits {
                rpm_limit: frame.u16_at(0),
                afr1: frame.i16_at(1) as f32 * HUNDREDTH,
                afr2: frame.i16_at(2) as f32 * HUNDREDTH,
                lambda_trim: frame.i16_at(3) as f32 * TENTH,
            },
            ID_IGNITION => Self::Ignition {
                ign_angle: frame.i16_at(0) as f32 * TENTH,
                dwell: frame.u16_at(1) as f32 * TENTH,
                inj_angle: frame.i16_at(2) as f32 * TENTH,
                inj_time_ms: frame.u16_at(3) as f32 * MILLI,
            },
            ID_DUTY => Self::Duty {
                primary: frame.u16_at(0) as f32 * TENTH,
                secondary: frame.u16_at(1) as f32 * TENTH,
                secondary_angle: frame.i16_at(2) as f32 * TENTH,
                boost: frame.u16_at(3) as f32 * TENTH,
            },
            ID_FLUIDS => Self::Fluids {
                oil_temp: frame.i16_at(0) as f32 * TENTH,
                oil_pressure: frame.i16_at(1) as f32 * TENTH / KPA_PER_BAR,
                coolant: frame.i16_at(2) as f32 * TENTH,
                battery_v: frame.i16_at(3) as f32 * TENTH,
            },
            ID_DRIVETRAIN => Self::Drivetrain {
                gear: frame.i16_at(0).clamp(i8::MIN as i16, i8::MAX as i16) as i8,
                map_target_kpa: frame.u16_at(1) as f32 * HUNDREDTH,
                speed: frame.u16_at(2) as f32 * TENTH,
                event_mask: frame.u16_at(3),
            },
            ID_KNOCK => Self::Knock {
                knock1_v: frame.i16_at(0) as f32 * TENTH,
                knock2_v: frame.i16_at(1) as f32 * TENTH,
                fuel_pressure_kpa: frame.u16_at(2) as f32 * TENTH,
                fuel_temp: frame.i16_at(3) as f32 * TENTH,
            },
            ID_EXHAUST => Self::Exhaust {
                egt1: frame.i16_at(0) as f32 * TENTH,
                egt2: frame.i16_at(1) as f32 * TENTH,
                gpt1: frame.i16_at(2) as f32 * TENTH,
                gpt2: frame.i16_at(3) as f32 * TENTH,
            },
            ID_VEHICLE_SPEED => Self::VehicleSpeed {
                speed: frame.u16_at(0) as f32 * TENTH,
            },
            _ => return None,
        };
        Some(message)
    }

    pub fn id(&self) -> u32 {
        match self {
            Self::Engine { .. } => ID_ENGINE,
            Self::Limits { .. } => ID_LIMITS,
            Self::Ignition { .. } => ID_IGNITION,
            Self::Duty { .. } => ID_DUTY,
            Self::Fluids { .. } => ID_FLUIDS,
            Self::Drivetrain { .. } => ID_DRIVETRAIN,
            Self::Knock { .. } => ID_KNOCK,
            Self::Exhaust { .. } => ID_EXHAUST,
            Self::VehicleSpeed { .. } => ID_VEHICLE_SPEED,
        }
    }

    /// Encode with the bus scales; out-of-range values saturate
    pub fn encode(&self) -> BusFrame {
        let u = |value: f32, scale: f32| wire::to_u16(value, scale);
        let i = |value: f32, scale: f32| wire::to_i16(value, scale) as u16;

        let slots = match *self {
            Self::Engine {
                rpm,
                tps,
                map_kpa,
                intake_temp,
            } => [u(rpm, 1.0), i(tps, TENTH), u(map_kpa, HUNDREDTH), i(intake_temp, TENTH)],
            Self::Limits {
                rpm_limit,
                afr1,
                afr2,
                lambda_trim,
            } => [
                rpm_limit,
                i(afr1, HUNDREDTH),
                i(afr2, HUNDREDTH),
                i(lambda_trim, TENTH),
            ],
            Self::Ignition {
                ign_angle,
                dwell,
                inj_angle,
                inj_time_ms,
            } => [
                i(ign_angle, TENTH),
                u(dwell, TENTH),
                i(inj_angle, TENTH),
                u(inj_time_ms, MILLI),
            ],
            Self::Duty {
                primary,
                secondary,
                secondary_angle,
                boost,
            } => [
                u(primary, TENTH),
                u(secondary, TENTH),
                i(secondary_angle, TENTH),
                u(boost, TENTH),
            ],
            Self::Fluids {
                oil_temp,
                oil_pressure,
                coolant,
                battery_v,
            } => [
                i(oil_temp, TENTH),
                i(oil_pressure * KPA_PER_BAR, TENTH),
                i(coolant, TENTH),
                i(battery_v, TENTH),
            ],
            Self::Drivetrain {
                gear,
                map_target_kpa,
                speed,
                event_mask,
            } => [
                gear as i16 as u16,
                u(map_target_kpa, HUNDREDTH),
                u(speed, TENTH),
                event_mask,
            ],
            Self::Knock {
                knock1_v,
                knock2_v,
                fuel_pressure_kpa,
                fuel_temp,
            } => [
                i(knock1_v, TENTH),
                i(knock2_v, TENTH),
                u(fuel_pressure_kpa, TENTH),
                i(fuel_temp, TENTH),
            ],
            Self::Exhaust {
                egt1,
                egt2,
                gpt1,
                gpt2,
            } => [i(egt1, TENTH), i(egt2, TENTH), i(gpt1, TENTH), i(gpt2, TENTH)],
            Self::VehicleSpeed { speed } => [u(speed, TENTH), 0, 0, 0],
        };

        BusFrame::from_slots(self.id(), slots)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(id: u32, slots: [u16; 4]) -> BusFrame {
        BusFrame::from_slots(id, slots)
    }

    #[test]
    fn test_engine_frame() {
        let message = BusMessage::decode(&frame(0x300, [2500, 50, 10_000, 250])).unwrap();
        assert_eq!(
            message,
            BusMessage::Engine {
                rpm: 2500.0,
                tps: 5.0,
                map_kpa: 100.0,
                intake_temp: 25.0,
            }
        );
    }

    #[test]
    fn test_negative_slots() {
        let message =
            BusMessage::decode(&frame(0x307, [(-125i16) as u16, 6500, 0, 0])).unwrap();
        match message {
            BusMessage::Exhaust { egt1, egt2, .. } => {
                assert!((egt1 + 12.5).abs() < 1e-4);
                assert_eq!(egt2, 650.0);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_oil_pressure_is_bar() {
        // 350 kPa → raw 3500
        let message = BusMessage::decode(&frame(0x304, [950, 3500, 850, 141])).unwrap();
        match message {
            BusMessage::Fluids { oil_pressure, .. } => assert!((oil_pressure - 3.5).abs() < 1e-5),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_unknown_ids() {
        for id in [0x000, 0x2FF, 0x308, 0x33F, 0x341, 0x7FF] {
            assert_eq!(BusMessage::decode(&frame(id, [1, 2, 3, 4])), None);
        }
    }

    #[test]
    fn test_frame_new_pads() {
        let frame = BusFrame::new(0x340, &[0x10, 0x27]);
        assert_eq!(frame.dlc, 2);
        assert_eq!(frame.data, [0x10, 0x27, 0, 0, 0, 0, 0, 0]);
        assert_eq!(
            BusMessage::decode(&frame),
            Some(BusMessage::VehicleSpeed { speed: 1000.0 })
        );
    }

    #[test]
    fn test_every_message_reencodes() {
        let messages = [
            BusMessage::Engine {
                rpm: 850.0,
                tps: 5.0,
                map_kpa: 35.0,
                intake_temp: 30.0,
            },
            BusMessage::Drivetrain {
                gear: -1,
                map_target_kpa: 100.0,
                speed: 42.0,
                event_mask: 0x0102,
            },
            BusMessage::VehicleSpeed { speed: 88.0 },
        ];
        for message in messages {
            let encoded = message.encode();
            assert_eq!(encoded.id, message.id());
            assert_eq!(BusMessage::decode(&encoded), Some(message));
        }
    }
}
