//! Operator commands
//!
//! One command per line, `name=value` or a bare word:
//!
//! ```text
//! rpm=3000      tps=40        map=120       clt=95
//! iat=25        fuelt=30      speed=80      lambda=0.92
//! angle=18      runlevel=3    gear=2        egt1=720
//! egt2=700      fault=6C      oilp=1.2      oilt=120
//! vvt1=-4       sim           status        help
//! ```

use heapless::String;
use redline_protocol::flags::FlagMajor;

use super::engine::{EngineModel, Pinned};

/// Longest accepted command line
pub const MAX_LINE_LEN: usize = 63;

/// Command parse error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CommandError {
    /// Line was blank
    Empty,
    /// No command with this name
    UnknownCommand,
    /// Value missing, malformed or outside the field's range
    InvalidValue,
    /// Line longer than [`MAX_LINE_LEN`]
    LineTooLong,
}

/// Parsed operator command
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Command {
    Rpm(f32),
    /// Throttle and drive-by-wire position (%)
    Throttle(f32),
    Map(f32),
    Coolant(i8),
    Intake(i8),
    FuelTemp(i8),
    /// Vehicle speed, both sensors (km/h)
    Speed(u8),
    Lambda(f32),
    IgnitionAngle(f32),
    Runlevel(u8),
    Gear(i8),
    Egt1(u16),
    Egt2(u16),
    /// Replace the major fault register
    Fault(FlagMajor),
    OilPressure(f32),
    OilTemp(u8),
    Vvt1Target(i8),
    /// Release every pinned channel
    Simulate,
    Status,
    Help,
}

impl Command {
    pub fn parse(line: &str) -> Result<Self, CommandError> {
        let line = line.trim();
        if line.is_empty() {
            return Err(CommandError::Empty);
        }

        let Some((name, value)) = line.split_once('=') else {
            return match line {
                "sim" => Ok(Command::Simulate),
                "status" => Ok(Command::Status),
                "help" => Ok(Command::Help),
                _ => Err(CommandError::UnknownCommand),
            };
        };
        let value = value.trim();

        let command = match name.trim() {
            "rpm" => Command::Rpm(parse_float(value)?),
            "tps" => Command::Throttle(parse_float(value)?),
            "map" => Command::Map(parse_float(value)?),
            "clt" => Command::Coolant(parse_int(value)?),
            "iat" => Command::Intake(parse_int(value)?),
            "fuelt" => Command::FuelTemp(parse_int(value)?),
            "speed" => Command::Speed(parse_int(value)?),
            "lambda" => Command::Lambda(parse_float(value)?),
            "angle" => Command::IgnitionAngle(parse_float(value)?),
            "runlevel" => Command::Runlevel(parse_int(value)?),
            "gear" => Command::Gear(parse_int(value)?),
            "egt1" => Command::Egt1(parse_int(value)?),
            "egt2" => Command::Egt2(parse_int(value)?),
            "fault" => Command::Fault(parse_fault(value)?),
            "oilp" => Command::OilPressure(parse_float(value)?),
            "oilt" => Command::OilTemp(parse_int(value)?),
            "vvt1" => Command::Vvt1Target(parse_int(value)?),
            _ => return Err(CommandError::UnknownCommand),
        };
        Ok(command)
    }

    /// Apply the command's effect to the engine model
    ///
    /// Overrides pin what they set. `status` and `help` leave the model
    /// alone.
    pub fn apply(&self, model: &mut EngineModel) {
        match self {
            Command::Simulate => return model.release_all(),
            Command::Status | Command::Help => return,
            _ => {}
        }

        let state = model.state_mut();
        match *self {
            Command::Rpm(rpm) => state.engine.rpm = rpm,
            Command::Throttle(tps) => {
                state.engine.tps = tps;
                state.engine.dbw_pos = tps;
            }
            Command::Map(kpa) => state.engine.map_kpa = kpa,
            Command::Coolant(t) => state.temperatures.coolant = t as f32,
            Command::Intake(t) => state.temperatures.intake = t as f32,
            Command::FuelTemp(t) => state.temperatures.fuel = t as f32,
            Command::Speed(kmh) => {
                state.engine.speed = kmh as f32;
                state.injection.speed2 = kmh;
            }
            Command::Lambda(lambda) => {
                state.engine.lambda = lambda;
                state.corrections.lambda2 = lambda;
            }
            Command::IgnitionAngle(deg) => state.engine.ign_angle = deg,
            Command::Runlevel(level) => state.engine.runlevel = level,
            Command::Gear(gear) => state.corrections.gear = gear,
            Command::Egt1(t) => state.temperatures.egt1 = t as f32,
            Command::Egt2(t) => state.temperatures.egt2 = t as f32,
            Command::Fault(flags) => state.flags.major = flags,
            Command::OilPressure(bar) => state.temperatures.oil_pressure = bar,
            Command::OilTemp(t) => state.temperatures.oil = t as f32,
            Command::Vvt1Target(deg) => state.valve_timing.vvt1_target = deg,
            Command::Simulate | Command::Status | Command::Help => {}
        }
        model.pin(self.pinned());
    }

    /// Simulated channels this command takes over
    fn pinned(&self) -> Pinned {
        match self {
            Command::Rpm(_) => Pinned::RPM,
            Command::Throttle(_) => Pinned::THROTTLE,
            Command::Map(_) => Pinned::MAP,
            Command::Coolant(_) => Pinned::COOLANT,
            Command::Lambda(_) => Pinned::LAMBDA,
            Command::IgnitionAngle(_) => Pinned::IGNITION,
            Command::OilPressure(_) => Pinned::OIL_PRESSURE,
            Command::OilTemp(_) => Pinned::OIL_TEMP,
            // Not simulated, the value stays until the next command
            _ => Pinned::empty(),
        }
    }
}

fn parse_float(value: &str) -> Result<f32, CommandError> {
    let parsed: f32 = value.parse().map_err(|_| CommandError::InvalidValue)?;
    if parsed.is_finite() {
        Ok(parsed)
    } else {
        Err(CommandError::InvalidValue)
    }
}

/// Integer that must fit the target field
fn parse_int<T: TryFrom<i32>>(value: &str) -> Result<T, CommandError> {
    let parsed: i32 = value.parse().map_err(|_| CommandError::InvalidValue)?;
    T::try_from(parsed).map_err(|_| CommandError::InvalidValue)
}

/// Hex register value, with or without `0x`
fn parse_fault(value: &str) -> Result<FlagMajor, CommandError> {
    let digits = value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
        .unwrap_or(value);
    let bits = u8::from_str_radix(digits, 16).map_err(|_| CommandError::InvalidValue)?;
    Ok(FlagMajor::from_bits_retain(bits))
}

/// Assembles command lines from a byte stream
///
/// Either `\r` or `\n` ends a line; empty lines are skipped. A line that
/// outgrows the buffer is discarded up to its terminator.
#[derive(Debug, Default)]
pub struct LineBuffer {
    line: String<MAX_LINE_LEN>,
    overflowed: bool,
}

impl LineBuffer {
    pub const fn new() -> Self {
        Self {
            line: String::new(),
            overflowed: false,
        }
    }

    /// Feed one received byte; yields a result when it completes a line
    pub fn push(&mut self, byte: u8) -> Option<Result<Command, CommandError>> {
        if byte == b'\r' || byte == b'\n' {
            let result = if self.overflowed {
                Some(Err(CommandError::LineTooLong))
            } else if self.line.is_empty() {
                None
            } else {
                Some(Command::parse(&self.line))
            };
            self.line.clear();
            self.overflowed = false;
            return result;
        }

        // Operator input is ASCII; anything else cannot match a command
        let c = if byte.is_ascii() { byte as char } else { '?' };
        if self.line.push(c).is_err() {
            self.overflowed = true;
        }
        None
    }
}
