//! Frame encoder
//!
//! Turns the engine model into the byte stream and the bus frames a real
//! ECU would send, on the same cadence.

use redline_hal::{BusTx, UartTx};
use redline_protocol::telemetry::BUS_MESSAGE_COUNT;
use redline_protocol::wire::SLOW_VARIANT_COUNT;
use redline_protocol::{BusFrame, PacketError, WireFrame};

use super::command::Command;
use super::engine::{EngineModel, Pinned};

/// Period between transmissions (ms)
pub const TX_INTERVAL_MS: u32 = 20;

/// Transmit error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EmulatorError<E> {
    Packet(PacketError),
    Transport(E),
}

impl<E> From<PacketError> for EmulatorError<E> {
    fn from(err: PacketError) -> Self {
        EmulatorError::Packet(err)
    }
}

/// Summary for the `status` command
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct EmulatorStatus {
    pub rpm: f32,
    pub tps: f32,
    pub map_kpa: f32,
    pub coolant: f32,
    pub lambda: f32,
    pub ign_angle: f32,
    pub oil_pressure: f32,
    pub oil_temp: f32,
    pub intake: f32,
    pub fuel_temp: f32,
    pub egt1: f32,
    pub egt2: f32,
    /// Slow variant the next serial frame carries
    pub slow_index: u8,
    pub serial_frames: u32,
    pub bus_cycles: u32,
    /// Number of pinned channels
    pub pinned: u32,
}

/// ECU emulator
#[derive(Debug, Clone, Default)]
pub struct Emulator {
    model: EngineModel,
    slow_index: u8,
    serial_frames: u32,
    bus_cycles: u32,
}

impl Emulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn model(&self) -> &EngineModel {
        &self.model
    }

    pub fn model_mut(&mut self) -> &mut EngineModel {
        &mut self.model
    }

    /// Slow variant the next serial frame carries
    pub fn slow_index(&self) -> u8 {
        self.slow_index
    }

    /// Advance the simulation by `elapsed_ms`
    pub fn tick(&mut self, elapsed_ms: u32) {
        self.model.step(elapsed_ms as f32 / 1000.0);
    }

    /// Encode the next info packet and advance the slow rotation
    pub fn next_serial_frame(&mut self) -> Result<WireFrame, PacketError> {
        let frame = self
            .model
            .state()
            .info_packet(self.slow_index)
            .encode_to_vec()?;
        self.slow_index = (self.slow_index + 1) % SLOW_VARIANT_COUNT;
        self.serial_frames = self.serial_frames.wrapping_add(1);
        Ok(frame)
    }

    /// One bus cycle, in identifier order
    pub fn bus_frames(&self) -> [BusFrame; BUS_MESSAGE_COUNT] {
        self.model.state().bus_messages().map(|message| message.encode())
    }

    /// Write the next serial frame; returns the slow variant it carried
    pub fn send_serial<U: UartTx>(&mut self, uart: &mut U) -> Result<u8, EmulatorError<U::Error>> {
        let slow_id = self.slow_index;
        let frame = self.next_serial_frame()?;
        uart.write_blocking(&frame).map_err(EmulatorError::Transport)?;
        Ok(slow_id)
    }

    /// Queue one bus cycle
    ///
    /// Stops at the first frame the bus refuses.
    pub fn send_bus<B: BusTx>(&mut self, bus: &mut B) -> Result<(), B::Error> {
        for frame in self.bus_frames() {
            bus.transmit(frame.id, &frame.data[..frame.dlc as usize])?;
        }
        self.bus_cycles = self.bus_cycles.wrapping_add(1);
        Ok(())
    }

    /// Apply an operator command; `status` returns a summary
    pub fn handle(&mut self, command: Command) -> Option<EmulatorStatus> {
        command.apply(&mut self.model);
        (command == Command::Status).then(|| self.status())
    }

    pub fn status(&self) -> EmulatorStatus {
        let state = self.model.state();
        EmulatorStatus {
            rpm: state.engine.rpm,
            tps: state.engine.tps,
            map_kpa: state.engine.map_kpa,
            coolant: state.temperatures.coolant,
            lambda: state.engine.lambda,
            ign_angle: state.engine.ign_angle,
            oil_pressure: state.temperatures.oil_pressure,
            oil_temp: state.temperatures.oil,
            intake: state.temperatures.intake,
            fuel_temp: state.temperatures.fuel,
            egt1: state.temperatures.egt1,
            egt2: state.temperatures.egt2,
            slow_index: self.slow_index,
            serial_frames: self.serial_frames,
            bus_cycles: self.bus_cycles,
            pinned: self.model.pinned().bits().count_ones(),
        }
    }

    pub fn is_pinned(&self, channels: Pinned) -> bool {
        self.model.pinned().contains(channels)
    }
}
