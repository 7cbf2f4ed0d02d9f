//! ECU Telemetry Protocol
//!
//! This crate defines the wire formats spoken by the engine management unit
//! towards the dashboard, and the telemetry record both of them decode into.
//!
//! # Serial link
//!
//! 19200 baud, 8N1. Every message is one info packet:
//! ```text
//! ┌─────────────┬─────────┬────────┬──────────────────────┬──────────┐
//! │ SYNC        │ VERSION │ LENGTH │ DATA                 │ CHECKSUM │
//! │ 55 00 AA 00 │ 54      │ L      │ L-1 bytes            │ 2B (LE)  │
//! └─────────────┴─────────┴────────┴──────────────────────┴──────────┘
//! ```
//!
//! The checksum covers the length byte and the data. The data holds the
//! fast channels (present in every packet) followed by one of ten rotating
//! slow variants.
//!
//! # Frame bus
//!
//! Fixed 8-byte frames keyed by identifier, see [`bus`]. Both transports
//! feed the same [`TelemetryRecord`].

#![no_std]
#![deny(unsafe_code)]

#[cfg(test)]
extern crate std;

pub mod bus;
pub mod checksum;
pub mod decoder;
pub mod fast;
pub mod flags;
pub mod frame;
pub mod packet;
pub mod slow;
pub mod telemetry;
pub mod wire;

pub use bus::{BusChannels, BusFrame, BusMessage};
pub use checksum::{crc16, frame_checksum};
pub use decoder::{DecodeEvent, FrameDecoder};
pub use fast::{Diagnostics, FastChannels};
pub use frame::{Frame, FrameError, FrameParser, ParseState};
pub use packet::{InfoPacket, PacketError, WireFrame};
pub use slow::SlowPacket;
pub use telemetry::TelemetryRecord;
