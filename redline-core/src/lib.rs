//! Board-agnostic core logic for the telemetry dashboard
//!
//! This crate contains everything between a hardware receive path and the
//! consumer of the decoded record, none of which depends on a specific
//! chip:
//!
//! - Ingest ring buffers fed from interrupt context
//! - The shared telemetry store and its single-writer handoff
//! - Link supervision
//! - Dashboard configuration
//! - The ECU emulator that drives the codec end to end

#![no_std]
#![deny(unsafe_code)]

#[cfg(test)]
extern crate std;

pub mod config;
pub mod emulator;
pub mod handoff;
pub mod link;
pub mod ring;
pub mod store;

pub use handoff::{BusIngest, HandoffError, PollStats, SerialIngest, Transport};
pub use ring::{IngestConsumer, IngestProducer, IngestRing};
pub use store::{TelemetryStore, TelemetryWriter};
