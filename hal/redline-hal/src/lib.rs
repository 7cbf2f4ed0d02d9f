//! Redline Hardware Abstraction Layer
//!
//! Transport traits shared by the telemetry ingest path and the ECU
//! emulator. Chip-specific code implements them; the codec and the
//! emulator only ever see these traits.
//!
//! ```text
//! ┌──────────────────────────────────────────┐
//! │  redline-core (ingest pumps, emulator)   │
//! └──────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌──────────────────────────────────────────┐
//! │  redline-hal (this crate - traits)       │
//! └──────────────────────────────────────────┘
//!                     │
//!         ┌───────────┴───────────┐
//!         ▼                       ▼
//!  ┌─────────────┐         ┌─────────────┐
//!  │ UART (ECU   │         │ CAN-style   │
//!  │ serial link)│         │ frame bus   │
//!  └─────────────┘         └─────────────┘
//! ```
//!
//! # Traits
//!
//! - [`uart::UartTx`], [`uart::UartRx`] - Serial communication
//! - [`can::BusTx`] - Identifier-keyed frame transmission

#![no_std]
#![deny(unsafe_code)]

pub mod can;
pub mod uart;

// Re-export key traits at crate root for convenience
pub use can::BusTx;
pub use uart::{UartRx, UartTx};
