//! ECU emulator
//!
//! Produces the traffic of a running engine on both transports, from a
//! simulated engine model that an operator can override channel by
//! channel. Used for bench testing the dashboard without a car, and by
//! the tests to drive the decoders end to end.
//!
//! ```text
//!  operator text ──► Command ──► EngineModel ◄── step(dt)
//!                                     │
//!                        ┌────────────┴────────────┐
//!                        ▼                         ▼
//!                info packet (UartTx)      9 bus frames (BusTx)
//! ```

pub mod command;
pub mod encoder;
pub mod engine;
pub mod wave;

pub use command::{Command, CommandError, LineBuffer};
pub use encoder::{Emulator, EmulatorError, EmulatorStatus, TX_INTERVAL_MS};
pub use engine::{EngineModel, Pinned};
