//! Shared state between Embassy tasks
//!
//! The telemetry store lives in a `static` so the ingest task (the single
//! writer) and the presentation tasks (readers) can reach it without
//! passing references around.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use portable_atomic::AtomicU32;
use redline_core::TelemetryStore;

/// Serial ring size; holds 255 bytes, about six info packets
pub const SERIAL_RING_SIZE: usize = 256;

/// The decoded telemetry record
pub static TELEMETRY: TelemetryStore<CriticalSectionRawMutex> = TelemetryStore::new();

/// Bytes the serial ring refused since boot (mirrored by the ingest task)
pub static SERIAL_DROPPED: AtomicU32 = AtomicU32::new(0);
