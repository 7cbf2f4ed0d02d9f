//! CAN-style frame bus abstractions
//!
//! Frames are an 11-bit identifier plus up to eight data bytes. Only
//! transmission is abstracted here; received frames reach the ingest ring
//! from whatever callback the bus controller driver provides.

/// Default bus bitrate in bits per second
pub const DEFAULT_BITRATE: u32 = 500_000;

/// Largest data field a single frame carries
pub const MAX_DATA_LEN: usize = 8;

/// Frame bus transmitter
pub trait BusTx {
    /// Error type for transmit operations
    type Error;

    /// Queue one frame for transmission
    ///
    /// `data` must not be longer than [`MAX_DATA_LEN`].
    fn transmit(&mut self, id: u32, data: &[u8]) -> Result<(), Self::Error>;
}
