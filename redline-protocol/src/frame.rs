//! Serial frame synchronisation and verification
//!
//! Frame format:
//! - SYNC (4 bytes): 55 00 AA 00
//! - VERSION (1 byte): 0x54
//! - LENGTH (1 byte): `L`, 4..=48
//! - DATA (L-1 bytes): packet type, fast channels, slow variant
//! - CHECKSUM (2 bytes, LE): CRC over LENGTH and DATA
//!
//! The parser is fed one byte at a time, never needs lookahead and never
//! blocks. A byte that breaks the header is re-examined as a possible
//! start of the next frame.

use crate::checksum::frame_checksum;
use crate::wire::{self, MAX_LENGTH, MIN_LENGTH, PROTOCOL_VERSION, RX_BUFFER_SIZE, SYNC};

/// Errors reported for a fully received frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FrameError {
    /// Trailing checksum does not match the received bytes
    ChecksumMismatch { expected: u16, received: u16 },
}

/// A verified frame: the length byte, the data and the checksum
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    buffer: [u8; RX_BUFFER_SIZE],
}

impl Frame {
    /// Length byte `L`
    pub fn length(&self) -> u8 {
        self.buffer[0]
    }

    /// Length byte followed by the data, checksum excluded
    pub fn bytes(&self) -> &[u8] {
        &self.buffer[..self.length() as usize - 1]
    }

    /// Data bytes only (packet type onwards)
    pub fn data(&self) -> &[u8] {
        &self.bytes()[1..]
    }

    /// Received checksum
    pub fn checksum(&self) -> u16 {
        wire::read_u16(&self.buffer, self.length() as usize - 1)
    }
}

/// Parser position within a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ParseState {
    WaitSync0,
    WaitSync1,
    WaitSync2,
    WaitSync3,
    WaitVersion,
    WaitLength,
    AccumulatePayload,
}

/// State machine for parsing incoming frames
#[derive(Debug, Clone)]
pub struct FrameParser {
    state: ParseState,
    buffer: [u8; RX_BUFFER_SIZE],
    /// Bytes accumulated so far, counting those that did not fit
    received: usize,
}

impl Default for FrameParser {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameParser {
    /// Create a new frame parser
    pub const fn new() -> Self {
        Self {
            state: ParseState::WaitSync0,
            buffer: [0; RX_BUFFER_SIZE],
            received: 0,
        }
    }

    /// Reset the parser state
    pub fn reset(&mut self) {
        self.state = ParseState::WaitSync0;
        self.received = 0;
    }

    pub fn state(&self) -> ParseState {
        self.state
    }

    /// Feed a single byte to the parser
    ///
    /// Returns `Ok(Some(frame))` when a complete frame with a valid checksum
    /// has been received, `Ok(None)` when more bytes are needed (including
    /// after a silent resync), or `Err` when a complete frame failed its
    /// checksum.
    pub fn feed(&mut self, byte: u8) -> Result<Option<Frame>, FrameError> {
        match self.state {
            ParseState::WaitSync0 => {
                if byte == SYNC[0] {
                    self.state = ParseState::WaitSync1;
                }
                Ok(None)
            }
            ParseState::WaitSync1 => self.expect(byte, SYNC[1], ParseState::WaitSync2),
            ParseState::WaitSync2 => self.expect(byte, SYNC[2], ParseState::WaitSync3),
            ParseState::WaitSync3 => self.expect(byte, SYNC[3], ParseState::WaitVersion),
            ParseState::WaitVersion => {
                self.expect(byte, PROTOCOL_VERSION, ParseState::WaitLength)
            }
            ParseState::WaitLength => {
                if !(MIN_LENGTH..=MAX_LENGTH).contains(&byte) {
                    // Consumed, not re-examined as a sync byte
                    self.reset();
                    return Ok(None);
                }
                self.buffer[0] = byte;
                self.received = 1;
                self.state = ParseState::AccumulatePayload;
                Ok(None)
            }
            ParseState::AccumulatePayload => {
                if self.received < RX_BUFFER_SIZE {
                    self.buffer[self.received] = byte;
                }
                self.received += 1;

                if self.received <= self.buffer[0] as usize {
                    return Ok(None);
                }
                self.finish()
            }
        }
    }

    /// Feed multiple bytes to the parser
    ///
    /// Returns the first complete frame found, if any.
    /// Remaining bytes after a complete frame are not consumed.
    pub fn feed_bytes(&mut self, bytes: &[u8]) -> Result<Option<Frame>, FrameError> {
        for &byte in bytes {
            if let Some(frame) = self.feed(byte)? {
                return Ok(Some(frame));
            }
        }
        Ok(None)
    }

    fn expect(
        &mut self,
        byte: u8,
        expected: u8,
        next: ParseState,
    ) -> Result<Option<Frame>, FrameError> {
        if byte == expected {
            self.state = next;
            Ok(None)
        } else {
            self.resync(byte)
        }
    }

    /// Drop the partial header and re-examine `byte` as a new frame start
    fn resync(&mut self, byte: u8) -> Result<Option<Frame>, FrameError> {
        self.reset();
        self.feed(byte)
    }

    fn finish(&mut self) -> Result<Option<Frame>, FrameError> {
        let length = self.buffer[0] as usize;
        self.reset();

        let received = wire::read_u16(&self.buffer, length - 1);
        // MIN_LENGTH guarantees the covered range is non-empty
        let expected = frame_checksum(&self.buffer).unwrap_or(!received);

        if expected != received {
            return Err(FrameError::ChecksumMismatch { expected, received });
        }

        Ok(Some(Frame {
            buffer: self.buffer,
        }))
    }
}
