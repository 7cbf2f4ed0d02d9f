//! Frame checksum
//!
//! The ECU uses a reflected CRC-16 (polynomial 0x1021 reflected, init
//! 0xFFFF, no final XOR) evaluated with a nibble-folding update instead of
//! a lookup table or a bit loop. The update below must stay bit-exact with
//! the ECU firmware.

/// Initial accumulator value
pub const CHECKSUM_INIT: u16 = 0xFFFF;

/// Fold one byte into the accumulator
#[inline]
pub fn crc16_update(crc: u16, byte: u8) -> u16 {
    let mut d = byte ^ (crc as u8);
    d ^= d << 4;

    let mut t = ((d as u16) << 8) | (crc >> 8);
    t ^= (d >> 4) as u16;
    t ^= (d as u16) << 3;
    t
}

/// Checksum of an arbitrary byte slice
pub fn crc16(data: &[u8]) -> u16 {
    data.iter()
        .fold(CHECKSUM_INIT, |crc, &byte| crc16_update(crc, byte))
}

/// Checksum of a length-prefixed receive buffer
///
/// `buf[0]` holds the length byte `L`. The checksum covers
/// `buf[0..=L-2]`, the length byte included. Returns `None` when `L` is
/// too small to hold a checksum or when `buf` does not contain the covered
/// bytes.
pub fn frame_checksum(buf: &[u8]) -> Option<u16> {
    let length = *buf.first()? as usize;
    if length < 2 || length - 1 > buf.len() {
        return None;
    }
    Some(crc16(&buf[..length - 1]))
}
