//! Info packet encoding and decoding
//!
//! An info packet is the data of one verified serial frame: packet type,
//! fast channels, slow index and one slow variant.

use heapless::Vec;

use crate::checksum::crc16;
use crate::fast::FastChannels;
use crate::frame::Frame;
use crate::slow::{SlowBytes, SlowPacket};
use crate::wire::{
    offset, CHECKSUM_SIZE, HEADER_SIZE, INFO_PACKET_LENGTH, INFO_PACKET_SIZE, MAX_FRAME_SIZE,
    PACKET_TYPE_INFO, PROTOCOL_VERSION, SLOW_PACKET_SIZE, SYNC,
};

/// Size of an encoded info packet on the wire
pub const INFO_FRAME_SIZE: usize = HEADER_SIZE + INFO_PACKET_SIZE + CHECKSUM_SIZE;

/// Encoded serial frame
pub type WireFrame = Vec<u8, MAX_FRAME_SIZE>;

/// Errors that can occur during packet decoding or encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PacketError {
    /// Frame is verified but shorter than an info packet
    TooShort { length: u8 },
    /// Buffer too small for encoding
    BufferTooSmall,
}

/// Contents of one info packet
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct InfoPacket {
    pub packet_type: u8,
    pub fast: FastChannels,
    /// Slow index byte as sent
    pub slow_id: u8,
    /// Slow variant; `None` when the index is outside the rotation
    pub slow: Option<SlowPacket>,
}

impl InfoPacket {
    /// Regular info packet carrying `slow`
    pub fn new(fast: FastChannels, slow: SlowPacket) -> Self {
        Self {
            packet_type: PACKET_TYPE_INFO,
            fast,
            slow_id: slow.id(),
            slow: Some(slow),
        }
    }

    /// Decode the data of a verified frame
    ///
    /// Bytes beyond the info packet (longer length bytes) are ignored.
    pub fn decode(frame: &Frame) -> Result<Self, PacketError> {
        let buf: &[u8; INFO_PACKET_SIZE] = frame
            .bytes()
            .get(..INFO_PACKET_SIZE)
            .and_then(|bytes| bytes.try_into().ok())
            .ok_or(PacketError::TooShort {
                length: frame.length(),
            })?;

        Ok(Self::decode_buffer(buf))
    }

    /// Decode an info packet buffer (index 0 = length byte)
    pub fn decode_buffer(buf: &[u8; INFO_PACKET_SIZE]) -> Self {
        let slow_id = buf[offset::SLOW_ID];
        let mut raw: SlowBytes = [0; SLOW_PACKET_SIZE];
        raw.copy_from_slice(&buf[offset::SLOW..]);

        Self {
            packet_type: buf[offset::PACKET_TYPE],
            fast: FastChannels::decode(buf),
            slow_id,
            slow: SlowPacket::decode(slow_id, &raw),
        }
    }

    /// Length byte, data and nothing else
    pub fn encode_buffer(&self) -> [u8; INFO_PACKET_SIZE] {
        let mut buf = [0u8; INFO_PACKET_SIZE];
        buf[0] = INFO_PACKET_LENGTH;
        buf[offset::PACKET_TYPE] = self.packet_type;
        self.fast.encode(&mut buf);
        buf[offset::SLOW_ID] = self.slow_id;
        if let Some(slow) = &self.slow {
            buf[offset::SLOW..].copy_from_slice(&slow.encode());
        }
        buf
    }

    /// Encode the complete frame into a byte buffer
    ///
    /// Returns the number of bytes written
    pub fn encode(&self, buffer: &mut [u8]) -> Result<usize, PacketError> {
        if buffer.len() < INFO_FRAME_SIZE {
            return Err(PacketError::BufferTooSmall);
        }

        let body = self.encode_buffer();
        let checksum = crc16(&body);

        buffer[..SYNC.len()].copy_from_slice(&SYNC);
        buffer[SYNC.len()] = PROTOCOL_VERSION;
        buffer[HEADER_SIZE..HEADER_SIZE + INFO_PACKET_SIZE].copy_from_slice(&body);
        buffer[HEADER_SIZE + INFO_PACKET_SIZE..INFO_FRAME_SIZE]
            .copy_from_slice(&checksum.to_le_bytes());

        Ok(INFO_FRAME_SIZE)
    }

    /// Encode the complete frame into a heapless Vec
    pub fn encode_to_vec(&self) -> Result<WireFrame, PacketError> {
        let mut buffer = [0u8; MAX_FRAME_SIZE];
        let len = self.encode(&mut buffer)?;
        let mut vec = Vec::new();
        vec.extend_from_slice(&buffer[..len])
            .map_err(|_| PacketError::BufferTooSmall)?;
        Ok(vec)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::FrameParser;

    /// Info packet at idle with slow variant 8 (temperatures)
    const IDLE_FRAME: [u8; INFO_FRAME_SIZE] = [
        0x55, 0x00, 0xAA, 0x00, 0x54, 0x25, 0x01, 0x02, 0x28, 0x00, 0x18, 0xF5, 0x2D, 0x71, 0x02,
        0x33, 0x0D, 0x0D, 0x12, 0x80, 0x03, 0xFE, 0x3C, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x08,
        0x55, 0x1E, 0x5F, 0x23, 0x00, 0x8A, 0x02, 0x80, 0x02, 0x23, 0x00, 0x2F, 0xC5,
    ];

    fn parse(bytes: &[u8]) -> Frame {
        FrameParser::new().feed_bytes(bytes).unwrap().unwrap()
    }

    #[test]
    fn test_decode_idle_frame() {
        let packet = InfoPacket::decode(&parse(&IDLE_FRAME)).unwrap();

        assert_eq!(packet.packet_type, PACKET_TYPE_INFO);
        assert_eq!(packet.fast.runlevel, 2);
        assert_eq!(packet.fast.ign_angle, 10.0);
        assert_eq!(packet.fast.fuel_flow, 1.5);
        assert!((packet.fast.rpm - 849.979).abs() < 0.01);
        assert!((packet.fast.inj_time_ms - 2.5).abs() < 1e-4);
        assert_eq!(packet.fast.map_kpa, 36.0);
        assert_eq!(packet.fast.lambda, 1.0);
        assert_eq!(packet.fast.cyl_no, 3);
        assert_eq!(packet.fast.transient_corr, -2);
        assert_eq!(packet.fast.speed, 60.0);

        assert_eq!(packet.slow_id, 8);
        match packet.slow {
            Some(SlowPacket::Temperatures(temps)) => {
                assert_eq!(temps.coolant, 85.0);
                assert_eq!(temps.intake, 30.0);
                assert_eq!(temps.egt1, 650.0);
            }
            other => panic!("unexpected slow variant {:?}", other),
        }
    }

    #[test]
    fn test_reencode_is_byte_exact() {
        let packet = InfoPacket::decode(&parse(&IDLE_FRAME)).unwrap();
        let encoded = packet.encode_to_vec().unwrap();
        assert_eq!(&encoded[..], &IDLE_FRAME[..]);
    }

    #[test]
    fn test_short_frame_is_too_short() {
        let short = [0x55, 0x00, 0xAA, 0x00, 0x54, 0x04, 0x01, 0x02, 0x98, 0x60];
        assert_eq!(
            InfoPacket::decode(&parse(&short)),
            Err(PacketError::TooShort { length: 4 })
        );
    }

    #[test]
    fn test_slow_id_outside_rotation() {
        let mut packet = InfoPacket::decode(&parse(&IDLE_FRAME)).unwrap();
        packet.slow_id = 12;
        packet.slow = None;

        let encoded = packet.encode_to_vec().unwrap();
        let decoded = InfoPacket::decode(&parse(&encoded)).unwrap();
        assert_eq!(decoded.slow_id, 12);
        assert_eq!(decoded.slow, None);
    }

    #[test]
    fn test_encode_buffer_too_small() {
        let packet = InfoPacket::decode(&parse(&IDLE_FRAME)).unwrap();
        let mut buffer = [0u8; INFO_FRAME_SIZE - 1];
        assert_eq!(packet.encode(&mut buffer), Err(PacketError::BufferTooSmall));
    }
}
