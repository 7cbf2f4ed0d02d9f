//! Record-level decoders
//!
//! [`FrameDecoder`] turns a serial byte stream into record updates and link
//! counters. [`decode_bus_frame`] does the same for one bus frame. Neither
//! raises the new-data signal; the caller publishes the record when an
//! update is reported.

use crate::bus::{BusFrame, BusMessage};
use crate::frame::{FrameError, FrameParser, ParseState};
use crate::packet::InfoPacket;
use crate::telemetry::TelemetryRecord;

/// Outcome of feeding one byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DecodeEvent {
    /// Byte consumed, no frame completed
    Pending,
    /// A verified frame updated the record
    Accepted {
        /// Slow index the frame carried, if it was a known variant
        slow_variant: Option<u8>,
    },
    /// A complete frame failed verification and was discarded
    Rejected(FrameError),
}

impl DecodeEvent {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted { .. })
    }
}

/// Serial-path decoder owning the frame assembly state
#[derive(Debug, Clone, Default)]
pub struct FrameDecoder {
    parser: FrameParser,
}

impl FrameDecoder {
    pub const fn new() -> Self {
        Self {
            parser: FrameParser::new(),
        }
    }

    pub fn state(&self) -> ParseState {
        self.parser.state()
    }

    pub fn reset(&mut self) {
        self.parser.reset();
    }

    /// Feed one received byte
    ///
    /// On acceptance the fast channels and the carried slow group are
    /// written, `connected` is set and `packet_count` advances. On
    /// rejection only `error_count` advances. Frames too short to hold an
    /// info packet are accepted without touching any channel.
    pub fn feed(&mut self, byte: u8, record: &mut TelemetryRecord) -> DecodeEvent {
        match self.parser.feed(byte) {
            Ok(None) => DecodeEvent::Pending,
            Ok(Some(frame)) => {
                let slow_variant = match InfoPacket::decode(&frame) {
                    Ok(packet) => {
                        record.apply_packet(&packet);
                        packet.slow.map(|slow| slow.id())
                    }
                    Err(_) => None,
                };
                record.connected = true;
                record.packet_count = record.packet_count.wrapping_add(1);
                DecodeEvent::Accepted { slow_variant }
            }
            Err(error) => {
                record.error_count = record.error_count.wrapping_add(1);
                DecodeEvent::Rejected(error)
            }
        }
    }
}

/// Apply one bus frame to the record
///
/// Returns `false` and leaves the record untouched when the identifier is
/// not in the table.
pub fn decode_bus_frame(frame: &BusFrame, record: &mut TelemetryRecord) -> bool {
    let Some(message) = BusMessage::decode(frame) else {
        return false;
    };

    record.apply_bus(&message);
    record.connected = true;
    record.bus_frame_count = record.bus_frame_count.wrapping_add(1);
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::format;

    const SHORT_FRAME: [u8; 10] = [0x55, 0x00, 0xAA, 0x00, 0x54, 0x04, 0x01, 0x02, 0x98, 0x60];

    fn feed_all(decoder: &mut FrameDecoder, bytes: &[u8], record: &mut TelemetryRecord) -> usize {
        bytes
            .iter()
            .filter(|&&byte| decoder.feed(byte, record).is_accepted())
            .count()
    }

    #[test]
    fn test_accepted_frame_updates_record() {
        let mut source = TelemetryRecord::new();
        source.engine.rpm = 1000.0;
        source.engine.runlevel = 2;
        source.temperatures.coolant = 85.0;
        let encoded = source.info_packet(8).encode_to_vec().unwrap();

        let mut decoder = FrameDecoder::new();
        let mut record = TelemetryRecord::new();
        let mut last = DecodeEvent::Pending;
        for &byte in encoded.iter() {
            last = decoder.feed(byte, &mut record);
        }

        assert_eq!(last, DecodeEvent::Accepted { slow_variant: Some(8) });
        assert!(record.connected);
        assert_eq!(record.packet_count, 1);
        assert_eq!(record.error_count, 0);
        assert_eq!(record.engine.rpm, 1000.0);
        assert_eq!(record.temperatures.coolant, 85.0);
        assert_eq!(record.slow_variant, Some(8));
    }

    #[test]
    fn test_flipped_checksum_counts_one_error() {
        let mut encoded = SHORT_FRAME;
        encoded[8] ^= 0xFF;
        encoded[9] ^= 0xFF;

        let mut decoder = FrameDecoder::new();
        let mut record = TelemetryRecord::new();
        let before = format!("{:?}", record);

        let rejected = encoded
            .iter()
            .filter(|&&byte| matches!(decoder.feed(byte, &mut record), DecodeEvent::Rejected(_)))
            .count();

        assert_eq!(rejected, 1);
        assert_eq!(record.error_count, 1);
        assert!(!record.connected);
        record.error_count = 0;
        assert_eq!(format!("{:?}", record), before);
    }

    #[test]
    fn test_short_frame_accepted_without_fields() {
        let mut decoder = FrameDecoder::new();
        let mut record = TelemetryRecord::new();

        assert_eq!(feed_all(&mut decoder, &SHORT_FRAME, &mut record), 1);
        assert!(record.connected);
        assert_eq!(record.packet_count, 1);
        assert!(record.engine.rpm.is_nan());
        assert_eq!(record.slow_variant, None);
    }

    #[test]
    fn test_unknown_bus_id_is_noop() {
        let mut record = TelemetryRecord::new();
        let before = format!("{:?}", record);

        let frame = BusFrame::new(0x123, &[1, 2, 3, 4, 5, 6, 7, 8]);
        assert!(!decode_bus_frame(&frame, &mut record));
        assert_eq!(format!("{:?}", record), before);
    }

    #[test]
    fn test_bus_engine_frame() {
        let mut data = [0u8; 8];
        data[0..2].copy_from_slice(&2500u16.to_le_bytes());
        data[2..4].copy_from_slice(&50i16.to_le_bytes());
        data[4..6].copy_from_slice(&10_000u16.to_le_bytes());
        data[6..8].copy_from_slice(&250i16.to_le_bytes());

        let mut record = TelemetryRecord::new();
        assert!(decode_bus_frame(&BusFrame::new(0x300, &data), &mut record));

        assert!(record.connected);
        assert_eq!(record.bus_frame_count, 1);
        assert_eq!(record.packet_count, 0);
        assert_eq!(record.engine.rpm, 2500.0);
        assert_eq!(record.engine.tps, 5.0);
        assert_eq!(record.engine.map_kpa, 100.0);
        assert_eq!(record.temperatures.intake, 25.0);
    }
}
