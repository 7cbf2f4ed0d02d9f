//! Cross-context handoff
//!
//! Exactly one polling context writes the telemetry store, chosen by the
//! active transport. It owns the consumer half of that transport's ingest
//! ring, the decoder state and the store writer. The receive interrupt owns
//! the producer half and nothing else.
//!
//! ```text
//!  UART ISR ──pump_uart──▶ IngestRing<u8>      ──▶ SerialIngest ─┐
//!                                                                ├─▶ TelemetryStore ──▶ consumer
//!  bus RX   ──push───────▶ IngestRing<BusFrame> ──▶ BusIngest ───┘     (one writer at a time)
//! ```
//!
//! Each `poll` drains at most `budget` items, decodes them in order and
//! publishes once if anything was accepted.

use embassy_sync::blocking_mutex::raw::RawMutex;
use redline_hal::UartRx;
use redline_protocol::decoder::decode_bus_frame;
use redline_protocol::{BusFrame, DecodeEvent, FrameDecoder};

use crate::link::LinkMonitor;
use crate::ring::{IngestConsumer, IngestProducer};
use crate::store::TelemetryWriter;

/// Transport that owns the store writer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Transport {
    #[default]
    Serial,
    Bus,
}

impl Transport {
    /// Non-zero tag stored in the owner cell
    pub(crate) fn tag(self) -> u8 {
        match self {
            Self::Serial => 1,
            Self::Bus => 2,
        }
    }

    pub(crate) fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            1 => Some(Self::Serial),
            2 => Some(Self::Bus),
            _ => None,
        }
    }
}

/// Handoff errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HandoffError {
    /// Another writer still holds the store
    WriterBusy { held_by: Option<Transport> },
}

/// What one poll did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PollStats {
    /// Items taken from the ring
    pub drained: usize,
    /// Frames that updated the record
    pub accepted: u32,
    /// Serial frames that failed verification, or unrecognized bus frames
    pub rejected: u32,
    /// The link timed out during this poll
    pub link_lost: bool,
}

/// Move every byte the UART has ready into the serial ring
///
/// Meant for the receive interrupt. Returns how many bytes were read;
/// bytes the full ring could not take are counted by the ring.
pub fn pump_uart<U: UartRx, const N: usize>(
    uart: &mut U,
    producer: &mut IngestProducer<'_, u8, N>,
) -> Result<usize, U::Error> {
    let mut read = 0;
    while let Some(byte) = uart.try_read_byte()? {
        producer.push(byte);
        read += 1;
    }
    Ok(read)
}

/// Serial-side writer context
pub struct SerialIngest<'a, M: RawMutex, const N: usize> {
    consumer: IngestConsumer<'a, u8, N>,
    decoder: FrameDecoder,
    writer: TelemetryWriter<'a, M>,
    link: LinkMonitor,
}

impl<'a, M: RawMutex, const N: usize> SerialIngest<'a, M, N> {
    pub fn new(
        consumer: IngestConsumer<'a, u8, N>,
        writer: TelemetryWriter<'a, M>,
        link: LinkMonitor,
    ) -> Self {
        Self {
            consumer,
            decoder: FrameDecoder::new(),
            writer,
            link,
        }
    }

    /// Decode at most `budget` queued bytes
    pub fn poll(&mut self, budget: usize) -> PollStats {
        let record = self.writer.record_mut();
        let decoder = &mut self.decoder;
        let mut accepted = 0u32;
        let mut rejected = 0u32;

        let drained = self.consumer.drain(budget, |byte| match decoder.feed(byte, record) {
            DecodeEvent::Pending => {}
            DecodeEvent::Accepted { .. } => accepted += 1,
            DecodeEvent::Rejected(_) => rejected += 1,
        });

        if accepted > 0 {
            self.link.frame_received();
            self.writer.publish();
        } else if rejected > 0 {
            // Only error_count moved
            self.writer.commit();
        }

        PollStats {
            drained,
            accepted,
            rejected,
            link_lost: false,
        }
    }

    /// Poll, then advance the link timer by `elapsed_ms`
    pub fn poll_for(&mut self, budget: usize, elapsed_ms: u32) -> PollStats {
        let mut stats = self.poll(budget);
        stats.link_lost = self.tick(elapsed_ms);
        stats
    }

    /// Advance the link timer; clears `connected` and publishes when the
    /// link has just timed out
    pub fn tick(&mut self, elapsed_ms: u32) -> bool {
        let lost = self.link.update_time(elapsed_ms);
        if lost {
            self.writer.record_mut().connected = false;
            self.writer.publish();
        }
        lost
    }

    pub fn dropped(&self) -> u32 {
        self.consumer.dropped()
    }

    pub fn link(&self) -> &LinkMonitor {
        &self.link
    }

    /// Give back the ring half and the writer (releasing the claim on drop)
    pub fn into_parts(self) -> (IngestConsumer<'a, u8, N>, TelemetryWriter<'a, M>) {
        (self.consumer, self.writer)
    }
}

/// Bus-side writer context
pub struct BusIngest<'a, M: RawMutex, const N: usize> {
    consumer: IngestConsumer<'a, BusFrame, N>,
    writer: TelemetryWriter<'a, M>,
    link: LinkMonitor,
}

impl<'a, M: RawMutex, const N: usize> BusIngest<'a, M, N> {
    pub fn new(
        consumer: IngestConsumer<'a, BusFrame, N>,
        writer: TelemetryWriter<'a, M>,
        link: LinkMonitor,
    ) -> Self {
        Self {
            consumer,
            writer,
            link,
        }
    }

    /// Decode at most `budget` queued frames
    pub fn poll(&mut self, budget: usize) -> PollStats {
        let record = self.writer.record_mut();
        let mut accepted = 0u32;
        let mut rejected = 0u32;

        let drained = self.consumer.drain(budget, |frame| {
            if decode_bus_frame(&frame, record) {
                accepted += 1;
            } else {
                rejected += 1;
            }
        });

        if accepted > 0 {
            self.link.frame_received();
            self.writer.publish();
        }

        PollStats {
            drained,
            accepted,
            rejected,
            link_lost: false,
        }
    }

    pub fn poll_for(&mut self, budget: usize, elapsed_ms: u32) -> PollStats {
        let mut stats = self.poll(budget);
        stats.link_lost = self.tick(elapsed_ms);
        stats
    }

    pub fn tick(&mut self, elapsed_ms: u32) -> bool {
        let lost = self.link.update_time(elapsed_ms);
        if lost {
            self.writer.record_mut().connected = false;
            self.writer.publish();
        }
        lost
    }

    pub fn dropped(&self) -> u32 {
        self.consumer.dropped()
    }

    pub fn link(&self) -> &LinkMonitor {
        &self.link
    }

    pub fn into_parts(self) -> (IngestConsumer<'a, BusFrame, N>, TelemetryWriter<'a, M>) {
        (self.consumer, self.writer)
    }
}
