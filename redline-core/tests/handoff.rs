//! Producer, writer and reader on separate threads.
//!
//! The receive side runs on its own thread the way the interrupt would,
//! the ingest poll on another, and the presentation reader on the test
//! thread. `critical-section` with its `std` implementation backs the
//! store's mutex.

use std::thread;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use redline_core::emulator::{Command, Emulator};
use redline_core::link::LinkMonitor;
use redline_core::{BusIngest, IngestRing, SerialIngest, TelemetryStore, Transport};
use redline_protocol::BusFrame;

const FRAMES: u32 = 200;

/// Serial stream where frame `i` carries MAP = 2·i kPa
fn numbered_stream() -> Vec<u8> {
    let mut emulator = Emulator::new();
    let mut bytes = Vec::new();
    for i in 0..FRAMES {
        emulator.handle(Command::Map(2.0 * i as f32));
        bytes.extend_from_slice(&emulator.next_serial_frame().unwrap());
    }
    bytes
}

#[test]
fn test_serial_snapshots_are_never_torn() {
    let stream = numbered_stream();
    let store: TelemetryStore<CriticalSectionRawMutex> = TelemetryStore::new();
    let mut ring: IngestRing<u8, 256> = IngestRing::new();
    let (mut producer, consumer) = ring.split();

    let writer = store.claim_writer(Transport::Serial).unwrap();
    let mut ingest = SerialIngest::new(consumer, writer, LinkMonitor::default());

    thread::scope(|s| {
        s.spawn(|| {
            for &byte in &stream {
                while producer.is_full() {
                    thread::yield_now();
                }
                assert!(producer.push(byte));
            }
        });

        s.spawn(|| {
            let mut accepted = 0;
            while accepted < FRAMES {
                let stats = ingest.poll(16);
                assert_eq!(stats.rejected, 0);
                accepted += stats.accepted;
                thread::yield_now();
            }
        });

        let mut last_generation = 0;
        loop {
            if let Some(record) = store.poll_snapshot() {
                let generation = store.generation();
                assert!(generation >= last_generation);
                last_generation = generation;

                // MAP and the packet counter come from the same frame
                assert!(record.packet_count > 0);
                assert_eq!(record.engine.map_kpa, 2.0 * (record.packet_count - 1) as f32);
                if record.packet_count == FRAMES {
                    break;
                }
            }
            thread::yield_now();
        }
    });

    let record = store.snapshot();
    assert_eq!(record.packet_count, FRAMES);
    assert_eq!(record.error_count, 0);
    assert_eq!(ingest.dropped(), 0);
}

#[test]
fn test_bus_writer_excludes_serial() {
    let store: TelemetryStore<CriticalSectionRawMutex> = TelemetryStore::new();
    let mut ring: IngestRing<BusFrame, 16> = IngestRing::new();
    let (mut producer, consumer) = ring.split();

    let writer = store.claim_writer(Transport::Bus).unwrap();
    assert!(store.claim_writer(Transport::Serial).is_err());
    let mut ingest = BusIngest::new(consumer, writer, LinkMonitor::default());

    let emulator = Emulator::new();
    thread::scope(|s| {
        s.spawn(|| {
            for frame in emulator.bus_frames() {
                assert!(producer.push(frame));
            }
        });
    });

    let stats = ingest.poll(64);
    assert_eq!(stats.accepted, 9);
    let record = store.poll_snapshot().unwrap();
    assert_eq!(record.bus_frame_count, 9);
    assert_eq!(record.engine.rpm, 850.0);

    drop(ingest);
    assert_eq!(store.writer(), None);
}
