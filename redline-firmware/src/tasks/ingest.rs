//! Serial ingest task
//!
//! The single writer of the telemetry store. Drains a bounded number of
//! bytes per tick, decodes them and publishes whole records.

use defmt::*;
use embassy_time::{Duration, Instant, Ticker};
use portable_atomic::Ordering;
use redline_core::config::TimingConfig;
use redline_core::link::LinkMonitor;
use redline_core::{IngestConsumer, SerialIngest, Transport};

use crate::channels::{SERIAL_DROPPED, SERIAL_RING_SIZE, TELEMETRY};

/// Poll period (ms); at 19200 baud about ten bytes arrive in between
const INGEST_PERIOD_MS: u64 = 5;

#[embassy_executor::task]
pub async fn ingest_task(consumer: IngestConsumer<'static, u8, SERIAL_RING_SIZE>, timing: TimingConfig) {
    let writer = match TELEMETRY.claim_writer(Transport::Serial) {
        Ok(writer) => writer,
        Err(e) => {
            error!("Telemetry store unavailable: {}", e);
            return;
        }
    };
    let mut ingest = SerialIngest::new(consumer, writer, LinkMonitor::new(timing.link_timeout_ms));

    info!("Ingest task started");

    let mut ticker = Ticker::every(Duration::from_millis(INGEST_PERIOD_MS));
    let mut last = Instant::now();

    loop {
        ticker.next().await;

        let now = Instant::now();
        let elapsed_ms = (now - last).as_millis() as u32;
        last = now;

        let stats = ingest.poll_for(timing.drain_budget, elapsed_ms);
        if stats.rejected > 0 {
            warn!("{} serial frames failed verification", stats.rejected);
        }
        if stats.link_lost {
            warn!("ECU link lost after {} ms of silence", ingest.link().silent_ms());
        }

        SERIAL_DROPPED.store(ingest.dropped(), Ordering::Relaxed);
    }
}
