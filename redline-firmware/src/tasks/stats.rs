//! Link statistics log

use defmt::*;
use embassy_time::{Duration, Ticker};
use portable_atomic::Ordering;
use redline_core::link::frame_rate;

use crate::channels::{SERIAL_DROPPED, TELEMETRY};

#[embassy_executor::task]
pub async fn stats_task(period_ms: u32) {
    info!("Stats task started ({} ms)", period_ms);

    let mut ticker = Ticker::every(Duration::from_millis(period_ms as u64));
    let mut last_packets = 0u32;

    loop {
        ticker.next().await;

        let record = TELEMETRY.snapshot();
        let packets = record.packet_count.wrapping_sub(last_packets);
        last_packets = record.packet_count;
        let rate = frame_rate(packets, period_ms);

        info!(
            "link={} packets={} errors={} rate={}/s dropped={} gen={}",
            record.connected,
            record.packet_count,
            record.error_count,
            rate,
            SERIAL_DROPPED.load(Ordering::Relaxed),
            TELEMETRY.generation()
        );
    }
}
