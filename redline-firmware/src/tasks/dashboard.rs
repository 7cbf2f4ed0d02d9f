//! Presentation consumer
//!
//! Stands where the gauge renderer would: takes a snapshot whenever new
//! data was published and logs the headline channels.

use defmt::*;
use embassy_time::{Duration, Ticker};

use crate::channels::TELEMETRY;

#[embassy_executor::task]
pub async fn dashboard_task(update_ms: u32) {
    info!("Dashboard task started ({} ms)", update_ms);

    let mut ticker = Ticker::every(Duration::from_millis(update_ms as u64));

    loop {
        ticker.next().await;

        let Some(record) = TELEMETRY.poll_snapshot() else {
            continue;
        };

        if !record.connected {
            debug!("No ECU link");
            continue;
        }

        let engine = &record.engine;
        let temps = &record.temperatures;
        debug!(
            "rpm={} tps={}% map={}kPa lambda={} clt={}C oil={}C/{}bar batt={}V",
            engine.rpm,
            engine.tps,
            engine.map_kpa,
            engine.lambda,
            temps.coolant,
            temps.oil,
            temps.oil_pressure,
            record.corrections.voltage
        );
    }
}
