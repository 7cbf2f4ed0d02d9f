//! Redline - ECU Telemetry Dashboard Firmware
//!
//! Main firmware binary for RP2040-based gauge clusters. Receives the ECU's
//! serial telemetry stream, decodes it into one shared record and hands
//! snapshots to the presentation side.
//!
//! Named after the tachometer's red zone.

#![no_std]
#![no_main]

use defmt::*;
use embassy_executor::Spawner;
use embassy_rp::bind_interrupts;
use embassy_rp::peripherals::UART0;
use embassy_rp::uart::{BufferedInterruptHandler, Config as UartConfig, Uart};
use redline_core::IngestRing;
use static_cell::StaticCell;
use {defmt_rtt as _, panic_probe as _};

use crate::channels::SERIAL_RING_SIZE;

mod channels;
mod config;
mod tasks;

bind_interrupts!(struct Irqs {
    UART0_IRQ => BufferedInterruptHandler<UART0>;
});

// UART buffers and the ingest ring must live forever
static TX_BUF: StaticCell<[u8; 16]> = StaticCell::new();
static RX_BUF: StaticCell<[u8; 256]> = StaticCell::new();
static SERIAL_RING: StaticCell<IngestRing<u8, SERIAL_RING_SIZE>> = StaticCell::new();

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("Redline firmware starting...");

    let p = embassy_rp::init(Default::default());
    info!("Peripherals initialized");

    let config = config::load();

    // ECU link on UART0 (GP0 TX, GP1 RX), 8N1
    let mut uart_config = UartConfig::default();
    uart_config.baudrate = config.serial.baud_rate;

    let tx_buf = TX_BUF.init([0u8; 16]);
    let rx_buf = RX_BUF.init([0u8; 256]);

    let uart = Uart::new_blocking(p.UART0, p.PIN_0, p.PIN_1, uart_config);
    let uart = uart.into_buffered(Irqs, tx_buf, rx_buf);
    let (_tx, rx) = uart.split();

    info!("UART initialized at {} baud", config.serial.baud_rate);

    let ring = SERIAL_RING.init(IngestRing::new());
    let (producer, consumer) = ring.split();

    spawner.spawn(tasks::serial_rx_task(rx, producer)).unwrap();
    spawner
        .spawn(tasks::ingest_task(consumer, config.timing))
        .unwrap();
    spawner
        .spawn(tasks::dashboard_task(config.timing.dashboard_update_ms))
        .unwrap();
    if config.debug.stats {
        spawner
            .spawn(tasks::stats_task(config.timing.debug_stats_ms))
            .unwrap();
    }

    info!("All tasks spawned, firmware running");

    loop {
        embassy_time::Timer::after_secs(60).await;
        trace!("Main loop heartbeat");
    }
}
