//! ECU UART receive task
//!
//! Moves bytes from the UART's interrupt-filled buffer into the serial
//! ingest ring. Never decodes anything itself.

use defmt::*;
use embassy_rp::uart::BufferedUartRx;
use embedded_io_async::Read;
use redline_core::IngestProducer;

use crate::channels::SERIAL_RING_SIZE;

/// Bytes taken from the UART per wakeup
const RX_CHUNK: usize = 32;

#[embassy_executor::task]
pub async fn serial_rx_task(
    mut rx: BufferedUartRx,
    mut producer: IngestProducer<'static, u8, SERIAL_RING_SIZE>,
) {
    info!("Serial RX task started");

    let mut buf = [0u8; RX_CHUNK];

    loop {
        match rx.read(&mut buf).await {
            Ok(n) if n > 0 => {
                trace!("RX: {} bytes", n);

                let refused = buf[..n].iter().filter(|&&byte| !producer.push(byte)).count();
                if refused > 0 {
                    warn!("Serial ring full, dropped {} bytes", refused);
                }
            }
            Ok(_) => {}
            Err(e) => {
                warn!("UART read error: {:?}", e);
            }
        }
    }
}
