//! UART serial communication abstractions

/// Baud rate of the ECU telemetry link (8N1)
pub const ECU_BAUD_RATE: u32 = 19_200;

/// UART transmitter
pub trait UartTx {
    /// Error type for transmit operations
    type Error;

    /// Write data to the UART
    ///
    /// Blocks until all data has been written or an error occurs.
    fn write_blocking(&mut self, data: &[u8]) -> Result<(), Self::Error>;

    /// Flush any buffered data
    fn flush(&mut self) -> Result<(), Self::Error>;
}

/// UART receiver
pub trait UartRx {
    /// Error type for receive operations
    type Error;

    /// Take one byte from the receive FIFO if one is ready
    ///
    /// Never blocks, so it is safe to call from an interrupt handler.
    /// Returns `Ok(None)` once the FIFO is empty.
    fn try_read_byte(&mut self) -> Result<Option<u8>, Self::Error>;
}
