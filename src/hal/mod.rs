//! # Hardware Abstraction Layer for the CA-821x Link
//!
//! This module defines the board support trait the transport drives: one
//! full-duplex SPI byte at a time, the chip-select line, the active-low
//! IRQB sense line, and a microsecond/millisecond time base.

use thiserror::Error;

pub mod mock;

pub use mock::MockTransceiver;

/// Errors that can occur during HAL operations
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum HalError {
    #[error("SPI communication error")]
    Spi,

    #[error("GPIO operation error")]
    Gpio,

    #[error("Clock unavailable")]
    Clock,
}

/// Board support for one CA-821x attached over SPI.
pub trait SpiHal {
    /// Clock one byte out while clocking one byte in.
    fn exchange_byte(&mut self, tx: u8) -> Result<u8, HalError>;

    /// Drive the chip-select line; `true` asserts it (pulls SSB low).
    fn set_select(&mut self, asserted: bool) -> Result<(), HalError>;

    /// Sense the IRQB line; `true` when the line is low.
    fn irq_low(&mut self) -> bool;

    /// Busy-wait for the given number of microseconds.
    fn delay_us(&mut self, us: u32);

    /// Monotonic milliseconds.
    fn now_ms(&mut self) -> u32;

    /// Called while polling for a reply; the default sleeps for one millisecond.
    fn idle(&mut self) {
        self.delay_us(1000);
    }

    /// Full-duplex transfer of `tx.len()` bytes into `rx`.
    fn exchange(&mut self, tx: &[u8], rx: &mut [u8]) -> Result<(), HalError> {
        for (out, inp) in tx.iter().zip(rx.iter_mut()) {
            *inp = self.exchange_byte(*out)?;
        }
        Ok(())
    }
}
