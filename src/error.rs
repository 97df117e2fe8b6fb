//! # CA-821x Error Handling
//!
//! This module defines the `Ca821xError` enum, the closed set of statuses any
//! transport, dispatch or codec operation in the ca821x-core crate can return,
//! and `MacStatus`, the 802.15.4 status byte carried by confirms.

use std::fmt;

use thiserror::Error;

use crate::hal::HalError;

/// An IEEE 802.15.4 MAC status byte, as carried by confirm primitives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MacStatus(pub u8);

impl MacStatus {
    pub const SUCCESS: MacStatus = MacStatus(0x00);
    pub const FRAME_TOO_LONG: MacStatus = MacStatus(0xE5);
    pub const INVALID_PARAMETER: MacStatus = MacStatus(0xE8);
    pub const NO_BEACON: MacStatus = MacStatus(0xEA);
    pub const NO_SHORT_ADDRESS: MacStatus = MacStatus(0xEC);
    pub const UNSUPPORTED_ATTRIBUTE: MacStatus = MacStatus(0xF4);
    pub const LIMIT_REACHED: MacStatus = MacStatus(0xFA);
    pub const SYSTEM_ERROR: MacStatus = MacStatus(0xFF);

    /// Returns true for `SUCCESS`.
    pub fn is_success(self) -> bool {
        self == MacStatus::SUCCESS
    }

    /// Converts the status into a `Result`, keeping a non-success status as the error.
    pub fn into_result(self) -> Result<(), Ca821xError> {
        if self.is_success() {
            Ok(())
        } else {
            Err(Ca821xError::Mac(self))
        }
    }
}

impl fmt::Display for MacStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match *self {
            MacStatus::SUCCESS => "SUCCESS",
            MacStatus::FRAME_TOO_LONG => "FRAME_TOO_LONG",
            MacStatus::INVALID_PARAMETER => "INVALID_PARAMETER",
            MacStatus::NO_BEACON => "NO_BEACON",
            MacStatus::NO_SHORT_ADDRESS => "NO_SHORT_ADDRESS",
            MacStatus::UNSUPPORTED_ATTRIBUTE => "UNSUPPORTED_ATTRIBUTE",
            MacStatus::LIMIT_REACHED => "LIMIT_REACHED",
            MacStatus::SYSTEM_ERROR => "SYSTEM_ERROR",
            _ => return write!(f, "0x{:02X}", self.0),
        };
        f.write_str(name)
    }
}

/// Represents the different error types that can occur in the CA-821x core.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum Ca821xError {
    /// Generic failure.
    #[error("Operation failed")]
    Fail,

    #[error("Unknown error")]
    Unknown,

    #[error("Invalid")]
    Invalid,

    #[error("No access")]
    NoAccess,

    /// The operation is not allowed in the current state (reentrancy, pending sync reply).
    #[error("Invalid state")]
    InvalidState,

    #[error("Busy")]
    Busy,

    /// An argument was out of range or described no valid operation.
    #[error("Invalid arguments")]
    InvalidArgs,

    /// Nothing handled the upstream frame.
    #[error("Not handled")]
    NotHandled,

    #[error("Not found")]
    NotFound,

    /// A bounded resource (receive queue, cache, blacklist) is full.
    #[error("No buffer available")]
    NoBuffer,

    #[error("Timeout")]
    Timeout,

    /// The request was consumed locally; never returned from the public send path.
    #[error("Already handled")]
    Already,

    /// The transceiver did not become ready, or an awaited reply did not arrive, in time.
    #[error("SPI wait timeout")]
    SpiWaitTimeout,

    /// The CA-8210 kept NACKing the frame header until the timeout expired.
    #[error("SPI NACK timeout")]
    SpiNackTimeout,

    /// A scan is outstanding; only its asynchronous responses may cross the link.
    #[error("SPI scan in progress")]
    SpiScanInProgress,

    #[error("SPI exchange failed")]
    SpiSendExchangeFail,

    /// A confirm (or local validation) reported a non-success MAC status.
    #[error("MAC status {0}")]
    Mac(MacStatus),

    /// The board support layer failed.
    #[error("HAL error: {0}")]
    Hal(#[from] HalError),
}

impl Ca821xError {
    /// Numeric status code as used on the host interface.
    pub fn code(&self) -> u8 {
        match self {
            Ca821xError::Fail => 0x01,
            Ca821xError::Unknown => 0x02,
            Ca821xError::Invalid => 0x03,
            Ca821xError::NoAccess => 0x04,
            Ca821xError::InvalidState => 0x05,
            Ca821xError::Busy => 0x06,
            Ca821xError::InvalidArgs => 0x07,
            Ca821xError::NotHandled => 0x08,
            Ca821xError::NotFound => 0x09,
            Ca821xError::NoBuffer => 0x0A,
            Ca821xError::Timeout => 0x0B,
            Ca821xError::Already => 0x0C,
            Ca821xError::SpiWaitTimeout => 0xA0,
            Ca821xError::SpiNackTimeout => 0xA1,
            Ca821xError::SpiScanInProgress => 0xA2,
            Ca821xError::SpiSendExchangeFail => 0xA3,
            Ca821xError::Mac(status) => status.0,
            Ca821xError::Hal(_) => 0xA3,
        }
    }

    /// True for the link-timing class of errors.
    pub fn is_link_timing(&self) -> bool {
        matches!(
            self,
            Ca821xError::SpiWaitTimeout | Ca821xError::SpiNackTimeout
        )
    }

    /// Status reported to a codec caller: transport failures collapse to `SYSTEM_ERROR`.
    pub fn mac_status(&self) -> MacStatus {
        match self {
            Ca821xError::Mac(status) => *status,
            _ => MacStatus::SYSTEM_ERROR,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_match_host_interface() {
        assert_eq!(Ca821xError::InvalidState.code(), 0x05);
        assert_eq!(Ca821xError::NoBuffer.code(), 0x0A);
        assert_eq!(Ca821xError::SpiWaitTimeout.code(), 0xA0);
        assert_eq!(Ca821xError::SpiScanInProgress.code(), 0xA2);
        assert_eq!(Ca821xError::Mac(MacStatus::NO_BEACON).code(), 0xEA);
    }

    #[test]
    fn test_mac_status_into_result() {
        assert!(MacStatus::SUCCESS.into_result().is_ok());
        assert_eq!(
            MacStatus::INVALID_PARAMETER.into_result(),
            Err(Ca821xError::Mac(MacStatus::INVALID_PARAMETER))
        );
        assert_eq!(Ca821xError::Timeout.mac_status(), MacStatus::SYSTEM_ERROR);
    }
}
