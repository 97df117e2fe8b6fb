//! # SPI Wire Frame
//!
//! Every transfer on the CA-821x link carries one frame:
//!
//! ```text
//! byte 0      command id   [INVALID | SYN | S2M | kind(5)]
//! byte 1      payload length
//! byte 2..    payload
//! ```
//!
//! `S2M` marks a confirm or indication travelling from the transceiver to the
//! host, `SYN` marks a primitive answered synchronously, and `INVALID` is set
//! for the reserved idle (0xFF) and NACK (0xF0) bytes.

use std::fmt;

use bitflags::bitflags;

use crate::constants::*;
use crate::error::Ca821xError;

bitflags! {
    /// Flag bits of a command id
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct CommandFlags: u8 {
        /// Confirm or indication (slave to master)
        const S2M = 0x20;
        /// Answered synchronously
        const SYN = 0x40;
        /// Idle or otherwise invalid id
        const INVALID = 0x80;
    }
}

bitflags! {
    /// TxOptions of a data request
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct TxOptions: u8 {
        const ACK_REQUESTED = 0x01;
        const GTS = 0x02;
        const INDIRECT = 0x04;
    }
}

/// Confirm id for each synchronous request kind, indexed by `id & SPI_MID_MASK`.
const SYNC_RESPONSE_IDS: [u8; 23] = [
    SPI_IDLE,               // 0x00 MCPS-DATA
    MCPS_PURGE_CONFIRM,     // 0x01
    SPI_IDLE,               // 0x02 MLME-ASSOCIATE
    SPI_IDLE,               // 0x03
    SPI_IDLE,               // 0x04
    MLME_GET_CONFIRM,       // 0x05
    SPI_IDLE,               // 0x06
    MLME_RESET_CONFIRM,     // 0x07
    MLME_RX_ENABLE_CONFIRM, // 0x08
    SPI_IDLE,               // 0x09 MLME-SCAN
    MLME_SET_CONFIRM,       // 0x0A
    MLME_START_CONFIRM,     // 0x0B
    SPI_IDLE,               // 0x0C
    MLME_POLL_CONFIRM,      // 0x0D
    HWME_SET_CONFIRM,       // 0x0E
    HWME_GET_CONFIRM,       // 0x0F
    HWME_HAES_CONFIRM,      // 0x10
    TDME_SETSFR_CONFIRM,    // 0x11
    TDME_GETSFR_CONFIRM,    // 0x12
    TDME_TESTMODE_CONFIRM,  // 0x13
    TDME_SET_CONFIRM,       // 0x14
    TDME_TXPKT_CONFIRM,     // 0x15
    TDME_LOTLK_CONFIRM,     // 0x16
];

/// Looks up the confirm id that answers a synchronous request.
///
/// Returns `None` when the request kind has no synchronous response.
pub fn sync_response_id(request_id: u8) -> Option<u8> {
    match SYNC_RESPONSE_IDS.get(usize::from(request_id & SPI_MID_MASK)) {
        Some(&id) if id != SPI_IDLE && id != 0 => Some(id),
        _ => None,
    }
}

/// One frame on the SPI link.
#[derive(Clone, PartialEq, Eq)]
pub struct Message {
    command_id: u8,
    length: u8,
    payload: [u8; MAX_PAYLOAD_LEN],
}

impl Default for Message {
    fn default() -> Self {
        Self::idle()
    }
}

impl Message {
    /// An empty frame carrying the idle id.
    pub fn idle() -> Self {
        Message {
            command_id: SPI_IDLE,
            length: 0,
            payload: [SPI_IDLE; MAX_PAYLOAD_LEN],
        }
    }

    pub fn new(command_id: u8, payload: &[u8]) -> Result<Self, Ca821xError> {
        if payload.len() > MAX_PAYLOAD_LEN {
            return Err(Ca821xError::InvalidArgs);
        }
        let mut msg = Self::idle();
        msg.command_id = command_id;
        msg.length = payload.len() as u8;
        msg.payload[..payload.len()].copy_from_slice(payload);
        Ok(msg)
    }

    /// Parses `[id, len, payload..]`; trailing bytes beyond `len` are ignored.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Ca821xError> {
        if bytes.len() < 2 {
            return Err(Ca821xError::InvalidArgs);
        }
        let len = usize::from(bytes[1]);
        let payload = bytes.get(2..2 + len).ok_or(Ca821xError::InvalidArgs)?;
        Self::new(bytes[0], payload)
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.len() + 2);
        out.push(self.command_id);
        out.push(self.length);
        out.extend_from_slice(self.payload());
        out
    }

    pub fn command_id(&self) -> u8 {
        self.command_id
    }

    pub fn len(&self) -> usize {
        usize::from(self.length)
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload[..self.len()]
    }

    /// Payload byte at `index`, or 0 beyond the frame's length.
    pub fn byte(&self, index: usize) -> u8 {
        self.payload().get(index).copied().unwrap_or(0)
    }

    pub fn flags(&self) -> CommandFlags {
        CommandFlags::from_bits_truncate(self.command_id)
    }

    /// Message kind with the flag bits masked off.
    pub fn kind(&self) -> u8 {
        self.command_id & SPI_MID_MASK
    }

    /// True when the sender blocks on a confirm for this frame.
    pub fn is_sync(&self) -> bool {
        self.flags().contains(CommandFlags::SYN) && self.command_id != SPI_IDLE
    }

    pub fn is_idle(&self) -> bool {
        self.command_id == SPI_IDLE
    }

    /// Overwrites the header prior to receiving the body in place.
    pub(crate) fn set_header(&mut self, command_id: u8, length: u8) {
        self.command_id = command_id;
        self.length = length;
    }

    /// Writable payload area of `len` bytes.
    pub(crate) fn body_mut(&mut self, len: usize) -> &mut [u8] {
        &mut self.payload[..len.min(MAX_PAYLOAD_LEN)]
    }

    /// Shrinks the frame after in-place editing.
    pub(crate) fn truncate(&mut self, len: usize) {
        self.length = len.min(self.len()) as u8;
    }

    /// Payload bytes after in-place editing.
    pub(crate) fn payload_mut(&mut self) -> &mut [u8] {
        let len = self.len();
        &mut self.payload[..len]
    }
}

impl fmt::Debug for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Message {{ id: 0x{:02X}, len: {}, payload: {} }}",
            self.command_id,
            self.length,
            hex::encode(self.payload())
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sync_response_table() {
        assert_eq!(sync_response_id(MLME_GET_REQUEST), Some(MLME_GET_CONFIRM));
        assert_eq!(sync_response_id(MLME_SET_REQUEST), Some(MLME_SET_CONFIRM));
        assert_eq!(sync_response_id(MCPS_PURGE_REQUEST), Some(MCPS_PURGE_CONFIRM));
        assert_eq!(sync_response_id(TDME_LOTLK_REQUEST), Some(TDME_LOTLK_CONFIRM));
        assert_eq!(sync_response_id(MLME_POLL_REQUEST), Some(MLME_POLL_CONFIRM));
        assert_eq!(sync_response_id(MCPS_DATA_REQUEST), None);
        assert_eq!(sync_response_id(MLME_SCAN_REQUEST), None);
        assert_eq!(sync_response_id(0x1F), None);
    }

    #[test]
    fn test_flags() {
        let get = Message::new(MLME_GET_REQUEST, &[0x40, 0x00]).unwrap();
        assert!(get.is_sync());
        assert_eq!(get.kind(), 0x05);

        let ind = Message::new(MCPS_DATA_INDICATION, &[]).unwrap();
        assert!(ind.flags().contains(CommandFlags::S2M));
        assert!(!ind.is_sync());

        assert!(!Message::idle().is_sync());
    }

    #[test]
    fn test_from_bytes_checks_length() {
        assert!(Message::from_bytes(&[0x45, 0x02, 0x40]).is_err());
        let msg = Message::from_bytes(&[0x45, 0x02, 0x40, 0x00, 0xAA]).unwrap();
        assert_eq!(msg.to_bytes(), vec![0x45, 0x02, 0x40, 0x00]);
    }

    #[test]
    fn test_oversized_payload_rejected() {
        let big = vec![0u8; MAX_PAYLOAD_LEN + 1];
        assert_eq!(Message::new(0x00, &big), Err(Ca821xError::InvalidArgs));
    }
}
