//! Synchronous reply slot and sync chain state.

use crate::constants::*;
use crate::error::Ca821xError;
use crate::transport::frame::Message;

/// Filler request kept outstanding while a sync chain is active: a GET of
/// macAckWaitDuration.
pub const SYNC_CHAIN_FILLER: [u8; 4] = [MLME_GET_REQUEST, 0x02, MAC_ACK_WAIT_DURATION, 0x00];

/// The single buffer a synchronous reply is routed into.
#[derive(Debug, Default)]
pub struct SyncSlot {
    buffer: Option<Message>,
}

impl SyncSlot {
    /// Claims the slot for a new synchronous request.
    ///
    /// Fails with `InvalidState` while another request still owns it.
    pub fn arm(&mut self) -> Result<(), Ca821xError> {
        if self.buffer.is_some() {
            return Err(Ca821xError::InvalidState);
        }
        self.buffer = Some(Message::idle());
        Ok(())
    }

    pub fn is_armed(&self) -> bool {
        self.buffer.is_some()
    }

    /// True once a reply with `response_id` has landed in the slot.
    pub fn has_response(&self, response_id: u8) -> bool {
        matches!(&self.buffer, Some(msg) if msg.command_id() == response_id)
    }

    pub(crate) fn buffer_mut(&mut self) -> Option<&mut Message> {
        self.buffer.as_mut()
    }

    /// Releases the slot, returning whatever it holds.
    pub fn disarm(&mut self) -> Option<Message> {
        self.buffer.take()
    }
}

/// Sync chain batching state.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SyncChain {
    pub(crate) active: bool,
    pub(crate) in_flight: bool,
}

impl SyncChain {
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// True while the filler request's reply has not been read back.
    pub fn is_in_flight(&self) -> bool {
        self.in_flight
    }

    pub fn filler() -> Message {
        let len = usize::from(SYNC_CHAIN_FILLER[1]);
        Message::new(SYNC_CHAIN_FILLER[0], &SYNC_CHAIN_FILLER[2..2 + len]).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_arm_rejected_and_first_reply_kept() {
        let mut slot = SyncSlot::default();
        slot.arm().unwrap();
        assert_eq!(slot.arm(), Err(Ca821xError::InvalidState));

        if let Some(buf) = slot.buffer_mut() {
            buf.set_header(MLME_GET_CONFIRM, 0);
        }
        assert!(slot.has_response(MLME_GET_CONFIRM));
        let reply = slot.disarm().unwrap();
        assert_eq!(reply.command_id(), MLME_GET_CONFIRM);
        assert!(!slot.is_armed());
    }

    #[test]
    fn test_filler_frame() {
        assert_eq!(SyncChain::filler().to_bytes(), SYNC_CHAIN_FILLER.to_vec());
    }
}
