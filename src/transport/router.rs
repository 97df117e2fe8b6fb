//! Frame router: picks where an incoming frame's body lands, from its header
//! alone, before the body is clocked in.

use log::{debug, warn};

use crate::transport::frame::CommandFlags;
use crate::transport::rx_queue::RxQueue;
use crate::transport::sync::{SyncChain, SyncSlot};

/// Destination for the body of an incoming frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RxDestination {
    /// Clock the body out and throw it away.
    Discard,
    /// Receive queue slot index.
    Queue(usize),
    /// The outstanding synchronous reply slot.
    Sync,
}

/// Routes an incoming command id.
///
/// Runs inside a critical section because it may advance the queue's write
/// pointer.
pub fn route(
    command_id: u8,
    queue: &mut RxQueue,
    slot: &SyncSlot,
    chain: &mut SyncChain,
) -> RxDestination {
    critical_section::with(|_| {
        let flags = CommandFlags::from_bits_truncate(command_id);
        if flags.contains(CommandFlags::INVALID) || !flags.contains(CommandFlags::S2M) {
            return RxDestination::Discard;
        }

        if flags.contains(CommandFlags::SYN) {
            if chain.in_flight {
                chain.in_flight = false;
                return RxDestination::Discard;
            }
            if slot.is_armed() {
                return RxDestination::Sync;
            }
            debug!("Dropping unsolicited sync frame 0x{command_id:02X}");
            return RxDestination::Discard;
        }

        match queue.reserve() {
            Some(index) => RxDestination::Queue(index),
            None => {
                warn!("Receive queue full, dropping frame 0x{command_id:02X}");
                RxDestination::Discard
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::*;

    #[test]
    fn test_idle_and_downstream_ids_discarded() {
        let mut queue = RxQueue::new(3, 1);
        let slot = SyncSlot::default();
        let mut chain = SyncChain::default();
        assert_eq!(route(SPI_IDLE, &mut queue, &slot, &mut chain), RxDestination::Discard);
        assert_eq!(route(SPI_NACK, &mut queue, &slot, &mut chain), RxDestination::Discard);
        assert_eq!(
            route(MLME_SET_REQUEST, &mut queue, &slot, &mut chain),
            RxDestination::Discard
        );
        assert!(queue.is_empty());
    }

    #[test]
    fn test_sync_reply_goes_to_armed_slot() {
        let mut queue = RxQueue::new(3, 1);
        let mut slot = SyncSlot::default();
        let mut chain = SyncChain::default();
        assert_eq!(
            route(MLME_GET_CONFIRM, &mut queue, &slot, &mut chain),
            RxDestination::Discard
        );
        slot.arm().unwrap();
        assert_eq!(route(MLME_GET_CONFIRM, &mut queue, &slot, &mut chain), RxDestination::Sync);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_chain_filler_reply_discarded_once() {
        let mut queue = RxQueue::new(3, 1);
        let mut slot = SyncSlot::default();
        slot.arm().unwrap();
        let mut chain = SyncChain {
            active: true,
            in_flight: true,
        };
        assert_eq!(
            route(MLME_GET_CONFIRM, &mut queue, &slot, &mut chain),
            RxDestination::Discard
        );
        assert!(!chain.in_flight);
        assert_eq!(route(MLME_GET_CONFIRM, &mut queue, &slot, &mut chain), RxDestination::Sync);
    }

    #[test]
    fn test_async_frames_fill_queue_then_drop() {
        let mut queue = RxQueue::new(2, 1);
        let slot = SyncSlot::default();
        let mut chain = SyncChain::default();
        assert_eq!(
            route(MCPS_DATA_INDICATION, &mut queue, &slot, &mut chain),
            RxDestination::Queue(0)
        );
        assert_eq!(
            route(MCPS_DATA_CONFIRM, &mut queue, &slot, &mut chain),
            RxDestination::Queue(1)
        );
        assert_eq!(
            route(MCPS_DATA_CONFIRM, &mut queue, &slot, &mut chain),
            RxDestination::Discard
        );
        assert_eq!(queue.stats().dropped, 1);
    }
}
