//! # Dispatch Core
//!
//! Downstream, `send` brackets the link-level send with the errata checks
//! and keeps the transmission cache in step with accepted data requests.
//! Upstream, `drain` empties the receive queue in arrival order, applies the
//! per-kind checks and hands each frame to its handler.

use log::{debug, warn};

use crate::api::scan_filter::filter_scan_confirm;
use crate::api::security::{parse_full_addr, FullAddr, MacAddr};
use crate::config::ChipVariant;
use crate::constants::*;
use crate::dispatch::callbacks::slot_index;
use crate::dispatch::{Ca821x, CacheKind, DispatchState, LqiMode};
use crate::error::{Ca821xError, MacStatus};
use crate::hal::SpiHal;
use crate::transport::frame::{Message, TxOptions};

/// Offset of the destination address in a data indication.
const DATA_IND_DST_OFFSET: usize = FullAddr::LEN;
/// Offsets of the handle and TxOptions in a data request.
const DATA_REQ_HANDLE_OFFSET: usize = 13;
const DATA_REQ_TXOPT_OFFSET: usize = 14;

/// Peer address an upstream indication originates from, for blacklisting.
fn source_address(msg: &Message) -> Option<MacAddr> {
    let payload = msg.payload();
    let addr = match msg.command_id() {
        MCPS_DATA_INDICATION => parse_full_addr(payload).ok()?.1,
        // bsn precedes the PAN descriptor's coordinator address
        MLME_BEACON_NOTIFY_INDICATION => parse_full_addr(payload.get(1..)?).ok()?.1,
        // PAN id, then the source mode and address
        MLME_COMM_STATUS_INDICATION => {
            let mut address = [0u8; 8];
            address.copy_from_slice(payload.get(3..11)?);
            FullAddr {
                mode: *payload.get(2)?,
                pan_id: u16::from_le_bytes([msg.byte(0), msg.byte(1)]),
                address,
            }
        }
        _ => return None,
    };
    addr.mac_addr()
}

impl<H: SpiHal> Ca821x<H> {
    /// Sends a request to the transceiver.
    ///
    /// Returns the confirm for synchronous kinds and `None` otherwise. SET and
    /// GET requests handled on the host return their synthesized confirm
    /// without touching the link.
    pub fn send(&mut self, msg: &Message) -> Result<Option<Message>, Ca821xError> {
        if self.link.is_scanning() {
            return Err(Ca821xError::SpiScanInProgress);
        }
        if let Some(confirm) = self.check_set_get(msg) {
            return Ok(Some(confirm));
        }
        self.check_channel(msg);
        self.apply_boundary_fix(msg);

        let result = self.link.send(msg);
        let post = match &result {
            Ok(reply) => self.post_check(msg, reply.as_ref()),
            Err(_) => Ok(()),
        };
        if msg.command_id() == PCPS_DATA_REQUEST {
            self.boundary_post_fix();
        }
        let reply = result?;
        post?;
        Ok(reply)
    }

    /// Byte-level form of [`Ca821x::send`] taking and returning whole frames.
    pub fn send_raw(&mut self, frame: &[u8]) -> Result<Option<Vec<u8>>, Ca821xError> {
        let msg = Message::from_bytes(frame)?;
        Ok(self.send(&msg)?.map(|reply| reply.to_bytes()))
    }

    /// Bookkeeping after the link accepted `msg`.
    fn post_check(&mut self, msg: &Message, reply: Option<&Message>) -> Result<(), Ca821xError> {
        let mut status = Ok(());
        let tracked = match msg.command_id() {
            MCPS_DATA_REQUEST => Some((
                msg.byte(DATA_REQ_HANDLE_OFFSET),
                CacheKind::Mcps,
                msg.byte(DATA_REQ_TXOPT_OFFSET),
            )),
            PCPS_DATA_REQUEST => Some((msg.byte(0), CacheKind::Pcps, msg.byte(1))),
            _ => None,
        };
        if let Some((handle, kind, tx_options)) = tracked {
            let indirect = TxOptions::from_bits_truncate(tx_options).contains(TxOptions::INDIRECT);
            status = self.cache.record(handle, kind, indirect);
            if let Err(e) = status {
                warn!("Cannot track data request 0x{handle:02X}: {e}");
            }
            if self.variant() == ChipVariant::Ca8211 && !indirect && self.cache.has_active_indirect() {
                self.apply_mixed_direct_fix()?;
            }
        }

        if let Some(reply) = reply {
            match reply.command_id() {
                MCPS_PURGE_CONFIRM if MacStatus(reply.byte(1)).is_success() => {
                    let _ = self.cache.remove(reply.byte(0), CacheKind::Mcps);
                }
                MLME_RESET_CONFIRM if MacStatus(reply.byte(0)).is_success() => {
                    self.cache.purge(false, self.variant());
                }
                _ => {}
            }
        }
        status
    }

    /// Delivers every queued upstream frame, then ages the transmission
    /// cache and picks up a read deferred while the queue was busy.
    ///
    /// Fails with `InvalidState` when called from inside a handler.
    pub fn drain(&mut self) -> Result<(), Ca821xError> {
        self.state = self.state.begin_drain()?;

        while let Some(front) = self.link.queue().peek() {
            let mut msg = front.clone();
            self.precheck_upstream(&msg);
            match self.dispatch_message(&mut msg) {
                Ok(()) => {}
                Err(Ca821xError::NotHandled) => debug!("0x{:02X} not handled", msg.command_id()),
                Err(e) => warn!("Dispatching 0x{:02X}: {e}", msg.command_id()),
            }
            self.link.queue_mut().dequeue();
        }

        self.state = self.state.end_drain();

        if let Err(Ca821xError::Timeout) = self.decay_cache() {
            if self.state == DispatchState::Idle {
                self.recover_cache();
            } else {
                debug!("Cache recovery deferred until the wait ends");
                self.hotfix.recovery_pending = true;
            }
        }
        if self.link.read_pending() {
            self.link.service_link()?;
        }
        Ok(())
    }

    /// Reads one frame from the transceiver if IRQB is asserted.
    ///
    /// The interrupt handler (or a polling loop) calls this; frames land in
    /// the receive queue for the next [`Ca821x::drain`].
    pub fn service_link(&mut self) -> Result<(), Ca821xError> {
        self.link.service_link()
    }

    /// Closes cache entries on data confirms before they are dispatched.
    fn precheck_upstream(&mut self, msg: &Message) {
        let kind = match msg.command_id() {
            MCPS_DATA_CONFIRM => CacheKind::Mcps,
            PCPS_DATA_CONFIRM => CacheKind::Pcps,
            _ => return,
        };
        if self.cache.remove(msg.byte(0), kind).is_err() {
            debug!("Confirm for untracked handle 0x{:02X}", msg.byte(0));
        }
    }

    /// Ages the cache by the time since the last successful decay.
    pub(crate) fn decay_cache(&mut self) -> Result<(), Ca821xError> {
        let now = self.link.hal_mut().now_ms();
        let delta = now.wrapping_sub(self.cache_prev_ms);
        if delta == 0 || self.hotfix.flush_active {
            return Ok(());
        }
        self.cache.decay(delta)?;
        self.cache_prev_ms = now;
        Ok(())
    }

    /// Applies the per-kind checks to one upstream frame and runs its handler.
    pub(crate) fn dispatch_message(&mut self, msg: &mut Message) -> Result<(), Ca821xError> {
        if msg.is_idle() {
            return Ok(());
        }
        if slot_index(msg.command_id()).is_none() {
            debug!("Unknown upstream id 0x{:02X}", msg.command_id());
            return Err(Ca821xError::NotHandled);
        }

        match msg.command_id() {
            MCPS_DATA_INDICATION if self.variant() == ChipVariant::Ca8210 => {
                if !self.addressed_to_us(msg) {
                    debug!("Data indication for another device dropped");
                    return Ok(());
                }
            }
            MLME_ASSOCIATE_CONFIRM => {
                let short = u16::from_le_bytes([msg.byte(0), msg.byte(1)]);
                if short != MAC_BROADCAST_ADDRESS {
                    self.short_address = short;
                }
            }
            MLME_SCAN_CONFIRM if self.variant() == ChipVariant::Ca8210 && self.lqi_mode != LqiMode::Ed => {
                filter_scan_confirm(msg, self.config.lqi_limit);
            }
            _ => {}
        }

        if !self.blacklist.is_empty() {
            if let Some(src) = source_address(msg) {
                if self.blacklist.contains(&src) {
                    debug!("0x{:02X} from blacklisted {src} dropped", msg.command_id());
                    return Ok(());
                }
            }
        }

        self.invoke_handler(msg)
    }

    /// Destination check for data indications on the CA-8210, whose
    /// filtering lets frames for other addresses through.
    fn addressed_to_us(&self, msg: &Message) -> bool {
        let Some(Ok((_, dst))) = msg.payload().get(DATA_IND_DST_OFFSET..).map(parse_full_addr) else {
            return true;
        };
        match dst.mac_addr() {
            Some(MacAddr::Short(addr)) => {
                addr == MAC_BROADCAST_ADDRESS
                    || addr == self.short_address
                    || self.short_address == MAC_BROADCAST_ADDRESS
            }
            Some(MacAddr::Extended(addr)) => addr == self.ext_address || self.ext_address == [0; 8],
            None => true,
        }
    }
}
