//! # Errata Workarounds
//!
//! Command-specific adjustments made around requests the transceiver
//! mishandles. Every workaround issues its own requests through the normal
//! send path; failures inside a workaround are logged and do not fail the
//! request that triggered it.

use log::{debug, warn};

use crate::api::confirms::SetConfirm;
use crate::api::pib::check_pib_attribute;
use crate::config::ChipVariant;
use crate::constants::*;
use crate::dispatch::{Ca821x, DispatchState};
use crate::error::{Ca821xError, MacStatus};
use crate::hal::SpiHal;
use crate::transport::frame::Message;

/// PSDU lengths whose buffer allocation straddles an internal boundary.
const BOUNDARY_PSDU_LENGTHS: [u8; 5] = [9, 17, 33, 65, 129];

/// Probe sent ahead of a direct transmission while indirect ones are queued.
const MIXED_DIRECT_PROBE: [u8; 3] = [MLME_POLL_REQUEST, 0x01, 0x00];

/// HWME attribute forcing the transmit state machine state.
const HWME_TX_SM_FORCE: u8 = 0x88;
const HWME_TX_SM_STATE: u8 = 0x8A;
const TX_SM_FORCE_OFF: [u8; 3] = [0x93, 0x68, 0x52];
const TX_SM_STATE_OFF: [u8; 3] = [0x93, 0x68, 0xFF];
const TX_SM_STATE_IDLE: [u8; 3] = [0x93, 0x68, 0x00];

/// SFR controlling hardware FCS generation (page 0).
const SFR_TX_FCS: (u8, u8) = (0, 0xD9);
const TX_FCS_OFF: u8 = 0x0D;
const TX_FCS_ON: u8 = 0x0F;

const BOUNDARY_WAKEUP_MS: u32 = 5;
const FLUSH_WAKEUP_MS: u32 = 15;

/// Flags and saved values of the workarounds currently in effect.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct HotfixState {
    /// Cache recovery is running; decay checks are suspended
    pub flush_active: bool,
    /// The boundary-length fix was applied and awaits its post step
    pub boundary_fix_active: bool,
    /// Receiver state saved by the boundary-length fix
    pub saved_rx_on: u8,
    /// The cache timed out during a blocking wait; recovery runs when it ends
    pub recovery_pending: bool,
}

fn log_fix_error(step: &str, result: Result<(), Ca821xError>) {
    if let Err(e) = result {
        warn!("{step} failed: {e}");
    }
}

impl<H: SpiHal> Ca821x<H> {
    /// Answers SET/GET requests that are handled on the host.
    ///
    /// Out-of-range SET values are refused with `INVALID_PARAMETER`, and the
    /// transmit power attribute is mapped onto the PA registers. Returns the
    /// synthesized confirm when the request must not reach the transceiver.
    pub(crate) fn check_set_get(&mut self, msg: &Message) -> Option<Message> {
        let attribute = msg.byte(0);
        let index = msg.byte(1);
        match msg.command_id() {
            MLME_SET_REQUEST => {
                let len = usize::from(msg.byte(2));
                let value = msg.payload().get(3..3 + len).unwrap_or(&[]);
                let status = match check_pib_attribute(attribute, value) {
                    Err(e) => e.mac_status(),
                    Ok(()) if attribute == PHY_TRANSMIT_POWER => {
                        let txp = value.first().copied().unwrap_or(0);
                        match self.set_tx_power(txp) {
                            Ok(()) => MacStatus::SUCCESS,
                            Err(e) => e.mac_status(),
                        }
                    }
                    Ok(()) => return None,
                };
                let confirm = SetConfirm {
                    status,
                    attribute,
                    index,
                };
                Some(confirm.to_message())
            }
            MLME_GET_REQUEST if attribute == PHY_TRANSMIT_POWER => {
                let (status, value) = match self.get_tx_power() {
                    Ok(txp) => (MacStatus::SUCCESS, txp),
                    Err(e) => (e.mac_status(), 0),
                };
                Message::new(MLME_GET_CONFIRM, &[status.0, attribute, index, 1, value]).ok()
            }
            _ => None,
        }
    }

    /// Writes the channel calibration ahead of requests that change channel.
    pub(crate) fn check_channel(&mut self, msg: &Message) {
        let channel = match msg.command_id() {
            MLME_ASSOCIATE_REQUEST => msg.byte(0),
            MLME_START_REQUEST => msg.byte(2),
            MLME_SET_REQUEST if msg.byte(0) == PHY_CURRENT_CHANNEL => msg.byte(3),
            TDME_SET_REQUEST if msg.byte(0) == TDME_CHANNEL => msg.byte(2),
            _ => return,
        };
        debug!("Channel change to {channel}");
        log_fix_error("Channel calibration", self.channel_init(channel));
    }

    /// Disables the receiver, the transmit state machine and hardware FCS
    /// before a PHY data request of a boundary-straddling length.
    pub(crate) fn apply_boundary_fix(&mut self, msg: &Message) {
        if self.variant() != ChipVariant::Ca8211
            || msg.command_id() != PCPS_DATA_REQUEST
            || !BOUNDARY_PSDU_LENGTHS.contains(&msg.byte(2))
        {
            return;
        }
        debug!("Boundary fix for PSDU length {}", msg.byte(2));

        match self.mlme_get_request_sync(MAC_RX_ON_WHEN_IDLE, 0) {
            Ok(value) => self.hotfix.saved_rx_on = value.first().copied().unwrap_or(0),
            Err(e) => warn!("Reading rxOnWhenIdle failed: {e}"),
        }
        log_fix_error("Receiver off", self.mlme_set_request_sync(MAC_RX_ON_WHEN_IDLE, 0, &[0]));
        log_fix_error("Wakeup wait", self.wait_for(HWME_WAKEUP_INDICATION, BOUNDARY_WAKEUP_MS));
        log_fix_error("TX SM force", self.hwme_set_request_sync(HWME_TX_SM_FORCE, &TX_SM_FORCE_OFF));
        log_fix_error("TX SM off", self.hwme_set_request_sync(HWME_TX_SM_STATE, &TX_SM_STATE_OFF));
        let (page, addr) = SFR_TX_FCS;
        log_fix_error("FCS off", self.tdme_setsfr_request_sync(page, addr, TX_FCS_OFF));
        self.hotfix.boundary_fix_active = true;
    }

    /// Undoes the boundary-length fix. Does nothing unless it is in effect.
    pub fn boundary_post_fix(&mut self) {
        if !self.hotfix.boundary_fix_active {
            return;
        }
        self.hotfix.boundary_fix_active = false;

        let (page, addr) = SFR_TX_FCS;
        log_fix_error("FCS on", self.tdme_setsfr_request_sync(page, addr, TX_FCS_ON));
        log_fix_error("TX SM idle", self.hwme_set_request_sync(HWME_TX_SM_STATE, &TX_SM_STATE_IDLE));
        let rx_on = self.hotfix.saved_rx_on;
        log_fix_error("Receiver restore", self.mlme_set_request_sync(MAC_RX_ON_WHEN_IDLE, 0, &[rx_on]));
    }

    /// Sends the fixed probe that keeps a direct transmission from stalling
    /// behind queued indirect ones.
    pub(crate) fn apply_mixed_direct_fix(&mut self) -> Result<(), Ca821xError> {
        debug!("Mixed direct/indirect probe");
        let probe = Message::from_bytes(&MIXED_DIRECT_PROBE)?;
        self.link.send(&probe).map(|_| ())
    }

    /// Recovers a transceiver that stopped confirming data requests.
    ///
    /// Runs only outside a drain or blocking wait. Quiesces the receiver, fails every cached transmission with a
    /// synthesized confirm, resets the MAC without touching the PIB and
    /// restores the receiver.
    pub(crate) fn recover_cache(&mut self) {
        if self.hotfix.flush_active {
            return;
        }
        warn!(
            "Transmission cache timed out with {} entries, recovering",
            self.cache.active_count()
        );
        self.hotfix.flush_active = true;

        let rx_on = match self.mlme_get_request_sync(MAC_RX_ON_WHEN_IDLE, 0) {
            Ok(value) => value.first().copied(),
            Err(e) => {
                warn!("Reading rxOnWhenIdle failed: {e}");
                None
            }
        };
        log_fix_error("Receiver off", self.mlme_set_request_sync(MAC_RX_ON_WHEN_IDLE, 0, &[0]));
        log_fix_error("Wakeup wait", self.wait_for(HWME_WAKEUP_INDICATION, FLUSH_WAKEUP_MS));

        // handlers see the synthesized confirms as part of a drain
        let confirms = self.cache.purge(true, self.variant());
        self.state = DispatchState::Draining;
        for mut confirm in confirms {
            if let Err(e) = self.dispatch_message(&mut confirm) {
                debug!("Synthesized confirm 0x{:02X}: {e}", confirm.command_id());
            }
        }
        self.state = DispatchState::Idle;

        log_fix_error("MAC reset", self.mlme_reset_request_sync(false));
        if let Some(rx_on) = rx_on {
            log_fix_error("Receiver restore", self.mlme_set_request_sync(MAC_RX_ON_WHEN_IDLE, 0, &[rx_on]));
        }
        self.hotfix.flush_active = false;

        // restarts the elapsed-time baseline
        log_fix_error("Cache decay", self.decay_cache());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TransportConfig;
    use crate::hal::MockTransceiver;

    fn device(variant: ChipVariant) -> (Ca821x<MockTransceiver>, MockTransceiver) {
        let mock = MockTransceiver::with_chip_model();
        let config = TransportConfig {
            sync_timeout_ms: 20,
            ..TransportConfig::for_variant(variant)
        };
        (Ca821x::new(mock.clone(), config).unwrap(), mock)
    }

    #[test]
    fn test_invalid_set_answered_locally() {
        let (mut dev, mock) = device(ChipVariant::Ca8211);
        let msg = Message::new(MLME_SET_REQUEST, &[MAC_BEACON_ORDER, 0, 1, 16]).unwrap();
        let reply = dev.check_set_get(&msg).unwrap();
        assert_eq!(reply.payload(), &[MacStatus::INVALID_PARAMETER.0, MAC_BEACON_ORDER, 0]);
        assert!(mock.received().is_empty());
    }

    #[test]
    fn test_valid_set_passes_through() {
        let (mut dev, _mock) = device(ChipVariant::Ca8211);
        let msg = Message::new(MLME_SET_REQUEST, &[MAC_BEACON_ORDER, 0, 1, 15]).unwrap();
        assert!(dev.check_set_get(&msg).is_none());
    }

    #[test]
    fn test_channel_set_writes_calibration() {
        let (mut dev, mock) = device(ChipVariant::Ca8211);
        let msg = Message::new(MLME_SET_REQUEST, &[PHY_CURRENT_CHANNEL, 0, 1, 26]).unwrap();
        dev.check_channel(&msg);
        assert_eq!(mock.sfr(1, 0xBF), Some(0xA7));
    }

    #[test]
    fn test_boundary_fix_only_on_listed_lengths() {
        let (mut dev, mock) = device(ChipVariant::Ca8211);
        let msg = Message::new(PCPS_DATA_REQUEST, &[1, 0, 10]).unwrap();
        dev.apply_boundary_fix(&msg);
        assert!(!dev.hotfix().boundary_fix_active);
        assert!(mock.received().is_empty());

        let msg = Message::new(PCPS_DATA_REQUEST, &[1, 0, 17]).unwrap();
        dev.apply_boundary_fix(&msg);
        assert!(dev.hotfix().boundary_fix_active);
        assert_eq!(mock.sfr(0, 0xD9), Some(TX_FCS_OFF));
        assert_eq!(mock.hwme(HWME_TX_SM_STATE), Some(TX_SM_STATE_OFF.to_vec()));
    }
}
