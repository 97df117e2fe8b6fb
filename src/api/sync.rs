//! # Typed Requests
//!
//! Device methods for every downstream primitive. The `_sync` methods send
//! a synchronous request, decode its confirm and turn a non-success status
//! into `Ca821xError::Mac`. The others queue an asynchronous request whose
//! confirm arrives through the handler table.
//!
//! A few confirms also update host-side state: the short and extended
//! addresses the device answers to, and the LQI reporting mode.

use log::debug;

use crate::api::confirms::*;
use crate::api::requests::{self, StartParams};
use crate::api::security::{FullAddr, SecSpec};
use crate::constants::*;
use crate::dispatch::{Ca821x, LqiMode};
use crate::error::{Ca821xError, MacStatus};
use crate::hal::SpiHal;
use crate::transport::frame::{Message, TxOptions};

/// Coordinator-mode bit of the channel filter SFR, cleared on a full reset.
const SFR_COORD_FILTER: (u8, u8) = (0, 0xD8);

impl<H: SpiHal> Ca821x<H> {
    /// Sends `msg` and decodes its confirm. A missing confirm is a
    /// `SYSTEM_ERROR`, as is a confirm with the wrong id.
    fn request_confirm<T: Primitive>(&mut self, msg: &Message) -> Result<T, Ca821xError> {
        let reply = self
            .send(msg)?
            .ok_or(Ca821xError::Mac(MacStatus::SYSTEM_ERROR))?;
        T::from_message(&reply, self.variant())
    }

    /// Sends a request whose confirm starts with its status byte.
    fn request_status(&mut self, msg: &Message, confirm_id: u8) -> Result<(), Ca821xError> {
        let reply = self
            .send(msg)?
            .ok_or(Ca821xError::Mac(MacStatus::SYSTEM_ERROR))?;
        if reply.command_id() != confirm_id {
            return Err(Ca821xError::Mac(MacStatus::SYSTEM_ERROR));
        }
        MacStatus(reply.byte(0)).into_result()
    }

    fn request_async(&mut self, msg: Result<Message, Ca821xError>) -> Result<(), Ca821xError> {
        self.send(&msg?).map(|_| ())
    }

    pub fn mlme_set_request_sync(
        &mut self,
        attribute: u8,
        index: u8,
        value: &[u8],
    ) -> Result<(), Ca821xError> {
        let msg = requests::mlme_set_request(attribute, index, value)?;
        let confirm: SetConfirm = self.request_confirm(&msg)?;
        confirm.status.into_result()?;

        match attribute {
            MAC_SHORT_ADDRESS if value.len() >= 2 => {
                self.short_address = u16::from_le_bytes([value[0], value[1]]);
                debug!("Short address now 0x{:04X}", self.short_address);
            }
            NS_IEEE_ADDRESS if value.len() >= 8 => {
                self.ext_address.copy_from_slice(&value[..8]);
                debug!("Extended address now {}", hex::encode(self.ext_address));
            }
            _ => {}
        }
        Ok(())
    }

    /// Reads a PIB attribute, returning its value.
    pub fn mlme_get_request_sync(&mut self, attribute: u8, index: u8) -> Result<Vec<u8>, Ca821xError> {
        let msg = requests::mlme_get_request(attribute, index)?;
        let confirm: GetConfirm = self.request_confirm(&msg)?;
        confirm.status.into_result()?;
        Ok(confirm.value)
    }

    /// Resets the MAC. With `set_default_pib` the device also forgets its
    /// short address.
    pub fn mlme_reset_request_sync(&mut self, set_default_pib: bool) -> Result<(), Ca821xError> {
        let msg = requests::mlme_reset_request(set_default_pib)?;
        self.request_status(&msg, MLME_RESET_CONFIRM)?;
        if !set_default_pib {
            return Ok(());
        }
        self.short_address = MAC_BROADCAST_ADDRESS;
        if self.config.mac_workarounds {
            let (page, addr) = SFR_COORD_FILTER;
            self.tdme_setsfr_request_sync(page, addr, 0)?;
        }
        Ok(())
    }

    pub fn mlme_start_request_sync(&mut self, params: &StartParams) -> Result<(), Ca821xError> {
        let msg = requests::mlme_start_request(params)?;
        self.request_status(&msg, MLME_START_CONFIRM)
    }

    pub fn mlme_rx_enable_request_sync(
        &mut self,
        defer_permit: bool,
        rx_on_time: u32,
        rx_on_duration: u32,
    ) -> Result<(), Ca821xError> {
        let msg = requests::mlme_rx_enable_request(defer_permit, rx_on_time, rx_on_duration)?;
        self.request_status(&msg, MLME_RX_ENABLE_CONFIRM)
    }

    /// Polls the coordinator for pending data. The transceiver answers the
    /// poll itself synchronously; received data arrives as indications.
    pub fn mlme_poll_request(
        &mut self,
        coord: &FullAddr,
        interval: u16,
        security: &SecSpec,
    ) -> Result<(), Ca821xError> {
        let msg = requests::mlme_poll_request(self.variant(), coord, interval, security)?;
        self.request_status(&msg, MLME_POLL_CONFIRM)
    }

    /// Removes a queued transmission. Its entry leaves the transmission
    /// cache once the purge succeeds.
    pub fn mcps_purge_request_sync(&mut self, msdu_handle: u8) -> Result<(), Ca821xError> {
        let msg = requests::mcps_purge_request(msdu_handle)?;
        let confirm: PurgeConfirm = self.request_confirm(&msg)?;
        confirm.status.into_result()
    }

    pub fn hwme_set_request_sync(&mut self, attribute: u8, value: &[u8]) -> Result<(), Ca821xError> {
        let msg = requests::hwme_set_request(attribute, value)?;
        let confirm: HwmeSetConfirm = self.request_confirm(&msg)?;
        confirm.status.into_result()?;

        if attribute == HWME_LQI_MODE {
            self.lqi_mode = match value.first() {
                Some(&HWME_LQIMODE_ED) => LqiMode::Ed,
                _ => LqiMode::Cs,
            };
            debug!("LQI mode {:?}", self.lqi_mode);
        }
        Ok(())
    }

    pub fn hwme_get_request_sync(&mut self, attribute: u8) -> Result<Vec<u8>, Ca821xError> {
        let msg = requests::hwme_get_request(attribute)?;
        let confirm: HwmeGetConfirm = self.request_confirm(&msg)?;
        confirm.status.into_result()?;
        Ok(confirm.value)
    }

    /// Runs one AES block through the hardware engine.
    pub fn hwme_haes_request_sync(&mut self, mode: u8, data: &[u8; 16]) -> Result<[u8; 16], Ca821xError> {
        let msg = requests::hwme_haes_request(mode, data)?;
        let confirm: HaesConfirm = self.request_confirm(&msg)?;
        confirm.status.into_result()?;
        Ok(confirm.data)
    }

    pub fn tdme_setsfr_request_sync(&mut self, page: u8, address: u8, value: u8) -> Result<(), Ca821xError> {
        let msg = requests::tdme_setsfr_request(page, address, value)?;
        let confirm: SetSfrConfirm = self.request_confirm(&msg)?;
        confirm.status.into_result()
    }

    pub fn tdme_getsfr_request_sync(&mut self, page: u8, address: u8) -> Result<u8, Ca821xError> {
        let msg = requests::tdme_getsfr_request(page, address)?;
        let confirm: GetSfrConfirm = self.request_confirm(&msg)?;
        confirm.status.into_result()?;
        Ok(confirm.value)
    }

    pub fn tdme_testmode_request_sync(&mut self, mode: u8) -> Result<(), Ca821xError> {
        let msg = requests::tdme_testmode_request(mode)?;
        let confirm: TestModeConfirm = self.request_confirm(&msg)?;
        confirm.status.into_result()
    }

    pub fn tdme_set_request_sync(&mut self, attribute: u8, value: &[u8]) -> Result<(), Ca821xError> {
        let msg = requests::tdme_set_request(attribute, value)?;
        let confirm: TdmeSetConfirm = self.request_confirm(&msg)?;
        confirm.status.into_result()
    }

    /// Transmits a test packet, returning the sequence number and data the
    /// transceiver reports.
    pub fn tdme_txpkt_request_sync(
        &mut self,
        data_type: u8,
        sequence_number: u8,
        length: u8,
        data: &[u8],
    ) -> Result<TxPktConfirm, Ca821xError> {
        let msg = requests::tdme_txpkt_request(data_type, sequence_number, length, data)?;
        let confirm: TxPktConfirm = self.request_confirm(&msg)?;
        confirm.status.into_result()?;
        Ok(confirm)
    }

    /// Runs the LO tuning loop on `channel`, returning the trim results.
    pub fn tdme_lotlk_request_sync(&mut self, channel: u8, rx_tx: u8) -> Result<LoTlkConfirm, Ca821xError> {
        let msg = requests::tdme_lotlk_request(channel, rx_tx)?;
        let confirm: LoTlkConfirm = self.request_confirm(&msg)?;
        confirm.status.into_result()?;
        Ok(confirm)
    }

    pub fn mcps_data_request(
        &mut self,
        src_addr_mode: u8,
        dst: &FullAddr,
        msdu_handle: u8,
        tx_options: TxOptions,
        msdu: &[u8],
        security: &SecSpec,
    ) -> Result<(), Ca821xError> {
        self.request_async(requests::mcps_data_request(
            src_addr_mode,
            dst,
            msdu_handle,
            tx_options,
            msdu,
            security,
        ))
    }

    /// PHY-level transmission; CA-8211 only.
    pub fn pcps_data_request(
        &mut self,
        psdu_handle: u8,
        tx_options: TxOptions,
        psdu: &[u8],
    ) -> Result<(), Ca821xError> {
        if !self.variant().supports_pcps() {
            return Err(Ca821xError::InvalidArgs);
        }
        self.request_async(requests::pcps_data_request(psdu_handle, tx_options, psdu))
    }

    pub fn mlme_associate_request(
        &mut self,
        channel: u8,
        coord: &FullAddr,
        capability_info: u8,
        security: &SecSpec,
    ) -> Result<(), Ca821xError> {
        self.request_async(requests::mlme_associate_request(channel, coord, capability_info, security))
    }

    pub fn mlme_associate_response(
        &mut self,
        device_address: [u8; 8],
        assoc_short_address: u16,
        status: MacStatus,
        security: &SecSpec,
    ) -> Result<(), Ca821xError> {
        self.request_async(requests::mlme_associate_response(
            device_address,
            assoc_short_address,
            status,
            security,
        ))
    }

    pub fn mlme_disassociate_request(
        &mut self,
        device: &FullAddr,
        reason: u8,
        tx_indirect: bool,
        security: &SecSpec,
    ) -> Result<(), Ca821xError> {
        self.request_async(requests::mlme_disassociate_request(device, reason, tx_indirect, security))
    }

    pub fn mlme_orphan_response(
        &mut self,
        orphan_address: [u8; 8],
        short_address: u16,
        associated_member: bool,
        security: &SecSpec,
    ) -> Result<(), Ca821xError> {
        self.request_async(requests::mlme_orphan_response(
            orphan_address,
            short_address,
            associated_member,
            security,
        ))
    }

    /// Starts a scan. Until its confirm arrives every other request fails
    /// with `SpiScanInProgress`.
    pub fn mlme_scan_request(
        &mut self,
        scan_type: u8,
        scan_channels: u32,
        scan_duration: u8,
        security: &SecSpec,
    ) -> Result<(), Ca821xError> {
        self.request_async(requests::mlme_scan_request(scan_type, scan_channels, scan_duration, security))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ChipVariant, TransportConfig};
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
    fn test_set_then_get() {
        let (mut dev, mock) = device(ChipVariant::Ca8211);
        dev.mlme_set_request_sync(MAC_PAN_ID, 0, &[0x34, 0x12]).unwrap();
        assert_eq!(mock.pib(MAC_PAN_ID), Some(vec![0x34, 0x12]));
        assert_eq!(dev.mlme_get_request_sync(MAC_PAN_ID, 0).unwrap(), vec![0x34, 0x12]);
    }

    #[test]
    fn test_invalid_set_never_reaches_chip() {
        let (mut dev, mock) = device(ChipVariant::Ca8211);
        assert_eq!(
            dev.mlme_set_request_sync(MAC_MAX_FRAME_RETRIES, 0, &[8]),
            Err(Ca821xError::Mac(MacStatus::INVALID_PARAMETER))
        );
        assert_eq!(mock.pib(MAC_MAX_FRAME_RETRIES), None);
    }

    #[test]
    fn test_address_tracking() {
        let (mut dev, _mock) = device(ChipVariant::Ca8211);
        dev.mlme_set_request_sync(MAC_SHORT_ADDRESS, 0, &[0x02, 0x00]).unwrap();
        assert_eq!(dev.short_address(), 0x0002);
        let ext = [1, 2, 3, 4, 5, 6, 7, 8];
        dev.mlme_set_request_sync(NS_IEEE_ADDRESS, 0, &ext).unwrap();
        assert_eq!(dev.ext_address(), ext);

        dev.mlme_reset_request_sync(false).unwrap();
        assert_eq!(dev.short_address(), 0x0002);
        dev.mlme_reset_request_sync(true).unwrap();
        assert_eq!(dev.short_address(), MAC_BROADCAST_ADDRESS);
    }

    #[test]
    fn test_reset_clears_coordinator_filter_with_workarounds() {
        let (mut dev, mock) = device(ChipVariant::Ca8211);
        mock.set_sfr(0, 0xD8, 0x01);
        dev.config.mac_workarounds = true;
        dev.mlme_reset_request_sync(true).unwrap();
        assert_eq!(mock.sfr(0, 0xD8), Some(0));
    }

    #[test]
    fn test_lqi_mode_follows_hwme_set() {
        let (mut dev, _mock) = device(ChipVariant::Ca8210);
        dev.hwme_set_request_sync(HWME_LQI_MODE, &[HWME_LQIMODE_ED]).unwrap();
        assert_eq!(dev.lqi_mode(), LqiMode::Ed);
        dev.hwme_set_request_sync(HWME_LQI_MODE, &[HWME_LQIMODE_CS]).unwrap();
        assert_eq!(dev.lqi_mode(), LqiMode::Cs);
    }

    #[test]
    fn test_sfr_and_haes_round_trip() {
        let (mut dev, _mock) = device(ChipVariant::Ca8211);
        dev.tdme_setsfr_request_sync(1, 0xE1, 0x29).unwrap();
        assert_eq!(dev.tdme_getsfr_request_sync(1, 0xE1).unwrap(), 0x29);
        let block = [0x5A; 16];
        assert_eq!(dev.hwme_haes_request_sync(0, &block).unwrap(), block);
    }

    #[test]
    fn test_tx_power_goes_through_pa_bias() {
        let (mut dev, mock) = device(ChipVariant::Ca8211);
        dev.mlme_set_request_sync(PHY_TRANSMIT_POWER, 0, &[4]).unwrap();
        assert_eq!(mock.sfr(0, 0xFE), Some(0x0C));
        assert_eq!(mock.pib(PHY_TRANSMIT_POWER), None);
        assert_eq!(dev.mlme_get_request_sync(PHY_TRANSMIT_POWER, 0).unwrap(), vec![4]);
    }

    #[test]
    fn test_lotlk_reports_trims() {
        let (mut dev, _mock) = device(ChipVariant::Ca8211);
        let cnf = dev.tdme_lotlk_request_sync(18, 1).unwrap();
        assert_eq!((cnf.channel, cnf.fdac, cnf.amp, cnf.txcal), (18, 0x11, 0x22, 0x33));
    }

    #[test]
    fn test_data_request_is_tracked() {
        let (mut dev, mock) = device(ChipVariant::Ca8211);
        let dst = FullAddr::short(0x1234, 0x0001);
        dev.mcps_data_request(
            MAC_MODE_SHORT_ADDR,
            &dst,
            7,
            TxOptions::ACK_REQUESTED,
            &[1, 2, 3],
            &SecSpec::none(),
        )
        .unwrap();
        assert_eq!(mock.received_ids(), vec![MCPS_DATA_REQUEST]);
        assert_eq!(dev.cache().active_count(), 1);
    }

    #[test]
    fn test_pcps_refused_on_ca8210() {
        let (mut dev, mock) = device(ChipVariant::Ca8210);
        assert_eq!(
            dev.pcps_data_request(1, TxOptions::empty(), &[0; 4]),
            Err(Ca821xError::InvalidArgs)
        );
        assert!(mock.received().is_empty());
    }

    #[test]
    fn test_scan_blocks_other_requests() {
        let (mut dev, _mock) = device(ChipVariant::Ca8211);
        dev.mlme_scan_request(ACTIVE_SCAN, 0x0000_0800, 3, &SecSpec::none())
            .unwrap();
        assert_eq!(
            dev.mlme_get_request_sync(MAC_PAN_ID, 0),
            Err(Ca821xError::SpiScanInProgress)
        );
    }
}
