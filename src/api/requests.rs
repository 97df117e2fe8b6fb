//! # Request Builders
//!
//! One builder per downstream primitive. Each packs its typed parameters into
//! a wire `Message`; trailing security blocks shrink to their level byte when
//! unsecured.

use crate::api::security::{FullAddr, SecSpec};
use crate::config::ChipVariant;
use crate::constants::*;
use crate::error::{Ca821xError, MacStatus};
use crate::transport::frame::{Message, TxOptions};

/// Test packet payload is taken from the request rather than generated.
pub const TDME_TXD_APPENDED: u8 = 0x03;

fn frame(command_id: u8, payload: Vec<u8>) -> Result<Message, Ca821xError> {
    Message::new(command_id, &payload)
}

pub fn mcps_data_request(
    src_addr_mode: u8,
    dst: &FullAddr,
    msdu_handle: u8,
    tx_options: TxOptions,
    msdu: &[u8],
    security: &SecSpec,
) -> Result<Message, Ca821xError> {
    if msdu.len() > MAX_DATA_SIZE {
        return Err(Ca821xError::Mac(MacStatus::FRAME_TOO_LONG));
    }
    let mut p = Vec::with_capacity(15 + msdu.len() + security.encoded_len());
    p.push(src_addr_mode);
    dst.write_to(&mut p);
    p.push(msdu.len() as u8);
    p.push(msdu_handle);
    p.push(tx_options.bits());
    p.extend_from_slice(msdu);
    security.write_to(&mut p);
    frame(MCPS_DATA_REQUEST, p)
}

pub fn mcps_purge_request(msdu_handle: u8) -> Result<Message, Ca821xError> {
    frame(MCPS_PURGE_REQUEST, vec![msdu_handle])
}

/// PHY-level data request (CA-8211).
pub fn pcps_data_request(
    psdu_handle: u8,
    tx_options: TxOptions,
    psdu: &[u8],
) -> Result<Message, Ca821xError> {
    if psdu.len() > A_MAX_PHY_PACKET_SIZE {
        return Err(Ca821xError::Mac(MacStatus::FRAME_TOO_LONG));
    }
    let mut p = vec![psdu_handle, tx_options.bits(), psdu.len() as u8];
    p.extend_from_slice(psdu);
    frame(PCPS_DATA_REQUEST, p)
}

pub fn mlme_associate_request(
    channel: u8,
    coord: &FullAddr,
    capability_info: u8,
    security: &SecSpec,
) -> Result<Message, Ca821xError> {
    let mut p = vec![channel];
    coord.write_to(&mut p);
    p.push(capability_info);
    security.write_to(&mut p);
    frame(MLME_ASSOCIATE_REQUEST, p)
}

pub fn mlme_associate_response(
    device_address: [u8; 8],
    assoc_short_address: u16,
    status: MacStatus,
    security: &SecSpec,
) -> Result<Message, Ca821xError> {
    let mut p = device_address.to_vec();
    p.extend_from_slice(&assoc_short_address.to_le_bytes());
    p.push(status.0);
    security.write_to(&mut p);
    frame(MLME_ASSOCIATE_RESPONSE, p)
}

pub fn mlme_disassociate_request(
    device: &FullAddr,
    reason: u8,
    tx_indirect: bool,
    security: &SecSpec,
) -> Result<Message, Ca821xError> {
    let mut p = Vec::new();
    device.write_to(&mut p);
    p.push(reason);
    p.push(u8::from(tx_indirect));
    security.write_to(&mut p);
    frame(MLME_DISASSOCIATE_REQUEST, p)
}

pub fn mlme_get_request(attribute: u8, index: u8) -> Result<Message, Ca821xError> {
    frame(MLME_GET_REQUEST, vec![attribute, index])
}

pub fn mlme_orphan_response(
    orphan_address: [u8; 8],
    short_address: u16,
    associated_member: bool,
    security: &SecSpec,
) -> Result<Message, Ca821xError> {
    let mut p = orphan_address.to_vec();
    p.extend_from_slice(&short_address.to_le_bytes());
    p.push(u8::from(associated_member));
    security.write_to(&mut p);
    frame(MLME_ORPHAN_RESPONSE, p)
}

pub fn mlme_reset_request(set_default_pib: bool) -> Result<Message, Ca821xError> {
    frame(MLME_RESET_REQUEST, vec![u8::from(set_default_pib)])
}

pub fn mlme_rx_enable_request(
    defer_permit: bool,
    rx_on_time: u32,
    rx_on_duration: u32,
) -> Result<Message, Ca821xError> {
    let mut p = vec![u8::from(defer_permit)];
    p.extend_from_slice(&rx_on_time.to_le_bytes());
    p.extend_from_slice(&rx_on_duration.to_le_bytes());
    frame(MLME_RX_ENABLE_REQUEST, p)
}

pub fn mlme_scan_request(
    scan_type: u8,
    scan_channels: u32,
    scan_duration: u8,
    security: &SecSpec,
) -> Result<Message, Ca821xError> {
    let mut p = vec![scan_type];
    p.extend_from_slice(&scan_channels.to_le_bytes());
    p.push(scan_duration);
    security.write_to(&mut p);
    frame(MLME_SCAN_REQUEST, p)
}

pub fn mlme_set_request(attribute: u8, index: u8, value: &[u8]) -> Result<Message, Ca821xError> {
    if value.len() > MAX_ATTRIBUTE_SIZE {
        return Err(Ca821xError::Mac(MacStatus::INVALID_PARAMETER));
    }
    let mut p = vec![attribute, index, value.len() as u8];
    p.extend_from_slice(value);
    frame(MLME_SET_REQUEST, p)
}

/// Parameters of an MLME-START request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StartParams {
    pub pan_id: u16,
    pub channel: u8,
    pub beacon_order: u8,
    pub superframe_order: u8,
    pub pan_coordinator: bool,
    pub battery_life_extension: bool,
    pub coord_realignment: bool,
    pub coord_realign_security: SecSpec,
    pub beacon_security: SecSpec,
}

pub fn mlme_start_request(params: &StartParams) -> Result<Message, Ca821xError> {
    let mut p = params.pan_id.to_le_bytes().to_vec();
    p.extend_from_slice(&[
        params.channel,
        params.beacon_order,
        params.superframe_order,
        u8::from(params.pan_coordinator),
        u8::from(params.battery_life_extension),
        u8::from(params.coord_realignment),
    ]);
    params.coord_realign_security.write_to(&mut p);
    params.beacon_security.write_to(&mut p);
    frame(MLME_START_REQUEST, p)
}

/// MLME-POLL. The CA-8210 carries a polling interval (0.1 s units) that the
/// CA-8211 dropped.
pub fn mlme_poll_request(
    variant: ChipVariant,
    coord: &FullAddr,
    interval: u16,
    security: &SecSpec,
) -> Result<Message, Ca821xError> {
    let mut p = Vec::new();
    coord.write_to(&mut p);
    if variant == ChipVariant::Ca8210 {
        p.extend_from_slice(&interval.to_le_bytes());
    }
    security.write_to(&mut p);
    frame(MLME_POLL_REQUEST, p)
}

pub fn hwme_set_request(attribute: u8, value: &[u8]) -> Result<Message, Ca821xError> {
    if value.len() > MAX_HWME_ATTRIBUTE_SIZE {
        return Err(Ca821xError::InvalidArgs);
    }
    let mut p = vec![attribute, value.len() as u8];
    p.extend_from_slice(value);
    frame(HWME_SET_REQUEST, p)
}

pub fn hwme_get_request(attribute: u8) -> Result<Message, Ca821xError> {
    frame(HWME_GET_REQUEST, vec![attribute])
}

pub fn hwme_haes_request(mode: u8, data: &[u8; 16]) -> Result<Message, Ca821xError> {
    let mut p = vec![mode];
    p.extend_from_slice(data);
    frame(HWME_HAES_REQUEST, p)
}

pub fn tdme_setsfr_request(page: u8, address: u8, value: u8) -> Result<Message, Ca821xError> {
    frame(TDME_SETSFR_REQUEST, vec![page, address, value])
}

pub fn tdme_getsfr_request(page: u8, address: u8) -> Result<Message, Ca821xError> {
    frame(TDME_GETSFR_REQUEST, vec![page, address])
}

pub fn tdme_testmode_request(mode: u8) -> Result<Message, Ca821xError> {
    frame(TDME_TESTMODE_REQUEST, vec![mode])
}

pub fn tdme_set_request(attribute: u8, value: &[u8]) -> Result<Message, Ca821xError> {
    if value.len() > MAX_TDME_ATTRIBUTE_SIZE {
        return Err(Ca821xError::InvalidArgs);
    }
    let mut p = vec![attribute, value.len() as u8];
    p.extend_from_slice(value);
    frame(TDME_SET_REQUEST, p)
}

/// Test packet transmission. `data` is only sent for `TDME_TXD_APPENDED`.
pub fn tdme_txpkt_request(
    data_type: u8,
    sequence_number: u8,
    length: u8,
    data: &[u8],
) -> Result<Message, Ca821xError> {
    let mut p = vec![data_type, sequence_number, length];
    if data_type == TDME_TXD_APPENDED {
        let data = data.get(..usize::from(length)).ok_or(Ca821xError::InvalidArgs)?;
        p.extend_from_slice(data);
    }
    frame(TDME_TXPKT_REQUEST, p)
}

pub fn tdme_lotlk_request(channel: u8, rx_tx: u8) -> Result<Message, Ca821xError> {
    frame(TDME_LOTLK_REQUEST, vec![channel, rx_tx])
}
