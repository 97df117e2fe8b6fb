//! # Confirm and Indication Parsers
//!
//! `nom` parsers for the upstream primitives the crate consumes or
//! post-processes. Every layout is fixed-offset little-endian; trailing
//! security blocks are one byte when unsecured.

use nom::bytes::complete::take;
use nom::combinator::{opt, rest};
use nom::multi::count;
use nom::number::complete::{be_u8, le_u16, le_u32};
use nom::IResult;

use crate::api::security::{parse_full_addr, parse_sec_spec, FullAddr, SecSpec};
use crate::config::ChipVariant;
use crate::constants::*;
use crate::error::{Ca821xError, MacStatus};
use crate::transport::frame::Message;

/// A typed upstream primitive with a fixed command id.
pub trait Primitive: Sized {
    const COMMAND_ID: u8;

    fn parse(input: &[u8], variant: ChipVariant) -> IResult<&[u8], Self>;

    /// Decodes `msg`, reporting `SYSTEM_ERROR` when it carries another id.
    fn from_message(msg: &Message, variant: ChipVariant) -> Result<Self, Ca821xError> {
        if msg.command_id() != Self::COMMAND_ID {
            return Err(Ca821xError::Mac(MacStatus::SYSTEM_ERROR));
        }
        Self::parse(msg.payload(), variant)
            .map(|(_, value)| value)
            .map_err(|_| Ca821xError::Invalid)
    }
}

fn status(input: &[u8]) -> IResult<&[u8], MacStatus> {
    let (input, value) = be_u8(input)?;
    Ok((input, MacStatus(value)))
}

fn array<const N: usize>(input: &[u8]) -> IResult<&[u8], [u8; N]> {
    let (input, bytes) = take(N)(input)?;
    let mut out = [0u8; N];
    out.copy_from_slice(bytes);
    Ok((input, out))
}

fn length_prefixed(input: &[u8]) -> IResult<&[u8], Vec<u8>> {
    let (input, len) = be_u8(input)?;
    let (input, value) = take(len)(input)?;
    Ok((input, value.to_vec()))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetConfirm {
    pub status: MacStatus,
    pub attribute: u8,
    pub index: u8,
    pub value: Vec<u8>,
}

impl Primitive for GetConfirm {
    const COMMAND_ID: u8 = MLME_GET_CONFIRM;

    fn parse(input: &[u8], _: ChipVariant) -> IResult<&[u8], Self> {
        let (input, status) = status(input)?;
        let (input, attribute) = be_u8(input)?;
        let (input, index) = be_u8(input)?;
        let (input, value) = length_prefixed(input)?;
        Ok((input, GetConfirm { status, attribute, index, value }))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SetConfirm {
    pub status: MacStatus,
    pub attribute: u8,
    pub index: u8,
}

impl SetConfirm {
    pub fn to_message(&self) -> Message {
        Message::new(MLME_SET_CONFIRM, &[self.status.0, self.attribute, self.index])
            .unwrap_or_default()
    }
}

impl Primitive for SetConfirm {
    const COMMAND_ID: u8 = MLME_SET_CONFIRM;

    fn parse(input: &[u8], _: ChipVariant) -> IResult<&[u8], Self> {
        let (input, status) = status(input)?;
        let (input, attribute) = be_u8(input)?;
        let (input, index) = be_u8(input)?;
        Ok((input, SetConfirm { status, attribute, index }))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PurgeConfirm {
    pub msdu_handle: u8,
    pub status: MacStatus,
}

impl Primitive for PurgeConfirm {
    const COMMAND_ID: u8 = MCPS_PURGE_CONFIRM;

    fn parse(input: &[u8], _: ChipVariant) -> IResult<&[u8], Self> {
        let (input, msdu_handle) = be_u8(input)?;
        let (input, status) = status(input)?;
        Ok((input, PurgeConfirm { msdu_handle, status }))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataConfirm {
    pub msdu_handle: u8,
    pub status: MacStatus,
    pub timestamp: u32,
    /// Frame pending bit of the acknowledgement (CA-8211)
    pub frame_pending: Option<bool>,
}

impl Primitive for DataConfirm {
    const COMMAND_ID: u8 = MCPS_DATA_CONFIRM;

    fn parse(input: &[u8], variant: ChipVariant) -> IResult<&[u8], Self> {
        let (input, msdu_handle) = be_u8(input)?;
        let (input, status) = status(input)?;
        let (input, timestamp) = le_u32(input)?;
        let (input, frame_pending) = match variant {
            ChipVariant::Ca8211 => opt(be_u8)(input)?,
            ChipVariant::Ca8210 => (input, None),
        };
        Ok((
            input,
            DataConfirm {
                msdu_handle,
                status,
                timestamp,
                frame_pending: frame_pending.map(|fp| fp != 0),
            },
        ))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataIndication {
    pub src: FullAddr,
    pub dst: FullAddr,
    pub link_quality: u8,
    pub dsn: u8,
    pub timestamp: u32,
    pub frame_pending: Option<bool>,
    pub msdu: Vec<u8>,
    pub security: SecSpec,
}

impl Primitive for DataIndication {
    const COMMAND_ID: u8 = MCPS_DATA_INDICATION;

    fn parse(input: &[u8], variant: ChipVariant) -> IResult<&[u8], Self> {
        let (input, src) = parse_full_addr(input)?;
        let (input, dst) = parse_full_addr(input)?;
        let (input, msdu_len) = be_u8(input)?;
        let (input, link_quality) = be_u8(input)?;
        let (input, dsn) = be_u8(input)?;
        let (input, timestamp) = le_u32(input)?;
        let (input, frame_pending) = match variant {
            ChipVariant::Ca8211 => {
                let (input, fp) = be_u8(input)?;
                (input, Some(fp != 0))
            }
            ChipVariant::Ca8210 => (input, None),
        };
        let (input, msdu) = take(msdu_len)(input)?;
        let (input, security) = parse_sec_spec(input)?;
        Ok((
            input,
            DataIndication {
                src,
                dst,
                link_quality,
                dsn,
                timestamp,
                frame_pending,
                msdu: msdu.to_vec(),
                security,
            },
        ))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssociateConfirm {
    pub short_address: u16,
    pub status: MacStatus,
    pub security: SecSpec,
}

impl Primitive for AssociateConfirm {
    const COMMAND_ID: u8 = MLME_ASSOCIATE_CONFIRM;

    fn parse(input: &[u8], _: ChipVariant) -> IResult<&[u8], Self> {
        let (input, short_address) = le_u16(input)?;
        let (input, status) = status(input)?;
        let (input, security) = parse_sec_spec(input)?;
        Ok((input, AssociateConfirm { short_address, status, security }))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommStatusIndication {
    pub pan_id: u16,
    pub src: FullAddr,
    pub dst: FullAddr,
    pub status: MacStatus,
    pub security: SecSpec,
}

impl Primitive for CommStatusIndication {
    const COMMAND_ID: u8 = MLME_COMM_STATUS_INDICATION;

    fn parse(input: &[u8], _: ChipVariant) -> IResult<&[u8], Self> {
        let (input, pan_id) = le_u16(input)?;
        let (input, src_mode) = be_u8(input)?;
        let (input, src_addr) = array::<8>(input)?;
        let (input, dst_mode) = be_u8(input)?;
        let (input, dst_addr) = array::<8>(input)?;
        let (input, status) = status(input)?;
        let (input, security) = parse_sec_spec(input)?;
        let addr = |mode, address| FullAddr { mode, pan_id, address };
        Ok((
            input,
            CommStatusIndication {
                pan_id,
                src: addr(src_mode, src_addr),
                dst: addr(dst_mode, dst_addr),
                status,
                security,
            },
        ))
    }
}

/// A network discovered by an active or passive scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PanDescriptor {
    pub coord: FullAddr,
    pub channel: u8,
    pub superframe_spec: u16,
    pub gts_permit: bool,
    pub link_quality: u8,
    pub timestamp: u32,
    pub security_failure: u8,
    pub security: SecSpec,
}

impl PanDescriptor {
    /// Offset of the link quality byte within an encoded descriptor.
    pub const LINK_QUALITY_OFFSET: usize = 15;
    /// Encoded size up to and including the security level byte.
    pub const MIN_LEN: usize = 22;

    /// Encoded size of the descriptor starting at `input[0]`.
    pub fn encoded_len(input: &[u8]) -> Option<usize> {
        let level = *input.get(Self::MIN_LEN - 1)?;
        Some(if level == 0 { Self::MIN_LEN } else { Self::MIN_LEN + 10 })
    }
}

pub fn parse_pan_descriptor(input: &[u8]) -> IResult<&[u8], PanDescriptor> {
    let (input, coord) = parse_full_addr(input)?;
    let (input, channel) = be_u8(input)?;
    let (input, superframe_spec) = le_u16(input)?;
    let (input, gts_permit) = be_u8(input)?;
    let (input, link_quality) = be_u8(input)?;
    let (input, timestamp) = le_u32(input)?;
    let (input, security_failure) = be_u8(input)?;
    let (input, security) = parse_sec_spec(input)?;
    Ok((
        input,
        PanDescriptor {
            coord,
            channel,
            superframe_spec,
            gts_permit: gts_permit != 0,
            link_quality,
            timestamp,
            security_failure,
            security,
        },
    ))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanConfirm {
    pub status: MacStatus,
    pub scan_type: u8,
    pub unscanned_channels: u32,
    pub result_list_size: u8,
    /// Energies for an ED scan, PAN descriptors for active/passive scans
    pub result_list: Vec<u8>,
}

impl ScanConfirm {
    /// Decodes the result list as PAN descriptors.
    pub fn pan_descriptors(&self) -> Result<Vec<PanDescriptor>, Ca821xError> {
        if self.scan_type != ACTIVE_SCAN && self.scan_type != PASSIVE_SCAN {
            return Ok(Vec::new());
        }
        count(parse_pan_descriptor, usize::from(self.result_list_size))(self.result_list.as_slice())
            .map(|(_, list)| list)
            .map_err(|_| Ca821xError::Invalid)
    }
}

impl Primitive for ScanConfirm {
    const COMMAND_ID: u8 = MLME_SCAN_CONFIRM;

    fn parse(input: &[u8], _: ChipVariant) -> IResult<&[u8], Self> {
        let (input, status) = status(input)?;
        let (input, scan_type) = be_u8(input)?;
        let (input, unscanned_channels) = le_u32(input)?;
        let (input, result_list_size) = be_u8(input)?;
        let (input, result_list) = rest(input)?;
        Ok((
            input,
            ScanConfirm {
                status,
                scan_type,
                unscanned_channels,
                result_list_size,
                result_list: result_list.to_vec(),
            },
        ))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HwmeSetConfirm {
    pub status: MacStatus,
    pub attribute: u8,
}

impl Primitive for HwmeSetConfirm {
    const COMMAND_ID: u8 = HWME_SET_CONFIRM;

    fn parse(input: &[u8], _: ChipVariant) -> IResult<&[u8], Self> {
        let (input, status) = status(input)?;
        let (input, attribute) = be_u8(input)?;
        Ok((input, HwmeSetConfirm { status, attribute }))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HwmeGetConfirm {
    pub status: MacStatus,
    pub attribute: u8,
    pub value: Vec<u8>,
}

impl Primitive for HwmeGetConfirm {
    const COMMAND_ID: u8 = HWME_GET_CONFIRM;

    fn parse(input: &[u8], _: ChipVariant) -> IResult<&[u8], Self> {
        let (input, status) = status(input)?;
        let (input, attribute) = be_u8(input)?;
        let (input, value) = length_prefixed(input)?;
        Ok((input, HwmeGetConfirm { status, attribute, value }))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HaesConfirm {
    pub status: MacStatus,
    pub data: [u8; 16],
}

impl Primitive for HaesConfirm {
    const COMMAND_ID: u8 = HWME_HAES_CONFIRM;

    fn parse(input: &[u8], _: ChipVariant) -> IResult<&[u8], Self> {
        let (input, status) = status(input)?;
        let (input, data) = array::<16>(input)?;
        Ok((input, HaesConfirm { status, data }))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SetSfrConfirm {
    pub status: MacStatus,
    pub page: u8,
    pub address: u8,
}

impl Primitive for SetSfrConfirm {
    const COMMAND_ID: u8 = TDME_SETSFR_CONFIRM;

    fn parse(input: &[u8], _: ChipVariant) -> IResult<&[u8], Self> {
        let (input, status) = status(input)?;
        let (input, page) = be_u8(input)?;
        let (input, address) = be_u8(input)?;
        Ok((input, SetSfrConfirm { status, page, address }))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GetSfrConfirm {
    pub status: MacStatus,
    pub page: u8,
    pub address: u8,
    pub value: u8,
}

impl Primitive for GetSfrConfirm {
    const COMMAND_ID: u8 = TDME_GETSFR_CONFIRM;

    fn parse(input: &[u8], _: ChipVariant) -> IResult<&[u8], Self> {
        let (input, status) = status(input)?;
        let (input, page) = be_u8(input)?;
        let (input, address) = be_u8(input)?;
        let (input, value) = be_u8(input)?;
        Ok((input, GetSfrConfirm { status, page, address, value }))
    }
}

/// Status plus one echoed byte; shared by TDME-TESTMODE and TDME-SET confirms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TdmeStatusConfirm<const ID: u8> {
    pub status: MacStatus,
    pub echo: u8,
}

impl<const ID: u8> Primitive for TdmeStatusConfirm<ID> {
    const COMMAND_ID: u8 = ID;

    fn parse(input: &[u8], _: ChipVariant) -> IResult<&[u8], Self> {
        let (input, status) = status(input)?;
        let (input, echo) = be_u8(input)?;
        Ok((input, TdmeStatusConfirm { status, echo }))
    }
}

pub type TestModeConfirm = TdmeStatusConfirm<TDME_TESTMODE_CONFIRM>;
pub type TdmeSetConfirm = TdmeStatusConfirm<TDME_SET_CONFIRM>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxPktConfirm {
    pub status: MacStatus,
    pub sequence_number: u8,
    pub data: Vec<u8>,
}

impl Primitive for TxPktConfirm {
    const COMMAND_ID: u8 = TDME_TXPKT_CONFIRM;

    fn parse(input: &[u8], _: ChipVariant) -> IResult<&[u8], Self> {
        let (input, status) = status(input)?;
        let (input, sequence_number) = be_u8(input)?;
        let (input, data) = length_prefixed(input)?;
        Ok((input, TxPktConfirm { status, sequence_number, data }))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoTlkConfirm {
    pub status: MacStatus,
    pub channel: u8,
    pub rx_tx: u8,
    pub fdac: u8,
    pub amp: u8,
    pub txcal: u8,
}

impl Primitive for LoTlkConfirm {
    const COMMAND_ID: u8 = TDME_LOTLK_CONFIRM;

    fn parse(input: &[u8], _: ChipVariant) -> IResult<&[u8], Self> {
        let (input, status) = status(input)?;
        let (input, [channel, rx_tx, fdac, amp, txcal]) = array::<5>(input)?;
        Ok((
            input,
            LoTlkConfirm { status, channel, rx_tx, fdac, amp, txcal },
        ))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BeaconNotifyIndication {
    pub bsn: u8,
    pub pan_descriptor: PanDescriptor,
    pub pending_short: Vec<u16>,
    pub pending_extended: Vec<[u8; 8]>,
    pub sdu: Vec<u8>,
}

impl Primitive for BeaconNotifyIndication {
    const COMMAND_ID: u8 = MLME_BEACON_NOTIFY_INDICATION;

    fn parse(input: &[u8], _: ChipVariant) -> IResult<&[u8], Self> {
        let (input, bsn) = be_u8(input)?;
        let (input, pan_descriptor) = parse_pan_descriptor(input)?;
        let (input, pend_addr_spec) = be_u8(input)?;
        let short_count = usize::from(pend_addr_spec & 0x03);
        let ext_count = usize::from((pend_addr_spec >> 4) & 0x03);
        let (input, pending_short) = count(le_u16, short_count)(input)?;
        let (input, pending_extended) = count(array::<8>, ext_count)(input)?;
        let (input, sdu) = length_prefixed(input)?;
        Ok((
            input,
            BeaconNotifyIndication {
                bsn,
                pan_descriptor,
                pending_short,
                pending_extended,
                sdu,
            },
        ))
    }
}
