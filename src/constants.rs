//! CA-821x Protocol Constants
//!
//! This module defines the command identifiers, flag masks, PIB attribute
//! identifiers and size limits used on the CA-821x SPI link, based on the
//! IEEE 802.15.4-2006 MAC/PHY service primitives.

// ----------------------------------------------------------------------------
// SPI command id masks and control bytes
// ----------------------------------------------------------------------------

/// Mask to derive the message kind from a command id
pub const SPI_MID_MASK: u8 = 0x1F;

/// Present on the link when the stream is idle
pub const SPI_IDLE: u8 = 0xFF;

/// Present on the link when the CA-8210 is busy and the request must be resent
pub const SPI_NACK: u8 = 0xF0;

// ----------------------------------------------------------------------------
// MCPS / PCPS
// ----------------------------------------------------------------------------

pub const MCPS_DATA_REQUEST: u8 = 0x00;
pub const MCPS_PURGE_REQUEST: u8 = 0x41;
pub const MCPS_DATA_INDICATION: u8 = 0x20;
pub const MCPS_DATA_CONFIRM: u8 = 0x21;
pub const MCPS_PURGE_CONFIRM: u8 = 0x62;

/// PHY-level data request (CA-8211 only)
pub const PCPS_DATA_REQUEST: u8 = 0x07;
pub const PCPS_DATA_CONFIRM: u8 = 0x38;
pub const PCPS_DATA_INDICATION: u8 = 0x28;

// ----------------------------------------------------------------------------
// MLME
// ----------------------------------------------------------------------------

pub const MLME_ASSOCIATE_REQUEST: u8 = 0x02;
pub const MLME_ASSOCIATE_RESPONSE: u8 = 0x03;
pub const MLME_DISASSOCIATE_REQUEST: u8 = 0x04;
pub const MLME_GET_REQUEST: u8 = 0x45;
pub const MLME_ORPHAN_RESPONSE: u8 = 0x06;
pub const MLME_RESET_REQUEST: u8 = 0x47;
pub const MLME_RX_ENABLE_REQUEST: u8 = 0x48;
pub const MLME_SCAN_REQUEST: u8 = 0x09;
pub const MLME_SET_REQUEST: u8 = 0x4A;
pub const MLME_START_REQUEST: u8 = 0x4B;
pub const MLME_SYNC_REQUEST: u8 = 0x0C;
pub const MLME_POLL_REQUEST: u8 = 0x4D;
pub const MLME_ASSOCIATE_INDICATION: u8 = 0x23;
pub const MLME_ASSOCIATE_CONFIRM: u8 = 0x24;
pub const MLME_DISASSOCIATE_INDICATION: u8 = 0x25;
pub const MLME_DISASSOCIATE_CONFIRM: u8 = 0x26;
pub const MLME_BEACON_NOTIFY_INDICATION: u8 = 0x27;
pub const MLME_GET_CONFIRM: u8 = 0x68;
pub const MLME_ORPHAN_INDICATION: u8 = 0x29;
pub const MLME_RESET_CONFIRM: u8 = 0x6A;
pub const MLME_RX_ENABLE_CONFIRM: u8 = 0x6B;
pub const MLME_SCAN_CONFIRM: u8 = 0x2C;
pub const MLME_COMM_STATUS_INDICATION: u8 = 0x2D;
pub const MLME_SET_CONFIRM: u8 = 0x6E;
pub const MLME_START_CONFIRM: u8 = 0x6F;
pub const MLME_SYNC_LOSS_INDICATION: u8 = 0x30;
pub const MLME_POLL_CONFIRM: u8 = 0x71;
pub const MLME_POLL_INDICATION: u8 = 0x31;

// ----------------------------------------------------------------------------
// HWME / TDME
// ----------------------------------------------------------------------------

pub const HWME_SET_REQUEST: u8 = 0x4E;
pub const HWME_GET_REQUEST: u8 = 0x4F;
pub const HWME_HAES_REQUEST: u8 = 0x50;
pub const HWME_SET_CONFIRM: u8 = 0x72;
pub const HWME_GET_CONFIRM: u8 = 0x73;
pub const HWME_HAES_CONFIRM: u8 = 0x74;
pub const HWME_WAKEUP_INDICATION: u8 = 0x35;

pub const TDME_SETSFR_REQUEST: u8 = 0x51;
pub const TDME_GETSFR_REQUEST: u8 = 0x52;
pub const TDME_TESTMODE_REQUEST: u8 = 0x53;
pub const TDME_SET_REQUEST: u8 = 0x54;
pub const TDME_TXPKT_REQUEST: u8 = 0x55;
pub const TDME_LOTLK_REQUEST: u8 = 0x56;
pub const TDME_SETSFR_CONFIRM: u8 = 0x77;
pub const TDME_GETSFR_CONFIRM: u8 = 0x78;
pub const TDME_TESTMODE_CONFIRM: u8 = 0x79;
pub const TDME_SET_CONFIRM: u8 = 0x7A;
pub const TDME_TXPKT_CONFIRM: u8 = 0x7B;
pub const TDME_RXPKT_INDICATION: u8 = 0x3C;
pub const TDME_EDDET_INDICATION: u8 = 0x3D;
pub const TDME_ERROR_INDICATION: u8 = 0x3E;
pub const TDME_LOTLK_CONFIRM: u8 = 0x7F;

/// Upstream command ids that may be routed to a registered handler
pub const UPSTREAM_IDS: [u8; 31] = [
    MCPS_DATA_INDICATION,
    MCPS_DATA_CONFIRM,
    PCPS_DATA_INDICATION,
    PCPS_DATA_CONFIRM,
    MLME_ASSOCIATE_INDICATION,
    MLME_ASSOCIATE_CONFIRM,
    MLME_DISASSOCIATE_INDICATION,
    MLME_DISASSOCIATE_CONFIRM,
    MLME_BEACON_NOTIFY_INDICATION,
    MLME_ORPHAN_INDICATION,
    MLME_SCAN_CONFIRM,
    MLME_COMM_STATUS_INDICATION,
    MLME_SYNC_LOSS_INDICATION,
    MLME_POLL_INDICATION,
    MLME_GET_CONFIRM,
    MLME_SET_CONFIRM,
    MLME_RESET_CONFIRM,
    MLME_RX_ENABLE_CONFIRM,
    MLME_START_CONFIRM,
    MLME_POLL_CONFIRM,
    MCPS_PURGE_CONFIRM,
    HWME_WAKEUP_INDICATION,
    HWME_SET_CONFIRM,
    HWME_GET_CONFIRM,
    HWME_HAES_CONFIRM,
    TDME_RXPKT_INDICATION,
    TDME_EDDET_INDICATION,
    TDME_ERROR_INDICATION,
    TDME_SETSFR_CONFIRM,
    TDME_GETSFR_CONFIRM,
    TDME_LOTLK_CONFIRM,
];

// ----------------------------------------------------------------------------
// Sizes
// ----------------------------------------------------------------------------

/// Largest payload carried by a single wire frame (the length byte is a u8)
pub const MAX_PAYLOAD_LEN: usize = 255;

pub const A_MAX_PHY_PACKET_SIZE: usize = 127;
pub const MAX_DATA_SIZE: usize = 121;
pub const MAX_ATTRIBUTE_SIZE: usize = 250;
pub const MAX_HWME_ATTRIBUTE_SIZE: usize = 16;
pub const MAX_TDME_ATTRIBUTE_SIZE: usize = 2;

/// Beacon payload must fit a maximal PHY packet together with the beacon header
pub const A_MAX_BEACON_PAYLOAD_LENGTH: usize = A_MAX_PHY_PACKET_SIZE - 75;

// ----------------------------------------------------------------------------
// PIB attribute identifiers
// ----------------------------------------------------------------------------

pub const PHY_CURRENT_CHANNEL: u8 = 0x00;
pub const PHY_CHANNELS_SUPPORTED: u8 = 0x01;
pub const PHY_TRANSMIT_POWER: u8 = 0x02;
pub const PHY_CCA_MODE: u8 = 0x03;
pub const PHY_CURRENT_PAGE: u8 = 0x04;

pub const MAC_ACK_WAIT_DURATION: u8 = 0x40;
pub const MAC_ASSOCIATION_PERMIT: u8 = 0x41;
pub const MAC_AUTO_REQUEST: u8 = 0x42;
pub const MAC_BATT_LIFE_EXT: u8 = 0x43;
pub const MAC_BATT_LIFE_EXT_PERIODS: u8 = 0x44;
pub const MAC_BEACON_PAYLOAD: u8 = 0x45;
pub const MAC_BEACON_PAYLOAD_LENGTH: u8 = 0x46;
pub const MAC_BEACON_ORDER: u8 = 0x47;
pub const MAC_GTS_PERMIT: u8 = 0x4D;
pub const MAC_MAX_CSMA_BACKOFFS: u8 = 0x4E;
pub const MAC_MIN_BE: u8 = 0x4F;
pub const MAC_PAN_ID: u8 = 0x50;
pub const MAC_PROMISCUOUS_MODE: u8 = 0x51;
pub const MAC_RX_ON_WHEN_IDLE: u8 = 0x52;
pub const MAC_SHORT_ADDRESS: u8 = 0x53;
pub const MAC_SUPERFRAME_ORDER: u8 = 0x54;
pub const MAC_ASSOCIATED_PAN_COORD: u8 = 0x56;
pub const MAC_MAX_BE: u8 = 0x57;
pub const MAC_MAX_FRAME_RETRIES: u8 = 0x59;
pub const MAC_RESPONSE_WAIT_TIME: u8 = 0x5A;
pub const MAC_SECURITY_ENABLED: u8 = 0x5D;
pub const MAC_AUTO_REQUEST_SECURITY_LEVEL: u8 = 0x78;
pub const MAC_AUTO_REQUEST_KEY_ID_MODE: u8 = 0x79;
pub const NS_IEEE_ADDRESS: u8 = 0xFF;

// HWME attributes
pub const HWME_LQI_MODE: u8 = 0x10;
pub const HWME_LQI_LIMIT: u8 = 0x11;

/// Values of `HWME_LQI_MODE`
pub const HWME_LQIMODE_CS: u8 = 0x00;
pub const HWME_LQIMODE_ED: u8 = 0x01;

// TDME attributes
pub const TDME_CHANNEL: u8 = 0x00;

// ----------------------------------------------------------------------------
// MAC status, address modes and options
// ----------------------------------------------------------------------------

pub const MAC_MODE_NO_ADDR: u8 = 0x00;
pub const MAC_MODE_SHORT_ADDR: u8 = 0x02;
pub const MAC_MODE_LONG_ADDR: u8 = 0x03;

pub const MAC_BROADCAST_ADDRESS: u16 = 0xFFFF;

pub const ED_SCAN: u8 = 0x00;
pub const ACTIVE_SCAN: u8 = 0x01;
pub const PASSIVE_SCAN: u8 = 0x02;
pub const ORPHAN_SCAN: u8 = 0x03;

/// Default LQI acceptance threshold for discovered PAN descriptors
pub const API_LQI_LIMIT: u8 = 75;
