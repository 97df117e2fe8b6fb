//! # PIB Validation and RF Calibration
//!
//! Range checks for PIB attributes the MAC firmware accepts unchecked, the
//! transmit power mapping onto the PA bias registers, the per-channel LO
//! transmit calibration and the register defaults written at chip init.

use log::{debug, info};

use crate::config::ChipVariant;
use crate::constants::*;
use crate::dispatch::Ca821x;
use crate::error::{Ca821xError, MacStatus};
use crate::hal::SpiHal;

/// SFR holding the PA current bias (page 0).
pub const SFR_PACFGIB: (u8, u8) = (0, 0xFE);
/// SFR holding the PA configuration on multi-project-wafer parts (page 0).
pub const SFR_PACFG: (u8, u8) = (0, 0xB1);
/// SFR holding the LO transmit calibration (page 1).
pub const SFR_LOTXCAL: (u8, u8) = (1, 0xBF);

/// LNA gain, preamble timing/threshold and the 8 dBm TX power default.
const CHIP_INIT_SFRS: [(u8, u8, u8); 11] = [
    (1, 0xE1, 0x29),
    (1, 0xE2, 0x54),
    (1, 0xE3, 0x6C),
    (1, 0xE4, 0x7A),
    (1, 0xE5, 0x84),
    (1, 0xE6, 0x8B),
    (1, 0xE7, 0x92),
    (1, 0xE9, 0x96),
    (1, 0xD3, 0x5B),
    (1, 0xD1, 0x5A),
    (0, 0xFE, 0x3F),
];

/// Validates attribute values the transceiver does not range-check itself.
///
/// Attributes without a constraint always pass.
pub fn check_pib_attribute(attribute: u8, value: &[u8]) -> Result<(), Ca821xError> {
    let v = value.first().copied().unwrap_or(0);
    let valid = match attribute {
        PHY_TRANSMIT_POWER => v <= 0x3F,
        PHY_CCA_MODE => v <= 0x03,
        MAC_BATT_LIFE_EXT_PERIODS => (6..=41).contains(&v),
        MAC_BEACON_PAYLOAD => value.len() <= A_MAX_BEACON_PAYLOAD_LENGTH,
        MAC_BEACON_PAYLOAD_LENGTH => usize::from(v) <= A_MAX_BEACON_PAYLOAD_LENGTH,
        MAC_BEACON_ORDER | MAC_SUPERFRAME_ORDER => v <= 15,
        MAC_MAX_BE => (3..=8).contains(&v),
        MAC_MAX_CSMA_BACKOFFS => v <= 5,
        MAC_MAX_FRAME_RETRIES => v <= 7,
        MAC_MIN_BE => v <= 8,
        MAC_RESPONSE_WAIT_TIME => (2..=64).contains(&v),
        MAC_ASSOCIATED_PAN_COORD
        | MAC_ASSOCIATION_PERMIT
        | MAC_AUTO_REQUEST
        | MAC_BATT_LIFE_EXT
        | MAC_GTS_PERMIT
        | MAC_PROMISCUOUS_MODE
        | MAC_RX_ON_WHEN_IDLE
        | MAC_SECURITY_ENABLED => v <= 1,
        MAC_AUTO_REQUEST_SECURITY_LEVEL => v <= 7,
        MAC_AUTO_REQUEST_KEY_ID_MODE => v <= 3,
        _ => true,
    };
    if valid {
        Ok(())
    } else {
        debug!("PIB 0x{attribute:02X} value 0x{v:02X} out of range");
        Err(Ca821xError::Mac(MacStatus::INVALID_PARAMETER))
    }
}

/// Sign-extends a 6-bit 802.15.4 transmit power to dBm.
pub fn tx_power_dbm(txp: u8) -> i8 {
    let mut ext = txp & 0x3F;
    if ext & 0x20 != 0 {
        ext |= 0xC0;
    }
    ext as i8
}

/// PA current bias for a requested power in dBm.
pub fn pa_bias_for_power(dbm: i8) -> u8 {
    match dbm {
        i8::MIN..=-1 => 0x00,
        0 => 0x01,
        1 => 0x03,
        2 => 0x05,
        3 => 0x08,
        4 => 0x0C,
        5 => 0x10,
        6 => 0x18,
        7 => 0x22,
        8 => 0x32,
        _ => 0x3F,
    }
}

/// Power in dBm a PA current bias setting yields.
pub fn power_for_pa_bias(paib: u8) -> i8 {
    match paib {
        0x32.. => 8,
        0x22.. => 7,
        0x18.. => 6,
        0x10.. => 5,
        0x0C.. => 4,
        0x08.. => 3,
        0x05.. => 2,
        0x03.. => 1,
        0x01.. => 0,
        0 => -1,
    }
}

/// LO transmit calibration value for an 802.15.4 channel.
pub fn txcal_for_channel(channel: u8) -> u8 {
    match channel {
        25.. => 0xA7,
        23..=24 => 0xA8,
        22 => 0xA9,
        20..=21 => 0xAA,
        17..=19 => 0xAB,
        16 => 0xAC,
        14..=15 => 0xAD,
        12..=13 => 0xAE,
        _ => 0xAF,
    }
}

impl<H: SpiHal> Ca821x<H> {
    /// Writes the LO transmit calibration for `channel`.
    pub fn channel_init(&mut self, channel: u8) -> Result<(), Ca821xError> {
        let (page, addr) = SFR_LOTXCAL;
        self.tdme_setsfr_request_sync(page, addr, txcal_for_channel(channel))
    }

    /// Sets the transmit power from a 6-bit two's complement dBm value.
    pub fn set_tx_power(&mut self, txp: u8) -> Result<(), Ca821xError> {
        let dbm = tx_power_dbm(txp);
        if self.config.multi_project_wafer {
            // ptrim/itrim presets for +4 dBm and -6 dBm
            let pacfg = if dbm > 0 { 0xD3 } else { 0x73 };
            let (page, addr) = SFR_PACFG;
            return self.tdme_setsfr_request_sync(page, addr, pacfg);
        }
        let (page, addr) = SFR_PACFGIB;
        self.tdme_setsfr_request_sync(page, addr, pa_bias_for_power(dbm))
    }

    /// Reads back the transmit power as a 6-bit two's complement dBm value.
    ///
    /// Multi-project-wafer parts also report a ±3 dB tolerance in bits 7-6.
    pub fn get_tx_power(&mut self) -> Result<u8, Ca821xError> {
        if self.config.multi_project_wafer {
            let (page, addr) = SFR_PACFG;
            let pacfg = self.tdme_getsfr_request_sync(page, addr)?;
            let dbm: i8 = if pacfg & 0x80 != 0 { 4 } else { -6 };
            return Ok(((dbm as u8) & 0x3F) | 0x40);
        }
        let (page, addr) = SFR_PACFGIB;
        let paib = self.tdme_getsfr_request_sync(page, addr)?;
        Ok((power_for_pa_bias(paib) as u8) & 0x3F)
    }

    /// Writes the register defaults the transceiver needs after power-up.
    pub fn tdme_chip_init(&mut self) -> Result<(), Ca821xError> {
        for (page, addr, value) in CHIP_INIT_SFRS {
            self.tdme_setsfr_request_sync(page, addr, value)?;
        }
        if self.variant() == ChipVariant::Ca8210 {
            // LQI-based frame filtering off
            self.hwme_set_request_sync(HWME_LQI_LIMIT, &[0])?;
        }
        info!("Chip init complete");
        Ok(())
    }
}
