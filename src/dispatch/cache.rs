//! # Transmission Cache
//!
//! Tracks data requests accepted by the transceiver until their confirm
//! arrives. Direct entries age by wall-clock time; an entry outliving its
//! timeout means the transceiver has stopped confirming and must be recovered.

use log::warn;

use crate::config::ChipVariant;
use crate::constants::*;
use crate::error::{Ca821xError, MacStatus};
use crate::transport::frame::Message;

/// Which data service an entry belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheKind {
    /// PHY-level data request (CA-8211)
    Pcps,
    /// MAC data request
    Mcps,
}

impl CacheKind {
    /// Id of the confirm that closes an entry of this kind.
    pub fn confirm_id(self) -> u8 {
        match self {
            CacheKind::Pcps => PCPS_DATA_CONFIRM,
            CacheKind::Mcps => MCPS_DATA_CONFIRM,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheEntry {
    pub handle: u8,
    pub kind: CacheKind,
    pub indirect: bool,
    pub active: bool,
    /// Remaining time before a direct entry is considered lost, in ms
    pub timeout_ms: u16,
}

impl Default for CacheEntry {
    fn default() -> Self {
        CacheEntry {
            handle: 0,
            kind: CacheKind::Mcps,
            indirect: false,
            active: false,
            timeout_ms: 0,
        }
    }
}

/// Fixed-size table of in-flight data transmissions.
#[derive(Debug, Clone)]
pub struct TxCache {
    entries: Vec<CacheEntry>,
    initial_timeout_ms: u16,
}

impl TxCache {
    pub fn new(capacity: usize, initial_timeout_ms: u16) -> Self {
        TxCache {
            entries: vec![CacheEntry::default(); capacity],
            initial_timeout_ms,
        }
    }

    pub fn capacity(&self) -> usize {
        self.entries.len()
    }

    pub fn active_count(&self) -> usize {
        self.entries.iter().filter(|e| e.active).count()
    }

    pub fn entries(&self) -> impl Iterator<Item = &CacheEntry> {
        self.entries.iter().filter(|e| e.active)
    }

    /// Records a transmission the transceiver accepted.
    pub fn record(&mut self, handle: u8, kind: CacheKind, indirect: bool) -> Result<(), Ca821xError> {
        let slot = self
            .entries
            .iter_mut()
            .find(|e| !e.active)
            .ok_or(Ca821xError::NoBuffer)?;
        *slot = CacheEntry {
            handle,
            kind,
            indirect,
            active: true,
            timeout_ms: self.initial_timeout_ms,
        };
        Ok(())
    }

    /// Closes the entry for `handle` of the given kind.
    pub fn remove(&mut self, handle: u8, kind: CacheKind) -> Result<(), Ca821xError> {
        let entry = self
            .entries
            .iter_mut()
            .find(|e| e.active && e.handle == handle && e.kind == kind)
            .ok_or(Ca821xError::NotFound)?;
        entry.active = false;
        Ok(())
    }

    pub fn has_active_indirect(&self) -> bool {
        self.entries.iter().any(|e| e.active && e.indirect)
    }

    /// Ages every active direct entry by `elapsed_ms`.
    ///
    /// Stops at the first entry that would expire and returns `Timeout`;
    /// entries before it have already been aged.
    pub fn decay(&mut self, elapsed_ms: u32) -> Result<(), Ca821xError> {
        for entry in self.entries.iter_mut().filter(|e| e.active && !e.indirect) {
            if elapsed_ms > u32::from(entry.timeout_ms) {
                warn!("Data request 0x{:02X} unconfirmed past its timeout", entry.handle);
                return Err(Ca821xError::Timeout);
            }
            entry.timeout_ms -= elapsed_ms as u16;
        }
        Ok(())
    }

    /// Deactivates every entry.
    ///
    /// With `generate_confirms`, returns a `SYSTEM_ERROR` data confirm for each
    /// entry that was active, in table order, for the caller to dispatch.
    pub fn purge(&mut self, generate_confirms: bool, variant: ChipVariant) -> Vec<Message> {
        let mut confirms = Vec::new();
        for entry in self.entries.iter_mut() {
            if entry.active && generate_confirms {
                confirms.push(failure_confirm(entry, variant));
            }
            entry.active = false;
        }
        confirms
    }
}

/// Data confirm reporting a transmission lost by the transceiver.
fn failure_confirm(entry: &CacheEntry, variant: ChipVariant) -> Message {
    let mut params = [0u8; 7];
    params[0] = entry.handle;
    params[1] = MacStatus::SYSTEM_ERROR.0;
    let len = usize::from(variant.data_confirm_len());
    Message::new(entry.kind.confirm_id(), &params[..len]).unwrap_or_default()
}
