//! # Dispatch Layer
//!
//! `Ca821x` is the per-device context. It owns the SPI link and every piece
//! of state the transport and dispatch layers share: the transmission cache,
//! the errata fix flags, the handler table, the blacklist, the blocking-wait
//! bookkeeping and the addresses the device currently answers to.
//!
//! Outbound requests go through [`Ca821x::send`], which applies the errata
//! checks around the link-level send. Upstream frames are delivered by
//! [`Ca821x::drain`], which the application calls from its main loop and
//! whenever IRQB is asserted.

pub mod cache;
pub mod callbacks;
pub mod dispatcher;
pub mod hotfix;
pub mod wait;

use serde::{Deserialize, Serialize};

use crate::blacklist::Blacklist;
use crate::config::{ChipVariant, TransportConfig};
use crate::error::Ca821xError;
use crate::hal::SpiHal;
use crate::transport::{Link, QueueStats};

pub use cache::{CacheEntry, CacheKind, TxCache};
pub use callbacks::Handler;
pub use hotfix::HotfixState;

use callbacks::CallbackTable;
use wait::WaitState;

/// Reentrancy state of the dispatch loop and the blocking wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DispatchState {
    #[default]
    Idle,
    Draining,
    /// A blocking wait is running; `draining` is set while it drains.
    Waiting { draining: bool },
}

impl DispatchState {
    /// Enters the drain loop, failing with `InvalidState` if already inside it.
    pub fn begin_drain(self) -> Result<DispatchState, Ca821xError> {
        match self {
            DispatchState::Idle => Ok(DispatchState::Draining),
            DispatchState::Waiting { draining: false } => Ok(DispatchState::Waiting { draining: true }),
            _ => Err(Ca821xError::InvalidState),
        }
    }

    pub fn end_drain(self) -> DispatchState {
        match self {
            DispatchState::Waiting { .. } => DispatchState::Waiting { draining: false },
            _ => DispatchState::Idle,
        }
    }
}

/// How the transceiver reports link quality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LqiMode {
    /// Correlation-based
    #[default]
    Cs,
    /// Energy-detect based
    Ed,
}

/// One CA-821x transceiver and its host-side state.
pub struct Ca821x<H: SpiHal> {
    pub(crate) link: Link<H>,
    pub(crate) config: TransportConfig,
    pub(crate) cache: TxCache,
    pub(crate) hotfix: HotfixState,
    pub(crate) state: DispatchState,
    pub(crate) callbacks: CallbackTable<H>,
    pub(crate) blacklist: Blacklist,
    pub(crate) wait: Option<WaitState<H>>,
    pub(crate) short_address: u16,
    pub(crate) ext_address: [u8; 8],
    pub(crate) lqi_mode: LqiMode,
    pub(crate) cache_prev_ms: u32,
}

impl<H: SpiHal> Ca821x<H> {
    pub fn new(hal: H, config: TransportConfig) -> Result<Self, Ca821xError> {
        config.validate()?;
        Ok(Ca821x {
            link: Link::new(hal, &config),
            cache: TxCache::new(config.cache_capacity, config.cache_timeout_ms),
            hotfix: HotfixState::default(),
            state: DispatchState::Idle,
            callbacks: CallbackTable::default(),
            blacklist: Blacklist::new(config.blacklist_capacity),
            wait: None,
            short_address: crate::constants::MAC_BROADCAST_ADDRESS,
            ext_address: [0; 8],
            lqi_mode: LqiMode::default(),
            cache_prev_ms: 0,
            config,
        })
    }

    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    pub fn variant(&self) -> ChipVariant {
        self.config.variant
    }

    pub fn link(&self) -> &Link<H> {
        &self.link
    }

    pub fn link_mut(&mut self) -> &mut Link<H> {
        &mut self.link
    }

    pub fn hal(&self) -> &H {
        self.link.hal()
    }

    pub fn hal_mut(&mut self) -> &mut H {
        self.link.hal_mut()
    }

    pub fn state(&self) -> DispatchState {
        self.state
    }

    pub fn cache(&self) -> &TxCache {
        &self.cache
    }

    pub fn hotfix(&self) -> HotfixState {
        self.hotfix
    }

    pub fn queue_stats(&self) -> QueueStats {
        self.link.queue_stats()
    }

    /// Short address the device answers to; 0xFFFF when unassigned.
    pub fn short_address(&self) -> u16 {
        self.short_address
    }

    pub fn ext_address(&self) -> [u8; 8] {
        self.ext_address
    }

    pub fn lqi_mode(&self) -> LqiMode {
        self.lqi_mode
    }

    pub fn blacklist(&self) -> &Blacklist {
        &self.blacklist
    }

    pub fn blacklist_mut(&mut self) -> &mut Blacklist {
        &mut self.blacklist
    }

    pub fn start_sync_chain(&mut self) -> Result<(), Ca821xError> {
        self.link.start_sync_chain()
    }

    pub fn stop_sync_chain(&mut self) -> Result<(), Ca821xError> {
        self.link.stop_sync_chain()
    }
}
