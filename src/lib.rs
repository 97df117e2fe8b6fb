//! # ca821x-core - SPI Transport and Dispatch for CA-821x Transceivers
//!
//! The ca821x-core crate drives Cascoda CA-8210 and CA-8211 IEEE 802.15.4
//! transceivers over SPI from the host side. The transceiver runs the MAC;
//! this crate moves command frames across the link, matches synchronous
//! requests to their confirms, queues asynchronous indications and delivers
//! them to application handlers in arrival order.
//!
//! ## Features
//!
//! - Full-duplex frame exchange with slave-ready polling (CA-8211) or the
//!   fixed hold, NACK retry and misalignment correction of the CA-8210
//! - Bounded interrupt-safe receive queue with a reserved headroom
//! - Synchronous request/confirm matching and the sync chain used around
//!   low-power transitions
//! - Transmission cache that notices a transceiver that stopped confirming
//!   data requests, and recovers it
//! - Host-side workarounds for transceiver errata and PIB range checks
//! - Per-kind handler table, blocking wait with handler override, blacklist
//! - Typed request builders, confirm parsers and synchronous helpers
//!
//! ## Usage
//!
//! ```toml
//! [dependencies]
//! ca821x-core = "0.1.0"
//! ```
//!
//! ```rust
//! use ca821x_core::{Ca821x, MockTransceiver, TransportConfig, MAC_PAN_ID};
//!
//! let mut dev = Ca821x::new(MockTransceiver::with_chip_model(), TransportConfig::default())?;
//! dev.mlme_set_request_sync(MAC_PAN_ID, 0, &[0x34, 0x12])?;
//! assert_eq!(dev.mlme_get_request_sync(MAC_PAN_ID, 0)?, vec![0x34, 0x12]);
//! dev.drain()?;
//! # Ok::<(), ca821x_core::Ca821xError>(())
//! ```

pub mod api;
pub mod blacklist;
pub mod config;
pub mod constants;
pub mod dispatch;
pub mod error;
pub mod hal;
pub mod host;
pub mod logging;
pub mod transport;

pub use crate::error::{Ca821xError, MacStatus};
pub use crate::logging::{init_logger, log_frame};

// Device context and dispatch
pub use config::{ChipVariant, TransportConfig};
pub use dispatch::{Ca821x, DispatchState, Handler, LqiMode};

// Link layer
pub use hal::{HalError, MockTransceiver, SpiHal};
pub use transport::{Link, Message, QueueStats, TxOptions};

// Command codec
pub use api::{FullAddr, MacAddr, Primitive, SecSpec, StartParams};
pub use blacklist::Blacklist;
pub use constants::*;
pub use host::Rendezvous;
