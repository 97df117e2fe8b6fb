//! SPI transport: wire frames, the receive queue, the synchronous reply slot,
//! the frame router and the byte exchanger that ties them together.

pub mod exchange;
pub mod frame;
pub mod router;
pub mod rx_queue;
pub mod sync;

pub use exchange::{ExchangeReport, Link, LinkTiming};
pub use frame::{sync_response_id, CommandFlags, Message, TxOptions};
pub use router::RxDestination;
pub use rx_queue::{QueueStats, RxQueue};
pub use sync::{SyncChain, SyncSlot, SYNC_CHAIN_FILLER};
