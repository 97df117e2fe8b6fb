//! Command codec and typed device API: address and security blocks, request
//! builders, confirm parsers, PIB checks and RF calibration, and the
//! synchronous and asynchronous request methods on [`crate::Ca821x`].

pub mod confirms;
pub mod helpers;
pub mod pib;
pub mod requests;
pub mod scan_filter;
pub mod security;
pub mod sync;

pub use confirms::{PanDescriptor, Primitive, ScanConfirm};
pub use helpers::KeyTableEntry;
pub use requests::StartParams;
pub use security::{FullAddr, MacAddr, SecSpec};
