//! Host-side helpers for running the transport on a full operating system.

pub mod rendezvous;

pub use rendezvous::{Rendezvous, Turn};
