//! # Blacklist Filter
//!
//! Bounded set of peer addresses whose indications are dropped before they
//! reach a handler. Only inbound filtering is affected; acknowledgements are
//! still sent by the transceiver.

use log::debug;

use crate::api::security::MacAddr;
use crate::error::Ca821xError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blacklist {
    entries: Vec<MacAddr>,
    capacity: usize,
}

impl Blacklist {
    pub fn new(capacity: usize) -> Self {
        Blacklist {
            entries: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Adds an address; adding one already present is a no-op.
    pub fn add(&mut self, addr: MacAddr) -> Result<(), Ca821xError> {
        if self.contains(&addr) {
            return Ok(());
        }
        if self.entries.len() >= self.capacity {
            return Err(Ca821xError::NoBuffer);
        }
        debug!("Blacklisting {addr}");
        self.entries.push(addr);
        Ok(())
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn contains(&self, addr: &MacAddr) -> bool {
        self.entries.contains(addr)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_and_extended_are_distinct() {
        let mut list = Blacklist::new(4);
        list.add(MacAddr::Short(0x0001)).unwrap();
        assert!(list.contains(&MacAddr::Short(0x0001)));
        assert!(!list.contains(&MacAddr::Extended([0x01, 0, 0, 0, 0, 0, 0, 0])));
    }

    #[test]
    fn test_full_and_clear() {
        let mut list = Blacklist::new(2);
        list.add(MacAddr::Short(1)).unwrap();
        list.add(MacAddr::Short(1)).unwrap();
        list.add(MacAddr::Short(2)).unwrap();
        assert_eq!(list.add(MacAddr::Short(3)), Err(Ca821xError::NoBuffer));
        list.clear();
        assert!(list.is_empty());
        list.add(MacAddr::Short(3)).unwrap();
    }
}
