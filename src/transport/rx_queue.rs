//! # Receive Queue
//!
//! Bounded ring of asynchronous frames read from the transceiver. The frame
//! router is the single producer and may run from the IRQB handler, so every
//! pointer update happens inside a `critical_section`; the dispatch loop is the
//! single consumer.
//!
//! `start == end` is ambiguous between empty and full, so a separate `full`
//! flag disambiguates. Callers only ever use the empty, full and almost-full
//! predicates.

use serde::{Deserialize, Serialize};

use crate::error::Ca821xError;
use crate::transport::frame::Message;

/// Fill level statistics for the receive queue
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStats {
    /// Frames currently queued
    pub water_mark: usize,
    /// Worst fill level seen
    pub high_water_mark: usize,
    /// Frames dropped because no slot was free
    pub dropped: u64,
}

#[derive(Debug)]
pub struct RxQueue {
    slots: Vec<Message>,
    start: usize,
    end: usize,
    full: bool,
    reserved: usize,
    stats: QueueStats,
}

impl RxQueue {
    /// Creates a queue of `capacity` slots, `reserved` of which are kept for
    /// synchronous traffic by `is_almost_full`.
    pub fn new(capacity: usize, reserved: usize) -> Self {
        let capacity = capacity.max(1);
        RxQueue {
            slots: vec![Message::idle(); capacity],
            start: 0,
            end: 0,
            full: false,
            reserved: reserved.min(capacity - 1),
            stats: QueueStats::default(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end && !self.full
    }

    pub fn is_full(&self) -> bool {
        self.full
    }

    /// True when fewer than the reserved number of slots remain free.
    ///
    /// While a synchronous reply is outstanding the reserve is released for it,
    /// so only a completely full queue counts.
    pub fn is_almost_full(&self, sync_pending: bool) -> bool {
        if sync_pending || self.full {
            return self.full;
        }
        let capacity = self.capacity();
        (1..=self.reserved).any(|i| self.start == (self.end + i) % capacity)
    }

    pub fn len(&self) -> usize {
        if self.full {
            self.capacity()
        } else {
            (self.end + self.capacity() - self.start) % self.capacity()
        }
    }

    pub fn stats(&self) -> QueueStats {
        self.stats
    }

    /// Claims the next free slot for an incoming frame.
    pub(crate) fn reserve(&mut self) -> Option<usize> {
        critical_section::with(|_| {
            if self.full {
                self.stats.dropped += 1;
                return None;
            }
            let index = self.end;
            self.end = (self.end + 1) % self.capacity();
            if self.start == self.end {
                self.full = true;
            }
            self.stats.water_mark += 1;
            if self.stats.water_mark > self.stats.high_water_mark {
                self.stats.high_water_mark = self.stats.water_mark;
            }
            Some(index)
        })
    }

    pub(crate) fn slot_mut(&mut self, index: usize) -> &mut Message {
        &mut self.slots[index]
    }

    /// Copies a complete frame into the next free slot.
    pub fn enqueue(&mut self, msg: &Message) -> Result<(), Ca821xError> {
        let index = self.reserve().ok_or(Ca821xError::NoBuffer)?;
        self.slots[index] = msg.clone();
        Ok(())
    }

    /// Oldest queued frame, left in place.
    pub fn peek(&self) -> Option<&Message> {
        if self.is_empty() {
            None
        } else {
            Some(&self.slots[self.start])
        }
    }

    /// Removes and returns the oldest queued frame.
    pub fn dequeue(&mut self) -> Option<Message> {
        if self.is_empty() {
            return None;
        }
        critical_section::with(|_| {
            let msg = std::mem::take(&mut self.slots[self.start]);
            self.start = (self.start + 1) % self.capacity();
            self.full = false;
            self.stats.water_mark = self.stats.water_mark.saturating_sub(1);
            Some(msg)
        })
    }
}
