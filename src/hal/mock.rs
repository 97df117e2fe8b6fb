//! Mock CA-821x transceiver for testing
//!
//! This module provides a scripted transceiver that speaks the SPI framing
//! byte by byte, so the transport can be exercised without hardware. Time is
//! virtual: delays advance a microsecond counter, so timeouts elapse instantly.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::constants::*;
use crate::hal::{HalError, SpiHal};

/// Builds the frames the mock sends back for one frame it received.
pub type Responder = Box<dyn FnMut(&[u8]) -> Vec<Vec<u8>> + Send>;

/// Shared state behind a `MockTransceiver`.
struct MockState {
    now_us: u64,
    selected: bool,
    mosi: Vec<u8>,
    miso: VecDeque<u8>,
    nacking: bool,
    upstream: VecDeque<Vec<u8>>,
    received: Vec<Vec<u8>>,
    responders: Vec<Responder>,
    nack_headers: u32,
    misalign_next: u32,
    irq_high_until_us: Option<u64>,
    transactions: u32,
    /// Byte exchanges left before one fails
    fail_after: Option<u32>,
    pib: HashMap<u8, Vec<u8>>,
    hwme: HashMap<u8, Vec<u8>>,
    sfr: HashMap<(u8, u8), u8>,
    chip_model: bool,
}

/// Mock transceiver that simulates the CA-821x side of the SPI link
#[derive(Clone)]
pub struct MockTransceiver {
    state: Arc<Mutex<MockState>>,
}

impl Default for MockTransceiver {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTransceiver {
    /// A transceiver that only replays frames queued with `push_upstream`.
    pub fn new() -> Self {
        MockTransceiver {
            state: Arc::new(Mutex::new(MockState {
                now_us: 0,
                selected: false,
                mosi: Vec::new(),
                miso: VecDeque::new(),
                nacking: false,
                upstream: VecDeque::new(),
                received: Vec::new(),
                responders: Vec::new(),
                nack_headers: 0,
                misalign_next: 0,
                irq_high_until_us: None,
                transactions: 0,
                fail_after: None,
                pib: HashMap::new(),
                hwme: HashMap::new(),
                sfr: HashMap::new(),
                chip_model: false,
            })),
        }
    }

    /// A transceiver that answers every synchronous request with a successful
    /// confirm and keeps a simple PIB, HWME attribute and SFR store.
    pub fn with_chip_model() -> Self {
        let mock = Self::new();
        mock.lock().chip_model = true;
        mock
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Queue a frame (`[id, len, payload..]`) for the host to read.
    pub fn push_upstream(&self, frame: &[u8]) {
        self.lock().upstream.push_back(frame.to_vec());
    }

    /// Frames waiting to be read by the host.
    pub fn pending_upstream(&self) -> usize {
        self.lock().upstream.len()
    }

    /// Add a responder consulted for every complete frame the host sends.
    pub fn on_frame<F>(&self, responder: F)
    where
        F: FnMut(&[u8]) -> Vec<Vec<u8>> + Send + 'static,
    {
        self.lock().responders.push(Box::new(responder));
    }

    /// Complete frames the host has sent, in order.
    pub fn received(&self) -> Vec<Vec<u8>> {
        self.lock().received.clone()
    }

    /// Command ids of the frames the host has sent, in order.
    pub fn received_ids(&self) -> Vec<u8> {
        self.lock().received.iter().map(|f| f[0]).collect()
    }

    pub fn clear_received(&self) {
        self.lock().received.clear();
    }

    /// NACK the next `count` frame headers (CA-8210 behaviour).
    pub fn nack_next_headers(&self, count: u32) {
        self.lock().nack_headers = count;
    }

    /// Prefix the next `count` upstream transfers with one junk byte.
    pub fn misalign_next_transfers(&self, count: u32) {
        self.lock().misalign_next = count;
    }

    /// Hold IRQB high (not ready) for the given number of microseconds.
    pub fn hold_irq_high_for_us(&self, us: u64) {
        let mut state = self.lock();
        state.irq_high_until_us = Some(state.now_us.saturating_add(us));
    }

    /// Hold IRQB high until `release_irq` is called.
    pub fn hold_irq_high(&self) {
        self.lock().irq_high_until_us = Some(u64::MAX);
    }

    pub fn release_irq(&self) {
        self.lock().irq_high_until_us = None;
    }

    /// Make the next byte exchange fail with `HalError::Spi`.
    pub fn fail_next_exchange(&self) {
        self.fail_exchange_after(0);
    }

    /// Let `bytes` more byte exchanges through, then fail one with `HalError::Spi`.
    pub fn fail_exchange_after(&self, bytes: u32) {
        self.lock().fail_after = Some(bytes);
    }

    /// Number of select assert/deassert cycles seen so far.
    pub fn transactions(&self) -> u32 {
        self.lock().transactions
    }

    /// Advance the virtual clock.
    pub fn advance_ms(&self, ms: u64) {
        self.lock().now_us += ms * 1000;
    }

    pub fn now_us(&self) -> u64 {
        self.lock().now_us
    }

    /// Value last written to an SFR through TDME-SETSFR.
    pub fn sfr(&self, page: u8, addr: u8) -> Option<u8> {
        self.lock().sfr.get(&(page, addr)).copied()
    }

    /// Preload an SFR value returned by TDME-GETSFR.
    pub fn set_sfr(&self, page: u8, addr: u8, value: u8) {
        self.lock().sfr.insert((page, addr), value);
    }

    /// PIB value last written through MLME-SET.
    pub fn pib(&self, attribute: u8) -> Option<Vec<u8>> {
        self.lock().pib.get(&attribute).cloned()
    }

    pub fn set_pib(&self, attribute: u8, value: &[u8]) {
        self.lock().pib.insert(attribute, value.to_vec());
    }

    /// HWME attribute last written through HWME-SET.
    pub fn hwme(&self, attribute: u8) -> Option<Vec<u8>> {
        self.lock().hwme.get(&attribute).cloned()
    }
}

impl MockState {
    fn begin_transaction(&mut self) {
        self.selected = true;
        self.transactions += 1;
        self.mosi.clear();
        self.miso.clear();
        self.nacking = false;

        if self.nack_headers > 0 {
            self.nacking = true;
            self.miso.extend([SPI_IDLE, SPI_NACK]);
            return;
        }
        if let Some(frame) = self.upstream.pop_front() {
            if self.misalign_next > 0 {
                self.misalign_next -= 1;
                self.miso.push_back(SPI_IDLE);
            }
            self.miso.extend(frame);
        }
    }

    fn end_transaction(&mut self) {
        self.selected = false;
        if self.nacking {
            self.nack_headers = self.nack_headers.saturating_sub(1);
            self.nacking = false;
            return;
        }
        if self.mosi.len() < 2 || self.mosi[0] == SPI_IDLE {
            return;
        }
        let len = self.mosi[1] as usize;
        if self.mosi.len() < len + 2 {
            return;
        }
        let frame: Vec<u8> = self.mosi[..len + 2].to_vec();
        self.received.push(frame.clone());

        let mut replies = Vec::new();
        if self.chip_model {
            if let Some(reply) = self.model_reply(&frame) {
                replies.push(reply);
            }
        }
        for responder in self.responders.iter_mut() {
            replies.extend(responder(&frame));
        }
        self.upstream.extend(replies);
    }

    fn model_reply(&mut self, frame: &[u8]) -> Option<Vec<u8>> {
        let p = &frame[2..];
        let arg = |i: usize| p.get(i).copied().unwrap_or(0);
        let reply = match frame[0] {
            MLME_SET_REQUEST => {
                let len = arg(2) as usize;
                let value = p.get(3..3 + len).unwrap_or(&[]).to_vec();
                self.pib.insert(arg(0), value);
                vec![MLME_SET_CONFIRM, 3, 0, arg(0), arg(1)]
            }
            MLME_GET_REQUEST => {
                let value = self.pib.get(&arg(0)).cloned().unwrap_or_else(|| vec![0]);
                let mut out = vec![MLME_GET_CONFIRM, 4 + value.len() as u8, 0, arg(0), arg(1)];
                out.push(value.len() as u8);
                out.extend(value);
                out
            }
            MLME_RESET_REQUEST => vec![MLME_RESET_CONFIRM, 1, 0],
            MLME_RX_ENABLE_REQUEST => vec![MLME_RX_ENABLE_CONFIRM, 1, 0],
            MLME_START_REQUEST => vec![MLME_START_CONFIRM, 1, 0],
            MLME_POLL_REQUEST => vec![MLME_POLL_CONFIRM, 1, 0],
            MCPS_PURGE_REQUEST => vec![MCPS_PURGE_CONFIRM, 2, arg(0), 0],
            HWME_SET_REQUEST => {
                let len = arg(1) as usize;
                let value = p.get(2..2 + len).unwrap_or(&[]).to_vec();
                self.hwme.insert(arg(0), value);
                vec![HWME_SET_CONFIRM, 2, 0, arg(0)]
            }
            HWME_GET_REQUEST => {
                let value = self.hwme.get(&arg(0)).cloned().unwrap_or_else(|| vec![0]);
                let mut out = vec![HWME_GET_CONFIRM, 3 + value.len() as u8, 0, arg(0)];
                out.push(value.len() as u8);
                out.extend(value);
                out
            }
            HWME_HAES_REQUEST => {
                let mut out = vec![HWME_HAES_CONFIRM, 17, 0];
                out.extend(p.get(1..17).unwrap_or(&[0; 16]));
                out
            }
            TDME_SETSFR_REQUEST => {
                self.sfr.insert((arg(0), arg(1)), arg(2));
                vec![TDME_SETSFR_CONFIRM, 3, 0, arg(0), arg(1)]
            }
            TDME_GETSFR_REQUEST => {
                let value = self.sfr.get(&(arg(0), arg(1))).copied().unwrap_or(0);
                vec![TDME_GETSFR_CONFIRM, 4, 0, arg(0), arg(1), value]
            }
            TDME_TESTMODE_REQUEST => vec![TDME_TESTMODE_CONFIRM, 2, 0, arg(0)],
            TDME_SET_REQUEST => vec![TDME_SET_CONFIRM, 2, 0, arg(0)],
            TDME_TXPKT_REQUEST => {
                let len = arg(2) as usize;
                let mut out = vec![TDME_TXPKT_CONFIRM, 3 + len as u8, 0, arg(1), arg(2)];
                out.extend(p.get(3..3 + len).map(|d| d.to_vec()).unwrap_or(vec![0; len]));
                out
            }
            TDME_LOTLK_REQUEST => vec![TDME_LOTLK_CONFIRM, 6, 0, arg(0), arg(1), 0x11, 0x22, 0x33],
            _ => return None,
        };
        Some(reply)
    }
}

impl SpiHal for MockTransceiver {
    fn exchange_byte(&mut self, tx: u8) -> Result<u8, HalError> {
        let mut state = self.lock();
        match state.fail_after {
            Some(0) => {
                state.fail_after = None;
                return Err(HalError::Spi);
            }
            Some(left) => state.fail_after = Some(left - 1),
            None => {}
        }
        if !state.selected {
            return Ok(SPI_IDLE);
        }
        state.mosi.push(tx);
        Ok(state.miso.pop_front().unwrap_or(SPI_IDLE))
    }

    fn set_select(&mut self, asserted: bool) -> Result<(), HalError> {
        let mut state = self.lock();
        match (state.selected, asserted) {
            (false, true) => state.begin_transaction(),
            (true, false) => state.end_transaction(),
            _ => {}
        }
        Ok(())
    }

    fn irq_low(&mut self) -> bool {
        let state = self.lock();
        match state.irq_high_until_us {
            Some(until) => state.now_us >= until,
            None => true,
        }
    }

    fn delay_us(&mut self, us: u32) {
        self.lock().now_us += u64::from(us);
    }

    fn now_ms(&mut self) -> u32 {
        (self.lock().now_us / 1000) as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_records_complete_frames() {
        let mut mock = MockTransceiver::new();
        mock.set_select(true).unwrap();
        for b in [0x4A, 0x04, 0x52, 0x00, 0x01, 0x01] {
            mock.exchange_byte(b).unwrap();
        }
        mock.set_select(false).unwrap();
        assert_eq!(mock.received(), vec![vec![0x4A, 0x04, 0x52, 0x00, 0x01, 0x01]]);
    }

    #[test]
    fn test_chip_model_answers_set_then_get() {
        let mut mock = MockTransceiver::with_chip_model();
        mock.set_select(true).unwrap();
        for b in [0x4A, 0x04, 0x52, 0x00, 0x01, 0x01] {
            mock.exchange_byte(b).unwrap();
        }
        mock.set_select(false).unwrap();
        assert_eq!(mock.pib(MAC_RX_ON_WHEN_IDLE), Some(vec![0x01]));
        assert_eq!(mock.pending_upstream(), 1);
    }

    #[test]
    fn test_virtual_clock() {
        let mut mock = MockTransceiver::new();
        mock.delay_us(1500);
        assert_eq!(mock.now_ms(), 1);
        mock.idle();
        assert_eq!(mock.now_ms(), 2);
    }
}
