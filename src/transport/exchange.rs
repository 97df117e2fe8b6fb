//! # Byte Exchanger
//!
//! `Link` owns the board support, the receive queue, the sync slot and the
//! sync chain, and moves exactly one frame in each direction per exchange:
//!
//! ```text
//! wait-for-peer-ready -> assert select -> header (2 bytes) -> route
//!     -> body (max(tx, rx) bytes, shorter side padded with 0xFF) -> deassert
//! ```
//!
//! The CA-8211 is polled for readiness on IRQB around select. The CA-8210 is
//! given a fixed hold time instead, may NACK the header (retried with select
//! released until the sync timeout), and sometimes shifts its output by one
//! byte, which is corrected before routing.
//!
//! `send` is the link-level request path: scan gate, sync slot arming, the
//! exchange itself and the bounded wait for the synchronous reply.

use log::{debug, error, warn};

use crate::config::{ChipVariant, TransportConfig};
use crate::constants::*;
use crate::error::Ca821xError;
use crate::hal::SpiHal;
use crate::logging::log_frame;
use crate::transport::frame::{sync_response_id, CommandFlags, Message};
use crate::transport::router::{route, RxDestination};
use crate::transport::rx_queue::{QueueStats, RxQueue};
use crate::transport::sync::{SyncChain, SyncSlot};

/// Link timing parameters, taken from `TransportConfig`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkTiming {
    pub sync_timeout_ms: u32,
    pub backoff_us: u32,
    pub select_hold_us: u32,
    pub ca8210_hold_us: u32,
}

impl From<&TransportConfig> for LinkTiming {
    fn from(config: &TransportConfig) -> Self {
        LinkTiming {
            sync_timeout_ms: config.sync_timeout_ms,
            backoff_us: config.backoff_us,
            select_hold_us: config.select_hold_us,
            ca8210_hold_us: config.ca8210_hold_us,
        }
    }
}

/// Outcome of one exchange: real (non-filler) byte counts on each side and
/// where the incoming frame was routed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExchangeReport {
    /// Frame bytes sent, header included; 0 when nothing was sent
    pub tx_len: usize,
    /// Frame bytes received, header included; 0 when the line was idle
    pub rx_len: usize,
    pub destination: RxDestination,
}

/// One SPI link to a CA-821x.
pub struct Link<H: SpiHal> {
    hal: H,
    variant: ChipVariant,
    timing: LinkTiming,
    queue: RxQueue,
    sync_slot: SyncSlot,
    chain: SyncChain,
    scanning: bool,
    read_pending: bool,
}

impl<H: SpiHal> Link<H> {
    pub fn new(hal: H, config: &TransportConfig) -> Self {
        Link {
            hal,
            variant: config.variant,
            timing: LinkTiming::from(config),
            queue: RxQueue::new(config.rx_queue_capacity, config.rx_reserved_slots),
            sync_slot: SyncSlot::default(),
            chain: SyncChain::default(),
            scanning: false,
            read_pending: false,
        }
    }

    pub fn hal(&self) -> &H {
        &self.hal
    }

    pub fn hal_mut(&mut self) -> &mut H {
        &mut self.hal
    }

    pub fn variant(&self) -> ChipVariant {
        self.variant
    }

    pub fn timing(&self) -> LinkTiming {
        self.timing
    }

    pub fn queue(&self) -> &RxQueue {
        &self.queue
    }

    pub(crate) fn queue_mut(&mut self) -> &mut RxQueue {
        &mut self.queue
    }

    pub fn queue_stats(&self) -> QueueStats {
        self.queue.stats()
    }

    pub fn sync_slot(&self) -> &SyncSlot {
        &self.sync_slot
    }

    pub fn chain(&self) -> SyncChain {
        self.chain
    }

    /// True between a transmitted scan request and its confirm (or a wakeup).
    pub fn is_scanning(&self) -> bool {
        self.scanning
    }

    /// True when the transceiver signalled data that could not be read yet.
    pub fn read_pending(&self) -> bool {
        self.read_pending
    }

    fn elapsed_ms(&mut self, start: u32) -> u32 {
        self.hal.now_ms().wrapping_sub(start)
    }

    /// Waits until the transceiver can take a transfer.
    ///
    /// On the CA-8211 this leaves select asserted on success.
    fn wait_slave(&mut self) -> Result<(), Ca821xError> {
        if self.variant == ChipVariant::Ca8210 {
            self.hal.delay_us(self.timing.ca8210_hold_us);
            return Ok(());
        }

        let start = self.hal.now_ms();
        loop {
            if self.hal.irq_low() {
                self.hal.set_select(true)?;
                self.hal.delay_us(self.timing.select_hold_us);
                if self.hal.irq_low() {
                    return Ok(());
                }
                self.hal.set_select(false)?;
            }
            if self.elapsed_ms(start) >= self.timing.sync_timeout_ms {
                error!("Transceiver not ready after {} ms", self.timing.sync_timeout_ms);
                return Err(Ca821xError::SpiWaitTimeout);
            }
            self.hal.delay_us(self.timing.backoff_us);
        }
    }

    /// Clocks the two header bytes, retrying NACKed headers on the CA-8210.
    fn exchange_header(&mut self, tx_header: [u8; 2]) -> Result<[u8; 2], Ca821xError> {
        self.wait_slave()?;
        let mut rx = [SPI_IDLE; 2];

        if self.variant == ChipVariant::Ca8211 {
            self.hal.exchange(&tx_header, &mut rx)?;
            return Ok(rx);
        }

        let start = self.hal.now_ms();
        loop {
            self.hal.set_select(true)?;
            self.hal.exchange(&tx_header, &mut rx)?;
            if rx[1] != SPI_NACK {
                return Ok(rx);
            }
            self.hal.set_select(false)?;
            if self.elapsed_ms(start) >= self.timing.sync_timeout_ms {
                error!("Header NACKed for {} ms", self.timing.sync_timeout_ms);
                return Err(Ca821xError::SpiNackTimeout);
            }
            self.hal.delay_us(self.timing.backoff_us);
        }
    }

    /// Exchanges one frame in each direction.
    ///
    /// With `tx == None` and an idle sync chain, the chain's filler request is
    /// sent in its place. Refuses to start with `NoBuffer` when the receive
    /// queue is full and no synchronous reply is expected.
    pub fn exchange(&mut self, tx: Option<&Message>) -> Result<ExchangeReport, Ca821xError> {
        if self.queue.is_full() && !self.sync_slot.is_armed() {
            warn!("Receive queue full, deferring exchange");
            return Err(Ca821xError::NoBuffer);
        }

        let filler = (tx.is_none() && self.chain.active && !self.chain.in_flight)
            .then(SyncChain::filler);
        let tx = tx.or(filler.as_ref());

        self.hal.set_select(false)?;
        let result = self.transfer(tx);
        let deassert = self.hal.set_select(false);
        let report = result?;
        deassert?;

        if filler.is_some() {
            self.chain.in_flight = true;
        }
        Ok(report)
    }

    fn transfer(&mut self, tx: Option<&Message>) -> Result<ExchangeReport, Ca821xError> {
        let tx_header = match tx {
            Some(msg) => {
                log_frame("TX", &msg.to_bytes());
                [msg.command_id(), msg.len() as u8]
            }
            None => [SPI_IDLE, SPI_IDLE],
        };

        let mut header = self.exchange_header(tx_header)?;
        let mut tx_offset = 0;

        // CA-8210 sometimes emits one junk byte ahead of the frame. Only its
        // output is shifted: the extra byte clocked here already carries the
        // first payload byte, so the tx body resumes at offset 1 and the
        // full rx length announced in the header is still to come.
        if self.variant == ChipVariant::Ca8210 && header[0] & 0x80 != 0 && header[1] & 0x80 == 0 {
            let next = tx.and_then(|msg| msg.payload().first().copied());
            let shifted = self.hal.exchange_byte(next.unwrap_or(SPI_IDLE))?;
            debug!("Realigned header 0x{:02X} 0x{:02X}", header[1], shifted);
            header = [header[1], shifted];
            if next.is_some() {
                tx_offset = 1;
            }
        }

        let rx_len = if CommandFlags::from_bits_truncate(header[0]).contains(CommandFlags::INVALID) {
            0
        } else {
            usize::from(header[1])
        };
        let tx_body = tx.map(|msg| &msg.payload()[tx_offset.min(msg.len())..]).unwrap_or(&[]);
        let body_len = rx_len.max(tx_body.len());

        let destination = route(header[0], &mut self.queue, &self.sync_slot, &mut self.chain);

        let mut out = vec![SPI_IDLE; body_len];
        out[..tx_body.len()].copy_from_slice(tx_body);

        let body = match destination {
            RxDestination::Queue(index) => {
                let msg = self.queue.slot_mut(index);
                msg.set_header(header[0], header[1]);
                let result = self.hal.exchange(&out, msg.body_mut(body_len));
                if result.is_err() {
                    msg.set_header(SPI_IDLE, 0);
                }
                result
            }
            RxDestination::Sync => match self.sync_slot.buffer_mut() {
                Some(msg) => {
                    msg.set_header(header[0], header[1]);
                    let result = self.hal.exchange(&out, msg.body_mut(body_len));
                    if result.is_err() {
                        msg.set_header(SPI_IDLE, 0);
                    }
                    result
                }
                None => self.hal.exchange(&out, &mut vec![SPI_IDLE; body_len]),
            },
            RxDestination::Discard => self.hal.exchange(&out, &mut vec![SPI_IDLE; body_len]),
        };
        body?;

        if tx.map(Message::command_id) == Some(MLME_SCAN_REQUEST) {
            self.scanning = true;
        } else if header[0] == MLME_SCAN_CONFIRM || header[0] == HWME_WAKEUP_INDICATION {
            self.scanning = false;
        }

        let rx_frame = match destination {
            RxDestination::Queue(index) => Some(self.queue.slot_mut(index).to_bytes()),
            RxDestination::Sync => self.sync_slot.buffer_mut().map(|msg| msg.to_bytes()),
            RxDestination::Discard => None,
        };
        if let Some(bytes) = rx_frame {
            log_frame("RX", &bytes);
        }

        Ok(ExchangeReport {
            tx_len: tx.map_or(0, |msg| msg.len() + 2),
            rx_len: if header[0] == SPI_IDLE { 0 } else { rx_len + 2 },
            destination,
        })
    }

    /// Sends one request frame and, for synchronous kinds, waits for its reply.
    ///
    /// Returns `Ok(None)` for asynchronous requests.
    pub fn send(&mut self, msg: &Message) -> Result<Option<Message>, Ca821xError> {
        if self.scanning {
            warn!("Scan in progress, rejecting 0x{:02X}", msg.command_id());
            return Err(Ca821xError::SpiScanInProgress);
        }

        if !msg.is_sync() {
            if self.chain.active {
                return Err(Ca821xError::InvalidState);
            }
            self.exchange(Some(msg))?;
            return Ok(None);
        }

        let response_id = sync_response_id(msg.command_id()).ok_or(Ca821xError::InvalidArgs)?;
        self.sync_slot.arm()?;
        if let Err(e) = self.exchange(Some(msg)) {
            self.sync_slot.disarm();
            return Err(e);
        }
        self.sync_wait(response_id).map(Some)
    }

    /// Polls the link until the armed sync slot holds `response_id`.
    fn sync_wait(&mut self, response_id: u8) -> Result<Message, Ca821xError> {
        let start = self.hal.now_ms();
        loop {
            if let Err(e) = self.service_link() {
                self.sync_slot.disarm();
                return Err(e);
            }
            if self.sync_slot.has_response(response_id) {
                return self.sync_slot.disarm().ok_or(Ca821xError::Fail);
            }
            if self.elapsed_ms(start) >= self.timing.sync_timeout_ms {
                self.sync_slot.disarm();
                error!("No 0x{response_id:02X} reply after {} ms", self.timing.sync_timeout_ms);
                return Err(Ca821xError::SpiWaitTimeout);
            }
            self.hal.idle();
        }
    }

    /// Reads one frame if the transceiver signals data and it is safe to do so,
    /// otherwise remembers that a read is pending.
    pub fn service_link(&mut self) -> Result<(), Ca821xError> {
        if !self.hal.irq_low() {
            self.read_pending = false;
            return Ok(());
        }
        if self.queue.is_almost_full(self.sync_slot.is_armed()) || self.chain.in_flight {
            self.read_pending = true;
            return Ok(());
        }
        self.read_pending = false;
        self.exchange(None).map(|_| ())
    }

    /// Starts a sync chain: a filler request is kept outstanding so that
    /// back-to-back synchronous requests run without reading async traffic.
    pub fn start_sync_chain(&mut self) -> Result<(), Ca821xError> {
        if self.chain.active {
            return Err(Ca821xError::InvalidState);
        }
        self.chain = SyncChain {
            active: true,
            in_flight: true,
        };
        if let Err(e) = self.exchange(Some(&SyncChain::filler())) {
            self.chain = SyncChain::default();
            return Err(e);
        }
        Ok(())
    }

    /// Ends the sync chain and collects the outstanding filler reply.
    pub fn stop_sync_chain(&mut self) -> Result<(), Ca821xError> {
        if !self.chain.active {
            return Ok(());
        }
        let outstanding = self.chain.in_flight;
        self.sync_slot.arm()?;
        self.chain = SyncChain::default();
        if !outstanding {
            self.sync_slot.disarm();
            return Ok(());
        }
        if let Err(e) = self.exchange(None) {
            self.sync_slot.disarm();
            return Err(e);
        }
        self.sync_wait(MLME_GET_CONFIRM).map(|_| ())
    }
}
