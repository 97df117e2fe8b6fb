//! # Host Rendezvous
//!
//! On a host the SPI link is usually serviced by a dedicated I/O thread while
//! the application runs elsewhere. `Rendezvous` passes a single turn between
//! the two so that only one of them touches the device context at a time.
//! Handing over blocks until the peer hands the turn back, which gives
//! strict alternation.
//!
//! The blocking methods must not be called from inside a tokio runtime; use
//! the `_async` forms there.

use log::debug;
use tokio::sync::mpsc::{self, Receiver, Sender};

use crate::error::Ca821xError;

/// Token passed between the two sides; whoever last received it holds the turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Turn;

/// One side of a rendezvous pair.
#[derive(Debug)]
pub struct Rendezvous {
    tx: Sender<Turn>,
    rx: Receiver<Turn>,
    holds_turn: bool,
}

impl Rendezvous {
    /// Creates both sides. The first one starts with the turn.
    pub fn pair() -> (Rendezvous, Rendezvous) {
        let (to_second, from_first) = mpsc::channel(1);
        let (to_first, from_second) = mpsc::channel(1);
        (
            Rendezvous {
                tx: to_second,
                rx: from_second,
                holds_turn: true,
            },
            Rendezvous {
                tx: to_first,
                rx: from_first,
                holds_turn: false,
            },
        )
    }

    pub fn holds_turn(&self) -> bool {
        self.holds_turn
    }

    /// Passes the turn to the peer and blocks until it comes back.
    ///
    /// Fails with `InvalidState` if this side does not hold the turn or the
    /// peer has gone away.
    pub fn hand_over(&mut self) -> Result<(), Ca821xError> {
        self.give()?;
        self.wait_turn()
    }

    /// Blocks until the peer hands over the turn.
    pub fn wait_turn(&mut self) -> Result<(), Ca821xError> {
        if self.holds_turn {
            return Ok(());
        }
        self.rx.blocking_recv().ok_or_else(peer_gone)?;
        self.holds_turn = true;
        Ok(())
    }

    pub async fn hand_over_async(&mut self) -> Result<(), Ca821xError> {
        if !self.holds_turn {
            return Err(Ca821xError::InvalidState);
        }
        self.tx.send(Turn).await.map_err(|_| peer_gone())?;
        self.holds_turn = false;
        self.wait_turn_async().await
    }

    pub async fn wait_turn_async(&mut self) -> Result<(), Ca821xError> {
        if self.holds_turn {
            return Ok(());
        }
        self.rx.recv().await.ok_or_else(peer_gone)?;
        self.holds_turn = true;
        Ok(())
    }

    fn give(&mut self) -> Result<(), Ca821xError> {
        if !self.holds_turn {
            return Err(Ca821xError::InvalidState);
        }
        self.tx.blocking_send(Turn).map_err(|_| peer_gone())?;
        self.holds_turn = false;
        Ok(())
    }
}

fn peer_gone() -> Ca821xError {
    debug!("Rendezvous peer dropped");
    Ca821xError::InvalidState
}
