//! # Blocking Wait
//!
//! Lets a caller block until one upstream message kind arrives. The kind's
//! handler slot is replaced by a trampoline that forwards to the original
//! handler (or an override) and records that it ran, and the queue keeps
//! being drained in full so every other message is still delivered in order.

use std::any::Any;

use log::{debug, warn};

use crate::dispatch::callbacks::{slot_index, Handler, HandlerSlot};
use crate::dispatch::{Ca821x, DispatchState};
use crate::error::Ca821xError;
use crate::hal::SpiHal;
use crate::transport::frame::Message;

/// Bookkeeping for the one blocking wait that may be running.
pub(crate) struct WaitState<H: SpiHal> {
    index: usize,
    /// Handler the trampoline forwards to
    target: HandlerSlot<H>,
    /// Registered handler set aside while an override runs
    parked: Option<Handler<H>>,
    overridden: bool,
    context: Option<Box<dyn Any>>,
    fired: bool,
    in_handler: bool,
}

impl<H: SpiHal> WaitState<H> {
    /// Takes over a registration made for the awaited id during the wait.
    pub(crate) fn rebind(&mut self, handler: Option<Handler<H>>) {
        if self.overridden {
            self.parked = handler;
        } else {
            self.target = HandlerSlot::from(handler);
        }
    }

    /// Handler to put back in the table when the wait ends.
    fn into_registration(self) -> Option<Handler<H>> {
        if self.overridden {
            self.parked
        } else {
            self.target.into_handler()
        }
    }
}

impl<H: SpiHal> Ca821x<H> {
    /// Blocks until `command_id` has been dispatched or `timeout_ms` elapses.
    ///
    /// The registered handler still runs for the awaited message. Fails with
    /// `Fail` for an id that is never sent upstream, `InvalidState` when a
    /// wait or drain is already running, and `SpiWaitTimeout` on timeout.
    pub fn wait_for(&mut self, command_id: u8, timeout_ms: u32) -> Result<(), Ca821xError> {
        self.wait_for_with(command_id, timeout_ms, None, None)
    }

    /// Like [`Ca821x::wait_for`], running `handler` instead of the registered
    /// handler for the awaited message.
    pub fn wait_for_with_handler<F>(
        &mut self,
        command_id: u8,
        timeout_ms: u32,
        handler: F,
    ) -> Result<(), Ca821xError>
    where
        F: FnMut(&Message, &mut Ca821x<H>) -> Result<(), Ca821xError> + 'static,
    {
        self.wait_for_with(command_id, timeout_ms, None, Some(Box::new(handler)))
    }

    /// General form of the blocking wait.
    ///
    /// `context` is visible through [`Ca821x::wait_context`] while the
    /// awaited message's handler runs.
    pub fn wait_for_with(
        &mut self,
        command_id: u8,
        timeout_ms: u32,
        context: Option<Box<dyn Any>>,
        handler: Option<Handler<H>>,
    ) -> Result<(), Ca821xError> {
        let index = slot_index(command_id).ok_or(Ca821xError::Fail)?;
        if self.wait.is_some() || self.state != DispatchState::Idle {
            return Err(Ca821xError::InvalidState);
        }

        let previous = self.callbacks.replace(index, HandlerSlot::Trampoline).into_handler();
        let overridden = handler.is_some();
        let (target, parked) = match handler {
            Some(handler) => (HandlerSlot::Registered(handler), previous),
            None => (HandlerSlot::from(previous), None),
        };
        self.wait = Some(WaitState {
            index,
            target,
            parked,
            overridden,
            context,
            fired: false,
            in_handler: false,
        });
        self.state = DispatchState::Waiting { draining: false };

        let start = self.link.hal_mut().now_ms();
        let mut fired = false;
        while self.link.hal_mut().now_ms().wrapping_sub(start) < timeout_ms {
            // no interrupt context on this side of the link, so poll IRQB here
            if let Err(e) = self.link.service_link() {
                warn!("Link error while waiting for 0x{command_id:02X}: {e}");
            }
            if let Err(e) = self.drain() {
                debug!("Drain failed while waiting for 0x{command_id:02X}: {e}");
            }
            fired = self.wait.as_ref().is_some_and(|wait| wait.fired);
            if fired {
                break;
            }
            self.link.hal_mut().idle();
        }

        if let Some(wait) = self.wait.take() {
            let index = wait.index;
            self.callbacks.replace(index, HandlerSlot::from(wait.into_registration()));
        }
        self.state = DispatchState::Idle;

        if self.hotfix.recovery_pending {
            self.hotfix.recovery_pending = false;
            self.recover_cache();
        }

        if fired {
            return Ok(());
        }
        debug!("Wait for 0x{command_id:02X} timed out");
        Err(Ca821xError::SpiWaitTimeout)
    }

    /// Context passed to the running blocking wait.
    ///
    /// Only available from inside the awaited message's handler.
    pub fn wait_context<T: Any>(&self) -> Option<&T> {
        self.wait
            .as_ref()
            .filter(|wait| wait.in_handler)
            .and_then(|wait| wait.context.as_ref())
            .and_then(|context| context.downcast_ref::<T>())
    }

    /// The running wait, if it is waiting on the handler slot `index`.
    pub(crate) fn awaiting(&mut self, index: usize) -> Option<&mut WaitState<H>> {
        self.wait.as_mut().filter(|wait| wait.index == index)
    }

    /// Handler slot stand-in installed by the blocking wait.
    pub(crate) fn run_trampoline(&mut self, msg: &Message) -> Result<(), Ca821xError> {
        let Some(wait) = self.wait.as_mut() else {
            return self.invoke_fallback(msg);
        };
        let target = std::mem::replace(&mut wait.target, HandlerSlot::Running);
        wait.in_handler = true;

        let result = match target {
            HandlerSlot::Registered(mut handler) => {
                let result = handler(msg, self);
                if let Some(wait) = self.wait.as_mut() {
                    if matches!(wait.target, HandlerSlot::Running) {
                        wait.target = HandlerSlot::Registered(handler);
                    }
                }
                result
            }
            other => {
                if let Some(wait) = self.wait.as_mut() {
                    wait.target = other;
                }
                self.invoke_fallback(msg)
            }
        };

        if let Some(wait) = self.wait.as_mut() {
            wait.in_handler = false;
            wait.fired = true;
        }
        result
    }
}
