//! Per-device handler table for upstream messages.

use log::debug;

use crate::constants::UPSTREAM_IDS;
use crate::dispatch::Ca821x;
use crate::error::Ca821xError;
use crate::hal::SpiHal;
use crate::transport::frame::Message;

/// Handler for one upstream message kind.
///
/// Receives the frame and the device it arrived on, so it can issue further
/// requests from inside dispatch.
pub type Handler<H> = Box<dyn FnMut(&Message, &mut Ca821x<H>) -> Result<(), Ca821xError>>;

pub(crate) enum HandlerSlot<H: SpiHal> {
    Empty,
    Registered(Handler<H>),
    /// The registered handler is executing and has been taken out of the slot.
    Running,
    /// Installed by a blocking wait; forwards to the wait's active handler.
    Trampoline,
}

impl<H: SpiHal> HandlerSlot<H> {
    pub(crate) fn into_handler(self) -> Option<Handler<H>> {
        match self {
            HandlerSlot::Registered(handler) => Some(handler),
            _ => None,
        }
    }
}

impl<H: SpiHal> From<Option<Handler<H>>> for HandlerSlot<H> {
    fn from(handler: Option<Handler<H>>) -> Self {
        handler.map_or(HandlerSlot::Empty, HandlerSlot::Registered)
    }
}

/// Position of an upstream id in the handler table.
pub(crate) fn slot_index(command_id: u8) -> Option<usize> {
    UPSTREAM_IDS.iter().position(|&id| id == command_id)
}

enum Fallback<H: SpiHal> {
    Builtin,
    Custom(Handler<H>),
    Running,
}

pub(crate) struct CallbackTable<H: SpiHal> {
    slots: Vec<HandlerSlot<H>>,
    fallback: Fallback<H>,
}

impl<H: SpiHal> Default for CallbackTable<H> {
    fn default() -> Self {
        CallbackTable {
            slots: UPSTREAM_IDS.iter().map(|_| HandlerSlot::Empty).collect(),
            fallback: Fallback::Builtin,
        }
    }
}

impl<H: SpiHal> CallbackTable<H> {
    pub(crate) fn replace(&mut self, index: usize, slot: HandlerSlot<H>) -> HandlerSlot<H> {
        std::mem::replace(&mut self.slots[index], slot)
    }

    pub(crate) fn is_trampoline(&self, index: usize) -> bool {
        matches!(self.slots[index], HandlerSlot::Trampoline)
    }

    /// Puts a handler back after it ran, unless it was replaced or cleared
    /// meanwhile.
    pub(crate) fn restore(&mut self, index: usize, handler: Handler<H>) {
        if matches!(self.slots[index], HandlerSlot::Running) {
            self.slots[index] = HandlerSlot::Registered(handler);
        }
    }

    pub(crate) fn is_registered(&self, index: usize) -> bool {
        !matches!(self.slots[index], HandlerSlot::Empty)
    }

    /// Takes the custom fallback out for a call; `None` means the built-in one.
    pub(crate) fn take_fallback(&mut self) -> Option<Handler<H>> {
        match std::mem::replace(&mut self.fallback, Fallback::Running) {
            Fallback::Custom(handler) => Some(handler),
            other => {
                self.fallback = other;
                None
            }
        }
    }

    pub(crate) fn restore_fallback(&mut self, handler: Handler<H>) {
        if matches!(self.fallback, Fallback::Running) {
            self.fallback = Fallback::Custom(handler);
        }
    }

    pub(crate) fn set_fallback(&mut self, handler: Option<Handler<H>>) {
        self.fallback = handler.map_or(Fallback::Builtin, Fallback::Custom);
    }
}

/// Built-in fallback: nothing wanted the frame.
pub(crate) fn default_fallback(msg: &Message) -> Result<(), Ca821xError> {
    debug!("No handler for upstream 0x{:02X}", msg.command_id());
    Err(Ca821xError::NotHandled)
}

impl<H: SpiHal> Ca821x<H> {
    /// Registers the handler for an upstream message id.
    ///
    /// Fails with `InvalidArgs` for ids the transceiver never sends upstream.
    /// A handler may replace or clear its own registration while it runs.
    pub fn set_handler<F>(&mut self, command_id: u8, handler: F) -> Result<(), Ca821xError>
    where
        F: FnMut(&Message, &mut Ca821x<H>) -> Result<(), Ca821xError> + 'static,
    {
        let index = slot_index(command_id).ok_or(Ca821xError::InvalidArgs)?;
        self.rebind(index, Some(Box::new(handler)));
        Ok(())
    }

    pub fn clear_handler(&mut self, command_id: u8) -> Result<(), Ca821xError> {
        let index = slot_index(command_id).ok_or(Ca821xError::InvalidArgs)?;
        self.rebind(index, None);
        Ok(())
    }

    /// Changes a registration; a running blocking wait on the id keeps its
    /// trampoline and takes the change over for when it ends.
    fn rebind(&mut self, index: usize, handler: Option<Handler<H>>) {
        match self.awaiting(index) {
            Some(wait) => wait.rebind(handler),
            None => {
                self.callbacks.replace(index, HandlerSlot::from(handler));
            }
        }
    }

    pub fn has_handler(&self, command_id: u8) -> bool {
        slot_index(command_id).is_some_and(|index| self.callbacks.is_registered(index))
    }

    /// Sets the generic handler for upstream frames with no registered handler.
    pub fn set_fallback<F>(&mut self, handler: F)
    where
        F: FnMut(&Message, &mut Ca821x<H>) -> Result<(), Ca821xError> + 'static,
    {
        self.callbacks.set_fallback(Some(Box::new(handler)));
    }

    /// Restores the built-in fallback, which logs and reports `NotHandled`.
    pub fn clear_fallback(&mut self) {
        self.callbacks.set_fallback(None);
    }

    /// Runs the handler registered for `msg`, or the fallback.
    pub(crate) fn invoke_handler(&mut self, msg: &Message) -> Result<(), Ca821xError> {
        let Some(index) = slot_index(msg.command_id()) else {
            debug!("Unknown upstream id 0x{:02X}", msg.command_id());
            return Err(Ca821xError::NotHandled);
        };

        if self.callbacks.is_trampoline(index) {
            return self.run_trampoline(msg);
        }
        match self.callbacks.replace(index, HandlerSlot::Running) {
            HandlerSlot::Registered(mut handler) => {
                let result = handler(msg, self);
                self.callbacks.restore(index, handler);
                result
            }
            other => {
                self.callbacks.replace(index, other);
                self.invoke_fallback(msg)
            }
        }
    }

    pub(crate) fn invoke_fallback(&mut self, msg: &Message) -> Result<(), Ca821xError> {
        match self.callbacks.take_fallback() {
            Some(mut handler) => {
                let result = handler(msg, self);
                self.callbacks.restore_fallback(handler);
                result
            }
            None => default_fallback(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TransportConfig;
    use crate::constants::*;
    use crate::hal::MockTransceiver;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn device() -> (Ca821x<MockTransceiver>, MockTransceiver) {
        let mock = MockTransceiver::with_chip_model();
        (Ca821x::new(mock.clone(), TransportConfig::default()).unwrap(), mock)
    }

    fn deliver(dev: &mut Ca821x<MockTransceiver>, mock: &MockTransceiver, frame: &[u8]) {
        mock.push_upstream(frame);
        dev.service_link().unwrap();
        dev.drain().unwrap();
    }

    #[test]
    fn test_one_shot_handler_clears_itself() {
        let (mut dev, mock) = device();
        let hits = Rc::new(RefCell::new(0));
        let h = hits.clone();
        dev.set_handler(MLME_SYNC_LOSS_INDICATION, move |_, dev| {
            *h.borrow_mut() += 1;
            dev.clear_handler(MLME_SYNC_LOSS_INDICATION)
        })
        .unwrap();

        deliver(&mut dev, &mock, &[MLME_SYNC_LOSS_INDICATION, 0]);
        assert!(!dev.has_handler(MLME_SYNC_LOSS_INDICATION));
        deliver(&mut dev, &mock, &[MLME_SYNC_LOSS_INDICATION, 0]);
        assert_eq!(*hits.borrow(), 1);
    }

    #[test]
    fn test_handler_replaces_itself() {
        let (mut dev, mock) = device();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let s = seen.clone();
        dev.set_handler(MLME_ORPHAN_INDICATION, move |_, dev| {
            s.borrow_mut().push("first");
            let s = s.clone();
            dev.set_handler(MLME_ORPHAN_INDICATION, move |_, _| {
                s.borrow_mut().push("second");
                Ok(())
            })
        })
        .unwrap();

        deliver(&mut dev, &mock, &[MLME_ORPHAN_INDICATION, 0]);
        deliver(&mut dev, &mock, &[MLME_ORPHAN_INDICATION, 0]);
        assert_eq!(*seen.borrow(), vec!["first", "second"]);
    }

    #[test]
    fn test_fallback_clears_itself() {
        let (mut dev, mock) = device();
        let hits = Rc::new(RefCell::new(0));
        let h = hits.clone();
        dev.set_fallback(move |_, dev| {
            *h.borrow_mut() += 1;
            dev.clear_fallback();
            Ok(())
        });

        deliver(&mut dev, &mock, &[HWME_WAKEUP_INDICATION, 1, 0]);
        deliver(&mut dev, &mock, &[HWME_WAKEUP_INDICATION, 1, 0]);
        assert_eq!(*hits.borrow(), 1);
    }

    #[test]
    fn test_unknown_id_rejected() {
        let (mut dev, _mock) = device();
        assert_eq!(dev.set_handler(MLME_SET_REQUEST, |_, _| Ok(())), Err(Ca821xError::InvalidArgs));
        assert!(!dev.has_handler(MLME_SET_REQUEST));
    }
}
