//! Simple event bus for decoupled communication between the session
//! controller and the presentation layer.
//!
//! The bus is single-threaded (WASM constraint) and uses interior mutability
//! via RefCell. Events are buffered and drained by the host; an optional
//! wake callback tells the host there is something to drain, since a web
//! page has no frame loop to poll from.

use convo_types::event::SessionEvent;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

/// Shared event bus — clone-cheap via Rc.
#[derive(Clone)]
pub struct EventBus {
    inner: Rc<RefCell<VecDeque<SessionEvent>>>,
    wake: Rc<RefCell<Option<Box<dyn Fn()>>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(VecDeque::new())),
            wake: Rc::new(RefCell::new(None)),
        }
    }

    /// Publish an event. Called by the session controller.
    pub fn emit(&self, event: SessionEvent) {
        self.inner.borrow_mut().push_back(event);
        if let Some(wake) = self.wake.borrow().as_ref() {
            wake();
        }
    }

    /// Drain all pending events. Called by the host after a wake.
    pub fn drain(&self) -> Vec<SessionEvent> {
        self.inner.borrow_mut().drain(..).collect()
    }

    /// Check if there are pending events.
    pub fn has_pending(&self) -> bool {
        !self.inner.borrow().is_empty()
    }

    /// Install the wake callback invoked on every emit.
    pub fn set_wake(&self, wake: impl Fn() + 'static) {
        *self.wake.borrow_mut() = Some(Box::new(wake));
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
