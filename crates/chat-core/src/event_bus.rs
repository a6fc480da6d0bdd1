//! Event bus between the chat controller and whatever presents the chat.
//!
//! Stream callbacks publish here instead of calling into the host.
//! Single-threaded (WASM constraint), interior mutability via RefCell.
//! Events queue until the host drains them, all at once or per conversation.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use chat_types::event::ChatEvent;

/// Shared event bus, clone-cheap via Rc.
#[derive(Clone)]
pub struct EventBus {
    inner: Rc<RefCell<VecDeque<ChatEvent>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(VecDeque::new())),
        }
    }

    /// Publish an event. Called by the controller and its stream handlers.
    pub fn emit(&self, event: ChatEvent) {
        self.inner.borrow_mut().push_back(event);
    }

    /// Drain all pending events, oldest first.
    pub fn drain(&self) -> Vec<ChatEvent> {
        self.inner.borrow_mut().drain(..).collect()
    }

    /// Drain only the events of one conversation, leaving the rest queued
    /// for whichever view owns them.
    pub fn drain_conversation(&self, conversation_id: &str) -> Vec<ChatEvent> {
        let mut queue = self.inner.borrow_mut();
        let (matching, rest): (VecDeque<ChatEvent>, VecDeque<ChatEvent>) = queue
            .drain(..)
            .partition(|e| e.conversation_id() == conversation_id);
        *queue = rest;
        matching.into()
    }

    pub fn len(&self) -> usize {
        self.inner.borrow().len()
    }

    pub fn has_pending(&self) -> bool {
        !self.inner.borrow().is_empty()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
