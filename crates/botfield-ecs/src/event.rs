//! Append-only queue of intra-tick events.
//!
//! Systems [`push`](EventQueue::push) events while a tick runs; callers read
//! them between tick batches with [`peek`](EventQueue::peek) or take them with
//! [`drain`](EventQueue::drain). Events are never reordered and the queue is
//! never emptied implicitly.

use serde::{Deserialize, Serialize};

/// Insertion-ordered event buffer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventQueue<E> {
    events: Vec<E>,
}

impl<E> EventQueue<E> {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    /// Append an event.
    pub fn push(&mut self, event: E) {
        self.events.push(event);
    }

    /// The live queue, without clearing it.
    pub fn peek(&self) -> &[E] {
        &self.events
    }

    /// Take every queued event in push order, leaving the queue empty.
    pub fn drain(&mut self) -> Vec<E> {
        std::mem::take(&mut self.events)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

impl<E> Default for EventQueue<E> {
    fn default() -> Self {
        Self::new()
    }
}
