//! Event delivery.
//!
//! [`CatService`](crate::CatService) hands each committed [`CatEvent`] to every
//! registered sink, exactly once, after the backend has made the change durable.

use std::sync::Mutex;

use ninelives_types::CatEvent;
use tracing::info;

pub trait EventSink: Send + Sync {
    fn emit(&self, event: &CatEvent);
}

/// Collects events for later draining.
#[derive(Debug, Default)]
pub struct EventQueue {
    pending: Mutex<Vec<CatEvent>>,
}

impl EventQueue {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Take all pending events, clearing the queue.
    ///
    /// Returns the events in the order they were emitted.
    pub fn take(&self) -> Vec<CatEvent> {
        match self.pending.lock() {
            Ok(mut pending) => std::mem::take(&mut *pending),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.lock().map_or(0, |pending| pending.len())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl EventSink for EventQueue {
    fn emit(&self, event: &CatEvent) {
        match self.pending.lock() {
            Ok(mut pending) => pending.push(event.clone()),
            Err(poisoned) => poisoned.into_inner().push(event.clone()),
        }
    }
}

/// Writes every event to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: &CatEvent) {
        info!(event = event.name(), owner = %event.owner(), "{}", event.format());
    }
}
