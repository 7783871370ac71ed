//! Count-change notification fan-out.
//!
//! Presentation collaborators (badge counters, external count displays)
//! register listeners and receive the current distinct-entry count after
//! every mutation. The channel carries a bare integer, so listeners cannot
//! reach back into cart state. Fan-out is synchronous and in registration
//! order; a panicking listener is contained and logged so it can neither
//! starve later listeners nor disturb persistence.

use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};

/// Ordered registry of count-change listeners.
#[derive(Default)]
pub struct CountNotifier {
    listeners: Vec<Box<dyn Fn(usize)>>,
}

impl CountNotifier {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            listeners: Vec::new(),
        }
    }

    /// Register a listener. Listeners are invoked in registration order.
    pub fn register(&mut self, listener: impl Fn(usize) + 'static) {
        self.listeners.push(Box::new(listener));
    }

    /// Fan the current distinct-entry count out to every listener.
    pub fn notify(&self, count: usize) {
        for (index, listener) in self.listeners.iter().enumerate() {
            if catch_unwind(AssertUnwindSafe(|| listener(count))).is_err() {
                tracing::warn!(index, count, "count listener panicked; continuing fan-out");
            }
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}

impl fmt::Debug for CountNotifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CountNotifier")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}
