//! Single-slot scheduling of delayed session steps.

use std::time::Duration;

/// Identifies one scheduling of a [`TimerSlot`]. A driver arms its clock
/// once per generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingTimer {
    pub generation: u64,
    pub delay: Duration,
}

/// At most one pending resumption. Scheduling again replaces whatever was
/// pending.
#[derive(Debug)]
pub struct TimerSlot<A> {
    pending: Option<(Duration, A)>,
    generation: u64,
}

impl<A: Copy + std::fmt::Debug> TimerSlot<A> {
    pub fn new() -> Self {
        Self {
            pending: None,
            generation: 0,
        }
    }

    pub fn schedule(&mut self, delay: Duration, action: A) {
        if let Some((_, replaced)) = self.pending {
            tracing::debug!("Replacing pending {:?} with {:?}", replaced, action);
        }
        self.generation += 1;
        self.pending = Some((delay, action));
    }

    pub fn cancel(&mut self) {
        self.pending = None;
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn pending(&self) -> Option<PendingTimer> {
        self.pending.map(|(delay, _)| PendingTimer {
            generation: self.generation,
            delay,
        })
    }

    /// The pending action, left in place.
    pub fn action(&self) -> Option<A> {
        self.pending.map(|(_, action)| action)
    }

    /// Remove and return the pending action.
    pub fn take(&mut self) -> Option<A> {
        self.pending.take().map(|(_, action)| action)
    }
}

impl<A: Copy + std::fmt::Debug> Default for TimerSlot<A> {
    fn default() -> Self {
        Self::new()
    }
}
