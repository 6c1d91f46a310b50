//! Join barrier counter for fan-out work.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Counts outstanding participants down to zero.
///
/// Padded to its own cache line: every bulk chunk hits it from a different
/// worker.
#[repr(align(64))]
pub struct Countdown {
    remaining: AtomicUsize,
}

impl Countdown {
    pub const fn new(participants: usize) -> Self {
        Self {
            remaining: AtomicUsize::new(participants),
        }
    }

    /// Records one participant as finished. Returns `true` for exactly one
    /// caller: the last one to arrive.
    ///
    /// The last arriver happens-after every other participant's writes made
    /// before its own `arrive`.
    pub fn arrive(&self) -> bool {
        let prev = self.remaining.fetch_sub(1, Ordering::AcqRel);
        debug_assert!(prev > 0, "more arrivals than participants");
        prev == 1
    }

    pub fn remaining(&self) -> usize {
        self.remaining.load(Ordering::Acquire)
    }
}

impl fmt::Debug for Countdown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Countdown")
            .field("remaining", &self.remaining())
            .finish()
    }
}
