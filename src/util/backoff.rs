//! Idle backoff for workers with an empty queue.

use std::hint::spin_loop;
use std::thread;

/// Spin, then yield, then tell the caller to park.
#[derive(Debug, Default)]
pub struct Backoff {
    step: u32,
}

impl Backoff {
    const SPIN_LIMIT: u32 = 6;
    const YIELD_LIMIT: u32 = 10;

    pub fn new() -> Self {
        Self { step: 0 }
    }

    pub fn reset(&mut self) {
        self.step = 0;
    }

    /// Waits a little longer than last time. Once spinning and yielding are
    /// exhausted it does nothing; check [`should_park`](Self::should_park).
    pub fn snooze(&mut self) {
        if self.step <= Self::SPIN_LIMIT {
            for _ in 0..(1u32 << self.step) {
                spin_loop();
            }
        } else if self.step <= Self::YIELD_LIMIT {
            thread::yield_now();
        }

        if self.step <= Self::YIELD_LIMIT {
            self.step += 1;
        }
    }

    pub fn should_park(&self) -> bool {
        self.step > Self::YIELD_LIMIT
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_progression() {
        let mut backoff = Backoff::new();
        assert!(!backoff.should_park());

        for _ in 0..20 {
            backoff.snooze();
        }

        assert!(backoff.should_park());
    }

    #[test]
    fn test_backoff_reset() {
        let mut backoff = Backoff::new();
        for _ in 0..20 {
            backoff.snooze();
        }

        backoff.reset();
        assert!(!backoff.should_park());
    }
}
