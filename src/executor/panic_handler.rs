//! Containment of panics raised by user work running on the pool.

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};

/// What a worker does when user work panics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PanicStrategy {
    /// Abort the process on the first panic in user work.
    Abort,
    /// Contain the panic silently.
    Isolate,
    /// Contain the panic and log it.
    #[default]
    LogAndContinue,
}

/// Per-pool panic policy plus a count of contained panics.
#[derive(Debug)]
pub struct PanicHandler {
    strategy: PanicStrategy,
    contained: AtomicUsize,
}

impl PanicHandler {
    pub fn new(strategy: PanicStrategy) -> Self {
        Self {
            strategy,
            contained: AtomicUsize::new(0),
        }
    }

    /// Runs `f` and reports whether it returned normally.
    ///
    /// A panic never escapes: it is counted, then logged or turned into a
    /// process abort depending on the strategy.
    pub fn contain<F: FnOnce()>(&self, f: F) -> bool {
        let Err(payload) = catch_unwind(AssertUnwindSafe(f)) else {
            return true;
        };

        self.contained.fetch_add(1, Ordering::Relaxed);
        let message = panic_message(&*payload);

        match self.strategy {
            PanicStrategy::Abort => {
                tracing::error!(panic = message, "work panicked, aborting");
                std::process::abort();
            }
            PanicStrategy::Isolate => {}
            PanicStrategy::LogAndContinue => tracing::error!(panic = message, "work panicked"),
        }
        false
    }

    pub fn panic_count(&self) -> usize {
        self.contained.load(Ordering::Relaxed)
    }
}

/// Best-effort text of a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "unknown panic"
    }
}
