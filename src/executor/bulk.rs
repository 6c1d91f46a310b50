//! Fan-out execution of an index function across the pool.
//!
//! A bulk operation first schedules a predecessor task. When that task runs
//! it splits `0..shape` into at most one contiguous chunk per worker, keeps
//! the first chunk for itself and submits the rest. Each chunk decrements a
//! shared counter when it finishes; the chunk that takes the counter to zero
//! delivers the single completion signal, so the signal happens-after every
//! index invocation.

use super::sender::PoolScheduler;
use super::task::{RunStatus, Task};
use crate::exec::{CompletionScheduler, CompletionSignal, OperationState, Receiver, Sender};
use crate::util::Countdown;
use parking_lot::Mutex;
use std::fmt;
use std::ops::Range;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub struct PoolBulkSender<F> {
    scheduler: PoolScheduler,
    shape: usize,
    f: Arc<F>,
}

impl<F> PoolBulkSender<F> {
    pub(crate) fn new(scheduler: PoolScheduler, shape: usize, f: F) -> Self {
        Self {
            scheduler,
            shape,
            f: Arc::new(f),
        }
    }

    pub fn shape(&self) -> usize {
        self.shape
    }
}

impl<F> fmt::Debug for PoolBulkSender<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoolBulkSender")
            .field("scheduler", &self.scheduler)
            .field("shape", &self.shape)
            .finish()
    }
}

impl<F> Sender for PoolBulkSender<F>
where
    F: Fn(usize) + Send + Sync + 'static,
{
    type Operation<R: Receiver> = PoolBulkOperation<F, R>;

    fn connect<R: Receiver>(self, receiver: R) -> PoolBulkOperation<F, R> {
        PoolBulkOperation {
            scheduler: self.scheduler,
            shape: self.shape,
            f: self.f,
            receiver: Some(receiver),
        }
    }
}

impl<F> CompletionScheduler for PoolBulkSender<F> {
    type Scheduler = PoolScheduler;

    fn completion_scheduler(&self, _signal: CompletionSignal) -> PoolScheduler {
        self.scheduler.clone()
    }
}

pub struct PoolBulkOperation<F, R> {
    scheduler: PoolScheduler,
    shape: usize,
    f: Arc<F>,
    receiver: Option<R>,
}

impl<F, R> OperationState for PoolBulkOperation<F, R>
where
    F: Fn(usize) + Send + Sync + 'static,
    R: Receiver,
{
    fn start(&mut self) {
        let Some(receiver) = self.receiver.take() else {
            tracing::warn!(resource = ?self.scheduler.id(), "bulk operation started twice");
            return;
        };

        let scheduler = self.scheduler.clone();
        let shape = self.shape;
        let f = self.f.clone();

        self.scheduler.shared().submit(Task::new(move |status| match status {
            RunStatus::Running => launch(scheduler, shape, f, receiver),
            RunStatus::Cancelled => receiver.set_stopped(),
        }));
    }
}

impl<F, R> fmt::Debug for PoolBulkOperation<F, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoolBulkOperation")
            .field("scheduler", &self.scheduler)
            .field("shape", &self.shape)
            .field("started", &self.receiver.is_none())
            .finish()
    }
}

/// Splits `0..shape` into `parts` contiguous ranges whose lengths differ by at
/// most one. Never produces an empty range.
pub(crate) fn split_ranges(shape: usize, parts: usize) -> Vec<Range<usize>> {
    if shape == 0 {
        return Vec::new();
    }

    let parts = parts.clamp(1, shape);
    let base = shape / parts;
    let extra = shape % parts;

    let mut start = 0;
    (0..parts)
        .map(|i| {
            let len = base + usize::from(i < extra);
            let range = start..start + len;
            start += len;
            range
        })
        .collect()
}

struct BulkState<F, R> {
    scheduler: PoolScheduler,
    f: Arc<F>,
    remaining: Countdown,
    failed: AtomicBool,
    receiver: Mutex<Option<R>>,
}

// runs on the worker that picked up the predecessor task
fn launch<F, R>(scheduler: PoolScheduler, shape: usize, f: Arc<F>, receiver: R)
where
    F: Fn(usize) + Send + Sync + 'static,
    R: Receiver,
{
    if shape == 0 {
        receiver.set_value();
        return;
    }

    let ranges = split_ranges(shape, scheduler.num_threads());
    tracing::trace!(resource = ?scheduler.id(), shape, chunks = ranges.len(), "bulk fan-out");

    let state = Arc::new(BulkState {
        scheduler: scheduler.clone(),
        f,
        remaining: Countdown::new(ranges.len()),
        failed: AtomicBool::new(false),
        receiver: Mutex::new(Some(receiver)),
    });

    let mut ranges = ranges.into_iter();
    let first = ranges.next();

    for range in ranges {
        let state = state.clone();
        scheduler
            .shared()
            .submit(Task::new(move |status| state.run_chunk(range, status)));
    }

    if let Some(range) = first {
        state.run_chunk(range, RunStatus::Running);
    }
}

impl<F, R> BulkState<F, R>
where
    F: Fn(usize) + Send + Sync + 'static,
    R: Receiver,
{
    fn run_chunk(&self, range: Range<usize>, status: RunStatus) {
        match status {
            RunStatus::Running => {
                let handler = self.scheduler.shared().panic_handler();
                for idx in range {
                    if !handler.contain(|| (self.f)(idx)) {
                        self.failed.store(true, Ordering::Relaxed);
                    }
                }
            }
            RunStatus::Cancelled => self.failed.store(true, Ordering::Relaxed),
        }

        if self.remaining.arrive() {
            self.complete();
        }
    }

    fn complete(&self) {
        let Some(receiver) = self.receiver.lock().take() else {
            return;
        };

        if self.failed.load(Ordering::Relaxed) {
            tracing::debug!(resource = ?self.scheduler.id(), "bulk completed with failures");
            receiver.set_stopped();
        } else {
            receiver.set_value();
        }
    }
}
