use super::interface::{BulkFunction, BulkShape, SystemSenderInterface};
use super::scheduler::SystemScheduler;
use super::sender::{SystemOperation, SystemSender};
use crate::exec::{CompletionScheduler, CompletionSignal, OperationState, Receiver, Sender};
use std::fmt;

/// Fan-out of an index function over `0..shape` on a system scheduler.
///
/// Completes with value once every index has been invoked exactly once, in
/// no particular order. If any invocation panics the remaining indices still
/// run and the sender completes with stopped.
pub struct SystemBulkSender {
    sender: SystemSender,
    shape: BulkShape,
}

impl SystemBulkSender {
    pub(crate) fn new(inner: Box<dyn SystemSenderInterface>, shape: BulkShape) -> Self {
        Self {
            sender: SystemSender::new(inner),
            shape,
        }
    }

    pub fn shape(&self) -> BulkShape {
        self.shape
    }
}

impl Sender for SystemBulkSender {
    type Operation<R: Receiver> = SystemOperation;

    fn connect<R: Receiver>(self, receiver: R) -> SystemOperation {
        self.sender.connect(receiver)
    }
}

impl CompletionScheduler for SystemBulkSender {
    type Scheduler = SystemScheduler;

    fn completion_scheduler(&self, signal: CompletionSignal) -> SystemScheduler {
        self.sender.completion_scheduler(signal)
    }
}

impl fmt::Debug for SystemBulkSender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SystemBulkSender")
            .field("shape", &self.shape)
            .finish_non_exhaustive()
    }
}

/// Bulk launch that waits for an arbitrary predecessor sender.
///
/// When the predecessor completes with value, the bulk is scheduled on the
/// system scheduler and its completion is forwarded downstream. A stopped
/// predecessor is forwarded as stopped and the function is never invoked.
pub struct ChainedBulkSender<P> {
    scheduler: SystemScheduler,
    predecessor: P,
    shape: BulkShape,
    f: BulkFunction,
}

impl<P> ChainedBulkSender<P> {
    pub(crate) fn new(
        scheduler: SystemScheduler,
        predecessor: P,
        shape: BulkShape,
        f: BulkFunction,
    ) -> Self {
        Self {
            scheduler,
            predecessor,
            shape,
            f,
        }
    }

    pub fn shape(&self) -> BulkShape {
        self.shape
    }
}

impl<P: Sender> Sender for ChainedBulkSender<P> {
    type Operation<R: Receiver> = P::Operation<ChainedBulkReceiver<R>>;

    fn connect<R: Receiver>(self, receiver: R) -> Self::Operation<R> {
        self.predecessor.connect(ChainedBulkReceiver {
            scheduler: self.scheduler,
            shape: self.shape,
            f: self.f,
            downstream: receiver,
        })
    }
}

impl<P> CompletionScheduler for ChainedBulkSender<P> {
    type Scheduler = SystemScheduler;

    fn completion_scheduler(&self, _signal: CompletionSignal) -> SystemScheduler {
        self.scheduler.clone()
    }
}

impl<P: fmt::Debug> fmt::Debug for ChainedBulkSender<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChainedBulkSender")
            .field("scheduler", &self.scheduler)
            .field("predecessor", &self.predecessor)
            .field("shape", &self.shape)
            .finish_non_exhaustive()
    }
}

pub struct ChainedBulkReceiver<R> {
    scheduler: SystemScheduler,
    shape: BulkShape,
    f: BulkFunction,
    downstream: R,
}

impl<R: Receiver> Receiver for ChainedBulkReceiver<R> {
    fn set_value(self) {
        let bulk = self.scheduler.interface().bulk(self.shape, self.f);
        let mut op = SystemSender::new(bulk).connect(self.downstream);
        // the started work owns its state; `op` can go out of scope
        op.start();
    }

    fn set_stopped(self) {
        self.downstream.set_stopped();
    }
}
