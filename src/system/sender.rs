use super::interface::{SystemOperationStateInterface, SystemSenderInterface};
use super::receiver::ReceiverBridge;
use super::scheduler::SystemScheduler;
use crate::exec::{CompletionScheduler, CompletionSignal, OperationState, Receiver, Sender};
use std::fmt;

/// One zero-argument unit of work on a system scheduler.
///
/// Completes with value (no payload) on a worker of the resource, or with
/// stopped if the resource shut down before the work ran.
pub struct SystemSender {
    inner: Box<dyn SystemSenderInterface>,
}

impl SystemSender {
    pub(crate) fn new(inner: Box<dyn SystemSenderInterface>) -> Self {
        Self { inner }
    }
}

impl Sender for SystemSender {
    type Operation<R: Receiver> = SystemOperation;

    fn connect<R: Receiver>(self, receiver: R) -> SystemOperation {
        SystemOperation {
            inner: self.inner.connect(ReceiverBridge::new(receiver)),
        }
    }
}

impl CompletionScheduler for SystemSender {
    type Scheduler = SystemScheduler;

    fn completion_scheduler(&self, _signal: CompletionSignal) -> SystemScheduler {
        SystemScheduler::from_interface(self.inner.completion_scheduler())
    }
}

impl fmt::Debug for SystemSender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SystemSender")
            .field("scheduler", &self.completion_scheduler(CompletionSignal::Value))
            .finish()
    }
}

/// A connected unit of work, independent of the receiver's type.
///
/// Caller obligations: start at most once (later calls are ignored) and
/// never from more than one thread at a time. Dropping the operation before
/// `start` drops the receiver without signalling it. Once started, the work
/// owns everything it needs, so the operation may be dropped right away.
///
/// Completion normally arrives on a worker of the resource. If the resource
/// has already shut down (its context was dropped), `start` delivers stopped
/// inline, so the receiver runs on the calling thread before `start` returns.
pub struct SystemOperation {
    inner: Box<dyn SystemOperationStateInterface>,
}

impl OperationState for SystemOperation {
    fn start(&mut self) {
        self.inner.start();
    }
}

impl fmt::Debug for SystemOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SystemOperation").finish_non_exhaustive()
    }
}
