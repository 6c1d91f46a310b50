use super::bulk::PoolBulkSender;
use super::cpu_pool::{PoolShared, ResourceId};
use super::task::{RunStatus, Task};
use crate::exec::{
    BulkScheduler, CompletionScheduler, CompletionSignal, ForwardProgressGuarantee,
    OperationState, Receiver, Scheduler, Sender,
};
use std::fmt;
use std::sync::Arc;

/// The pool's own generic scheduler.
#[derive(Clone)]
pub struct PoolScheduler {
    shared: Arc<PoolShared>,
}

impl PoolScheduler {
    pub(crate) fn new(shared: Arc<PoolShared>) -> Self {
        Self { shared }
    }

    pub fn id(&self) -> ResourceId {
        self.shared.id()
    }

    pub fn num_threads(&self) -> usize {
        self.shared.num_threads()
    }

    pub(crate) fn shared(&self) -> &Arc<PoolShared> {
        &self.shared
    }
}

impl PartialEq for PoolScheduler {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }
}

impl Eq for PoolScheduler {}

impl fmt::Debug for PoolScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoolScheduler")
            .field("id", &self.shared.id())
            .finish()
    }
}

impl Scheduler for PoolScheduler {
    type Sender = PoolSender;

    fn schedule(&self) -> PoolSender {
        PoolSender {
            scheduler: self.clone(),
        }
    }

    fn forward_progress_guarantee(&self) -> ForwardProgressGuarantee {
        ForwardProgressGuarantee::Parallel
    }
}

impl BulkScheduler for PoolScheduler {
    type BulkSender<F> = PoolBulkSender<F>
    where
        F: Fn(usize) + Send + Sync + 'static;

    fn bulk<F>(&self, shape: usize, f: F) -> PoolBulkSender<F>
    where
        F: Fn(usize) + Send + Sync + 'static,
    {
        PoolBulkSender::new(self.clone(), shape, f)
    }
}

/// Completes with value on a pool worker.
#[derive(Debug, Clone)]
pub struct PoolSender {
    scheduler: PoolScheduler,
}

impl Sender for PoolSender {
    type Operation<R: Receiver> = PoolOperation<R>;

    fn connect<R: Receiver>(self, receiver: R) -> PoolOperation<R> {
        PoolOperation {
            scheduler: self.scheduler,
            receiver: Some(receiver),
        }
    }
}

impl CompletionScheduler for PoolSender {
    type Scheduler = PoolScheduler;

    fn completion_scheduler(&self, _signal: CompletionSignal) -> PoolScheduler {
        self.scheduler.clone()
    }
}

pub struct PoolOperation<R> {
    scheduler: PoolScheduler,
    receiver: Option<R>,
}

impl<R: Receiver> OperationState for PoolOperation<R> {
    fn start(&mut self) {
        let Some(receiver) = self.receiver.take() else {
            tracing::warn!(resource = ?self.scheduler.id(), "operation started twice");
            return;
        };

        self.scheduler.shared.submit(Task::new(move |status| match status {
            RunStatus::Running => receiver.set_value(),
            RunStatus::Cancelled => receiver.set_stopped(),
        }));
    }
}

impl<R> fmt::Debug for PoolOperation<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoolOperation")
            .field("scheduler", &self.scheduler)
            .field("started", &self.receiver.is_none())
            .finish()
    }
}
