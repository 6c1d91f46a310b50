//! Default backend: the system interfaces implemented over `CpuPool`.

use super::interface::{
    BulkFunction, BulkShape, SystemContextInterface, SystemOperationStateInterface,
    SystemSchedulerInterface, SystemSenderInterface,
};
use super::receiver::ReceiverBridge;
use crate::config::Config;
use crate::error::Result;
use crate::exec::{
    BulkScheduler, ForwardProgressGuarantee, OperationState, Receiver, Scheduler, Sender,
};
use crate::executor::{CpuPool, PoolScheduler, ResourceId};

pub(crate) struct PoolSystemContext {
    pool: CpuPool,
}

impl PoolSystemContext {
    pub(crate) fn new(config: &Config) -> Result<Self> {
        config.validate()?;
        let pool = CpuPool::new(config)?;
        Ok(Self { pool })
    }
}

impl SystemContextInterface for PoolSystemContext {
    fn get_scheduler(&self) -> Box<dyn SystemSchedulerInterface> {
        Box::new(PoolSystemScheduler {
            pool_scheduler: self.pool.scheduler(),
        })
    }
}

#[derive(Clone)]
struct PoolSystemScheduler {
    pool_scheduler: PoolScheduler,
}

impl SystemSchedulerInterface for PoolSystemScheduler {
    fn resource_id(&self) -> ResourceId {
        self.pool_scheduler.id()
    }

    fn forward_progress_guarantee(&self) -> ForwardProgressGuarantee {
        self.pool_scheduler.forward_progress_guarantee()
    }

    fn schedule(&self) -> Box<dyn SystemSenderInterface> {
        Box::new(PoolSystemSender {
            scheduler: self.clone(),
            pool_sender: self.pool_scheduler.schedule(),
        })
    }

    fn bulk(&self, shape: BulkShape, f: BulkFunction) -> Box<dyn SystemSenderInterface> {
        Box::new(PoolSystemSender {
            scheduler: self.clone(),
            pool_sender: self.pool_scheduler.bulk(shape, move |idx| f(idx)),
        })
    }

    fn clone_box(&self) -> Box<dyn SystemSchedulerInterface> {
        Box::new(self.clone())
    }
}

/// Wraps one of the pool's generic senders (single or bulk).
struct PoolSystemSender<S> {
    scheduler: PoolSystemScheduler,
    pool_sender: S,
}

impl<S> SystemSenderInterface for PoolSystemSender<S>
where
    S: Sender + 'static,
    S::Operation<BridgeReceiver>: 'static,
{
    fn connect(self: Box<Self>, receiver: ReceiverBridge) -> Box<dyn SystemOperationStateInterface> {
        let this = *self;
        let op = this.pool_sender.connect(BridgeReceiver { bridge: receiver });
        Box::new(PoolSystemOperation { op })
    }

    fn completion_scheduler(&self) -> Box<dyn SystemSchedulerInterface> {
        self.scheduler.clone_box()
    }
}

struct PoolSystemOperation<O> {
    op: O,
}

impl<O: OperationState> SystemOperationStateInterface for PoolSystemOperation<O> {
    fn start(&mut self) {
        self.op.start();
    }
}

/// Receives the pool sender's completion and forwards it through the bridge.
struct BridgeReceiver {
    bridge: ReceiverBridge,
}

impl Receiver for BridgeReceiver {
    fn set_value(self) {
        tracing::trace!("forwarding value completion");
        self.bridge.set_value();
    }

    fn set_stopped(self) {
        tracing::trace!("forwarding stopped completion");
        self.bridge.set_stopped();
    }
}
