use super::bulk::{ChainedBulkSender, SystemBulkSender};
use super::interface::{BulkShape, SystemSchedulerInterface};
use super::sender::SystemSender;
use crate::exec::{BulkScheduler, ForwardProgressGuarantee, Scheduler, Sender};
use crate::executor::ResourceId;
use std::fmt;
use std::sync::Arc;

/// Non-generic scheduler handle.
///
/// Equality is identity of the underlying execution resource: two handles
/// are equal exactly when they submit to the same resource instance.
pub struct SystemScheduler {
    inner: Box<dyn SystemSchedulerInterface>,
}

impl SystemScheduler {
    pub fn from_interface(inner: Box<dyn SystemSchedulerInterface>) -> Self {
        Self { inner }
    }

    pub fn resource_id(&self) -> ResourceId {
        self.inner.resource_id()
    }

    pub(crate) fn interface(&self) -> &dyn SystemSchedulerInterface {
        &*self.inner
    }

    /// Runs `f` over `0..shape` once `predecessor` completes with value.
    ///
    /// A stopped predecessor is forwarded without invoking `f`.
    pub fn bulk_after<P, F>(&self, predecessor: P, shape: BulkShape, f: F) -> ChainedBulkSender<P>
    where
        P: Sender,
        F: Fn(BulkShape) + Send + Sync + 'static,
    {
        ChainedBulkSender::new(self.clone(), predecessor, shape, Arc::new(f))
    }
}

impl Clone for SystemScheduler {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone_box(),
        }
    }
}

impl PartialEq for SystemScheduler {
    fn eq(&self, other: &Self) -> bool {
        self.inner.equals(&*other.inner)
    }
}

impl Eq for SystemScheduler {}

impl fmt::Debug for SystemScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SystemScheduler")
            .field("resource", &self.resource_id())
            .finish()
    }
}

impl Scheduler for SystemScheduler {
    type Sender = SystemSender;

    fn schedule(&self) -> SystemSender {
        SystemSender::new(self.inner.schedule())
    }

    fn forward_progress_guarantee(&self) -> ForwardProgressGuarantee {
        self.inner.forward_progress_guarantee()
    }
}

impl BulkScheduler for SystemScheduler {
    type BulkSender<F> = SystemBulkSender
    where
        F: Fn(usize) + Send + Sync + 'static;

    fn bulk<F>(&self, shape: usize, f: F) -> SystemBulkSender
    where
        F: Fn(usize) + Send + Sync + 'static,
    {
        SystemBulkSender::new(self.inner.bulk(shape, Arc::new(f)), shape)
    }
}
