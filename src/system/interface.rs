//! Object-safe interfaces behind the public system handles.
//!
//! A backend implements these four traits; [`SystemContext`](super::SystemContext)
//! and the handles derived from it only ever talk to trait objects, so
//! swapping the execution engine never changes a public type.

use super::receiver::ReceiverBridge;
use crate::exec::ForwardProgressGuarantee;
use crate::executor::ResourceId;
use std::sync::Arc;

/// Extent of a bulk launch: indices `0..shape` are invoked.
pub type BulkShape = usize;

/// Type-erased index function shared by every worker of a bulk launch.
pub type BulkFunction = Arc<dyn Fn(BulkShape) + Send + Sync>;

pub trait SystemContextInterface: Send + Sync {
    fn get_scheduler(&self) -> Box<dyn SystemSchedulerInterface>;
}

pub trait SystemSchedulerInterface: Send + Sync {
    /// Identity of the execution resource this scheduler submits to.
    fn resource_id(&self) -> ResourceId;

    fn forward_progress_guarantee(&self) -> ForwardProgressGuarantee;

    fn schedule(&self) -> Box<dyn SystemSenderInterface>;

    fn bulk(&self, shape: BulkShape, f: BulkFunction) -> Box<dyn SystemSenderInterface>;

    fn clone_box(&self) -> Box<dyn SystemSchedulerInterface>;

    /// Identity comparison: same resource instance, regardless of handle.
    fn equals(&self, other: &dyn SystemSchedulerInterface) -> bool {
        self.resource_id() == other.resource_id()
    }
}

pub trait SystemSenderInterface: Send {
    /// Binds the work to `receiver` without starting it.
    fn connect(self: Box<Self>, receiver: ReceiverBridge) -> Box<dyn SystemOperationStateInterface>;

    fn completion_scheduler(&self) -> Box<dyn SystemSchedulerInterface>;
}

pub trait SystemOperationStateInterface: Send {
    /// Submits the work. Returns immediately; the bridge is signalled later
    /// from the resource.
    fn start(&mut self);
}
