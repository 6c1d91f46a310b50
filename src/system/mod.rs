//! Type-erased system scheduler.
//!
//! [`SystemContext`] vends [`SystemScheduler`] handles; schedulers produce
//! [`SystemSender`] and [`SystemBulkSender`] values; connecting either to any
//! [`Receiver`](crate::exec::Receiver) yields a [`SystemOperation`]. None of
//! these types is generic over the receiver or the execution engine: the
//! receiver crosses the boundary as a [`ReceiverBridge`], the engine sits
//! behind the traits in [`interface`].
//!
//! ```no_run
//! use system_context::prelude::*;
//!
//! let ctx = SystemContext::new().unwrap();
//! let sched = ctx.get_scheduler();
//!
//! let ran = schedule(&sched)
//!     .then(|| println!("on {:?}", std::thread::current().id()))
//!     .sync_wait();
//! assert_eq!(ran, Some(()));
//! ```

pub mod bulk;
pub mod context;
pub mod interface;
mod pool_impl;
pub mod receiver;
pub mod scheduler;
pub mod sender;

pub use bulk::{ChainedBulkReceiver, ChainedBulkSender, SystemBulkSender};
pub use context::SystemContext;
pub use interface::{
    BulkFunction, BulkShape, SystemContextInterface, SystemOperationStateInterface,
    SystemSchedulerInterface, SystemSenderInterface,
};
pub use receiver::ReceiverBridge;
pub use scheduler::SystemScheduler;
pub use sender::{SystemOperation, SystemSender};
