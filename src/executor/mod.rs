//! The execution resource.
//!
//! [`CpuPool`] owns a fixed set of worker threads fed by a global injector
//! and per-worker work-stealing deques. [`PoolScheduler`] is its generic
//! scheduler: senders produced by it complete on a pool worker, or complete
//! with stopped if the pool shuts down before they run.

pub mod bulk;
pub mod cpu_pool;
pub mod panic_handler;
pub mod sender;
pub mod task;
pub mod worker;

pub use bulk::{PoolBulkOperation, PoolBulkSender};
pub use cpu_pool::{CpuPool, ResourceId};
pub use panic_handler::{PanicHandler, PanicStrategy};
pub use sender::{PoolOperation, PoolScheduler, PoolSender};
