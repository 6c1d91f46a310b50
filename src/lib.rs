//! System context: a non-generic scheduler boundary over a worker pool.
//!
//! Work is described by senders that, once connected to a receiver and
//! started, deliver exactly one completion signal (value or stopped). The
//! [`system`] module exposes that protocol through concrete handle types
//! ([`SystemContext`], [`SystemScheduler`], [`SystemSender`],
//! [`SystemOperation`]) so callers never depend on the engine's generic
//! types or on their own receiver type crossing the boundary.
//!
//! # Quick Start
//!
//! ```no_run
//! use system_context::prelude::*;
//!
//! let ctx = SystemContext::new().unwrap();
//! let sched = ctx.get_scheduler();
//!
//! // one unit of work on a pool worker
//! schedule(&sched).then(|| println!("hello from the pool")).sync_wait();
//!
//! // fan-out with a join barrier
//! let done = sched.bulk(1024, |i| { let _ = i * i; }).sync_wait();
//! assert_eq!(done, Some(()));
//!
//! // schedulers compare by resource identity
//! assert_eq!(sched, ctx.get_scheduler());
//! ```
//!
//! # Layout
//!
//! - [`exec`]: the generic sender/receiver protocol and the `then` /
//!   `sync_wait` adaptors
//! - [`executor`]: the work-stealing [`CpuPool`](executor::CpuPool) and its
//!   generic scheduler
//! - [`system`]: the type-erased handles and the pool-backed implementation

pub mod config;
pub mod error;
pub mod exec;
pub mod executor;
pub mod prelude;
pub mod system;
pub mod util;

pub use config::{Config, ConfigBuilder};
pub use error::{Error, Result};
pub use exec::{CompletionSignal, ForwardProgressGuarantee};
pub use system::{
    ReceiverBridge, SystemBulkSender, SystemContext, SystemOperation, SystemScheduler,
    SystemSender,
};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::{BulkScheduler, Scheduler, SenderExt};
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[test]
    fn test_schedule_then_sync_wait() {
        let ctx = SystemContext::with_config(Config::builder().num_threads(2).build().unwrap())
            .unwrap();
        let sched = ctx.get_scheduler();

        let this_id = std::thread::current().id();
        let pool_id = Arc::new(Mutex::new(None));

        let p = pool_id.clone();
        let snd = sched
            .schedule()
            .then(move || *p.lock() = Some(std::thread::current().id()));
        assert_eq!(snd.sync_wait(), Some(()));

        let pool_id = pool_id.lock().expect("continuation ran");
        assert_ne!(pool_id, this_id);
    }

    #[test]
    fn test_bulk_sum() {
        let ctx = SystemContext::with_config(Config::builder().num_threads(4).build().unwrap())
            .unwrap();
        let total = Arc::new(Mutex::new(0usize));

        let t = total.clone();
        ctx.get_scheduler()
            .bulk(100, move |i| *t.lock() += i)
            .sync_wait()
            .unwrap();

        assert_eq!(*total.lock(), 4950);
    }
}
