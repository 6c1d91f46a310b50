use super::interface::SystemContextInterface;
use super::pool_impl::PoolSystemContext;
use super::scheduler::SystemScheduler;
use crate::config::Config;
use crate::error::Result;
use std::fmt;

/// Owner of one execution resource and vendor of schedulers bound to it.
///
/// The default backend is a [`CpuPool`](crate::executor::CpuPool) created
/// here and shut down when the context is dropped. Schedulers obtained from
/// the context stay comparable after that, but any work started through
/// them once the context is gone completes with stopped.
pub struct SystemContext {
    inner: Box<dyn SystemContextInterface>,
}

impl SystemContext {
    /// Context over a worker pool sized to the machine.
    pub fn new() -> Result<Self> {
        Self::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> Result<Self> {
        let backend = PoolSystemContext::new(&config)?;
        tracing::debug!(threads = config.worker_threads(), "system context created");
        Ok(Self {
            inner: Box::new(backend),
        })
    }

    /// Context over an alternative execution engine.
    pub fn with_backend<B>(backend: B) -> Self
    where
        B: SystemContextInterface + 'static,
    {
        Self {
            inner: Box::new(backend),
        }
    }

    /// A fresh scheduler handle. Handles from the same context compare equal.
    pub fn get_scheduler(&self) -> SystemScheduler {
        SystemScheduler::from_interface(self.inner.get_scheduler())
    }
}

impl fmt::Debug for SystemContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SystemContext")
            .field("resource", &self.get_scheduler().resource_id())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::{Scheduler, SenderExt};

    fn context() -> SystemContext {
        SystemContext::with_config(Config::builder().num_threads(2).build().unwrap()).unwrap()
    }

    #[test]
    fn test_schedulers_from_one_context_are_equal() {
        let ctx = context();
        let a = ctx.get_scheduler();
        let b = ctx.get_scheduler();
        assert_eq!(a, b);
        assert_eq!(b, a);
    }

    #[test]
    fn test_schedulers_from_different_contexts_differ() {
        let a = context().get_scheduler();
        let b = context().get_scheduler();
        assert_ne!(a, b);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = Config {
            num_threads: Some(0),
            ..Config::default()
        };
        assert!(SystemContext::with_config(config).is_err());
    }

    #[test]
    fn test_work_after_context_drop_stops() {
        let ctx = context();
        let sched = ctx.get_scheduler();
        drop(ctx);

        assert_eq!(sched.schedule().sync_wait(), None);
        assert_eq!(sched, sched.clone());
    }
}
