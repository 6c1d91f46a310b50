use super::{CompletionScheduler, CompletionSignal, Receiver, Sender};
use std::panic::{catch_unwind, resume_unwind, AssertUnwindSafe};

/// Sender returned by [`SenderExt::then`](super::SenderExt::then).
#[derive(Debug)]
pub struct Then<S, F> {
    sender: S,
    f: F,
}

impl<S, F> Then<S, F> {
    pub(crate) fn new(sender: S, f: F) -> Self {
        Self { sender, f }
    }
}

impl<S, F> Sender for Then<S, F>
where
    S: Sender,
    F: FnOnce() + Send + 'static,
{
    type Operation<R: Receiver> = S::Operation<ThenReceiver<F, R>>;

    fn connect<R: Receiver>(self, receiver: R) -> Self::Operation<R> {
        self.sender.connect(ThenReceiver {
            f: self.f,
            downstream: receiver,
        })
    }
}

impl<S, F> CompletionScheduler for Then<S, F>
where
    S: CompletionScheduler,
{
    type Scheduler = S::Scheduler;

    fn completion_scheduler(&self, signal: CompletionSignal) -> Self::Scheduler {
        self.sender.completion_scheduler(signal)
    }
}

#[derive(Debug)]
pub struct ThenReceiver<F, R> {
    f: F,
    downstream: R,
}

impl<F, R> Receiver for ThenReceiver<F, R>
where
    F: FnOnce() + Send + 'static,
    R: Receiver,
{
    /// A panicking continuation completes downstream with stopped, then
    /// resumes the unwind so the executing thread's panic policy applies.
    fn set_value(self) {
        let Self { f, downstream } = self;
        match catch_unwind(AssertUnwindSafe(f)) {
            Ok(()) => downstream.set_value(),
            Err(payload) => {
                downstream.set_stopped();
                resume_unwind(payload);
            }
        }
    }

    fn set_stopped(self) {
        self.downstream.set_stopped();
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::exec::{OperationState, Scheduler, SenderExt};
    use crate::executor::{CpuPool, PanicStrategy};
    use crossbeam_channel::{bounded, Sender as ChannelSender};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    struct Outcome {
        tx: ChannelSender<CompletionSignal>,
    }

    impl Receiver for Outcome {
        fn set_value(self) {
            self.tx.send(CompletionSignal::Value).unwrap();
        }

        fn set_stopped(self) {
            self.tx.send(CompletionSignal::Stopped).unwrap();
        }
    }

    fn single_worker_pool() -> CpuPool {
        let config = Config::builder()
            .num_threads(1)
            .panic_strategy(PanicStrategy::Isolate)
            .build()
            .unwrap();
        CpuPool::new(&config).unwrap()
    }

    #[test]
    fn test_continuation_runs_before_value() {
        let pool = single_worker_pool();
        let ran = Arc::new(AtomicBool::new(false));
        let (tx, rx) = bounded(2);

        let r = ran.clone();
        let mut op = pool
            .scheduler()
            .schedule()
            .then(move || r.store(true, Ordering::SeqCst))
            .connect(Outcome { tx });
        op.start();

        assert_eq!(rx.recv_timeout(Duration::from_secs(5)).unwrap(), CompletionSignal::Value);
        assert!(ran.load(Ordering::SeqCst));
    }

    #[test]
    fn test_panicking_continuation_completes_stopped_once() {
        let pool = single_worker_pool();
        let (tx, rx) = bounded(2);

        let mut op = pool
            .scheduler()
            .schedule()
            .then(|| panic!("continuation failed"))
            .connect(Outcome { tx });
        op.start();

        assert_eq!(rx.recv_timeout(Duration::from_secs(5)).unwrap(), CompletionSignal::Stopped);
        assert!(rx.recv_timeout(Duration::from_millis(100)).is_err());

        // the single worker survived and the panic went through the pool policy
        assert_eq!(pool.scheduler().schedule().sync_wait(), Some(()));
        assert_eq!(pool.panic_count(), 1);
    }
}
