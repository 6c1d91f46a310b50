use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, ThreadId};
use std::time::Duration;
use system_context::executor::ResourceId;
use system_context::prelude::*;
use system_context::system::{
    BulkFunction, BulkShape, SystemContextInterface, SystemOperationStateInterface,
    SystemSchedulerInterface, SystemSenderInterface,
};

fn context(threads: usize) -> SystemContext {
    let config = Config::builder()
        .num_threads(threads)
        .thread_name_prefix("it-worker")
        .panic_strategy(PanicStrategy::Isolate)
        .build()
        .unwrap();
    SystemContext::with_config(config).unwrap()
}

#[test]
fn test_simple_schedule_task_on_system_context() {
    let this_id = thread::current().id();
    let pool_id: Arc<Mutex<Option<ThreadId>>> = Arc::new(Mutex::new(None));

    let ctx = SystemContext::new().unwrap();
    let sched = ctx.get_scheduler();

    let p = pool_id.clone();
    let snd = schedule(&sched).then(move || *p.lock() = Some(thread::current().id()));
    assert_eq!(sync_wait(snd), Some(()));

    let pool_id = pool_id.lock().expect("work recorded its thread");
    assert_ne!(pool_id, this_id);
}

#[test]
fn test_work_runs_on_named_pool_thread() {
    let ctx = context(2);
    let name = Arc::new(Mutex::new(String::new()));

    let n = name.clone();
    schedule(&ctx.get_scheduler())
        .then(move || *n.lock() = thread::current().name().unwrap_or("").to_string())
        .sync_wait()
        .unwrap();

    assert!(name.lock().starts_with("it-worker-"));
}

#[test]
fn test_forward_progress_guarantee() {
    let ctx = SystemContext::new().unwrap();
    let sched = ctx.get_scheduler();
    assert_eq!(
        get_forward_progress_guarantee(&sched),
        ForwardProgressGuarantee::Parallel
    );
}

#[test]
fn test_get_completion_scheduler() {
    let ctx = SystemContext::new().unwrap();
    let sched = ctx.get_scheduler();

    assert_eq!(
        get_completion_scheduler(&schedule(&sched), CompletionSignal::Value),
        sched
    );
    assert_eq!(
        get_completion_scheduler(&schedule(&sched), CompletionSignal::Stopped),
        sched
    );

    // survives composition
    let composed = schedule(&sched).then(|| {});
    assert_eq!(
        get_completion_scheduler(&composed, CompletionSignal::Value),
        sched
    );
}

#[test]
fn test_schedulers_compare_by_resource() {
    let ctx = context(1);
    let other = context(1);

    let s1 = ctx.get_scheduler();
    let s2 = ctx.get_scheduler();
    assert_eq!(s1, s2);
    assert_ne!(s1, other.get_scheduler());
}

#[test]
fn test_concurrent_get_scheduler() {
    let ctx = Arc::new(context(2));
    let reference = ctx.get_scheduler();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let ctx = ctx.clone();
            thread::spawn(move || ctx.get_scheduler())
        })
        .collect();

    for h in handles {
        assert_eq!(h.join().unwrap(), reference);
    }
}

#[test]
fn test_bulk_records_every_index_once() {
    let ctx = context(4);

    for n in [0usize, 1, 3, 64, 1000] {
        let seen = Arc::new(Mutex::new(Vec::with_capacity(n)));
        let s = seen.clone();

        let result = ctx
            .get_scheduler()
            .bulk(n, move |i| s.lock().push(i))
            .sync_wait();

        assert_eq!(result, Some(()));
        let mut seen = seen.lock().clone();
        assert_eq!(seen.len(), n);
        seen.sort_unstable();
        seen.dedup();
        assert_eq!(seen, (0..n).collect::<Vec<_>>());
    }
}

#[test]
fn test_bulk_completion_happens_after_all_invocations() {
    let ctx = context(4);
    let finished = Arc::new(AtomicUsize::new(0));
    let observed = Arc::new(AtomicUsize::new(usize::MAX));

    let f = finished.clone();
    let o = observed.clone();
    let f2 = finished.clone();
    ctx.get_scheduler()
        .bulk(32, move |_| {
            thread::sleep(Duration::from_millis(2));
            f.fetch_add(1, Ordering::SeqCst);
        })
        .then(move || o.store(f2.load(Ordering::SeqCst), Ordering::SeqCst))
        .sync_wait()
        .unwrap();

    assert_eq!(observed.load(Ordering::SeqCst), 32);
}

#[test]
fn test_bulk_uses_pool_threads_only() {
    let ctx = context(4);
    let threads = Arc::new(Mutex::new(HashSet::new()));

    let t = threads.clone();
    ctx.get_scheduler()
        .bulk(200, move |_| {
            t.lock().insert(thread::current().id());
        })
        .sync_wait()
        .unwrap();

    let threads = threads.lock();
    assert!(!threads.is_empty());
    assert!(threads.len() <= 4);
    assert!(!threads.contains(&thread::current().id()));
}

#[test]
fn test_failing_index_yields_stopped() {
    let ctx = context(2);
    let calls = Arc::new(AtomicUsize::new(0));

    let c = calls.clone();
    let result = ctx
        .get_scheduler()
        .bulk(16, move |i| {
            c.fetch_add(1, Ordering::SeqCst);
            assert_ne!(i, 7, "index 7 rejected");
        })
        .sync_wait();

    assert_eq!(result, None);
    assert_eq!(calls.load(Ordering::SeqCst), 16);

    // the pool keeps working afterwards
    assert_eq!(schedule(&ctx.get_scheduler()).sync_wait(), Some(()));
}

/// Counts value and stopped signals separately.
struct Tally {
    values: Arc<AtomicUsize>,
    stops: Arc<AtomicUsize>,
}

impl Receiver for Tally {
    fn set_value(self) {
        self.values.fetch_add(1, Ordering::SeqCst);
    }

    fn set_stopped(self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
    }
}

fn wait_for_signal(values: &AtomicUsize, stops: &AtomicUsize) {
    for _ in 0..500 {
        if values.load(Ordering::SeqCst) + stops.load(Ordering::SeqCst) > 0 {
            return;
        }
        thread::sleep(Duration::from_millis(10));
    }
}

#[test]
fn test_panicking_continuation_completes_stopped_once() {
    let ctx = context(2);
    let values = Arc::new(AtomicUsize::new(0));
    let stops = Arc::new(AtomicUsize::new(0));

    let mut op = schedule(&ctx.get_scheduler())
        .then(|| panic!("continuation failed"))
        .connect(Tally {
            values: values.clone(),
            stops: stops.clone(),
        });
    op.start();

    wait_for_signal(&values, &stops);
    thread::sleep(Duration::from_millis(50));
    assert_eq!(values.load(Ordering::SeqCst), 0);
    assert_eq!(stops.load(Ordering::SeqCst), 1);

    assert_eq!(schedule(&ctx.get_scheduler()).sync_wait(), Some(()));
}

#[test]
fn test_panicking_receiver_is_contained() {
    struct Exploding(Arc<AtomicUsize>);

    impl Receiver for Exploding {
        fn set_value(self) {
            self.0.fetch_add(1, Ordering::SeqCst);
            panic!("receiver failed");
        }

        fn set_stopped(self) {
            panic!("receiver failed");
        }
    }

    let ctx = context(1);
    let calls = Arc::new(AtomicUsize::new(0));

    for _ in 0..3 {
        let mut op = schedule(&ctx.get_scheduler()).connect(Exploding(calls.clone()));
        op.start();
    }

    // single worker: this runs after all three receivers
    assert_eq!(schedule(&ctx.get_scheduler()).sync_wait(), Some(()));
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[test]
fn test_receiver_panic_does_not_reach_backend() {
    struct Exploding;

    impl Receiver for Exploding {
        fn set_value(self) {
            panic!("receiver failed");
        }

        fn set_stopped(self) {
            panic!("receiver failed");
        }
    }

    // what a backend does on its own thread: signal the bridge it was handed
    let bridge = ReceiverBridge::new(Exploding);
    let backend_thread = thread::spawn(move || bridge.set_value());
    assert!(backend_thread.join().is_ok());

    let bridge = ReceiverBridge::new(Exploding);
    let backend_thread = thread::spawn(move || bridge.set_stopped());
    assert!(backend_thread.join().is_ok());
}

#[test]
fn test_unstarted_operation_never_signals() {
    struct Flag(Arc<AtomicUsize>);

    impl Receiver for Flag {
        fn set_value(self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }

        fn set_stopped(self) {
            self.0.fetch_add(100, Ordering::SeqCst);
        }
    }

    let ctx = context(2);
    let signals = Arc::new(AtomicUsize::new(0));

    let op = schedule(&ctx.get_scheduler()).connect(Flag(signals.clone()));
    let bulk_op = ctx
        .get_scheduler()
        .bulk(10, |_| {})
        .connect(Flag(signals.clone()));
    drop(op);
    drop(bulk_op);

    thread::sleep(Duration::from_millis(50));
    assert_eq!(signals.load(Ordering::SeqCst), 0);
    assert_eq!(Arc::strong_count(&signals), 1);
}

#[test]
fn test_dropping_context_stops_outstanding_work() {
    let sched = context(1).get_scheduler();
    assert_eq!(schedule(&sched).sync_wait(), None);
    assert_eq!(sched.bulk(8, |_| {}).sync_wait(), None);
}

// Alternative backend: one OS thread per unit of work.

struct ThreadPerTask {
    id: ResourceId,
}

#[derive(Clone)]
struct ThreadPerTaskScheduler {
    id: ResourceId,
}

struct ThreadPerTaskSender {
    scheduler: ThreadPerTaskScheduler,
    bulk: Option<(BulkShape, BulkFunction)>,
}

struct ThreadPerTaskOperation {
    receiver: Option<ReceiverBridge>,
    bulk: Option<(BulkShape, BulkFunction)>,
}

impl SystemContextInterface for ThreadPerTask {
    fn get_scheduler(&self) -> Box<dyn SystemSchedulerInterface> {
        Box::new(ThreadPerTaskScheduler { id: self.id })
    }
}

impl SystemSchedulerInterface for ThreadPerTaskScheduler {
    fn resource_id(&self) -> ResourceId {
        self.id
    }

    fn forward_progress_guarantee(&self) -> ForwardProgressGuarantee {
        ForwardProgressGuarantee::Parallel
    }

    fn schedule(&self) -> Box<dyn SystemSenderInterface> {
        Box::new(ThreadPerTaskSender {
            scheduler: self.clone(),
            bulk: None,
        })
    }

    fn bulk(&self, shape: BulkShape, f: BulkFunction) -> Box<dyn SystemSenderInterface> {
        Box::new(ThreadPerTaskSender {
            scheduler: self.clone(),
            bulk: Some((shape, f)),
        })
    }

    fn clone_box(&self) -> Box<dyn SystemSchedulerInterface> {
        Box::new(self.clone())
    }
}

impl SystemSenderInterface for ThreadPerTaskSender {
    fn connect(
        self: Box<Self>,
        receiver: ReceiverBridge,
    ) -> Box<dyn SystemOperationStateInterface> {
        Box::new(ThreadPerTaskOperation {
            receiver: Some(receiver),
            bulk: self.bulk,
        })
    }

    fn completion_scheduler(&self) -> Box<dyn SystemSchedulerInterface> {
        self.scheduler.clone_box()
    }
}

impl SystemOperationStateInterface for ThreadPerTaskOperation {
    fn start(&mut self) {
        let Some(receiver) = self.receiver.take() else {
            return;
        };
        let bulk = self.bulk.take();

        thread::spawn(move || {
            if let Some((shape, f)) = bulk {
                (0..shape).for_each(|i| f(i));
            }
            receiver.set_value();
        });
    }
}

#[test]
fn test_pluggable_backend() {
    let ctx = SystemContext::with_backend(ThreadPerTask {
        id: ResourceId::next(),
    });
    let sched = ctx.get_scheduler();
    assert_eq!(sched, ctx.get_scheduler());

    let caller = thread::current().id();
    let ran_on = Arc::new(Mutex::new(None));
    let r = ran_on.clone();
    schedule(&sched)
        .then(move || *r.lock() = Some(thread::current().id()))
        .sync_wait()
        .unwrap();
    assert_ne!(ran_on.lock().expect("ran"), caller);

    let sum = Arc::new(AtomicUsize::new(0));
    let s = sum.clone();
    sched
        .bulk(10, move |i| {
            s.fetch_add(i, Ordering::SeqCst);
        })
        .sync_wait()
        .unwrap();
    assert_eq!(sum.load(Ordering::SeqCst), 45);

    let pool_ctx = context(1);
    assert_ne!(sched, pool_ctx.get_scheduler());
}
