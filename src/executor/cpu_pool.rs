use super::panic_handler::PanicHandler;
use super::sender::PoolScheduler;
use super::task::Task;
use super::worker::{Worker, WorkerId};
use crate::config::Config;
use crate::error::{Error, Result};
use crossbeam_deque::{Injector, Steal};
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

static RESOURCE_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Identity of one execution resource instance.
///
/// Allocated once per pool and never reused within a process, so two handles
/// compare equal exactly when they refer to the same pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceId(u64);

impl ResourceId {
    /// Allocates a fresh identity. Alternative backends use this to mint
    /// their own token.
    pub fn next() -> Self {
        ResourceId(RESOURCE_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

#[cfg(target_os = "linux")]
fn pin_thread_to_core(core_id: usize) {
    let core_id = core_id % num_cpus::get().max(1);
    unsafe {
        let mut cpuset: libc::cpu_set_t = std::mem::zeroed();
        libc::CPU_SET(core_id, &mut cpuset);
        let result = libc::sched_setaffinity(
            0, // current thread
            std::mem::size_of::<libc::cpu_set_t>(),
            &cpuset,
        );
        if result != 0 {
            let current = thread::current();
            tracing::warn!(
                thread = current.name().unwrap_or("unknown"),
                core_id,
                "failed to pin worker thread"
            );
        }
    }
}

/// State shared between the pool owner, its workers and every scheduler
/// handle derived from it.
pub(crate) struct PoolShared {
    id: ResourceId,
    injector: Injector<Task>,
    shutdown: AtomicBool,
    pending_tasks: AtomicUsize,
    unparkers: RwLock<Vec<thread::Thread>>,
    next_wake: AtomicUsize,
    panic_handler: PanicHandler,
    num_threads: usize,
}

impl PoolShared {
    pub(crate) fn id(&self) -> ResourceId {
        self.id
    }

    pub(crate) fn num_threads(&self) -> usize {
        self.num_threads
    }

    pub(crate) fn injector(&self) -> &Injector<Task> {
        &self.injector
    }

    pub(crate) fn panic_handler(&self) -> &PanicHandler {
        &self.panic_handler
    }

    pub(crate) fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Acquire)
    }

    /// Queues `task` for a worker. Once the pool is shut down the task is
    /// cancelled on the calling thread instead.
    pub(crate) fn submit(&self, task: Task) {
        if self.is_shutdown() {
            tracing::warn!(resource = ?self.id, task = ?task.id, "pool shut down, cancelling task");
            self.panic_handler.contain(|| task.cancel());
            return;
        }

        tracing::trace!(resource = ?self.id, task = ?task.id, "submit");
        self.pending_tasks.fetch_add(1, Ordering::Relaxed);
        self.injector.push(task);

        // raced with shutdown: the drain may already have run
        if self.is_shutdown() {
            self.cancel_queued();
            return;
        }

        self.wake_one();
    }

    fn wake_one(&self) {
        let unparkers = self.unparkers.read();
        if unparkers.is_empty() {
            return;
        }
        let idx = self.next_wake.fetch_add(1, Ordering::Relaxed) % unparkers.len();
        unparkers[idx].unpark();
    }

    fn wake_all(&self) {
        for unparker in self.unparkers.read().iter() {
            unparker.unpark();
        }
    }

    pub(crate) fn task_finished(&self) {
        self.pending_tasks.fetch_sub(1, Ordering::Relaxed);
    }

    pub(crate) fn cancel_task(&self, task: Task) {
        tracing::trace!(resource = ?self.id, task = ?task.id, "cancel");
        self.panic_handler.contain(|| task.cancel());
        self.task_finished();
    }

    /// Cancels everything left in the global queue.
    pub(crate) fn cancel_queued(&self) {
        loop {
            match self.injector.steal() {
                Steal::Success(task) => self.cancel_task(task),
                Steal::Empty => break,
                Steal::Retry => continue,
            }
        }
    }
}

/// Fixed-size work-stealing worker pool.
///
/// Dropping the pool stops its workers and cancels every task that never
/// ran, so each submitted task observes exactly one of run or cancel.
pub struct CpuPool {
    shared: Arc<PoolShared>,
    workers: Mutex<Vec<WorkerHandle>>,
}

struct WorkerHandle {
    id: WorkerId,
    thread: Option<JoinHandle<()>>,
}

impl CpuPool {
    pub fn new(config: &Config) -> Result<Self> {
        let num_threads = config.worker_threads();
        if num_threads == 0 {
            return Err(Error::config("need at least 1 thread"));
        }

        let shared = Arc::new(PoolShared {
            id: ResourceId::next(),
            injector: Injector::new(),
            shutdown: AtomicBool::new(false),
            pending_tasks: AtomicUsize::new(0),
            unparkers: RwLock::new(Vec::with_capacity(num_threads)),
            next_wake: AtomicUsize::new(0),
            panic_handler: PanicHandler::new(config.panic_strategy),
            num_threads,
        });

        let workers: Vec<Worker> = (0..num_threads).map(Worker::new).collect();
        let stealers: Vec<_> = workers.iter().map(|w| w.local_queue.stealer()).collect();

        // partially spawned pools are torn down by Drop on the error path
        let pool = Self {
            shared: shared.clone(),
            workers: Mutex::new(Vec::with_capacity(num_threads)),
        };

        for worker in workers {
            let id = worker.id;
            let stealers_clone = stealers.clone();
            let shared_clone = shared.clone();
            let name = format!("{}-{}", config.thread_name_prefix, id);

            let mut builder = thread::Builder::new().name(name);

            if let Some(stack_size) = config.stack_size {
                builder = builder.stack_size(stack_size);
            }

            let pin_workers = config.pin_workers;
            let thread = builder
                .spawn(move || {
                    #[cfg(target_os = "linux")]
                    if pin_workers {
                        pin_thread_to_core(id);
                    }
                    #[cfg(not(target_os = "linux"))]
                    let _ = pin_workers;

                    worker.run(&shared_clone, &stealers_clone);
                })
                .map_err(|e| Error::executor(format!("spawn failed: {}", e)))?;

            shared.unparkers.write().push(thread.thread().clone());
            pool.workers.lock().push(WorkerHandle {
                id,
                thread: Some(thread),
            });
        }

        tracing::debug!(resource = ?shared.id, num_threads, "worker pool started");

        Ok(pool)
    }

    pub fn id(&self) -> ResourceId {
        self.shared.id
    }

    /// Generic scheduler bound to this pool.
    pub fn scheduler(&self) -> PoolScheduler {
        PoolScheduler::new(self.shared.clone())
    }

    pub fn execute<F>(&self, f: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.shared.submit(Task::new(move |status| {
            if status == super::task::RunStatus::Running {
                f();
            }
        }));
    }

    pub fn pending_tasks(&self) -> usize {
        self.shared.pending_tasks.load(Ordering::Relaxed)
    }

    pub fn num_threads(&self) -> usize {
        self.shared.num_threads
    }

    pub fn panic_count(&self) -> usize {
        self.shared.panic_handler.panic_count()
    }

    pub fn is_shutdown(&self) -> bool {
        self.shared.is_shutdown()
    }

    /// Stops all workers and cancels queued work. Idempotent.
    pub fn shutdown(&self) {
        self.shared.shutdown.store(true, Ordering::Release);

        // wake everyone up to check shutdown flag
        self.shared.wake_all();

        let current = thread::current().id();
        let handles: Vec<WorkerHandle> = std::mem::take(&mut *self.workers.lock());
        for mut worker in handles {
            if let Some(thread) = worker.thread.take() {
                // shutting down from inside a callback: cannot join ourselves
                if thread.thread().id() == current {
                    continue;
                }
                if thread.join().is_err() {
                    tracing::warn!(worker = worker.id, "worker thread panicked");
                }
            }
        }

        self.shared.cancel_queued();
        tracing::debug!(resource = ?self.shared.id, "worker pool stopped");
    }
}

impl std::fmt::Debug for CpuPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CpuPool")
            .field("id", &self.shared.id)
            .field("num_threads", &self.shared.num_threads)
            .field("pending_tasks", &self.pending_tasks())
            .finish()
    }
}

impl Drop for CpuPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}
