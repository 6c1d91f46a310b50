// worker thread loop
use super::cpu_pool::PoolShared;
use super::task::Task;
use crate::util::Backoff;
use crossbeam_deque::{Injector, Steal, Stealer, Worker as WorkerQueue};
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;
use std::time::Duration;

pub type WorkerId = usize;

const IDLE_PARK: Duration = Duration::from_micros(100);

pub(crate) struct Worker {
    pub id: WorkerId,
    pub local_queue: WorkerQueue<Task>,
    tasks_executed: AtomicU64,
    tasks_stolen: AtomicU64,
}

impl Worker {
    pub fn new(id: WorkerId) -> Self {
        Self {
            id,
            local_queue: WorkerQueue::new_fifo(),
            tasks_executed: AtomicU64::new(0),
            tasks_stolen: AtomicU64::new(0),
        }
    }

    // main loop
    pub fn run(&self, shared: &PoolShared, stealers: &[Stealer<Task>]) {
        let mut backoff = Backoff::new();

        loop {
            if shared.is_shutdown() {
                break;
            }

            // local -> global -> steal
            if let Some(task) = self.find_task(stealers, shared.injector()) {
                backoff.reset();
                self.execute_task(task, shared);
            } else if backoff.should_park() {
                thread::park_timeout(IDLE_PARK);
            } else {
                backoff.snooze();
            }
        }

        // anything still in our deque would otherwise be dropped unsignalled
        while let Some(task) = self.local_queue.pop() {
            shared.cancel_task(task);
        }

        tracing::debug!(
            worker = self.id,
            executed = self.tasks_executed.load(Ordering::Relaxed),
            stolen = self.tasks_stolen.load(Ordering::Relaxed),
            "worker exiting"
        );
    }

    fn find_task(&self, stealers: &[Stealer<Task>], injector: &Injector<Task>) -> Option<Task> {
        if let Some(task) = self.local_queue.pop() {
            return Some(task);
        }

        loop {
            match injector.steal_batch_and_pop(&self.local_queue) {
                Steal::Success(task) => return Some(task),
                Steal::Empty => break,
                Steal::Retry => continue,
            }
        }

        self.try_steal_from_workers(stealers)
    }

    fn try_steal_from_workers(&self, stealers: &[Stealer<Task>]) -> Option<Task> {
        use rand::seq::SliceRandom;
        use rand::thread_rng;

        if stealers.len() <= 1 {
            return None;
        }

        let mut indices: Vec<usize> = (0..stealers.len()).collect();
        indices.shuffle(&mut thread_rng());

        for &idx in &indices {
            if idx == self.id {
                continue;
            }

            loop {
                match stealers[idx].steal_batch_and_pop(&self.local_queue) {
                    Steal::Success(task) => {
                        self.tasks_stolen.fetch_add(1, Ordering::Relaxed);
                        return Some(task);
                    }
                    Steal::Empty => break,
                    Steal::Retry => continue,
                }
            }
        }

        None
    }

    fn execute_task(&self, task: Task, shared: &PoolShared) {
        let tid = task.id;
        tracing::trace!(worker = self.id, task = ?tid, "running task");

        if !shared.panic_handler().contain(|| task.execute()) {
            tracing::debug!(worker = self.id, task = ?tid, "task panicked");
        }

        shared.task_finished();
        self.tasks_executed.fetch_add(1, Ordering::Relaxed);
    }
}
