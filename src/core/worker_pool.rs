//! Fixed-size worker pool over a blocking queue.
//!
//! Workers are dedicated OS threads spawned eagerly at construction. Every
//! wakeup is gated by the pool's [`Semaphore`]: submission signals once per
//! task, shutdown signals once per worker, and no thread ever spins waiting
//! for work to appear.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use parking_lot::Mutex;
use tracing::{debug, error, info, warn};

use crate::blocking_queue::BlockingQueue;
use crate::config::PoolConfig;
use crate::semaphore::Semaphore;

use super::error::PoolError;
use super::task::{Task, TaskHandle, TaskOutcome};

/// Statistics about pool utilization.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Number of worker threads.
    pub worker_count: usize,
    /// Tasks waiting in the queue at snapshot time.
    pub queued_tasks: u64,
    /// Total tasks accepted by `submit`.
    pub submitted_tasks: u64,
    /// Total tasks whose body returned normally.
    pub completed_tasks: u64,
    /// Total tasks whose body panicked.
    pub panicked_tasks: u64,
}

/// Lock-free counters behind [`PoolStats`].
#[derive(Debug, Default)]
struct PoolCounters {
    queued: AtomicU64,
    submitted: AtomicU64,
    completed: AtomicU64,
    panicked: AtomicU64,
}

impl PoolCounters {
    fn snapshot(&self, worker_count: usize) -> PoolStats {
        PoolStats {
            worker_count,
            queued_tasks: self.queued.load(Ordering::Relaxed),
            submitted_tasks: self.submitted.load(Ordering::Relaxed),
            completed_tasks: self.completed.load(Ordering::Relaxed),
            panicked_tasks: self.panicked.load(Ordering::Relaxed),
        }
    }
}

/// State shared between the pool handle and its worker threads.
struct PoolShared {
    queue: BlockingQueue<Task>,
    semaphore: Semaphore,
    shutdown: AtomicBool,
    counters: PoolCounters,
}

/// A fixed set of worker threads executing type-erased tasks in FIFO order.
///
/// Construction spawns all workers eagerly, sized by default to available
/// hardware parallelism (minimum 1). If any worker thread cannot be created,
/// the pool transitions to a permanently unusable state: already-spawned
/// workers are stopped and every later [`submit`](Self::submit) returns
/// [`PoolError::Unusable`] instead of accepting work that would never run.
///
/// Dequeue order is strict FIFO; with more than one worker, overall
/// completion order is still unordered because tasks run concurrently.
///
/// # Examples
///
/// ```
/// use delay_pool::WorkerPool;
///
/// let pool = WorkerPool::new();
/// let handle = pool.submit(|| 2 + 2).unwrap();
/// assert_eq!(handle.get().unwrap(), 4);
/// ```
pub struct WorkerPool {
    shared: Arc<PoolShared>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    worker_count: usize,
    unusable: bool,
}

impl WorkerPool {
    /// Creates a pool sized to available hardware parallelism.
    #[must_use]
    pub fn new() -> Self {
        Self::from_config(PoolConfig::default())
    }

    /// Creates a pool from an explicit configuration.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::InvalidConfig`] if the configuration fails
    /// validation.
    pub fn with_config(config: PoolConfig) -> Result<Self, PoolError> {
        config.validate().map_err(PoolError::InvalidConfig)?;
        Ok(Self::from_config(config))
    }

    fn from_config(config: PoolConfig) -> Self {
        let shared = Arc::new(PoolShared {
            queue: BlockingQueue::new(),
            semaphore: Semaphore::new(0),
            shutdown: AtomicBool::new(false),
            counters: PoolCounters::default(),
        });

        let mut workers = Vec::with_capacity(config.worker_count);
        let mut spawn_failed = false;

        for worker_id in 0..config.worker_count {
            match spawn_worker(worker_id, Arc::clone(&shared), config.thread_stack_size) {
                Ok(handle) => workers.push(handle),
                Err(e) => {
                    error!(worker_id = worker_id, error = %e, "failed to spawn worker thread");
                    spawn_failed = true;
                    break;
                }
            }
        }

        if spawn_failed {
            // Stop whatever did spawn; the pool is permanently unusable.
            shared.shutdown.store(true, Ordering::Release);
            for _ in 0..workers.len() {
                shared.semaphore.notify();
            }
            for worker in workers.drain(..) {
                if worker.join().is_err() {
                    warn!("worker thread panicked during construction rollback");
                }
            }
            warn!("worker pool marked unusable; submissions will fail fast");
        } else {
            info!(worker_count = config.worker_count, "worker pool started");
        }

        let worker_count = workers.len();
        Self {
            shared,
            workers: Mutex::new(workers),
            worker_count,
            unusable: spawn_failed,
        }
    }

    /// Wraps a closure into a task, enqueues it, and returns its handle
    /// immediately. Never blocks the submitter.
    ///
    /// The task body runs on some worker thread; a panic inside it is
    /// captured into the handle, never into the worker.
    ///
    /// # Errors
    ///
    /// - [`PoolError::Unusable`] if worker creation failed at construction.
    /// - [`PoolError::Shutdown`] if the pool has been shut down.
    pub fn submit<F, R>(&self, job: F) -> Result<TaskHandle<R>, PoolError>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        let (task, handle) = Task::new(job);
        self.submit_task(task)?;
        Ok(handle)
    }

    /// Enqueues an already-erased task and signals the semaphore exactly once.
    pub(crate) fn submit_task(&self, task: Task) -> Result<(), PoolError> {
        if self.unusable {
            return Err(PoolError::Unusable);
        }
        if self.shared.shutdown.load(Ordering::Acquire) {
            return Err(PoolError::Shutdown);
        }

        self.shared.queue.push(task);
        self.shared.counters.queued.fetch_add(1, Ordering::Relaxed);
        self.shared.counters.submitted.fetch_add(1, Ordering::Relaxed);
        self.shared.semaphore.notify();
        Ok(())
    }

    /// Number of worker threads (zero for an unusable pool).
    #[must_use]
    pub const fn worker_count(&self) -> usize {
        self.worker_count
    }

    /// Snapshot of the pool's counters.
    #[must_use]
    pub fn stats(&self) -> PoolStats {
        self.shared.counters.snapshot(self.worker_count)
    }

    /// Shuts the pool down and joins all workers. Idempotent.
    ///
    /// Tasks still in the queue are discarded without execution; their
    /// handles resolve to [`TaskError::Abandoned`](super::error::TaskError).
    pub fn shutdown(&self) {
        if self.shared.shutdown.swap(true, Ordering::AcqRel) {
            return;
        }

        info!("shutting down worker pool");

        let mut workers = self.workers.lock();
        // One signal per worker guarantees every sleeping worker wakes and
        // observes the flag.
        for _ in 0..workers.len() {
            self.shared.semaphore.notify();
        }
        for worker in workers.drain(..) {
            if worker.join().is_err() {
                warn!("worker thread panicked");
            }
        }

        debug!("worker pool shut down complete");
    }
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("worker_count", &self.worker_count)
            .field("unusable", &self.unusable)
            .finish()
    }
}

impl Default for WorkerPool {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Spawns one worker thread running the wait/dequeue/execute loop.
fn spawn_worker(
    worker_id: usize,
    shared: Arc<PoolShared>,
    stack_size: usize,
) -> std::io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name(format!("dp-worker-{worker_id}"))
        .stack_size(stack_size)
        .spawn(move || {
            debug!(worker_id = worker_id, "worker thread started");

            loop {
                // Each iteration consumes exactly one signal: either a task
                // was pushed or shutdown was requested.
                shared.semaphore.wait();
                if shared.shutdown.load(Ordering::Acquire) {
                    break;
                }

                if let Some(task) = shared.queue.try_pop() {
                    shared.counters.queued.fetch_sub(1, Ordering::Relaxed);
                    match task.run() {
                        TaskOutcome::Completed => {
                            shared.counters.completed.fetch_add(1, Ordering::Relaxed);
                        }
                        TaskOutcome::Panicked => {
                            warn!(worker_id = worker_id, "task panicked; worker continues");
                            shared.counters.panicked.fetch_add(1, Ordering::Relaxed);
                        }
                    }
                }
            }

            debug!(worker_id = worker_id, "worker thread exiting");
        })
}
