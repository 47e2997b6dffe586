//! Deadline-ordered deferred-task scheduler.
//!
//! A [`DelayQueue`] keeps pending tasks in a min-heap ordered by absolute
//! deadline. One dispatcher thread sleeps on the queue's [`Semaphore`] until
//! the earliest deadline, then promotes every due task into an owned
//! [`WorkerPool`].
//!
//! The wakeup protocol is the load-bearing part: insertion always signals the
//! semaphore, and the dispatcher recomputes its sleep target from the live
//! heap after *every* wake, whether it timed out or was signalled. An entry
//! inserted with an earlier deadline than the one currently slept toward is
//! therefore never missed — an extra wake cycle is harmless, a lost one is
//! not.

use std::collections::BinaryHeap;
use std::cmp::Ordering as CmpOrdering;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::{debug, error, info, warn};

use crate::config::PoolConfig;
use crate::semaphore::Semaphore;

use super::error::PoolError;
use super::task::{Task, TaskHandle};
use super::worker_pool::{PoolStats, WorkerPool};

/// A pending task and the instant it becomes eligible to run.
struct DeferredEntry {
    deadline: Instant,
    task: Task,
}

// Heap ordering considers deadlines only; the reversed comparison turns the
// std max-heap into a min-heap, and `pop` hands back the entry by value.
impl PartialEq for DeferredEntry {
    fn eq(&self, other: &Self) -> bool {
        self.deadline == other.deadline
    }
}

impl Eq for DeferredEntry {}

impl PartialOrd for DeferredEntry {
    fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
        Some(self.cmp(other))
    }
}

impl Ord for DeferredEntry {
    fn cmp(&self, other: &Self) -> CmpOrdering {
        other.deadline.cmp(&self.deadline)
    }
}

/// State shared between the queue handle and its dispatcher thread.
struct DelayShared {
    heap: Mutex<BinaryHeap<DeferredEntry>>,
    semaphore: Semaphore,
    shutdown: AtomicBool,
}

/// A deferred-task scheduler: submit a closure with a delay, get a handle to
/// its eventual result.
///
/// Owns one dispatcher thread and an internal [`WorkerPool`]. Tasks are
/// handed to the pool in non-decreasing deadline order; entries sharing a
/// deadline dispatch in unspecified relative order. Instances are fully
/// independent — no state is shared across queues.
///
/// Dropping the queue stops the dispatcher and the pool; entries whose
/// deadline never arrived are discarded and their handles resolve to
/// [`TaskError::Abandoned`](super::error::TaskError).
///
/// # Examples
///
/// ```
/// use delay_pool::DelayQueue;
/// use std::time::Duration;
///
/// let queue = DelayQueue::new();
/// let handle = queue
///     .add_task(Duration::from_millis(20), || "fired")
///     .unwrap();
/// assert_eq!(handle.get().unwrap(), "fired");
/// ```
pub struct DelayQueue {
    shared: Arc<DelayShared>,
    dispatcher: Mutex<Option<JoinHandle<()>>>,
    pool: Arc<WorkerPool>,
    unusable: bool,
}

impl DelayQueue {
    /// Creates a delay queue whose internal pool is sized to available
    /// hardware parallelism.
    #[must_use]
    pub fn new() -> Self {
        Self::from_pool(WorkerPool::new())
    }

    /// Creates a delay queue whose internal pool uses the given configuration.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::InvalidConfig`] if the configuration fails
    /// validation.
    pub fn with_config(config: PoolConfig) -> Result<Self, PoolError> {
        Ok(Self::from_pool(WorkerPool::with_config(config)?))
    }

    fn from_pool(pool: WorkerPool) -> Self {
        let shared = Arc::new(DelayShared {
            heap: Mutex::new(BinaryHeap::new()),
            semaphore: Semaphore::new(0),
            shutdown: AtomicBool::new(false),
        });
        let pool = Arc::new(pool);

        let mut unusable = pool.worker_count() == 0;
        let dispatcher = if unusable {
            None
        } else {
            match spawn_dispatcher(Arc::clone(&shared), Arc::clone(&pool)) {
                Ok(handle) => {
                    info!("delay queue started");
                    Some(handle)
                }
                Err(e) => {
                    error!(error = %e, "failed to spawn dispatcher thread");
                    warn!("delay queue marked unusable; submissions will fail fast");
                    unusable = true;
                    None
                }
            }
        };

        Self {
            shared,
            dispatcher: Mutex::new(dispatcher),
            pool,
            unusable,
        }
    }

    /// Schedules `job` to run once `delay` has elapsed and returns its handle
    /// immediately. Never blocks the submitter.
    ///
    /// A zero delay (or one that has already elapsed by the time the
    /// dispatcher looks) makes the task immediately eligible. Absurdly large
    /// delays are not validated; they are simply deadlines far in the future.
    ///
    /// # Errors
    ///
    /// - [`PoolError::Unusable`] if dispatcher or worker creation failed at
    ///   construction.
    /// - [`PoolError::Shutdown`] if the queue has been shut down.
    pub fn add_task<F, R>(&self, delay: Duration, job: F) -> Result<TaskHandle<R>, PoolError>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        if self.unusable {
            return Err(PoolError::Unusable);
        }
        if self.shared.shutdown.load(Ordering::Acquire) {
            return Err(PoolError::Shutdown);
        }

        let (task, handle) = Task::new(job);
        let deadline = Instant::now() + delay;

        self.shared.heap.lock().push(DeferredEntry { deadline, task });
        // Exactly one signal per insertion. Even if the dispatcher is mid-way
        // through computing a sleep target, this signal forces it to wake and
        // recompute from the live heap.
        self.shared.semaphore.notify();

        Ok(handle)
    }

    /// Number of entries whose deadline has not yet led to dispatch, at the
    /// instant of the check (racy snapshot).
    #[must_use]
    pub fn pending(&self) -> usize {
        self.shared.heap.lock().len()
    }

    /// Snapshot of the owned worker pool's counters.
    #[must_use]
    pub fn pool_stats(&self) -> PoolStats {
        self.pool.stats()
    }

    /// Stops the dispatcher and the owned pool. Idempotent.
    ///
    /// Entries still in the heap are discarded without execution.
    pub fn shutdown(&self) {
        if self.shared.shutdown.swap(true, Ordering::AcqRel) {
            return;
        }

        info!("shutting down delay queue");

        // One signal suffices: the dispatcher re-checks the flag at the top
        // of its loop no matter which wait variant woke it.
        self.shared.semaphore.notify();
        if let Some(handle) = self.dispatcher.lock().take() {
            if handle.join().is_err() {
                warn!("dispatcher thread panicked");
            }
        }

        self.pool.shutdown();
        debug!("delay queue shut down complete");
    }
}

impl Default for DelayQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for DelayQueue {
    fn drop(&mut self) {
        self.shutdown();
        // Undispatched entries drop with the heap; their handles resolve as
        // abandoned.
    }
}

/// Spawns the dispatcher thread running the sleep/recompute/promote loop.
fn spawn_dispatcher(
    shared: Arc<DelayShared>,
    pool: Arc<WorkerPool>,
) -> std::io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("dp-dispatch".into())
        .spawn(move || {
            debug!("dispatcher thread started");

            loop {
                if shared.shutdown.load(Ordering::Acquire) {
                    break;
                }

                // Step 1: read the current minimum deadline, if any.
                let next_deadline = shared.heap.lock().peek().map(|entry| entry.deadline);

                // Step 2: sleep toward it, or indefinitely on an empty heap.
                // Timeout versus signal makes no difference below; both lead
                // to a fresh recomputation from the live heap.
                match next_deadline {
                    Some(deadline) => {
                        let _signalled = shared.semaphore.wait_until(deadline);
                    }
                    None => shared.semaphore.wait(),
                }

                if shared.shutdown.load(Ordering::Acquire) {
                    break;
                }

                // Step 3: promote everything that is due.
                dispatch_due(&shared, &pool);
            }

            debug!("dispatcher thread exiting");
        })
}

/// Pops due entries one at a time and hands them to the pool.
///
/// The heap lock is released before each submission so the dispatcher never
/// holds it across the pool's own locking.
fn dispatch_due(shared: &DelayShared, pool: &WorkerPool) {
    loop {
        let due = {
            let mut heap = shared.heap.lock();
            if heap
                .peek()
                .is_some_and(|entry| entry.deadline <= Instant::now())
            {
                heap.pop()
            } else {
                None
            }
        };

        let Some(entry) = due else { break };
        if pool.submit_task(entry.task).is_err() {
            // Pool refused (shut down mid-dispatch); the dropped task
            // resolves its handle as abandoned.
            warn!("worker pool refused a due task");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(deadline: Instant) -> DeferredEntry {
        let (task, _handle) = Task::new(|| ());
        DeferredEntry { deadline, task }
    }

    #[test]
    fn test_heap_exposes_minimum_deadline() {
        let now = Instant::now();
        let mut heap = BinaryHeap::new();
        heap.push(entry(now + Duration::from_millis(500)));
        heap.push(entry(now + Duration::from_millis(100)));
        heap.push(entry(now + Duration::from_millis(300)));

        let first = heap.pop().unwrap();
        assert_eq!(first.deadline, now + Duration::from_millis(100));
        let second = heap.pop().unwrap();
        assert_eq!(second.deadline, now + Duration::from_millis(300));
        let third = heap.pop().unwrap();
        assert_eq!(third.deadline, now + Duration::from_millis(500));
    }

    #[test]
    fn test_pending_counts_undispatched_entries() {
        let queue = DelayQueue::with_config(PoolConfig::new().with_worker_count(1)).unwrap();
        let _h1 = queue.add_task(Duration::from_secs(60), || 1).unwrap();
        let _h2 = queue.add_task(Duration::from_secs(60), || 2).unwrap();
        assert_eq!(queue.pending(), 2);
    }

    #[test]
    fn test_shutdown_then_add_task_fails_fast() {
        let queue = DelayQueue::with_config(PoolConfig::new().with_worker_count(1)).unwrap();
        queue.shutdown();
        let err = queue.add_task(Duration::ZERO, || 1).unwrap_err();
        assert_eq!(err, PoolError::Shutdown);
    }
}
