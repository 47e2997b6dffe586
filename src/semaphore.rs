//! Counting semaphore implementation.
//!
//! This module provides the counting signal primitive used for all cross-thread
//! wakeups in this crate: worker threads sleep on it between tasks, and the
//! delay-queue dispatcher sleeps on it between deadlines.

use std::time::Instant;

use parking_lot::{Condvar, Mutex};

/// A counting semaphore.
///
/// The count represents outstanding signals, each of which can be consumed by
/// exactly one waiter. Unlike `std::sync::Condvar`-based ad-hoc signalling, a
/// signal sent before anyone waits is never lost: it stays in the count until
/// a waiter consumes it.
///
/// Which of several blocked waiters is woken by [`notify`](Self::notify) is
/// unspecified; fairness is not guaranteed.
///
/// # Examples
///
/// ```
/// use delay_pool::Semaphore;
/// use std::sync::Arc;
/// use std::thread;
///
/// let sem = Arc::new(Semaphore::new(0));
/// let sem2 = Arc::clone(&sem);
///
/// let handle = thread::spawn(move || {
///     // Blocks until the main thread signals.
///     sem2.wait();
/// });
///
/// sem.notify();
/// handle.join().unwrap();
/// ```
#[derive(Debug, Default)]
pub struct Semaphore {
    count: Mutex<usize>,
    cond: Condvar,
}

impl Semaphore {
    /// Creates a semaphore with the given initial count.
    ///
    /// With a count of zero, the first [`wait`](Self::wait) blocks until
    /// someone calls [`notify`](Self::notify).
    #[inline]
    #[must_use]
    pub const fn new(count: usize) -> Self {
        Self {
            count: Mutex::new(count),
            cond: Condvar::new(),
        }
    }

    /// Increments the count by one and wakes at most one blocked waiter.
    ///
    /// Never blocks and never fails.
    pub fn notify(&self) {
        let mut count = self.count.lock();
        *count += 1;
        self.cond.notify_one();
    }

    /// Blocks the calling thread until the count is positive, then consumes
    /// one signal.
    pub fn wait(&self) {
        let mut count = self.count.lock();
        while *count == 0 {
            self.cond.wait(&mut count);
        }
        *count -= 1;
    }

    /// Blocks until the count is positive or `deadline` passes.
    ///
    /// Returns `true` if a signal was consumed. On timeout, returns `false`
    /// and leaves the count untouched — a timed-out waiter never consumes a
    /// signal.
    ///
    /// If a signal is already available, this succeeds immediately even when
    /// the deadline lies in the past.
    ///
    /// # Examples
    ///
    /// ```
    /// use delay_pool::Semaphore;
    /// use std::time::{Duration, Instant};
    ///
    /// let sem = Semaphore::new(1);
    /// assert!(sem.wait_until(Instant::now() + Duration::from_millis(10)));
    /// // Count is now zero; the next timed wait expires.
    /// assert!(!sem.wait_until(Instant::now() + Duration::from_millis(10)));
    /// ```
    pub fn wait_until(&self, deadline: Instant) -> bool {
        let mut count = self.count.lock();
        while *count == 0 {
            if self.cond.wait_until(&mut count, deadline).timed_out() {
                // A signal may have arrived in the same instant the wait
                // expired; honor it only if it is actually there.
                if *count > 0 {
                    break;
                }
                return false;
            }
        }
        *count -= 1;
        true
    }
}
