//! Blocking FIFO queue implementation.
//!
//! A mutex/condvar-guarded queue safe for any number of concurrent producers
//! and consumers. The worker pool uses it as the transport for ready tasks.

use std::collections::VecDeque;

use parking_lot::{Condvar, Mutex};

/// A thread-safe FIFO queue with blocking and non-blocking pop.
///
/// Ordering is strict FIFO: if one push is ordered before another (as observed
/// under the internal lock), any single-consumer pop sequence yields them in
/// that order.
///
/// # Examples
///
/// ```
/// use delay_pool::BlockingQueue;
///
/// let queue = BlockingQueue::new();
/// queue.push(1);
/// queue.push(2);
/// assert_eq!(queue.try_pop(), Some(1));
/// assert_eq!(queue.wait_and_pop(), 2);
/// assert!(queue.is_empty());
/// ```
#[derive(Debug)]
pub struct BlockingQueue<T> {
    inner: Mutex<VecDeque<T>>,
    cond: Condvar,
}

impl<T> BlockingQueue<T> {
    /// Creates an empty queue.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            inner: Mutex::new(VecDeque::new()),
            cond: Condvar::new(),
        }
    }

    /// Enqueues a value and wakes one potential waiter.
    pub fn push(&self, value: T) {
        let mut inner = self.inner.lock();
        inner.push_back(value);
        self.cond.notify_one();
    }

    /// Dequeues the front value if one is present; never blocks.
    pub fn try_pop(&self) -> Option<T> {
        self.inner.lock().pop_front()
    }

    /// Blocks until the queue is non-empty, then dequeues the front value.
    pub fn wait_and_pop(&self) -> T {
        let mut inner = self.inner.lock();
        loop {
            if let Some(value) = inner.pop_front() {
                return value;
            }
            self.cond.wait(&mut inner);
        }
    }

    /// Returns whether the queue was empty at the instant of the check.
    ///
    /// This is a point-in-time snapshot: by the time the caller acts on it,
    /// concurrent pushes or pops may have changed the answer.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    /// Returns the queue length at the instant of the check.
    ///
    /// Same racy-snapshot caveat as [`is_empty`](Self::is_empty).
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }
}

impl<T> Default for BlockingQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_fifo_order_single_producer_single_consumer() {
        let queue = BlockingQueue::new();
        for i in 0..100 {
            queue.push(i);
        }
        for i in 0..100 {
            assert_eq!(queue.try_pop(), Some(i));
        }
        assert_eq!(queue.try_pop(), None);
    }

    #[test]
    fn test_try_pop_on_empty_does_not_block() {
        let queue: BlockingQueue<u32> = BlockingQueue::new();
        assert_eq!(queue.try_pop(), None);
        assert!(queue.is_empty());
        assert_eq!(queue.len(), 0);
    }

    #[test]
    fn test_wait_and_pop_blocks_until_push() {
        let queue = Arc::new(BlockingQueue::new());
        let queue2 = Arc::clone(&queue);

        let consumer = thread::spawn(move || queue2.wait_and_pop());

        thread::sleep(Duration::from_millis(20));
        queue.push(42);
        assert_eq!(consumer.join().unwrap(), 42);
    }

    #[test]
    fn test_concurrent_producers_lose_nothing() {
        let queue = Arc::new(BlockingQueue::new());
        let mut handles = Vec::new();

        for p in 0..4 {
            let queue = Arc::clone(&queue);
            handles.push(thread::spawn(move || {
                for i in 0..50 {
                    queue.push(p * 50 + i);
                }
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }

        let mut seen: Vec<i32> = (0..200).map(|_| queue.wait_and_pop()).collect();
        seen.sort_unstable();
        assert_eq!(seen, (0..200).collect::<Vec<_>>());
        assert!(queue.is_empty());
    }

    #[test]
    fn test_concurrent_consumers_each_get_distinct_items() {
        let queue = Arc::new(BlockingQueue::new());
        for i in 0..80 {
            queue.push(i);
        }

        let mut handles = Vec::new();
        for _ in 0..4 {
            let queue = Arc::clone(&queue);
            handles.push(thread::spawn(move || {
                (0..20).map(|_| queue.wait_and_pop()).collect::<Vec<i32>>()
            }));
        }

        let mut seen = Vec::new();
        for handle in handles {
            seen.extend(handle.join().unwrap());
        }
        seen.sort_unstable();
        assert_eq!(seen, (0..80).collect::<Vec<_>>());
    }
}
