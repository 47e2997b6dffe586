//! # Delay Pool
//!
//! A small concurrency toolkit: a deadline-ordered deferred-task scheduler
//! ([`DelayQueue`]) and a fixed-size worker pool ([`WorkerPool`]), built on
//! two reusable primitives — a counting [`Semaphore`] and a
//! [`BlockingQueue`].
//!
//! Submit an arbitrary closure for immediate asynchronous execution or for
//! execution after a delay; a [`TaskHandle`] later yields its value or the
//! failure it raised.
//!
//! ## Design
//!
//! - **No polling**: every worker and dispatcher wakeup is gated by a
//!   semaphore signal; nothing spin-waits for work to appear.
//! - **Race-free deadlines**: inserting a task always signals the dispatcher,
//!   and the dispatcher recomputes its sleep target from the live heap after
//!   every wake, so a concurrently inserted earlier deadline is never
//!   overslept.
//! - **Failure isolation**: a panic inside a task body is captured into its
//!   handle and never kills a worker thread or affects sibling tasks.
//! - **No global state**: every pool and delay queue is fully self-contained,
//!   with its own threads and its own locks.
//!
//! ## Immediate execution
//!
//! ```
//! use delay_pool::WorkerPool;
//!
//! let pool = WorkerPool::new();
//! let handle = pool.submit(|| 2 + 2).unwrap();
//! assert_eq!(handle.get().unwrap(), 4);
//! ```
//!
//! ## Deferred execution
//!
//! ```
//! use delay_pool::DelayQueue;
//! use std::time::Duration;
//!
//! let queue = DelayQueue::new();
//! // Inserted second with a shorter delay: still dispatched first.
//! let slow = queue.add_task(Duration::from_millis(200), || "slow").unwrap();
//! let fast = queue.add_task(Duration::from_millis(20), || "fast").unwrap();
//! assert_eq!(fast.get().unwrap(), "fast");
//! assert_eq!(slow.get().unwrap(), "slow");
//! ```

#![deny(warnings)]
#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Blocking FIFO queue for any number of producers and consumers.
pub mod blocking_queue;
/// Configuration models for pools and the delay queue.
pub mod config;
/// Core scheduling machinery: tasks, the worker pool, and the delay queue.
pub mod core;
/// Counting semaphore with blocking and timed-blocking wait.
pub mod semaphore;
/// Shared utilities.
pub mod util;

pub use blocking_queue::BlockingQueue;
pub use config::PoolConfig;
pub use self::core::{DelayQueue, PoolError, PoolStats, TaskError, TaskHandle, WorkerPool};
pub use semaphore::Semaphore;
