//! Core scheduling machinery: tasks, the worker pool, and the delay queue.

pub mod delay_queue;
pub mod error;
mod task;
pub mod worker_pool;

pub use delay_queue::DelayQueue;
pub use error::{PoolError, TaskError};
pub use task::TaskHandle;
pub use worker_pool::{PoolStats, WorkerPool};
