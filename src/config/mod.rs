//! Configuration models for pools and the delay queue.

pub mod pool;

pub use pool::PoolConfig;
