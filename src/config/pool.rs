//! Pool configuration structures.

use serde::{Deserialize, Serialize};

/// Default worker thread stack size: 2 MiB.
const DEFAULT_THREAD_STACK_SIZE: usize = 2 * 1024 * 1024;

/// Configuration for a [`WorkerPool`](crate::WorkerPool) or the pool owned by
/// a [`DelayQueue`](crate::DelayQueue).
///
/// # Examples
///
/// ```
/// use delay_pool::PoolConfig;
///
/// let config = PoolConfig::new().with_worker_count(4);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Number of worker threads to spawn.
    pub worker_count: usize,
    /// Stack size per worker thread, in bytes.
    pub thread_stack_size: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            worker_count: num_cpus::get().max(1),
            thread_stack_size: DEFAULT_THREAD_STACK_SIZE,
        }
    }
}

impl PoolConfig {
    /// Creates a configuration with defaults: one worker per logical CPU
    /// (minimum 1) and a 2 MiB thread stack.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the number of worker threads.
    #[must_use]
    pub const fn with_worker_count(mut self, worker_count: usize) -> Self {
        self.worker_count = worker_count;
        self
    }

    /// Sets the per-thread stack size in bytes.
    #[must_use]
    pub const fn with_thread_stack_size(mut self, thread_stack_size: usize) -> Self {
        self.thread_stack_size = thread_stack_size;
        self
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns a description of the first invalid field.
    pub fn validate(&self) -> Result<(), String> {
        if self.worker_count == 0 {
            return Err("worker_count must be greater than 0".into());
        }
        if self.thread_stack_size == 0 {
            return Err("thread_stack_size must be greater than 0".into());
        }
        Ok(())
    }

    /// Parse a configuration from a JSON string and validate it.
    ///
    /// # Errors
    ///
    /// Returns a description of the parse failure or the first invalid field.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: Self = serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = PoolConfig::default();
        assert!(config.worker_count >= 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_methods() {
        let config = PoolConfig::new()
            .with_worker_count(3)
            .with_thread_stack_size(512 * 1024);
        assert_eq!(config.worker_count, 3);
        assert_eq!(config.thread_stack_size, 512 * 1024);
    }

    #[test]
    fn test_zero_worker_count_rejected() {
        let config = PoolConfig::new().with_worker_count(0);
        assert_eq!(
            config.validate().unwrap_err(),
            "worker_count must be greater than 0"
        );
    }

    #[test]
    fn test_zero_stack_size_rejected() {
        let config = PoolConfig::new().with_thread_stack_size(0);
        assert_eq!(
            config.validate().unwrap_err(),
            "thread_stack_size must be greater than 0"
        );
    }

    #[test]
    fn test_from_json_str() {
        let config =
            PoolConfig::from_json_str(r#"{"worker_count": 2, "thread_stack_size": 1048576}"#)
                .unwrap();
        assert_eq!(config.worker_count, 2);
        assert_eq!(config.thread_stack_size, 1_048_576);

        assert!(PoolConfig::from_json_str("{").is_err());
        assert!(
            PoolConfig::from_json_str(r#"{"worker_count": 0, "thread_stack_size": 1}"#).is_err()
        );
    }
}
