//! Error types for pool submission and task results.

use std::any::Any;
use std::fmt;

use thiserror::Error;

/// Errors returned when submitting work to a [`WorkerPool`] or
/// [`DelayQueue`](crate::DelayQueue).
///
/// [`WorkerPool`]: crate::WorkerPool
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PoolError {
    /// Worker or dispatcher thread creation failed at construction time.
    ///
    /// The pool is permanently unusable; submissions fail fast instead of
    /// accepting work that would never run.
    #[error("pool is unusable: thread creation failed at construction")]
    Unusable,
    /// The pool has been shut down.
    #[error("pool has been shut down")]
    Shutdown,
    /// Configuration validation failed.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// The reason a [`TaskHandle`](crate::TaskHandle) carries no value.
pub enum TaskError {
    /// The task body panicked. The original panic payload is preserved.
    Panicked(Box<dyn Any + Send>),
    /// The task was discarded before execution, e.g. because its pool or
    /// delay queue shut down while the task was still queued.
    Abandoned,
}

impl TaskError {
    /// Returns the panic message if the task panicked with a `&str` or
    /// `String` payload, which covers `panic!` with a format string.
    #[must_use]
    pub fn panic_message(&self) -> Option<&str> {
        match self {
            Self::Panicked(payload) => payload
                .downcast_ref::<&str>()
                .copied()
                .or_else(|| payload.downcast_ref::<String>().map(String::as_str)),
            Self::Abandoned => None,
        }
    }

    /// Consumes the error, returning the raw panic payload if any.
    #[must_use]
    pub fn into_panic(self) -> Option<Box<dyn Any + Send>> {
        match self {
            Self::Panicked(payload) => Some(payload),
            Self::Abandoned => None,
        }
    }
}

// Manual impls: the panic payload is `dyn Any`, so neither Debug nor Display
// can be derived or delegated through thiserror.
impl fmt::Debug for TaskError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Panicked(_) => f
                .debug_tuple("Panicked")
                .field(&self.panic_message().unwrap_or("<opaque payload>"))
                .finish(),
            Self::Abandoned => f.write_str("Abandoned"),
        }
    }
}

impl fmt::Display for TaskError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Panicked(_) => match self.panic_message() {
                Some(msg) => write!(f, "task panicked: {msg}"),
                None => f.write_str("task panicked"),
            },
            Self::Abandoned => f.write_str("task was discarded before execution"),
        }
    }
}

impl std::error::Error for TaskError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_error_display() {
        assert_eq!(
            format!("{}", PoolError::Unusable),
            "pool is unusable: thread creation failed at construction"
        );
        assert_eq!(format!("{}", PoolError::Shutdown), "pool has been shut down");
        assert_eq!(
            format!("{}", PoolError::InvalidConfig("worker_count is 0".into())),
            "invalid configuration: worker_count is 0"
        );
    }

    #[test]
    fn test_task_error_panic_message() {
        let err = TaskError::Panicked(Box::new("boom"));
        assert_eq!(err.panic_message(), Some("boom"));
        assert_eq!(format!("{err}"), "task panicked: boom");

        let err = TaskError::Panicked(Box::new(String::from("owned boom")));
        assert_eq!(err.panic_message(), Some("owned boom"));

        let err = TaskError::Panicked(Box::new(17_u32));
        assert_eq!(err.panic_message(), None);
        assert_eq!(format!("{err}"), "task panicked");
    }

    #[test]
    fn test_task_error_abandoned() {
        let err = TaskError::Abandoned;
        assert_eq!(format!("{err}"), "task was discarded before execution");
        assert!(err.into_panic().is_none());
    }
}
