//! Type-erased tasks and their one-shot result channels.
//!
//! A submitted closure is erased behind the [`Invocable`] trait so that
//! heterogeneous callables can travel through one `BlockingQueue<Task>`
//! without specializing the queue per closure type. Each task is paired with
//! a write-once [`ResultChannel`] that the caller observes through a
//! [`TaskHandle`].

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use parking_lot::{Condvar, Mutex};

use super::error::TaskError;

/// What happened when a task body ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TaskOutcome {
    /// The body returned normally.
    Completed,
    /// The body panicked; the payload was captured into the channel.
    Panicked,
}

/// The single capability a type-erased task exposes: run once, consuming
/// the captured closure.
trait Invocable: Send {
    fn invoke(self: Box<Self>) -> TaskOutcome;
}

/// State of a result channel.
///
/// Exactly one of `Ready` or `Abandoned` is ever written, exactly once, and
/// only from `Pending`. `Taken` marks a consumed value.
enum Slot<R> {
    Pending,
    Ready(Result<R, Box<dyn Any + Send>>),
    Abandoned,
    Taken,
}

/// One-shot result slot shared between the executing thread (writer) and the
/// handle-holding caller (reader).
struct ResultChannel<R> {
    slot: Mutex<Slot<R>>,
    cond: Condvar,
}

impl<R> ResultChannel<R> {
    fn new() -> Self {
        Self {
            slot: Mutex::new(Slot::Pending),
            cond: Condvar::new(),
        }
    }

    /// Stores the execution outcome and wakes all waiters. Write-once: a
    /// second call is a no-op.
    fn complete(&self, outcome: Result<R, Box<dyn Any + Send>>) {
        let mut slot = self.slot.lock();
        if matches!(*slot, Slot::Pending) {
            *slot = Slot::Ready(outcome);
            self.cond.notify_all();
        }
    }

    /// Marks the channel as never-to-be-written and wakes all waiters.
    /// No-op once a result has been stored.
    fn abandon(&self) {
        let mut slot = self.slot.lock();
        if matches!(*slot, Slot::Pending) {
            *slot = Slot::Abandoned;
            self.cond.notify_all();
        }
    }

    fn is_ready(&self) -> bool {
        !matches!(*self.slot.lock(), Slot::Pending)
    }

    /// Blocks until the channel leaves `Pending`, then moves the value out.
    fn take(&self) -> Result<R, TaskError> {
        let mut slot = self.slot.lock();
        while matches!(*slot, Slot::Pending) {
            self.cond.wait(&mut slot);
        }
        match std::mem::replace(&mut *slot, Slot::Taken) {
            Slot::Ready(Ok(value)) => Ok(value),
            Slot::Ready(Err(payload)) => Err(TaskError::Panicked(payload)),
            Slot::Abandoned => Err(TaskError::Abandoned),
            // The consuming handle is the only caller of `take`, and the loop
            // above cannot exit while the slot is still pending.
            Slot::Pending | Slot::Taken => unreachable!("result consumed twice"),
        }
    }
}

/// Concrete erased cell: one per captured closure type.
struct TaskCell<F, R> {
    // `Option` so `invoke` can move the closure out from behind the Drop impl.
    job: Option<F>,
    channel: Arc<ResultChannel<R>>,
}

impl<F, R> Invocable for TaskCell<F, R>
where
    F: FnOnce() -> R + Send,
    R: Send,
{
    fn invoke(mut self: Box<Self>) -> TaskOutcome {
        let Some(job) = self.job.take() else {
            return TaskOutcome::Completed;
        };
        let outcome = panic::catch_unwind(AssertUnwindSafe(job));
        let ran_clean = outcome.is_ok();
        self.channel.complete(outcome);
        if ran_clean {
            TaskOutcome::Completed
        } else {
            TaskOutcome::Panicked
        }
    }
}

impl<F, R> Drop for TaskCell<F, R> {
    fn drop(&mut self) {
        // Dropped without running: resolve the handle instead of leaving its
        // owner blocked forever.
        if self.job.is_some() {
            self.channel.abandon();
        }
    }
}

/// A type-erased, move-only, zero-argument unit of work.
///
/// The payload is consumed exactly once when the task runs; the task object
/// is discarded afterwards. Dropping a task that never ran resolves its
/// handle to [`TaskError::Abandoned`].
pub(crate) struct Task {
    cell: Box<dyn Invocable>,
}

impl Task {
    /// Wraps a closure into a task and the handle its caller keeps.
    pub(crate) fn new<F, R>(job: F) -> (Self, TaskHandle<R>)
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        let channel = Arc::new(ResultChannel::new());
        let cell = TaskCell {
            job: Some(job),
            channel: Arc::clone(&channel),
        };
        (Self { cell: Box::new(cell) }, TaskHandle { channel })
    }

    /// Runs the task body, capturing any panic into the result channel.
    pub(crate) fn run(self) -> TaskOutcome {
        self.cell.invoke()
    }
}

/// Caller-held handle to a task's eventual value or failure.
///
/// The handle is single-consumer: [`get`](Self::get) takes `self` and moves
/// the value out. Cloning is deliberately not offered; the channel itself is
/// write-once/read-after-ready, so shared observation would be safe but has
/// no use in this API.
pub struct TaskHandle<R> {
    channel: Arc<ResultChannel<R>>,
}

impl<R: Send> TaskHandle<R> {
    /// Blocks until the task finishes, then yields its value.
    ///
    /// # Errors
    ///
    /// - [`TaskError::Panicked`] if the task body panicked; the original
    ///   panic payload is carried verbatim.
    /// - [`TaskError::Abandoned`] if the task was discarded before it ran
    ///   (its pool or delay queue shut down first).
    pub fn get(self) -> Result<R, TaskError> {
        self.channel.take()
    }

    /// Returns whether [`get`](Self::get) would return without blocking.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.channel.is_ready()
    }
}

impl<R> std::fmt::Debug for TaskHandle<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskHandle")
            .field("ready", &self.channel.is_ready())
            .finish()
    }
}
