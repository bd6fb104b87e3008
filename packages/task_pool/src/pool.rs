//! The contract shared by both worker pool variants.

use std::num::NonZero;

use thiserror::Error;

use crate::JoinHandle;

/// Errors that can occur when submitting a task to a pool.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SubmitError {
    /// The pool has been shut down and no longer accepts tasks.
    ///
    /// Rejecting the submission outright is deliberate: silently queueing a
    /// task that no worker will ever pop would leave the submitter blocked
    /// forever on a handle that is never fulfilled.
    #[error("the pool has been shut down and no longer accepts tasks")]
    ShutDown,
}

/// Common contract of the two worker pool variants.
///
/// A pool spawns a fixed set of worker threads at construction and runs them
/// until [`shutdown`][Self::shutdown]. Higher layers that only need
/// submit-and-wait semantics (such as a parallel reduce) can stay generic
/// over the queueing discipline through this trait.
pub trait Pool {
    /// The number of worker threads owned by this pool.
    ///
    /// Fixed at construction; workers are neither added nor removed over the
    /// pool's lifetime.
    fn worker_count(&self) -> NonZero<usize>;

    /// Queues a unit of work for execution on some worker thread.
    ///
    /// Returns immediately with a [`JoinHandle`] the submitter can block on;
    /// the only blocking on this path is the bounded hold time of a queue
    /// lock. The work runs on an arbitrary worker at an arbitrary later
    /// time; tasks popped from the same queue run in FIFO order, but nothing
    /// is guaranteed about completion order across workers.
    ///
    /// Submitted closures must be `'static`: share referenced data with the
    /// task explicitly, for example through an [`Arc`][std::sync::Arc].
    ///
    /// # Errors
    ///
    /// Returns [`SubmitError::ShutDown`] if [`shutdown`][Self::shutdown] has
    /// already been called.
    fn submit<F>(&self, work: F) -> Result<JoinHandle, SubmitError>
    where
        F: FnOnce() + Send + 'static;

    /// Signals every worker to stop once its queue is drained.
    ///
    /// Returns without waiting for the workers to finish. Every task
    /// accepted by [`submit`][Self::submit] before this call still runs, so
    /// all outstanding handles are eventually fulfilled. Calling `shutdown`
    /// again is a no-op.
    ///
    /// Dropping the pool shuts it down and joins all workers, so an explicit
    /// call is only needed to stop accepting work ahead of destruction.
    fn shutdown(&self);
}
