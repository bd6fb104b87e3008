//! Completion handles connecting submitters to the workers running their tasks.

use std::thread;

use derive_more::Debug;

/// A one-shot completion handle for a submitted task.
///
/// The executing worker fulfills the handle exactly once, when the task
/// finishes. The submitter observes it at most once via [`join`][Self::join],
/// which consumes the handle.
///
/// Dropping the handle without joining is allowed; the task still runs, only
/// its outcome goes unobserved.
///
/// # Example
///
/// ```
/// use new_zealand::nz;
/// use task_pool::{Pool, SharedQueuePool};
///
/// let pool = SharedQueuePool::new(nz!(2));
///
/// let handle = pool.submit(|| {}).unwrap();
/// handle.join().unwrap();
/// ```
#[derive(Debug)]
pub struct JoinHandle {
    #[debug(skip)]
    completion: oneshot::Receiver<thread::Result<()>>,
}

impl JoinHandle {
    pub(crate) fn new(completion: oneshot::Receiver<thread::Result<()>>) -> Self {
        Self { completion }
    }

    /// Blocks until the task has run, returning its outcome.
    ///
    /// Returns `Ok(())` if the task completed normally and `Err` with the
    /// captured panic payload if it panicked, mirroring
    /// [`std::thread::JoinHandle::join`]. There is no timeout; a handle
    /// obtained from `submit` is always eventually fulfilled because pools
    /// drain their queues on shutdown.
    ///
    /// # Panics
    ///
    /// Panics if the pool dropped the task without running it, which the
    /// pool implementations in this crate never do.
    pub fn join(self) -> thread::Result<()> {
        self.completion
            .recv()
            .expect("pools fulfill every accepted task, even across shutdown")
    }
}
