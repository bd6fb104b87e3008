//! The unit of work that travels from a submitter to a worker.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::thread;

use derive_more::Debug;

use crate::JoinHandle;

/// A queued unit of work paired with its completion signal.
///
/// A task is owned by its queue until a worker pops it, then by that worker
/// for the duration of the run. The completion channel is written exactly
/// once, whether the work finishes normally or panics.
#[derive(Debug)]
pub(crate) struct Task {
    #[debug(skip)]
    work: Box<dyn FnOnce() + Send>,

    #[debug(skip)]
    completion: oneshot::Sender<thread::Result<()>>,
}

impl Task {
    /// Wraps a unit of work, pairing it with the handle the submitter will
    /// later use to await completion.
    pub(crate) fn new<F>(work: F) -> (Self, JoinHandle)
    where
        F: FnOnce() + Send + 'static,
    {
        let (completion, handle) = oneshot::channel();

        (
            Self {
                work: Box::new(work),
                completion,
            },
            JoinHandle::new(handle),
        )
    }

    /// Executes the work and fulfills the completion handle.
    ///
    /// A panic in the work is captured and forwarded through the handle
    /// instead of unwinding into the worker loop, so one failing task never
    /// takes down its worker thread.
    #[cfg_attr(test, mutants::skip)] // An unfulfilled completion hangs the submitter forever.
    pub(crate) fn run(self) {
        let outcome = catch_unwind(AssertUnwindSafe(self.work));

        // The submitter may have dropped the handle without waiting, in
        // which case there is nobody left to notify.
        drop(self.completion.send(outcome));
    }
}
