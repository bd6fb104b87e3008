//! Worker pool variant with one queue per worker and round-robin dispatch.

use std::collections::VecDeque;
use std::num::NonZero;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread;

use crate::{ERR_POISONED_LOCK, JoinHandle, Pool, SubmitError, Task};

/// One worker's private queue together with its wakeup signal.
#[derive(Debug)]
struct Shard {
    tasks: Mutex<VecDeque<Task>>,
    task_available: Condvar,
}

/// State shared between the pool handle and its workers.
#[derive(Debug)]
struct Inner {
    shards: Box<[Shard]>,

    /// Transitions false to true at most once and never reverts.
    ///
    /// Ordering contract: [`ShardedQueuePool::shutdown`] stores with
    /// `Release` and then locks every shard before notifying its waiters, so
    /// a worker re-checking its wait condition under the shard lock cannot
    /// miss the store. Workers load with `Acquire`.
    stop: AtomicBool,
}

/// A fixed-size worker pool where each worker owns a private FIFO queue and
/// submissions are dealt out round-robin.
///
/// Worker `i` is the sole consumer of queue `i`, so there is no cross-worker
/// lock contention on the submission path: the shared lock of
/// [`SharedQueuePool`][crate::SharedQueuePool] stops being a bottleneck. In
/// exchange, tasks are pinned to their queue at submission time; uneven task
/// costs translate directly into load imbalance, because no worker ever
/// takes work from a sibling's queue.
///
/// Dropping the pool shuts it down and joins all worker threads, after
/// running any tasks still queued at that point.
///
/// # Example
///
/// ```
/// use new_zealand::nz;
/// use task_pool::{Pool, ShardedQueuePool};
///
/// let pool = ShardedQueuePool::new(nz!(4));
///
/// // Consecutive submissions land on consecutive workers.
/// let handles: Vec<_> = (0..8).map(|_| pool.submit(|| {}).unwrap()).collect();
///
/// for handle in handles {
///     handle.join().unwrap();
/// }
/// ```
#[derive(Debug)]
pub struct ShardedQueuePool {
    inner: Arc<Inner>,

    /// Monotonic dispatch counter; submissions go to shard `turn % N`.
    turn: AtomicUsize,

    workers: Vec<thread::JoinHandle<()>>,
    worker_count: NonZero<usize>,
}

impl ShardedQueuePool {
    /// Creates a pool and immediately spawns `worker_count` threads, each
    /// idle-waiting on its own queue.
    #[must_use]
    pub fn new(worker_count: NonZero<usize>) -> Self {
        let shards = (0..worker_count.get())
            .map(|_| Shard {
                tasks: Mutex::new(VecDeque::new()),
                task_available: Condvar::new(),
            })
            .collect();

        let inner = Arc::new(Inner {
            shards,
            stop: AtomicBool::new(false),
        });

        let workers = (0..worker_count.get())
            .map(|shard_index| {
                let inner = Arc::clone(&inner);
                thread::spawn(move || worker_loop(&inner, shard_index))
            })
            .collect();

        Self {
            inner,
            turn: AtomicUsize::new(0),
            workers,
            worker_count,
        }
    }

    /// Pending task count of every shard, in worker order.
    #[cfg(test)]
    fn queue_depths(&self) -> Vec<usize> {
        self.inner
            .shards
            .iter()
            .map(|shard| shard.tasks.lock().expect(ERR_POISONED_LOCK).len())
            .collect()
    }
}

impl Pool for ShardedQueuePool {
    fn worker_count(&self) -> NonZero<usize> {
        self.worker_count
    }

    fn submit<F>(&self, work: F) -> Result<JoinHandle, SubmitError>
    where
        F: FnOnce() + Send + 'static,
    {
        let shard_index = self.turn.fetch_add(1, Ordering::Relaxed) % self.worker_count.get();
        let shard = self
            .inner
            .shards
            .get(shard_index)
            .expect("dispatch index is reduced modulo the shard count");

        let (task, handle) = Task::new(work);

        {
            let mut tasks = shard.tasks.lock().expect(ERR_POISONED_LOCK);

            // Checked under the shard lock: `shutdown` takes this lock after
            // setting the flag, so a push that observed `false` here is
            // ordered before the worker's final drain.
            if self.inner.stop.load(Ordering::Acquire) {
                return Err(SubmitError::ShutDown);
            }

            tasks.push_back(task);
        }

        shard.task_available.notify_one();

        Ok(handle)
    }

    fn shutdown(&self) {
        self.inner.stop.store(true, Ordering::Release);

        for shard in &self.inner.shards {
            // Taking the lock orders the store above before any waiter's
            // condition re-check, so the wakeup below cannot be lost.
            drop(shard.tasks.lock().expect(ERR_POISONED_LOCK));
            shard.task_available.notify_all();
        }
    }
}

impl Drop for ShardedQueuePool {
    #[cfg_attr(test, mutants::skip)] // Impractical to test that joining stops happening.
    fn drop(&mut self) {
        if thread::panicking() {
            // We are being dropped during an unwind; blocking on worker
            // threads here could mask the original panic.
            return;
        }

        self.shutdown();

        for worker in self.workers.drain(..) {
            worker
                .join()
                .expect("worker threads never panic; task panics are caught inside the task");
        }
    }
}

/// Pops and runs tasks from one shard until it is empty and the pool has
/// stopped.
///
/// Identical drain discipline to the shared-queue variant: the stop flag is
/// only honored once the worker's own queue is empty, so every accepted
/// task runs and every handle is fulfilled.
#[cfg_attr(test, mutants::skip)] // Loop tampering hangs the entire test suite.
fn worker_loop(inner: &Inner, shard_index: usize) {
    let shard = inner
        .shards
        .get(shard_index)
        .expect("exactly one worker is spawned per shard");

    loop {
        let task = {
            let mut tasks = shard.tasks.lock().expect(ERR_POISONED_LOCK);

            loop {
                if let Some(task) = tasks.pop_front() {
                    break task;
                }

                if inner.stop.load(Ordering::Acquire) {
                    return;
                }

                tasks = shard
                    .task_available
                    .wait(tasks)
                    .expect(ERR_POISONED_LOCK);
            }
        };

        // Run outside the lock; the task may be arbitrarily slow.
        task.run();
    }
}
