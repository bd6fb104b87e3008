//! Worker pool variant with one queue shared by every worker.

use std::collections::VecDeque;
use std::num::NonZero;
use std::sync::{Arc, Condvar, Mutex};
use std::thread;

use crate::{ERR_POISONED_LOCK, JoinHandle, Pool, SubmitError, Task};

/// Everything behind the pool's single lock: the pending tasks plus the stop
/// flag. The flag lives under the same lock as the queue so that a worker's
/// wait condition (queue empty, not stopped) is evaluated atomically.
#[derive(Debug)]
struct QueueState {
    tasks: VecDeque<Task>,

    /// Transitions false to true at most once and never reverts.
    stop: bool,
}

/// The lock, the wakeup signal and the queue shared between the pool handle
/// and its workers.
#[derive(Debug)]
struct Shared {
    state: Mutex<QueueState>,
    task_available: Condvar,
}

/// A fixed-size worker pool where all workers pop from one shared FIFO queue.
///
/// Whichever worker is idle takes the next task, so load balances itself
/// even when task costs are uneven. The price is that every submission and
/// every pop goes through one lock; for very short tasks on many workers,
/// consider [`ShardedQueuePool`][crate::ShardedQueuePool] instead.
///
/// Dropping the pool shuts it down and joins all worker threads, after
/// running any tasks still queued at that point.
///
/// # Example
///
/// ```
/// use new_zealand::nz;
/// use task_pool::{Pool, SharedQueuePool};
///
/// let pool = SharedQueuePool::new(nz!(4));
///
/// let handle = pool.submit(|| println!("hello from a worker")).unwrap();
/// handle.join().unwrap();
///
/// pool.shutdown();
/// ```
#[derive(Debug)]
pub struct SharedQueuePool {
    shared: Arc<Shared>,
    workers: Vec<thread::JoinHandle<()>>,
    worker_count: NonZero<usize>,
}

impl SharedQueuePool {
    /// Creates a pool and immediately spawns `worker_count` threads, all
    /// idle-waiting on the shared queue.
    #[must_use]
    pub fn new(worker_count: NonZero<usize>) -> Self {
        let shared = Arc::new(Shared {
            state: Mutex::new(QueueState {
                tasks: VecDeque::new(),
                stop: false,
            }),
            task_available: Condvar::new(),
        });

        let workers = (0..worker_count.get())
            .map(|_| {
                let shared = Arc::clone(&shared);
                thread::spawn(move || worker_loop(&shared))
            })
            .collect();

        Self {
            shared,
            workers,
            worker_count,
        }
    }
}

impl Pool for SharedQueuePool {
    fn worker_count(&self) -> NonZero<usize> {
        self.worker_count
    }

    fn submit<F>(&self, work: F) -> Result<JoinHandle, SubmitError>
    where
        F: FnOnce() + Send + 'static,
    {
        let (task, handle) = Task::new(work);

        {
            let mut state = self.shared.state.lock().expect(ERR_POISONED_LOCK);

            if state.stop {
                return Err(SubmitError::ShutDown);
            }

            state.tasks.push_back(task);
        }

        self.shared.task_available.notify_one();

        Ok(handle)
    }

    fn shutdown(&self) {
        {
            let mut state = self.shared.state.lock().expect(ERR_POISONED_LOCK);
            state.stop = true;
        }

        self.shared.task_available.notify_all();
    }
}

impl Drop for SharedQueuePool {
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

/// Pops and runs tasks until the queue is empty and the pool has stopped.
///
/// The stop flag does not interrupt draining: tasks already accepted keep
/// running so that their completion handles are always fulfilled. The loop
/// only exits once it observes an empty queue with the flag set.
#[cfg_attr(test, mutants::skip)] // Loop tampering hangs the entire test suite.
fn worker_loop(shared: &Shared) {
    loop {
        let task = {
            let mut state = shared.state.lock().expect(ERR_POISONED_LOCK);

            loop {
                if let Some(task) = state.tasks.pop_front() {
                    break task;
                }

                if state.stop {
                    return;
                }

                state = shared
                    .task_available
                    .wait(state)
                    .expect(ERR_POISONED_LOCK);
            }
        };

        // Run outside the lock; the task may be arbitrarily slow.
        task.run();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use new_zealand::nz;
    use static_assertions::assert_impl_all;
    use testing::with_watchdog;

    use super::*;

    #[test]
    fn executes_every_submitted_task_exactly_once() {
        with_watchdog(|| {
            let pool = SharedQueuePool::new(nz!(4));
            let counter = Arc::new(AtomicUsize::new(0));

            let handles: Vec<_> = (0..64)
                .map(|_| {
                    let counter = Arc::clone(&counter);
                    pool.submit(move || {
                        counter.fetch_add(1, Ordering::SeqCst);
                    })
                    .expect("pool is running")
                })
                .collect();

            for handle in handles {
                handle.join().expect("counting tasks do not panic");
            }

            assert_eq!(counter.load(Ordering::SeqCst), 64);
        });
    }

    #[test]
    fn shutdown_drains_pending_tasks() {
        with_watchdog(|| {
            let pool = SharedQueuePool::new(nz!(1));
            let counter = Arc::new(AtomicUsize::new(0));

            // A single worker guarantees a backlog: while the first task
            // sleeps, the rest sit in the queue when shutdown is called.
            let handles: Vec<_> = (0..16)
                .map(|_| {
                    let counter = Arc::clone(&counter);
                    pool.submit(move || {
                        thread::sleep(Duration::from_millis(1));
                        counter.fetch_add(1, Ordering::SeqCst);
                    })
                    .expect("pool is running")
                })
                .collect();

            pool.shutdown();

            for handle in handles {
                handle.join().expect("queued tasks still run after shutdown");
            }

            assert_eq!(counter.load(Ordering::SeqCst), 16);
        });
    }

    #[test]
    fn submit_after_shutdown_is_rejected() {
        let pool = SharedQueuePool::new(nz!(2));

        pool.shutdown();

        assert!(matches!(pool.submit(|| {}), Err(SubmitError::ShutDown)));
    }

    #[test]
    fn shutdown_is_idempotent() {
        with_watchdog(|| {
            let pool = SharedQueuePool::new(nz!(2));

            pool.shutdown();
            pool.shutdown();
        });
    }

    #[test]
    fn tasks_run_in_fifo_order_on_a_single_worker() {
        with_watchdog(|| {
            let pool = SharedQueuePool::new(nz!(1));
            let order = Arc::new(Mutex::new(Vec::new()));

            let handles: Vec<_> = (0..32)
                .map(|i| {
                    let order = Arc::clone(&order);
                    pool.submit(move || {
                        order.lock().expect("recording tasks do not panic").push(i);
                    })
                    .expect("pool is running")
                })
                .collect();

            for handle in handles {
                handle.join().expect("recording tasks do not panic");
            }

            let order = order.lock().expect("recording tasks do not panic");
            assert!(order.iter().copied().eq(0..32));
        });
    }

    #[test]
    fn panicking_task_surfaces_through_the_handle_and_spares_the_worker() {
        with_watchdog(|| {
            let pool = SharedQueuePool::new(nz!(1));

            let failing = pool.submit(|| panic!("boom")).expect("pool is running");
            let payload = failing.join().expect_err("panic must surface");
            assert_eq!(payload.downcast_ref::<&str>().copied(), Some("boom"));

            // The single worker survived the panic and keeps serving tasks.
            let follow_up = pool.submit(|| {}).expect("pool is running");
            follow_up.join().expect("follow-up task runs normally");
        });
    }

    #[test]
    fn drop_without_explicit_shutdown_completes_pending_work() {
        with_watchdog(|| {
            let counter = Arc::new(AtomicUsize::new(0));

            {
                let pool = SharedQueuePool::new(nz!(2));

                for _ in 0..8 {
                    let counter = Arc::clone(&counter);
                    drop(
                        pool.submit(move || {
                            counter.fetch_add(1, Ordering::SeqCst);
                        })
                        .expect("pool is running"),
                    );
                }
            }

            // Drop joined the workers, so all tasks have run by now.
            assert_eq!(counter.load(Ordering::SeqCst), 8);
        });
    }

    #[test]
    fn thread_safe_surface() {
        assert_impl_all!(SharedQueuePool: Send, Sync);
        assert_impl_all!(JoinHandle: Send);
    }
}
