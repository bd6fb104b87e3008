//! Fixed-size worker pools with task submission and completion signaling.
//!
//! Two queueing disciplines are provided behind the common [`Pool`] trait:
//!
//! - [`SharedQueuePool`] - one FIFO queue shared by every worker. Naturally
//!   load balanced, at the cost of every submission and every pop contending
//!   on a single lock.
//! - [`ShardedQueuePool`] - one FIFO queue per worker, filled in round-robin
//!   order. No cross-worker contention, at the cost of load imbalance when
//!   task costs are uneven.
//!
//! [`Pool::submit`] returns a [`JoinHandle`] that the submitter can block on
//! to observe the outcome of that one task, including a captured panic.
//! [`Pool::shutdown`] stops the workers once their queues are drained: every
//! task accepted before the shutdown still runs, so every handle issued by
//! `submit` is eventually fulfilled. Submissions after shutdown are rejected
//! with [`SubmitError::ShutDown`].
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//!
//! use new_zealand::nz;
//! use task_pool::{Pool, SharedQueuePool};
//!
//! let pool = SharedQueuePool::new(nz!(4));
//! let counter = Arc::new(AtomicUsize::new(0));
//!
//! let handles: Vec<_> = (0..16)
//!     .map(|_| {
//!         let counter = Arc::clone(&counter);
//!         pool.submit(move || {
//!             counter.fetch_add(1, Ordering::Relaxed);
//!         })
//!         .unwrap()
//!     })
//!     .collect();
//!
//! for handle in handles {
//!     handle.join().unwrap();
//! }
//!
//! assert_eq!(counter.load(Ordering::Relaxed), 16);
//!
//! pool.shutdown();
//! ```

mod handle;
mod pool;
mod shared;
mod sharded;
mod task;

pub use handle::*;
pub use pool::*;
pub use shared::*;
pub use sharded::*;

pub(crate) use task::Task;

/// Pool locks are only held across short critical sections that run no
/// caller code; a poisoned lock therefore indicates a bug in this crate.
const ERR_POISONED_LOCK: &str = "lock poisoned: a thread panicked inside a pool critical section";
