//! Parallel fold ("reduce") of slices over a [`task_pool`] worker pool.
//!
//! [`reduce`] splits a slice across the workers of a pool and folds it with
//! a caller-supplied binary operator, using one of two dynamic
//! work-distribution policies:
//!
//! - [`Policy::Static`] - fixed-size chunks claimed with fetch-and-add.
//! - [`Policy::Guided`] - large early claims that shrink as remaining work
//!   shrinks, switching to fixed-size claims near the end for tail balance,
//!   in the style of OpenMP guided scheduling.
//!
//! The operator must be associative and commutative: chunks are folded by
//! whichever worker claims them first and the per-worker partial results are
//! merged in arbitrary order. Under that contract the result is identical
//! for every worker count, chunk size and policy. The contract is the
//! caller's to uphold; it is not checked.
//!
//! # Example
//!
//! ```
//! use new_zealand::nz;
//! use par_fold::{Policy, reduce};
//! use task_pool::SharedQueuePool;
//!
//! let pool = SharedQueuePool::new(nz!(2));
//! let data = [3_u64, 1, 4, 1, 5, 9, 2, 6];
//!
//! let total = reduce(&pool, &data, 100, |a, b| a + b, nz!(2), Policy::Static);
//! assert_eq!(total, 131);
//!
//! let total = reduce(&pool, &data, 100, |a, b| a + b, nz!(2), Policy::Guided);
//! assert_eq!(total, 131);
//! ```

mod cursor;
mod reduce;
mod schedule;

pub use reduce::*;
