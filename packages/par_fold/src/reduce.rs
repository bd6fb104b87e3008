//! The parallel reduce operation built on a worker pool.

use std::mem;
use std::num::NonZero;
use std::panic::resume_unwind;
use std::sync::Mutex;

use new_zealand::nz;
use task_pool::Pool;

use crate::cursor::RangeCursor;
use crate::schedule::{GuidedChunks, StaticChunks};

/// Work-distribution policy for [`reduce`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub enum Policy {
    /// Fixed-size chunks claimed with fetch-and-add.
    ///
    /// Cheapest per claim, but the tail of the range is balanced no more
    /// finely than the chunk size allows.
    Static,

    /// Claims start at a fixed fraction of the remaining work and shrink as
    /// the range empties, ending with fixed-size claims.
    ///
    /// Fewer coordination points early, better load balance late, bounding
    /// worst-case tail imbalance when chunk costs are uneven.
    Guided,
}

/// Folds `items` with `op`, starting from `initial`, across the workers of
/// `pool`.
///
/// Submits exactly one task per pool worker and blocks until all of them
/// have finished, then returns the combined value. Each worker folds the
/// chunks it claims into a local accumulator and merges that into the shared
/// result exactly once, so the shared lock is contended once per worker, not
/// once per chunk.
///
/// `op` must be associative and commutative: chunks are claimed in a
/// nondeterministic order and partial results merge in arbitrary order.
/// Under that contract the result equals the sequential left fold of `items`
/// onto `initial` regardless of worker count, chunk size or policy. The
/// contract is not checked.
///
/// An empty `items` returns `initial` unchanged without submitting any task.
/// A chunk size of zero is unrepresentable by construction.
///
/// # Panics
///
/// If `op` panics on some worker, the panic is re-raised on the calling
/// thread after all workers have finished. Panics if `pool` has already been
/// shut down.
///
/// # Example
///
/// ```
/// use new_zealand::nz;
/// use par_fold::{Policy, reduce};
/// use task_pool::SharedQueuePool;
///
/// let pool = SharedQueuePool::new(nz!(4));
/// let data: Vec<u64> = (1..=1000).collect();
///
/// let total = reduce(&pool, &data, 0, |a, b| a + b, nz!(64), Policy::Guided);
/// assert_eq!(total, 500_500);
/// ```
pub fn reduce<P, T, F>(
    pool: &P,
    items: &[T],
    initial: T,
    op: F,
    chunk_size: NonZero<usize>,
    policy: Policy,
) -> T
where
    P: Pool,
    T: Clone + Send + Sync,
    F: Fn(T, T) -> T + Sync,
{
    if items.is_empty() {
        return initial;
    }

    let cursor = RangeCursor::new(items.len());

    // `None` only transiently, while a merge holds the lock.
    let accumulator = Mutex::new(Some(initial));

    let static_schedule = StaticChunks::new(chunk_size);
    let guided_schedule = GuidedChunks::new(chunk_size, pool.worker_count());

    let mut handles = Vec::with_capacity(pool.worker_count().get());
    let mut rejected = None;

    for _ in 0..pool.worker_count().get() {
        let task: Box<dyn FnOnce() + Send + '_> = match policy {
            Policy::Static => Box::new(|| {
                fold_static(items, &cursor, &accumulator, &op, &static_schedule);
            }),
            Policy::Guided => Box::new(|| {
                fold_guided(items, &cursor, &accumulator, &op, &guided_schedule);
            }),
        };

        // SAFETY: The task borrows `items`, `op`, the cursor, the schedules
        // and the accumulator, all of which live until this function
        // returns, and every return path below first joins every handle
        // obtained here. Functionally the task never outlives its borrows;
        // the `'static` bound on `Pool::submit` exists only because the
        // compiler cannot see that scoped-join guarantee.
        let task = unsafe {
            mem::transmute::<Box<dyn FnOnce() + Send + '_>, Box<dyn FnOnce() + Send + 'static>>(
                task,
            )
        };

        match pool.submit(task) {
            Ok(handle) => handles.push(handle),
            Err(error) => {
                // Tasks already submitted keep running; remember the error
                // and fall through to join them before reporting it.
                rejected = Some(error);
                break;
            }
        }
    }

    // Block on every handle before touching the accumulator or unwinding:
    // the workers borrow our locals. A panicking `op` is re-raised only
    // after every worker has finished with the shared state.
    let mut panic_payload = None;
    for handle in handles {
        if let Err(payload) = handle.join() {
            panic_payload.get_or_insert(payload);
        }
    }

    if let Some(payload) = panic_payload {
        resume_unwind(payload);
    }

    assert!(
        rejected.is_none(),
        "reduce requires a pool that has not been shut down"
    );

    accumulator
        .into_inner()
        .expect("merges cannot poison the lock once every join has succeeded")
        .expect("every merge refills the accumulator before releasing the lock")
}

/// One worker's contribution under the static policy.
///
/// Seeds the local accumulator from an initial claim of two elements so that
/// `op` never needs an identity element, then folds fixed-size chunks until
/// the cursor is exhausted and merges the local value into the shared
/// accumulator exactly once.
fn fold_static<T, F>(
    items: &[T],
    cursor: &RangeCursor,
    shared: &Mutex<Option<T>>,
    op: &F,
    schedule: &StaticChunks,
) where
    T: Clone,
    F: Fn(T, T) -> T,
{
    let Some(seed) = cursor.claim(nz!(2)) else {
        // The range was exhausted before this worker claimed anything;
        // it contributes nothing.
        return;
    };

    let seed_elements = items.get(seed).expect("claims are clamped to the range");
    let (first, rest) = seed_elements
        .split_first()
        .expect("successful claims are never empty");

    if rest.is_empty() {
        // Only one element was left in the range: fold it straight into the
        // shared accumulator, there is nothing to pair it with locally.
        merge_into(shared, first.clone(), op);
        return;
    }

    let mut local = fold_onto(first.clone(), rest, op);

    while let Some(range) = schedule.next_claim(cursor) {
        let elements = items.get(range).expect("claims are clamped to the range");
        local = fold_onto(local, elements, op);
    }

    merge_into(shared, local, op);
}

/// One worker's contribution under the guided policy.
///
/// The local accumulator starts empty rather than seeding from a fixed-size
/// claim: coarse-phase claims vary in size, so the first claimed element
/// seeds the accumulator instead.
fn fold_guided<T, F>(
    items: &[T],
    cursor: &RangeCursor,
    shared: &Mutex<Option<T>>,
    op: &F,
    schedule: &GuidedChunks,
) where
    T: Clone,
    F: Fn(T, T) -> T,
{
    let mut local: Option<T> = None;

    while let Some(range) = schedule.next_claim(cursor) {
        let elements = items.get(range).expect("claims are clamped to the range");

        local = Some(match local {
            Some(accumulated) => fold_onto(accumulated, elements, op),
            None => {
                let (first, rest) = elements
                    .split_first()
                    .expect("successful claims are never empty");
                fold_onto(first.clone(), rest, op)
            }
        });
    }

    if let Some(partial) = local {
        merge_into(shared, partial, op);
    }
}

/// Sequentially folds `elements` onto an existing accumulator value.
fn fold_onto<T, F>(accumulator: T, elements: &[T], op: &F) -> T
where
    T: Clone,
    F: Fn(T, T) -> T,
{
    elements
        .iter()
        .fold(accumulator, |accumulated, element| {
            op(accumulated, element.clone())
        })
}

/// Merges one worker's partial result into the shared accumulator.
///
/// Called at most once per worker task, so the lock is contended once per
/// worker per reduce call, never once per chunk.
fn merge_into<T, F>(shared: &Mutex<Option<T>>, partial: T, op: &F)
where
    F: Fn(T, T) -> T,
{
    let mut slot = shared
        .lock()
        .expect("an earlier merge panicked inside the caller-supplied operator");

    let merged = op(
        slot.take()
            .expect("the slot is only vacant while a merge holds the lock"),
        partial,
    );

    *slot = Some(merged);
}
