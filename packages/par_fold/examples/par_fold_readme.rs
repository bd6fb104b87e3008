//! Reduces a range of integers under both scheduling policies and checks
//! the results against the sequential fold.

use new_zealand::nz;
use par_fold::{Policy, reduce};
use task_pool::SharedQueuePool;

fn main() {
    let pool = SharedQueuePool::new(nz!(4));
    let items: Vec<u64> = (1..=100_000).collect();

    let expected: u64 = items.iter().sum();

    for policy in [Policy::Static, Policy::Guided] {
        let total = reduce(&pool, &items, 0, |a, b| a + b, nz!(64), policy);
        assert_eq!(total, expected);
        println!("{policy:?}: {total}");
    }
}
