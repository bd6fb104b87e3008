//! Submits a batch of tasks to both pool variants and waits for completion.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use new_zealand::nz;
use task_pool::{Pool, SharedQueuePool, ShardedQueuePool};

fn main() {
    run_batch("shared queue", &SharedQueuePool::new(nz!(4)));
    run_batch("sharded round-robin", &ShardedQueuePool::new(nz!(4)));
}

fn run_batch<P: Pool>(label: &str, pool: &P) {
    let counter = Arc::new(AtomicUsize::new(0));

    let handles: Vec<_> = (0..32)
        .map(|_| {
            let counter = Arc::clone(&counter);
            pool.submit(move || {
                counter.fetch_add(1, Ordering::Relaxed);
            })
            .expect("pool is running")
        })
        .collect();

    for handle in handles {
        handle.join().expect("counting tasks do not panic");
    }

    println!(
        "{label}: {} tasks ran on {} workers",
        counter.load(Ordering::Relaxed),
        pool.worker_count()
    );

    pool.shutdown();
}
