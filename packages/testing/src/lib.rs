//! Private helpers shared by the tests and examples of this workspace.

use std::panic;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

/// Runs a test body on a helper thread and panics if it does not finish
/// within the watchdog timeout.
///
/// Concurrency bugs in the code under test tend to show up as tests that
/// block forever on a condition variable or a completion handle. The
/// watchdog turns such hangs into loud failures instead of stalled runs.
///
/// # Panics
///
/// Panics if the test body exceeds the timeout, and re-raises any panic
/// from the test body itself.
///
/// # Example
///
/// ```
/// use testing::with_watchdog;
///
/// let result = with_watchdog(|| 2 + 2);
/// assert_eq!(result, 4);
/// ```
pub fn with_watchdog<F, R>(body: F) -> R
where
    F: FnOnce() -> R + Send + 'static,
    R: Send + 'static,
{
    let (completed_tx, completed_rx) = mpsc::channel();

    let body_thread = thread::spawn(move || {
        // A send failure means the watchdog already gave up waiting.
        drop(completed_tx.send(body()));
    });

    match completed_rx.recv_timeout(watchdog_timeout()) {
        Ok(result) => {
            body_thread
                .join()
                .expect("test body cannot panic after sending its result");
            result
        }
        Err(mpsc::RecvTimeoutError::Timeout) => {
            panic!("test body did not finish within {:?}", watchdog_timeout())
        }
        Err(mpsc::RecvTimeoutError::Disconnected) => match body_thread.join() {
            Ok(()) => panic!("test body thread exited without reporting a result"),
            Err(payload) => panic::resume_unwind(payload),
        },
    }
}

/// Thread synchronization is dramatically slower under Miri, so the watchdog
/// waits longer there before declaring a hang.
fn watchdog_timeout() -> Duration {
    if cfg!(miri) {
        Duration::from_secs(120)
    } else {
        Duration::from_secs(30)
    }
}
