//! Cancellation token shared by the interpreter, the loop scheduler and
//! every in-flight action task.

use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::time::{Duration, Instant};

#[derive(Debug, Default)]
struct Inner {
    cancelled: Mutex<bool>,
    wake: Condvar,
}

/// Cloneable cancellation flag whose waits wake up as soon as it is set.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    inner: Arc<Inner>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the flag and wake every waiter. Idempotent.
    pub fn cancel(&self) {
        let mut cancelled = self
            .inner
            .cancelled
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        *cancelled = true;
        self.inner.wake.notify_all();
    }

    pub fn is_cancelled(&self) -> bool {
        *self
            .inner
            .cancelled
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Block until `deadline` or cancellation, whichever comes first.
    ///
    /// Returns `true` if the token was cancelled.
    pub fn wait_until(&self, deadline: Instant) -> bool {
        let mut cancelled = self
            .inner
            .cancelled
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        loop {
            if *cancelled {
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            let (guard, _) = self
                .inner
                .wake
                .wait_timeout(cancelled, deadline - now)
                .unwrap_or_else(PoisonError::into_inner);
            cancelled = guard;
        }
    }

    /// Block for `timeout` or until cancellation. Returns `true` if cancelled.
    pub fn wait_for(&self, timeout: Duration) -> bool {
        self.wait_until(Instant::now() + timeout)
    }

    /// Cancel the token from a watchdog thread once `timeout` elapses.
    pub fn cancel_after(&self, timeout: Duration) {
        let token = self.clone();
        std::thread::spawn(move || {
            if !token.wait_for(timeout) {
                tracing::info!(?timeout, "run time elapsed, cancelling");
                token.cancel();
            }
        });
    }
}
