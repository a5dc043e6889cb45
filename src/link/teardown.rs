//! One-shot shutdown signal shared between the process and the link threads.

use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Debug, Default)]
struct Inner {
    triggered: Mutex<bool>,
    changed: Condvar,
}

/// Once triggered, stays triggered. Cloning shares the same signal.
#[derive(Debug, Clone, Default)]
pub struct TeardownSignal {
    inner: Arc<Inner>,
}

impl TeardownSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Trigger the signal. Returns `true` for the call that actually set it.
    pub fn trigger(&self) -> bool {
        let mut triggered = self.inner.triggered.lock();
        let first = !*triggered;
        *triggered = true;
        self.inner.changed.notify_all();
        first
    }

    pub fn is_triggered(&self) -> bool {
        *self.inner.triggered.lock()
    }

    /// Sleep for `timeout` or until triggered, whichever comes first.
    ///
    /// Returns whether the signal is set.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut triggered = self.inner.triggered.lock();
        while !*triggered {
            if self
                .inner
                .changed
                .wait_until(&mut triggered, deadline)
                .timed_out()
            {
                break;
            }
        }
        *triggered
    }
}
