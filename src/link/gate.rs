//! Pause gate guarding port maintenance.
//!
//! One actor at a time (watchdog or the reader's error path) may hold the
//! gate exclusively while it closes and reopens the port. The reader calls
//! [`Gate::await_clear`] before every read and parks until maintenance is
//! over.

use parking_lot::{Condvar, Mutex};

#[derive(Debug, Default)]
pub struct Gate {
    held: Mutex<bool>,
    cleared: Condvar,
}

impl Gate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Block until no one else holds the gate, then hold it.
    ///
    /// The gate is released when the returned guard is dropped.
    pub fn acquire_exclusive(&self) -> GateGuard<'_> {
        let mut held = self.held.lock();
        while *held {
            self.cleared.wait(&mut held);
        }
        *held = true;
        GateGuard { gate: self }
    }

    /// Block until no exclusive holder is active.
    pub fn await_clear(&self) {
        let mut held = self.held.lock();
        while *held {
            self.cleared.wait(&mut held);
        }
    }

    pub fn is_held(&self) -> bool {
        *self.held.lock()
    }

    fn release(&self) {
        *self.held.lock() = false;
        self.cleared.notify_all();
    }
}

/// Proof of exclusive gate ownership.
#[derive(Debug)]
#[must_use = "the gate is released as soon as the guard is dropped"]
pub struct GateGuard<'a> {
    gate: &'a Gate,
}

impl GateGuard<'_> {
    /// Release the gate explicitly.
    pub fn release(self) {}
}

impl Drop for GateGuard<'_> {
    fn drop(&mut self) {
        self.gate.release();
    }
}
