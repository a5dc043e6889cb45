//! Time of the last line received from the port.
//!
//! Written by the reader loop only, read by the watchdog. Stored as a
//! millisecond offset in an atomic so neither side takes a lock; the
//! watchdog is fine with a slightly stale value.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

#[derive(Debug)]
pub struct LivenessClock {
    origin: Instant,
    last_seen_ms: AtomicU64,
}

impl Default for LivenessClock {
    fn default() -> Self {
        Self::new()
    }
}

impl LivenessClock {
    /// A clock whose last-seen time is now.
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            last_seen_ms: AtomicU64::new(0),
        }
    }

    /// Record that a line arrived. Never moves the clock backwards.
    pub fn mark_seen(&self) {
        let now = self.origin.elapsed().as_millis() as u64;
        self.last_seen_ms.fetch_max(now, Ordering::Relaxed);
    }

    pub fn last_seen(&self) -> Instant {
        self.origin + Duration::from_millis(self.last_seen_ms.load(Ordering::Relaxed))
    }

    /// Time elapsed since the last line.
    pub fn since_last_seen(&self) -> Duration {
        self.last_seen().elapsed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_starts_at_creation() {
        let clock = LivenessClock::new();
        assert!(clock.since_last_seen() < Duration::from_secs(1));
    }

    #[test]
    fn test_mark_seen_moves_forward() {
        let clock = LivenessClock::new();
        let before = clock.last_seen();
        thread::sleep(Duration::from_millis(20));
        clock.mark_seen();
        assert!(clock.last_seen() > before);
        assert!(clock.since_last_seen() < Duration::from_millis(20));
    }

    #[test]
    fn test_silence_accumulates() {
        let clock = LivenessClock::new();
        thread::sleep(Duration::from_millis(30));
        assert!(clock.since_last_seen() >= Duration::from_millis(30));
    }
}
