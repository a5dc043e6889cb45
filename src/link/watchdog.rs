//! Liveness monitor.
//!
//! Wakes up roughly every `watchdog_interval` and resets the port if
//! nothing has been received for longer than `stale_after`. The interval is
//! jittered so a fleet of exporters restarted together does not reset in
//! lockstep.

use super::error::LinkError;
use super::{Link, LinkSettings};
use rand::Rng;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// `base` shifted by a uniform random amount of up to `percent` percent either way.
pub fn jittered(base: Duration, percent: u8, rng: &mut impl Rng) -> Duration {
    if percent == 0 || base.is_zero() {
        return base;
    }
    let base_secs = base.as_secs_f64();
    let spread = base_secs * f64::from(percent.min(100)) / 100.0;
    let offset = rng.gen_range(-spread..=spread);
    Duration::from_secs_f64((base_secs + offset).max(0.0))
}

#[derive(Debug)]
pub struct Watchdog {
    link: Arc<Link>,
    interval: Duration,
    jitter_percent: u8,
    stale_after: Duration,
    last_reset: Option<Instant>,
    resets: u64,
}

impl Watchdog {
    pub fn new(link: Arc<Link>, settings: &LinkSettings) -> Self {
        Self {
            link,
            interval: settings.watchdog_interval,
            jitter_percent: settings.jitter_percent,
            stale_after: settings.stale_after,
            last_reset: None,
            resets: 0,
        }
    }

    /// Check liveness until teardown. Only a failed reopen ends it early.
    pub fn run(mut self) -> Result<u64, LinkError> {
        let mut rng = rand::thread_rng();
        loop {
            let nap = jittered(self.interval, self.jitter_percent, &mut rng);
            if self.link.teardown.wait_timeout(nap) {
                debug!(resets = self.resets, "Watchdog stopped");
                return Ok(self.resets);
            }
            self.check()?;
        }
    }

    /// Time since the link last showed signs of life.
    ///
    /// A reset counts as a fresh start, so one stretch of silence costs one
    /// reset per threshold instead of one per wake-up.
    pub fn silence(&self) -> Duration {
        let since_line = self.link.clock.since_last_seen();
        match self.last_reset {
            Some(reset) => since_line.min(reset.elapsed()),
            None => since_line,
        }
    }

    /// Reset the port if the link is stale. Returns whether a reset happened.
    pub fn check(&mut self) -> Result<bool, LinkError> {
        let silence = self.silence();
        if silence <= self.stale_after {
            return Ok(false);
        }

        info!(
            silence = ?silence,
            threshold = ?self.stale_after,
            "Received last message more than {:?} ago, resetting serial port...",
            self.stale_after
        );

        let guard = self.link.gate.acquire_exclusive();
        let mut session = self.link.session.lock();
        if self.link.teardown.is_triggered() || session.has_failed() {
            return Ok(false);
        }
        session.reset(&guard)?;
        drop(session);
        drop(guard);

        self.last_reset = Some(Instant::now());
        self.resets += 1;
        Ok(true)
    }

    pub fn resets(&self) -> u64 {
        self.resets
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::link::TeardownSignal;
    use crate::port::MockDevice;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::thread;

    fn settings(stale_after: Duration) -> LinkSettings {
        LinkSettings {
            cool_down: Duration::ZERO,
            watchdog_interval: Duration::from_millis(10),
            jitter_percent: 0,
            stale_after,
        }
    }

    fn link(device: &MockDevice, settings: &LinkSettings) -> Arc<Link> {
        Link::open(
            "/dev/mock",
            Arc::new(device.clone()),
            settings,
            TeardownSignal::new(),
        )
        .unwrap()
    }

    #[test]
    fn test_jitter_stays_in_band() {
        let mut rng = StdRng::seed_from_u64(7);
        let base = Duration::from_secs(120);
        for _ in 0..1000 {
            let nap = jittered(base, 25, &mut rng);
            assert!(nap >= Duration::from_secs(90), "{nap:?}");
            assert!(nap <= Duration::from_secs(150), "{nap:?}");
        }
    }

    #[test]
    fn test_jitter_varies() {
        let mut rng = StdRng::seed_from_u64(7);
        let base = Duration::from_secs(120);
        let first = jittered(base, 25, &mut rng);
        assert!((0..20).any(|_| jittered(base, 25, &mut rng) != first));
    }

    #[test]
    fn test_zero_jitter_is_exact() {
        let mut rng = StdRng::seed_from_u64(7);
        let base = Duration::from_secs(120);
        assert_eq!(jittered(base, 0, &mut rng), base);
    }

    #[test]
    fn test_fresh_link_is_left_alone() {
        let device = MockDevice::new();
        let settings = settings(Duration::from_secs(60));
        let mut watchdog = Watchdog::new(link(&device, &settings), &settings);

        assert!(!watchdog.check().unwrap());
        assert_eq!(device.opens(), 1);
    }

    #[test]
    fn test_stale_link_is_reset_once_per_threshold() {
        let device = MockDevice::new();
        let settings = settings(Duration::from_millis(30));
        let link = link(&device, &settings);
        let mut watchdog = Watchdog::new(Arc::clone(&link), &settings);

        thread::sleep(Duration::from_millis(40));
        assert!(watchdog.check().unwrap());
        assert!(!watchdog.check().unwrap());
        assert_eq!(device.opens(), 2);
        assert_eq!(link.session.lock().stats().resets, 1);
        assert!(!link.gate.is_held());
    }

    #[test]
    fn test_no_reset_after_teardown() {
        let device = MockDevice::new();
        let settings = settings(Duration::from_millis(5));
        let link = link(&device, &settings);
        let mut watchdog = Watchdog::new(Arc::clone(&link), &settings);

        link.teardown.trigger();
        thread::sleep(Duration::from_millis(10));
        assert!(!watchdog.check().unwrap());
        assert_eq!(device.opens(), 1);
    }

    #[test]
    fn test_failed_reopen_is_fatal() {
        let device = MockDevice::new();
        device.fail_opens_after(1);
        let settings = settings(Duration::from_millis(5));
        let link = link(&device, &settings);
        let watchdog = Watchdog::new(Arc::clone(&link), &settings);

        thread::sleep(Duration::from_millis(10));
        let result = watchdog.run();
        assert!(matches!(result, Err(LinkError::Open { .. })));
        assert_eq!(device.open_attempts(), 2);
    }

    #[test]
    fn test_lost_device_is_not_reopened() {
        let device = MockDevice::new();
        device.fail_opens_after(1);
        let settings = settings(Duration::from_millis(5));
        let link = link(&device, &settings);
        {
            let guard = link.gate.acquire_exclusive();
            assert!(link.session.lock().reset(&guard).is_err());
        }
        let mut watchdog = Watchdog::new(Arc::clone(&link), &settings);

        thread::sleep(Duration::from_millis(10));
        assert!(!watchdog.check().unwrap());
        assert_eq!(device.open_attempts(), 2);
    }

    #[test]
    fn test_run_stops_on_teardown() {
        let device = MockDevice::new();
        let settings = settings(Duration::from_secs(60));
        let link = link(&device, &settings);
        let watchdog = Watchdog::new(Arc::clone(&link), &settings);

        let handle = thread::spawn(move || watchdog.run());
        thread::sleep(Duration::from_millis(30));
        link.teardown.trigger();
        assert_eq!(handle.join().unwrap().unwrap(), 0);
    }
}
