//! Shared test utilities for the link supervision tests.
//!
//! This module provides:
//! - Fast link timings so watchdog scenarios finish in milliseconds
//! - Well-formed and malformed receiver lines
//! - A polling helper for conditions reached by background threads

#![allow(dead_code)]

use smatrix_exporter::link::LinkSettings;
use std::thread;
use std::time::{Duration, Instant};

/// A frame as the receiver prints it.
pub const FRAME: &str = "045  I --- 04:123456 --:------ 04:123456 1F09 003 FF0532";

/// A second, distinct frame.
pub const REPLY_FRAME: &str = "061 RP --- 01:145038 18:013393 --:------ 000A 006 081001F409C4";

/// Long enough to pass the length check, but not a frame.
pub const NOISE: &str = "# evofw3 0.7.1 this line is long enough to not be dropped";

/// Settings with a watchdog that never fires during a test.
pub fn quiet_settings() -> LinkSettings {
    LinkSettings {
        cool_down: Duration::ZERO,
        watchdog_interval: Duration::from_millis(20),
        jitter_percent: 10,
        stale_after: Duration::from_secs(60),
    }
}

/// Settings with a watchdog that resets after `stale_after` of silence.
pub fn watchdog_settings(stale_after: Duration) -> LinkSettings {
    LinkSettings {
        cool_down: Duration::ZERO,
        watchdog_interval: Duration::from_millis(10),
        jitter_percent: 0,
        stale_after,
    }
}

/// Poll `condition` every few milliseconds until it holds or `timeout` passes.
///
/// Returns whether the condition was met.
pub fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    condition()
}
