//! End-to-end supervision scenarios against a scripted receiver.
//!
//! Every test starts the real reader and watchdog threads on a `MockDevice`
//! and checks what reached the collector and how the device was handled.

mod common;

use common::{quiet_settings, wait_until, watchdog_settings, FRAME, NOISE, REPLY_FRAME};
use pretty_assertions::assert_eq;
use smatrix_exporter::link::{LinkError, Supervisor, TeardownSignal, Verb};
use smatrix_exporter::port::MockDevice;
use smatrix_exporter::FrameCollector;
use std::io;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

const DEVICE: &str = "/dev/ttyMOCK0";
const PATIENCE: Duration = Duration::from_secs(5);

fn collector() -> Arc<FrameCollector> {
    Arc::new(FrameCollector::new(64))
}

// ============================================================================
// Frame delivery
// ============================================================================

#[test]
fn test_valid_frames_reach_the_collector_in_order() {
    let device = MockDevice::new();
    device.push_line(FRAME);
    device.push_line(NOISE);
    device.push_line("short ERR");
    device.push_line(REPLY_FRAME);
    let collector = collector();

    let handle = Supervisor::start(
        DEVICE,
        Arc::new(device.clone()),
        collector.clone(),
        quiet_settings(),
    )
    .unwrap();

    assert!(wait_until(PATIENCE, || collector.summary().accepted == 2));
    handle.teardown();
    let report = handle.wait().unwrap();

    assert_eq!(report.reader.verdicts.valid_frames, 2);
    assert_eq!(report.reader.verdicts.other, 1);
    assert_eq!(report.reader.verdicts.flagged_errors, 1);
    assert_eq!(report.reader.session.lines, 4);

    let frames = collector.drain();
    let raw: Vec<&str> = frames.iter().map(|f| f.raw.as_str()).collect();
    assert_eq!(raw, vec![FRAME, REPLY_FRAME]);
    assert_eq!(frames[0].verb, Verb::I);
    assert_eq!(frames[1].verb, Verb::Rp);
    assert_eq!(frames[1].source(), Some("01:145038"));
}

#[test]
fn test_line_split_across_reads_is_reassembled() {
    let device = MockDevice::new();
    let (head, tail) = FRAME.split_at(20);
    device.push_bytes(head.as_bytes());
    device.push_silence(Duration::from_millis(5));
    device.push_bytes(format!("{tail}\r\n").as_bytes());
    let collector = collector();

    let handle = Supervisor::start(
        DEVICE,
        Arc::new(device.clone()),
        collector.clone(),
        quiet_settings(),
    )
    .unwrap();

    assert!(wait_until(PATIENCE, || collector.summary().accepted == 1));
    handle.teardown();
    handle.wait().unwrap();

    assert_eq!(collector.drain()[0].raw, FRAME);
}

// ============================================================================
// Read errors
// ============================================================================

#[test]
fn test_read_error_resets_port_and_reading_resumes() {
    let device = MockDevice::new();
    device.push_line(FRAME);
    device.push_error(io::ErrorKind::BrokenPipe);
    device.push_line(REPLY_FRAME);
    let collector = collector();

    let handle = Supervisor::start(
        DEVICE,
        Arc::new(device.clone()),
        collector.clone(),
        quiet_settings(),
    )
    .unwrap();

    assert!(wait_until(PATIENCE, || collector.summary().accepted == 2));
    handle.teardown();
    let report = handle.wait().unwrap();

    assert_eq!(report.reader.read_errors, 1);
    assert_eq!(report.reader.error_resets, 1);
    assert_eq!(report.reader.session.resets, 1);
    assert_eq!(report.watchdog_resets, 0);
    assert_eq!(device.opens(), 2);
    assert_eq!(device.open_handles(), 0);
    assert_eq!(device.stale_reads(), 0);
}

#[test]
fn test_timeouts_are_not_errors() {
    let device = MockDevice::new();
    device.push_silence(Duration::from_millis(5));
    device.push_error(io::ErrorKind::TimedOut);
    device.push_error(io::ErrorKind::WouldBlock);
    device.push_line(FRAME);
    let collector = collector();

    let handle = Supervisor::start(
        DEVICE,
        Arc::new(device.clone()),
        collector.clone(),
        quiet_settings(),
    )
    .unwrap();

    assert!(wait_until(PATIENCE, || collector.summary().accepted == 1));
    handle.teardown();
    let report = handle.wait().unwrap();

    assert_eq!(report.reader.read_errors, 0);
    assert_eq!(device.opens(), 1);
}

#[test]
fn test_failed_reopen_is_fatal() {
    let device = MockDevice::new();
    device.fail_opens_after(1);
    device.push_error(io::ErrorKind::BrokenPipe);

    let handle = Supervisor::start(
        DEVICE,
        Arc::new(device.clone()),
        collector(),
        quiet_settings(),
    )
    .unwrap();

    assert!(wait_until(PATIENCE, || handle.is_finished()));
    let result = handle.wait();

    assert!(matches!(result, Err(LinkError::Open { .. })));
    assert_eq!(device.opens(), 1);
    assert_eq!(device.open_attempts(), 2, "reopened after a fatal failure");
    assert_eq!(device.open_handles(), 0);
}

#[test]
fn test_failed_watchdog_reopen_is_attempted_once() {
    // The reader races the watchdog for the gate right after the failure,
    // so repeat to give a second reopen a chance to show up.
    for _ in 0..10 {
        let device = MockDevice::new();
        device.fail_opens_after(1);

        let handle = Supervisor::start(
            DEVICE,
            Arc::new(device.clone()),
            collector(),
            watchdog_settings(Duration::from_millis(20)),
        )
        .unwrap();
        let result = handle.wait();

        assert!(matches!(result, Err(LinkError::Open { .. })));
        assert_eq!(device.open_attempts(), 2, "reopened after a fatal failure");
        assert_eq!(device.open_handles(), 0);
    }
}

#[test]
fn test_unopenable_device_fails_to_start() {
    let device = MockDevice::new();
    device.fail_opens_after(0);

    let result = Supervisor::start(DEVICE, Arc::new(device), collector(), quiet_settings());

    assert!(matches!(result, Err(LinkError::Open { .. })));
}

#[test]
fn test_empty_device_path_fails_to_start() {
    let device = MockDevice::new();

    let result = Supervisor::start("", Arc::new(device.clone()), collector(), quiet_settings());

    assert!(matches!(result, Err(LinkError::EmptyDevicePath)));
    assert_eq!(device.opens(), 0);
}

// ============================================================================
// Watchdog
// ============================================================================

#[test]
fn test_silence_triggers_one_reset_per_threshold() {
    let device = MockDevice::new();
    let handle = Supervisor::start(
        DEVICE,
        Arc::new(device.clone()),
        collector(),
        watchdog_settings(Duration::from_millis(300)),
    )
    .unwrap();

    assert!(wait_until(PATIENCE, || device.opens() == 2));
    thread::sleep(Duration::from_millis(100));
    assert_eq!(device.opens(), 2, "reset again before the threshold passed");

    handle.teardown();
    let report = handle.wait().unwrap();

    assert_eq!(report.watchdog_resets, 1);
    assert_eq!(report.reader.error_resets, 0);
    assert_eq!(device.open_handles(), 0);
}

#[test]
fn test_steady_traffic_keeps_watchdog_quiet() {
    let device = MockDevice::new();
    for _ in 0..15 {
        device.push_line(FRAME);
        device.push_silence(Duration::from_millis(20));
    }
    let collector = collector();

    let handle = Supervisor::start(
        DEVICE,
        Arc::new(device.clone()),
        collector.clone(),
        watchdog_settings(Duration::from_millis(200)),
    )
    .unwrap();

    assert!(wait_until(PATIENCE, || device.pending() == 0));
    handle.teardown();
    let report = handle.wait().unwrap();

    assert_eq!(report.watchdog_resets, 0);
    assert_eq!(collector.summary().accepted, 15);
    assert_eq!(device.opens(), 1);
}

#[test]
fn test_resets_never_race_reads() {
    let device = MockDevice::new().with_idle_read(Duration::from_millis(3));
    let handle = Supervisor::start(
        DEVICE,
        Arc::new(device.clone()),
        collector(),
        watchdog_settings(Duration::from_millis(15)),
    )
    .unwrap();

    let mut max_handles = 0;
    let enough = wait_until(PATIENCE, || {
        max_handles = max_handles.max(device.open_handles());
        device.opens() >= 6
    });
    assert!(enough);

    handle.teardown();
    let report = handle.wait().unwrap();

    assert!(max_handles <= 1, "two handles open at once");
    assert_eq!(device.stale_reads(), 0);
    assert_eq!(device.opens_during_read(), 0);
    assert_eq!(u64::from(device.opens()), 1 + report.watchdog_resets);
    assert_eq!(device.open_handles(), 0);
}

// ============================================================================
// Teardown
// ============================================================================

#[test]
fn test_teardown_closes_once_and_stops_reading() {
    let device = MockDevice::new();
    let handle = Supervisor::start(
        DEVICE,
        Arc::new(device.clone()),
        collector(),
        quiet_settings(),
    )
    .unwrap();

    assert!(wait_until(PATIENCE, || device.reads() > 2));
    handle.teardown();
    handle.teardown();
    let report = handle.wait().unwrap();

    assert_eq!(report.reader.session.closes, 1);
    assert_eq!(device.open_handles(), 0);

    let reads = device.reads();
    thread::sleep(Duration::from_millis(50));
    assert_eq!(device.reads(), reads);
}

#[test]
fn test_external_signal_tears_down() {
    let device = MockDevice::new();
    let signal = TeardownSignal::new();
    let handle = Supervisor::start_with_signal(
        DEVICE,
        Arc::new(device.clone()),
        collector(),
        quiet_settings(),
        signal.clone(),
    )
    .unwrap();

    assert!(signal.trigger());
    assert!(wait_until(PATIENCE, || handle.is_finished()));
    handle.wait().unwrap();

    assert_eq!(device.open_handles(), 0);
}

#[test]
fn test_lines_refresh_liveness_clock() {
    let device = MockDevice::new();
    let handle = Supervisor::start(
        DEVICE,
        Arc::new(device.clone()),
        collector(),
        quiet_settings(),
    )
    .unwrap();

    thread::sleep(Duration::from_millis(60));
    assert!(handle.since_last_line() >= Duration::from_millis(50));

    device.push_line(NOISE);
    assert!(wait_until(PATIENCE, || handle.since_last_line()
        < Duration::from_millis(40)));

    handle.teardown();
    handle.wait().unwrap();
}
