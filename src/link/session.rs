//! The open connection to the receiver.
//!
//! A `PortSession` owns the serial handle and the line buffer in front of
//! it. Handles are only ever replaced through [`PortSession::reset`], which
//! takes a [`GateGuard`] so a reset cannot happen without the gate held.

use super::error::LinkError;
use super::gate::GateGuard;
use crate::port::{
    LineReader, PortConfiguration, PortError, PortOpener, ReadOutcome, SerialPortAdapter,
};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Pause after closing the handle before it may be opened again.
pub const DEFAULT_COOL_DOWN: Duration = Duration::from_secs(5);

/// Counters kept for the life of a session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SessionStats {
    pub opens: u64,
    pub closes: u64,
    pub resets: u64,
    pub lines: u64,
}

pub struct PortSession {
    device: String,
    config: PortConfiguration,
    opener: Arc<dyn PortOpener>,
    handle: Option<Box<dyn SerialPortAdapter>>,
    reader: LineReader,
    cool_down: Duration,
    generation: u64,
    /// Set once a reopen failed; the session is never opened again.
    failed: bool,
    stats: SessionStats,
}

impl PortSession {
    /// Open `device` with the fixed antenna parameters.
    pub fn open(
        device: &str,
        opener: Arc<dyn PortOpener>,
        cool_down: Duration,
    ) -> Result<Self, LinkError> {
        if device.is_empty() {
            return Err(LinkError::EmptyDevicePath);
        }

        let mut session = Self {
            device: device.to_string(),
            config: PortConfiguration::antenna(),
            opener,
            handle: None,
            reader: LineReader::new(),
            cool_down,
            generation: 0,
            failed: false,
            stats: SessionStats::default(),
        };
        session.open_handle()?;
        Ok(session)
    }

    fn open_handle(&mut self) -> Result<(), LinkError> {
        let mut handle = self
            .opener
            .open(&self.device, &self.config)
            .map_err(|e| LinkError::open(&self.device, e))?;

        // Bytes queued by the driver before the open belong to no line we can trust.
        if let Err(e) = handle.clear_input() {
            debug!(device = handle.name(), error = %e, "Could not clear receive buffer");
        }

        debug!(device = handle.name(), baud_rate = self.config.baud_rate, "Opened serial device");
        self.handle = Some(handle);
        self.generation += 1;
        self.stats.opens += 1;
        Ok(())
    }

    /// Release the handle, then wait out the cool-down.
    ///
    /// Closing an already closed session does nothing.
    pub fn close(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };
        drop(handle);
        self.reader.clear();
        self.stats.closes += 1;
        debug!(device = %self.device, cool_down = ?self.cool_down, "Closed serial device");

        std::thread::sleep(self.cool_down);
    }

    /// Close and reopen the device. Requires the gate to be held.
    ///
    /// A failed reopen is final: the session stays closed and every later
    /// reset returns [`LinkError::Halted`] without touching the device.
    pub fn reset(&mut self, _gate: &GateGuard<'_>) -> Result<(), LinkError> {
        if self.failed {
            return Err(LinkError::Halted(self.device.clone()));
        }

        info!(device = %self.device, "Resetting serial port");
        self.close();
        if let Err(e) = self.open_handle() {
            self.failed = true;
            return Err(e);
        }
        self.stats.resets += 1;
        Ok(())
    }

    /// Read the next line, blocking for at most the handle's read timeout.
    pub fn read_line(&mut self) -> Result<ReadOutcome, PortError> {
        let handle = self.handle.as_mut().ok_or(PortError::NotOpen)?;
        let outcome = self.reader.read_line(handle.as_mut())?;
        if matches!(outcome, ReadOutcome::Line(_)) {
            self.stats.lines += 1;
        }
        Ok(outcome)
    }

    /// Incremented every time a new handle is opened.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Whether a reopen failed. The link must stop, not reset again.
    pub fn has_failed(&self) -> bool {
        self.failed
    }

    pub fn is_open(&self) -> bool {
        self.handle.is_some()
    }

    pub fn device(&self) -> &str {
        &self.device
    }

    pub fn config(&self) -> &PortConfiguration {
        &self.config
    }

    pub fn stats(&self) -> SessionStats {
        self.stats
    }
}

impl std::fmt::Debug for PortSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PortSession")
            .field("device", &self.device)
            .field("open", &self.is_open())
            .field("generation", &self.generation)
            .field("failed", &self.failed)
            .field("stats", &self.stats)
            .finish()
    }
}
