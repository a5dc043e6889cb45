//! Port abstraction traits.
//!
//! `SerialPortAdapter` lets the real device and the mock be used
//! interchangeably; `PortOpener` lets the supervisor create a fresh handle
//! on every reset without knowing which one it gets.

use super::error::PortError;
use serialport::{DataBits, FlowControl, Parity, StopBits};
use std::time::Duration;

/// Baud rate the receiver stick talks at.
pub const ANTENNA_BAUD_RATE: u32 = 16550;

/// Inter-character timeout configured on the handle.
pub const ANTENNA_READ_TIMEOUT: Duration = Duration::from_millis(2000);

/// Transport parameters for a serial port.
///
/// Only [`PortConfiguration::antenna`] is used in production; the receiver
/// firmware does not negotiate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortConfiguration {
    pub baud_rate: u32,
    pub data_bits: DataBits,
    pub flow_control: FlowControl,
    pub parity: Parity,
    pub stop_bits: StopBits,
    /// Per-read timeout.
    pub timeout: Duration,
}

impl PortConfiguration {
    /// 16550 baud, 8N1, no flow control or RS-485 signalling, 2 s read timeout.
    pub fn antenna() -> Self {
        Self {
            baud_rate: ANTENNA_BAUD_RATE,
            data_bits: DataBits::Eight,
            flow_control: FlowControl::None,
            parity: Parity::None,
            stop_bits: StopBits::One,
            timeout: ANTENNA_READ_TIMEOUT,
        }
    }
}

impl Default for PortConfiguration {
    fn default() -> Self {
        Self::antenna()
    }
}

/// Read side of an open serial handle.
///
/// The handle is closed when the adapter is dropped.
pub trait SerialPortAdapter: Send + std::fmt::Debug {
    /// Read bytes into `buffer`.
    ///
    /// Blocks for at most the configured timeout. Returns the number of
    /// bytes actually read.
    fn read_bytes(&mut self, buffer: &mut [u8]) -> Result<usize, PortError>;

    /// Device path this handle was opened on.
    fn name(&self) -> &str;

    /// Discard any unread data in the receive buffer.
    fn clear_input(&mut self) -> Result<(), PortError>;
}

/// Creates serial handles for a device path.
///
/// The supervisor calls this once at start and again on every reset.
pub trait PortOpener: Send + Sync {
    fn open(
        &self,
        device: &str,
        config: &PortConfiguration,
    ) -> Result<Box<dyn SerialPortAdapter>, PortError>;
}
