//! Transport errors.
//!
//! Kept apart from supervision errors so the reader loop can tell a quiet
//! line from a broken one.

use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PortError {
    #[error("Serial device not found: {0}")]
    NotFound(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The driver refused the transport parameters.
    #[error("Device rejected port settings: {0}")]
    Rejected(String),

    #[error("Port is not open")]
    NotOpen,

    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),
}

impl PortError {
    pub fn not_found(device: impl Into<String>) -> Self {
        Self::NotFound(device.into())
    }

    /// Whether this only means nothing arrived within the read timeout.
    ///
    /// The receiver is silent most of the time, so the reader treats these
    /// like end-of-stream rather than a transport fault.
    pub fn is_quiet(&self) -> bool {
        match self {
            Self::Io(e) => matches!(
                e.kind(),
                io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock | io::ErrorKind::UnexpectedEof
            ),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn io_error(kind: io::ErrorKind) -> PortError {
        PortError::Io(io::Error::new(kind, "scripted"))
    }

    #[test]
    fn test_error_display() {
        let err = PortError::not_found("/dev/ttyUSB0");
        assert_eq!(err.to_string(), "Serial device not found: /dev/ttyUSB0");
        assert_eq!(PortError::NotOpen.to_string(), "Port is not open");
    }

    #[test]
    fn test_quiet_errors() {
        assert!(io_error(io::ErrorKind::TimedOut).is_quiet());
        assert!(io_error(io::ErrorKind::WouldBlock).is_quiet());
        assert!(io_error(io::ErrorKind::UnexpectedEof).is_quiet());
        assert!(!io_error(io::ErrorKind::BrokenPipe).is_quiet());
        assert!(!PortError::NotOpen.is_quiet());
        assert!(!PortError::Rejected("baud".into()).is_quiet());
    }
}
