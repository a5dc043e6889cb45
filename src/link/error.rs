//! Errors that stop the supervisor.
//!
//! Everything recoverable (read faults, silence, garbled lines) is handled
//! inside the link and only shows up in the logs; what remains here halts
//! the process.

use crate::port::PortError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LinkError {
    /// The device could not be opened, initially or during a reset.
    #[error("Failed opening serial device {device}: {source}")]
    Open {
        device: String,
        #[source]
        source: PortError,
    },

    /// A reset was asked for after an earlier reopen had already failed.
    #[error("Serial device {0} was lost, not reopening")]
    Halted(String),

    /// No device path was configured.
    #[error("Please set the usb device path for the antenna")]
    EmptyDevicePath,

    /// A supervisor thread could not be started.
    #[error("Failed spawning {name} thread: {source}")]
    Spawn {
        name: &'static str,
        #[source]
        source: std::io::Error,
    },

    /// A supervisor thread panicked.
    #[error("The {0} thread panicked")]
    Panicked(&'static str),
}

impl LinkError {
    pub fn open(device: impl Into<String>, source: PortError) -> Self {
        Self::Open {
            device: device.into(),
            source,
        }
    }
}
