//! Port abstraction layer for serial communication.
//!
//! Provides the transport trait, the real `serialport` backed implementation,
//! a scripted mock device, and line framing on top of raw reads.

pub mod error;
pub mod line_reader;
pub mod mock;
pub mod sync_port;
pub mod traits;

pub use error::PortError;
pub use line_reader::{LineReader, RawLine, ReadOutcome, MAX_LINE_LEN};
pub use mock::{MockDevice, MockRead, MockSerialPort};
pub use sync_port::*;
pub use traits::*;
