//! Smatrix exporter library
//!
//! Supervises an 868MHz RF receiver on a serial link: keeps the port open
//! across silent failures, classifies the lines it emits and hands valid
//! protocol frames to a downstream collector.
//!
//! # Modules
//!
//! - `config`: Configuration management with TOML support
//! - `error`: Top-level error type
//! - `port`: Port abstraction layer and line framing
//! - `link`: Gate, watchdog, reader loop and supervisor
//! - `collector`: Downstream frame sink
//! - `logging`: Tracing subscriber setup

pub mod collector;
pub mod config;
pub mod error;
pub mod link;
pub mod logging;
pub mod port;

pub use collector::{CollectorSummary, FrameCollector, FrameSink};
pub use config::{Config, ConfigError, ConfigLoader, ConfigResult};
pub use error::{AppError, AppResult};
pub use link::{
    classify, Frame, LinkError, LinkSettings, Supervisor, SupervisorHandle, SupervisorReport,
    TeardownSignal, Verdict,
};
pub use port::{
    MockDevice, PortConfiguration, PortError, PortOpener, RawLine, SerialPortAdapter,
    SyncSerialPort, SystemPortOpener,
};
