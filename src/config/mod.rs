//! Configuration module for the exporter.
//!
//! This module provides TOML-based configuration with environment variable overrides.
//!
//! # Configuration Resolution
//!
//! Configuration is loaded from the following locations (in order of priority):
//!
//! 1. `SMATRIX_CONFIG` environment variable (explicit path)
//! 2. `./config.toml` (current directory)
//! 3. `~/.config/smatrix-exporter/config.toml` (XDG)
//! 4. Built-in defaults (no file required)
//!
//! # Environment Overrides
//!
//! The pattern is: `SMATRIX_<SECTION>_<KEY>`
//!
//! Examples:
//! - `SMATRIX_ANTENNA_DEVICE_PATH=/dev/ttyACM0`
//! - `SMATRIX_WATCHDOG_STALE_AFTER_SECS=300`
//! - `SMATRIX_LOGGING_FORMAT=json`
//!
//! `ANTENNA_USB_DEVICE_PATH` is also honoured.
//!
//! # Example
//!
//! ```rust,ignore
//! use smatrix_exporter::config::ConfigLoader;
//!
//! let config = ConfigLoader::load()?.into_config();
//! config.validate()?;
//! println!("Antenna: {}", config.antenna.device_path);
//! ```

mod error;
mod loader;
mod schema;

pub use error::{ConfigError, ConfigResult};
pub use loader::{resolve_config_path, ConfigLoader, CONFIG_PATH_ENV};
pub use schema::{
    AntennaConfig, CollectorConfig, Config, EntityType, LogFormat, LoggingConfig, MetricType,
    SampleConfig, SampleType, WatchdogConfig,
};
