//! Configuration schema definitions.
//!
//! Every section has defaults, so an empty file (or no file) is a valid
//! configuration. Unknown keys are rejected.

use crate::link::LinkSettings;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::error::{ConfigError, ConfigResult};

/// Root configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Where the measurements are taken, e.g. a street address.
    pub location: String,
    /// Serial device of the RF receiver
    pub antenna: AntennaConfig,
    /// Liveness monitoring
    pub watchdog: WatchdogConfig,
    /// Downstream frame queue
    pub collector: CollectorConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
    /// Samples to derive from received frames
    pub samples: Vec<SampleConfig>,
}

impl Config {
    /// Fill in defaults that depend on other values.
    pub fn apply_defaults(&mut self) {
        for sample in &mut self.samples {
            sample.apply_defaults();
        }
    }

    /// Reject values the link cannot run with.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.antenna.device_path.trim().is_empty() {
            return Err(ConfigError::invalid(
                "antenna.device_path",
                "Please set the usb device path for the antenna",
            ));
        }

        let positive = [
            ("watchdog.interval_secs", self.watchdog.interval_secs),
            ("watchdog.stale_after_secs", self.watchdog.stale_after_secs),
            ("collector.capacity", self.collector.capacity as u64),
        ];
        if let Some((field, _)) = positive.iter().find(|(_, value)| *value == 0) {
            return Err(ConfigError::invalid(*field, "must be greater than zero"));
        }

        if self.watchdog.jitter_percent >= 100 {
            return Err(ConfigError::invalid(
                "watchdog.jitter_percent",
                format!("{}% would allow a zero interval", self.watchdog.jitter_percent),
            ));
        }
        Ok(())
    }

    /// Supervision timing derived from this configuration.
    pub fn link_settings(&self) -> LinkSettings {
        LinkSettings {
            watchdog_interval: self.watchdog.interval(),
            jitter_percent: self.watchdog.jitter_percent,
            stale_after: self.watchdog.stale_after(),
            ..LinkSettings::default()
        }
    }
}

/// Serial device section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AntennaConfig {
    /// Path to the usb device of the 868MHz RF antenna
    pub device_path: String,
}

impl Default for AntennaConfig {
    fn default() -> Self {
        Self {
            device_path: "/dev/ttyUSB0".to_string(),
        }
    }
}

/// Watchdog section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WatchdogConfig {
    /// Base interval between liveness checks
    pub interval_secs: u64,
    /// Random deviation of the interval, in percent either way
    pub jitter_percent: u8,
    /// Silence after which the port is reset
    pub stale_after_secs: u64,
}

impl Default for WatchdogConfig {
    fn default() -> Self {
        Self {
            interval_secs: 120,
            jitter_percent: 25,
            stale_after_secs: 120,
        }
    }
}

impl WatchdogConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn stale_after(&self) -> Duration {
        Duration::from_secs(self.stale_after_secs)
    }
}

/// Collector section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CollectorConfig {
    /// Frames kept before the oldest is dropped
    pub capacity: usize,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            capacity: crate::collector::DEFAULT_CAPACITY,
        }
    }
}

/// Logging configuration section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error"
    pub level: String,
    /// Log format: "json", "pretty", "compact"
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// JSON format
    Json,
    /// Pretty format with colors
    #[default]
    Pretty,
    /// Compact format
    Compact,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "pretty" => Ok(Self::Pretty),
            "compact" => Ok(Self::Compact),
            other => Err(format!("unknown log format '{other}'")),
        }
    }
}

/// Kind of entity a sample describes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntityType {
    #[default]
    #[serde(rename = "ENTITY_TYPE_INVALID")]
    Invalid,
    #[serde(rename = "ENTITY_TYPE_TARIFF")]
    Tariff,
    #[serde(rename = "ENTITY_TYPE_ZONE")]
    Zone,
    #[serde(rename = "ENTITY_TYPE_DEVICE")]
    Device,
}

/// Physical quantity of a sample.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SampleType {
    #[default]
    #[serde(rename = "SAMPLE_TYPE_INVALID")]
    Invalid,
    #[serde(rename = "SAMPLE_TYPE_TEMPERATURE")]
    Temperature,
    #[serde(rename = "SAMPLE_TYPE_TEMPERATURE_SETPOINT")]
    TemperatureSetpoint,
    #[serde(rename = "SAMPLE_TYPE_HUMIDITY")]
    Humidity,
    #[serde(rename = "SAMPLE_TYPE_PRESSURE")]
    Pressure,
    #[serde(rename = "SAMPLE_TYPE_FLOW")]
    Flow,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum MetricType {
    #[default]
    #[serde(rename = "METRIC_TYPE_INVALID")]
    Invalid,
    #[serde(rename = "METRIC_TYPE_COUNTER")]
    Counter,
    #[serde(rename = "METRIC_TYPE_GAUGE")]
    Gauge,
}

/// One sample to produce per measurement.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SampleConfig {
    pub entity_type: EntityType,
    pub entity_name: String,
    pub sample_type: SampleType,
    pub sample_name: String,
    pub metric_type: MetricType,
    /// Factor applied to the raw value; 0 means unset and becomes 1.
    pub value_multiplier: f64,
    /// Address of the thermostat the sample is read from, e.g. `04:123456`
    pub thermostat_id: String,
}

impl SampleConfig {
    pub fn apply_defaults(&mut self) {
        if self.value_multiplier == 0.0 {
            self.value_multiplier = 1.0;
        }
    }
}
