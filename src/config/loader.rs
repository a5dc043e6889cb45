//! Configuration loader with file resolution and environment override support.

use super::error::{ConfigError, ConfigResult};
use super::schema::Config;
use std::path::{Path, PathBuf};

/// Environment variable prefix for overrides
const ENV_PREFIX: &str = "SMATRIX";

/// Config file name
const CONFIG_FILE_NAME: &str = "config.toml";

/// Environment variable for explicit config path
pub const CONFIG_PATH_ENV: &str = "SMATRIX_CONFIG";

/// Device path variable understood by earlier deployments.
const LEGACY_DEVICE_PATH_ENV: &str = "ANTENNA_USB_DEVICE_PATH";

const APP_DIR: &str = "smatrix-exporter";

/// Configuration loader with resolution and override logic.
///
/// Loading never validates; call [`Config::validate`] once every override
/// (including command line flags) has been applied.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    /// Resolved config file path (if any)
    pub config_path: Option<PathBuf>,
    /// The loaded configuration
    pub config: Config,
}

impl ConfigLoader {
    /// Load configuration using standard resolution order.
    ///
    /// Resolution priority (highest to lowest):
    /// 1. `SMATRIX_CONFIG` environment variable (explicit path)
    /// 2. `./config.toml` (current directory)
    /// 3. `~/.config/smatrix-exporter/config.toml`
    /// 4. Built-in defaults (no file required)
    ///
    /// Environment variables can override any config file values.
    pub fn load() -> ConfigResult<Self> {
        let config_path = resolve_config_path();

        let config = match config_path {
            Some(ref path) => load_from_file(path)?,
            None => Config::default(),
        };

        Ok(Self {
            config_path,
            config: finish(config)?,
        })
    }

    /// Load configuration from a specific file path, which must exist.
    pub fn load_from(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref().to_path_buf();
        if !path.exists() {
            return Err(ConfigError::NotFound(path));
        }
        let config = finish(load_from_file(&path)?)?;

        Ok(Self {
            config_path: Some(path),
            config,
        })
    }

    /// Create a loader with default configuration (no file).
    pub fn with_defaults() -> ConfigResult<Self> {
        Ok(Self {
            config_path: None,
            config: finish(Config::default())?,
        })
    }

    /// Get the loaded configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Consume the loader and return the configuration.
    pub fn into_config(self) -> Config {
        self.config
    }
}

fn finish(mut config: Config) -> ConfigResult<Config> {
    config.apply_defaults();
    apply_env_overrides(&mut config)?;
    Ok(config)
}

/// Resolve the configuration file path using standard locations.
pub fn resolve_config_path() -> Option<PathBuf> {
    // 1. Explicit environment variable
    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        let path = PathBuf::from(path);
        if path.exists() {
            return Some(path);
        }
    }

    // 2. Current directory
    let cwd_config = PathBuf::from(CONFIG_FILE_NAME);
    if cwd_config.exists() {
        return Some(cwd_config);
    }

    // 3. XDG config directory
    if let Some(config_dir) = get_config_dir() {
        let app_config = config_dir.join(APP_DIR).join(CONFIG_FILE_NAME);
        if app_config.exists() {
            return Some(app_config);
        }
    }

    None
}

fn get_config_dir() -> Option<PathBuf> {
    std::env::var("XDG_CONFIG_HOME")
        .ok()
        .map(PathBuf::from)
        .or_else(|| {
            std::env::var("HOME")
                .ok()
                .map(|h| PathBuf::from(h).join(".config"))
        })
}

fn load_from_file(path: &Path) -> ConfigResult<Config> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    toml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn env_var(key: &str) -> Option<(String, String)> {
    let var = format!("{ENV_PREFIX}_{key}");
    std::env::var(&var).ok().map(|value| (var, value))
}

fn parse_env<T: std::str::FromStr>(var: &str, value: &str, what: &str) -> ConfigResult<T> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::env(var, format!("Invalid {what}")))
}

/// Apply environment variable overrides to the configuration.
///
/// Environment variables follow the pattern: `SMATRIX_<SECTION>_<KEY>`,
/// e.g. `SMATRIX_WATCHDOG_INTERVAL_SECS=60`.
fn apply_env_overrides(config: &mut Config) -> ConfigResult<()> {
    if let Ok(val) = std::env::var(LEGACY_DEVICE_PATH_ENV) {
        config.antenna.device_path = val;
    }
    if let Some((_, val)) = env_var("ANTENNA_DEVICE_PATH") {
        config.antenna.device_path = val;
    }

    if let Some((var, val)) = env_var("WATCHDOG_INTERVAL_SECS") {
        config.watchdog.interval_secs = parse_env(&var, &val, "interval")?;
    }
    if let Some((var, val)) = env_var("WATCHDOG_JITTER_PERCENT") {
        config.watchdog.jitter_percent = parse_env(&var, &val, "percentage")?;
    }
    if let Some((var, val)) = env_var("WATCHDOG_STALE_AFTER_SECS") {
        config.watchdog.stale_after_secs = parse_env(&var, &val, "threshold")?;
    }

    if let Some((var, val)) = env_var("COLLECTOR_CAPACITY") {
        config.collector.capacity = parse_env(&var, &val, "capacity")?;
    }

    if let Some((_, val)) = env_var("LOGGING_LEVEL") {
        config.logging.level = val;
    }
    if let Some((var, val)) = env_var("LOGGING_FORMAT") {
        config.logging.format = val
            .parse()
            .map_err(|message: String| ConfigError::env(var, message))?;
    }

    Ok(())
}
