//! Configuration loader and validator
//!
//! Every setting has a built-in default matching the board firmware, so the
//! dashboard runs with no file at all. A TOML file may override any of them.

use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

use crate::acquire::AcquirePolicy;
use crate::telemetry::constants::*;

/// File looked up next to the working directory by the binary
pub const DEFAULT_CONFIG_FILE: &str = "joydash.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Dashboard settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    /// Advertised name of the board
    pub device_name: String,

    /// Characteristic carrying the telemetry record
    pub characteristic_uuid: Uuid,

    /// Total acquisition budget
    pub max_wait_ms: u64,

    /// One discovery attempt
    pub discovery_timeout_ms: u64,

    /// Pause between failed attempts
    pub retry_backoff_ms: u64,

    /// One connect attempt
    pub connect_timeout_ms: u64,

    /// Minimum spacing between reads
    pub poll_interval_ms: u64,

    /// Where log output goes while the terminal is in use
    pub log_file: PathBuf,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            device_name: DEVICE_NAME.to_string(),
            characteristic_uuid: TELEMETRY_CHARACTERISTIC_UUID,
            max_wait_ms: MAX_WAIT_MS,
            discovery_timeout_ms: DISCOVERY_TIMEOUT_MS,
            retry_backoff_ms: RETRY_BACKOFF_MS,
            connect_timeout_ms: CONNECT_TIMEOUT_MS,
            poll_interval_ms: POLL_INTERVAL_MS,
            log_file: PathBuf::from("joydash.log"),
        }
    }
}

impl DashboardConfig {
    /// Load configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path_ref = path.as_ref();
        info!("Loading configuration from: {}", path_ref.display());

        let content = std::fs::read_to_string(path_ref)?;
        let config = Self::from_toml_str(&content)?;

        info!("✓ Config loaded");
        Ok(config)
    }

    /// Load `path` if it exists, otherwise use the defaults
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path_ref = path.as_ref();
        if path_ref.exists() {
            Self::load(path_ref)
        } else {
            debug!("No config file at {}, using defaults", path_ref.display());
            Ok(Self::default())
        }
    }

    /// Parse and validate TOML text
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        debug!("  - Device: '{}'", config.device_name);
        debug!("  - Characteristic: {}", config.characteristic_uuid);
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.device_name.trim().is_empty() {
            return Err(ConfigError::Invalid("device_name must not be empty".into()));
        }

        let durations = [
            ("max_wait_ms", self.max_wait_ms),
            ("discovery_timeout_ms", self.discovery_timeout_ms),
            ("retry_backoff_ms", self.retry_backoff_ms),
            ("connect_timeout_ms", self.connect_timeout_ms),
            ("poll_interval_ms", self.poll_interval_ms),
        ];
        for (name, value) in durations {
            if value == 0 {
                return Err(ConfigError::Invalid(format!("{} must be positive", name)));
            }
        }

        if self.discovery_timeout_ms > self.max_wait_ms {
            return Err(ConfigError::Invalid(
                "discovery_timeout_ms must not exceed max_wait_ms".into(),
            ));
        }

        Ok(())
    }

    /// Timing of the acquisition loop
    pub fn acquire_policy(&self) -> AcquirePolicy {
        AcquirePolicy {
            max_wait: Duration::from_millis(self.max_wait_ms),
            discovery_timeout: Duration::from_millis(self.discovery_timeout_ms),
            retry_backoff: Duration::from_millis(self.retry_backoff_ms),
            connect_timeout: Duration::from_millis(self.connect_timeout_ms),
        }
    }

    /// Minimum spacing between telemetry reads
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Open `log_file` for writing.
    ///
    /// A log file that cannot be created is not fatal: the returned sink then
    /// discards everything, and the error is handed back for reporting.
    pub fn open_log_sink(&self) -> (Box<dyn Write + Send>, Option<io::Error>) {
        match std::fs::File::create(&self.log_file) {
            Ok(file) => (Box::new(file), None),
            Err(e) => (Box::new(io::sink()), Some(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = DashboardConfig::default();
        assert_eq!(config.device_name, "BLE-Arseni");
        assert_eq!(config.max_wait_ms, 30_000);
        assert_eq!(config.discovery_timeout_ms, 1_000);
        assert_eq!(config.retry_backoff_ms, 300);
        assert_eq!(config.poll_interval(), Duration::from_millis(15));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_toml_gives_defaults() {
        let config = DashboardConfig::from_toml_str("").unwrap();
        assert_eq!(config, DashboardConfig::default());
    }

    #[test]
    fn test_partial_override() {
        let config = DashboardConfig::from_toml_str(
            r#"
            device_name = "Bench-Board"
            max_wait_ms = 5000
            characteristic_uuid = "0000ffe1-0000-1000-8000-00805f9b34fb"
            "#,
        )
        .unwrap();

        assert_eq!(config.device_name, "Bench-Board");
        assert_eq!(config.acquire_policy().max_wait, Duration::from_secs(5));
        assert_eq!(
            config.characteristic_uuid,
            Uuid::from_u128(0x0000ffe1_0000_1000_8000_00805f9b34fb)
        );
        assert_eq!(config.poll_interval_ms, POLL_INTERVAL_MS);
    }

    #[test]
    fn test_invalid_values() {
        let mut config = DashboardConfig::default();
        config.device_name = "  ".into();
        assert!(config.validate().is_err());

        let mut config = DashboardConfig::default();
        config.poll_interval_ms = 0;
        assert!(config.validate().is_err());

        let mut config = DashboardConfig::default();
        config.discovery_timeout_ms = config.max_wait_ms + 1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_parse_error() {
        assert!(matches!(
            DashboardConfig::from_toml_str("max_wait_ms = \"soon\""),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_unwritable_log_file_falls_back_to_sink() {
        let config = DashboardConfig {
            log_file: PathBuf::from("does/not/exist/joydash.log"),
            ..DashboardConfig::default()
        };

        let (mut sink, error) = config.open_log_sink();

        assert!(error.is_some());
        assert!(writeln!(sink, "discarded").is_ok());
        assert!(!config.log_file.exists());
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let config = DashboardConfig::load_or_default("does/not/exist/joydash.toml").unwrap();
        assert_eq!(config, DashboardConfig::default());
    }
}
