//! Logger configuration
//!
//! Every field has a default matching the device firmware, so a partial JSON
//! document (or none at all) yields a working configuration.

use super::error::{Result, UtilsError};
use super::log_level::LogLevel;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_FORMAT_CAPACITY: usize = 1000;
pub const DEFAULT_OUTPUT_CAPACITY: usize = 1100;
pub const DEFAULT_WRITE_CACHE_CYCLE: u32 = 5;
pub const DEFAULT_LOCK_WAIT: Duration = Duration::from_millis(100);
pub const DEFAULT_RENDER_TIMEOUT: Duration = Duration::from_millis(1000);

/// Durations are written as whole milliseconds
mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(d)?))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Also append log lines to the persistent log file
    pub log_mode: bool,
    /// A console consumer is attached
    pub monitor_open: bool,
    /// Colourise console output by level
    pub use_colors: bool,
    /// Messages below this level are filtered by the level macros
    pub min_level: LogLevel,
    /// Force a durability sync every this many persistent writes
    pub write_cache_cycle: u32,
    /// Capacity of the template buffer in bytes
    pub format_capacity: usize,
    /// Capacity of the rendered output buffer in bytes
    pub output_capacity: usize,
    /// Longest wait for the gate before a message is dropped
    #[serde(with = "millis")]
    pub lock_wait: Duration,
    /// Longest wait for the formatter before falling back to console only
    #[serde(with = "millis")]
    pub render_timeout: Duration,
    /// Settling delay after fan-out, still holding the gate
    #[serde(with = "millis")]
    pub flush_delay: Duration,
    /// Mount point of the storage volume
    pub storage_root: PathBuf,
    /// Directory below the storage root holding the log file
    pub data_dir: String,
    pub file_name: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            log_mode: false,
            monitor_open: true,
            use_colors: false,
            min_level: LogLevel::Info,
            write_cache_cycle: DEFAULT_WRITE_CACHE_CYCLE,
            format_capacity: DEFAULT_FORMAT_CAPACITY,
            output_capacity: DEFAULT_OUTPUT_CAPACITY,
            lock_wait: DEFAULT_LOCK_WAIT,
            render_timeout: DEFAULT_RENDER_TIMEOUT,
            flush_delay: Duration::ZERO,
            storage_root: PathBuf::from("."),
            data_dir: "data".to_string(),
            file_name: "log.txt".to_string(),
        }
    }
}

impl LogConfig {
    /// Parse and validate a JSON configuration document
    pub fn from_json(json: &str) -> Result<Self> {
        let config: LogConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<()> {
        if self.format_capacity == 0 {
            return Err(UtilsError::config("LogConfig", "format_capacity must be non-zero"));
        }
        if self.output_capacity < self.format_capacity {
            return Err(UtilsError::config(
                "LogConfig",
                format!(
                    "output_capacity ({}) must be at least format_capacity ({})",
                    self.output_capacity, self.format_capacity
                ),
            ));
        }
        if self.write_cache_cycle == 0 {
            return Err(UtilsError::config("LogConfig", "write_cache_cycle must be non-zero"));
        }
        if self.file_name.is_empty() {
            return Err(UtilsError::config("LogConfig", "file_name must not be empty"));
        }
        Ok(())
    }

    /// Directory holding the log file
    pub fn log_dir(&self) -> PathBuf {
        self.storage_root.join(&self.data_dir)
    }

    /// Full path of the log file
    pub fn log_path(&self) -> PathBuf {
        self.log_dir().join(&self.file_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = LogConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.write_cache_cycle, 5);
        assert_eq!(config.lock_wait, Duration::from_millis(100));
        assert_eq!(config.log_path(), PathBuf::from("./data/log.txt"));
    }

    #[test]
    fn test_partial_json() {
        let config = LogConfig::from_json(
            r#"{ "log_mode": true, "lock_wait": 250, "min_level": "Debug", "data_dir": "logs" }"#,
        )
        .unwrap();
        assert!(config.log_mode);
        assert_eq!(config.lock_wait, Duration::from_millis(250));
        assert_eq!(config.min_level, LogLevel::Debug);
        assert_eq!(config.log_dir(), PathBuf::from("./logs"));
        assert_eq!(config.format_capacity, DEFAULT_FORMAT_CAPACITY);
    }

    #[test]
    fn test_json_round_trip_keeps_millis() {
        let config = LogConfig {
            flush_delay: Duration::from_millis(20),
            ..LogConfig::default()
        };
        let json = config.to_json().unwrap();
        assert!(json.contains("\"flush_delay\": 20"));
        assert_eq!(LogConfig::from_json(&json).unwrap(), config);
    }

    #[test]
    fn test_validation_errors() {
        let config = LogConfig {
            write_cache_cycle: 0,
            ..LogConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(UtilsError::InvalidConfiguration { .. })
        ));

        let config = LogConfig {
            output_capacity: 10,
            ..LogConfig::default()
        };
        assert!(config.validate().is_err());

        assert!(matches!(
            LogConfig::from_json("{ not json"),
            Err(UtilsError::JsonError(_))
        ));
    }
}
