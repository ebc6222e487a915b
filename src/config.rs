///! Configuration management for the pin report store
///!
///! This module provides configuration file support with TOML format,
///! environment variable overrides, and sensible defaults.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Storage configuration
    #[serde(default)]
    pub storage: StorageConfig,

    /// Live buffer configuration
    #[serde(default)]
    pub live: LiveConfig,

    /// Retention worker configuration
    #[serde(default)]
    pub retention: RetentionConfig,

    /// Orphan collector configuration
    #[serde(default)]
    pub orphan: OrphanConfig,

    /// Monitoring and observability
    #[serde(default)]
    pub monitoring: MonitoringConfig,
}

/// Storage configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    /// Data directory path
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Directory for export artifacts
    #[serde(default = "default_export_dir")]
    pub export_dir: PathBuf,
}

/// Live buffer configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LiveConfig {
    /// Points retained per pin in the in-memory live ring
    #[serde(default = "default_live_capacity")]
    pub capacity: usize,
}

/// Retention worker configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RetentionConfig {
    /// Seconds between retention passes
    #[serde(default = "default_retention_interval_secs")]
    pub interval_secs: u64,

    /// Maximum retained points per minute-granularity file
    #[serde(default = "default_minute_points")]
    pub minute_points: usize,

    /// Maximum retained points per hourly-granularity file
    #[serde(default = "default_hourly_points")]
    pub hourly_points: usize,

    /// Maximum retained points per daily-granularity file
    #[serde(default = "default_daily_points")]
    pub daily_points: usize,

    /// Seconds an export artifact is kept before deletion
    #[serde(default = "default_export_retention_secs")]
    pub export_retention_secs: u64,
}

/// Orphan collector configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OrphanConfig {
    /// Seconds between collection passes
    #[serde(default = "default_orphan_interval_secs")]
    pub interval_secs: u64,
}

/// Monitoring configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MonitoringConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable structured logging
    #[serde(default = "default_true")]
    pub structured_logging: bool,
}

// Default value functions
fn default_data_dir() -> PathBuf { PathBuf::from("/data/pintail") }
fn default_export_dir() -> PathBuf { PathBuf::from("/data/pintail/exports") }
fn default_live_capacity() -> usize { 60 }
fn default_retention_interval_secs() -> u64 { 6 * 3600 }
fn default_minute_points() -> usize { 720 }
fn default_hourly_points() -> usize { 336 }
fn default_daily_points() -> usize { 365 }
fn default_export_retention_secs() -> u64 { 30 * 24 * 3600 }
fn default_orphan_interval_secs() -> u64 { 24 * 3600 }
fn default_log_level() -> String { "info".to_string() }
fn default_true() -> bool { true }

impl Default for Config {
    fn default() -> Self {
        Self {
            storage: StorageConfig::default(),
            live: LiveConfig::default(),
            retention: RetentionConfig::default(),
            orphan: OrphanConfig::default(),
            monitoring: MonitoringConfig::default(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            export_dir: default_export_dir(),
        }
    }
}

impl Default for LiveConfig {
    fn default() -> Self {
        Self {
            capacity: default_live_capacity(),
        }
    }
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_retention_interval_secs(),
            minute_points: default_minute_points(),
            hourly_points: default_hourly_points(),
            daily_points: default_daily_points(),
            export_retention_secs: default_export_retention_secs(),
        }
    }
}

impl Default for OrphanConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_orphan_interval_secs(),
        }
    }
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            structured_logging: true,
        }
    }
}

impl Config {
    /// Load configuration from TOML file
    pub fn from_file(path: &str) -> Result<Self, String> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file {}: {}", path, e))?;

        toml::from_str(&contents)
            .map_err(|e| format!("Failed to parse config file {}: {}", path, e))
    }

    /// Load configuration with environment variable overrides
    pub fn from_file_with_env(path: &str) -> Result<Self, String> {
        let mut config = Self::from_file(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from environment variables only
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env_overrides();
        config
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(&mut self) {
        // Storage
        if let Ok(data_dir) = std::env::var("PINTAIL_DATA_DIR") {
            self.storage.data_dir = PathBuf::from(data_dir);
        }
        if let Ok(export_dir) = std::env::var("PINTAIL_EXPORT_DIR") {
            self.storage.export_dir = PathBuf::from(export_dir);
        }

        // Retention
        if let Ok(interval) = std::env::var("PINTAIL_RETENTION_INTERVAL_SECS") {
            if let Ok(secs) = interval.parse() {
                self.retention.interval_secs = secs;
            }
        }

        // Monitoring
        if let Ok(log_level) = std::env::var("RUST_LOG") {
            self.monitoring.log_level = log_level;
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.storage.data_dir.as_os_str().is_empty() {
            return Err("Data directory cannot be empty".to_string());
        }
        if self.storage.export_dir.as_os_str().is_empty() {
            return Err("Export directory cannot be empty".to_string());
        }

        if self.live.capacity == 0 {
            return Err("Live buffer capacity must be > 0".to_string());
        }

        if self.retention.interval_secs == 0 {
            return Err("Retention interval must be > 0".to_string());
        }
        if self.retention.minute_points == 0
            || self.retention.hourly_points == 0
            || self.retention.daily_points == 0
        {
            return Err("Retention point caps must be > 0".to_string());
        }

        if self.orphan.interval_secs == 0 {
            return Err("Orphan collection interval must be > 0".to_string());
        }

        Ok(())
    }

    /// Save configuration to TOML file
    pub fn save_to_file(&self, path: &str) -> Result<(), String> {
        let contents = toml::to_string_pretty(self)
            .map_err(|e| format!("Failed to serialize config: {}", e))?;

        std::fs::write(path, contents)
            .map_err(|e| format!("Failed to write config file {}: {}", path, e))
    }

    /// Retention policy derived from this configuration
    pub fn retention_policy(&self) -> crate::workers::RetentionPolicy {
        crate::workers::RetentionPolicy {
            interval: Duration::from_secs(self.retention.interval_secs),
            minute_points: self.retention.minute_points,
            hourly_points: self.retention.hourly_points,
            daily_points: self.retention.daily_points,
            export_dir: Some(self.storage.export_dir.clone()),
            export_retention: Duration::from_secs(self.retention.export_retention_secs),
        }
    }
}
