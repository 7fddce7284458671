//! Configuration loading and management
//!
//! The SDK can be configured programmatically with [`SdkConfig::new`], or
//! from `~/.config/postflight/config.toml` for host binaries.
//!
//! This module follows the XDG Base Directory Specification:
//! - Config: `$XDG_CONFIG_HOME/postflight/` (~/.config/postflight/)
//! - State/Logs: `$XDG_STATE_HOME/postflight/` (~/.local/state/postflight/)

use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::PathBuf;

/// Returns a best-effort home directory path.
fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Returns XDG_CONFIG_HOME or ~/.config
fn xdg_config_home() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".config"))
}

/// Returns XDG_STATE_HOME or ~/.local/state
fn xdg_state_home() -> PathBuf {
    std::env::var("XDG_STATE_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/state"))
}

/// Main SDK configuration
#[derive(Debug, Deserialize, Clone)]
pub struct SdkConfig {
    /// SDK key issued at registration (format: "pf_live_xxxx")
    #[serde(default)]
    pub sdk_key: String,

    /// Ingest endpoint base URL
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// HTTP request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Max retry attempts for transient delivery failures
    #[serde(default = "default_max_retries")]
    pub max_retries: usize,

    /// Events per delivery call (max 50)
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Platform receipt location, read when an in-app purchase event
    /// carries no receipt parameter of its own
    pub receipt_path: Option<PathBuf>,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for SdkConfig {
    fn default() -> Self {
        Self {
            sdk_key: String::new(),
            endpoint: default_endpoint(),
            timeout_secs: default_timeout(),
            max_retries: default_max_retries(),
            batch_size: default_batch_size(),
            receipt_path: None,
            logging: LoggingConfig::default(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Maximum number of log files to keep
    #[serde(default = "default_max_log_files")]
    pub max_files: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            max_files: default_max_log_files(),
        }
    }
}

fn default_endpoint() -> String {
    "https://ingest.postflight.io".to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_max_retries() -> usize {
    3
}

fn default_batch_size() -> usize {
    20
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_log_files() -> usize {
    5
}

impl SdkConfig {
    /// Create a configuration with the given SDK key and default settings
    pub fn new(sdk_key: impl Into<String>) -> Self {
        Self {
            sdk_key: sdk_key.into(),
            ..Default::default()
        }
    }

    /// Load configuration from the default path
    ///
    /// Returns defaults (with an empty SDK key) if no config file exists;
    /// [`SdkConfig::validate`] will reject the empty key at init time.
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        if !config_path.exists() {
            tracing::info!("No config file found at {:?}, using defaults", config_path);
            return Ok(SdkConfig::default());
        }

        Self::load_from(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &PathBuf) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read config file {:?}: {}", path, e)))?;

        let config: SdkConfig = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse config: {}", e)))?;

        Ok(config)
    }

    /// Validate configuration, returning an error message if invalid
    pub fn validate(&self) -> Result<()> {
        if self.sdk_key.is_empty() {
            return Err(Error::Config("sdk_key is required".to_string()));
        }
        if self.endpoint.is_empty() {
            return Err(Error::Config("endpoint must not be empty".to_string()));
        }
        if self.timeout_secs == 0 {
            return Err(Error::Config("timeout_secs must be at least 1".to_string()));
        }
        if self.batch_size == 0 || self.batch_size > 50 {
            return Err(Error::Config(
                "batch_size must be between 1 and 50".to_string(),
            ));
        }
        Ok(())
    }

    /// Returns the default config file path
    ///
    /// `$XDG_CONFIG_HOME/postflight/config.toml` (~/.config/postflight/config.toml)
    pub fn config_path() -> PathBuf {
        xdg_config_home().join("postflight").join("config.toml")
    }

    /// Returns the state directory path (for logs)
    ///
    /// `$XDG_STATE_HOME/postflight/` (~/.local/state/postflight/)
    pub fn state_dir() -> PathBuf {
        xdg_state_home().join("postflight")
    }

    /// Returns the log file path
    ///
    /// `$XDG_STATE_HOME/postflight/postflight.log` (~/.local/state/postflight/postflight.log)
    pub fn log_path() -> PathBuf {
        Self::state_dir().join("postflight.log")
    }
}
