//! Configuration loading and management
//!
//! Configuration is loaded from `~/.config/growthlog/config.toml`
//!
//! This module follows the XDG Base Directory Specification:
//! - Config: `$XDG_CONFIG_HOME/growthlog/` (~/.config/growthlog/)
//! - Data: `$XDG_DATA_HOME/growthlog/` (~/.local/share/growthlog/)
//! - State/Logs: `$XDG_STATE_HOME/growthlog/` (~/.local/state/growthlog/)

use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Environment variable that overrides the database location.
pub const DATABASE_PATH_ENV: &str = "GROWTHLOG_DB";

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

/// Returns XDG_DATA_HOME or ~/.local/share
fn xdg_data_home() -> PathBuf {
    std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/share"))
}

/// Returns XDG_STATE_HOME or ~/.local/state
fn xdg_state_home() -> PathBuf {
    std::env::var("XDG_STATE_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/state"))
}

/// Main configuration struct
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    /// Feature toggles
    #[serde(default)]
    pub features: FeatureConfig,

    /// Statistics and analysis tuning
    #[serde(default)]
    pub analysis: AnalysisConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Switches for the optional parts of the engine
#[derive(Debug, Deserialize, Clone)]
pub struct FeatureConfig {
    /// Evaluate the achievement catalog
    #[serde(default = "default_true")]
    pub achievements: bool,

    /// Run the pattern detectors
    #[serde(default = "default_true")]
    pub pattern_detection: bool,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            achievements: true,
            pattern_detection: true,
        }
    }
}

fn default_true() -> bool {
    true
}

/// Analysis configuration
#[derive(Debug, Deserialize, Clone)]
pub struct AnalysisConfig {
    /// Window for the mood trend shown by `stats`
    #[serde(default = "default_trend_days")]
    pub trend_days: u32,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            trend_days: default_trend_days(),
        }
    }
}

fn default_trend_days() -> u32 {
    30
}

/// Logging configuration
#[derive(Debug, Deserialize)]
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

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_log_files() -> usize {
    5
}

impl Config {
    /// Load configuration from the default path
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        if !config_path.exists() {
            tracing::info!("No config file found at {:?}, using defaults", config_path);
            return Ok(Config::default());
        }

        Self::load_from(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read config file {:?}: {}", path, e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse config: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Reject values the engine cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.analysis.trend_days == 0 {
            return Err(Error::Config(
                "analysis.trend_days must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Returns the default config file path
    ///
    /// `$XDG_CONFIG_HOME/growthlog/config.toml` (~/.config/growthlog/config.toml)
    pub fn config_path() -> PathBuf {
        xdg_config_home().join("growthlog").join("config.toml")
    }

    /// Returns the data directory path (for SQLite database)
    ///
    /// `$XDG_DATA_HOME/growthlog/` (~/.local/share/growthlog/)
    pub fn data_dir() -> PathBuf {
        xdg_data_home().join("growthlog")
    }

    /// Returns the state directory path (for logs)
    ///
    /// `$XDG_STATE_HOME/growthlog/` (~/.local/state/growthlog/)
    pub fn state_dir() -> PathBuf {
        xdg_state_home().join("growthlog")
    }

    /// Returns the database file path
    ///
    /// `$GROWTHLOG_DB` if set, otherwise
    /// `$XDG_DATA_HOME/growthlog/journal.db` (~/.local/share/growthlog/journal.db)
    pub fn database_path() -> PathBuf {
        match std::env::var_os(DATABASE_PATH_ENV) {
            Some(path) if !path.is_empty() => PathBuf::from(path),
            _ => Self::data_dir().join("journal.db"),
        }
    }

    /// Returns the log file path
    ///
    /// `$XDG_STATE_HOME/growthlog/growthlog.log` (~/.local/state/growthlog/growthlog.log)
    pub fn log_path() -> PathBuf {
        Self::state_dir().join("growthlog.log")
    }
}
