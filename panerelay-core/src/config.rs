//! Configuration loading and management
//!
//! Configuration is loaded from `~/.config/panerelay/config.toml`
//!
//! This module follows the XDG Base Directory Specification:
//! - Config: `$XDG_CONFIG_HOME/panerelay/` (~/.config/panerelay/)
//! - Data: `$XDG_DATA_HOME/panerelay/` (~/.local/share/panerelay/)
//! - State/Logs: `$XDG_STATE_HOME/panerelay/` (~/.local/state/panerelay/)

use crate::db::{Database, DirectoryLimits};
use crate::error::{Error, Result};
use crate::ingest::WriteMode;
use crate::provider::ProviderRegistry;
use serde::Deserialize;
use std::path::{Path, PathBuf};

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
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Transcript tailing
    #[serde(default)]
    pub tailer: TailerConfig,

    /// Persistent state limits
    #[serde(default)]
    pub state: StateConfig,

    /// Provider selection
    #[serde(default)]
    pub providers: ProvidersConfig,
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

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Transcript tailer configuration
#[derive(Debug, Deserialize)]
pub struct TailerConfig {
    /// `write_through` persists every offset change; `deferred` waits for a flush
    #[serde(default)]
    pub write_mode: WriteMode,

    /// Newly tracked sessions start at the current end of their transcript
    #[serde(default)]
    pub start_at_end: bool,

    /// Delay between polls in milliseconds
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

impl Default for TailerConfig {
    fn default() -> Self {
        Self {
            write_mode: WriteMode::default(),
            start_at_end: false,
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

fn default_poll_interval_ms() -> u64 {
    1000
}

/// Persistent state configuration
#[derive(Debug, Deserialize)]
pub struct StateConfig {
    /// Recent working directories kept per user
    #[serde(default = "default_max_recent_directories")]
    pub max_recent_directories: usize,

    /// Favorite working directories kept per user
    #[serde(default = "default_max_favorite_directories")]
    pub max_favorite_directories: usize,

    /// Override for the state database location
    pub database_path: Option<PathBuf>,
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            max_recent_directories: default_max_recent_directories(),
            max_favorite_directories: default_max_favorite_directories(),
            database_path: None,
        }
    }
}

impl StateConfig {
    pub fn directory_limits(&self) -> DirectoryLimits {
        DirectoryLimits {
            recent: self.max_recent_directories,
            favorite: self.max_favorite_directories,
        }
    }
}

fn default_max_recent_directories() -> usize {
    5
}

fn default_max_favorite_directories() -> usize {
    10
}

/// Provider selection
#[derive(Debug, Deserialize)]
pub struct ProvidersConfig {
    /// Provider used when a session does not name one
    #[serde(default = "default_provider")]
    pub default: String,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            default: default_provider(),
        }
    }
}

fn default_provider() -> String {
    "claude".to_string()
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

        Ok(config)
    }

    /// Check values serde cannot: level names, limits, and that the default
    /// provider is registered.
    pub fn validate(&self, registry: &ProviderRegistry) -> Result<()> {
        let level = self.logging.level.to_ascii_lowercase();
        if !LOG_LEVELS.contains(&level.as_str()) {
            return Err(Error::Config(format!(
                "logging.level must be one of {}, got {:?}",
                LOG_LEVELS.join(", "),
                self.logging.level
            )));
        }
        if self.logging.max_files == 0 {
            return Err(Error::Config(
                "logging.max_files must be at least 1".to_string(),
            ));
        }
        if self.tailer.poll_interval_ms == 0 {
            return Err(Error::Config(
                "tailer.poll_interval_ms must be at least 1".to_string(),
            ));
        }
        if self.state.max_recent_directories == 0 {
            return Err(Error::Config(
                "state.max_recent_directories must be at least 1".to_string(),
            ));
        }
        if self.state.max_favorite_directories == 0 {
            return Err(Error::Config(
                "state.max_favorite_directories must be at least 1".to_string(),
            ));
        }
        if !registry.contains(&self.providers.default) {
            return Err(Error::UnknownProvider {
                name: self.providers.default.clone(),
                available: registry.names(),
            });
        }
        Ok(())
    }

    /// Database location, honoring `state.database_path`
    pub fn state_database_path(&self) -> PathBuf {
        self.state
            .database_path
            .clone()
            .unwrap_or_else(Self::database_path)
    }

    /// Open and migrate the state database with the configured directory
    /// limits applied
    pub fn open_database(&self) -> Result<Database> {
        let path = self.state_database_path();
        tracing::info!(path = %path.display(), "Opening state database");

        let db = Database::open(&path)?.with_directory_limits(self.state.directory_limits());
        db.migrate()?;
        Ok(db)
    }

    /// Returns the default config file path
    ///
    /// `$XDG_CONFIG_HOME/panerelay/config.toml` (~/.config/panerelay/config.toml)
    pub fn config_path() -> PathBuf {
        xdg_config_home().join("panerelay").join("config.toml")
    }

    /// Returns the data directory path (for SQLite database)
    ///
    /// `$XDG_DATA_HOME/panerelay/` (~/.local/share/panerelay/)
    pub fn data_dir() -> PathBuf {
        xdg_data_home().join("panerelay")
    }

    /// Returns the state directory path (for logs)
    ///
    /// `$XDG_STATE_HOME/panerelay/` (~/.local/state/panerelay/)
    pub fn state_dir() -> PathBuf {
        xdg_state_home().join("panerelay")
    }

    /// Returns the database file path
    ///
    /// `$XDG_DATA_HOME/panerelay/state.db` (~/.local/share/panerelay/state.db)
    pub fn database_path() -> PathBuf {
        Self::data_dir().join("state.db")
    }

    /// Returns the log file path prefix
    ///
    /// `$XDG_STATE_HOME/panerelay/panerelay.log` (~/.local/state/panerelay/panerelay.log)
    pub fn log_path() -> PathBuf {
        Self::state_dir().join("panerelay.log")
    }
}
