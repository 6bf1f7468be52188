//! Configuration loading and management
//!
//! Configuration is loaded from `~/.config/siteloom/config.toml`
//!
//! This module follows the XDG Base Directory Specification:
//! - Config: `$XDG_CONFIG_HOME/siteloom/` (~/.config/siteloom/)
//! - Data: `$XDG_DATA_HOME/siteloom/` (~/.local/share/siteloom/)
//! - State/Logs: `$XDG_STATE_HOME/siteloom/` (~/.local/state/siteloom/)

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
    /// Generation backend configuration
    #[serde(default)]
    pub backend: BackendConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Generation backend configuration.
///
/// Two wiring modes, same wire contract either way:
/// - `proxy_url`: requests go through a relay that holds the credential
///   server-side; no API key is sent from here.
/// - `base_url` + optional `api_key`: direct calls to an OpenAI-compatible
///   `/chat/completions` endpoint.
#[derive(Debug, Deserialize, Clone)]
pub struct BackendConfig {
    /// Relay URL (credential stays server-side)
    pub proxy_url: Option<String>,

    /// Direct provider base URL (e.g., `https://api.example.com/v1`)
    pub base_url: Option<String>,

    /// Bearer token for direct calls
    pub api_key: Option<String>,

    /// Model identifier sent with each request
    #[serde(default = "default_model")]
    pub model: String,

    /// HTTP request timeout in seconds (covers the whole stream)
    #[serde(default = "default_backend_timeout")]
    pub timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            proxy_url: None,
            base_url: None,
            api_key: None,
            model: default_model(),
            timeout_secs: default_backend_timeout(),
        }
    }
}

impl BackendConfig {
    /// The URL generation requests are posted to.
    pub fn endpoint(&self) -> Option<String> {
        if let Some(proxy) = &self.proxy_url {
            return Some(proxy.trim_end_matches('/').to_string());
        }
        self.base_url
            .as_ref()
            .map(|base| format!("{}/chat/completions", base.trim_end_matches('/')))
    }

    /// Validate configuration, returning error message if invalid
    pub fn validate(&self) -> Result<()> {
        if self.proxy_url.is_none() && self.base_url.is_none() {
            return Err(Error::Config(
                "backend.proxy_url or backend.base_url is required".to_string(),
            ));
        }
        if self.model.trim().is_empty() {
            return Err(Error::Config("backend.model must not be empty".to_string()));
        }
        Ok(())
    }
}

fn default_model() -> String {
    "gemini-3-flash".to_string()
}

fn default_backend_timeout() -> u64 {
    300
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
    pub fn load_from(path: &PathBuf) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read config file {:?}: {}", path, e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse config: {}", e)))?;

        Ok(config)
    }

    /// Returns the default config file path
    ///
    /// `$XDG_CONFIG_HOME/siteloom/config.toml` (~/.config/siteloom/config.toml)
    pub fn config_path() -> PathBuf {
        xdg_config_home().join("siteloom").join("config.toml")
    }

    /// Returns the data directory path (for the SQLite database)
    pub fn data_dir() -> PathBuf {
        xdg_data_home().join("siteloom")
    }

    /// Returns the state directory path (for logs)
    pub fn state_dir() -> PathBuf {
        xdg_state_home().join("siteloom")
    }

    /// Returns the database file path
    pub fn database_path() -> PathBuf {
        Self::data_dir().join("studio.db")
    }

    /// Returns the log file path
    pub fn log_path() -> PathBuf {
        Self::state_dir().join("siteloom.log")
    }
}
