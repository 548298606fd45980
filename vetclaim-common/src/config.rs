//! Configuration loading and resolution
//!
//! Bootstrap configuration comes from a TOML file. Resolution order for the
//! file itself:
//! 1. Command-line argument (highest priority)
//! 2. `VETCLAIM_CONFIG` environment variable
//! 3. Platform config file (`<config_dir>/vetclaim/config.toml`)
//! 4. Compiled defaults (fallback)
//!
//! A missing or unreadable file never terminates the process: a warning is
//! logged and compiled defaults are used.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "VETCLAIM_CONFIG";

/// Environment variable overriding `upstream.cookie`
pub const COOKIE_ENV_VAR: &str = "VETCLAIM_VA_COOKIE";

const APP_DIR: &str = "vetclaim";

/// Bootstrap configuration loaded from TOML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomlConfig {
    /// SQLite file backing the persistent store
    #[serde(default = "default_store_path")]
    pub store_path: PathBuf,

    #[serde(default)]
    pub upstream: UpstreamConfig,

    #[serde(default)]
    pub backend: BackendConfig,

    #[serde(default)]
    pub schedule: ScheduleConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            store_path: default_store_path(),
            upstream: UpstreamConfig::default(),
            backend: BackendConfig::default(),
            schedule: ScheduleConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// VA.gov API settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    #[serde(default = "default_upstream_url")]
    pub base_url: String,

    /// Session cookie forwarded on every upstream request
    #[serde(default)]
    pub cookie: Option<String>,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: default_upstream_url(),
            cookie: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// VetClaim backend settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Base URL including the version prefix, e.g. `https://host/v1`
    #[serde(default = "default_backend_url")]
    pub base_url: String,

    /// Value sent in the client-version header
    #[serde(default = "default_client_version")]
    pub client_version: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: default_backend_url(),
            client_version: default_client_version(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Cooldown and periodic sync timing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    #[serde(default = "default_fetch_cooldown_secs")]
    pub fetch_cooldown_secs: u64,

    #[serde(default = "default_sync_interval_secs")]
    pub sync_interval_secs: u64,
}

impl ScheduleConfig {
    pub fn fetch_cooldown(&self) -> Duration {
        Duration::from_secs(self.fetch_cooldown_secs)
    }

    pub fn sync_interval(&self) -> Duration {
        Duration::from_secs(self.sync_interval_secs)
    }
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            fetch_cooldown_secs: default_fetch_cooldown_secs(),
            sync_interval_secs: default_sync_interval_secs(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file path (optional, logs to stderr if not specified)
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

fn default_store_path() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join(APP_DIR))
        .unwrap_or_else(|| PathBuf::from("./vetclaim_data"))
        .join("store.db")
}

fn default_upstream_url() -> String {
    "https://api.va.gov".to_string()
}

fn default_backend_url() -> String {
    "https://vetclaimservices.com/v1".to_string()
}

fn default_client_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_fetch_cooldown_secs() -> u64 {
    60
}

fn default_sync_interval_secs() -> u64 {
    300
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Platform config file location (`~/.config/vetclaim/config.toml` on Linux)
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(APP_DIR).join("config.toml"))
}

/// Pick the config file to read, following the resolution order
pub fn resolve_config_path(cli_arg: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    default_config_path().filter(|p| p.exists())
}

/// Read and parse a TOML config file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    if !path.exists() {
        return Err(Error::NotFound(format!("config file {}", path.display())));
    }
    let content = std::fs::read_to_string(path)?;
    let config: TomlConfig = toml::from_str(&content)?;
    Ok(config)
}

/// Write a config file, creating parent directories as needed
pub fn write_toml_config(config: &TomlConfig, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content)?;
    Ok(())
}

/// Where the effective configuration came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// Parsed from this file
    File(PathBuf),
    /// This file was named or found but could not be used
    Fallback { path: PathBuf, reason: String },
    /// No file resolved
    Defaults,
}

impl ConfigSource {
    /// The resolved file path, whether or not it loaded
    pub fn path(&self) -> Option<&Path> {
        match self {
            ConfigSource::File(path) | ConfigSource::Fallback { path, .. } => {
                Some(path.as_path())
            }
            ConfigSource::Defaults => None,
        }
    }

    /// Report the outcome; call once tracing is up
    pub fn log(&self) {
        match self {
            ConfigSource::File(path) => info!("Loaded config from {}", path.display()),
            ConfigSource::Fallback { path, reason } => {
                warn!("Config {} unusable ({}), using defaults", path.display(), reason)
            }
            ConfigSource::Defaults => info!("No config file found, using compiled defaults"),
        }
    }
}

/// Resolve and load configuration, degrading to defaults on any failure
///
/// Nothing is logged here so the caller can set up tracing from the result
/// first and then report the [`ConfigSource`]. Environment overrides are
/// applied last.
pub fn load_config_with_source(cli_arg: Option<&Path>) -> (TomlConfig, ConfigSource) {
    let (mut config, source) = match resolve_config_path(cli_arg) {
        Some(path) => match load_toml_config(&path) {
            Ok(config) => (config, ConfigSource::File(path)),
            Err(e) => (
                TomlConfig::default(),
                ConfigSource::Fallback {
                    path,
                    reason: e.to_string(),
                },
            ),
        },
        None => (TomlConfig::default(), ConfigSource::Defaults),
    };

    if let Ok(cookie) = std::env::var(COOKIE_ENV_VAR) {
        if !cookie.is_empty() {
            config.upstream.cookie = Some(cookie);
        }
    }

    (config, source)
}

/// [`load_config_with_source`] for callers whose subscriber is already installed
pub fn load_config(cli_arg: Option<&Path>) -> TomlConfig {
    let (config, source) = load_config_with_source(cli_arg);
    source.log();
    config
}
