//! Configuration loading and resolution
//!
//! Settings come from four tiers, highest priority first:
//! 1. Command-line argument
//! 2. Environment variable (`WEBTAROT_*`)
//! 3. TOML config file (`~/.config/webtarot/config.toml` or `WEBTAROT_CONFIG`)
//! 4. Compiled defaults
//!
//! A missing TOML file is not an error: a warning is logged and defaults apply.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, warn};

/// Backend address used when nothing else is configured
pub const DEFAULT_BASE_URL: &str = "http://localhost:3000";

pub const ENV_BASE_URL: &str = "WEBTAROT_BASE_URL";
pub const ENV_STRATEGY: &str = "WEBTAROT_STRATEGY";
pub const ENV_DATA_DIR: &str = "WEBTAROT_DATA_DIR";
pub const ENV_CONFIG: &str = "WEBTAROT_CONFIG";

/// How a reading view learns that its interpretation is ready
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// Interval polling only
    Poll,
    /// WebSocket completion notice, then one refetch
    #[default]
    Push,
    /// Push plus a slow safety-net poll; first final result wins
    Hybrid,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Strategy::Poll => "poll",
            Strategy::Push => "push",
            Strategy::Hybrid => "hybrid",
        })
    }
}

impl FromStr for Strategy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "poll" => Ok(Strategy::Poll),
            "push" => Ok(Strategy::Push),
            "hybrid" => Ok(Strategy::Hybrid),
            other => Err(Error::Config(format!(
                "Unknown strategy '{}' (expected poll, push or hybrid)",
                other
            ))),
        }
    }
}

/// Bootstrap configuration loaded from the TOML file
///
/// Every field is optional so a partial file only overrides what it names.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Backend origin, e.g. `https://tarot.example.com`
    #[serde(default)]
    pub base_url: Option<String>,

    #[serde(default)]
    pub strategy: Option<Strategy>,

    /// Directory for the local store (saved readings, identity)
    #[serde(default)]
    pub data_dir: Option<PathBuf>,

    #[serde(default)]
    pub polling: PollingConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Polling driver timing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollingConfig {
    /// Wait between attempts
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,

    /// Total wall-clock budget
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Safety-net interval used alongside push in hybrid mode
    #[serde(default = "default_hybrid_interval_ms")]
    pub hybrid_interval_ms: u64,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            timeout_ms: default_timeout_ms(),
            hybrid_interval_ms: default_hybrid_interval_ms(),
        }
    }
}

impl PollingConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn hybrid_interval(&self) -> Duration {
        Duration::from_millis(self.hybrid_interval_ms)
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
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

fn default_interval_ms() -> u64 {
    1000
}

fn default_timeout_ms() -> u64 {
    60_000
}

fn default_hybrid_interval_ms() -> u64 {
    5000
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Values given on the command line (highest priority tier)
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub base_url: Option<String>,
    pub strategy: Option<Strategy>,
    pub data_dir: Option<PathBuf>,
    pub config_path: Option<PathBuf>,
}

/// Fully resolved client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub strategy: Strategy,
    pub data_dir: PathBuf,
    pub polling: PollingConfig,
    pub logging: LoggingConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            strategy: Strategy::default(),
            data_dir: default_data_dir(),
            polling: PollingConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Resolve configuration across all four tiers
    pub fn resolve(overrides: &ConfigOverrides) -> Result<Self> {
        let config_path = overrides
            .config_path
            .clone()
            .or_else(|| std::env::var(ENV_CONFIG).ok().map(PathBuf::from))
            .or_else(default_config_path);

        let toml_config = match config_path {
            Some(path) => load_toml_config(&path)?,
            None => TomlConfig::default(),
        };

        Self::resolve_with(overrides, toml_config)
    }

    /// Resolve against an already loaded TOML config
    pub fn resolve_with(overrides: &ConfigOverrides, toml_config: TomlConfig) -> Result<Self> {
        let base_url = match &overrides.base_url {
            Some(url) => url.clone(),
            None => match std::env::var(ENV_BASE_URL) {
                Ok(url) if !url.trim().is_empty() => url,
                _ => toml_config
                    .base_url
                    .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            },
        };
        let base_url = normalize_base_url(&base_url)?;

        let strategy = match overrides.strategy {
            Some(strategy) => strategy,
            None => match std::env::var(ENV_STRATEGY) {
                Ok(value) if !value.trim().is_empty() => value.parse()?,
                _ => toml_config.strategy.unwrap_or_default(),
            },
        };

        let data_dir = overrides
            .data_dir
            .clone()
            .or_else(|| std::env::var(ENV_DATA_DIR).ok().map(PathBuf::from))
            .or(toml_config.data_dir)
            .unwrap_or_else(default_data_dir);

        if toml_config.polling.interval_ms == 0 {
            return Err(Error::Config("polling.interval_ms must be greater than 0".to_string()));
        }
        if toml_config.polling.hybrid_interval_ms == 0 {
            return Err(Error::Config(
                "polling.hybrid_interval_ms must be greater than 0".to_string(),
            ));
        }

        Ok(Self {
            base_url,
            strategy,
            data_dir,
            polling: toml_config.polling,
            logging: toml_config.logging,
        })
    }
}

/// Validate an HTTP origin and strip any trailing slash
pub fn normalize_base_url(url: &str) -> Result<String> {
    let trimmed = url.trim().trim_end_matches('/');
    let host = trimmed
        .strip_prefix("http://")
        .or_else(|| trimmed.strip_prefix("https://"))
        .ok_or_else(|| {
            Error::Config(format!("Base URL must start with http:// or https://: {}", url))
        })?;
    if host.is_empty() {
        return Err(Error::Config(format!("Base URL has no host: {}", url)));
    }
    Ok(trimmed.to_string())
}

/// Load the TOML file, returning defaults when it does not exist
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    if !path.exists() {
        warn!("Config file not found at {}, using defaults", path.display());
        return Ok(TomlConfig::default());
    }

    let content = std::fs::read_to_string(path)?;
    let config: TomlConfig = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))?;
    debug!("Loaded config from {}", path.display());
    Ok(config)
}

/// `~/.config/webtarot/config.toml` (platform config dir)
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("webtarot").join("config.toml"))
}

/// Get OS-dependent default data folder path
pub fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("webtarot"))
        .unwrap_or_else(|| PathBuf::from("./webtarot_data"))
}
