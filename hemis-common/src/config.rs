//! Configuration loading
//!
//! Bootstrap configuration follows this priority order:
//! 1. Command-line argument (highest priority, applied by the binary)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (fallback)
//!
//! A missing config file SHALL NOT prevent startup: the compiled defaults are used and
//! reported as [`ConfigSource::CompiledDefaults`] so the binary can warn about it once
//! logging is up. A config file that was named explicitly must exist and parse.

use crate::{Error, Result};
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

/// Environment variable overriding `upstream.base_url`
pub const ENV_BASE_URL: &str = "HEMIS_BASE_URL";
/// Environment variable overriding `upstream.token`
pub const ENV_TOKEN: &str = "HEMIS_TOKEN";
/// Environment variable overriding `server.port`
pub const ENV_PORT: &str = "HEMIS_STATS_PORT";
/// Environment variable overriding `logging.level`
pub const ENV_LOG_LEVEL: &str = "HEMIS_STATS_LOG_LEVEL";

/// Upper bound for `aggregation.cache_ttl_secs` (30 days)
pub const MAX_CACHE_TTL_SECS: u64 = 30 * 24 * 60 * 60;

const CONFIG_DIR_NAME: &str = "hemis";
const CONFIG_FILE_NAME: &str = "hemis-stats.toml";

/// Bootstrap configuration loaded from TOML file
///
/// Every section is optional; omitted fields take compiled defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    pub upstream: UpstreamConfig,
    pub server: ServerConfig,
    pub aggregation: AggregationConfig,
    pub logging: LoggingConfig,
}

/// Upstream HEMIS REST API connection settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Base URL, without the `/v1/data/...` suffix
    pub base_url: String,
    /// Bearer token (empty = no Authorization header)
    pub token: String,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
    /// Client-side pacing; 0 disables the limiter
    pub requests_per_second: u32,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: "https://student.hemis.uz/rest".to_string(),
            token: String::new(),
            timeout_secs: 15,
            requests_per_second: 20,
        }
    }
}

impl UpstreamConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// HTTP server bind settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5740,
        }
    }
}

/// Aggregation engine tuning
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AggregationConfig {
    /// Concurrent upstream count queries per phase
    pub max_workers: usize,
    /// Student status classifier code meaning "currently enrolled"
    pub active_status_code: i64,
    /// Lifetime of the cached faculty table
    pub cache_ttl_secs: u64,
    /// Attempts per count query before it is given up as unknown
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    /// Backoff unit after an HTTP 429, multiplied by the rate-limit attempt number
    pub rate_limit_delay_ms: u64,
    /// Rate-limit waits allowed before a count query is given up
    pub max_rate_limit_retries: u32,
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            max_workers: 10,
            active_status_code: 11,
            cache_ttl_secs: 3600,
            max_attempts: 3,
            base_delay_ms: 250,
            max_delay_ms: 4000,
            rate_limit_delay_ms: 1000,
            max_rate_limit_retries: 10,
        }
    }
}

impl AggregationConfig {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log file path (optional, logs to stderr if not specified)
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

/// Where [`TomlConfig::load`] found its settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// File named on the command line or via environment
    Explicit(PathBuf),
    /// File found at the platform default location
    DefaultLocation(PathBuf),
    /// No file; compiled defaults
    CompiledDefaults,
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigSource::Explicit(path) | ConfigSource::DefaultLocation(path) => {
                write!(f, "{}", path.display())
            }
            ConfigSource::CompiledDefaults => f.write_str("compiled defaults"),
        }
    }
}

impl TomlConfig {
    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Load configuration from `explicit` path, or from the platform default location
    ///
    /// Environment overrides are applied and the result is validated. The returned
    /// [`ConfigSource`] lets the caller log where settings came from once logging is up.
    pub fn load(explicit: Option<&Path>) -> Result<(Self, ConfigSource)> {
        let (mut config, source) = match explicit {
            Some(path) => {
                let content = std::fs::read_to_string(path).map_err(|e| {
                    Error::Config(format!("Cannot read config file {}: {}", path.display(), e))
                })?;
                (
                    Self::from_toml_str(&content)?,
                    ConfigSource::Explicit(path.to_path_buf()),
                )
            }
            None => match default_config_path() {
                Some(path) => {
                    let content = std::fs::read_to_string(&path)?;
                    (Self::from_toml_str(&content)?, ConfigSource::DefaultLocation(path))
                }
                None => (Self::default(), ConfigSource::CompiledDefaults),
            },
        };

        config.apply_env_overrides();
        config.validate()?;
        Ok((config, source))
    }

    /// Apply environment variable overrides (priority 2)
    pub fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var(ENV_BASE_URL) {
            if !url.trim().is_empty() {
                self.upstream.base_url = url;
            }
        }

        if let Ok(token) = std::env::var(ENV_TOKEN) {
            self.upstream.token = token;
        }

        if let Ok(port) = std::env::var(ENV_PORT) {
            match port.parse::<u16>() {
                Ok(p) => self.server.port = p,
                Err(_) => warn!("Ignoring invalid {}={:?}", ENV_PORT, port),
            }
        }

        if let Ok(level) = std::env::var(ENV_LOG_LEVEL) {
            if !level.trim().is_empty() {
                self.logging.level = level;
            }
        }
    }

    /// Reject configurations the engine cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.upstream.base_url.trim().is_empty() {
            return Err(Error::Config("upstream.base_url must not be empty".to_string()));
        }
        if self.aggregation.max_workers == 0 {
            return Err(Error::Config("aggregation.max_workers must be at least 1".to_string()));
        }
        if self.aggregation.max_attempts == 0 {
            return Err(Error::Config("aggregation.max_attempts must be at least 1".to_string()));
        }
        if self.aggregation.cache_ttl_secs > MAX_CACHE_TTL_SECS {
            return Err(Error::Config(format!(
                "aggregation.cache_ttl_secs must be at most {}",
                MAX_CACHE_TTL_SECS
            )));
        }
        Ok(())
    }
}

/// Locate the default config file for the platform
///
/// Linux checks `~/.config/hemis/hemis-stats.toml` then `/etc/hemis/hemis-stats.toml`;
/// other platforms check the user config directory only.
fn default_config_path() -> Option<PathBuf> {
    let user_config = dirs::config_dir().map(|d| d.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME));
    if let Some(path) = user_config {
        if path.exists() {
            return Some(path);
        }
    }

    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc").join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME);
        if system_config.exists() {
            return Some(system_config);
        }
    }

    None
}
