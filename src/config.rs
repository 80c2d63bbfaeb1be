//! Configuration System
//!
//! Provides hierarchical configuration loading from:
//! - config.toml (default configuration)
//! - config.local.toml (git-ignored local overrides)
//! - Environment variables (ENGINE_* prefix)
//!
//! ## Example
//!
//! ```toml
//! # config.toml
//! [index]
//! path = "/var/lib/engine/pattern_index.bin"
//!
//! [cache]
//! max_entries = 1000
//! ```
//!
//! Environment variable overrides:
//! ```bash
//! ENGINE_INDEX__PATH=/custom/path
//! ENGINE_CACHE__MAX_ENTRIES=500
//! ```

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Top-level engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub index: IndexConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub execution: ExecutionLimitsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Location and load behaviour of the on-disk pattern index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    /// Path to the serialised pattern-index file (see `pattern_index::io`).
    pub path: PathBuf,
}

/// Result-cache configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Maximum number of cached result tables kept at once.
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,

    /// Maximum aggregate byte budget across all cached entries.
    #[serde(default = "default_max_cache_bytes")]
    pub max_bytes: usize,
}

/// Per-query resource and timeout configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionLimitsConfig {
    /// Default query timeout in milliseconds (0 = unlimited).
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Per-query memory quota in bytes (0 = unlimited).
    #[serde(default)]
    pub max_memory_bytes: usize,
}

impl ExecutionLimitsConfig {
    pub fn timeout(&self) -> Option<Duration> {
        if self.timeout_ms == 0 {
            None
        } else {
            Some(Duration::from_millis(self.timeout_ms))
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format (text, json).
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_max_entries() -> usize {
    1000
}
fn default_max_cache_bytes() -> usize {
    512 * 1024 * 1024
}
fn default_timeout_ms() -> u64 {
    30_000
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> String {
    "text".to_string()
}

impl Config {
    /// Load configuration from the default locations.
    ///
    /// Merges in order:
    /// 1. `config.toml` (base configuration)
    /// 2. `config.local.toml` (local overrides, git-ignored)
    /// 3. Environment variables (`ENGINE_*` prefix, `__` as nesting separator)
    pub fn load() -> Result<Self, figment::Error> {
        Figment::new()
            .merge(Toml::file("config.toml"))
            .merge(Toml::file("config.local.toml"))
            .merge(Env::prefixed("ENGINE_").split("__"))
            .extract()
    }

    /// Load configuration from a specific file path.
    pub fn from_file(path: &str) -> Result<Self, figment::Error> {
        Figment::new()
            .merge(Toml::file(path))
            .merge(Env::prefixed("ENGINE_").split("__"))
            .extract()
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            index: IndexConfig {
                path: PathBuf::from("./pattern_index.bin"),
            },
            cache: CacheConfig::default(),
            execution: ExecutionLimitsConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        CacheConfig {
            max_entries: default_max_entries(),
            max_bytes: default_max_cache_bytes(),
        }
    }
}

impl Default for ExecutionLimitsConfig {
    fn default() -> Self {
        ExecutionLimitsConfig {
            timeout_ms: default_timeout_ms(),
            max_memory_bytes: 0,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl LoggingConfig {
    /// Install a global `tracing` subscriber honouring `level` and
    /// `format`. Call once at process startup; a second call is a no-op
    /// (the underlying `set_global_default` failure is swallowed).
    pub fn init_tracing(&self) {
        use tracing_subscriber::EnvFilter;

        let filter = EnvFilter::try_new(&self.level).unwrap_or_else(|_| EnvFilter::new("info"));
        let subscriber = tracing_subscriber::fmt().with_env_filter(filter);
        let result = if self.format == "json" {
            subscriber.json().try_init()
        } else {
            subscriber.try_init()
        };
        if let Err(err) = result {
            eprintln!("tracing subscriber already installed: {err}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.cache.max_entries, 1000);
        assert_eq!(config.execution.timeout_ms, 30_000);
        assert!(config.execution.timeout().is_some());
    }

    #[test]
    fn test_zero_timeout_is_unlimited() {
        let mut config = ExecutionLimitsConfig::default();
        config.timeout_ms = 0;
        assert!(config.timeout().is_none());
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let toml_str = toml::to_string(&config).unwrap();
        assert!(toml_str.contains("[index]"));
        assert!(toml_str.contains("[cache]"));
    }
}
