//! Runtime configuration with precedence and validation
//!
//! Values are layered in this order, later layers winning:
//! defaults, a JSON config file, `IDOC_*` environment variables, and
//! finally explicit builder overrides.

use crate::constants::{
    CONFIG_FILENAME, DEFAULT_ERROR_GRACE_MS, DEFAULT_IDLE_FALLBACK_MS, DEFAULT_LOG_FILTER,
    DEFAULT_RECENT_DOCUMENTS_LIMIT, DEFAULT_SUCCESS_GRACE_MS, IDOC_CONFIG_VAR,
    IDOC_ERROR_GRACE_MS_VAR, IDOC_IDLE_FALLBACK_MS_VAR, IDOC_LOG_VAR,
    IDOC_RECENT_DOCUMENTS_LIMIT_VAR, IDOC_SUCCESS_GRACE_MS_VAR,
};
use crate::errors::{Error, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Download tracker timings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloadConfig {
    /// How long a completed task stays visible before removal
    pub success_grace_ms: u64,
    /// How long a failed task stays visible before removal
    pub error_grace_ms: u64,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            success_grace_ms: DEFAULT_SUCCESS_GRACE_MS,
            error_grace_ms: DEFAULT_ERROR_GRACE_MS,
        }
    }
}

impl DownloadConfig {
    pub fn success_grace(&self) -> Duration {
        Duration::from_millis(self.success_grace_ms)
    }

    pub fn error_grace(&self) -> Duration {
        Duration::from_millis(self.error_grace_ms)
    }
}

/// Task queue timings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Delay used when the host cannot report idleness
    pub idle_fallback_ms: u64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            idle_fallback_ms: DEFAULT_IDLE_FALLBACK_MS,
        }
    }
}

impl QueueConfig {
    pub fn idle_fallback(&self) -> Duration {
        Duration::from_millis(self.idle_fallback_ms)
    }
}

/// Preloader settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreloadConfig {
    /// Number of recent documents fetched per user
    pub recent_documents_limit: usize,
}

impl Default for PreloadConfig {
    fn default() -> Self {
        Self {
            recent_documents_limit: DEFAULT_RECENT_DOCUMENTS_LIMIT,
        }
    }
}

/// Source of configuration for debugging and precedence tracking
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigSource {
    /// Default configuration
    #[default]
    Default,
    /// Configuration file
    ConfigFile(PathBuf),
    /// Environment variable
    EnvironmentVariable(String),
    /// Explicit builder overrides
    Builder,
}

/// Complete runtime configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdocConfig {
    pub download: DownloadConfig,
    pub queue: QueueConfig,
    pub preload: PreloadConfig,
    /// `tracing` filter directive, e.g. `info` or `idoc_cache=debug`
    pub log_filter: String,
    /// Highest-precedence layer that contributed a value
    #[serde(skip)]
    pub source: ConfigSource,
}

impl Default for IdocConfig {
    fn default() -> Self {
        Self {
            download: DownloadConfig::default(),
            queue: QueueConfig::default(),
            preload: PreloadConfig::default(),
            log_filter: DEFAULT_LOG_FILTER.to_string(),
            source: ConfigSource::Default,
        }
    }
}

impl IdocConfig {
    /// Load configuration from the config file (if any) and the process environment
    pub fn load() -> Result<Self> {
        let path = env::var(IDOC_CONFIG_VAR)
            .map(PathBuf::from)
            .unwrap_or_else(|_| default_config_path());

        let config = if path.exists() {
            Self::from_file(&path)?
        } else {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            Self::default()
        };

        let config = config.apply_env(|name| env::var(name).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Read a JSON config file; missing fields fall back to defaults
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::file_system(path, "read config file", e))?;
        let mut config: IdocConfig = serde_json::from_str(&content)?;
        config.source = ConfigSource::ConfigFile(path.to_path_buf());
        Ok(config)
    }

    /// Overlay `IDOC_*` variables using the given lookup
    pub fn apply_env<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(IDOC_SUCCESS_GRACE_MS_VAR) {
            self.download.success_grace_ms = parse_number(IDOC_SUCCESS_GRACE_MS_VAR, &value)?;
            self.source = ConfigSource::EnvironmentVariable(IDOC_SUCCESS_GRACE_MS_VAR.into());
        }
        if let Some(value) = lookup(IDOC_ERROR_GRACE_MS_VAR) {
            self.download.error_grace_ms = parse_number(IDOC_ERROR_GRACE_MS_VAR, &value)?;
            self.source = ConfigSource::EnvironmentVariable(IDOC_ERROR_GRACE_MS_VAR.into());
        }
        if let Some(value) = lookup(IDOC_IDLE_FALLBACK_MS_VAR) {
            self.queue.idle_fallback_ms = parse_number(IDOC_IDLE_FALLBACK_MS_VAR, &value)?;
            self.source = ConfigSource::EnvironmentVariable(IDOC_IDLE_FALLBACK_MS_VAR.into());
        }
        if let Some(value) = lookup(IDOC_RECENT_DOCUMENTS_LIMIT_VAR) {
            self.preload.recent_documents_limit =
                parse_number(IDOC_RECENT_DOCUMENTS_LIMIT_VAR, &value)?;
            self.source = ConfigSource::EnvironmentVariable(IDOC_RECENT_DOCUMENTS_LIMIT_VAR.into());
        }
        if let Some(value) = lookup(IDOC_LOG_VAR) {
            self.log_filter = value;
            self.source = ConfigSource::EnvironmentVariable(IDOC_LOG_VAR.into());
        }
        Ok(self)
    }

    /// Reject settings the runtime cannot honour
    pub fn validate(&self) -> Result<()> {
        if self.download.success_grace_ms == 0 {
            return Err(Error::configuration("download.success_grace_ms must be > 0"));
        }
        if self.download.error_grace_ms == 0 {
            return Err(Error::configuration("download.error_grace_ms must be > 0"));
        }
        if self.preload.recent_documents_limit == 0 {
            return Err(Error::configuration(
                "preload.recent_documents_limit must be > 0",
            ));
        }
        if self.log_filter.trim().is_empty() {
            return Err(Error::configuration("log_filter must not be empty"));
        }
        Ok(())
    }
}

fn parse_number<T: std::str::FromStr>(name: &str, value: &str) -> Result<T> {
    value.trim().parse::<T>().map_err(|_| {
        Error::configuration(format!("{name} must be a non-negative integer, got '{value}'"))
    })
}

/// `$XDG_CONFIG_HOME/idoc/config.json`, falling back to `~/.config`
pub fn default_config_path() -> PathBuf {
    env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            dirs::home_dir()
                .map(|home| home.join(".config"))
                .unwrap_or_else(|| PathBuf::from(".config"))
        })
        .join("idoc")
        .join(CONFIG_FILENAME)
}

/// Builder for explicit configuration overrides
pub struct IdocConfigBuilder {
    config: IdocConfig,
}

impl IdocConfigBuilder {
    /// Create a new builder with default configuration
    pub fn new() -> Self {
        Self {
            config: IdocConfig::default(),
        }
    }

    /// Start from an already loaded configuration
    pub fn from_config(config: IdocConfig) -> Self {
        Self { config }
    }

    pub fn with_success_grace(mut self, grace: Duration) -> Self {
        self.config.download.success_grace_ms = grace.as_millis() as u64;
        self.config.source = ConfigSource::Builder;
        self
    }

    pub fn with_error_grace(mut self, grace: Duration) -> Self {
        self.config.download.error_grace_ms = grace.as_millis() as u64;
        self.config.source = ConfigSource::Builder;
        self
    }

    pub fn with_idle_fallback(mut self, delay: Duration) -> Self {
        self.config.queue.idle_fallback_ms = delay.as_millis() as u64;
        self.config.source = ConfigSource::Builder;
        self
    }

    pub fn with_recent_documents_limit(mut self, limit: usize) -> Self {
        self.config.preload.recent_documents_limit = limit;
        self.config.source = ConfigSource::Builder;
        self
    }

    pub fn with_log_filter(mut self, filter: impl Into<String>) -> Self {
        self.config.log_filter = filter.into();
        self.config.source = ConfigSource::Builder;
        self
    }

    /// Validate and return the configuration
    pub fn build(self) -> Result<IdocConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

impl Default for IdocConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_match_documented_timings() {
        let config = IdocConfig::default();
        assert_eq!(config.download.success_grace(), Duration::from_secs(3));
        assert_eq!(config.download.error_grace(), Duration::from_secs(5));
        assert_eq!(config.queue.idle_fallback(), Duration::from_secs(1));
        assert_eq!(config.preload.recent_documents_limit, 10);
        assert_eq!(config.source, ConfigSource::Default);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_file_layer_keeps_missing_fields_default() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.json");
        std::fs::write(&path, r#"{ "download": { "error_grace_ms": 7000 } }"#).unwrap();

        let config = IdocConfig::from_file(&path).unwrap();
        assert_eq!(config.download.error_grace_ms, 7000);
        assert_eq!(config.download.success_grace_ms, DEFAULT_SUCCESS_GRACE_MS);
        assert_eq!(config.source, ConfigSource::ConfigFile(path));
    }

    #[test]
    fn test_env_layer_overrides_file_values() {
        let vars: HashMap<&str, &str> = [
            (IDOC_IDLE_FALLBACK_MS_VAR, "250"),
            (IDOC_LOG_VAR, "debug"),
        ]
        .into_iter()
        .collect();

        let config = IdocConfig::default()
            .apply_env(|name| vars.get(name).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.queue.idle_fallback_ms, 250);
        assert_eq!(config.log_filter, "debug");
        assert_eq!(
            config.source,
            ConfigSource::EnvironmentVariable(IDOC_LOG_VAR.to_string())
        );
    }

    #[test]
    fn test_env_layer_rejects_garbage() {
        let result = IdocConfig::default().apply_env(|name| {
            (name == IDOC_SUCCESS_GRACE_MS_VAR).then(|| "soon".to_string())
        });
        assert!(matches!(result, Err(Error::Configuration { .. })));
    }

    #[test]
    fn test_builder_validates() {
        let config = IdocConfigBuilder::new()
            .with_success_grace(Duration::from_millis(10))
            .build()
            .unwrap();
        assert_eq!(config.download.success_grace_ms, 10);
        assert_eq!(config.source, ConfigSource::Builder);

        let invalid = IdocConfigBuilder::new()
            .with_error_grace(Duration::ZERO)
            .build();
        assert!(invalid.is_err());
    }

    #[test]
    fn test_builder_overrides_loaded_config() {
        let loaded = IdocConfig::default()
            .apply_env(|name| (name == IDOC_ERROR_GRACE_MS_VAR).then(|| "8000".to_string()))
            .unwrap();

        let config = IdocConfigBuilder::from_config(loaded)
            .with_log_filter("idoc_download=debug")
            .build()
            .unwrap();

        assert_eq!(config.download.error_grace_ms, 8000);
        assert_eq!(config.log_filter, "idoc_download=debug");
        assert_eq!(config.source, ConfigSource::Builder);

        let cleared = IdocConfigBuilder::from_config(IdocConfig::default())
            .with_log_filter(" ")
            .build();
        assert!(cleared.is_err());
    }
}
