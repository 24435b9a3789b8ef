//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (ASSETGATE_*)
//! 2. TOML config file (if ASSETGATE_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (ASSETGATE_*)
/// 2. TOML config file (if ASSETGATE_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Address the HTTP server listens on.
    ///
    /// Set via ASSETGATE_BIND_ADDR environment variable.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Root URL of the upstream resource API.
    ///
    /// Set via ASSETGATE_API_BASE_URL environment variable.
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Deadline for an upstream search call in milliseconds.
    #[serde(default = "default_search_timeout_ms")]
    pub search_timeout_ms: u64,

    /// Timeout for verification and task-status calls in milliseconds.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Connect timeout for file retrieval in milliseconds.
    ///
    /// Retrieval has no total timeout since the body is streamed.
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    /// Lifetime of a cached search result in seconds.
    #[serde(default = "default_search_cache_ttl_secs")]
    pub search_cache_ttl_secs: u64,

    /// Interval between sweeps of expired cache entries. 0 disables the sweep.
    #[serde(default = "default_cache_sweep_interval_secs")]
    pub cache_sweep_interval_secs: u64,

    /// JSON file served when the upstream search is unavailable.
    ///
    /// Set via ASSETGATE_FALLBACK_PATH environment variable.
    #[serde(default = "default_fallback_path")]
    pub fallback_path: Option<PathBuf>,

    /// User-Agent string for upstream API requests.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// User-Agent string for fetching finished files.
    #[serde(default = "default_download_user_agent")]
    pub download_user_agent: String,
}

fn default_bind_addr() -> String {
    "0.0.0.0:8080".into()
}

fn default_api_base_url() -> String {
    "http://localhost:5000/api".into()
}

fn default_search_timeout_ms() -> u64 {
    30_000
}

fn default_request_timeout_ms() -> u64 {
    20_000
}

fn default_connect_timeout_ms() -> u64 {
    10_000
}

fn default_search_cache_ttl_secs() -> u64 {
    300
}

fn default_cache_sweep_interval_secs() -> u64 {
    60
}

fn default_fallback_path() -> Option<PathBuf> {
    Some(PathBuf::from("data/search-fallback.json"))
}

fn default_user_agent() -> String {
    "assetgate/0.1".into()
}

fn default_download_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36"
        .into()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            api_base_url: default_api_base_url(),
            search_timeout_ms: default_search_timeout_ms(),
            request_timeout_ms: default_request_timeout_ms(),
            connect_timeout_ms: default_connect_timeout_ms(),
            search_cache_ttl_secs: default_search_cache_ttl_secs(),
            cache_sweep_interval_secs: default_cache_sweep_interval_secs(),
            fallback_path: default_fallback_path(),
            user_agent: default_user_agent(),
            download_user_agent: default_download_user_agent(),
        }
    }
}

impl AppConfig {
    pub fn search_timeout(&self) -> Duration {
        Duration::from_millis(self.search_timeout_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Cache TTL as a chrono Duration for deadline arithmetic.
    pub fn search_cache_ttl(&self) -> chrono::Duration {
        let secs = self.search_cache_ttl_secs.min(validation::MAX_CACHE_TTL_SECS);
        chrono::Duration::seconds(i64::try_from(secs).unwrap_or(crate::cache::search::DEFAULT_TTL_SECONDS))
    }

    /// Sweep interval, or None when the sweep is disabled.
    pub fn cache_sweep_interval(&self) -> Option<Duration> {
        (self.cache_sweep_interval_secs > 0).then(|| Duration::from_secs(self.cache_sweep_interval_secs))
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `ASSETGATE_`
    /// 2. TOML file from `ASSETGATE_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("ASSETGATE_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("ASSETGATE_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.bind_addr, "0.0.0.0:8080");
        assert_eq!(config.api_base_url, "http://localhost:5000/api");
        assert_eq!(config.search_timeout_ms, 30_000);
        assert_eq!(config.request_timeout_ms, 20_000);
        assert_eq!(config.search_cache_ttl_secs, 300);
        assert_eq!(config.fallback_path, Some(PathBuf::from("data/search-fallback.json")));
        assert_eq!(config.user_agent, "assetgate/0.1");
        assert!(config.download_user_agent.starts_with("Mozilla/5.0"));
    }

    #[test]
    fn test_durations() {
        let config = AppConfig::default();
        assert_eq!(config.search_timeout(), Duration::from_secs(30));
        assert_eq!(config.request_timeout(), Duration::from_secs(20));
        assert_eq!(config.connect_timeout(), Duration::from_secs(10));
        assert_eq!(config.search_cache_ttl(), chrono::Duration::minutes(5));
    }

    #[test]
    fn test_sweep_interval_disabled() {
        let config = AppConfig { cache_sweep_interval_secs: 0, ..Default::default() };
        assert!(config.cache_sweep_interval().is_none());

        let config = AppConfig::default();
        assert_eq!(config.cache_sweep_interval(), Some(Duration::from_secs(60)));
    }

    #[test]
    fn test_load_from_toml_and_env() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "assetgate.toml",
                r#"
                api_base_url = "https://api.example.com/v1"
                search_cache_ttl_secs = 120
                "#,
            )?;
            jail.set_env("ASSETGATE_CONFIG_FILE", "assetgate.toml");
            jail.set_env("ASSETGATE_SEARCH_CACHE_TTL_SECS", "60");

            let config = AppConfig::load().map_err(|e| e.to_string())?;
            assert_eq!(config.api_base_url, "https://api.example.com/v1");
            assert_eq!(config.search_cache_ttl_secs, 60);
            assert_eq!(config.search_timeout_ms, 30_000);
            Ok(())
        });
    }
}
