//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::AppConfig;
use thiserror::Error;

/// Shortest accepted timeout (100ms).
const MIN_TIMEOUT_MS: u64 = 100;

/// Longest accepted timeout (5 minutes).
const MAX_TIMEOUT_MS: u64 = 300_000;

/// Longest accepted search cache lifetime (1 day).
pub(crate) const MAX_CACHE_TTL_SECS: u64 = 86_400;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },

    #[error("missing required configuration: {field} ({hint})")]
    Missing { field: String, hint: String },
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - a timeout is below 100ms or above 5 minutes
    /// - `search_cache_ttl_secs` is 0 or above 1 day
    /// - `api_base_url` is not an http(s) URL
    /// - a user agent is empty
    ///
    /// Returns `ConfigError::Missing` if `api_base_url` or `bind_addr` is empty.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("search_timeout_ms", self.search_timeout_ms),
            ("request_timeout_ms", self.request_timeout_ms),
            ("connect_timeout_ms", self.connect_timeout_ms),
        ] {
            if value < MIN_TIMEOUT_MS {
                return Err(ConfigError::Invalid { field: field.into(), reason: "must be at least 100ms".into() });
            }
            if value > MAX_TIMEOUT_MS {
                return Err(ConfigError::Invalid {
                    field: field.into(),
                    reason: "must not exceed 5 minutes (300000ms)".into(),
                });
            }
        }

        if self.search_cache_ttl_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "search_cache_ttl_secs".into(),
                reason: "must be greater than 0".into(),
            });
        }
        if self.search_cache_ttl_secs > MAX_CACHE_TTL_SECS {
            return Err(ConfigError::Invalid {
                field: "search_cache_ttl_secs".into(),
                reason: "must not exceed 1 day (86400s)".into(),
            });
        }

        if self.bind_addr.trim().is_empty() {
            return Err(ConfigError::Missing {
                field: "bind_addr".into(),
                hint: "Set ASSETGATE_BIND_ADDR environment variable".into(),
            });
        }

        let base = self.api_base_url.trim();
        if base.is_empty() {
            return Err(ConfigError::Missing {
                field: "api_base_url".into(),
                hint: "Set ASSETGATE_API_BASE_URL environment variable".into(),
            });
        }
        match url::Url::parse(base) {
            Ok(parsed) if matches!(parsed.scheme(), "http" | "https") && parsed.host_str().is_some() => {}
            Ok(_) => {
                return Err(ConfigError::Invalid {
                    field: "api_base_url".into(),
                    reason: "must be an http:// or https:// URL with a host".into(),
                });
            }
            Err(e) => {
                return Err(ConfigError::Invalid { field: "api_base_url".into(), reason: e.to_string() });
            }
        }

        if self.user_agent.is_empty() {
            return Err(ConfigError::Invalid { field: "user_agent".into(), reason: "must not be empty".into() });
        }
        if self.download_user_agent.is_empty() {
            return Err(ConfigError::Invalid {
                field: "download_user_agent".into(),
                reason: "must not be empty".into(),
            });
        }

        if self.fallback_path.is_none() {
            tracing::warn!("fallback_path is unset; search failures will surface as errors");
        }

        Ok(())
    }
}
