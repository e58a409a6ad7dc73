//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::AppConfig;
use thiserror::Error;
use url::Url;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },
}

fn invalid(field: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid { field: field.into(), reason: reason.into() }
}

fn validate_origin(field: &str, value: &str) -> Result<(), ConfigError> {
    let url = Url::parse(value).map_err(|e| invalid(field, e.to_string()))?;
    match url.scheme() {
        "http" | "https" => {}
        scheme => return Err(invalid(field, format!("unsupported scheme: {scheme}"))),
    }
    if url.host_str().is_none() {
        return Err(invalid(field, "must include a host"));
    }
    Ok(())
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `cache_version` or `user_agent` is empty
    /// - `api_origin` or `app_origin` is not an http(s) URL
    /// - a core asset or the offline path is not app-relative
    /// - `offline_path` is not one of `core_assets`
    /// - `max_bytes` is 0 or exceeds 50MB
    /// - `timeout_ms` is less than 100ms or exceeds 5 minutes
    /// - `max_records` is 0
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cache_version.trim().is_empty() {
            return Err(invalid("cache_version", "must not be empty"));
        }

        validate_origin("api_origin", &self.api_origin)?;
        validate_origin("app_origin", &self.app_origin)?;

        if let Some(asset) = self.core_assets.iter().find(|a| !a.starts_with('/')) {
            return Err(invalid("core_assets", format!("'{asset}' must start with '/'")));
        }
        if !self.offline_path.starts_with('/') {
            return Err(invalid("offline_path", "must start with '/'"));
        }
        if !self.core_assets.contains(&self.offline_path) {
            return Err(invalid("offline_path", "must be listed in core_assets"));
        }

        if self.max_bytes == 0 {
            return Err(invalid("max_bytes", "must be greater than 0"));
        }
        if self.max_bytes > 50 * 1024 * 1024 {
            return Err(invalid("max_bytes", "must not exceed 50MB"));
        }

        if self.timeout_ms < 100 {
            return Err(invalid("timeout_ms", "must be at least 100ms"));
        }
        if self.timeout_ms > 300_000 {
            return Err(invalid("timeout_ms", "must not exceed 5 minutes (300000ms)"));
        }

        if self.user_agent.is_empty() {
            return Err(invalid("user_agent", "must not be empty"));
        }

        if self.max_records == Some(0) {
            return Err(invalid("max_records", "must be greater than 0 when set"));
        }

        if self.api_origin == self.app_origin {
            tracing::warn!(
                origin = %self.api_origin,
                "api_origin equals app_origin; every same-origin request will be treated as an API call"
            );
        }

        Ok(())
    }
}
