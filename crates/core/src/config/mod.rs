//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (MOVIEMASTER_*)
//! 2. TOML config file (if MOVIEMASTER_CONFIG_FILE set)
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
/// 1. Environment variables (MOVIEMASTER_*)
/// 2. TOML config file (if MOVIEMASTER_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the SQLite database holding the response store and caches.
    ///
    /// Set via MOVIEMASTER_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Cache version. Bumping it on deploy invalidates every older cache generation.
    ///
    /// Set via MOVIEMASTER_CACHE_VERSION environment variable.
    #[serde(default = "default_cache_version")]
    pub cache_version: String,

    /// Origin of the remote movie API. Requests to it are served network-first.
    ///
    /// Set via MOVIEMASTER_API_ORIGIN environment variable.
    #[serde(default = "default_api_origin")]
    pub api_origin: String,

    /// Origin the app shell is served from; core asset paths resolve against it.
    ///
    /// Set via MOVIEMASTER_APP_ORIGIN environment variable.
    #[serde(default = "default_app_origin")]
    pub app_origin: String,

    /// App-relative paths cached when a worker installs.
    #[serde(default = "default_core_assets")]
    pub core_assets: Vec<String>,

    /// App-relative path of the page served when a navigation fails offline.
    ///
    /// Must be one of `core_assets`.
    #[serde(default = "default_offline_path")]
    pub offline_path: String,

    /// User-Agent string for HTTP requests.
    ///
    /// Set via MOVIEMASTER_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Maximum bytes to fetch per request.
    ///
    /// Set via MOVIEMASTER_MAX_BYTES environment variable.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// HTTP request timeout in milliseconds.
    ///
    /// Set via MOVIEMASTER_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Upper bound on stored API responses. Unbounded when unset.
    ///
    /// Set via MOVIEMASTER_MAX_RECORDS environment variable.
    #[serde(default)]
    pub max_records: Option<usize>,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./moviemaster.sqlite")
}

fn default_cache_version() -> String {
    "MOVIE_MASTER_V1".into()
}

fn default_api_origin() -> String {
    "https://www.omdbapi.com".into()
}

fn default_app_origin() -> String {
    "http://localhost:3000".into()
}

fn default_core_assets() -> Vec<String> {
    vec!["/".into(), "/imdb-logo.svg".into(), "/rotten-tomatoes-logo.svg".into(), "/offline".into()]
}

fn default_offline_path() -> String {
    "/offline".into()
}

fn default_user_agent() -> String {
    "moviemaster/0.1".into()
}

fn default_max_bytes() -> usize {
    5_242_880 // 5MB
}

fn default_timeout_ms() -> u64 {
    20_000
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            cache_version: default_cache_version(),
            api_origin: default_api_origin(),
            app_origin: default_app_origin(),
            core_assets: default_core_assets(),
            offline_path: default_offline_path(),
            user_agent: default_user_agent(),
            max_bytes: default_max_bytes(),
            timeout_ms: default_timeout_ms(),
            max_records: None,
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `MOVIEMASTER_`
    /// 2. TOML file from `MOVIEMASTER_CONFIG_FILE` (if set)
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

        if let Ok(config_path) = std::env::var("MOVIEMASTER_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("MOVIEMASTER_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}
