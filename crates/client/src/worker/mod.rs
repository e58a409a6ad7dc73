//! The request interceptor.
//!
//! ```text
//! Registration
//!     ├── active ServiceWorker (one cache generation, named by its version)
//!     │       └── Strategies: network-first | cache-first | dynamic
//!     └── Clients (open pages and the version controlling them)
//! ```
//!
//! Every intercepted request goes to the active worker, the selector picks
//! exactly one strategy, and the strategy combines the network with the
//! cache generation and/or the response store.

pub mod lifecycle;
pub mod registration;
pub mod selector;
pub mod strategies;

pub use lifecycle::{ServiceWorker, WorkerId, WorkerState};
pub use registration::{ClientId, Clients, Registration, RegistrationStatus};
pub use selector::{Strategy, select};
pub use strategies::Strategies;

use std::sync::Arc;

use moviemaster_core::{AppConfig, CacheStorage, Error, ResponseStore};
use url::{Origin, Url};

use crate::fetch::Fetcher;

/// Per-version worker settings, resolved from [`AppConfig`].
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Cache generation owned by this worker.
    pub version: String,
    /// Requests to this origin are API calls.
    pub api_origin: Origin,
    /// Absolute URLs cached on install.
    pub core_assets: Vec<Url>,
    /// Page served for failed navigations. Always one of `core_assets`.
    pub offline_url: Url,
    /// LRU bound applied to the response store after each write.
    pub max_records: Option<usize>,
}

impl WorkerConfig {
    pub fn from_app_config(config: &AppConfig) -> Result<Self, Error> {
        let api_origin = Url::parse(&config.api_origin)
            .map_err(|e| Error::InvalidUrl(format!("api_origin: {e}")))?
            .origin();
        let app_origin =
            Url::parse(&config.app_origin).map_err(|e| Error::InvalidUrl(format!("app_origin: {e}")))?;

        let resolve = |path: &str| {
            app_origin
                .join(path)
                .map_err(|e| Error::InvalidUrl(format!("{path}: {e}")))
        };

        let core_assets = config
            .core_assets
            .iter()
            .map(|path| resolve(path))
            .collect::<Result<Vec<_>, _>>()?;
        let offline_url = resolve(&config.offline_path)?;

        if !core_assets.contains(&offline_url) {
            return Err(Error::InvalidInput(format!("offline page {offline_url} is not a core asset")));
        }

        Ok(Self {
            version: config.cache_version.clone(),
            api_origin,
            core_assets,
            offline_url,
            max_records: config.max_records,
        })
    }

    /// Same settings under another cache version.
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }
}

/// Handles shared by every worker version: network, response store, caches.
///
/// Built once at startup and passed to the registration.
#[derive(Clone)]
pub struct WorkerContext {
    pub fetcher: Arc<dyn Fetcher>,
    pub store: ResponseStore,
    pub caches: CacheStorage,
}

impl WorkerContext {
    pub fn new(fetcher: Arc<dyn Fetcher>, store: ResponseStore, caches: CacheStorage) -> Self {
        Self { fetcher, store, caches }
    }
}
