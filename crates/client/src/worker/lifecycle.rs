//! Worker lifecycle: install, activate, serve.
//!
//! ```text
//! Parsed → Installing → Installed → Activating → Activated
//!              │                                     │
//!              └──────────── Redundant ◄─────────────┘
//! ```
//!
//! `Installed` is the waiting state. Workers here always skip waiting, so a
//! successful install moves straight on to activation.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, OnceLock};

use moviemaster_core::{CacheHandle, Error, Request, Response};
use serde::Serialize;

use super::selector::{Strategy, select};
use super::strategies::Strategies;
use super::{WorkerConfig, WorkerContext};
use crate::fetch::Fetcher;

/// Unique identifier for a worker instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct WorkerId(u64);

impl WorkerId {
    fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

/// Worker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerState {
    /// Created, install not started.
    #[default]
    Parsed,
    /// Pre-warming the cache generation.
    Installing,
    /// Installed; waiting to activate.
    Installed,
    /// Removing stale cache generations.
    Activating,
    /// Serving requests.
    Activated,
    /// Install failed or replaced by a newer worker.
    Redundant,
}

/// One version of the interceptor.
pub struct ServiceWorker {
    id: WorkerId,
    config: Arc<WorkerConfig>,
    ctx: WorkerContext,
    state: Mutex<WorkerState>,
    strategies: OnceLock<Strategies>,
}

impl std::fmt::Debug for ServiceWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceWorker")
            .field("id", &self.id)
            .field("version", &self.config.version)
            .field("state", &self.state())
            .finish()
    }
}

impl ServiceWorker {
    pub fn new(ctx: WorkerContext, config: WorkerConfig) -> Self {
        Self {
            id: WorkerId::new(),
            config: Arc::new(config),
            ctx,
            state: Mutex::new(WorkerState::Parsed),
            strategies: OnceLock::new(),
        }
    }

    pub fn id(&self) -> WorkerId {
        self.id
    }

    /// Cache version this worker owns.
    pub fn version(&self) -> &str {
        &self.config.version
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    pub fn state(&self) -> WorkerState {
        *self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn is_active(&self) -> bool {
        self.state() == WorkerState::Activated
    }

    fn set_state(&self, state: WorkerState) {
        let mut current = self.state.lock().unwrap_or_else(|e| e.into_inner());
        let previous = *current;
        tracing::debug!(worker = self.id.0, version = %self.config.version, from = ?previous, to = ?state, "worker state");
        *current = state;
    }

    /// Move from `expected` to `next`, failing if the worker is elsewhere.
    fn transition(&self, expected: WorkerState, next: WorkerState) -> Result<(), Error> {
        let mut current = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if *current != expected {
            return Err(Error::InvalidState(format!(
                "worker {} is {:?}, expected {:?}",
                self.id.0, *current, expected
            )));
        }
        tracing::debug!(worker = self.id.0, version = %self.config.version, from = ?expected, to = ?next, "worker state");
        *current = next;
        Ok(())
    }

    /// Install: pre-warm this version's cache generation with the core assets.
    ///
    /// Every asset must fetch with a 2xx status. On any failure nothing is
    /// written, the worker becomes redundant, and the error is returned.
    pub async fn install(&self) -> Result<(), Error> {
        self.transition(WorkerState::Parsed, WorkerState::Installing)?;

        match self.precache().await {
            Ok(cache) => {
                let strategies = Strategies::new(
                    self.ctx.fetcher.clone(),
                    self.ctx.store.clone(),
                    cache,
                    self.config.offline_url.clone(),
                    self.config.max_records,
                );
                // Installing is entered once per worker, so the cell is still empty.
                if self.strategies.set(strategies).is_err() {
                    self.set_state(WorkerState::Redundant);
                    return Err(Error::InvalidState(format!("worker {} already has strategies", self.id.0)));
                }
                self.transition(WorkerState::Installing, WorkerState::Installed)?;
                tracing::info!(version = %self.config.version, assets = self.config.core_assets.len(), "worker installed");
                Ok(())
            }
            Err(e) => {
                self.set_state(WorkerState::Redundant);
                tracing::warn!(version = %self.config.version, error = %e, "worker install failed");
                Err(e)
            }
        }
    }

    async fn precache(&self) -> Result<CacheHandle, Error> {
        let cache = self.ctx.caches.open(&self.config.version).await?;
        add_all(&cache, self.ctx.fetcher.as_ref(), &self.config.core_assets).await?;
        Ok(cache)
    }

    /// Activate: delete every cache generation other than this worker's.
    ///
    /// Returns the names of the deleted generations.
    pub async fn activate(&self) -> Result<Vec<String>, Error> {
        self.transition(WorkerState::Installed, WorkerState::Activating)?;

        let mut deleted = Vec::new();
        for name in self.ctx.caches.keys().await? {
            if name != self.config.version && self.ctx.caches.delete(&name).await? {
                deleted.push(name);
            }
        }

        self.transition(WorkerState::Activating, WorkerState::Activated)?;
        tracing::info!(version = %self.config.version, deleted = ?deleted, "worker activated");
        Ok(deleted)
    }

    /// Mark this worker as replaced.
    pub fn retire(&self) {
        self.set_state(WorkerState::Redundant);
    }

    /// Serve an intercepted request through the strategy the selector picks.
    pub async fn handle_fetch(&self, request: &Request) -> Result<(Strategy, Response), Error> {
        let strategies = match (self.state(), self.strategies.get()) {
            (WorkerState::Activated, Some(strategies)) => strategies,
            (state, _) => {
                return Err(Error::InvalidState(format!("worker {} cannot serve while {:?}", self.id.0, state)));
            }
        };

        let strategy = select(request, &self.config.api_origin);
        tracing::debug!(url = %request.url, mode = request.mode.as_str(), strategy = strategy.as_str(), "intercepted");
        let response = strategies.handle(strategy, request).await?;
        Ok((strategy, response))
    }
}

/// Fetch every URL and store all responses in `cache`, or none of them.
pub async fn add_all(cache: &CacheHandle, fetcher: &dyn Fetcher, urls: &[url::Url]) -> Result<(), Error> {
    let mut entries = Vec::with_capacity(urls.len());
    for url in urls {
        let request = Request::get(url.as_str())?;
        let response = fetcher
            .fetch(&request)
            .await
            .map_err(|e| Error::PrewarmFailed { url: url.to_string(), reason: e.to_string() })?;
        if !response.ok() {
            return Err(Error::PrewarmFailed { url: url.to_string(), reason: format!("status {}", response.status) });
        }
        entries.push((request, response));
    }
    cache.put_all(entries).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::StubFetcher;
    use moviemaster_core::{AppConfig, CacheStorage, Db, ResponseStore};

    const ASSETS: [&str; 4] = [
        "http://localhost:3000/",
        "http://localhost:3000/imdb-logo.svg",
        "http://localhost:3000/rotten-tomatoes-logo.svg",
        "http://localhost:3000/offline",
    ];

    fn all_assets() -> StubFetcher {
        ASSETS
            .iter()
            .fold(StubFetcher::new(), |stub, url| stub.route(url, Response::new(200, vec![], format!("asset {url}"))))
    }

    async fn context(fetcher: Arc<StubFetcher>) -> WorkerContext {
        let db = Db::open_in_memory().await.unwrap();
        WorkerContext::new(fetcher, ResponseStore::new(db.clone()), CacheStorage::new(db))
    }

    fn config(version: &str) -> WorkerConfig {
        WorkerConfig::from_app_config(&AppConfig::default())
            .unwrap()
            .with_version(version)
    }

    #[tokio::test]
    async fn test_install_prewarms_generation() {
        let ctx = context(Arc::new(all_assets())).await;
        let worker = ServiceWorker::new(ctx.clone(), config("v1"));

        worker.install().await.unwrap();

        assert_eq!(worker.state(), WorkerState::Installed);
        let cache = ctx.caches.open("v1").await.unwrap();
        assert_eq!(cache.keys().await.unwrap().len(), ASSETS.len());
    }

    #[tokio::test]
    async fn test_install_failure_writes_nothing_and_retry_succeeds() {
        let fetcher = Arc::new(all_assets());
        fetcher.remove_route("http://localhost:3000/offline");
        let ctx = context(fetcher.clone()).await;

        let first = ServiceWorker::new(ctx.clone(), config("v1"));
        let err = first.install().await.unwrap_err();
        assert!(matches!(err, Error::PrewarmFailed { ref url, .. } if url == "http://localhost:3000/offline"));
        assert_eq!(first.state(), WorkerState::Redundant);
        assert!(ctx.caches.open("v1").await.unwrap().keys().await.unwrap().is_empty());

        fetcher.set_route("http://localhost:3000/offline", Response::new(200, vec![], "offline"));
        let retry = ServiceWorker::new(ctx.clone(), config("v1"));
        retry.install().await.unwrap();
        assert_eq!(retry.state(), WorkerState::Installed);
        assert_eq!(ctx.caches.open("v1").await.unwrap().keys().await.unwrap().len(), ASSETS.len());
    }

    #[tokio::test]
    async fn test_install_rejects_error_status() {
        let fetcher = Arc::new(all_assets());
        fetcher.set_route("http://localhost:3000/imdb-logo.svg", Response::new(404, vec![], "missing"));
        let worker = ServiceWorker::new(context(fetcher).await, config("v1"));

        let err = worker.install().await.unwrap_err();

        assert!(matches!(err, Error::PrewarmFailed { ref reason, .. } if reason == "status 404"));
    }

    #[tokio::test]
    async fn test_install_twice_is_invalid() {
        let worker = ServiceWorker::new(context(Arc::new(all_assets())).await, config("v1"));
        worker.install().await.unwrap();
        assert!(matches!(worker.install().await, Err(Error::InvalidState(_))));
    }

    #[tokio::test]
    async fn test_debug_shows_version_and_state() {
        let worker = ServiceWorker::new(context(Arc::new(all_assets())).await, config("v7"));
        let debug = format!("{worker:?}");
        assert!(debug.contains("\"v7\""));
        assert!(debug.contains("Parsed"));
    }

    #[tokio::test]
    async fn test_activate_deletes_stale_generations() {
        let ctx = context(Arc::new(all_assets())).await;
        ctx.caches.open("v1").await.unwrap();
        let worker = ServiceWorker::new(ctx.clone(), config("v2"));
        worker.install().await.unwrap();

        let deleted = worker.activate().await.unwrap();

        assert_eq!(deleted, vec!["v1".to_string()]);
        assert_eq!(ctx.caches.keys().await.unwrap(), vec!["v2".to_string()]);
        assert!(worker.is_active());
    }

    #[tokio::test]
    async fn test_activate_requires_install() {
        let worker = ServiceWorker::new(context(Arc::new(all_assets())).await, config("v1"));
        assert!(matches!(worker.activate().await, Err(Error::InvalidState(_))));
    }

    #[tokio::test]
    async fn test_handle_fetch_requires_activation() {
        let worker = ServiceWorker::new(context(Arc::new(all_assets())).await, config("v1"));
        worker.install().await.unwrap();

        let result = worker.handle_fetch(&Request::navigate("http://localhost:3000/").unwrap()).await;
        assert!(matches!(result, Err(Error::InvalidState(_))));
    }

    #[tokio::test]
    async fn test_activated_worker_serves_shell_offline() {
        let fetcher = Arc::new(all_assets());
        let worker = ServiceWorker::new(context(fetcher.clone()).await, config("v1"));
        worker.install().await.unwrap();
        worker.activate().await.unwrap();
        fetcher.set_offline(true);

        let (strategy, resp) = worker
            .handle_fetch(&Request::navigate("http://localhost:3000/").unwrap())
            .await
            .unwrap();

        assert_eq!(strategy, Strategy::CacheFirst);
        assert_eq!(resp.text(), "asset http://localhost:3000/");
    }

    #[tokio::test]
    async fn test_retired_worker_stops_serving() {
        let worker = ServiceWorker::new(context(Arc::new(all_assets())).await, config("v1"));
        worker.install().await.unwrap();
        worker.activate().await.unwrap();

        worker.retire();

        assert_eq!(worker.state(), WorkerState::Redundant);
        let result = worker.handle_fetch(&Request::get("http://localhost:3000/").unwrap()).await;
        assert!(result.is_err());
    }
}
