//! Shared state behind every tool call.

use std::sync::Arc;

use moviemaster_client::{Fetcher, Registration, WorkerContext};
use moviemaster_core::{AppConfig, CacheStorage, Db, ResponseStore};

/// Everything the tools need, built once at startup.
pub struct AppState {
    pub config: AppConfig,
    pub registration: Registration,
    pub store: ResponseStore,
    pub caches: CacheStorage,
}

impl AppState {
    pub fn new(config: AppConfig, db: Db, fetcher: Arc<dyn Fetcher>) -> Self {
        let store = ResponseStore::new(db.clone());
        let caches = CacheStorage::new(db);
        let ctx = WorkerContext::new(fetcher, store.clone(), caches.clone());
        Self { config, registration: Registration::new(ctx), store, caches }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use moviemaster_client::testing::StubFetcher;
    use moviemaster_core::Response;

    /// Stub network serving every default core asset.
    pub fn network() -> Arc<StubFetcher> {
        let config = AppConfig::default();
        let stub = config.core_assets.iter().fold(StubFetcher::new(), |stub, path| {
            let url = format!("{}{}", config.app_origin, path);
            stub.route(&url, Response::new(200, vec![("content-type".into(), "text/html".into())], path.clone()))
        });
        Arc::new(stub)
    }

    pub async fn state(fetcher: Arc<StubFetcher>) -> Arc<AppState> {
        let db = Db::open_in_memory().await.unwrap();
        Arc::new(AppState::new(AppConfig::default(), db, fetcher))
    }
}
