//! Caching strategies.
//!
//! Writes to the response store and the cache run as spawned tasks that the
//! strategy then awaits. If the page abandons the request, the interception
//! future is dropped but the write still runs to completion.

use std::future::Future;
use std::sync::Arc;

use moviemaster_core::{CacheHandle, Error, Request, Response, ResponseStore};
use url::Url;

use super::selector::Strategy;
use crate::fetch::Fetcher;

/// The strategies of one worker version, bound to its cache generation.
#[derive(Clone)]
pub struct Strategies {
    fetcher: Arc<dyn Fetcher>,
    store: ResponseStore,
    cache: CacheHandle,
    offline_url: Url,
    max_records: Option<usize>,
}

impl Strategies {
    pub fn new(
        fetcher: Arc<dyn Fetcher>, store: ResponseStore, cache: CacheHandle, offline_url: Url,
        max_records: Option<usize>,
    ) -> Self {
        Self { fetcher, store, cache, offline_url, max_records }
    }

    pub fn cache(&self) -> &CacheHandle {
        &self.cache
    }

    /// Run `strategy` for `request`.
    pub async fn handle(&self, strategy: Strategy, request: &Request) -> Result<Response, Error> {
        match strategy {
            Strategy::NetworkFirst => Ok(self.network_first(request).await),
            Strategy::CacheFirst => self.cache_first(request).await,
            Strategy::Dynamic => self.dynamic(request).await,
        }
    }

    /// Movie API requests.
    ///
    /// A 2xx JSON response is remembered in the response store and returned
    /// re-wrapped as `200 application/json`. Any failure falls back to the
    /// stored payload, then to an empty list. Never returns an error status.
    pub async fn network_first(&self, request: &Request) -> Response {
        let url = request.url.to_string();

        match self.fetch_json(request).await {
            Ok(value) => {
                let store = self.store.clone();
                let key = url.clone();
                let stored = value.clone();
                let max_records = self.max_records;
                complete_detached("response store write", async move {
                    store.put(&key, &stored).await?;
                    if let Some(max) = max_records {
                        let purged = store.purge_lru(max).await?;
                        if purged > 0 {
                            tracing::debug!(purged, max, "trimmed response store");
                        }
                    }
                    Ok(())
                })
                .await;

                Response::json(&value).with_url(url)
            }
            Err(e) => {
                tracing::warn!(url = %url, error = %e, "API request failed, falling back to stored response");
                match self.store.get(&url).await {
                    Some(value) => {
                        tracing::debug!(url = %url, "serving stored API response");
                        Response::json(&value).with_url(url)
                    }
                    None => {
                        tracing::debug!(url = %url, "nothing stored, serving empty list");
                        Response::empty_list().with_url(url)
                    }
                }
            }
        }
    }

    /// Fetch `request` and parse a 2xx body as JSON.
    async fn fetch_json(&self, request: &Request) -> Result<serde_json::Value, Error> {
        let response = self.fetcher.fetch(request).await?;
        if !response.ok() {
            return Err(Error::HttpError(format!("status {}", response.status)));
        }
        response.json_body()
    }

    /// Document navigations.
    ///
    /// A hit in this worker's generation is returned without touching the
    /// network. A miss is fetched and a copy of any 2xx response is cached.
    /// If the network fails, the offline page is served instead.
    pub async fn cache_first(&self, request: &Request) -> Result<Response, Error> {
        if let Some(hit) = self.lookup(request).await {
            tracing::debug!(url = %request.url, "cache hit");
            return Ok(hit);
        }

        match self.fetcher.fetch(request).await {
            Ok(response) => {
                self.remember(request, &response).await;
                Ok(response)
            }
            Err(e) if e.is_network() => {
                tracing::warn!(url = %request.url, error = %e, "navigation failed, serving offline page");
                let offline = Request::get(self.offline_url.as_str())?;
                self.lookup(&offline)
                    .await
                    .ok_or_else(|| Error::Offline(format!("{} (offline page not cached)", request.url)))
            }
            Err(e) => Err(e),
        }
    }

    /// Everything else: network first, cached copy when the network fails.
    ///
    /// When neither is available the network error propagates to the page.
    pub async fn dynamic(&self, request: &Request) -> Result<Response, Error> {
        match self.fetcher.fetch(request).await {
            Ok(response) => {
                self.remember(request, &response).await;
                Ok(response)
            }
            Err(e) => {
                if e.is_network()
                    && let Some(hit) = self.lookup(request).await
                {
                    tracing::debug!(url = %request.url, error = %e, "network failed, serving cached copy");
                    return Ok(hit);
                }
                Err(e)
            }
        }
    }

    /// Cache lookup that treats storage failures as a miss.
    async fn lookup(&self, request: &Request) -> Option<Response> {
        if !request.is_get() {
            return None;
        }
        match self.cache.match_request(request).await {
            Ok(hit) => hit,
            Err(e) => {
                tracing::warn!(url = %request.url, error = %e, "cache lookup failed");
                None
            }
        }
    }

    /// Store a copy of a 2xx GET response; the caller keeps the original.
    async fn remember(&self, request: &Request, response: &Response) {
        if !request.is_get() || !response.ok() {
            return;
        }
        let cache = self.cache.clone();
        let request = request.clone();
        let copy = response.clone();
        complete_detached("cache write", async move { cache.put(&request, &copy).await }).await;
    }
}

/// Run `task` on its own tokio task and wait for it, logging failures.
///
/// Dropping the caller does not cancel the task.
async fn complete_detached<F>(what: &'static str, task: F)
where
    F: Future<Output = Result<(), Error>> + Send + 'static,
{
    match tokio::spawn(task).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::warn!(error = %e, "{what} failed"),
        Err(e) => tracing::warn!(error = %e, "{what} task aborted"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::StubFetcher;
    use moviemaster_core::{CacheStorage, Db, RequestMode};
    use serde_json::json;
    use std::time::Duration;
    use tokio::sync::oneshot;

    const SEARCH: &str = "https://www.omdbapi.com/?s=Alien&page=1&apikey=k";
    const ROOT: &str = "http://localhost:3000/";
    const OFFLINE: &str = "http://localhost:3000/offline";
    const LOGO: &str = "http://localhost:3000/imdb-logo.svg";

    struct Fixture {
        fetcher: Arc<StubFetcher>,
        store: ResponseStore,
        strategies: Strategies,
    }

    async fn fixture(fetcher: StubFetcher) -> Fixture {
        fixture_with_limit(fetcher, None).await
    }

    async fn fixture_with_limit(fetcher: StubFetcher, max_records: Option<usize>) -> Fixture {
        let db = Db::open_in_memory().await.unwrap();
        let store = ResponseStore::new(db.clone());
        let cache = CacheStorage::new(db).open("MOVIE_MASTER_V1").await.unwrap();
        let fetcher = Arc::new(fetcher);
        let strategies = Strategies::new(
            fetcher.clone(),
            store.clone(),
            cache,
            Url::parse(OFFLINE).unwrap(),
            max_records,
        );
        Fixture { fetcher, store, strategies }
    }

    async fn eventually_stored(store: &ResponseStore, url: &str) -> Option<serde_json::Value> {
        for _ in 0..100 {
            if let Some(value) = store.get(url).await {
                return Some(value);
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        None
    }

    fn json_ok(value: serde_json::Value) -> Response {
        Response::new(200, vec![("content-type".into(), "application/json".into())], value.to_string())
    }

    fn html(body: &'static str) -> Response {
        Response::new(200, vec![("content-type".into(), "text/html".into())], body)
    }

    #[tokio::test]
    async fn test_network_first_stores_and_returns_json() {
        let payload = json!({"Search": [{"Title": "Alien", "imdbID": "tt0078748"}]});
        let fx = fixture(StubFetcher::new().route(SEARCH, json_ok(payload.clone()))).await;

        let resp = fx.strategies.network_first(&Request::get(SEARCH).unwrap()).await;

        assert_eq!(resp.status, 200);
        assert_eq!(resp.content_type(), Some("application/json"));
        assert_eq!(resp.json_body().unwrap(), payload);
        assert_eq!(fx.store.get(SEARCH).await, Some(payload));
    }

    #[tokio::test]
    async fn test_network_first_offline_serves_stored_value() {
        let fx = fixture(StubFetcher::new()).await;
        let stored = json!({"Title": "Alien", "Year": "1979"});
        fx.store.put(SEARCH, &stored).await.unwrap();
        fx.fetcher.set_offline(true);

        let resp = fx.strategies.network_first(&Request::get(SEARCH).unwrap()).await;

        assert_eq!(resp.status, 200);
        assert_eq!(resp.json_body().unwrap(), stored);
    }

    #[tokio::test]
    async fn test_network_first_offline_without_record_serves_empty_list() {
        let fx = fixture(StubFetcher::new()).await;
        fx.fetcher.set_offline(true);

        let resp = fx.strategies.network_first(&Request::get(SEARCH).unwrap()).await;

        assert_eq!(resp.status, 200);
        assert_eq!(resp.json_body().unwrap(), json!([]));
    }

    #[tokio::test]
    async fn test_network_first_stored_null_serves_empty_list() {
        let fx = fixture(StubFetcher::new()).await;
        fx.store.put(SEARCH, &serde_json::Value::Null).await.unwrap();
        fx.fetcher.set_offline(true);

        let resp = fx.strategies.network_first(&Request::get(SEARCH).unwrap()).await;

        assert_eq!(resp.json_body().unwrap(), json!([]));
    }

    #[tokio::test]
    async fn test_network_first_write_survives_dropped_request() {
        let payload = json!({"Search": [{"Title": "Alien"}]});
        let fx = fixture(StubFetcher::new().route(SEARCH, json_ok(payload.clone()))).await;
        let req = Request::get(SEARCH).unwrap();

        // The fetch resolves on the first poll; the page goes away while the write is pending.
        let _ = tokio::time::timeout(Duration::ZERO, fx.strategies.network_first(&req)).await;

        assert_eq!(eventually_stored(&fx.store, SEARCH).await, Some(payload));
    }

    #[tokio::test]
    async fn test_detached_write_outlives_caller() {
        let store = fixture(StubFetcher::new()).await.store;
        let (release, gate) = oneshot::channel::<()>();
        let writer = store.clone();
        let write = complete_detached("store write", async move {
            let _ = gate.await;
            writer.put(SEARCH, &json!({"Title": "Alien"})).await
        });

        assert!(tokio::time::timeout(Duration::from_millis(20), write).await.is_err());
        release.send(()).unwrap();

        assert_eq!(eventually_stored(&store, SEARCH).await, Some(json!({"Title": "Alien"})));
    }

    #[tokio::test]
    async fn test_network_first_error_status_falls_back() {
        let stored = json!({"Search": []});
        let fx = fixture(StubFetcher::new().route(SEARCH, Response::new(503, vec![], "down"))).await;
        fx.store.put(SEARCH, &stored).await.unwrap();

        let resp = fx.strategies.network_first(&Request::get(SEARCH).unwrap()).await;

        assert_eq!(resp.status, 200);
        assert_eq!(resp.json_body().unwrap(), stored);
        assert_eq!(fx.store.get(SEARCH).await, Some(stored));
    }

    #[tokio::test]
    async fn test_network_first_invalid_json_falls_back() {
        let fx = fixture(StubFetcher::new().route(SEARCH, html("<html>captive portal</html>"))).await;

        let resp = fx.strategies.network_first(&Request::get(SEARCH).unwrap()).await;

        assert_eq!(resp.status, 200);
        assert_eq!(resp.json_body().unwrap(), json!([]));
        assert!(fx.store.get(SEARCH).await.is_none());
    }

    #[tokio::test]
    async fn test_network_first_respects_record_limit() {
        let other = "https://www.omdbapi.com/?s=Heat&page=1&apikey=k";
        let fetcher = StubFetcher::new()
            .route(SEARCH, json_ok(json!({"n": 1})))
            .route(other, json_ok(json!({"n": 2})));
        let fx = fixture_with_limit(fetcher, Some(1)).await;

        fx.strategies.network_first(&Request::get(SEARCH).unwrap()).await;
        fx.strategies.network_first(&Request::get(other).unwrap()).await;

        assert_eq!(fx.store.count().await.unwrap(), 1);
        assert!(fx.store.get(other).await.is_some());
    }

    #[tokio::test]
    async fn test_cache_first_hit_skips_network() {
        let fx = fixture(StubFetcher::new().route(ROOT, html("<html>fresh</html>"))).await;
        let req = Request::navigate(ROOT).unwrap();
        fx.strategies.cache().put(&req, &html("<html>cached</html>")).await.unwrap();

        let resp = fx.strategies.cache_first(&req).await.unwrap();

        assert_eq!(resp.text(), "<html>cached</html>");
        assert_eq!(fx.fetcher.calls(), 0);
    }

    #[tokio::test]
    async fn test_cache_first_miss_fetches_and_caches() {
        let fx = fixture(StubFetcher::new().route(ROOT, html("<html>fresh</html>"))).await;
        let req = Request::navigate(ROOT).unwrap();

        let resp = fx.strategies.cache_first(&req).await.unwrap();
        assert_eq!(resp.text(), "<html>fresh</html>");

        let again = fx.strategies.cache_first(&req).await.unwrap();
        assert_eq!(again.text(), "<html>fresh</html>");
        assert_eq!(fx.fetcher.calls(), 1);
    }

    #[tokio::test]
    async fn test_cache_first_does_not_cache_error_pages() {
        let fx = fixture(StubFetcher::new().route(ROOT, Response::new(500, vec![], "boom"))).await;
        let req = Request::navigate(ROOT).unwrap();

        let resp = fx.strategies.cache_first(&req).await.unwrap();

        assert_eq!(resp.status, 500);
        assert!(fx.strategies.cache().match_request(&req).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_cache_first_offline_serves_fallback_page() {
        let fx = fixture(StubFetcher::new()).await;
        fx.strategies
            .cache()
            .put(&Request::get(OFFLINE).unwrap(), &html("<html>offline</html>"))
            .await
            .unwrap();
        fx.fetcher.set_offline(true);

        let resp = fx
            .strategies
            .cache_first(&Request::navigate("http://localhost:3000/movies/tt0078748").unwrap())
            .await
            .unwrap();

        assert_eq!(resp.text(), "<html>offline</html>");
    }

    #[tokio::test]
    async fn test_cache_first_offline_without_fallback_errors() {
        let fx = fixture(StubFetcher::new()).await;
        fx.fetcher.set_offline(true);

        let result = fx.strategies.cache_first(&Request::navigate(ROOT).unwrap()).await;

        assert!(matches!(result, Err(Error::Offline(_))));
    }

    #[tokio::test]
    async fn test_dynamic_caches_successful_responses() {
        let fx = fixture(StubFetcher::new().route(LOGO, Response::new(200, vec![], "<svg/>"))).await;
        let req = Request::new("GET", LOGO, RequestMode::NoCors).unwrap();

        let resp = fx.strategies.dynamic(&req).await.unwrap();
        assert_eq!(resp.text(), "<svg/>");

        fx.fetcher.set_offline(true);
        let cached = fx.strategies.dynamic(&req).await.unwrap();
        assert_eq!(cached.text(), "<svg/>");
        assert_eq!(fx.fetcher.calls(), 2);
    }

    #[tokio::test]
    async fn test_dynamic_prefers_network_over_cache() {
        let fx = fixture(StubFetcher::new().route(LOGO, Response::new(200, vec![], "new"))).await;
        let req = Request::get(LOGO).unwrap();
        fx.strategies
            .cache()
            .put(&req, &Response::new(200, vec![], "old"))
            .await
            .unwrap();

        let resp = fx.strategies.dynamic(&req).await.unwrap();

        assert_eq!(resp.text(), "new");
        assert_eq!(fx.strategies.cache().match_request(&req).await.unwrap().unwrap().text(), "new");
    }

    #[tokio::test]
    async fn test_dynamic_failure_propagates_without_cache() {
        let fx = fixture(StubFetcher::new()).await;
        fx.fetcher.set_offline(true);

        let result = fx.strategies.dynamic(&Request::get(LOGO).unwrap()).await;

        assert!(matches!(result, Err(Error::Network(_))));
    }

    #[tokio::test]
    async fn test_dynamic_does_not_cache_non_get() {
        let url = "http://localhost:3000/api/score";
        let fx = fixture(StubFetcher::new().route(url, Response::new(200, vec![], "ok"))).await;
        let req = Request::new("POST", url, RequestMode::SameOrigin).unwrap();

        fx.strategies.dynamic(&req).await.unwrap();

        assert!(fx.strategies.cache().keys().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_handle_dispatches() {
        let fx = fixture(StubFetcher::new()).await;
        fx.fetcher.set_offline(true);

        let api = fx
            .strategies
            .handle(Strategy::NetworkFirst, &Request::get(SEARCH).unwrap())
            .await
            .unwrap();
        assert_eq!(api.text(), "[]");

        let asset = fx.strategies.handle(Strategy::Dynamic, &Request::get(LOGO).unwrap()).await;
        assert!(asset.is_err());
    }
}
