//! In-process [`Fetcher`] for tests.
//!
//! Routes are keyed by absolute URL. Unknown URLs and every URL while the
//! stub is offline fail with `NETWORK_ERROR`, like a request that never
//! reached a server.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use moviemaster_core::{Error, Request, Response};

use crate::fetch::Fetcher;

/// Stub network with a fixed route table and a call counter.
#[derive(Debug, Default)]
pub struct StubFetcher {
    routes: Mutex<HashMap<String, Response>>,
    offline: AtomicBool,
    calls: AtomicUsize,
}

impl StubFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `response` for `url`.
    pub fn route(self, url: &str, response: Response) -> Self {
        self.set_route(url, response);
        self
    }

    pub fn set_route(&self, url: &str, response: Response) {
        let mut routes = self.routes.lock().unwrap_or_else(|e| e.into_inner());
        routes.insert(url.to_string(), response);
    }

    pub fn remove_route(&self, url: &str) {
        let mut routes = self.routes.lock().unwrap_or_else(|e| e.into_inner());
        routes.remove(url);
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Number of fetches attempted so far, failed ones included.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Fetcher for StubFetcher {
    async fn fetch(&self, request: &Request) -> Result<Response, Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if self.offline.load(Ordering::SeqCst) {
            return Err(Error::Network(format!("offline: {}", request.url)));
        }

        let routes = self.routes.lock().unwrap_or_else(|e| e.into_inner());
        routes
            .get(request.url.as_str())
            .cloned()
            .map(|resp| resp.with_url(request.url.as_str()))
            .ok_or_else(|| Error::Network(format!("connection refused: {}", request.url)))
    }
}
