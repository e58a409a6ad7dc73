//! Picks the caching strategy for an intercepted request.

use moviemaster_core::{Request, RequestMode};
use serde::Serialize;
use url::Origin;

/// The three request classes, in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Movie API calls: network, then the response store, then `[]`.
    NetworkFirst,
    /// Document navigations: cache, then network, then the offline page.
    CacheFirst,
    /// Everything else: network, then cache.
    Dynamic,
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::NetworkFirst => "network_first",
            Strategy::CacheFirst => "cache_first",
            Strategy::Dynamic => "dynamic",
        }
    }
}

/// First matching rule wins: API origin, then navigation mode, then the rest.
pub fn select(request: &Request, api_origin: &Origin) -> Strategy {
    if &request.url.origin() == api_origin {
        Strategy::NetworkFirst
    } else if request.mode == RequestMode::Navigate {
        Strategy::CacheFirst
    } else {
        Strategy::Dynamic
    }
}
