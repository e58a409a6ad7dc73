//! Request and response values passed between the page, the worker and the caches.
//!
//! Bodies are held in [`Bytes`], so cloning a [`Response`] yields an independent,
//! fully readable copy that shares the underlying buffer.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::Error;

/// How the page issued the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum RequestMode {
    /// Top-level document navigation.
    Navigate,
    SameOrigin,
    NoCors,
    #[default]
    Cors,
}

impl RequestMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestMode::Navigate => "navigate",
            RequestMode::SameOrigin => "same-origin",
            RequestMode::NoCors => "no-cors",
            RequestMode::Cors => "cors",
        }
    }
}

/// An intercepted outgoing request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: String,
    pub url: Url,
    pub mode: RequestMode,
}

impl Request {
    /// Build a request from a raw URL string.
    ///
    /// The method is upper-cased and the fragment is dropped, so two requests
    /// for the same resource always share one identity.
    pub fn new(method: &str, url: &str, mode: RequestMode) -> Result<Self, Error> {
        let trimmed = url.trim();
        if trimmed.is_empty() {
            return Err(Error::InvalidUrl("empty URL".into()));
        }

        let mut url = Url::parse(trimmed).map_err(|e| Error::InvalidUrl(e.to_string()))?;
        match url.scheme() {
            "http" | "https" => {}
            scheme => return Err(Error::InvalidUrl(format!("unsupported scheme: {scheme}"))),
        }
        url.set_fragment(None);

        let method = if method.trim().is_empty() { "GET".to_string() } else { method.trim().to_uppercase() };

        Ok(Self { method, url, mode })
    }

    /// Plain `GET` request with `cors` mode.
    pub fn get(url: &str) -> Result<Self, Error> {
        Self::new("GET", url, RequestMode::Cors)
    }

    /// `GET` request for a document navigation.
    pub fn navigate(url: &str) -> Result<Self, Error> {
        Self::new("GET", url, RequestMode::Navigate)
    }

    pub fn is_get(&self) -> bool {
        self.method == "GET"
    }
}

/// A response, either fresh from the network, replayed from a cache, or synthesized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
    /// URL the response was produced for, when known.
    pub url: Option<String>,
}

impl Response {
    pub fn new(status: u16, headers: Vec<(String, String)>, body: impl Into<Bytes>) -> Self {
        Self { status, headers, body: body.into(), url: None }
    }

    /// A `200` response carrying `value` serialized as JSON.
    pub fn json(value: &serde_json::Value) -> Self {
        Self::new(
            200,
            vec![("content-type".to_string(), "application/json".to_string())],
            value.to_string(),
        )
    }

    /// The response served when the API fails and nothing is stored.
    pub fn empty_list() -> Self {
        Self::json(&serde_json::Value::Array(Vec::new()))
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Status is in the 2xx range.
    pub fn ok(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }

    /// Parse the body as JSON.
    pub fn json_body(&self) -> Result<serde_json::Value, Error> {
        serde_json::from_slice(&self.body).map_err(Error::from)
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}
