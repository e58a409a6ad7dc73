//! sw_fetch tool implementation.
//!
//! Routes one page request through the registration, exactly as an
//! intercepted browser fetch would be.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use moviemaster_core::{Request, RequestMode};

use super::json_result;
use crate::state::AppState;

/// Parameters for the sw_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwFetchParams {
    /// Absolute http(s) URL the page requested.
    pub url: String,

    /// HTTP method (default: GET).
    #[serde(default = "default_method")]
    pub method: String,

    /// Request mode; `navigate` for top-level page loads (default: cors).
    #[serde(default)]
    pub mode: RequestMode,

    /// Page issuing the request. Pages are claimed by each newly activated worker.
    #[serde(default)]
    pub client_id: Option<String>,
}

fn default_method() -> String {
    "GET".to_string()
}

/// How `SwFetchOutput::body` is encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum BodyEncoding {
    /// The body bytes are valid UTF-8 and passed through as text.
    Utf8,
    /// Standard base64 of the raw bytes (images, other binary payloads).
    Base64,
}

/// Encode `bytes` without loss: text when it is UTF-8, base64 otherwise.
fn encode_body(bytes: &[u8]) -> (String, BodyEncoding) {
    match std::str::from_utf8(bytes) {
        Ok(text) => (text.to_string(), BodyEncoding::Utf8),
        Err(_) => (STANDARD.encode(bytes), BodyEncoding::Base64),
    }
}

/// Output from the sw_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwFetchOutput {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
    pub body_encoding: BodyEncoding,
    /// URL the response came from, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Strategy that produced the response; absent for uncontrolled pages.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strategy: Option<String>,
}

/// Implementation of the sw_fetch tool.
pub async fn fetch_impl(state: &AppState, params: SwFetchParams) -> Result<CallToolResult, McpError> {
    let request = Request::new(&params.method, &params.url, params.mode)?;
    let (strategy, response) = state
        .registration
        .handle_fetch(params.client_id.as_deref(), &request)
        .await?;

    tracing::debug!(
        url = %request.url,
        status = response.status,
        strategy = strategy.map(|s| s.as_str()),
        "sw_fetch"
    );

    let (body, body_encoding) = encode_body(&response.body);
    let output = SwFetchOutput {
        status: response.status,
        body,
        body_encoding,
        headers: response.headers,
        url: response.url,
        strategy: strategy.map(|s| s.as_str().to_string()),
    };
    json_result(&output)
}
