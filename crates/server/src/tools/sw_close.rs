//! sw_close tool implementation.
//!
//! Forgets a page the host has closed, so it is no longer claimed or counted.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::json_result;
use crate::state::AppState;

/// Parameters for the sw_close tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwCloseParams {
    /// Page identifier previously passed to sw_fetch.
    pub client_id: String,
}

/// Output from the sw_close tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwCloseOutput {
    /// Whether the page was known.
    pub closed: bool,
    /// Pages still open.
    pub clients: usize,
}

/// Implementation of the sw_close tool.
pub async fn close_impl(state: &AppState, params: SwCloseParams) -> Result<CallToolResult, McpError> {
    let clients = state.registration.clients();
    let closed = clients.close(&params.client_id);
    tracing::debug!(client = %params.client_id, closed, "page closed");

    json_result(&SwCloseOutput { closed, clients: clients.len() })
}
