//! store_get tool implementation.
//!
//! Retrieves the stored API payload for a URL.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use moviemaster_core::Error;

use crate::state::AppState;
use crate::tools::json_result;

/// Parameters for the store_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct StoreGetParams {
    /// Full API request URL, query string included.
    pub url: String,
}

/// Implementation of the store_get tool.
pub async fn get_impl(state: &AppState, params: StoreGetParams) -> Result<CallToolResult, McpError> {
    let record = state
        .store
        .get_record(&params.url)
        .await?
        .ok_or_else(|| Error::CacheMiss(params.url.clone()))?;

    json_result(&record)
}
