//! store_purge tool implementation.
//!
//! Purges stored API payloads by age or count.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::ToolError;
use crate::state::AppState;
use crate::tools::json_result;

/// Parameters for the store_purge tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct StorePurgeParams {
    /// Purge records stored more than this many days ago.
    pub older_than_days: Option<i64>,

    /// Keep only the newest N records.
    pub max_records: Option<usize>,
}

/// Output from the store_purge tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct StorePurgeOutput {
    /// Number of records deleted.
    pub deleted: u64,
}

/// Implementation of the store_purge tool.
pub async fn purge_impl(state: &AppState, params: StorePurgeParams) -> Result<CallToolResult, McpError> {
    if params.older_than_days.is_none() && params.max_records.is_none() {
        return Err(
            ToolError::InvalidInput("At least one of older_than_days or max_records must be specified".into()).into(),
        );
    }
    if let Some(days) = params.older_than_days
        && days < 0
    {
        return Err(ToolError::InvalidInput(format!("older_than_days must not be negative, got {days}")).into());
    }

    let mut deleted = 0u64;

    if let Some(days) = params.older_than_days {
        deleted += state.store.purge_older_than(days).await?;
    }

    if let Some(max_records) = params.max_records {
        deleted += state.store.purge_lru(max_records).await?;
    }

    tracing::info!(deleted, "purged response store");
    json_result(&StorePurgeOutput { deleted })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::test_support::{network, state};
    use crate::tools::result_json;
    use serde_json::json;

    async fn seeded(count: usize) -> std::sync::Arc<AppState> {
        let state = state(network()).await;
        for page in 1..=count {
            let url = format!("https://www.omdbapi.com/?s=Alien&page={page}");
            state.store.put(&url, &json!({"page": page})).await.unwrap();
        }
        state
    }

    #[tokio::test]
    async fn test_purge_requires_a_bound() {
        let state = seeded(1).await;
        let err = purge_impl(&state, StorePurgeParams::default()).await.unwrap_err();
        assert_eq!(err.code.0, -32602);
    }

    #[tokio::test]
    async fn test_purge_rejects_negative_age() {
        let state = seeded(1).await;
        let params = StorePurgeParams { older_than_days: Some(-1), max_records: None };
        assert!(purge_impl(&state, params).await.is_err());
    }

    #[tokio::test]
    async fn test_purge_lru() {
        let state = seeded(5).await;
        let params = StorePurgeParams { older_than_days: None, max_records: Some(2) };

        let result = purge_impl(&state, params).await.unwrap();
        let output: StorePurgeOutput = serde_json::from_value(result_json(&result)).unwrap();

        assert_eq!(output.deleted, 3);
        assert_eq!(state.store.count().await.unwrap(), 2);
        assert!(state.store.get("https://www.omdbapi.com/?s=Alien&page=5").await.is_some());
        assert!(state.store.get("https://www.omdbapi.com/?s=Alien&page=1").await.is_none());
    }

    #[tokio::test]
    async fn test_purge_by_age_keeps_fresh_records() {
        let state = seeded(3).await;
        let params = StorePurgeParams { older_than_days: Some(30), max_records: None };

        let result = purge_impl(&state, params).await.unwrap();
        let output: StorePurgeOutput = serde_json::from_value(result_json(&result)).unwrap();

        assert_eq!(output.deleted, 0);
        assert_eq!(state.store.count().await.unwrap(), 3);
    }
}
