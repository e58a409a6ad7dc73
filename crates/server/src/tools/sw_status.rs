//! sw_status and sw_update tool implementations.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use moviemaster_client::{RegistrationStatus, WorkerConfig};

use super::json_result;
use crate::state::AppState;

/// Parameters for the sw_status tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct SwStatusParams {}

/// Parameters for the sw_update tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct SwUpdateParams {
    /// Cache version to install instead of the configured one.
    #[serde(default)]
    pub version: Option<String>,
}

/// Output shared by sw_status and sw_update.
#[derive(Debug, Clone, Serialize)]
pub struct SwStatusOutput {
    #[serde(flatten)]
    pub registration: RegistrationStatus,
    /// Cache generations on disk, oldest first.
    pub generations: Vec<String>,
    /// Records in the response store.
    pub stored_records: u64,
}

async fn snapshot(state: &AppState) -> Result<SwStatusOutput, McpError> {
    Ok(SwStatusOutput {
        registration: state.registration.status().await,
        generations: state.caches.keys().await?,
        stored_records: state.store.count().await?,
    })
}

/// Implementation of the sw_status tool.
pub async fn status_impl(state: &AppState, _params: SwStatusParams) -> Result<CallToolResult, McpError> {
    json_result(&snapshot(state).await?)
}

/// Implementation of the sw_update tool.
///
/// Installs a worker for the configured cache version (or `params.version`),
/// activates it and hands it every open page. If pre-warming fails the
/// current worker keeps serving and the error is returned.
pub async fn update_impl(state: &AppState, params: SwUpdateParams) -> Result<CallToolResult, McpError> {
    let mut config = WorkerConfig::from_app_config(&state.config)?;
    if let Some(version) = params.version {
        config = config.with_version(version);
    }

    let worker = state.registration.update(config).await?;
    tracing::info!(version = worker.version(), "sw_update installed worker");

    json_result(&snapshot(state).await?)
}
