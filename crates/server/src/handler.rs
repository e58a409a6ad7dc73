//! MCP server handler implementation.
//!
//! This module defines the main server handler that
//! routes tool calls to the appropriate implementations.
use std::sync::Arc;

use crate::state::AppState;
use crate::tools::store::{StoreGetParams, StorePurgeParams, get_impl, purge_impl};
use crate::tools::sw_close::{SwCloseParams, close_impl};
use crate::tools::sw_fetch::{SwFetchParams, fetch_impl};
use crate::tools::sw_status::{SwStatusParams, SwUpdateParams, status_impl, update_impl};

use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{
        tool::{ToolCallContext, ToolRouter},
        wrapper::Parameters,
    },
    model::{
        CallToolRequestParam, CallToolResult, Implementation, ListToolsResult, PaginatedRequestParam, ProtocolVersion,
        ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
    tool, tool_router,
};

/// The main MCP server handler for the Movie Master worker host.
#[derive(Clone)]
pub struct MovieMasterServer {
    tool_router: ToolRouter<Self>,
    state: Arc<AppState>,
}

/// Tool router implementation using the #[tool_router] macro.
///
/// This macro generates the routing logic that maps tool names to handler methods.
#[tool_router]
impl MovieMasterServer {
    /// Create a new server handler over shared state.
    pub fn new(state: Arc<AppState>) -> Self {
        Self { tool_router: Self::tool_router(), state }
    }

    /// Route a page request through the active worker.
    #[tool(
        description = "Intercept a page request. API calls are network-first with a stored fallback, navigations are cache-first with an offline page, everything else is network-then-cache."
    )]
    async fn sw_fetch(&self, params: Parameters<SwFetchParams>) -> Result<CallToolResult, McpError> {
        fetch_impl(&self.state, params.0).await
    }

    #[tool(description = "Forget a page the host has closed so it is no longer claimed or counted.")]
    async fn sw_close(&self, params: Parameters<SwCloseParams>) -> Result<CallToolResult, McpError> {
        close_impl(&self.state, params.0).await
    }

    #[tool(description = "Report the active worker version and state, open pages, cache generations and stored record count.")]
    async fn sw_status(&self, params: Parameters<SwStatusParams>) -> Result<CallToolResult, McpError> {
        status_impl(&self.state, params.0).await
    }

    /// Install and activate a worker.
    ///
    /// Pre-warms the core assets into a fresh cache generation; on success the old
    /// generations are deleted and every open page is claimed.
    #[tool(
        description = "Install and activate a worker for the configured cache version (or an override). The previous worker keeps serving if pre-warming fails."
    )]
    async fn sw_update(&self, params: Parameters<SwUpdateParams>) -> Result<CallToolResult, McpError> {
        update_impl(&self.state, params.0).await
    }

    #[tool(description = "Get the stored API payload for a request URL.")]
    async fn store_get(&self, params: Parameters<StoreGetParams>) -> Result<CallToolResult, McpError> {
        get_impl(&self.state, params.0).await
    }

    #[tool(description = "Purge stored API payloads older than N days and/or beyond the newest N records.")]
    async fn store_purge(&self, params: Parameters<StorePurgeParams>) -> Result<CallToolResult, McpError> {
        purge_impl(&self.state, params.0).await
    }
}

impl ServerHandler for MovieMasterServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "moviemaster-sw".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self, _request: Option<PaginatedRequestParam>, _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, rmcp::model::ErrorData> {
        Ok(ListToolsResult { meta: None, tools: self.tool_router.list_all(), next_cursor: None })
    }

    async fn call_tool(
        &self, request: CallToolRequestParam, context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, rmcp::model::ErrorData> {
        self.tool_router
            .call(ToolCallContext::new(self, request, context))
            .await
    }
}
