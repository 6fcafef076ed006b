//! MCP server handler implementation.
//!
//! This module defines the main server handler that
//! routes tool calls to the appropriate implementations.
use std::sync::Arc;

use crate::tools::{
    SwClientsParams, SwFetchParams,
    cache::{CacheListParams, list_impl},
    sw_clients::clients_impl,
    sw_fetch::fetch_impl,
    sw_status::status_impl,
};

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
use swcache_client::ServiceWorker;
use swcache_core::CacheStore;

/// The main MCP server handler for swcache.
#[derive(Clone)]
pub struct SwCacheServer {
    tool_router: ToolRouter<Self>,
    worker: Arc<ServiceWorker>,
    store: Arc<dyn CacheStore>,
}

/// Tool router implementation using the #[tool_router] macro.
///
/// This macro generates the routing logic that maps tool names to handler methods.
#[tool_router]
impl SwCacheServer {
    /// Create a new server handler around an installed worker.
    pub fn new(worker: Arc<ServiceWorker>, store: Arc<dyn CacheStore>) -> Self {
        Self { tool_router: Self::tool_router(), worker, store }
    }

    /// Route a request through the worker.
    #[tool(
        description = "Fetch a URL or path through the caching worker. Reports status, body, and the response source."
    )]
    async fn sw_fetch(&self, params: Parameters<SwFetchParams>) -> Result<CallToolResult, McpError> {
        fetch_impl(&self.worker, params.0).await
    }

    #[tool(description = "Connect or disconnect a worker consumer and list consumers with their controlling version.")]
    async fn sw_clients(&self, params: Parameters<SwClientsParams>) -> Result<CallToolResult, McpError> {
        clients_impl(&self.worker, params.0)
    }

    #[tool(description = "Report the worker's version, lifecycle phase, live generations, and background task health.")]
    async fn sw_status(&self) -> Result<CallToolResult, McpError> {
        status_impl(&self.worker, self.store.as_ref()).await
    }

    #[tool(description = "List cache generations with entry counts, marking live and stale ones.")]
    async fn cache_list(&self, params: Parameters<CacheListParams>) -> Result<CallToolResult, McpError> {
        let live = self.worker.generations().live_set();
        list_impl(self.store.as_ref(), &live, params.0).await
    }
}

impl ServerHandler for SwCacheServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "swcache".into(),
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
