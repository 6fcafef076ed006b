//! sw_status tool implementation.

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use swcache_client::ServiceWorker;
use swcache_core::{CacheStore, Error};

/// Output structure for sw_status tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwStatusOutput {
    pub version: String,
    /// "installing", "installed", "activating" or "active".
    pub phase: String,
    /// Generation names that belong to this version.
    pub live: Vec<String>,
    /// Every generation currently present in the store.
    pub generations: Vec<String>,
    /// Registered consumers.
    pub clients: usize,
    pub background_in_flight: usize,
    pub background_failures: u64,
}

/// Implementation of the sw_status tool.
pub async fn status_impl(worker: &ServiceWorker, store: &dyn CacheStore) -> Result<CallToolResult, McpError> {
    let generations = store.list_names().await?;
    let live = worker.generations().live_set();

    let output = SwStatusOutput {
        version: worker.lifecycle().version().to_string(),
        phase: worker.lifecycle().phase().as_str().to_string(),
        live: live.names().map(String::from).collect(),
        generations,
        clients: worker.clients().len(),
        background_in_flight: worker.tasks().in_flight(),
        background_failures: worker.tasks().failures(),
    };

    let json = serde_json::to_string_pretty(&output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize output: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}
