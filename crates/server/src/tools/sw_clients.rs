//! sw_clients tool implementation.
//!
//! Registers or removes consumers of the worker and lists who controls them.

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use swcache_client::ServiceWorker;
use swcache_core::Error;

/// Parameters for the sw_clients tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct SwClientsParams {
    /// Register a consumer with this id.
    #[serde(default)]
    pub connect: Option<String>,

    /// Version already controlling the connecting consumer, if any.
    #[serde(default)]
    pub controller: Option<String>,

    /// Remove the consumer with this id.
    #[serde(default)]
    pub disconnect: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ClientEntry {
    pub id: String,
    pub controller: Option<String>,
}

/// Output from the sw_clients tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwClientsOutput {
    pub clients: Vec<ClientEntry>,
}

/// Implementation of the sw_clients tool.
///
/// A consumer connecting after activation is claimed right away when the
/// worker is configured to claim clients.
pub fn clients_impl(worker: &ServiceWorker, params: SwClientsParams) -> Result<CallToolResult, McpError> {
    if let Some(id) = &params.connect {
        if id.trim().is_empty() {
            return Err(Error::InvalidInput("connect id cannot be empty".into()).into());
        }
        let active = worker.lifecycle().is_active();
        let controller = match &params.controller {
            Some(version) => Some(version.as_str()),
            None if active && worker.lifecycle().claims_clients() => Some(worker.lifecycle().version()),
            None => None,
        };
        worker.clients().connect(id, controller);
    }
    if let Some(id) = &params.disconnect {
        worker.clients().disconnect(id);
    }

    let clients = worker
        .clients()
        .list()
        .into_iter()
        .map(|(id, controller)| ClientEntry { id, controller })
        .collect();

    let json = serde_json::to_string_pretty(&SwClientsOutput { clients })
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize output: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}
