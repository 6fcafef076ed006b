//! cache_list tool implementation.
//!
//! Lists cache generations with their entry counts.

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use swcache_core::{CacheStore, Error, LiveSet};

/// Parameters for the cache_list tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct CacheListParams {
    /// Only list generations under the worker's reserved prefix.
    #[serde(default)]
    pub reserved_only: bool,

    /// Include the entry keys of each generation.
    #[serde(default)]
    pub include_keys: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheSummary {
    pub name: String,
    pub entries: usize,
    /// Belongs to the running version.
    pub live: bool,
    /// Under the reserved prefix but not live; removed at the next activation.
    pub stale: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keys: Option<Vec<String>>,
}

/// Output from the cache_list tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheListOutput {
    pub caches: Vec<CacheSummary>,
}

/// Implementation of the cache_list tool.
pub async fn list_impl(
    store: &dyn CacheStore, live: &LiveSet, params: CacheListParams,
) -> Result<CallToolResult, McpError> {
    let mut caches = Vec::new();

    for name in store.list_names().await? {
        if params.reserved_only && !live.is_reserved(&name) {
            continue;
        }
        let keys = store.keys(&name).await?;
        let entries = keys.len();
        let (is_live, stale) = (live.contains(&name), live.is_stale(&name));
        let keys = params.include_keys.then_some(keys);
        caches.push(CacheSummary { name, entries, live: is_live, stale, keys });
    }

    let output = CacheListOutput { caches };
    let json = serde_json::to_string_pretty(&output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize output: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_support::result_text;
    use swcache_core::CacheDb;

    async fn list(store: &dyn CacheStore, params: CacheListParams) -> CacheListOutput {
        let live = LiveSet::new("snipmaster", "v2");
        let result = list_impl(store, &live, params).await.unwrap();
        serde_json::from_str(&result_text(&result)).unwrap()
    }

    #[tokio::test]
    async fn test_list_empty() {
        let cache = CacheDb::open_in_memory().await.unwrap();
        let output = list(&cache, CacheListParams::default()).await;
        assert!(output.caches.is_empty());
    }

    #[tokio::test]
    async fn test_list_marks_live_and_stale() {
        let cache = CacheDb::open_in_memory().await.unwrap();
        cache.open("snipmaster-static-v2").await.unwrap();
        cache.open("snipmaster-static-v1").await.unwrap();
        cache.open("thirdparty").await.unwrap();

        let output = list(&cache, CacheListParams::default()).await;
        let names: Vec<_> = output.caches.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["snipmaster-static-v1", "snipmaster-static-v2", "thirdparty"]);

        assert!(output.caches[0].stale);
        assert!(output.caches[1].live);
        assert!(!output.caches[2].live && !output.caches[2].stale);
        assert!(output.caches.iter().all(|c| c.keys.is_none()));
    }

    #[tokio::test]
    async fn test_list_reserved_only_with_keys() {
        let cache = CacheDb::open_in_memory().await.unwrap();
        cache.open("snipmaster-dynamic-v2").await.unwrap();
        cache.open("thirdparty").await.unwrap();

        let params = CacheListParams { reserved_only: true, include_keys: true };
        let output = list(&cache, params).await;

        assert_eq!(output.caches.len(), 1);
        assert_eq!(output.caches[0].entries, 0);
        assert!(output.caches[0].keys.as_ref().is_some_and(Vec::is_empty));
    }
}
