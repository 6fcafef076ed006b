//! Serving strategies.
//!
//! The executor reads and writes entries inside generations it is handed; it
//! never opens or deletes a generation itself. Each algorithm lives in its
//! own module as an `impl StrategyExecutor` block.

mod cache_first;
mod network_first;
mod stale_while_revalidate;

use std::sync::Arc;

use serde::Serialize;
use swcache_core::{CacheStore, Error, GenerationName};

use crate::background::BackgroundTasks;
use crate::fetch::Network;
use crate::request::Request;
use crate::response::{Response, ResponseSource};

/// How a response is produced for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Straight to the network, no cache access.
    NetworkOnly,
    CacheFirst,
    NetworkFirst,
    StaleWhileRevalidate,
}

impl Strategy {
    pub fn as_str(self) -> &'static str {
        match self {
            Strategy::NetworkOnly => "network_only",
            Strategy::CacheFirst => "cache_first",
            Strategy::NetworkFirst => "network_first",
            Strategy::StaleWhileRevalidate => "stale_while_revalidate",
        }
    }
}

/// Location of the offline fallback document.
#[derive(Debug, Clone)]
pub struct OfflineDocument {
    pub generation: GenerationName,
    pub key: String,
}

/// Runs the serving strategies against a cache store and a network.
pub struct StrategyExecutor {
    store: Arc<dyn CacheStore>,
    network: Arc<dyn Network>,
    tasks: BackgroundTasks,
    offline: OfflineDocument,
}

impl StrategyExecutor {
    pub fn new(
        store: Arc<dyn CacheStore>, network: Arc<dyn Network>, tasks: BackgroundTasks, offline: OfflineDocument,
    ) -> Self {
        Self { store, network, tasks, offline }
    }

    pub fn tasks(&self) -> &BackgroundTasks {
        &self.tasks
    }

    /// Run `strategy` for `request`.
    ///
    /// Every strategy except `NetworkOnly` needs a target generation.
    pub async fn execute(
        &self, strategy: Strategy, request: &Request, generation: Option<&GenerationName>,
    ) -> Result<Response, Error> {
        let target = || {
            generation.ok_or_else(|| Error::InvalidInput(format!("{strategy:?} requires a cache generation")))
        };

        match strategy {
            Strategy::NetworkOnly => self.network.fetch(request).await,
            Strategy::CacheFirst => self.cache_first(request, target()?).await,
            Strategy::NetworkFirst => self.network_first(request, target()?).await,
            Strategy::StaleWhileRevalidate => self.stale_while_revalidate(request, target()?).await,
        }
    }

    /// Persist `response` only if it may be cached for `request`.
    fn should_store(request: &Request, response: &Response) -> bool {
        if !request.is_cacheable() {
            tracing::debug!(url = %request.url, method = %request.method, "method is never cached");
            return false;
        }
        if !response.is_valid() {
            tracing::debug!(url = %request.url, reason = %response.invalid_reason(), "not caching response");
            return false;
        }
        true
    }

    /// Cached response for `key`, treating store failures as a miss.
    async fn lookup(&self, generation: &GenerationName, key: &str, source: ResponseSource) -> Option<Response> {
        match self.store.match_entry(generation.as_str(), key).await {
            Ok(Some(stored)) => match Response::from_stored(stored, source) {
                Ok(response) => Some(response),
                Err(e) => {
                    tracing::warn!(cache = %generation, error = %e, "discarding unreadable cache entry");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(cache = %generation, error = %e, "cache lookup failed");
                None
            }
        }
    }

    /// Write a copy of `response` without delaying the caller.
    fn store_detached(&self, label: &'static str, generation: &GenerationName, request: &Request, response: &Response) {
        let store = Arc::clone(&self.store);
        let name = generation.as_str().to_string();
        let key = request.cache_key();
        let snapshot = response.to_stored(&request.method);
        self.tasks.spawn(label, async move { store.put(&name, &key, &snapshot).await });
    }

    async fn offline_fallback(&self) -> Option<Response> {
        self.lookup(&self.offline.generation, &self.offline.key, ResponseSource::OfflineFallback)
            .await
    }
}
