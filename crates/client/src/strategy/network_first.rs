//! Network-first: live content when reachable, cached or offline content otherwise.

use swcache_core::{Error, GenerationName};

use super::StrategyExecutor;
use crate::request::Request;
use crate::response::{Response, ResponseSource};

impl StrategyExecutor {
    /// Fetch `request`, falling back to `generation` and then to the offline document.
    ///
    /// Fallback chain:
    /// - valid network response: stored (awaited, best-effort) and returned
    /// - invalid network response: cached copy if present, otherwise the response as-is
    /// - network failure: cached copy, then the offline document for navigations,
    ///   then the original failure
    pub async fn network_first(&self, request: &Request, generation: &GenerationName) -> Result<Response, Error> {
        let key = request.cache_key();

        let failure = match self.network.fetch(request).await {
            Ok(response) if response.is_valid() => {
                if Self::should_store(request, &response) {
                    let snapshot = response.to_stored(&request.method);
                    if let Err(e) = self.store.put(generation.as_str(), &key, &snapshot).await {
                        tracing::warn!(url = %request.url, cache = %generation, error = %e, "failed to cache response");
                    }
                }
                return Ok(response);
            }
            Ok(response) => {
                if let Some(cached) = self.lookup(generation, &key, ResponseSource::Cache).await {
                    tracing::debug!(url = %request.url, reason = %response.invalid_reason(), "serving cached copy");
                    return Ok(cached);
                }
                return Ok(response);
            }
            Err(e) => e,
        };

        tracing::debug!(url = %request.url, error = %failure, "network failed, trying cache");

        if let Some(cached) = self.lookup(generation, &key, ResponseSource::Cache).await {
            return Ok(cached);
        }

        self.navigation_fallback(request, failure).await
    }

    /// Network-first for a request whose generation could not be opened.
    ///
    /// The missing generation counts as a cache miss, so navigations still
    /// fall back to the offline document.
    pub async fn network_or_offline(&self, request: &Request) -> Result<Response, Error> {
        match self.network.fetch(request).await {
            Ok(response) => Ok(response),
            Err(failure) => self.navigation_fallback(request, failure).await,
        }
    }

    async fn navigation_fallback(&self, request: &Request, failure: Error) -> Result<Response, Error> {
        if request.is_navigation() {
            if let Some(offline) = self.offline_fallback().await {
                tracing::info!(url = %request.url, "serving offline document");
                return Ok(offline);
            }
            tracing::warn!(url = %request.url, cache = %self.offline.generation, "offline document missing");
        }

        Err(failure)
    }
}
