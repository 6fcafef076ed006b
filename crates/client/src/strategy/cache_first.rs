//! Cache-first: serve from the generation, touching the network only on a miss.

use swcache_core::{Error, GenerationName};

use super::StrategyExecutor;
use crate::request::Request;
use crate::response::{Response, ResponseSource};

impl StrategyExecutor {
    /// Serve `request` from `generation`, falling back to the network on a miss.
    ///
    /// A network failure on a miss propagates unchanged; there is no offline
    /// substitute for static assets.
    pub async fn cache_first(&self, request: &Request, generation: &GenerationName) -> Result<Response, Error> {
        if let Some(cached) = self.lookup(generation, &request.cache_key(), ResponseSource::Cache).await {
            tracing::debug!(url = %request.url, cache = %generation, "cache hit");
            return Ok(cached);
        }

        tracing::debug!(url = %request.url, cache = %generation, "cache miss");
        let response = self.network.fetch(request).await?;

        if Self::should_store(request, &response) {
            self.store_detached("cache_first.put", generation, request, &response);
        }

        Ok(response)
    }
}
