//! Stale-while-revalidate: answer from the cache now, refresh it in the background.

use std::sync::Arc;

use swcache_core::{Error, GenerationName};
use tokio::sync::oneshot;

use super::StrategyExecutor;
use crate::request::Request;
use crate::response::{Response, ResponseSource};

impl StrategyExecutor {
    /// Serve the cached entry immediately while a detached fetch refreshes it.
    ///
    /// On a cold cache the caller waits for that fetch instead. If it fails too,
    /// the result is `Error::NoResponse`, never empty content.
    pub async fn stale_while_revalidate(
        &self, request: &Request, generation: &GenerationName,
    ) -> Result<Response, Error> {
        let key = request.cache_key();
        let cached = self.lookup(generation, &key, ResponseSource::Cache).await;

        let (tx, rx) = oneshot::channel::<Option<Response>>();
        let network = Arc::clone(&self.network);
        let store = Arc::clone(&self.store);
        let name = generation.as_str().to_string();
        let request_owned = request.clone();

        self.tasks.spawn("stale_while_revalidate.refresh", async move {
            let response = match network.fetch(&request_owned).await {
                Ok(response) => response,
                Err(e) => {
                    // Nobody may be listening; the failure is reported by the tracker.
                    let _ = tx.send(None);
                    return Err(e);
                }
            };

            let snapshot = Self::should_store(&request_owned, &response)
                .then(|| response.to_stored(&request_owned.method));
            let _ = tx.send(Some(response));

            match snapshot {
                Some(snapshot) => store.put(&name, &key, &snapshot).await,
                None => Ok(()),
            }
        });

        if let Some(cached) = cached {
            tracing::debug!(url = %request.url, cache = %generation, "serving stale entry, revalidating");
            return Ok(cached);
        }

        match rx.await {
            Ok(Some(response)) => Ok(response),
            Ok(None) | Err(_) => {
                Err(Error::NoResponse(format!("{} is not cached and the network failed", request.url)))
            }
        }
    }
}
