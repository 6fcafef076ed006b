//! MCP tool implementations.
//!
//! This module contains all tools exposed by the swcache server.

pub mod cache;
pub mod sw_clients;
pub mod sw_fetch;
pub mod sw_status;

pub use sw_clients::SwClientsParams;
pub use sw_fetch::SwFetchParams;

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use async_trait::async_trait;
    use bytes::Bytes;
    use swcache_client::{Network, Request, Response, ResponseKind, ResponseSource, ServiceWorker, StatusCode, header};
    use swcache_core::{AppConfig, CacheStore, Error, MemoryStore};

    /// Answers every same-origin GET with its path, fails everything else.
    pub struct EchoNetwork;

    #[async_trait]
    impl Network for EchoNetwork {
        async fn fetch(&self, request: &Request) -> Result<Response, Error> {
            if request.url.host_str() != Some("localhost") {
                return Err(Error::NetworkUnreachable(format!("{}: offline", request.url)));
            }
            let mut headers = header::HeaderMap::new();
            headers.insert(header::CONTENT_TYPE, header::HeaderValue::from_static("text/plain"));
            Ok(Response {
                url: request.url.clone(),
                status: StatusCode::OK,
                headers,
                body: Bytes::from(format!("{} {}", request.method, request.url.path())),
                kind: ResponseKind::Basic,
                source: ResponseSource::Network,
            })
        }
    }

    /// An activated worker over a fresh in-memory store.
    pub async fn active_worker() -> (Arc<ServiceWorker>, Arc<dyn CacheStore>) {
        let store: Arc<dyn CacheStore> = Arc::new(MemoryStore::new());
        let worker = ServiceWorker::new(&AppConfig::default(), Arc::clone(&store), Arc::new(EchoNetwork)).unwrap();
        worker.install_and_activate().await.unwrap();
        (Arc::new(worker), store)
    }

    /// Text of the first content block of a tool result.
    pub fn result_text(result: &rmcp::model::CallToolResult) -> String {
        let value = serde_json::to_value(&result.content[0]).unwrap();
        value.get("text").and_then(|v| v.as_str()).expect("Expected text field in content").to_string()
    }
}
