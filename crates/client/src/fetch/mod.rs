//! HTTP fetch pipeline behind the `Network` seam.
//!
//! ### Response classification
//! - Non-2xx statuses are returned as responses, never raised.
//! - `kind` is `basic` when the final URL shares the application origin,
//!   `opaque` for cross-origin `no-cors` requests, `cors` otherwise.
//! - Only transport failures surface as `NETWORK_UNREACHABLE`.
//!
//! ### Limits
//! - Max redirects: 5
//! - Max body bytes: 5MB (configurable)
//! - No request timeout: a started fetch runs to completion or failure.

pub mod url;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, header};
use std::time::Instant;
use swcache_core::{AppConfig, Error};

pub use self::url::{UrlError, resolve};

use crate::request::{Request, RequestMode};
use crate::response::{Response, ResponseKind, ResponseSource};

/// Anything that can perform a network fetch for the worker.
#[async_trait]
pub trait Network: Send + Sync {
    /// Fetch `request` over the network.
    ///
    /// Returns `Error::NetworkUnreachable` only when no response was received.
    async fn fetch(&self, request: &Request) -> Result<Response, Error>;
}

/// Configuration for the fetch client.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Application origin used to decide response kind.
    pub origin: ::url::Url,

    /// User agent string (default: "swcache/0.1")
    pub user_agent: String,

    /// Maximum response body size in bytes (default: 5MB)
    pub max_bytes: usize,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,
}

impl FetchConfig {
    /// Build from the application configuration.
    pub fn from_app(config: &AppConfig) -> Result<Self, Error> {
        let origin = config.origin_url().map_err(|e| Error::InvalidInput(e.to_string()))?;
        Ok(Self { origin, user_agent: config.user_agent.clone(), max_bytes: config.max_bytes, max_redirects: 5 })
    }
}

/// HTTP fetch client.
pub struct FetchClient {
    http: Client,
    config: FetchConfig,
}

impl FetchClient {
    /// Create a new fetch client with the given configuration.
    pub fn new(config: FetchConfig) -> Result<Self, Error> {
        let http = Client::builder()
            .user_agent(&config.user_agent)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| Error::InvalidInput(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { http, config })
    }

    /// Get reference to the configuration.
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    fn kind_for(&self, request: &Request, final_url: &::url::Url) -> ResponseKind {
        if final_url.origin() == self.config.origin.origin() {
            ResponseKind::Basic
        } else if request.mode == RequestMode::NoCors {
            ResponseKind::Opaque
        } else {
            ResponseKind::Cors
        }
    }
}

#[async_trait]
impl Network for FetchClient {
    async fn fetch(&self, request: &Request) -> Result<Response, Error> {
        let start = Instant::now();

        let response = self
            .http
            .request(request.method.clone(), request.url.as_str())
            .headers(request.headers.clone())
            .send()
            .await
            .map_err(|e| Error::NetworkUnreachable(format!("{}: {}", request.url, e)))?;

        let status = response.status();

        if let Some(len) = response.content_length()
            && len as usize > self.config.max_bytes
        {
            return Err(Error::FetchTooLarge(format!("{} bytes exceeds {}", len, self.config.max_bytes)));
        }

        let final_url = response.url().clone();
        let headers = response.headers().clone();

        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::NetworkUnreachable(format!("failed to read response: {}", e)))?;

        if bytes.len() > self.config.max_bytes {
            return Err(Error::FetchTooLarge(format!("{} bytes exceeds {}", bytes.len(), self.config.max_bytes)));
        }

        let kind = self.kind_for(request, &final_url);
        let (headers, body) = match kind {
            ResponseKind::Opaque => (header::HeaderMap::new(), Bytes::new()),
            _ => (headers, bytes),
        };

        tracing::debug!(
            "fetched {} {} -> {} ({}, {}) in {}ms ({} bytes)",
            request.method,
            request.url,
            final_url,
            status.as_u16(),
            kind.as_str(),
            start.elapsed().as_millis(),
            body.len()
        );

        Ok(Response { url: final_url, status, headers, body, kind, source: ResponseSource::Network })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> FetchClient {
        FetchClient::new(FetchConfig::from_app(&AppConfig::default()).unwrap()).unwrap()
    }

    #[test]
    fn test_fetch_config_from_app() {
        let config = FetchConfig::from_app(&AppConfig::default()).unwrap();
        assert_eq!(config.user_agent, "swcache/0.1");
        assert_eq!(config.max_bytes, 5 * 1024 * 1024);
        assert_eq!(config.max_redirects, 5);
        assert_eq!(config.origin.as_str(), "http://localhost:8080/");
    }

    #[test]
    fn test_fetch_config_rejects_bad_origin() {
        let app = AppConfig { origin: "not a url".into(), ..Default::default() };
        assert!(matches!(FetchConfig::from_app(&app), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_kind_for() {
        let client = client();
        let same = ::url::Url::parse("http://localhost:8080/app.js").unwrap();
        let other = ::url::Url::parse("https://cdn.example.com/app.js").unwrap();

        let req = Request::get(same.clone());
        assert_eq!(client.kind_for(&req, &same), ResponseKind::Basic);
        assert_eq!(client.kind_for(&req, &other), ResponseKind::Cors);

        let no_cors = Request::get(other.clone()).with_mode(RequestMode::NoCors);
        assert_eq!(client.kind_for(&no_cors, &other), ResponseKind::Opaque);
    }

    #[tokio::test]
    #[ignore = "requires loopback networking without a proxy"]
    async fn test_unreachable_host_is_network_error() {
        let client = client();
        // Port 9 (discard) on loopback is expected to refuse connections.
        let req = Request::get(::url::Url::parse("http://127.0.0.1:9/").unwrap());
        let result = client.fetch(&req).await;
        assert!(matches!(result, Err(Error::NetworkUnreachable(_))));
    }
}
