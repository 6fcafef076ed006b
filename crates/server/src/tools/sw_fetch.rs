//! sw_fetch tool implementation.
//!
//! Routes one request through the worker exactly as the hosting application
//! would issue it, and reports where the response came from.

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use swcache_client::{Method, Request, RequestMode, ServiceWorker, header};
use swcache_core::Error;

/// Input parameters for sw_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwFetchParams {
    /// Absolute URL or origin-relative path (e.g. "/snippets/42").
    pub url: String,

    /// HTTP method (default: GET).
    #[serde(default = "default_method")]
    pub method: String,

    /// Request mode: "navigate", "same-origin", "cors" (default) or "no-cors".
    #[serde(default = "default_mode")]
    pub mode: String,

    /// Optional Accept header.
    #[serde(default)]
    pub accept: Option<String>,

    /// Send `Cache-Control: no-cache`, forcing a network-only fetch.
    #[serde(default)]
    pub no_cache: bool,
}

fn default_method() -> String {
    "GET".into()
}

fn default_mode() -> String {
    "cors".into()
}

/// Output structure for sw_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwFetchOutput {
    /// The resolved request URL.
    pub url: String,
    pub method: String,
    /// Whether the worker applied a caching strategy (same-origin and active).
    pub intercepted: bool,
    /// Request classification, when intercepted.
    pub classification: Option<String>,
    /// Serving strategy, when intercepted.
    pub strategy: Option<String>,
    pub status: u16,
    /// "network", "cache" or "offline_fallback".
    pub source: String,
    /// "basic", "cors", "opaque" or "error".
    pub kind: String,
    pub content_type: Option<String>,
    /// Response body decoded as UTF-8 (lossy).
    pub body: String,
}

fn parse_mode(mode: &str) -> Result<RequestMode, Error> {
    match mode.to_ascii_lowercase().as_str() {
        "navigate" => Ok(RequestMode::Navigate),
        "same-origin" | "same_origin" => Ok(RequestMode::SameOrigin),
        "cors" => Ok(RequestMode::Cors),
        "no-cors" | "no_cors" => Ok(RequestMode::NoCors),
        other => Err(Error::InvalidInput(format!("unsupported mode: {other}"))),
    }
}

fn build_request(worker: &ServiceWorker, params: &SwFetchParams) -> Result<Request, Error> {
    let url = worker.resolve(&params.url)?;
    let method = Method::from_bytes(params.method.trim().to_ascii_uppercase().as_bytes())
        .map_err(|e| Error::InvalidInput(format!("invalid method {:?}: {e}", params.method)))?;
    let mode = parse_mode(&params.mode)?;

    let mut request = match mode {
        RequestMode::Navigate if method == Method::GET => Request::navigate(url),
        _ => Request::new(method, url).with_mode(mode),
    };

    if let Some(accept) = &params.accept {
        let value = header::HeaderValue::from_str(accept)
            .map_err(|e| Error::InvalidInput(format!("invalid accept header: {e}")))?;
        request = request.with_header(header::ACCEPT, value);
    }
    if params.no_cache {
        request = request.with_header(header::CACHE_CONTROL, header::HeaderValue::from_static("no-cache"));
    }

    Ok(request)
}

/// Implementation of the sw_fetch tool.
pub async fn fetch_impl(worker: &ServiceWorker, params: SwFetchParams) -> Result<CallToolResult, McpError> {
    if params.url.trim().is_empty() {
        return Err(Error::InvalidInput("url cannot be empty".into()).into());
    }

    let request = build_request(worker, &params)?;
    let intercepted = request.is_same_origin(worker.origin()) && worker.lifecycle().is_active();
    let classification = intercepted.then(|| worker.classify(&request));

    let response = worker.handle_fetch(&request).await?;

    let output = SwFetchOutput {
        url: request.url.to_string(),
        method: request.method.to_string(),
        intercepted,
        classification: classification.map(|c| c.as_str().to_string()),
        strategy: classification.map(|c| c.route().strategy.as_str().to_string()),
        status: response.status.as_u16(),
        source: response.source.as_str().to_string(),
        kind: response.kind.as_str().to_string(),
        content_type: response.content_type().map(String::from),
        body: response.text(),
    };

    let json = serde_json::to_string_pretty(&output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize output: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_support::{active_worker, result_text};

    fn params(url: &str) -> SwFetchParams {
        SwFetchParams { url: url.into(), method: default_method(), mode: default_mode(), accept: None, no_cache: false }
    }

    async fn fetch(worker: &ServiceWorker, params: SwFetchParams) -> SwFetchOutput {
        let result = fetch_impl(worker, params).await.unwrap();
        serde_json::from_str(&result_text(&result)).unwrap()
    }

    #[tokio::test]
    async fn test_fetch_empty_url() {
        let (worker, _) = active_worker().await;
        assert!(fetch_impl(&worker, params("  ")).await.is_err());
    }

    #[tokio::test]
    async fn test_fetch_unsupported_mode() {
        let (worker, _) = active_worker().await;
        let result = fetch_impl(&worker, SwFetchParams { mode: "websocket".into(), ..params("/") }).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_static_asset_comes_from_shell() {
        let (worker, _) = active_worker().await;
        let output = fetch(&worker, params("/styles/main.css")).await;

        assert!(output.intercepted);
        assert_eq!(output.classification.as_deref(), Some("static_asset"));
        assert_eq!(output.strategy.as_deref(), Some("cache_first"));
        assert_eq!(output.source, "cache");
        assert_eq!(output.body, "GET /styles/main.css");
    }

    #[tokio::test]
    async fn test_no_cache_bypasses() {
        let (worker, _) = active_worker().await;
        let output = fetch(&worker, SwFetchParams { no_cache: true, ..params("/styles/main.css") }).await;

        assert_eq!(output.classification.as_deref(), Some("bypass"));
        assert_eq!(output.strategy.as_deref(), Some("network_only"));
        assert_eq!(output.source, "network");
    }

    #[tokio::test]
    async fn test_cross_origin_is_not_intercepted() {
        let (worker, _) = active_worker().await;
        let result = fetch_impl(&worker, params("https://cdn.example.com/lib.js")).await;
        let err = result.unwrap_err();
        assert_eq!(err.code.0, -32004);
    }

    #[tokio::test]
    async fn test_navigation_mode() {
        let (worker, _) = active_worker().await;
        let output = fetch(&worker, SwFetchParams { mode: "navigate".into(), ..params("/editor") }).await;

        assert_eq!(output.classification.as_deref(), Some("navigation"));
        assert_eq!(output.strategy.as_deref(), Some("network_first"));
        assert_eq!(output.status, 200);
    }
}
