//! Response model shared by the network and the cache.

use bytes::Bytes;
use reqwest::StatusCode;
use reqwest::header::{self, HeaderMap, HeaderName, HeaderValue};
use swcache_core::{Error, StoredResponse};
use url::Url;

/// Response type, mirroring the fetch API's tainting rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseKind {
    /// Same-origin response.
    Basic,
    /// Cross-origin response with CORS headers.
    Cors,
    /// Cross-origin no-cors response; status and body are hidden.
    Opaque,
    Error,
}

impl ResponseKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ResponseKind::Basic => "basic",
            ResponseKind::Cors => "cors",
            ResponseKind::Opaque => "opaque",
            ResponseKind::Error => "error",
        }
    }
}

/// Where a response handed to the caller came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseSource {
    Network,
    Cache,
    OfflineFallback,
}

impl ResponseSource {
    pub fn as_str(self) -> &'static str {
        match self {
            ResponseSource::Network => "network",
            ResponseSource::Cache => "cache",
            ResponseSource::OfflineFallback => "offline_fallback",
        }
    }
}

/// A response body plus metadata.
///
/// The body is reference counted, so cloning a response to both return it and
/// hand it to the store never consumes it twice.
#[derive(Debug, Clone)]
pub struct Response {
    pub url: Url,
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
    pub kind: ResponseKind,
    pub source: ResponseSource,
}

impl Response {
    /// Only 200 same-origin responses may be persisted.
    pub fn is_valid(&self) -> bool {
        self.status == StatusCode::OK && self.kind == ResponseKind::Basic
    }

    pub fn content_type(&self) -> Option<&str> {
        self.headers.get(header::CONTENT_TYPE).and_then(|v| v.to_str().ok())
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Error describing why this response cannot be stored.
    pub fn invalid_reason(&self) -> Error {
        Error::InvalidResponse { status: self.status.as_u16(), kind: self.kind.as_str().to_string() }
    }

    /// Snapshot for the cache store.
    pub fn to_stored(&self, method: &reqwest::Method) -> StoredResponse {
        let headers = self
            .headers
            .iter()
            .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.as_str().to_string(), v.to_string())))
            .collect();
        StoredResponse {
            url: self.url.to_string(),
            method: method.as_str().to_string(),
            status: self.status.as_u16(),
            headers,
            body: self.body.to_vec(),
            stored_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Rebuild a response from a stored snapshot.
    ///
    /// Header pairs that are no longer valid are dropped.
    pub fn from_stored(stored: StoredResponse, source: ResponseSource) -> Result<Self, Error> {
        let url = Url::parse(&stored.url).map_err(|e| Error::InvalidUrl(e.to_string()))?;
        let status = StatusCode::from_u16(stored.status)
            .map_err(|e| Error::Store(format!("stored status {}: {e}", stored.status)))?;

        let mut headers = HeaderMap::new();
        for (name, value) in &stored.headers {
            if let (Ok(name), Ok(value)) = (HeaderName::from_bytes(name.as_bytes()), HeaderValue::from_str(value)) {
                headers.append(name, value);
            }
        }

        Ok(Self { url, status, headers, body: Bytes::from(stored.body), kind: ResponseKind::Basic, source })
    }
}
