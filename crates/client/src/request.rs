//! Intercepted request model.

use reqwest::Method;
use reqwest::header::{self, HeaderMap, HeaderName, HeaderValue};
use swcache_core::cache::hash::compute_cache_key;
use url::Url;

/// How the host issued the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestMode {
    /// Top-level page navigation.
    Navigate,
    SameOrigin,
    Cors,
    NoCors,
}

/// An outgoing request as seen by the worker.
#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub mode: RequestMode,
}

impl Request {
    pub fn new(method: Method, url: Url) -> Self {
        Self { method, url, headers: HeaderMap::new(), mode: RequestMode::Cors }
    }

    /// A plain GET subresource request.
    pub fn get(url: Url) -> Self {
        Self::new(Method::GET, url)
    }

    /// A GET page navigation accepting HTML.
    pub fn navigate(url: Url) -> Self {
        Self::get(url)
            .with_mode(RequestMode::Navigate)
            .with_header(header::ACCEPT, HeaderValue::from_static("text/html,application/xhtml+xml"))
    }

    pub fn with_mode(mut self, mode: RequestMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Header value as a string, if present and valid UTF-8.
    pub fn header(&self, name: &HeaderName) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn is_navigation(&self) -> bool {
        self.mode == RequestMode::Navigate
    }

    /// Only GET responses are ever written to a cache.
    pub fn is_cacheable(&self) -> bool {
        self.method == Method::GET
    }

    pub fn is_same_origin(&self, origin: &Url) -> bool {
        self.url.origin() == origin.origin()
    }

    /// Request identity used as the cache key.
    pub fn cache_key(&self) -> String {
        compute_cache_key(self.method.as_str(), self.url.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_navigate_sets_mode_and_accept() {
        let req = Request::navigate(url("http://localhost:8080/"));
        assert!(req.is_navigation());
        assert!(req.header(&header::ACCEPT).unwrap().contains("text/html"));
        assert!(req.is_cacheable());
    }

    #[test]
    fn test_post_not_cacheable() {
        let req = Request::new(Method::POST, url("http://localhost:8080/api/snippets"));
        assert!(!req.is_cacheable());
        assert!(!req.is_navigation());
    }

    #[test]
    fn test_cache_key_depends_on_method() {
        let get = Request::get(url("http://localhost:8080/a"));
        let post = Request::new(Method::POST, url("http://localhost:8080/a"));
        assert_ne!(get.cache_key(), post.cache_key());
        assert_eq!(get.cache_key(), Request::get(url("http://localhost:8080/a")).cache_key());
    }

    #[test]
    fn test_same_origin() {
        let origin = url("http://localhost:8080");
        assert!(Request::get(url("http://localhost:8080/x.js")).is_same_origin(&origin));
        assert!(!Request::get(url("http://localhost:9090/x.js")).is_same_origin(&origin));
        assert!(!Request::get(url("https://cdn.example.com/x.js")).is_same_origin(&origin));
    }
}
