//! Fakes shared by unit tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::StatusCode;
use reqwest::header::{self, HeaderMap, HeaderValue};
use swcache_core::{CacheStore, Error, GenerationName, MemoryStore, StoredResponse};
use url::Url;

use crate::fetch::Network;
use crate::request::Request;
use crate::response::{Response, ResponseKind, ResponseSource};

pub const ORIGIN: &str = "http://localhost:8080";

pub fn url(path: &str) -> Url {
    Url::parse(ORIGIN).unwrap().join(path).unwrap()
}

#[derive(Debug, Clone)]
enum Scripted {
    Respond { status: u16, body: String, kind: ResponseKind },
    Unreachable,
}

/// Network fake answering from a script. Unscripted URLs are unreachable.
#[derive(Debug, Default)]
pub struct FakeNetwork {
    routes: Mutex<HashMap<String, Scripted>>,
    calls: Mutex<Vec<String>>,
}

impl FakeNetwork {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn respond(&self, path: &str, status: u16, body: &str) {
        self.respond_with_kind(path, status, body, ResponseKind::Basic);
    }

    pub fn respond_with_kind(&self, path: &str, status: u16, body: &str, kind: ResponseKind) {
        self.routes
            .lock()
            .unwrap()
            .insert(url(path).to_string(), Scripted::Respond { status, body: body.to_string(), kind });
    }

    pub fn unreachable(&self, path: &str) {
        self.routes.lock().unwrap().insert(url(path).to_string(), Scripted::Unreachable);
    }

    pub fn calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn calls_to(&self, path: &str) -> usize {
        let target = url(path).to_string();
        self.calls.lock().unwrap().iter().filter(|u| **u == target).count()
    }
}

#[async_trait]
impl Network for FakeNetwork {
    async fn fetch(&self, request: &Request) -> Result<Response, Error> {
        let key = request.url.to_string();
        self.calls.lock().unwrap().push(key.clone());
        let scripted = self.routes.lock().unwrap().get(&key).cloned();

        match scripted {
            Some(Scripted::Respond { status, body, kind }) => {
                let mut headers = HeaderMap::new();
                headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/plain"));
                Ok(Response {
                    url: request.url.clone(),
                    status: StatusCode::from_u16(status).unwrap(),
                    headers,
                    body: Bytes::from(body),
                    kind,
                    source: ResponseSource::Network,
                })
            }
            Some(Scripted::Unreachable) | None => Err(Error::NetworkUnreachable(format!("{key}: offline"))),
        }
    }
}

/// Store whose writes always fail.
#[derive(Debug, Default, Clone)]
pub struct FailingPutStore {
    inner: MemoryStore,
}

#[async_trait]
impl CacheStore for FailingPutStore {
    async fn open(&self, name: &str) -> Result<(), Error> {
        self.inner.open(name).await
    }

    async fn match_entry(&self, name: &str, key: &str) -> Result<Option<StoredResponse>, Error> {
        self.inner.match_entry(name, key).await
    }

    async fn put(&self, _name: &str, _key: &str, _response: &StoredResponse) -> Result<(), Error> {
        Err(Error::Store("quota exceeded".into()))
    }

    async fn delete(&self, name: &str) -> Result<bool, Error> {
        self.inner.delete(name).await
    }

    async fn list_names(&self) -> Result<Vec<String>, Error> {
        self.inner.list_names().await
    }

    async fn keys(&self, name: &str) -> Result<Vec<String>, Error> {
        self.inner.keys(name).await
    }
}

/// Store whose reads always fail.
#[derive(Debug, Default, Clone)]
pub struct FailingReadStore {
    inner: MemoryStore,
}

#[async_trait]
impl CacheStore for FailingReadStore {
    async fn open(&self, name: &str) -> Result<(), Error> {
        self.inner.open(name).await
    }

    async fn match_entry(&self, _name: &str, _key: &str) -> Result<Option<StoredResponse>, Error> {
        Err(Error::Store("corrupt entry".into()))
    }

    async fn put(&self, name: &str, key: &str, response: &StoredResponse) -> Result<(), Error> {
        self.inner.put(name, key, response).await
    }

    async fn delete(&self, name: &str) -> Result<bool, Error> {
        self.inner.delete(name).await
    }

    async fn list_names(&self) -> Result<Vec<String>, Error> {
        self.inner.list_names().await
    }

    async fn keys(&self, name: &str) -> Result<Vec<String>, Error> {
        self.inner.keys(name).await
    }
}

/// Store that refuses to open any cache whose name contains `pattern`.
#[derive(Debug, Clone)]
pub struct FailingOpenStore {
    inner: MemoryStore,
    pattern: &'static str,
}

impl FailingOpenStore {
    pub fn new(pattern: &'static str) -> Self {
        Self { inner: MemoryStore::new(), pattern }
    }
}

#[async_trait]
impl CacheStore for FailingOpenStore {
    async fn open(&self, name: &str) -> Result<(), Error> {
        if name.contains(self.pattern) {
            return Err(Error::Store(format!("cannot create {name}")));
        }
        self.inner.open(name).await
    }

    async fn match_entry(&self, name: &str, key: &str) -> Result<Option<StoredResponse>, Error> {
        self.inner.match_entry(name, key).await
    }

    async fn put(&self, name: &str, key: &str, response: &StoredResponse) -> Result<(), Error> {
        self.inner.put(name, key, response).await
    }

    async fn delete(&self, name: &str) -> Result<bool, Error> {
        self.inner.delete(name).await
    }

    async fn list_names(&self) -> Result<Vec<String>, Error> {
        self.inner.list_names().await
    }

    async fn keys(&self, name: &str) -> Result<Vec<String>, Error> {
        self.inner.keys(name).await
    }
}

/// Seed `generation` with a 200 response for `GET path`.
pub async fn seed(store: &dyn CacheStore, generation: &GenerationName, path: &str, body: &str) {
    let request = Request::get(url(path));
    store.open(generation.as_str()).await.unwrap();
    let snapshot = StoredResponse {
        url: request.url.to_string(),
        method: "GET".into(),
        status: 200,
        headers: vec![("content-type".into(), "text/plain".into())],
        body: body.as_bytes().to_vec(),
        stored_at: chrono::Utc::now().to_rfc3339(),
    };
    store.put(generation.as_str(), &request.cache_key(), &snapshot).await.unwrap();
}

/// Body stored for `GET path` in `generation`, if any.
pub async fn stored_body(store: &dyn CacheStore, generation: &GenerationName, path: &str) -> Option<String> {
    let key = Request::get(url(path)).cache_key();
    store
        .match_entry(generation.as_str(), &key)
        .await
        .unwrap()
        .map(|s| String::from_utf8(s.body).unwrap())
}
