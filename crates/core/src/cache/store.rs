//! The cache store contract consumed by the worker.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::Error;

/// A stored response snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredResponse {
    pub url: String,
    pub method: String,
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
    pub stored_at: String,
}

impl StoredResponse {
    /// Look up a header value, ignoring case of the name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Durable, named partitions of request-keyed response snapshots.
///
/// Writes are atomic puts keyed by request identity; concurrent writers to the
/// same key resolve last-writer-wins.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Open a named cache, creating it if needed.
    async fn open(&self, name: &str) -> Result<(), Error>;

    /// Find the snapshot stored under `key` in cache `name`.
    async fn match_entry(&self, name: &str, key: &str) -> Result<Option<StoredResponse>, Error>;

    /// Store a snapshot. Fails with `Error::CacheNotFound` if `name` was never opened.
    async fn put(&self, name: &str, key: &str, response: &StoredResponse) -> Result<(), Error>;

    /// Delete a named cache and all its entries. Returns whether it existed.
    async fn delete(&self, name: &str) -> Result<bool, Error>;

    /// All cache names currently present, sorted.
    async fn list_names(&self) -> Result<Vec<String>, Error>;

    /// Keys stored in cache `name`, sorted.
    async fn keys(&self, name: &str) -> Result<Vec<String>, Error>;
}
