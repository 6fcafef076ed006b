//! In-memory cache store.
//!
//! Used by tests and by hosts that do not need persistence across restarts.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::store::{CacheStore, StoredResponse};
use crate::Error;

/// Cache store backed by a map behind a tokio RwLock.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    caches: Arc<RwLock<BTreeMap<String, HashMap<String, StoredResponse>>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn open(&self, name: &str) -> Result<(), Error> {
        let mut caches = self.caches.write().await;
        caches.entry(name.to_string()).or_default();
        Ok(())
    }

    async fn match_entry(&self, name: &str, key: &str) -> Result<Option<StoredResponse>, Error> {
        let caches = self.caches.read().await;
        Ok(caches.get(name).and_then(|entries| entries.get(key)).cloned())
    }

    async fn put(&self, name: &str, key: &str, response: &StoredResponse) -> Result<(), Error> {
        let mut caches = self.caches.write().await;
        let entries = caches
            .get_mut(name)
            .ok_or_else(|| Error::CacheNotFound(name.to_string()))?;
        entries.insert(key.to_string(), response.clone());
        Ok(())
    }

    async fn delete(&self, name: &str) -> Result<bool, Error> {
        let mut caches = self.caches.write().await;
        Ok(caches.remove(name).is_some())
    }

    async fn list_names(&self) -> Result<Vec<String>, Error> {
        let caches = self.caches.read().await;
        Ok(caches.keys().cloned().collect())
    }

    async fn keys(&self, name: &str) -> Result<Vec<String>, Error> {
        let caches = self.caches.read().await;
        let mut keys: Vec<String> = caches
            .get(name)
            .map(|entries| entries.keys().cloned().collect())
            .unwrap_or_default();
        keys.sort();
        Ok(keys)
    }
}
