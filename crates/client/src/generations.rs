//! Cache generation lifecycle: creation, install-time population, and cleanup.
//!
//! The manager is the only component that opens or deletes generations.

use std::collections::{BTreeSet, HashSet};
use std::sync::{Arc, Mutex, PoisonError};

use serde::Serialize;
use swcache_core::{CacheRole, CacheStore, Error, GenerationName, LiveSet, StoredResponse};
use tokio::task::JoinSet;
use url::Url;

use crate::fetch::{Network, resolve};
use crate::request::Request;
use crate::strategy::OfflineDocument;

/// Offline page stored when the deployed one cannot be fetched at install.
const BUILTIN_OFFLINE_PAGE: &str = include_str!("../assets/offline.html");

/// Where the offline document in the static generation came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OfflineSource {
    /// Fetched during this install.
    Network,
    /// Already present from an earlier install of the same version.
    Existing,
    /// The built-in page.
    Builtin,
}

#[derive(Debug, Clone, Serialize)]
pub struct FailedResource {
    pub path: String,
    pub reason: String,
}

/// Outcome of populating the static shell.
#[derive(Debug, Clone, Serialize)]
pub struct InstallReport {
    pub generation: String,
    pub cached: Vec<String>,
    pub failed: Vec<FailedResource>,
    pub offline_source: OfflineSource,
}

impl InstallReport {
    /// All-or-nothing view: every shell resource, including the offline document, came from the network.
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty() && self.offline_source == OfflineSource::Network
    }
}

/// Owns the named generations of one deployed version.
pub struct GenerationManager {
    store: Arc<dyn CacheStore>,
    network: Arc<dyn Network>,
    prefix: String,
    version: String,
    origin: Url,
    offline_path: String,
    opened: Mutex<HashSet<CacheRole>>,
}

impl GenerationManager {
    pub fn new(
        store: Arc<dyn CacheStore>, network: Arc<dyn Network>, prefix: &str, version: &str, origin: Url,
        offline_path: &str,
    ) -> Self {
        Self {
            store,
            network,
            prefix: prefix.to_string(),
            version: version.to_string(),
            origin,
            offline_path: offline_path.to_string(),
            opened: Mutex::new(HashSet::new()),
        }
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn name(&self, role: CacheRole) -> GenerationName {
        GenerationName::new(&self.prefix, role, &self.version)
    }

    pub fn live_set(&self) -> LiveSet {
        LiveSet::new(&self.prefix, &self.version)
    }

    /// Open the generation for `role`, creating it on first use.
    pub async fn open(&self, role: CacheRole) -> Result<GenerationName, Error> {
        let name = self.name(role);
        let known = self.opened.lock().unwrap_or_else(PoisonError::into_inner).contains(&role);
        if !known {
            self.store.open(name.as_str()).await?;
            self.opened.lock().unwrap_or_else(PoisonError::into_inner).insert(role);
            tracing::debug!(cache = %name, "opened generation");
        }
        Ok(name)
    }

    fn offline_url(&self) -> Result<Url, Error> {
        resolve(&self.origin, &self.offline_path).map_err(|e| Error::InvalidUrl(e.to_string()))
    }

    /// Where the offline document lives for this version.
    pub fn offline_document(&self) -> Result<OfflineDocument, Error> {
        let key = Request::get(self.offline_url()?).cache_key();
        Ok(OfflineDocument { generation: self.name(CacheRole::StaticShell), key })
    }

    /// Populate the static shell generation with `resources`.
    ///
    /// Individual resource failures are collected in the report instead of
    /// aborting. The offline document is always secured; this only fails if
    /// even the built-in page cannot be stored.
    pub async fn populate_static_shell(&self, resources: &[String]) -> Result<InstallReport, Error> {
        let generation = self.open(CacheRole::StaticShell).await?;
        let offline_source = self.secure_offline_document(&generation).await?;

        let mut cached = Vec::new();
        let mut failed = Vec::new();
        let mut join_set = JoinSet::new();
        let mut seen = HashSet::new();

        for path in resources {
            if *path == self.offline_path {
                if offline_source == OfflineSource::Network {
                    cached.push(path.clone());
                } else {
                    failed.push(FailedResource { path: path.clone(), reason: "offline document not fetched".into() });
                }
                continue;
            }
            if !seen.insert(path.clone()) {
                continue;
            }

            let url = match resolve(&self.origin, path) {
                Ok(url) => url,
                Err(e) => {
                    failed.push(FailedResource { path: path.clone(), reason: e.to_string() });
                    continue;
                }
            };

            let store = Arc::clone(&self.store);
            let network = Arc::clone(&self.network);
            let name = generation.as_str().to_string();
            let path = path.clone();
            join_set.spawn(async move {
                let result = fetch_and_store(store.as_ref(), network.as_ref(), &name, Request::get(url)).await;
                (path, result)
            });
        }

        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok((path, Ok(()))) => cached.push(path),
                Ok((path, Err(e))) => {
                    tracing::warn!(path = %path, error = %e, "failed to cache shell resource");
                    failed.push(FailedResource { path, reason: e.to_string() });
                }
                Err(e) => return Err(Error::InstallFailed(format!("shell task panicked: {e}"))),
            }
        }

        cached.sort();
        failed.sort_by(|a, b| a.path.cmp(&b.path));

        tracing::info!(
            cache = %generation,
            cached = cached.len(),
            failed = failed.len(),
            offline = ?offline_source,
            "static shell populated"
        );

        Ok(InstallReport { generation: generation.as_str().to_string(), cached, failed, offline_source })
    }

    async fn secure_offline_document(&self, generation: &GenerationName) -> Result<OfflineSource, Error> {
        let url = self.offline_url()?;
        let request = Request::get(url.clone());

        match fetch_and_store(self.store.as_ref(), self.network.as_ref(), generation.as_str(), request.clone()).await {
            Ok(()) => return Ok(OfflineSource::Network),
            Err(e) => tracing::warn!(path = %self.offline_path, error = %e, "could not fetch offline document"),
        }

        let key = request.cache_key();
        match self.store.match_entry(generation.as_str(), &key).await {
            Ok(Some(_)) => return Ok(OfflineSource::Existing),
            Ok(None) => {}
            Err(e) => tracing::warn!(cache = %generation, error = %e, "could not read existing offline document"),
        }

        let builtin = StoredResponse {
            url: url.to_string(),
            method: "GET".into(),
            status: 200,
            headers: vec![("content-type".into(), "text/html; charset=utf-8".into())],
            body: BUILTIN_OFFLINE_PAGE.as_bytes().to_vec(),
            stored_at: chrono::Utc::now().to_rfc3339(),
        };
        self.store
            .put(generation.as_str(), &key, &builtin)
            .await
            .map_err(|e| Error::InstallFailed(format!("could not store offline document: {e}")))?;

        Ok(OfflineSource::Builtin)
    }

    /// Delete every reserved generation that is not live for `current_version`.
    ///
    /// Returns the deleted names.
    pub async fn reconcile(&self, current_version: &str) -> Result<BTreeSet<String>, Error> {
        let live = LiveSet::new(&self.prefix, current_version);
        let mut deleted = BTreeSet::new();

        for name in self.store.list_names().await? {
            if !live.is_stale(&name) {
                continue;
            }
            if self.store.delete(&name).await? {
                tracing::info!(cache = %name, "deleted stale generation");
                deleted.insert(name);
            }
        }

        Ok(deleted)
    }
}

async fn fetch_and_store(
    store: &dyn CacheStore, network: &dyn Network, name: &str, request: Request,
) -> Result<(), Error> {
    let response = network.fetch(&request).await?;
    if !response.is_valid() {
        return Err(response.invalid_reason());
    }
    store.put(name, &request.cache_key(), &response.to_stored(&request.method)).await
}
