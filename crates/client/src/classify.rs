//! Request classification and the classification-to-strategy routing table.
//!
//! Rules are ordered and first-match-wins:
//!
//! 1. `Cache-Control: no-cache` → bypass
//! 2. path starts with the API prefix → api
//! 3. path contains the snippet marker, or `Accept` asks for JSON → snippet data
//! 4. navigation mode → navigation
//! 5. path extension in the static set → static asset
//! 6. everything else → default

use std::collections::HashSet;

use reqwest::header;
use serde::Serialize;
use swcache_core::{AppConfig, CacheRole};

use crate::request::Request;
use crate::strategy::Strategy;

/// Category assigned to a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    Bypass,
    Api,
    SnippetData,
    Navigation,
    StaticAsset,
    Default,
}

/// Strategy and target generation for one classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Route {
    pub strategy: Strategy,
    /// `None` means no cache generation is touched.
    pub role: Option<CacheRole>,
}

impl Classification {
    pub fn route(self) -> Route {
        match self {
            Classification::Bypass => Route { strategy: Strategy::NetworkOnly, role: None },
            Classification::Api | Classification::Navigation | Classification::Default => {
                Route { strategy: Strategy::NetworkFirst, role: Some(CacheRole::Dynamic) }
            }
            Classification::SnippetData => {
                Route { strategy: Strategy::StaleWhileRevalidate, role: Some(CacheRole::SnippetData) }
            }
            Classification::StaticAsset => Route { strategy: Strategy::CacheFirst, role: Some(CacheRole::StaticShell) },
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Classification::Bypass => "bypass",
            Classification::Api => "api",
            Classification::SnippetData => "snippet_data",
            Classification::Navigation => "navigation",
            Classification::StaticAsset => "static_asset",
            Classification::Default => "default",
        }
    }
}

/// Pure, side-effect-free request classifier.
#[derive(Debug, Clone)]
pub struct Classifier {
    api_prefix: String,
    snippet_marker: String,
    static_extensions: HashSet<String>,
}

impl Classifier {
    pub fn new(api_prefix: &str, snippet_marker: &str, static_extensions: &[String]) -> Self {
        Self {
            api_prefix: api_prefix.to_string(),
            snippet_marker: snippet_marker.to_string(),
            static_extensions: static_extensions.iter().map(|e| e.trim_start_matches('.').to_lowercase()).collect(),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(&config.api_prefix, &config.snippet_marker, &config.static_extensions)
    }

    pub fn classify(&self, request: &Request) -> Classification {
        let path = request.url.path();

        if wants_no_cache(request) {
            Classification::Bypass
        } else if path.starts_with(&self.api_prefix) {
            Classification::Api
        } else if path.contains(&self.snippet_marker) || accepts_json(request) {
            Classification::SnippetData
        } else if request.is_navigation() {
            Classification::Navigation
        } else if self.is_static_asset(path) {
            Classification::StaticAsset
        } else {
            Classification::Default
        }
    }

    fn is_static_asset(&self, path: &str) -> bool {
        let file = path.rsplit('/').next().unwrap_or(path);
        file.rsplit_once('.')
            .is_some_and(|(_, ext)| self.static_extensions.contains(&ext.to_lowercase()))
    }
}

fn wants_no_cache(request: &Request) -> bool {
    request
        .header(&header::CACHE_CONTROL)
        .is_some_and(|value| value.split(',').any(|d| d.trim().eq_ignore_ascii_case("no-cache")))
}

fn accepts_json(request: &Request) -> bool {
    request
        .header(&header::ACCEPT)
        .is_some_and(|value| value.to_ascii_lowercase().contains("application/json"))
}
