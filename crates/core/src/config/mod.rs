//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (SWCACHE_*)
//! 2. TOML config file (if SWCACHE_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (SWCACHE_*)
/// 2. TOML config file (if SWCACHE_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Origin of the hosting application. Only same-origin requests are intercepted.
    ///
    /// Set via SWCACHE_ORIGIN environment variable.
    #[serde(default = "default_origin")]
    pub origin: String,

    /// Reserved prefix for generation names.
    ///
    /// Set via SWCACHE_CACHE_PREFIX environment variable.
    #[serde(default = "default_cache_prefix")]
    pub cache_prefix: String,

    /// Version tag of the deployed worker.
    ///
    /// Set via SWCACHE_VERSION environment variable.
    #[serde(default = "default_version")]
    pub version: String,

    /// Path to SQLite cache database.
    ///
    /// Set via SWCACHE_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// User-Agent string for HTTP requests.
    ///
    /// Set via SWCACHE_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Maximum bytes to read per response body.
    ///
    /// Set via SWCACHE_MAX_BYTES environment variable.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// App shell resources cached at install time.
    #[serde(default = "default_app_shell")]
    pub app_shell: Vec<String>,

    /// Well-known path of the offline fallback document.
    #[serde(default = "default_offline_path")]
    pub offline_path: String,

    /// Path prefix that marks API requests.
    #[serde(default = "default_api_prefix")]
    pub api_prefix: String,

    /// Path fragment that marks snippet data requests.
    #[serde(default = "default_snippet_marker")]
    pub snippet_marker: String,

    /// File extensions served cache-first.
    #[serde(default = "default_static_extensions")]
    pub static_extensions: Vec<String>,

    /// Activate immediately after install instead of waiting for old clients to go away.
    #[serde(default = "default_true")]
    pub skip_waiting: bool,

    /// Take control of open clients as soon as activation finishes.
    #[serde(default = "default_true")]
    pub claim_clients: bool,
}

fn default_origin() -> String {
    "http://localhost:8080".into()
}

fn default_cache_prefix() -> String {
    "snipmaster".into()
}

fn default_version() -> String {
    "v1".into()
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./swcache.sqlite")
}

fn default_user_agent() -> String {
    "swcache/0.1".into()
}

fn default_max_bytes() -> usize {
    5_242_880 // 5MB
}

fn default_app_shell() -> Vec<String> {
    ["/", "/index.html", "/styles/main.css", "/scripts/app.js", "/offline.html"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_offline_path() -> String {
    "/offline.html".into()
}

fn default_api_prefix() -> String {
    "/api/".into()
}

fn default_snippet_marker() -> String {
    "snippets".into()
}

fn default_static_extensions() -> Vec<String> {
    ["js", "css", "png", "jpg", "jpeg", "svg", "ico", "gif", "webp"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_true() -> bool {
    true
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            origin: default_origin(),
            cache_prefix: default_cache_prefix(),
            version: default_version(),
            db_path: default_db_path(),
            user_agent: default_user_agent(),
            max_bytes: default_max_bytes(),
            app_shell: default_app_shell(),
            offline_path: default_offline_path(),
            api_prefix: default_api_prefix(),
            snippet_marker: default_snippet_marker(),
            static_extensions: default_static_extensions(),
            skip_waiting: true,
            claim_clients: true,
        }
    }
}

impl AppConfig {
    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `SWCACHE_`
    /// 2. TOML file from `SWCACHE_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("SWCACHE_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("SWCACHE_")
                .ignore(&["config_file"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }

    /// Parsed application origin.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if `origin` is not an http(s) URL.
    pub fn origin_url(&self) -> Result<url::Url, ConfigError> {
        let parsed = url::Url::parse(&self.origin)
            .map_err(|e| ConfigError::Invalid { field: "origin".into(), reason: e.to_string() })?;
        let is_http = matches!(parsed.scheme(), "http" | "https") && parsed.host_str().is_some();
        if !is_http {
            let reason = "must be an http(s) URL with a host".into();
            return Err(ConfigError::Invalid { field: "origin".into(), reason });
        }
        Ok(parsed)
    }
}
