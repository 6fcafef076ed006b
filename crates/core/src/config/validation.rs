//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::AppConfig;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },

    #[error("missing required configuration: {field} ({hint})")]
    Missing { field: String, hint: String },
}

fn invalid(field: &str, reason: &str) -> ConfigError {
    ConfigError::Invalid { field: field.into(), reason: reason.into() }
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `origin` is not an http(s) URL
    /// - `cache_prefix` is empty or contains `-` or whitespace
    /// - `version` is empty or contains whitespace
    /// - `offline_path`, `api_prefix` or an `app_shell` entry does not start with `/`
    /// - `max_bytes` is 0 or exceeds 50MB
    /// - `user_agent` is empty
    ///
    /// Returns `ConfigError::Missing` if `static_extensions` is empty.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.origin_url()?;

        if self.cache_prefix.is_empty() {
            return Err(invalid("cache_prefix", "must not be empty"));
        }
        if self.cache_prefix.contains('-') || self.cache_prefix.chars().any(char::is_whitespace) {
            return Err(invalid("cache_prefix", "must not contain '-' or whitespace"));
        }

        if self.version.is_empty() {
            return Err(invalid("version", "must not be empty"));
        }
        if self.version.chars().any(char::is_whitespace) {
            return Err(invalid("version", "must not contain whitespace"));
        }

        if !self.offline_path.starts_with('/') {
            return Err(invalid("offline_path", "must start with '/'"));
        }
        if !self.api_prefix.starts_with('/') {
            return Err(invalid("api_prefix", "must start with '/'"));
        }
        if let Some(bad) = self.app_shell.iter().find(|p| !p.starts_with('/')) {
            return Err(invalid("app_shell", &format!("{bad} must start with '/'")));
        }

        if self.snippet_marker.is_empty() {
            return Err(invalid("snippet_marker", "must not be empty"));
        }
        if self.static_extensions.is_empty() {
            return Err(ConfigError::Missing {
                field: "static_extensions".into(),
                hint: "List at least one extension, e.g. [\"js\", \"css\"]".into(),
            });
        }

        if self.max_bytes == 0 {
            return Err(invalid("max_bytes", "must be greater than 0"));
        }
        if self.max_bytes > 50 * 1024 * 1024 {
            return Err(invalid("max_bytes", "must not exceed 50MB"));
        }

        if self.user_agent.is_empty() {
            return Err(invalid("user_agent", "must not be empty"));
        }

        if !self.app_shell.contains(&self.offline_path) {
            tracing::warn!(
                offline_path = %self.offline_path,
                "app_shell does not list offline_path; it will still be cached at install"
            );
        }

        Ok(())
    }
}
