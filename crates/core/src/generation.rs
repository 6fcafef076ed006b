//! Versioned cache generation names.
//!
//! Every generation is addressed as `<prefix>-<role>-<version>`. The prefix is
//! reserved for this worker: reconciliation only ever deletes names that carry
//! it, so unrelated caches sharing the store are left alone.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Functional class of entries held by a generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum CacheRole {
    /// App shell populated at install time.
    StaticShell,
    /// Network-first responses written at runtime.
    Dynamic,
    /// Stale-while-revalidate snippet data.
    SnippetData,
}

impl CacheRole {
    pub const ALL: [CacheRole; 3] = [CacheRole::StaticShell, CacheRole::Dynamic, CacheRole::SnippetData];

    /// Name segment used inside generation names.
    pub fn slug(self) -> &'static str {
        match self {
            CacheRole::StaticShell => "static",
            CacheRole::Dynamic => "dynamic",
            CacheRole::SnippetData => "snippets",
        }
    }
}

impl fmt::Display for CacheRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

/// A fully qualified generation name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GenerationName {
    role: CacheRole,
    version: String,
    name: String,
}

impl GenerationName {
    pub fn new(prefix: &str, role: CacheRole, version: &str) -> Self {
        Self { role, version: version.to_string(), name: format!("{prefix}-{}-{version}", role.slug()) }
    }

    pub fn role(&self) -> CacheRole {
        self.role
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn as_str(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for GenerationName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Generation names considered current for one version.
#[derive(Debug, Clone)]
pub struct LiveSet {
    prefix: String,
    names: BTreeSet<String>,
}

impl LiveSet {
    /// Compute the live set for `version` under the reserved `prefix`.
    pub fn new(prefix: &str, version: &str) -> Self {
        let names = CacheRole::ALL
            .iter()
            .map(|role| GenerationName::new(prefix, *role, version).as_str().to_string())
            .collect();
        Self { prefix: prefix.to_string(), names }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    /// Whether `name` belongs to this worker's reserved naming scheme.
    pub fn is_reserved(&self, name: &str) -> bool {
        name.strip_prefix(&self.prefix).is_some_and(|rest| rest.starts_with('-'))
    }

    /// Whether `name` is reserved but not live, and so should be deleted.
    pub fn is_stale(&self, name: &str) -> bool {
        self.is_reserved(name) && !self.contains(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }
}
