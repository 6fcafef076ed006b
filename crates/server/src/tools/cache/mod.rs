//! Cache-related MCP tools.
//!
//! This module provides tools for inspecting the cache store.

pub mod list;

pub use list::{CacheListParams, list_impl};
