//! Core types and shared functionality for swcache.
//!
//! This crate provides:
//! - Cache store abstraction with SQLite and in-memory backends
//! - Versioned cache generation naming
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;
pub mod generation;

pub use cache::{CacheDb, CacheStore, MemoryStore, StoredResponse};
pub use config::{AppConfig, ConfigError};
pub use error::Error;
pub use generation::{CacheRole, GenerationName, LiveSet};
