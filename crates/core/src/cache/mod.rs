//! Named, versioned response caches.
//!
//! This module defines the `CacheStore` contract the worker runs against and
//! two implementations of it:
//!
//! - `CacheDb`: persistent SQLite store via tokio-rusqlite (WAL mode,
//!   automatic schema migrations)
//! - `MemoryStore`: process-local store for tests and ephemeral hosts

pub mod connection;
pub mod entries;
pub mod hash;
pub mod memory;
pub mod migrations;
pub mod store;

pub use crate::Error;

pub use connection::CacheDb;
pub use memory::MemoryStore;
pub use store::{CacheStore, StoredResponse};
