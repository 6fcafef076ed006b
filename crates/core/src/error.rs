//! Unified error types for swcache.
//!
//! Each variant carries a stable upper-case code in its display string so
//! hosts can match on failures without parsing free text.

use rmcp::model::{ErrorCode, ErrorData as McpError};
use tokio_rusqlite::rusqlite;

/// Unified error types for the swcache worker.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid input parameters (e.g., empty URL).
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// Invalid URL.
    #[error("INVALID_URL: {0}")]
    InvalidUrl(String),

    /// The network could not be reached for this request.
    #[error("NETWORK_UNREACHABLE: {0}")]
    NetworkUnreachable(String),

    /// A network response that must not be persisted (non-200 or not same-origin).
    #[error("INVALID_RESPONSE: status {status} ({kind})")]
    InvalidResponse { status: u16, kind: String },

    /// Neither cache nor network produced a response.
    #[error("NO_RESPONSE: {0}")]
    NoResponse(String),

    /// Fetch response too large.
    #[error("FETCH_TOO_LARGE: {0}")]
    FetchTooLarge(String),

    /// A cache generation was addressed before being opened.
    #[error("CACHE_NOT_FOUND: {0}")]
    CacheNotFound(String),

    /// Generic store failure reported by a non-SQLite backend.
    #[error("CACHE_ERROR: {0}")]
    Store(String),

    /// Database operation failed.
    #[error("CACHE_ERROR: {0}")]
    Database(tokio_rusqlite::Error),

    /// Migration failed to apply.
    #[error("CACHE_ERROR: migration failed: {0}")]
    MigrationFailed(String),

    /// Install could not secure the offline fallback document.
    #[error("INSTALL_FAILED: {0}")]
    InstallFailed(String),

    /// Illegal lifecycle transition.
    #[error("LIFECYCLE_ERROR: {0}")]
    Lifecycle(String),
}

impl From<tokio_rusqlite::Error<Error>> for Error {
    fn from(err: tokio_rusqlite::Error<Error>) -> Self {
        match err {
            tokio_rusqlite::Error::Error(e) => e,
            tokio_rusqlite::Error::ConnectionClosed => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
            tokio_rusqlite::Error::Close(c) => Error::Database(tokio_rusqlite::Error::Close(c)),
            _ => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
        }
    }
}

impl From<tokio_rusqlite::Error<rusqlite::Error>> for Error {
    fn from(err: tokio_rusqlite::Error<rusqlite::Error>) -> Self {
        Error::Database(err)
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Database(tokio_rusqlite::Error::Error(err))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Store(format!("snapshot encoding: {err}"))
    }
}

impl From<Error> for McpError {
    fn from(err: Error) -> Self {
        let (code, message) = match &err {
            Error::InvalidInput(msg) => (-32602, msg.clone()),
            Error::InvalidUrl(msg) => (-32003, msg.clone()),
            Error::NetworkUnreachable(msg) => (-32004, msg.clone()),
            Error::InvalidResponse { .. } => (-32005, err.to_string()),
            Error::NoResponse(msg) => (-32006, msg.clone()),
            Error::FetchTooLarge(msg) => (-32007, msg.clone()),
            Error::CacheNotFound(msg) => (-32001, msg.clone()),
            Error::Store(msg) => (-32002, msg.clone()),
            Error::Database(e) => (-32002, e.to_string()),
            Error::MigrationFailed(msg) => (-32002, msg.clone()),
            Error::InstallFailed(msg) => (-32008, msg.clone()),
            Error::Lifecycle(msg) => (-32009, msg.clone()),
        };

        McpError { code: ErrorCode(code), message: message.into(), data: None }
    }
}
