//! Error types for panerelay-core
//!
//! Malformed transcript lines and stale offsets never surface here: the parser
//! skips them and the tailer resynchronizes. Only conditions the caller has to
//! decide on are represented.

use thiserror::Error;

/// Main error type for the panerelay-core library
#[derive(Error, Debug)]
pub enum Error {
    /// Database error
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// An externally supplied identifier failed validation
    #[error("invalid {field} {value:?}: {reason}")]
    InvalidIdentifier {
        field: &'static str,
        value: String,
        reason: String,
    },

    /// Provider name is not registered
    #[error("unknown provider {name:?} (registered: {})", .available.join(", "))]
    UnknownProvider { name: String, available: Vec<String> },

    /// Provider lacks the capability needed for the request
    #[error("provider {provider} does not support {capability}")]
    Unsupported {
        provider: String,
        capability: &'static str,
    },

    /// Poll requested for a session the tailer is not tracking
    #[error("session not tracked: {0}")]
    SessionNotTracked(String),
}

/// Result type alias for panerelay-core
pub type Result<T> = std::result::Result<T, Error>;
