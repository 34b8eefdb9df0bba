//! Shared Error Types
//!
//! Error types for the two fallible collaborators this crate consumes: the
//! local persistent store and the remote chat backend.
//!
//! # Error Categories
//!
//! - `StorageError` - local persistence failures; swallowed at the cache
//!   boundary and never surfaced to the UI
//! - `BackendError` - remote send/query failures; turned into a visible
//!   `failed` status on the affected entry
use thiserror::Error;

/// Failure of the local persistent key-value store.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Filesystem error while locating or creating the store
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// SQLite error from the connection pool
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A blob failed to encode or decode as JSON
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Failure reported by the remote chat backend.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// The backend was unreachable
    #[error("network failure: {message}")]
    Network {
        /// Human-readable error message
        message: String,
    },

    /// The session is missing or expired
    #[error("unauthenticated: {message}")]
    Unauthenticated {
        /// Human-readable error message
        message: String,
    },

    /// The backend rejected the operation
    #[error("rejected by server: {message}")]
    Rejected {
        /// Human-readable error message
        message: String,
    },
}

impl BackendError {
    /// Create a new network error.
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    /// Create a new authentication error.
    pub fn unauthenticated(message: impl Into<String>) -> Self {
        Self::Unauthenticated {
            message: message.into(),
        }
    }

    /// Create a new rejection error.
    pub fn rejected(message: impl Into<String>) -> Self {
        Self::Rejected {
            message: message.into(),
        }
    }
}
