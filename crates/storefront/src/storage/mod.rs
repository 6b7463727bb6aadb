//! Cart persistence adapters.
//!
//! # Backends
//!
//! - [`local`] - synchronous key-value store holding the anonymous cart under
//!   a single namespaced key (the browser-storage equivalent)
//! - [`remote`] - one document per authenticated user holding that user's
//!   cart and a last-updated timestamp
//! - [`postgres`] - `PostgreSQL` implementation of the remote document store
//!
//! Neither adapter owns cart state; the cart engine decides which one is
//! authoritative for the current identity.

pub mod local;
pub mod postgres;
pub mod remote;

pub use local::{FileKeyValueStore, KeyValueStore, LocalCartStore, MemoryKeyValueStore};
pub use postgres::PgCartDocumentStore;
pub use remote::{CartDocument, CartDocumentStore, MemoryCartDocumentStore, document_path};

use thiserror::Error;

/// Errors raised by persistence backends.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Filesystem operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Stored data could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Database operation failed.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The store refused the write because it is full.
    #[error("storage quota exceeded for {key}: {size} bytes exceeds {limit} bytes")]
    QuotaExceeded {
        /// Key being written.
        key: String,
        /// Size of the rejected value.
        size: usize,
        /// Store capacity.
        limit: usize,
    },

    /// The key cannot be stored by this backend.
    #[error("invalid storage key: {0}")]
    InvalidKey(String),

    /// Stored data violates a domain invariant.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// The backend is unreachable.
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

impl StorageError {
    /// Whether this error came from decoding stored data.
    #[must_use]
    pub const fn is_parse_error(&self) -> bool {
        matches!(self, Self::Serialization(_) | Self::DataCorruption(_))
    }
}
