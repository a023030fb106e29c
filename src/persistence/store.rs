//! Document store abstraction.

use std::io;

use thiserror::Error;

use super::document::{DocumentFilter, StoredDocument};

/// Errors from store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// IO error during file operations.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A writer panicked while holding the store lock.
    #[error("store lock poisoned")]
    Poisoned,

    /// The blocking task running a store call failed.
    #[error("store task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    /// The store URI has no supported scheme.
    #[error("unsupported store URI: {uri}")]
    UnsupportedUri { uri: String },
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// An append-only collection of [`StoredDocument`]s.
///
/// Implementations are blocking; async callers go through
/// [`PersistenceGateway`](super::PersistenceGateway), which moves calls onto
/// the blocking pool. Every insert is an independent append: there is no
/// uniqueness constraint and no update.
pub trait DocumentStore: Send + Sync {
    /// Appends one document. Returns once the document is durable.
    fn insert(&self, doc: &StoredDocument) -> Result<()>;

    /// Returns matching documents in insertion order.
    fn find(&self, filter: &DocumentFilter) -> Result<Vec<StoredDocument>>;
}
