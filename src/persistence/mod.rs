//! Persistence layer for webhook records.
//!
//! Every inbound item becomes an append-only `event_in` record followed by
//! one `event_confirm` or `event_force_confirm` record that points back at
//! it. Nothing is ever updated or deleted.
//!
//! # Backends
//!
//! The backend is selected from the store URI:
//!
//! - `memory://` keeps records in process ([`MemoryStore`])
//! - `file:///var/lib/page-webhook` or a bare path writes JSON Lines files
//!   under that directory ([`JsonlStore`])
//!
//! # File Layout
//!
//! ```text
//! <root>/<db>/<collection>.jsonl
//! ```

use std::path::Path;
use std::sync::Arc;

pub mod document;
pub mod gateway;
pub mod jsonl;
pub mod memory;
pub mod store;

pub use document::{DocumentFilter, StoredDocument};
pub use gateway::{Incoming, PersistenceGateway, RecordReceipt};
pub use jsonl::JsonlStore;
pub use memory::MemoryStore;
pub use store::{DocumentStore, StoreError};

const MEMORY_URI: &str = "memory://";
const FILE_SCHEME: &str = "file://";

/// Opens the store named by `uri`.
pub fn open_store(
    uri: &str,
    db: &str,
    collection: &str,
) -> Result<Arc<dyn DocumentStore>, StoreError> {
    if uri == MEMORY_URI {
        return Ok(Arc::new(MemoryStore::new()));
    }

    let root = match uri.strip_prefix(FILE_SCHEME) {
        Some(path) => path,
        None if !uri.contains("://") => uri,
        None => {
            return Err(StoreError::UnsupportedUri {
                uri: uri.to_string(),
            });
        }
    };
    if root.is_empty() {
        return Err(StoreError::UnsupportedUri {
            uri: uri.to_string(),
        });
    }

    let store = JsonlStore::open_collection(Path::new(root), db, collection)?;
    Ok(Arc::new(store))
}
