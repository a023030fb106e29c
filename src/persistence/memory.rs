//! In-process document store.

use std::sync::Mutex;

use super::document::{DocumentFilter, StoredDocument};
use super::store::{DocumentStore, Result, StoreError};

/// A store that keeps documents in memory. Contents are lost on exit.
#[derive(Default)]
pub struct MemoryStore {
    docs: Mutex<Vec<StoredDocument>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns every stored document in insertion order.
    pub fn snapshot(&self) -> Result<Vec<StoredDocument>> {
        self.find(&DocumentFilter::default())
    }
}

impl DocumentStore for MemoryStore {
    fn insert(&self, doc: &StoredDocument) -> Result<()> {
        self.docs
            .lock()
            .map_err(|_| StoreError::Poisoned)?
            .push(doc.clone());
        Ok(())
    }

    fn find(&self, filter: &DocumentFilter) -> Result<Vec<StoredDocument>> {
        let docs = self.docs.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(docs.iter().filter(|d| filter.matches(d)).cloned().collect())
    }
}
