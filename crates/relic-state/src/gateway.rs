//! The persistence gateway seam.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::StateResult;
use crate::types::{Collection, Document};

/// Document store holding the server collections, injected for testability.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetch a fresh snapshot of every document in the collection.
    async fn fetch_all(&self, collection: Collection) -> StateResult<Vec<Document>>;

    /// Delete a document by id. Returns true if it existed.
    async fn delete(&self, collection: Collection, id: &str) -> StateResult<bool>;

    /// Insert or replace a document.
    async fn put(&self, collection: Collection, document: &Document) -> StateResult<()>;
}

/// Hands out a store for the length of one reconciliation pass.
///
/// A file-backed store holds an exclusive lock while open, so the daemon
/// connects per pass and leaves the file free for the provisioning side in
/// between.
pub trait StoreConnector: Send + Sync {
    fn connect(&self) -> StateResult<Arc<dyn DocumentStore>>;
}

/// An already-open store, returned as-is on every connect.
impl StoreConnector for Arc<dyn DocumentStore> {
    fn connect(&self) -> StateResult<Arc<dyn DocumentStore>> {
        Ok(Arc::clone(self))
    }
}
