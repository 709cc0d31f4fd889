//! StateStore: redb-backed document collections.
//!
//! Each collection is a redb table keyed by document id. Values are the
//! document's field map serialized as JSON. The store supports both on-disk
//! and in-memory backends (the latter for testing).

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use redb::{Database, ReadableDatabase, ReadableTable, ReadableTableMetadata};
use serde_json::Value;
use tracing::debug;

use crate::error::{StateError, StateResult};
use crate::gateway::{DocumentStore, StoreConnector};
use crate::tables::table_for;
use crate::types::*;

/// Convert any `Display` error into a `StateError` variant via a closure factory.
macro_rules! map_err {
    ($variant:ident) => {
        |e| StateError::$variant(e.to_string())
    };
}

/// Thread-safe document store backed by redb.
#[derive(Clone)]
pub struct StateStore {
    db: Arc<Database>,
}

impl StateStore {
    /// Open (or create) a persistent store at the given path.
    pub fn open(path: &Path) -> StateResult<Self> {
        let db = Database::create(path).map_err(map_err!(Open))?;
        let store = Self { db: Arc::new(db) };
        store.ensure_tables()?;
        debug!(?path, "state store opened");
        Ok(store)
    }

    /// Create an ephemeral in-memory store (for testing).
    pub fn open_in_memory() -> StateResult<Self> {
        let backend = redb::backends::InMemoryBackend::new();
        let db = Database::builder()
            .create_with_backend(backend)
            .map_err(map_err!(Open))?;
        let store = Self { db: Arc::new(db) };
        store.ensure_tables()?;
        debug!("in-memory state store opened");
        Ok(store)
    }

    /// Create all collection tables if they don't exist yet.
    fn ensure_tables(&self) -> StateResult<()> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        // Opening a table in a write transaction creates it if absent.
        for collection in Collection::ALL {
            txn.open_table(table_for(collection))
                .map_err(map_err!(Table))?;
        }
        txn.commit().map_err(map_err!(Transaction))?;
        Ok(())
    }

    /// Insert or replace a document.
    pub fn put_document(&self, collection: Collection, document: &Document) -> StateResult<()> {
        let value = serde_json::to_vec(&document.fields).map_err(map_err!(Serialize))?;
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        {
            let mut table = txn
                .open_table(table_for(collection))
                .map_err(map_err!(Table))?;
            table
                .insert(document.id.as_str(), value.as_slice())
                .map_err(map_err!(Write))?;
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(%collection, id = %document.id, "document stored");
        Ok(())
    }

    /// Get a document by id.
    pub fn get_document(&self, collection: Collection, id: &str) -> StateResult<Option<Document>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn
            .open_table(table_for(collection))
            .map_err(map_err!(Table))?;
        match table.get(id).map_err(map_err!(Read))? {
            Some(guard) => Ok(Some(decode(id, guard.value())?)),
            None => Ok(None),
        }
    }

    /// List every document in a collection, in key order.
    pub fn list_documents(&self, collection: Collection) -> StateResult<Vec<Document>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn
            .open_table(table_for(collection))
            .map_err(map_err!(Table))?;
        let mut results = Vec::new();
        for entry in table.iter().map_err(map_err!(Read))? {
            let (key, value) = entry.map_err(map_err!(Read))?;
            results.push(decode(key.value(), value.value())?);
        }
        Ok(results)
    }

    /// Delete a document by id. Returns true if it existed.
    pub fn delete_document(&self, collection: Collection, id: &str) -> StateResult<bool> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        let existed;
        {
            let mut table = txn
                .open_table(table_for(collection))
                .map_err(map_err!(Table))?;
            existed = table.remove(id).map_err(map_err!(Write))?.is_some();
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(%collection, %id, existed, "document deleted");
        Ok(existed)
    }

    /// Number of documents in a collection.
    pub fn count(&self, collection: Collection) -> StateResult<u64> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn
            .open_table(table_for(collection))
            .map_err(map_err!(Table))?;
        table.len().map_err(map_err!(Read))
    }
}

fn decode(id: &str, bytes: &[u8]) -> StateResult<Document> {
    let value: Value = serde_json::from_slice(bytes).map_err(map_err!(Deserialize))?;
    match value {
        Value::Object(fields) => Ok(Document {
            id: id.to_string(),
            fields,
        }),
        _ => Err(StateError::NotAnObject(id.to_string())),
    }
}

#[async_trait]
impl DocumentStore for StateStore {
    async fn fetch_all(&self, collection: Collection) -> StateResult<Vec<Document>> {
        self.list_documents(collection)
    }

    async fn delete(&self, collection: Collection, id: &str) -> StateResult<bool> {
        self.delete_document(collection, id)
    }

    async fn put(&self, collection: Collection, document: &Document) -> StateResult<()> {
        self.put_document(collection, document)
    }
}

/// Location of an on-disk store, opened fresh on every
/// [`StoreConnector::connect`]. The file lock is released once the last
/// handle from a pass is dropped.
#[derive(Debug, Clone)]
pub struct StoreFile {
    path: PathBuf,
}

impl StoreFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl StoreConnector for StoreFile {
    fn connect(&self) -> StateResult<Arc<dyn DocumentStore>> {
        Ok(Arc::new(StateStore::open(&self.path)?))
    }
}
