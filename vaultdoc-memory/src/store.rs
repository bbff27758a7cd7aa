//! In-memory storage implementation for the mapper.
//!
//! This module provides a simple backend that keeps documents in HashMaps behind
//! async-safe read-write locks.

use async_trait::async_trait;
use bson::{Document, oid::ObjectId};
use mea::rwlock::RwLock;
use std::{collections::HashMap, sync::Arc};
use tracing::trace;

use vaultdoc_core::{
    backend::{StoreBackend, StoreBackendBuilder},
    error::{StoreError, StoreResult},
};

type CollectionMap = HashMap<ObjectId, Document>;
type StoreMap = HashMap<String, CollectionMap>;

/// Thread-safe in-memory document storage backend.
///
/// # Thread Safety
///
/// `InMemoryStore` is cloneable and uses an `Arc`-wrapped internal state, allowing
/// it to be safely shared across async tasks. Multiple clones of the same instance
/// share the same underlying data.
///
/// # Example
///
/// ```ignore
/// use vaultdoc_memory::InMemoryStore;
/// use vaultdoc::backend::StoreBackend;
/// use bson::{oid::ObjectId, doc};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = InMemoryStore::new();
///
///     let id = ObjectId::new();
///     store.upsert_document("users", id, doc! { "_id": id, "name": "Alice" }).await?;
///
///     let doc = store.find_document("users", id).await?;
///     assert_eq!(doc.get_str("name")?, "Alice");
///
///     Ok(())
/// }
/// ```
#[derive(Default, Clone, Debug)]
pub struct InMemoryStore {
    /// The main storage map: collection_name -> (document_id -> document)
    store: Arc<RwLock<StoreMap>>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory document store.
    pub fn new() -> Self {
        Self {
            store: Arc::new(RwLock::new(StoreMap::new())),
        }
    }

    /// Creates a builder for constructing an `InMemoryStore`.
    pub fn builder() -> InMemoryStoreBuilder {
        InMemoryStoreBuilder::default()
    }

    /// Returns the names of all collections that have been written to.
    pub async fn collection_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.store
            .read()
            .await
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }

    /// Returns the number of documents in `collection`.
    pub async fn document_count(&self, collection: &str) -> usize {
        self.store
            .read()
            .await
            .get(collection)
            .map_or(0, HashMap::len)
    }
}

#[async_trait]
impl StoreBackend for InMemoryStore {
    async fn upsert_document(&self, collection: &str, id: ObjectId, document: Document) -> StoreResult<()> {
        let replaced = self.store
            .write()
            .await
            .entry(collection.to_string())
            .or_default()
            .insert(id, document)
            .is_some();

        trace!(target: "vaultdoc::store", collection, id = %id, replaced, "Upserted document");

        Ok(())
    }

    async fn find_document(&self, collection: &str, id: ObjectId) -> StoreResult<Document> {
        self.store
            .read()
            .await
            .get(collection)
            .and_then(|col| col.get(&id))
            .cloned()
            .ok_or_else(|| StoreError::DocumentNotFound(id.to_hex(), collection.to_string()))
    }

    async fn remove_document(&self, collection: &str, id: ObjectId) -> StoreResult<()> {
        let mut store = self.store.write().await;
        let collection_map = match store.get_mut(collection) {
            Some(col) => col,
            None => return Err(StoreError::DocumentNotFound(id.to_hex(), collection.to_string())),
        };

        if collection_map.remove(&id).is_none() {
            return Err(StoreError::DocumentNotFound(id.to_hex(), collection.to_string()));
        }

        Ok(())
    }
}

/// Builder for constructing [`InMemoryStore`] instances.
#[derive(Default)]
pub struct InMemoryStoreBuilder;

#[async_trait]
impl StoreBackendBuilder for InMemoryStoreBuilder {
    type Backend = InMemoryStore;

    /// Builds and returns a new [`InMemoryStore`] instance.
    ///
    /// This always succeeds and returns a freshly initialized store.
    async fn build(self) -> StoreResult<Self::Backend> {
        Ok(InMemoryStore::new())
    }
}
