//! Storage backend abstraction for the mapper.
//!
//! This module defines the minimal store contract the mapper relies on: upsert, find and
//! remove a single document by identity within a named collection. Connection management,
//! transport and query execution stay inside the implementations.
//!
//! # Traits
//!
//! - [`StoreBackend`]: The core trait for storage backends
//! - [`DynStoreBackend`]: A trait for dynamic dispatch over backend implementations
//! - [`StoreBackendBuilder`]: Factory trait for creating backend instances
//!
//! # Examples
//!
//! ```ignore
//! use vaultdoc::backend::StoreBackend;
//! use bson::{oid::ObjectId, doc};
//!
//! let backend = MyBackendImpl::new();
//!
//! let id = ObjectId::new();
//! backend.upsert_document("users", id, doc! { "_id": id, "name": "Alice" }).await?;
//! let found = backend.find_document("users", id).await?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use async_trait::async_trait;
use bson::{Document, oid::ObjectId};
use std::{any::Any, fmt::Debug};

use crate::error::StoreResult;

/// Abstract interface for document storage backends.
///
/// # Thread Safety
///
/// All implementations must be thread-safe and support concurrent access from multiple
/// async tasks. The mapper holds no locks of its own, so whatever serialization of
/// concurrent calls a backend needs is its own responsibility.
///
/// # Error Handling
///
/// Operations return [`StoreResult<T>`](crate::error::StoreResult). A missing document is
/// reported as [`StoreError::DocumentNotFound`](crate::error::StoreError::DocumentNotFound).
#[async_trait]
pub trait StoreBackend: Send + Sync + Debug {
    /// Inserts `document` under `id`, replacing any existing document with that identity.
    ///
    /// The collection is created if it does not exist yet. `document` carries its own
    /// `_id` entry equal to `id`.
    async fn upsert_document(
        &self,
        collection: &str,
        id: ObjectId,
        document: Document,
    ) -> StoreResult<()>;

    /// Returns the document stored under `id`.
    ///
    /// Returns [`StoreError::DocumentNotFound`](crate::error::StoreError::DocumentNotFound)
    /// if no such document exists.
    async fn find_document(&self, collection: &str, id: ObjectId) -> StoreResult<Document>;

    /// Removes the document stored under `id`.
    ///
    /// Returns [`StoreError::DocumentNotFound`](crate::error::StoreError::DocumentNotFound)
    /// if no such document exists.
    async fn remove_document(&self, collection: &str, id: ObjectId) -> StoreResult<()>;

    /// Cleanly shuts down the backend, releasing all resources.
    ///
    /// The default implementation is a no-op, but backends with external connections
    /// should override this.
    async fn shutdown(self) -> StoreResult<()>
    where
        Self: Sized,
    {
        Ok(())
    }
}

#[async_trait]
impl<B> StoreBackend for &B
where
    B: StoreBackend,
{
    async fn upsert_document(
        &self,
        collection: &str,
        id: ObjectId,
        document: Document,
    ) -> StoreResult<()> {
        (*self)
            .upsert_document(collection, id, document)
            .await
    }

    async fn find_document(&self, collection: &str, id: ObjectId) -> StoreResult<Document> {
        (*self).find_document(collection, id).await
    }

    async fn remove_document(&self, collection: &str, id: ObjectId) -> StoreResult<()> {
        (*self).remove_document(collection, id).await
    }
}

/// Object-safe counterpart of [`StoreBackend`] for selecting a backend at runtime.
///
/// Every [`StoreBackend`] implements it, and `Box<dyn DynStoreBackend>` is a
/// [`StoreBackend`] again, so a mapper can be built over a boxed backend.
#[async_trait]
pub trait DynStoreBackend: Send + Sync + Debug {
    async fn upsert_document(
        &self,
        collection: &str,
        id: ObjectId,
        document: Document,
    ) -> StoreResult<()>;
    async fn find_document(&self, collection: &str, id: ObjectId) -> StoreResult<Document>;
    async fn remove_document(&self, collection: &str, id: ObjectId) -> StoreResult<()>;
    async fn shutdown_boxed(self: Box<Self>) -> StoreResult<()>;

    fn as_any(&self) -> &dyn Any;
    fn into_any(self: Box<Self>) -> Box<dyn Any>;
}

#[async_trait]
impl<B: StoreBackend + 'static> DynStoreBackend for B {
    async fn upsert_document(
        &self,
        collection: &str,
        id: ObjectId,
        document: Document,
    ) -> StoreResult<()> {
        StoreBackend::upsert_document(self, collection, id, document).await
    }

    async fn find_document(&self, collection: &str, id: ObjectId) -> StoreResult<Document> {
        StoreBackend::find_document(self, collection, id).await
    }

    async fn remove_document(&self, collection: &str, id: ObjectId) -> StoreResult<()> {
        StoreBackend::remove_document(self, collection, id).await
    }

    async fn shutdown_boxed(self: Box<Self>) -> StoreResult<()> {
        StoreBackend::shutdown(*self).await
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }
}

#[async_trait]
impl StoreBackend for Box<dyn DynStoreBackend> {
    async fn upsert_document(
        &self,
        collection: &str,
        id: ObjectId,
        document: Document,
    ) -> StoreResult<()> {
        (**self)
            .upsert_document(collection, id, document)
            .await
    }

    async fn find_document(&self, collection: &str, id: ObjectId) -> StoreResult<Document> {
        (**self).find_document(collection, id).await
    }

    async fn remove_document(&self, collection: &str, id: ObjectId) -> StoreResult<()> {
        (**self).remove_document(collection, id).await
    }

    async fn shutdown(self) -> StoreResult<()> {
        self.shutdown_boxed().await
    }
}

/// Factory trait for constructing backends, possibly asynchronously.
#[async_trait]
pub trait StoreBackendBuilder {
    type Backend: StoreBackend;

    async fn build(self) -> StoreResult<Self::Backend>;
}
