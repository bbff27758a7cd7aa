//! Main vaultdoc crate providing a document mapper with transparent field encryption.
//!
//! This crate is the primary entry point for users of the vaultdoc framework.
//! It re-exports the core types and functionality from the sub-crates, the
//! `#[derive(Record)]` macro, and provides convenient access to the store backends.
//!
//! # Features
//!
//! - **Typed records** - Define records with Serde and derive their adapter
//! - **Lifecycle hooks** - Opt into validation and before/after hooks per type
//! - **Field encryption** - Sensitive fields are sealed with AES-256-GCM per collection key
//! - **Multiple backends** - In-memory and MongoDB storage behind one trait
//!
//! # Quick Start
//!
//! ```ignore
//! use vaultdoc::{prelude::*, memory::InMemoryStore};
//! use vaultdoc::bson::oid::ObjectId;
//! use serde::{Serialize, Deserialize};
//!
//! #[derive(Debug, Clone, Serialize, Deserialize, Record)]
//! #[record(validate)]
//! pub struct UserAccount {
//!     pub id: ObjectId,
//!     pub email: String,
//!     #[record(sensitive)]
//!     pub ssn: String,
//! }
//!
//! impl Validate for UserAccount {
//!     fn validate(&self) -> Vec<String> {
//!         if self.email.contains('@') { vec![] } else { vec!["email is invalid".into()] }
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     let keys = EncryptionKeys::new(*b"0123456789abcdef0123456789abcdef");
//!     let mapper = Mapper::new(InMemoryStore::new(), keys);
//!
//!     let mut user = UserAccount {
//!         id: unset_id(),
//!         email: "alice@example.com".to_string(),
//!         ssn: "078-05-1120".to_string(),
//!     };
//!
//!     // Assigns an identity, validates, encrypts `ssn` and stores the
//!     // document in the `user_account` collection.
//!     mapper.save(&mut user).await.unwrap();
//!
//!     let mut loaded = user.clone();
//!     mapper.find_by_id(user.id, &mut loaded).await.unwrap();
//!
//!     mapper.delete(&loaded).await.unwrap();
//!     mapper.shutdown().await.unwrap();
//! }
//! ```
//!
//! # Dynamic Dispatch
//!
//! A mapper can be built over a `Box<dyn DynStoreBackend>` when the backend is chosen at
//! runtime:
//!
//! ```ignore
//! use vaultdoc::{prelude::*, memory::InMemoryStore};
//!
//! let backend: Box<dyn DynStoreBackend> = Box::new(InMemoryStore::new());
//! let mapper = Mapper::new(backend, keys);
//! ```
//!
//! # Derive Errors
//!
//! `#[derive(Record)]` rejects definitions the mapper could not store safely.
//!
//! The identity field cannot be sensitive:
//!
//! ```compile_fail
//! use serde::{Deserialize, Serialize};
//! use vaultdoc::{Record, bson::oid::ObjectId};
//!
//! #[derive(Serialize, Deserialize, Record)]
//! struct Card {
//!     #[record(sensitive)]
//!     id: ObjectId,
//! }
//! ```
//!
//! Only one field can be the identity:
//!
//! ```compile_fail
//! use serde::{Deserialize, Serialize};
//! use vaultdoc::{Record, bson::oid::ObjectId};
//!
//! #[derive(Serialize, Deserialize, Record)]
//! struct Card {
//!     #[record(id)]
//!     key: ObjectId,
//!     #[record(id)]
//!     other: ObjectId,
//! }
//! ```
//!
//! Hooks must be one of `validate`, `before_create`, `before_update`, `before_save` or
//! `after_find`:
//!
//! ```compile_fail
//! use serde::{Deserialize, Serialize};
//! use vaultdoc::{Record, bson::oid::ObjectId};
//!
//! #[derive(Serialize, Deserialize, Record)]
//! #[record(before_delete)]
//! struct Card {
//!     id: ObjectId,
//! }
//! ```
//!
//! Records are structs with named fields:
//!
//! ```compile_fail
//! use serde::{Deserialize, Serialize};
//! use vaultdoc::{Record, bson::oid::ObjectId};
//!
//! #[derive(Serialize, Deserialize, Record)]
//! struct Card(ObjectId);
//! ```
//!
//! Sensitive fields are always serialized under a single name:
//!
//! ```compile_fail
//! use serde::{Deserialize, Serialize};
//! use vaultdoc::{Record, bson::oid::ObjectId};
//!
//! #[derive(Serialize, Deserialize, Record)]
//! struct Card {
//!     id: ObjectId,
//!     #[record(sensitive)]
//!     #[serde(skip_serializing_if = "Option::is_none")]
//!     number: Option<String>,
//! }
//! ```
//!
//! ```compile_fail
//! use serde::{Deserialize, Serialize};
//! use vaultdoc::{Record, bson::oid::ObjectId};
//!
//! #[derive(Serialize, Deserialize, Record)]
//! #[serde(rename_all(serialize = "camelCase"))]
//! struct Card {
//!     id: ObjectId,
//!     #[record(sensitive)]
//!     card_number: String,
//! }
//! ```
//!
//! # Backends
//!
//! - [`memory`] - Fast in-memory storage for development and testing
//! - `mongodb` - Persistent MongoDB backend (requires `mongodb` feature)

pub mod prelude;

pub use vaultdoc_core::{backend, codec, config, error, introspect, keys, mapper, naming, record};
pub use vaultdoc_macros::Record;

// Re-export BSON types for convenience
pub use bson;

/// In-memory storage backend implementations.
pub mod memory {
    pub use vaultdoc_memory::{InMemoryStore, InMemoryStoreBuilder};
}

/// MongoDB storage backend implementations.
///
/// This module is only available when the `mongodb` feature is enabled.
#[cfg(feature = "mongodb")]
pub mod mongodb {
    use vaultdoc_core::{
        backend::StoreBackendBuilder,
        config::MapperConfig,
        error::StoreResult,
        mapper::Mapper,
    };

    pub use vaultdoc_mongodb::{MongoDbStore, MongoDbStoreBuilder};

    /// Connects to the MongoDB deployment described by `config` and returns a mapper using
    /// the configured encryption keys.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Initialization`](vaultdoc_core::error::StoreError::Initialization)
    /// if the connection string is invalid or the server cannot be reached.
    pub async fn connect(config: &MapperConfig) -> StoreResult<Mapper<MongoDbStore>> {
        let store = MongoDbStore::builder(&config.connection_string, &config.database)
            .build()
            .await
            .inspect_err(|e| {
                tracing::error!(target: "vaultdoc::store", database = %config.database, error = %e, "Failed to connect");
            })?;

        Ok(Mapper::new(store, config.encryption_keys()))
    }
}
