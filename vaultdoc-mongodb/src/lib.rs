//! MongoDB backend implementation for vaultdoc.
//!
//! This crate provides a MongoDB-based implementation of the `StoreBackend` trait.
//! Documents are addressed by their `_id`; saves are replace-with-upsert operations.
//!
//! To use this backend, include the `mongodb` feature in your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! vaultdoc = { version = "x.y.z", features = ["mongodb"] }
//! ```
//!
//! # Connection
//!
//! The builder parses the connection string and, unless disabled, pings the server so
//! that an unreachable deployment is reported when the store is built rather than on the
//! first save.
//!
//! # Example
//!
//! ```ignore
//! use vaultdoc::{backend::StoreBackendBuilder, mongodb::MongoDbStore};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = MongoDbStore::builder("mongodb://localhost:27017", "my_database")
//!         .build()
//!         .await?;
//!
//!     Ok(())
//! }
//! ```

#[allow(unused_extern_crates)]
extern crate self as vaultdoc_mongodb;

pub mod store;

pub use store::{MongoDbStore, MongoDbStoreBuilder};
