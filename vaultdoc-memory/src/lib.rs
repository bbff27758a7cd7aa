//! In-memory document storage backend for vaultdoc.
//!
//! This crate provides a thread-safe, in-memory implementation of the `StoreBackend` trait.
//! It uses async-aware read-write locks for concurrent access and is ideal for development
//! and testing.
//!
//! # Quick Start
//!
//! ```ignore
//! use vaultdoc::{prelude::*, memory::InMemoryStore};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let backend = InMemoryStore::builder().build().await?;
//!     let mapper = Mapper::new(backend, EncryptionKeys::new(*b"0123456789abcdef0123456789abcdef"));
//!
//!     let mut user = UserAccount::new("alice@example.com");
//!     mapper.save(&mut user).await?;
//!
//!     Ok(())
//! }
//! ```

#[allow(unused_extern_crates)]
extern crate self as vaultdoc_memory;

pub mod store;

pub use store::{InMemoryStore, InMemoryStoreBuilder};
