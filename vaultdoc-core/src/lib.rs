//! A document mapper that persists typed records in a schemaless store and transparently
//! encrypts selected fields per collection.
//!
//! This crate is the core of the vaultdoc project and provides:
//!
//! - **Record adapter** ([`record`]) - The per-type trait and optional lifecycle hooks
//! - **Field introspection** ([`introspect`]) - Read and write record fields by name
//! - **Collection naming** ([`naming`]) - Type name to snake case collection names
//! - **Key resolution** ([`keys`]) - Per-collection encryption keys with a global default
//! - **Encryption codec** ([`codec`]) - Record to document conversion with sealed fields
//! - **Store backend abstraction** ([`backend`]) - The minimal store contract
//! - **Lifecycle mapper** ([`mapper`]) - Save, find and delete protocols
//! - **Configuration** ([`config`]) - Connection and key settings
//! - **Error handling** ([`error`]) - Error types and result types
//!
//! # Example
//!
//! ```ignore
//! use vaultdoc::{prelude::*, memory::InMemoryStore};
//! use bson::oid::ObjectId;
//! use serde::{Serialize, Deserialize};
//!
//! #[derive(Debug, Clone, Serialize, Deserialize)]
//! pub struct CreditCard {
//!     pub id: ObjectId,
//!     pub holder: String,
//!     pub number: String,
//! }
//!
//! impl Record for CreditCard {
//!     fn id(&self) -> ObjectId { self.id }
//!     fn set_id(&mut self, id: ObjectId) { self.id = id; }
//!     fn sensitive_fields() -> &'static [&'static str] { &["number"] }
//! }
//! ```

#[allow(unused_extern_crates)]
extern crate self as vaultdoc_core;

pub mod backend;
pub mod codec;
pub mod config;
pub mod error;
pub mod introspect;
pub mod keys;
pub mod mapper;
pub mod naming;
pub mod record;
