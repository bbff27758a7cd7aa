//! Convenient re-exports of commonly used types from vaultdoc.
//!
//! ```ignore
//! use vaultdoc::prelude::*;
//! ```
//!
//! This provides access to:
//! - The record trait, derive macro and hook traits
//! - The mapper and its typed collection handle
//! - Store backends and builders
//! - Keys, configuration and error types

pub use vaultdoc_core::{
    backend::{DynStoreBackend, StoreBackend, StoreBackendBuilder},
    config::MapperConfig,
    error::{MapperError, MapperResult, StoreError, StoreResult},
    keys::EncryptionKeys,
    mapper::{Mapper, RecordCollection},
    record::{AfterFind, BeforeCreate, BeforeSave, BeforeUpdate, Capabilities, Record, Validate, is_unset, unset_id},
};
pub use vaultdoc_macros::Record;
