//! Error types and result types for mapper and store operations.
//!
//! Two layers of errors exist:
//!
//! - [`StoreError`] is what a [`StoreBackend`](crate::backend::StoreBackend) reports.
//! - [`MapperError`] is what the [`Mapper`](crate::mapper::Mapper) returns to callers. Store
//!   failures are wrapped in [`MapperError::Store`] unchanged.
//!
//! A [`PreconditionFault`] is deliberately not part of either enum. It describes a defect in a
//! record type definition and stops the operation through [`precondition_fault`] instead of
//! travelling through the `Result` channel.

use bson::error::Error as BsonError;
use std::fmt;
use thiserror::Error;

/// Represents all possible errors that can be surfaced by a store backend.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Error during store initialization or connection setup.
    #[error("Initialization error: {0}")]
    Initialization(String),
    /// The requested document was not found in the collection.
    /// The first argument is the document ID, the second is the collection name.
    #[error("Document {0} not found in collection {1}")]
    DocumentNotFound(String, String),
    /// The backend received or produced a document it cannot handle.
    #[error("Invalid document: {0}")]
    InvalidDocument(String),
    /// An error occurred in the underlying storage backend.
    #[error("Backend error: {0}")]
    Backend(String),
}

/// A specialized `Result` type for store backend operations.
pub type StoreResult<T> = Result<T, StoreError>;

impl From<BsonError> for StoreError {
    fn from(err: BsonError) -> Self {
        StoreError::InvalidDocument(err.to_string())
    }
}

/// Errors returned by the lifecycle mapper.
///
/// Exactly one variant is produced per failed call. A save rejected by the record's own
/// validation yields [`MapperError::Validation`] and never touches the store, so callers can
/// tell field-level rejections apart from infrastructure failures with [`MapperError::violations`].
#[derive(Error, Debug)]
pub enum MapperError {
    /// A named field could not be read from or written to a record.
    #[error("Field access error: {0}")]
    FieldAccess(String),
    /// The record rejected itself. Messages are kept in the order the record produced them.
    #[error("Validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),
    /// Key material was unusable or a sealed value failed to open.
    #[error("Encryption error: {0}")]
    Encryption(String),
    /// The record has no identity yet, so there is nothing to address in the store.
    #[error("Record has no identity assigned")]
    UnsetIdentity,
    /// The store backend failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl MapperError {
    /// Returns the validation messages when this error is a validation rejection.
    pub fn violations(&self) -> Option<&[String]> {
        match self {
            MapperError::Validation(messages) => Some(messages),
            _ => None,
        }
    }

    /// Returns `true` when the store reported that the addressed document does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, MapperError::Store(StoreError::DocumentNotFound(..)))
    }
}

/// A specialized `Result` type for mapper operations.
pub type MapperResult<T> = Result<T, MapperError>;

/// A defect in a record type definition, such as a serialized form without the identity field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreconditionFault {
    /// Unqualified name of the offending record type.
    pub type_name: &'static str,
    /// What the type failed to provide.
    pub reason: String,
}

impl fmt::Display for PreconditionFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "precondition fault in record type {}: {}", self.type_name, self.reason)
    }
}

/// Stops the current operation because of a [`PreconditionFault`].
///
/// The fault is logged and then raised as a panic. It is never converted into a
/// [`MapperError`], so it cannot be handled and ignored like a runtime failure.
#[track_caller]
pub fn precondition_fault(fault: PreconditionFault) -> ! {
    tracing::error!(target: "vaultdoc::mapper", type_name = fault.type_name, reason = %fault.reason, "record type violates mapper precondition");
    panic!("{fault}")
}
