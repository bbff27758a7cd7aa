//! Mapper configuration.
//!
//! The mapper consumes configuration but does not load it. Host applications deserialize a
//! [`MapperConfig`] from wherever they keep settings; [`MapperConfig::from_json`] covers the
//! common case of a JSON blob.

use serde::{Deserialize, Serialize};
use std::{collections::HashMap, fmt};

use crate::{
    error::{StoreError, StoreResult},
    keys::EncryptionKeys,
};

/// Settings needed to connect a mapper to a store and encrypt its records.
///
/// Keys are the raw bytes of the configured strings, so a 32 character ASCII string is a
/// valid AES-256 key.
///
/// # Example
///
/// ```ignore
/// let config = MapperConfig::from_json(r#"{
///     "connection_string": "mongodb://localhost:27017",
///     "database": "app",
///     "encryption_key": "0123456789abcdef0123456789abcdef",
///     "encryption_key_per_collection": { "credit_card": "ffffffffffffffffffffffffffffffff" }
/// }"#)?;
/// ```
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct MapperConfig {
    pub connection_string: String,
    pub database: String,
    pub encryption_key: String,
    #[serde(default)]
    pub encryption_key_per_collection: HashMap<String, String>,
}

impl MapperConfig {
    /// Parses a configuration from JSON.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Initialization`] if the JSON is malformed or incomplete.
    pub fn from_json(json: &str) -> StoreResult<Self> {
        serde_json::from_str(json).map_err(|e| StoreError::Initialization(format!("invalid mapper config: {e}")))
    }

    /// Builds the key set described by this configuration.
    pub fn encryption_keys(&self) -> EncryptionKeys {
        self.encryption_key_per_collection
            .iter()
            .fold(
                EncryptionKeys::new(self.encryption_key.as_bytes()),
                |keys, (collection, key)| keys.with_collection_key(collection.clone(), key.as_bytes()),
            )
    }
}

impl fmt::Debug for MapperConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MapperConfig")
            .field("connection_string", &self.connection_string)
            .field("database", &self.database)
            .field("encryption_key", &"<redacted>")
            .field(
                "encryption_key_per_collection",
                &self.encryption_key_per_collection.keys().collect::<Vec<_>>(),
            )
            .finish()
    }
}
