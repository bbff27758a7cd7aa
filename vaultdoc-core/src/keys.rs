//! Encryption key resolution per collection.

use std::{collections::HashMap, fmt};

/// The key material the mapper encrypts with.
///
/// A collection uses its own key when one is configured and the global default otherwise.
/// Keys are configuration and are never written into stored documents.
#[derive(Clone, Default)]
pub struct EncryptionKeys {
    default: Vec<u8>,
    per_collection: HashMap<String, Vec<u8>>,
}

impl EncryptionKeys {
    /// Creates a key set with only a global default key.
    pub fn new(default: impl Into<Vec<u8>>) -> Self {
        Self {
            default: default.into(),
            per_collection: HashMap::new(),
        }
    }

    /// Adds or replaces the key used for `collection`.
    pub fn with_collection_key(mut self, collection: impl Into<String>, key: impl Into<Vec<u8>>) -> Self {
        self.per_collection.insert(collection.into(), key.into());
        self
    }

    /// Returns the key for `collection`, falling back to the global default.
    pub fn key_for(&self, collection: &str) -> &[u8] {
        self.per_collection
            .get(collection)
            .map(Vec::as_slice)
            .unwrap_or(&self.default)
    }

    /// Returns `true` if `collection` has its own key.
    pub fn has_override(&self, collection: &str) -> bool {
        self.per_collection.contains_key(collection)
    }
}

impl fmt::Debug for EncryptionKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut collections: Vec<&str> = self.per_collection.keys().map(String::as_str).collect();
        collections.sort_unstable();

        f.debug_struct("EncryptionKeys")
            .field("default", &"<redacted>")
            .field("per_collection", &collections)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn falls_back_to_default_key() {
        let keys = EncryptionKeys::new(*b"0123456789abcdef0123456789abcdef")
            .with_collection_key("credit_card", *b"ffffffffffffffffffffffffffffffff");

        assert_eq!(keys.key_for("user_account"), b"0123456789abcdef0123456789abcdef");
        assert_eq!(keys.key_for("credit_card"), b"ffffffffffffffffffffffffffffffff");
        assert!(keys.has_override("credit_card"));
        assert!(!keys.has_override("user_account"));
    }

    #[test]
    fn override_lookup_is_exact_match() {
        let keys = EncryptionKeys::new("default").with_collection_key("user", "special");

        assert_eq!(keys.key_for("user"), b"special");
        assert_eq!(keys.key_for("users"), b"default");
        assert_eq!(keys.key_for("User"), b"default");
    }

    #[test]
    fn debug_output_hides_key_material() {
        let keys = EncryptionKeys::new("top-secret").with_collection_key("user", "also-secret");
        let rendered = format!("{keys:?}");

        assert!(!rendered.contains("top-secret"));
        assert!(!rendered.contains("also-secret"));
        assert!(rendered.contains("user"));
    }
}
