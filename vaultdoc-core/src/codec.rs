//! Conversion between records and stored documents with per-field encryption.
//!
//! Encoding serializes a record into its field map, moves the identity field to `_id` and
//! replaces the value of every sensitive field with a sealed binary value. Decoding reverses
//! those steps and writes the result back into a record.
//!
//! Sealed values are AES-256-GCM ciphertexts stored as generic BSON binaries laid out as
//! `nonce || ciphertext || tag`, with a fresh random nonce per value. The plaintext is the BSON
//! encoding of `{ "v": <value> }`, so any BSON value round-trips with its exact type.

use aes_gcm::{Aes256Gcm, KeyInit, Nonce, aead::Aead};
use bson::{
    Binary, Bson, Document, doc,
    de::{deserialize_from_document, deserialize_from_slice},
    ser::serialize_to_vec,
    spec::BinarySubtype,
};
use rand::{RngCore, rngs::OsRng};
use tracing::warn;

use crate::{
    error::{MapperError, MapperResult, PreconditionFault, precondition_fault},
    introspect,
    record::Record,
};

/// Name of the identity entry in stored documents.
pub const DOCUMENT_ID: &str = "_id";

const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;
const VALUE_KEY: &str = "v";

/// Seals and opens individual field values with one key.
pub struct FieldCipher {
    cipher: Aes256Gcm,
}

impl FieldCipher {
    /// Required key length in bytes.
    pub const KEY_LEN: usize = 32;

    /// Creates a cipher for `key`.
    ///
    /// # Errors
    ///
    /// Returns [`MapperError::Encryption`] if `key` is not [`Self::KEY_LEN`] bytes long.
    pub fn new(key: &[u8]) -> MapperResult<Self> {
        let cipher = Aes256Gcm::new_from_slice(key).map_err(|_| {
            MapperError::Encryption(format!(
                "key must be {} bytes, got {}",
                Self::KEY_LEN,
                key.len()
            ))
        })?;

        Ok(Self { cipher })
    }

    /// Encrypts a single value into a sealed binary.
    pub fn seal(&self, value: &Bson) -> MapperResult<Bson> {
        let plaintext = serialize_to_vec(&doc! { VALUE_KEY: value.clone() })
            .map_err(|e| MapperError::Encryption(format!("cannot encode value: {e}")))?;

        let mut nonce = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce);

        let ciphertext = self
            .cipher
            .encrypt(Nonce::from_slice(&nonce), plaintext.as_slice())
            .map_err(|_| MapperError::Encryption("encryption failed".into()))?;

        let mut bytes = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        bytes.extend_from_slice(&nonce);
        bytes.extend_from_slice(&ciphertext);

        Ok(Bson::Binary(Binary {
            subtype: BinarySubtype::Generic,
            bytes,
        }))
    }

    /// Decrypts a value produced by [`FieldCipher::seal`].
    ///
    /// # Errors
    ///
    /// Returns [`MapperError::Encryption`] if `sealed` is not a sealed binary, was sealed with
    /// another key, or was altered.
    pub fn open(&self, sealed: &Bson) -> MapperResult<Bson> {
        let bytes = match sealed {
            Bson::Binary(Binary { subtype: BinarySubtype::Generic, bytes })
                if bytes.len() >= NONCE_LEN + TAG_LEN => bytes,
            _ => return Err(MapperError::Encryption("value is not sealed".into())),
        };
        let (nonce, ciphertext) = bytes.split_at(NONCE_LEN);

        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| MapperError::Encryption("authentication failed".into()))?;

        deserialize_from_slice::<Document>(&plaintext)
            .map_err(|e| MapperError::Encryption(format!("cannot decode value: {e}")))?
            .remove(VALUE_KEY)
            .ok_or_else(|| MapperError::Encryption("sealed value is empty".into()))
    }
}

/// Converts `record` into its stored document, sealing its sensitive fields with `key`.
///
/// The record's identity becomes the unencrypted `_id` entry.
///
/// # Errors
///
/// Returns [`MapperError::Encryption`] for an unusable key and [`MapperError::FieldAccess`]
/// if the record does not serialize to a document or leaves out one of its sensitive fields.
pub fn encode_document<R: Record>(key: &[u8], record: &R) -> MapperResult<Document> {
    let cipher = FieldCipher::new(key)?;
    let mut fields = introspect::fields_of(record)?;

    if fields.remove(R::ID_FIELD).is_none() {
        precondition_fault(PreconditionFault {
            type_name: R::type_name(),
            reason: format!("serialized record has no identity field `{}`", R::ID_FIELD),
        });
    }

    for name in sensitive_fields::<R>() {
        let Some(value) = fields.get_mut(name) else {
            warn!(target: "vaultdoc::codec", record = R::type_name(), field = name, "Sensitive field not serialized");
            return Err(MapperError::FieldAccess(format!(
                "sensitive field `{name}` is not serialized by {}",
                R::type_name()
            )));
        };
        *value = cipher.seal(value)?;
    }

    let mut document = Document::new();
    document.insert(DOCUMENT_ID, record.id());
    for (name, value) in fields {
        document.insert(name, value);
    }

    Ok(document)
}

/// Opens the sensitive fields of `document` with `key` and writes every field into `record`.
///
/// # Errors
///
/// Returns [`MapperError::Encryption`] if a sealed value cannot be opened and
/// [`MapperError::FieldAccess`] if the document lacks `_id` or does not fit `R`. On error the
/// record must be treated as unusable.
pub fn decode_document<R: Record>(key: &[u8], document: Document, record: &mut R) -> MapperResult<()> {
    let fields = open_fields::<R>(key, document)?;
    introspect::write_fields(record, fields)
}

/// Decodes `document` into a new record.
///
/// # Errors
///
/// Same as [`decode_document`].
pub fn decode_new<R: Record>(key: &[u8], document: Document) -> MapperResult<R> {
    let fields = open_fields::<R>(key, document)?;

    deserialize_from_document(fields)
        .map_err(|e| MapperError::FieldAccess(format!("document does not fit {}: {e}", R::type_name())))
}

fn open_fields<R: Record>(key: &[u8], mut document: Document) -> MapperResult<Document> {
    let cipher = FieldCipher::new(key)?;
    let id = document
        .remove(DOCUMENT_ID)
        .ok_or_else(|| MapperError::FieldAccess(format!("document has no {DOCUMENT_ID}")))?;

    for name in sensitive_fields::<R>() {
        if let Some(value) = document.get_mut(name) {
            *value = cipher.open(value).map_err(|e| match e {
                MapperError::Encryption(reason) => MapperError::Encryption(format!("field {name}: {reason}")),
                other => other,
            })?;
        }
    }

    document.insert(R::ID_FIELD, id);
    Ok(document)
}

/// Sensitive fields of `R`, excluding the identity, which is never encrypted.
fn sensitive_fields<R: Record>() -> impl Iterator<Item = &'static str> {
    R::sensitive_fields()
        .iter()
        .copied()
        .filter(|name| *name != R::ID_FIELD && *name != DOCUMENT_ID)
}
