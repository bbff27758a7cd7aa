//! Lifecycle mapper: saves, finds and deletes records through a store backend.
//!
//! The mapper is the only component that talks to a [`StoreBackend`]. For every record it
//! resolves the collection from the record's type name, picks the collection's encryption key
//! and runs the record's lifecycle in a fixed order:
//!
//! - **save**: identity check, identity assignment, validation, create/update hook, save hook,
//!   encoding, upsert
//! - **find**: fetch, decoding, after-find hook
//! - **delete**: identity check, remove
//!
//! # Example
//!
//! ```ignore
//! use vaultdoc::{mapper::Mapper, keys::EncryptionKeys, memory::InMemoryStore};
//!
//! let mapper = Mapper::new(InMemoryStore::new(), EncryptionKeys::new(key));
//!
//! let mut account = UserAccount::new("ada@example.com");
//! mapper.save(&mut account).await?;
//!
//! let mut loaded = UserAccount::default();
//! mapper.find_by_id(account.id, &mut loaded).await?;
//! mapper.delete(&loaded).await?;
//! ```

use bson::{Bson, oid::ObjectId};
use std::fmt;
use tracing::{debug, warn};

use crate::{
    backend::StoreBackend,
    codec::{decode_document, decode_new, encode_document},
    error::{MapperError, MapperResult, PreconditionFault, StoreResult, precondition_fault},
    introspect,
    keys::EncryptionKeys,
    naming::collection_name,
    record::{Capabilities, Record, is_unset},
};

/// Maps records onto a store backend, encrypting sensitive fields on the way.
///
/// The mapper holds only immutable configuration and is safe to share between tasks as
/// long as the backend is.
#[derive(Debug)]
pub struct Mapper<B: StoreBackend> {
    backend: B,
    keys: EncryptionKeys,
}

impl<B: StoreBackend> Mapper<B> {
    /// Creates a mapper over `backend` using `keys` for field encryption.
    pub fn new(backend: B, keys: EncryptionKeys) -> Self {
        Self { backend, keys }
    }

    /// Returns the underlying backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Returns the configured key set.
    pub fn keys(&self) -> &EncryptionKeys {
        &self.keys
    }

    /// Gets a typed handle for record type `R`.
    ///
    /// The collection name, encryption key and hook table of `R` are resolved once here and
    /// reused by every operation on the handle.
    pub fn records<'a, R: Record>(&'a self) -> RecordCollection<'a, B, R> {
        let name = collection_name::<R>();
        let key = self.keys.key_for(&name);

        RecordCollection {
            key,
            name,
            capabilities: R::capabilities(),
            backend: &self.backend,
        }
    }

    /// Saves `record`, assigning it an identity if it has none.
    ///
    /// See [`RecordCollection::save`].
    pub async fn save<R: Record>(&self, record: &mut R) -> MapperResult<()> {
        self.records::<R>().save(record).await
    }

    /// Loads the record stored under `id` into `record`.
    ///
    /// See [`RecordCollection::find_by_id`].
    pub async fn find_by_id<R: Record>(&self, id: ObjectId, record: &mut R) -> MapperResult<()> {
        self.records::<R>().find_by_id(id, record).await
    }

    /// Deletes the stored copy of `record`.
    ///
    /// See [`RecordCollection::delete`].
    pub async fn delete<R: Record>(&self, record: &R) -> MapperResult<()> {
        self.records::<R>().delete(record).await
    }

    /// Shuts down the backend and releases its resources.
    pub async fn shutdown(self) -> StoreResult<()> {
        self.backend.shutdown().await
    }
}

/// A typed view of the collection that holds records of type `R`.
pub struct RecordCollection<'a, B, R> {
    name: String,
    key: &'a [u8],
    capabilities: Capabilities<R>,
    backend: &'a B,
}

impl<'a, B: StoreBackend, R: Record> RecordCollection<'a, B, R> {
    /// Returns the name of the collection.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Saves `record`.
    ///
    /// A record with an unset identity gets a fresh one and is treated as new; otherwise it
    /// is treated as existing. The record is then validated, its hooks run (create or
    /// update, then save), and the encoded document is upserted under its identity.
    ///
    /// # Errors
    ///
    /// - [`MapperError::Validation`] if the record rejected itself. Nothing is written and no
    ///   hook runs, but an identity assigned by this call stays on the record.
    /// - [`MapperError::Encryption`] if the collection key is unusable.
    /// - [`MapperError::Store`] if the backend fails.
    ///
    /// # Panics
    ///
    /// If the serialized form of `R` has no identity field. This is a defect in the type
    /// definition, not a runtime condition.
    pub async fn save(&self, record: &mut R) -> MapperResult<()> {
        let is_new = is_unset(&read_identity(record)?);
        if is_new {
            record.set_id(ObjectId::new());
        }

        let violations = self.capabilities.validate(record);
        if !violations.is_empty() {
            warn!(
                target: "vaultdoc::mapper",
                collection = %self.name,
                id = %record.id(),
                violations = violations.len(),
                "Record rejected by validation"
            );
            return Err(MapperError::Validation(violations));
        }

        self.capabilities.run_before_save(record, is_new);

        let id = record.id();
        let document = encode_document(self.key, record)?;
        self.backend
            .upsert_document(&self.name, id, document)
            .await?;

        debug!(target: "vaultdoc::mapper", collection = %self.name, id = %id, is_new, "Record saved");

        Ok(())
    }

    /// Loads the record stored under `id` into `record` and runs its after-find hook.
    ///
    /// # Errors
    ///
    /// - [`MapperError::Store`] if the backend fails, including when no document exists.
    ///   `record` is left untouched.
    /// - [`MapperError::Encryption`] or [`MapperError::FieldAccess`] if the document cannot be
    ///   decoded. `record` must then be discarded.
    pub async fn find_by_id(&self, id: ObjectId, record: &mut R) -> MapperResult<()> {
        let document = self.backend
            .find_document(&self.name, id)
            .await?;

        decode_document(self.key, document, record).inspect_err(|e| {
            warn!(target: "vaultdoc::mapper", collection = %self.name, id = %id, error = %e, "Failed to decode record");
        })?;
        self.capabilities.run_after_find(record);

        debug!(target: "vaultdoc::mapper", collection = %self.name, id = %id, "Record found");

        Ok(())
    }

    /// Loads the record stored under `id` into a new value and runs its after-find hook.
    ///
    /// # Errors
    ///
    /// Same as [`RecordCollection::find_by_id`].
    pub async fn fetch(&self, id: ObjectId) -> MapperResult<R> {
        let document = self.backend
            .find_document(&self.name, id)
            .await?;

        let mut record: R = decode_new(self.key, document).inspect_err(|e| {
            warn!(target: "vaultdoc::mapper", collection = %self.name, id = %id, error = %e, "Failed to decode record");
        })?;
        self.capabilities.run_after_find(&mut record);

        Ok(record)
    }

    /// Removes the stored copy of `record`. No hooks or validation run.
    ///
    /// # Errors
    ///
    /// - [`MapperError::UnsetIdentity`] if the record was never saved. The store is not
    ///   contacted.
    /// - [`MapperError::Store`] if the backend fails, including when no document exists.
    ///
    /// # Panics
    ///
    /// If the serialized form of `R` has no identity field.
    pub async fn delete(&self, record: &R) -> MapperResult<()> {
        let id = read_identity(record)?;
        if is_unset(&id) {
            return Err(MapperError::UnsetIdentity);
        }

        self.backend
            .remove_document(&self.name, id)
            .await?;

        debug!(target: "vaultdoc::mapper", collection = %self.name, id = %id, "Record deleted");

        Ok(())
    }
}

impl<B, R> fmt::Debug for RecordCollection<'_, B, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordCollection")
            .field("name", &self.name)
            .field("capabilities", &self.capabilities)
            .finish_non_exhaustive()
    }
}

/// Reads the identity field of `record` through its serialized form.
///
/// A missing field is a [`PreconditionFault`]; a field of the wrong type is a
/// [`MapperError::FieldAccess`].
fn read_identity<R: Record>(record: &R) -> MapperResult<ObjectId> {
    let mut fields = introspect::fields_of(record)?;

    match fields.remove(R::ID_FIELD) {
        Some(Bson::ObjectId(id)) => Ok(id),
        Some(other) => Err(MapperError::FieldAccess(format!(
            "identity field `{}` holds {:?}, expected an ObjectId",
            R::ID_FIELD,
            other.element_type()
        ))),
        None => precondition_fault(PreconditionFault {
            type_name: R::type_name(),
            reason: format!("model must have an identity field `{}`", R::ID_FIELD),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        backend::DynStoreBackend,
        codec::DOCUMENT_ID,
        error::StoreError,
        record::{AfterFind, BeforeCreate, BeforeSave, BeforeUpdate, Validate, unset_id},
    };
    use async_trait::async_trait;
    use bson::Document;
    use mea::rwlock::RwLock;
    use serde::{Deserialize, Serialize};
    use std::collections::HashMap;

    const KEY: &[u8; 32] = b"0123456789abcdef0123456789abcdef";
    const ACCOUNT_KEY: &[u8; 32] = b"ffffffffffffffffffffffffffffffff";

    #[derive(Debug)]
    struct RecordingBackend {
        documents: RwLock<HashMap<(String, ObjectId), Document>>,
        calls: RwLock<Vec<String>>,
        fail_writes: bool,
    }

    impl Default for RecordingBackend {
        fn default() -> Self {
            Self {
                documents: RwLock::new(HashMap::new()),
                calls: RwLock::new(Vec::new()),
                fail_writes: false,
            }
        }
    }

    impl RecordingBackend {
        fn failing() -> Self {
            Self {
                fail_writes: true,
                ..Self::default()
            }
        }

        async fn calls(&self) -> Vec<String> {
            self.calls.read().await.clone()
        }

        async fn stored(&self, collection: &str, id: ObjectId) -> Option<Document> {
            self.documents
                .read()
                .await
                .get(&(collection.to_string(), id))
                .cloned()
        }
    }

    #[async_trait]
    impl StoreBackend for RecordingBackend {
        async fn upsert_document(&self, collection: &str, id: ObjectId, document: Document) -> StoreResult<()> {
            self.calls.write().await.push(format!("upsert {collection}"));
            if self.fail_writes {
                return Err(StoreError::Backend("disk full".into()));
            }
            self.documents
                .write()
                .await
                .insert((collection.to_string(), id), document);

            Ok(())
        }

        async fn find_document(&self, collection: &str, id: ObjectId) -> StoreResult<Document> {
            self.calls.write().await.push(format!("find {collection}"));
            self.documents
                .read()
                .await
                .get(&(collection.to_string(), id))
                .cloned()
                .ok_or_else(|| StoreError::DocumentNotFound(id.to_hex(), collection.to_string()))
        }

        async fn remove_document(&self, collection: &str, id: ObjectId) -> StoreResult<()> {
            self.calls.write().await.push(format!("remove {collection}"));
            self.documents
                .write()
                .await
                .remove(&(collection.to_string(), id))
                .map(|_| ())
                .ok_or_else(|| StoreError::DocumentNotFound(id.to_hex(), collection.to_string()))
        }
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct UserAccount {
        id: ObjectId,
        email: String,
        password: String,
        #[serde(skip)]
        hooks: Vec<String>,
    }

    impl UserAccount {
        fn new(email: &str) -> Self {
            Self {
                id: unset_id(),
                email: email.into(),
                password: "hunter2".into(),
                hooks: Vec::new(),
            }
        }
    }

    impl Record for UserAccount {
        fn id(&self) -> ObjectId {
            self.id
        }

        fn set_id(&mut self, id: ObjectId) {
            self.id = id;
        }

        fn sensitive_fields() -> &'static [&'static str] {
            &["password"]
        }

        fn capabilities() -> Capabilities<Self> {
            Capabilities::none()
                .with_validate()
                .with_before_create()
                .with_before_update()
                .with_before_save()
                .with_after_find()
        }
    }

    impl Validate for UserAccount {
        fn validate(&self) -> Vec<String> {
            let mut violations = Vec::new();
            if self.email.is_empty() {
                violations.push("email is required".to_string());
            }
            if self.password.len() < 4 {
                violations.push("password is too short".to_string());
            }
            violations
        }
    }

    impl BeforeCreate for UserAccount {
        fn before_create(&mut self) {
            self.hooks.push("before_create".into());
        }
    }

    impl BeforeUpdate for UserAccount {
        fn before_update(&mut self) {
            self.hooks.push("before_update".into());
        }
    }

    impl BeforeSave for UserAccount {
        fn before_save(&mut self) {
            self.hooks.push("before_save".into());
            self.email = self.email.to_lowercase();
        }
    }

    impl AfterFind for UserAccount {
        fn after_find(&mut self) {
            self.hooks.push("after_find".into());
        }
    }

    #[derive(Debug, Serialize, Deserialize)]
    struct Keyless {
        #[serde(skip, default = "unset_id")]
        id: ObjectId,
        label: String,
    }

    impl Record for Keyless {
        fn id(&self) -> ObjectId {
            self.id
        }

        fn set_id(&mut self, id: ObjectId) {
            self.id = id;
        }
    }

    #[derive(Debug, Serialize, Deserialize)]
    struct Mistyped {
        id: String,
    }

    impl Record for Mistyped {
        fn id(&self) -> ObjectId {
            unset_id()
        }

        fn set_id(&mut self, id: ObjectId) {
            self.id = id.to_hex();
        }
    }

    fn mapper() -> Mapper<RecordingBackend> {
        Mapper::new(RecordingBackend::default(), EncryptionKeys::new(*KEY))
    }

    #[test]
    fn records_handle_resolves_collection_once() {
        let mapper = Mapper::new(
            RecordingBackend::default(),
            EncryptionKeys::new(*KEY).with_collection_key("user_account", *ACCOUNT_KEY),
        );
        let accounts = mapper.records::<UserAccount>();

        assert_eq!(accounts.name(), "user_account");
        assert_eq!(accounts.key, ACCOUNT_KEY);
    }

    #[tokio::test]
    async fn first_save_assigns_identity_and_runs_create_hooks() {
        let mapper = mapper();
        let mut account = UserAccount::new("Ada@Example.com");

        mapper.save(&mut account).await.unwrap();

        assert!(!is_unset(&account.id));
        assert_eq!(account.hooks, vec!["before_create", "before_save"]);
        assert_eq!(mapper.backend().calls().await, vec!["upsert user_account"]);
    }

    #[tokio::test]
    async fn second_save_keeps_identity_and_runs_update_hooks() {
        let mapper = mapper();
        let mut account = UserAccount::new("ada@example.com");

        mapper.save(&mut account).await.unwrap();
        let id = account.id;
        account.hooks.clear();
        mapper.save(&mut account).await.unwrap();

        assert_eq!(account.id, id);
        assert_eq!(account.hooks, vec!["before_update", "before_save"]);

        let stored = mapper.backend().stored("user_account", id).await.unwrap();
        assert_eq!(stored.get_object_id(DOCUMENT_ID).unwrap(), id);
        assert_eq!(mapper.backend().calls().await.len(), 2);
    }

    #[tokio::test]
    async fn stored_document_seals_sensitive_fields() {
        let mapper = mapper();
        let mut account = UserAccount::new("Ada@Example.com");
        mapper.save(&mut account).await.unwrap();

        let stored = mapper.backend().stored("user_account", account.id).await.unwrap();

        assert_eq!(stored.get_str("email").unwrap(), "ada@example.com");
        assert!(matches!(stored.get("password"), Some(Bson::Binary(_))));
        assert!(!stored.contains_key("id"));
        assert!(!stored.contains_key("hooks"));
    }

    #[tokio::test]
    async fn validation_failure_skips_hooks_and_store() {
        let mapper = mapper();
        let mut account = UserAccount::new("");
        account.password = "abc".into();

        let err = mapper.save(&mut account).await.unwrap_err();

        assert_eq!(
            err.violations(),
            Some(&["email is required".to_string(), "password is too short".to_string()][..])
        );
        assert!(account.hooks.is_empty());
        assert!(!is_unset(&account.id));
        assert!(mapper.backend().calls().await.is_empty());
    }

    #[tokio::test]
    async fn store_failure_is_returned_without_violations() {
        let mapper = Mapper::new(RecordingBackend::failing(), EncryptionKeys::new(*KEY));
        let mut account = UserAccount::new("ada@example.com");

        let err = mapper.save(&mut account).await.unwrap_err();

        assert!(matches!(err, MapperError::Store(StoreError::Backend(_))));
        assert!(err.violations().is_none());
    }

    #[tokio::test]
    async fn unusable_key_fails_save_before_store() {
        let mapper = Mapper::new(RecordingBackend::default(), EncryptionKeys::new("short"));
        let mut account = UserAccount::new("ada@example.com");

        let err = mapper.save(&mut account).await.unwrap_err();

        assert!(matches!(err, MapperError::Encryption(_)));
        assert!(mapper.backend().calls().await.is_empty());
    }

    #[tokio::test]
    async fn find_by_id_decrypts_and_runs_after_find() {
        let mapper = mapper();
        let mut account = UserAccount::new("ada@example.com");
        mapper.save(&mut account).await.unwrap();

        let mut loaded = UserAccount::new("placeholder@example.com");
        mapper.find_by_id(account.id, &mut loaded).await.unwrap();

        assert_eq!(loaded.id, account.id);
        assert_eq!(loaded.email, "ada@example.com");
        assert_eq!(loaded.password, "hunter2");
        assert_eq!(loaded.hooks, vec!["after_find"]);
    }

    #[tokio::test]
    async fn fetch_builds_a_new_record() {
        let mapper = mapper();
        let mut account = UserAccount::new("ada@example.com");
        mapper.save(&mut account).await.unwrap();

        let loaded = mapper.records::<UserAccount>().fetch(account.id).await.unwrap();

        assert_eq!(loaded.password, "hunter2");
        assert_eq!(loaded.hooks, vec!["after_find"]);
    }

    #[tokio::test]
    async fn find_of_missing_record_leaves_target_untouched() {
        let mapper = mapper();
        let mut target = UserAccount::new("keep@example.com");
        target.id = ObjectId::new();
        let before = target.clone();

        let err = mapper.find_by_id(ObjectId::new(), &mut target).await.unwrap_err();

        assert!(err.is_not_found());
        assert_eq!(target, before);
    }

    #[tokio::test]
    async fn collection_key_override_is_required_to_decode() {
        let backend = RecordingBackend::default();
        let writer = Mapper::new(
            &backend,
            EncryptionKeys::new(*KEY).with_collection_key("user_account", *ACCOUNT_KEY),
        );
        let reader = Mapper::new(&backend, EncryptionKeys::new(*KEY));

        let mut account = UserAccount::new("ada@example.com");
        writer.save(&mut account).await.unwrap();

        let mut loaded = UserAccount::new("x@example.com");
        let err = reader.find_by_id(account.id, &mut loaded).await.unwrap_err();
        assert!(matches!(err, MapperError::Encryption(_)));

        writer.find_by_id(account.id, &mut loaded).await.unwrap();
        assert_eq!(loaded.password, "hunter2");
    }

    #[tokio::test]
    async fn delete_removes_document() {
        let mapper = mapper();
        let mut account = UserAccount::new("ada@example.com");
        mapper.save(&mut account).await.unwrap();

        mapper.delete(&account).await.unwrap();

        assert!(mapper.backend().stored("user_account", account.id).await.is_none());
        let err = mapper.delete(&account).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn delete_of_unsaved_record_does_not_reach_store() {
        let mapper = mapper();
        let account = UserAccount::new("ada@example.com");

        let err = mapper.delete(&account).await.unwrap_err();

        assert!(matches!(err, MapperError::UnsetIdentity));
        assert!(mapper.backend().calls().await.is_empty());
    }

    #[tokio::test]
    async fn mistyped_identity_is_a_field_access_error() {
        let mapper = mapper();
        let record = Mistyped { id: "abc".into() };

        let err = mapper.delete(&record).await.unwrap_err();

        assert!(matches!(err, MapperError::FieldAccess(_)));
    }

    #[tokio::test]
    #[should_panic(expected = "model must have an identity field `id`")]
    async fn save_without_identity_field_is_a_fault() {
        let mapper = mapper();
        let mut record = Keyless {
            id: unset_id(),
            label: "orphan".into(),
        };

        let _ = mapper.save(&mut record).await;
    }

    #[tokio::test]
    #[should_panic(expected = "model must have an identity field `id`")]
    async fn delete_without_identity_field_is_a_fault() {
        let mapper = mapper();
        let record = Keyless {
            id: ObjectId::new(),
            label: "orphan".into(),
        };

        let _ = mapper.delete(&record).await;
    }

    #[tokio::test]
    async fn works_over_a_boxed_backend() {
        let backend: Box<dyn DynStoreBackend> = Box::new(RecordingBackend::default());
        let mapper = Mapper::new(backend, EncryptionKeys::new(*KEY));

        let mut account = UserAccount::new("ada@example.com");
        mapper.save(&mut account).await.unwrap();
        let loaded = mapper.records::<UserAccount>().fetch(account.id).await.unwrap();

        assert_eq!(loaded.email, "ada@example.com");
        assert!(mapper.backend().as_ref().as_any().downcast_ref::<RecordingBackend>().is_some());
        mapper.shutdown().await.unwrap();
    }
}
