//! Record adapter trait, identity helpers and optional lifecycle capabilities.
//!
//! Every type persisted through the mapper implements [`Record`]. The trait is a small
//! per-type adapter: it exposes the identity, names the fields that must be encrypted and
//! declares which lifecycle hooks the type opts into. It is usually generated with
//! `#[derive(Record)]` from the `vaultdoc` crate.
//!
//! # Example
//!
//! ```ignore
//! use vaultdoc::record::{Record, Capabilities, Validate, BeforeSave, unset_id};
//! use bson::oid::ObjectId;
//! use serde::{Serialize, Deserialize};
//!
//! #[derive(Debug, Clone, Serialize, Deserialize)]
//! pub struct UserAccount {
//!     pub id: ObjectId,
//!     pub email: String,
//!     pub ssn: String,
//! }
//!
//! impl Validate for UserAccount {
//!     fn validate(&self) -> Vec<String> {
//!         if self.email.is_empty() { vec!["email is required".into()] } else { vec![] }
//!     }
//! }
//!
//! impl Record for UserAccount {
//!     fn id(&self) -> ObjectId { self.id }
//!     fn set_id(&mut self, id: ObjectId) { self.id = id; }
//!     fn type_name() -> &'static str { "UserAccount" }
//!     fn sensitive_fields() -> &'static [&'static str] { &["ssn"] }
//!     fn capabilities() -> Capabilities<Self> { Capabilities::none().with_validate() }
//! }
//! ```

use bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Ordered list of human readable violation messages. Empty means valid.
pub type Violations = Vec<String>;

/// Returns the zero identity carried by records that were never saved.
pub fn unset_id() -> ObjectId {
    ObjectId::from_bytes([0; 12])
}

/// Returns `true` if `id` is the zero identity.
pub fn is_unset(id: &ObjectId) -> bool {
    id.bytes() == [0; 12]
}

/// Core trait that all records persisted through the mapper must implement.
pub trait Record: Serialize + for<'de> Deserialize<'de> + Send + Sync + 'static {
    /// Serialized name of the identity field.
    ///
    /// The mapper moves this entry to `_id` when encoding and back when decoding. A record
    /// whose serialized form lacks it is a defect in the type definition.
    const ID_FIELD: &'static str = "id";

    /// Returns this record's identity, or [`unset_id`] if it was never saved.
    fn id(&self) -> ObjectId;

    /// Replaces this record's identity.
    fn set_id(&mut self, id: ObjectId);

    /// Unqualified type name the collection name is derived from.
    fn type_name() -> &'static str {
        short_type_name(std::any::type_name::<Self>())
    }

    /// Serialized names of the fields whose values are encrypted at rest.
    fn sensitive_fields() -> &'static [&'static str] {
        &[]
    }

    /// Lifecycle hooks this type opts into.
    fn capabilities() -> Capabilities<Self>
    where
        Self: Sized,
    {
        Capabilities::none()
    }
}

/// Strips the module path and generic arguments from a fully qualified type name.
pub(crate) fn short_type_name(full: &'static str) -> &'static str {
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

/// Records that can check their own invariants before being saved.
///
/// Implementing this trait is not enough on its own: the type must also register the hook in
/// [`Record::capabilities`], or list it in `#[record(...)]` when deriving. Unregistered hooks
/// are never called.
pub trait Validate {
    fn validate(&self) -> Violations;
}

/// Runs before a record is saved for the first time.
///
/// Registered like [`Validate`].
pub trait BeforeCreate {
    fn before_create(&mut self);
}

/// Runs before an already identified record is saved again.
///
/// Registered like [`Validate`].
pub trait BeforeUpdate {
    fn before_update(&mut self);
}

/// Runs before every save, after the create or update hook.
///
/// Registered like [`Validate`].
pub trait BeforeSave {
    fn before_save(&mut self);
}

/// Runs after a record has been populated from the store.
///
/// Registered like [`Validate`].
pub trait AfterFind {
    fn after_find(&mut self);
}

/// Table of the lifecycle hooks a record type opts into.
///
/// Each `with_*` method requires the matching hook trait, so a type can only register a
/// hook it actually implements. The mapper reads the table once per typed handle.
pub struct Capabilities<R> {
    pub(crate) validate: Option<fn(&R) -> Violations>,
    pub(crate) before_create: Option<fn(&mut R)>,
    pub(crate) before_update: Option<fn(&mut R)>,
    pub(crate) before_save: Option<fn(&mut R)>,
    pub(crate) after_find: Option<fn(&mut R)>,
}

impl<R> Capabilities<R> {
    /// A table with no hooks registered.
    pub fn none() -> Self {
        Self {
            validate: None,
            before_create: None,
            before_update: None,
            before_save: None,
            after_find: None,
        }
    }

    pub fn with_validate(mut self) -> Self
    where
        R: Validate,
    {
        self.validate = Some(<R as Validate>::validate);
        self
    }

    pub fn with_before_create(mut self) -> Self
    where
        R: BeforeCreate,
    {
        self.before_create = Some(<R as BeforeCreate>::before_create);
        self
    }

    pub fn with_before_update(mut self) -> Self
    where
        R: BeforeUpdate,
    {
        self.before_update = Some(<R as BeforeUpdate>::before_update);
        self
    }

    pub fn with_before_save(mut self) -> Self
    where
        R: BeforeSave,
    {
        self.before_save = Some(<R as BeforeSave>::before_save);
        self
    }

    pub fn with_after_find(mut self) -> Self
    where
        R: AfterFind,
    {
        self.after_find = Some(<R as AfterFind>::after_find);
        self
    }

    /// Runs the validation hook, if registered. An unregistered hook means valid.
    pub fn validate(&self, record: &R) -> Violations {
        self.validate
            .map(|validate| validate(record))
            .unwrap_or_default()
    }

    /// Runs the pre-save hooks in protocol order: create or update first, then save.
    pub fn run_before_save(&self, record: &mut R, is_new: bool) {
        let create_or_update = if is_new {
            self.before_create
        } else {
            self.before_update
        };

        if let Some(hook) = create_or_update {
            hook(record);
        }
        if let Some(hook) = self.before_save {
            hook(record);
        }
    }

    /// Runs the after-find hook, if registered.
    pub fn run_after_find(&self, record: &mut R) {
        if let Some(hook) = self.after_find {
            hook(record);
        }
    }
}

impl<R> Default for Capabilities<R> {
    fn default() -> Self {
        Self::none()
    }
}

impl<R> Clone for Capabilities<R> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<R> Copy for Capabilities<R> {}

impl<R> fmt::Debug for Capabilities<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Capabilities")
            .field("validate", &self.validate.is_some())
            .field("before_create", &self.before_create.is_some())
            .field("before_update", &self.before_update.is_some())
            .field("before_save", &self.before_save.is_some())
            .field("after_find", &self.after_find.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    struct Ticket {
        id: ObjectId,
        calls: Vec<String>,
    }

    impl Default for Ticket {
        fn default() -> Self {
            Self {
                id: unset_id(),
                calls: Vec::new(),
            }
        }
    }

    impl BeforeCreate for Ticket {
        fn before_create(&mut self) {
            self.calls.push("before_create".into());
        }
    }

    impl BeforeUpdate for Ticket {
        fn before_update(&mut self) {
            self.calls.push("before_update".into());
        }
    }

    impl BeforeSave for Ticket {
        fn before_save(&mut self) {
            self.calls.push("before_save".into());
        }
    }

    fn all_hooks() -> Capabilities<Ticket> {
        Capabilities::none()
            .with_before_create()
            .with_before_update()
            .with_before_save()
    }

    #[test]
    fn unset_id_is_zero() {
        assert!(is_unset(&unset_id()));
        assert!(!is_unset(&ObjectId::new()));
        assert!(is_unset(&Ticket::default().id));
    }

    #[test]
    fn create_path_runs_create_then_save() {
        let mut ticket = Ticket::default();
        all_hooks().run_before_save(&mut ticket, true);

        assert_eq!(ticket.calls, vec!["before_create", "before_save"]);
    }

    #[test]
    fn update_path_runs_update_then_save() {
        let mut ticket = Ticket::default();
        all_hooks().run_before_save(&mut ticket, false);

        assert_eq!(ticket.calls, vec!["before_update", "before_save"]);
    }

    #[test]
    fn missing_hooks_are_skipped() {
        let mut ticket = Ticket::default();
        let caps = Capabilities::<Ticket>::none().with_before_save();
        caps.run_before_save(&mut ticket, true);
        caps.run_after_find(&mut ticket);

        assert_eq!(ticket.calls, vec!["before_save"]);
        assert!(caps.validate(&ticket).is_empty());
    }

    #[test]
    fn short_type_name_strips_path_and_generics() {
        assert_eq!(short_type_name("app::models::UserAccount"), "UserAccount");
        assert_eq!(short_type_name("app::Wrapper<app::Inner>"), "Wrapper");
        assert_eq!(short_type_name("Plain"), "Plain");
    }
}
