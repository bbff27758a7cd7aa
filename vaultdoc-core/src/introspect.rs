//! Field access by name on arbitrary serializable records.
//!
//! Records are viewed through their serde representation: a record is serialized to a BSON
//! document, fields are read or replaced by their serialized name, and writes are applied by
//! deserializing the merged document back into the record. This works for any record shape
//! without knowing its fields at compile time, and a write that the record's own
//! deserializer rejects leaves the record untouched.

use bson::{
    Bson, Document,
    de::deserialize_from_document,
    ser::serialize_to_document,
};
use serde::{Deserialize, Serialize};

use crate::error::{MapperError, MapperResult};

/// Serializes `record` into its field map.
///
/// # Errors
///
/// Returns [`MapperError::FieldAccess`] if the record does not serialize to a document, for
/// example because it is a newtype or a sequence.
pub fn fields_of<R: Serialize>(record: &R) -> MapperResult<Document> {
    serialize_to_document(record)
        .map_err(|e| MapperError::FieldAccess(format!("record is not a document: {e}")))
}

/// Returns `true` if the serialized form of `record` has a field called `name`.
pub fn has_field<R: Serialize>(record: &R, name: &str) -> bool {
    fields_of(record)
        .map(|fields| fields.contains_key(name))
        .unwrap_or(false)
}

/// Returns the value of field `name`.
///
/// # Errors
///
/// Returns [`MapperError::FieldAccess`] if the field does not exist.
pub fn get_field<R: Serialize>(record: &R, name: &str) -> MapperResult<Bson> {
    fields_of(record)?
        .remove(name)
        .ok_or_else(|| MapperError::FieldAccess(format!("no field named {name}")))
}

/// Replaces the value of field `name` in place.
///
/// # Errors
///
/// Returns [`MapperError::FieldAccess`] if the field does not exist or `value` is not
/// acceptable for it. The record is unchanged on error.
pub fn set_field<R>(record: &mut R, name: &str, value: impl Into<Bson>) -> MapperResult<()>
where
    R: Serialize + for<'de> Deserialize<'de>,
{
    let mut fields = fields_of(record)?;

    if !fields.contains_key(name) {
        return Err(MapperError::FieldAccess(format!("no field named {name}")));
    }
    fields.insert(name, value.into());

    *record = deserialize_from_document(fields)
        .map_err(|e| MapperError::FieldAccess(format!("cannot set field {name}: {e}")))?;

    Ok(())
}

/// Overlays every entry of `values` onto `record` in place.
///
/// Entries the record does not declare are ignored unless its deserializer rejects unknown
/// fields. Fields absent from `values` keep their current value.
///
/// # Errors
///
/// Returns [`MapperError::FieldAccess`] if the merged fields do not deserialize into `R`.
/// The record is unchanged on error.
pub fn write_fields<R>(record: &mut R, values: Document) -> MapperResult<()>
where
    R: Serialize + for<'de> Deserialize<'de>,
{
    let mut fields = fields_of(record)?;
    for (name, value) in values {
        fields.insert(name, value);
    }

    *record = deserialize_from_document(fields)
        .map_err(|e| MapperError::FieldAccess(format!("cannot write fields: {e}")))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::oid::ObjectId;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Profile {
        id: ObjectId,
        name: String,
        age: i32,
        nickname: Option<String>,
    }

    fn profile() -> Profile {
        Profile {
            id: ObjectId::new(),
            name: "Ada".into(),
            age: 36,
            nickname: None,
        }
    }

    #[test]
    fn reports_declared_fields() {
        let record = profile();

        assert!(has_field(&record, "id"));
        assert!(has_field(&record, "nickname"));
        assert!(!has_field(&record, "Id"));
        assert!(!has_field(&record, "email"));
    }

    #[test]
    fn non_document_records_have_no_fields() {
        assert!(!has_field(&42_i32, "id"));
        assert!(matches!(fields_of(&vec![1, 2]), Err(MapperError::FieldAccess(_))));
    }

    #[test]
    fn gets_field_values() {
        let record = profile();

        assert_eq!(get_field(&record, "name").unwrap(), Bson::String("Ada".into()));
        assert_eq!(get_field(&record, "id").unwrap(), Bson::ObjectId(record.id));
        assert!(matches!(get_field(&record, "email"), Err(MapperError::FieldAccess(_))));
    }

    #[test]
    fn sets_field_in_place() {
        let mut record = profile();
        set_field(&mut record, "name", "Grace").unwrap();
        set_field(&mut record, "nickname", "amazing").unwrap();

        assert_eq!(record.name, "Grace");
        assert_eq!(record.nickname.as_deref(), Some("amazing"));
    }

    #[test]
    fn rejects_unknown_field_and_wrong_type() {
        let mut record = profile();
        let before = record.clone();

        assert!(matches!(set_field(&mut record, "email", "a@b.c"), Err(MapperError::FieldAccess(_))));
        assert!(matches!(set_field(&mut record, "age", "old"), Err(MapperError::FieldAccess(_))));
        assert_eq!(record, before);
    }

    #[test]
    fn write_fields_overlays_values() {
        let mut record = profile();
        let id = ObjectId::new();
        write_fields(&mut record, bson::doc! { "id": id, "age": 41, "legacy": true }).unwrap();

        assert_eq!(record.id, id);
        assert_eq!(record.age, 41);
        assert_eq!(record.name, "Ada");
    }
}
