//! Conversion between opaque string identifiers and BSON object identifiers.
//!
//! Identifiers travel through request parameters and domain models as 24 character hex
//! strings, and are stored as [`ObjectId`]s. Every function here fails with
//! [`DocumentStoreError::InvalidIdentifier`] on malformed input rather than coercing the
//! value to some default identifier.
//!
//! ```ignore
//! use mongolayer::id::{str_to_obj_id, obj_id_to_str};
//!
//! let id = str_to_obj_id(Some("5f1d7f1b9d3e2a0017a4c0de"))?.unwrap();
//! assert_eq!(obj_id_to_str(Some(&id)).unwrap(), "5f1d7f1b9d3e2a0017a4c0de");
//! ```

use bson::oid::ObjectId;
use serde_json::{Map, Value};

use crate::error::{DocumentStoreError, DocumentStoreResult};

/// Key reported in errors when the caller did not name the offending parameter.
pub const DEFAULT_ID_KEY: &str = "id";

/// Parses a single hex string into an [`ObjectId`].
pub fn parse_object_id(id: &str) -> DocumentStoreResult<ObjectId> {
    parse_keyed(id, DEFAULT_ID_KEY)
}

fn parse_keyed(id: &str, key: &str) -> DocumentStoreResult<ObjectId> {
    ObjectId::parse_str(id).map_err(|_| DocumentStoreError::invalid_identifier(id, key))
}

/// Parses an optional hex string. An absent string yields an absent identifier.
pub fn str_to_obj_id(id: Option<&str>) -> DocumentStoreResult<Option<ObjectId>> {
    id.map(parse_object_id).transpose()
}

/// Renders an optional identifier as hex. An absent identifier yields an absent string.
pub fn obj_id_to_str(id: Option<&ObjectId>) -> Option<String> {
    id.map(|id| id.to_hex())
}

/// Parses every string in order. The first malformed entry fails the whole list.
pub fn str_list_to_obj_id_list<S: AsRef<str>>(list: &[S]) -> DocumentStoreResult<Vec<ObjectId>> {
    list.iter()
        .map(|item| parse_object_id(item.as_ref()))
        .collect()
}

pub fn obj_id_list_to_str_list(list: &[ObjectId]) -> Vec<String> {
    list.iter().map(|id| id.to_hex()).collect()
}

/// Checks that `id` is a valid identifier and hands it back unchanged.
///
/// `key` is the name of the parameter the value came from and is reported in the error.
pub fn get_valid_object_id(id: &str, key: &str) -> DocumentStoreResult<String> {
    parse_keyed(id, key)?;
    Ok(id.to_string())
}

/// Reads and validates an identifier stored as a string under `key` in a JSON object.
pub fn get_valid_object_id_from_map(body: &Map<String, Value>, key: &str) -> DocumentStoreResult<String> {
    match body.get(key) {
        Some(Value::String(id)) => get_valid_object_id(id, key),
        Some(other) => Err(DocumentStoreError::invalid_identifier(other.to_string(), key)),
        None => Err(DocumentStoreError::invalid_identifier("null", key)),
    }
}

/// Validates an optional identifier parameter.
///
/// An absent value is accepted only when `allow_null` is set, otherwise the parameter is
/// reported as missing.
pub fn optional_object_id(
    value: Option<&str>,
    key: &str,
    allow_null: bool,
) -> DocumentStoreResult<Option<String>> {
    match value {
        Some(id) => get_valid_object_id(id, key).map(Some),
        None if allow_null => Ok(None),
        None => Err(DocumentStoreError::MissingParameter(key.to_string())),
    }
}
