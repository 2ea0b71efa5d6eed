//! Partial update documents built from patch structs.

use bson::{Bson, Document};
use serde::Serialize;

use crate::{error::DocumentStoreResult, schema::encode};

/// Serializes `value` and keeps only the fields that carry a value, ready to be used as
/// the body of a `$set`.
///
/// A field is dropped when it is null, an empty string, numeric zero, `false`, an empty
/// array, or a nested document that is empty once its own zero fields are dropped.
/// Field names follow the serde shape of `T`, so renames apply and skipped fields never
/// appear.
///
/// # Errors
///
/// Returns [`DocumentStoreError::Serialization`](crate::error::DocumentStoreError::Serialization)
/// if `value` does not serialize to a document (a scalar or a sequence, for example).
pub fn build_update_doc<T: Serialize>(value: &T) -> DocumentStoreResult<Document> {
    Ok(prune(encode(value)?))
}

fn prune(document: Document) -> Document {
    document
        .into_iter()
        .filter_map(|(key, value)| {
            let value = match value {
                Bson::Document(nested) => Bson::Document(prune(nested)),
                other => other,
            };
            (!is_zero(&value)).then_some((key, value))
        })
        .collect()
}

fn is_zero(value: &Bson) -> bool {
    match value {
        Bson::Null => true,
        Bson::String(s) => s.is_empty(),
        Bson::Boolean(b) => !b,
        Bson::Int32(n) => *n == 0,
        Bson::Int64(n) => *n == 0,
        Bson::Double(n) => *n == 0.0,
        Bson::Array(items) => items.is_empty(),
        Bson::Document(nested) => nested.is_empty(),
        _ => false,
    }
}
