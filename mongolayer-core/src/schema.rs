//! Storage-shaped records and their conversion into domain models.
//!
//! Every persisted entity has two representations: a schema type whose serde shape
//! matches the stored document, and a domain model. The schema type implements
//! [`IntoModel`] to describe the mapping.
//!
//! # Example
//!
//! ```ignore
//! use mongolayer::schema::IntoModel;
//! use bson::oid::ObjectId;
//! use serde::{Serialize, Deserialize};
//!
//! #[derive(Debug, Clone, Serialize, Deserialize)]
//! pub struct UserSchema {
//!     #[serde(rename = "_id")]
//!     pub id: ObjectId,
//!     pub name: String,
//! }
//!
//! pub struct User {
//!     pub id: String,
//!     pub name: String,
//! }
//!
//! impl IntoModel for UserSchema {
//!     type Model = User;
//!
//!     fn into_model(self) -> User {
//!         User { id: self.id.to_hex(), name: self.name }
//!     }
//! }
//! ```

use bson::{Document, de::deserialize_from_document, ser::serialize_to_document};
use serde::{Serialize, de::DeserializeOwned};

use crate::error::DocumentStoreResult;

/// Conversion from a storage-shaped record into its domain model.
///
/// The conversion must be pure: no I/O, no side effects, no failure. Anything that can
/// fail belongs in deserialization of the schema type itself.
pub trait IntoModel: DeserializeOwned + Send + Sync + 'static {
    /// The domain model this record maps to.
    type Model: Send + 'static;

    fn into_model(self) -> Self::Model;
}

/// Decodes a stored document into a schema type.
///
/// # Errors
///
/// Returns [`DocumentStoreError::Serialization`](crate::error::DocumentStoreError::Serialization)
/// if the document does not have the shape of `S`.
pub fn decode<S: DeserializeOwned>(document: Document) -> DocumentStoreResult<S> {
    Ok(deserialize_from_document(document)?)
}

/// Decodes every document in order, failing on the first mismatch.
pub fn decode_all<S: DeserializeOwned>(documents: Vec<Document>) -> DocumentStoreResult<Vec<S>> {
    documents.into_iter().map(decode).collect()
}

/// Encodes a value as a document for storage.
pub fn encode<T: Serialize>(value: &T) -> DocumentStoreResult<Document> {
    Ok(serialize_to_document(value)?)
}

/// Decodes documents and maps each record into its model, preserving order.
pub fn into_models<S: IntoModel>(documents: Vec<Document>) -> DocumentStoreResult<Vec<S::Model>> {
    Ok(decode_all::<S>(documents)?
        .into_iter()
        .map(IntoModel::into_model)
        .collect())
}
