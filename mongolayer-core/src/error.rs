//! Error types and result types for repository and pagination operations.
//!
//! This module provides the single error enum shared by every crate in the workspace.
//! Use [`DocumentStoreResult<T>`] as the return type for fallible operations.
//!
//! A missing record is never an error: single-record lookups return `Ok(None)`.

use bson::error::Error as BsonError;
use serde_json::Error as SerdeJsonError;
use std::error::Error as StdError;
use thiserror::Error;

/// Boxed driver error carried verbatim inside [`DocumentStoreError::Backend`].
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Represents all possible errors that can occur when interacting with a document store.
#[derive(Error, Debug)]
pub enum DocumentStoreError {
    /// A string could not be parsed as a 24 character hex object identifier.
    /// `key` names the parameter or field the value came from.
    #[error("{value} is not a valid ID ({key})")]
    InvalidIdentifier { value: String, key: String },
    /// A required parameter was absent.
    #[error("Missing required parameter: {0}")]
    MissingParameter(String),
    /// A geospatial parameter was malformed or out of range.
    #[error("Invalid location parameter {key}: {reason}")]
    InvalidLocation { key: String, reason: String },
    /// The query itself is not executable (for example a zero page size).
    #[error("Invalid query: {0}")]
    InvalidQuery(String),
    /// A record did not have the shape of the target type, or a value could not be encoded.
    #[error("Serialization error: {0}")]
    Serialization(String),
    /// Error during store initialization or connection setup.
    #[error("Initialization error: {0}")]
    Initialization(String),
    /// A document with the given ID already exists in the collection.
    /// The first argument is the document ID, the second is the collection name.
    #[error("Document {0} already exists in collection {1}")]
    DocumentAlreadyExists(String, String),
    /// A single-record mutation touched a number of records other than the expected one.
    #[error("Incorrect {operation} count should be {expected} got {actual}")]
    MutationCountMismatch {
        operation: &'static str,
        expected: u64,
        actual: u64,
    },
    /// A session or transaction primitive failed.
    #[error("Transaction error: {0}")]
    Transaction(String),
    /// An error raised by the underlying driver, passed through untouched.
    #[error("Backend error: {0}")]
    Backend(#[source] BoxError),
}

impl DocumentStoreError {
    /// Wraps a driver error without altering it.
    pub fn backend(err: impl Into<BoxError>) -> Self {
        DocumentStoreError::Backend(err.into())
    }

    pub fn invalid_identifier(value: impl Into<String>, key: impl Into<String>) -> Self {
        DocumentStoreError::InvalidIdentifier {
            value: value.into(),
            key: key.into(),
        }
    }

    pub fn invalid_location(key: impl Into<String>, reason: impl Into<String>) -> Self {
        DocumentStoreError::InvalidLocation {
            key: key.into(),
            reason: reason.into(),
        }
    }

    /// Returns the driver error if this is a [`DocumentStoreError::Backend`].
    pub fn as_backend(&self) -> Option<&(dyn StdError + Send + Sync + 'static)> {
        match self {
            DocumentStoreError::Backend(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

/// A specialized `Result` type for document store operations.
pub type DocumentStoreResult<T> = Result<T, DocumentStoreError>;

impl From<BsonError> for DocumentStoreError {
    fn from(err: BsonError) -> Self {
        DocumentStoreError::Serialization(err.to_string())
    }
}

impl From<SerdeJsonError> for DocumentStoreError {
    fn from(err: SerdeJsonError) -> Self {
        DocumentStoreError::Serialization(err.to_string())
    }
}
