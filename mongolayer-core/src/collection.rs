//! Named collection handles.
//!
//! A [`Collection`] pairs a backend reference with a collection name and exposes the
//! untyped record operations the typed repositories are built from. It works the same
//! over a plain backend and over a transaction session.
//!
//! # Example
//!
//! ```ignore
//! use mongolayer::collection::Collection;
//! use bson::doc;
//!
//! let users = Collection::new("users", &backend);
//! let id = users.insert_one(doc! { "name": "Alice" }).await?;
//! users.update_one(doc! { "_id": id }, doc! { "$set": { "name": "Alicia" } }).await?;
//! ```

use bson::{Document, oid::ObjectId};
use serde::Serialize;
use tracing::warn;

use crate::{
    backend::StoreBackend,
    error::{DocumentStoreError, DocumentStoreResult},
    query::{FindOptions, ListOptions},
    schema::encode,
};

/// A collection name bound to a storage backend.
///
/// # Type Parameters
///
/// * `'a` - Lifetime of the backend reference
/// * `B` - The storage backend type
#[derive(Debug)]
pub struct Collection<'a, B: StoreBackend> {
    name: String,
    backend: &'a B,
}

impl<'a, B: StoreBackend> Clone for Collection<'a, B> {
    fn clone(&self) -> Self {
        Self { name: self.name.clone(), backend: self.backend }
    }
}

impl<'a, B: StoreBackend> Collection<'a, B> {
    pub fn new(name: impl Into<String>, backend: &'a B) -> Self {
        Self { name: name.into(), backend }
    }

    /// Returns the name of this collection.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the backend this collection reads and writes through.
    pub fn backend(&self) -> &'a B {
        self.backend
    }

    pub async fn find(&self, filter: Document, options: FindOptions) -> DocumentStoreResult<Vec<Document>> {
        self.backend.find(&self.name, filter, options).await
    }

    /// Returns the first matching record. A miss is `Ok(None)`, not an error.
    pub async fn find_one(&self, filter: Document) -> DocumentStoreResult<Option<Document>> {
        self.backend.find_one(&self.name, filter).await
    }

    pub async fn count(&self, filter: Document) -> DocumentStoreResult<u64> {
        self.backend.count(&self.name, filter).await
    }

    /// Inserts a raw document and returns its identifier.
    pub async fn insert_one(&self, document: Document) -> DocumentStoreResult<ObjectId> {
        self.backend.insert_one(&self.name, document).await
    }

    /// Serializes `value` and inserts it.
    ///
    /// # Errors
    ///
    /// Returns a serialization error if `value` does not encode as a document.
    pub async fn insert<T: Serialize>(&self, value: &T) -> DocumentStoreResult<ObjectId> {
        self.insert_one(encode(value)?).await
    }

    /// Updates exactly one record.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::MutationCountMismatch`] unless exactly one record was
    /// modified. A matching record whose values were already equal to the update counts
    /// as not modified.
    pub async fn update_one(&self, filter: Document, update: Document) -> DocumentStoreResult<()> {
        let outcome = self.backend.update_one(&self.name, filter, update).await?;
        expect_one(&self.name, "modified", outcome.modified)
    }

    /// Deletes exactly one record.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::MutationCountMismatch`] unless exactly one record was
    /// deleted.
    pub async fn delete_one(&self, filter: Document) -> DocumentStoreResult<()> {
        let deleted = self.backend.delete_one(&self.name, filter).await?;
        expect_one(&self.name, "deleted", deleted)
    }

    /// Returns one offset-based slice of records plus the number of records matching
    /// `filter` overall.
    pub async fn get_list(
        &self,
        filter: Document,
        options: &ListOptions,
    ) -> DocumentStoreResult<(Vec<Document>, u64)> {
        let records = self.find(filter.clone(), options.to_find_options()).await?;
        let total = self.count(filter).await?;

        Ok((records, total))
    }
}

fn expect_one(collection: &str, operation: &'static str, actual: u64) -> DocumentStoreResult<()> {
    if actual == 1 {
        return Ok(());
    }

    warn!(collection, operation, actual, "single-record mutation touched an unexpected number of records");

    Err(DocumentStoreError::MutationCountMismatch { operation, expected: 1, actual })
}
