//! Storage backend abstraction.
//!
//! This module defines the capability interface the repositories and the pagination
//! executor run against. A backend is anything that can find, count and mutate
//! MongoDB-style documents in named collections: the official driver, an in-memory
//! double, or a transaction session of either.
//!
//! # Traits
//!
//! - [`StoreBackend`]: The core trait for storage backends
//! - [`StoreBackendBuilder`]: Factory trait for creating backend instances
//!
//! Transaction support lives in [`crate::transaction`].
//!
//! # Examples
//!
//! ```ignore
//! use mongolayer::backend::StoreBackend;
//! use mongolayer::query::FindOptions;
//! use bson::doc;
//!
//! let id = backend.insert_one("users", doc! { "name": "Alice" }).await?;
//! let found = backend.find("users", doc! { "_id": id }, FindOptions::default()).await?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use async_trait::async_trait;
use bson::{Document, oid::ObjectId};
use std::fmt::Debug;

use crate::{error::DocumentStoreResult, query::FindOptions};

/// Record counts reported by an update.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateOutcome {
    /// Number of records matched by the filter.
    pub matched: u64,
    /// Number of records actually changed.
    pub modified: u64,
}

/// Abstract interface for document storage backends.
///
/// # Thread Safety
///
/// Implementations must be thread-safe; a single backend is shared by every repository
/// built on it.
///
/// # Error Handling
///
/// Driver failures are returned as
/// [`DocumentStoreError::Backend`](crate::error::DocumentStoreError::Backend) carrying the
/// driver's own error. Nothing at this layer retries.
///
/// # Cancellation
///
/// Dropping a returned future cancels the operation. Deadlines are the caller's business
/// (for example `tokio::time::timeout`).
#[async_trait]
pub trait StoreBackend: Send + Sync + Debug {
    /// Returns every record matching `filter`, honouring sort, skip and limit.
    async fn find(
        &self,
        collection: &str,
        filter: Document,
        options: FindOptions,
    ) -> DocumentStoreResult<Vec<Document>>;

    /// Returns the first record matching `filter`, or `None` when nothing matches.
    async fn find_one(&self, collection: &str, filter: Document) -> DocumentStoreResult<Option<Document>>;

    /// Counts records matching `filter`.
    async fn count(&self, collection: &str, filter: Document) -> DocumentStoreResult<u64>;

    /// Inserts one record and returns its identifier.
    ///
    /// A fresh [`ObjectId`] is assigned when the document has no `_id`.
    async fn insert_one(&self, collection: &str, document: Document) -> DocumentStoreResult<ObjectId>;

    /// Applies `update` (an update-operator document such as `{ "$set": {..} }`) to the
    /// first record matching `filter`.
    async fn update_one(
        &self,
        collection: &str,
        filter: Document,
        update: Document,
    ) -> DocumentStoreResult<UpdateOutcome>;

    /// Deletes the first record matching `filter` and returns the number deleted.
    async fn delete_one(&self, collection: &str, filter: Document) -> DocumentStoreResult<u64>;

    /// Cleanly shuts down the backend, releasing all resources.
    ///
    /// The default implementation is a no-op.
    async fn shutdown(self) -> DocumentStoreResult<()>
    where
        Self: Sized,
    {
        Ok(())
    }
}

#[async_trait]
pub trait StoreBackendBuilder {
    type Backend: StoreBackend;

    async fn build(self) -> DocumentStoreResult<Self::Backend>;
}
