//! Main document store interface.
//!
//! [`DocumentStore`] owns a backend and hands out collections, typed repositories and
//! transaction scopes bound to it.
//!
//! # Example
//!
//! ```ignore
//! use mongolayer::store::DocumentStore;
//!
//! let store = DocumentStore::new(backend);
//! let users = store.repository::<UserSchema>("users");
//! let page = users.get_paginated_list(doc! {}, None, Some(20)).await?;
//! ```

use crate::{
    backend::StoreBackend,
    collection::Collection,
    error::DocumentStoreResult,
    repository::TypedRepository,
    schema::IntoModel,
    transaction::{TransactionalBackend, in_transaction},
};

/// A document store bound to a specific backend implementation.
///
/// # Type Parameters
///
/// * `B` - The backend implementation type
#[derive(Debug)]
pub struct DocumentStore<B: StoreBackend> {
    backend: B,
}

impl<B: StoreBackend> DocumentStore<B> {
    /// Creates a new document store with the given backend.
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Gets an untyped collection with the given name.
    pub fn collection<'a>(&'a self, name: &str) -> Collection<'a, B> {
        Collection::new(name, &self.backend)
    }

    /// Gets a typed repository over the named collection.
    pub fn repository<'a, S: IntoModel>(&'a self, name: &str) -> TypedRepository<'a, B, S> {
        TypedRepository::new(name, &self.backend)
    }

    /// Shuts down the store and releases backend resources.
    ///
    /// # Errors
    ///
    /// Returns an error if the shutdown operation fails.
    pub async fn shutdown(self) -> DocumentStoreResult<()> {
        self.backend.shutdown().await
    }
}

impl<B: TransactionalBackend> DocumentStore<B> {
    /// Runs `unit` inside a transaction on this store's backend.
    ///
    /// See [`in_transaction`] for commit and abort semantics.
    pub async fn in_transaction<T, F>(&self, unit: F) -> DocumentStoreResult<T>
    where
        F: AsyncFnOnce(&B::Session) -> DocumentStoreResult<T>,
    {
        in_transaction(&self.backend, unit).await
    }
}
