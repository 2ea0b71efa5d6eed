//! Typed, per-entity repositories.
//!
//! [`TypedRepository`] wraps a [`Collection`] with a schema type and returns domain
//! models. Lookups build the predicate (single id, id set, arbitrary filter) and delegate
//! to the collection or the pagination executor.

use bson::Document;
use std::{fmt, marker::PhantomData};

use crate::{
    backend::StoreBackend,
    collection::Collection,
    error::DocumentStoreResult,
    id::{parse_object_id, str_list_to_obj_id_list},
    page::PaginatedList,
    paginate::get_paginated_list_for_query,
    query::{Filter, ListOptions, MongoQuery},
    schema::{IntoModel, decode, into_models},
};

/// Repository for records of schema type `S`, returning `S::Model`.
///
/// # Type Parameters
///
/// * `'a` - Lifetime of the backend reference
/// * `B` - The storage backend type
/// * `S` - The storage-shaped record type
pub struct TypedRepository<'a, B: StoreBackend, S: IntoModel> {
    collection: Collection<'a, B>,
    _marker: PhantomData<fn() -> S>,
}

impl<'a, B: StoreBackend, S: IntoModel> fmt::Debug for TypedRepository<'a, B, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypedRepository")
            .field("collection", &self.collection)
            .field("schema", &std::any::type_name::<S>())
            .finish()
    }
}

impl<'a, B: StoreBackend, S: IntoModel> TypedRepository<'a, B, S> {
    pub fn new(collection_name: impl Into<String>, backend: &'a B) -> Self {
        Self::from_collection(Collection::new(collection_name, backend))
    }

    pub fn from_collection(collection: Collection<'a, B>) -> Self {
        Self { collection, _marker: PhantomData }
    }

    /// The untyped collection, for inserts, updates and deletes.
    pub fn collection(&self) -> &Collection<'a, B> {
        &self.collection
    }

    /// Returns the first record matching `filter` as a model.
    ///
    /// A miss is `Ok(None)`. Only real failures (backend errors, shape mismatches) are
    /// errors, so callers can use this as a presence check.
    pub async fn get_one(&self, filter: Document) -> DocumentStoreResult<Option<S::Model>> {
        match self.collection.find_one(filter).await? {
            Some(document) => Ok(Some(decode::<S>(document)?.into_model())),
            None => Ok(None),
        }
    }

    /// Looks a record up by its hex identifier.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::InvalidIdentifier`](crate::error::DocumentStoreError::InvalidIdentifier)
    /// for a malformed `id`. An unknown but well-formed id is `Ok(None)`.
    pub async fn get_one_by_id(&self, id: &str) -> DocumentStoreResult<Option<S::Model>> {
        self.get_one(Filter::id(parse_object_id(id)?)).await
    }

    /// Returns every record whose id is in `ids`. Unknown ids are skipped.
    pub async fn get_by_id_list<I: AsRef<str>>(&self, ids: &[I]) -> DocumentStoreResult<Vec<S::Model>> {
        let ids = str_list_to_obj_id_list(ids)?;
        self.get_typed_list(Filter::id_in(ids), &ListOptions::default()).await
    }

    /// Returns the records matching `filter` with the given skip, limit and sort.
    pub async fn get_typed_list(
        &self,
        filter: Document,
        options: &ListOptions,
    ) -> DocumentStoreResult<Vec<S::Model>> {
        let records = self.collection.find(filter, options.to_find_options()).await?;
        into_models::<S>(records)
    }

    /// Like [`get_typed_list`](Self::get_typed_list) but also returns the number of records
    /// matching `filter` overall.
    pub async fn get_counted_list(
        &self,
        filter: Document,
        options: &ListOptions,
    ) -> DocumentStoreResult<(Vec<S::Model>, u64)> {
        let (records, total) = self.collection.get_list(filter, options).await?;
        Ok((into_models::<S>(records)?, total))
    }

    /// Returns one page of records matching `filter`, newest first.
    ///
    /// `after` is the id of the last record of the previous page; `None` starts from the
    /// newest record.
    pub async fn get_paginated_list(
        &self,
        filter: Document,
        after: Option<&str>,
        limit: Option<usize>,
    ) -> DocumentStoreResult<PaginatedList<S::Model>> {
        let query = MongoQuery::from_list_query(limit, after)?
            .with_default_sort_by_id()
            .with_query(filter);

        self.get_paginated_list_for_query(&query).await
    }

    /// Runs an arbitrary [`MongoQuery`] through the pagination executor.
    pub async fn get_paginated_list_for_query(
        &self,
        query: &MongoQuery,
    ) -> DocumentStoreResult<PaginatedList<S::Model>> {
        get_paginated_list_for_query::<B, S>(&self.collection, query).await
    }
}
