//! Keyset pagination executor.
//!
//! [`get_paginated_list_for_query`] runs a [`MongoQuery`] against a collection and wraps
//! the result in a [`PaginatedList`]. It asks the backend for one record more than the
//! page size: if that extra record shows up there is another page, and it is dropped
//! before the page is returned.
//!
//! ```ignore
//! use mongolayer::{collection::Collection, paginate::get_paginated_list_for_query, query::MongoQuery};
//!
//! let query = MongoQuery::from_list_query(Some(20), after.as_deref())?.with_default_sort_by_id();
//! let page = get_paginated_list_for_query::<_, UserSchema>(&Collection::new("users", &backend), &query).await?;
//! ```

use tracing::debug;

use crate::{
    backend::StoreBackend,
    collection::Collection,
    error::{DocumentStoreError, DocumentStoreResult},
    page::PaginatedList,
    query::{FindOptions, MongoQuery, sort_document},
    schema::{IntoModel, decode_all},
};

/// Executes `query` against `collection` and maps each record of schema type `S` into
/// its model.
///
/// The find uses `query.query` merged with `query.after_query`. The total, unless
/// `ignore_total` is set, counts `query.query` alone so that it describes the whole
/// result set rather than what is left after the cursor. With `ignore_total` no count is
/// issued and `total` is zero.
///
/// # Errors
///
/// - [`DocumentStoreError::InvalidQuery`] for a page size of zero, or one too large to
///   peek past.
/// - Any backend error from the find or the count, unchanged.
/// - [`DocumentStoreError::Serialization`] if any record fails to decode as `S`; no
///   partial page is returned.
pub async fn get_paginated_list_for_query<B, S>(
    collection: &Collection<'_, B>,
    query: &MongoQuery,
) -> DocumentStoreResult<PaginatedList<S::Model>>
where
    B: StoreBackend,
    S: IntoModel,
{
    if query.limit == Some(0) {
        return Err(DocumentStoreError::InvalidQuery("limit must be a positive integer".to_string()));
    }

    // Peek one record past the page to learn whether another page exists
    let fetch_limit = match query.limit {
        Some(limit) => Some(limit.checked_add(1).ok_or_else(|| {
            DocumentStoreError::InvalidQuery(format!("limit {limit} is too large"))
        })?),
        None => None,
    };

    let options = FindOptions {
        sort: (!query.sort.is_empty()).then(|| sort_document(&query.sort)),
        skip: None,
        limit: fetch_limit.map(|limit| limit as u64),
    };
    let filter = query.merged_filter();

    debug!(
        collection = collection.name(),
        ?filter,
        limit = ?fetch_limit,
        "fetching page"
    );

    let records = collection.find(filter, options).await?;
    let mut schema = decode_all::<S>(records)?;

    let total = if query.ignore_total {
        0
    } else {
        collection.count(query.query.clone()).await?
    };

    let has_more = fetch_limit.is_some_and(|limit| schema.len() == limit);
    if has_more {
        schema.pop();
    }

    debug!(
        collection = collection.name(),
        items = schema.len(),
        has_more,
        total,
        "page fetched"
    );

    Ok(PaginatedList::new(
        schema.into_iter().map(IntoModel::into_model).collect(),
        has_more,
        total,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        backend::UpdateOutcome,
        query::Sort,
    };
    use async_trait::async_trait;
    use bson::{Document, doc, oid::ObjectId};
    use serde::Deserialize;
    use std::sync::Mutex;

    /// Records the calls it receives and serves a fixed result.
    #[derive(Debug, Default)]
    struct Recorder {
        rows: Vec<Document>,
        total: u64,
        finds: Mutex<Vec<(Document, FindOptions)>>,
        counts: Mutex<Vec<Document>>,
    }

    #[async_trait]
    impl StoreBackend for Recorder {
        async fn find(&self, _: &str, filter: Document, options: FindOptions) -> DocumentStoreResult<Vec<Document>> {
            let limit = options.limit.unwrap_or(u64::MAX) as usize;
            self.finds.lock().unwrap().push((filter, options));
            Ok(self.rows.iter().take(limit).cloned().collect())
        }

        async fn find_one(&self, _: &str, _: Document) -> DocumentStoreResult<Option<Document>> {
            Ok(self.rows.first().cloned())
        }

        async fn count(&self, _: &str, filter: Document) -> DocumentStoreResult<u64> {
            self.counts.lock().unwrap().push(filter);
            Ok(self.total)
        }

        async fn insert_one(&self, _: &str, _: Document) -> DocumentStoreResult<ObjectId> {
            Ok(ObjectId::new())
        }

        async fn update_one(&self, _: &str, _: Document, _: Document) -> DocumentStoreResult<UpdateOutcome> {
            Ok(UpdateOutcome::default())
        }

        async fn delete_one(&self, _: &str, _: Document) -> DocumentStoreResult<u64> {
            Ok(0)
        }
    }

    #[derive(Debug, Deserialize)]
    struct Row {
        n: i32,
    }

    impl IntoModel for Row {
        type Model = i32;

        fn into_model(self) -> i32 {
            self.n
        }
    }

    fn recorder(rows: i32, total: u64) -> Recorder {
        Recorder {
            rows: (1..=rows).map(|n| doc! { "n": n }).collect(),
            total,
            ..Recorder::default()
        }
    }

    #[tokio::test]
    async fn peeks_one_past_the_page() {
        let backend = recorder(4, 40);
        let query = MongoQuery::new()
            .with_limit(3)
            .with_sort(vec![Sort::desc("n")])
            .with_query(doc! { "kind": "a", "status": "open" })
            .with_after_query(doc! { "status": "closed" });

        let page = get_paginated_list_for_query::<_, Row>(&Collection::new("rows", &backend), &query)
            .await
            .unwrap();

        assert_eq!(page, PaginatedList::new(vec![1, 2, 3], true, 40));

        let finds = backend.finds.lock().unwrap();
        let (filter, options) = &finds[0];
        assert_eq!(filter, &doc! { "kind": "a", "status": "closed" });
        assert_eq!(options.limit, Some(4));
        assert_eq!(options.skip, None);
        assert_eq!(options.sort, Some(doc! { "n": -1 }));

        assert_eq!(*backend.counts.lock().unwrap(), vec![doc! { "kind": "a", "status": "open" }]);
    }

    #[tokio::test]
    async fn short_page_has_no_more() {
        let backend = recorder(2, 2);
        let query = MongoQuery::new().with_limit(3);

        let page = get_paginated_list_for_query::<_, Row>(&Collection::new("rows", &backend), &query)
            .await
            .unwrap();

        assert_eq!(page.items, vec![1, 2]);
        assert!(!page.has_more);
        assert_eq!(backend.finds.lock().unwrap()[0].1.sort, None);
    }

    #[tokio::test]
    async fn ignore_total_skips_the_count() {
        let backend = recorder(2, 99);
        let query = MongoQuery::new().with_limit(5).with_ignore_total(true);

        let page = get_paginated_list_for_query::<_, Row>(&Collection::new("rows", &backend), &query)
            .await
            .unwrap();

        assert_eq!(page.total, 0);
        assert!(backend.counts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn oversized_limit_is_rejected_before_any_io() {
        let backend = recorder(0, 0);
        let query = MongoQuery::new().with_limit(usize::MAX);

        let err = get_paginated_list_for_query::<_, Row>(&Collection::new("rows", &backend), &query)
            .await
            .unwrap_err();

        assert!(matches!(err, DocumentStoreError::InvalidQuery(_)));
        assert!(backend.finds.lock().unwrap().is_empty());
        assert!(backend.counts.lock().unwrap().is_empty());
    }
}
