//! Query construction for keyset pagination and plain list reads.
//!
//! This module provides the [`MongoQuery`] value consumed by the pagination executor,
//! the [`Filter`] helpers for writing MongoDB-style predicate documents, and the
//! [`FindOptions`] / [`ListOptions`] passed down to backends.
//!
//! # Query Building
//!
//! Every setter takes the query by value and returns the updated query, so a query can be
//! assembled in one expression and then shared read-only:
//!
//! ```ignore
//! use mongolayer::query::{MongoQuery, Filter};
//!
//! let query = MongoQuery::new()
//!     .with_query(Filter::eq("status", "active"))
//!     .with_limit(20)
//!     .with_default_sort_by_id();
//! ```
//!
//! Calling a setter twice overwrites the earlier value.
//!
//! # Keyset Pagination
//!
//! [`MongoQuery::from_list_query`] turns a page size and an optional cursor (the last id of
//! the previous page) into a query whose `after_query` is `{ "_id": { "$lt": cursor } }`.
//! Combined with the default descending `_id` sort this walks a collection from newest to
//! oldest without offsets.

use bson::{Bson, Document, doc, oid::ObjectId};

use crate::{error::DocumentStoreResult, id::parse_object_id};

/// Name of the unique identifier field.
pub const ID_FIELD: &str = "_id";

/// Sort direction for query results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    /// Ascending order (A to Z, 0 to 9, earliest to latest).
    Asc,
    /// Descending order (Z to A, 9 to 0, latest to earliest).
    Desc,
}

impl SortDirection {
    /// The numeric form MongoDB expects in a sort document.
    pub fn as_i32(self) -> i32 {
        match self {
            SortDirection::Asc => 1,
            SortDirection::Desc => -1,
        }
    }
}

/// Sort specification for one field.
#[derive(Debug, Clone, PartialEq)]
pub struct Sort {
    /// The field name to sort by.
    pub field: String,
    /// The sort direction.
    pub direction: SortDirection,
}

impl Sort {
    pub fn new(field: impl Into<String>, direction: SortDirection) -> Self {
        Self { field: field.into(), direction }
    }

    pub fn asc(field: impl Into<String>) -> Self {
        Self::new(field, SortDirection::Asc)
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self::new(field, SortDirection::Desc)
    }
}

/// Renders an ordered list of sort keys as a MongoDB sort document.
///
/// Key order is significant and preserved.
pub fn sort_document(sort: &[Sort]) -> Document {
    sort.iter()
        .map(|s| (s.field.clone(), Bson::Int32(s.direction.as_i32())))
        .collect()
}

/// Options for a single find operation.
///
/// `skip` and `limit` are independent; neither implies the other.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindOptions {
    /// Sort document (see [`sort_document`]).
    pub sort: Option<Document>,
    /// Number of matching records to skip.
    pub skip: Option<u64>,
    /// Maximum number of records to return.
    pub limit: Option<u64>,
}

/// Caller-facing options for offset based list reads.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListOptions {
    pub skip: Option<usize>,
    pub limit: Option<usize>,
    pub sort: Vec<Sort>,
}

impl ListOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_skip(mut self, skip: usize) -> Self {
        self.skip = Some(skip);
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_sort(mut self, sort: Vec<Sort>) -> Self {
        self.sort = sort;
        self
    }

    pub(crate) fn to_find_options(&self) -> FindOptions {
        FindOptions {
            sort: (!self.sort.is_empty()).then(|| sort_document(&self.sort)),
            skip: self.skip.map(|skip| skip as u64),
            limit: self.limit.map(|limit| limit as u64),
        }
    }
}

/// A paginated query: filter predicate, cursor predicate, sort order and page size.
///
/// `query` describes the whole result set and is the only predicate used for the total
/// count. `after_query` narrows the find to records after the cursor. When both mention
/// the same field, the `after_query` value wins.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MongoQuery {
    /// Page size. `None` means unbounded, in which case `has_more` is always false.
    pub limit: Option<usize>,
    /// Filter predicate for the whole result set.
    pub query: Document,
    /// Cursor predicate applied on top of `query` for the find only.
    pub after_query: Document,
    /// Ordered sort keys. Empty means natural order.
    pub sort: Vec<Sort>,
    /// Skip the count query and report a total of zero.
    pub ignore_total: bool,
}

impl MongoQuery {
    /// Creates an unbounded query with empty predicates and no sort.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a keyset pagination query from a page size and an optional cursor.
    ///
    /// The cursor must be the hex id of the last record of the previous page. Without a
    /// cursor, `after_query` is empty and iteration starts at the beginning.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::InvalidIdentifier`](crate::error::DocumentStoreError::InvalidIdentifier)
    /// if the cursor is not a valid identifier.
    pub fn from_list_query(limit: Option<usize>, after_id: Option<&str>) -> DocumentStoreResult<Self> {
        let after_query = match after_id {
            Some(after_id) => after_id_query(parse_object_id(after_id)?),
            None => Document::new(),
        };

        Ok(Self {
            limit,
            after_query,
            ..Self::default()
        })
    }

    pub fn with_sort(mut self, sort: Vec<Sort>) -> Self {
        self.sort = sort;
        self
    }

    /// Sorts by `_id` descending, the canonical order for cursor pagination.
    pub fn with_default_sort_by_id(self) -> Self {
        self.with_sort(vec![Sort::desc(ID_FIELD)])
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_ignore_total(mut self, ignore_total: bool) -> Self {
        self.ignore_total = ignore_total;
        self
    }

    pub fn with_query(mut self, query: Document) -> Self {
        self.query = query;
        self
    }

    pub fn with_after_query(mut self, after_query: Document) -> Self {
        self.after_query = after_query;
        self
    }

    /// Merges `query` and `after_query` into a fresh filter document.
    ///
    /// Fields are unioned; on a key collision the `after_query` value replaces the
    /// `query` value. Neither input is modified.
    pub fn merged_filter(&self) -> Document {
        let mut merged = self.query.clone();
        for (key, value) in &self.after_query {
            merged.insert(key.clone(), value.clone());
        }
        merged
    }
}

/// Cursor predicate selecting records whose id sorts strictly before `after`.
pub fn after_id_query(after: ObjectId) -> Document {
    doc! { ID_FIELD: { "$lt": after } }
}

/// Helper for writing MongoDB-style predicate documents.
///
/// Each method returns a single-field [`Document`]; combine them with [`Filter::and`] or
/// [`Filter::or`], or merge documents yourself when the fields differ.
///
/// ```ignore
/// use mongolayer::query::Filter;
///
/// let filter = Filter::and([
///     Filter::eq("status", "active"),
///     Filter::gt("age", 18),
/// ]);
/// ```
pub struct Filter;

impl Filter {
    fn op(field: impl Into<String>, op: &str, value: impl Into<Bson>) -> Document {
        let mut inner = Document::new();
        inner.insert(op, value.into());

        let mut outer = Document::new();
        outer.insert(field.into(), inner);
        outer
    }

    /// Matches documents where the field equals the specified value.
    pub fn eq(field: impl Into<String>, value: impl Into<Bson>) -> Document {
        let mut document = Document::new();
        document.insert(field.into(), value.into());
        document
    }

    /// Matches documents where the field does not equal the specified value.
    pub fn ne(field: impl Into<String>, value: impl Into<Bson>) -> Document {
        Self::op(field, "$ne", value)
    }

    pub fn gt(field: impl Into<String>, value: impl Into<Bson>) -> Document {
        Self::op(field, "$gt", value)
    }

    pub fn gte(field: impl Into<String>, value: impl Into<Bson>) -> Document {
        Self::op(field, "$gte", value)
    }

    pub fn lt(field: impl Into<String>, value: impl Into<Bson>) -> Document {
        Self::op(field, "$lt", value)
    }

    pub fn lte(field: impl Into<String>, value: impl Into<Bson>) -> Document {
        Self::op(field, "$lte", value)
    }

    /// Matches documents where the field equals any of the values.
    pub fn any_of<V: Into<Bson>>(field: impl Into<String>, values: impl IntoIterator<Item = V>) -> Document {
        Self::op(field, "$in", Self::array(values))
    }

    /// Matches documents where the field equals none of the values.
    pub fn none_of<V: Into<Bson>>(field: impl Into<String>, values: impl IntoIterator<Item = V>) -> Document {
        Self::op(field, "$nin", Self::array(values))
    }

    pub fn exists(field: impl Into<String>) -> Document {
        Self::op(field, "$exists", true)
    }

    pub fn not_exists(field: impl Into<String>) -> Document {
        Self::op(field, "$exists", false)
    }

    /// Single identifier equality on `_id`.
    pub fn id(id: ObjectId) -> Document {
        Self::eq(ID_FIELD, id)
    }

    /// Identifier-in-set on `_id`.
    pub fn id_in(ids: impl IntoIterator<Item = ObjectId>) -> Document {
        Self::any_of(ID_FIELD, ids)
    }

    /// All expressions must match.
    pub fn and(exprs: impl IntoIterator<Item = Document>) -> Document {
        doc! { "$and": exprs.into_iter().map(Bson::Document).collect::<Vec<_>>() }
    }

    /// Any expression may match.
    pub fn or(exprs: impl IntoIterator<Item = Document>) -> Document {
        doc! { "$or": exprs.into_iter().map(Bson::Document).collect::<Vec<_>>() }
    }

    fn array<V: Into<Bson>>(values: impl IntoIterator<Item = V>) -> Bson {
        Bson::Array(values.into_iter().map(Into::into).collect())
    }
}
