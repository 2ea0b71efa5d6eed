//! Convenient re-exports of commonly used types from mongolayer.
//!
//! ```ignore
//! use mongolayer::prelude::*;
//! ```

pub use mongolayer_core::{
    backend::{StoreBackend, StoreBackendBuilder, UpdateOutcome},
    collection::Collection,
    error::{DocumentStoreError, DocumentStoreResult},
    id::{obj_id_to_str, parse_object_id, str_to_obj_id},
    location::{LocationParameters, ObjectLocation},
    page::PaginatedList,
    paginate::get_paginated_list_for_query,
    query::{Filter, ListOptions, MongoQuery, Sort, SortDirection},
    repository::TypedRepository,
    schema::IntoModel,
    store::DocumentStore,
    transaction::{TransactionSession, TransactionalBackend, in_transaction},
    update::build_update_doc,
};
