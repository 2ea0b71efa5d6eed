//! Main mongolayer crate: typed repositories and keyset pagination over MongoDB-style
//! document stores.
//!
//! This crate is the primary entry point for users of the mongolayer framework.
//! It re-exports the core types and functionality from the sub-crates and provides
//! access to the storage backends.
//!
//! # Features
//!
//! - **Typed repositories** - Storage-shaped schema types mapped into domain models
//! - **Keyset pagination** - Peek-ahead paging with `has_more` and an optional total
//! - **Transactions** - Units of work committed on success and aborted on failure
//! - **Multiple backends** - In-memory and MongoDB storage behind one trait
//!
//! # Quick Start
//!
//! ```ignore
//! use mongolayer::{prelude::*, memory::InMemoryStore};
//! use bson::{doc, oid::ObjectId};
//! use serde::{Serialize, Deserialize};
//!
//! #[derive(Debug, Clone, Serialize, Deserialize)]
//! pub struct UserSchema {
//!     #[serde(rename = "_id")]
//!     pub id: ObjectId,
//!     pub name: String,
//! }
//!
//! #[derive(Debug)]
//! pub struct User {
//!     pub id: String,
//!     pub name: String,
//! }
//!
//! impl IntoModel for UserSchema {
//!     type Model = User;
//!     fn into_model(self) -> User {
//!         User { id: self.id.to_hex(), name: self.name }
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> DocumentStoreResult<()> {
//!     let store = DocumentStore::new(InMemoryStore::builder().build().await?);
//!
//!     let id = store.collection("users").insert_one(doc! { "name": "Alice" }).await?;
//!
//!     let users = store.repository::<UserSchema>("users");
//!     let alice = users.get_one_by_id(&id.to_hex()).await?;
//!     let page = users.get_paginated_list(doc! {}, None, Some(20)).await?;
//!
//!     println!("{alice:?} {} of {}", page.items.len(), page.total);
//!
//!     store.shutdown().await
//! }
//! ```
//!
//! # Transactions
//!
//! ```ignore
//! store
//!     .in_transaction(async |session| {
//!         let orders = Collection::new("orders", session);
//!         orders.insert_one(doc! { "total": 10 }).await?;
//!         Collection::new("stock", session)
//!             .update_one(doc! { "sku": "A1" }, doc! { "$inc": { "qty": -1 } })
//!             .await
//!     })
//!     .await?;
//! ```
//!
//! # Backends
//!
//! - [`memory`] - In-memory storage for development and testing
//! - [`mongodb`] - MongoDB backend (requires `mongodb` feature)

pub mod prelude;

pub use mongolayer_core::{
    backend, collection, error, id, location, page, paginate, query, repository, schema, store, transaction, update,
};

// Re-export BSON types for convenience
pub use bson;

/// In-memory storage backend implementations.
pub mod memory {
    pub use mongolayer_memory::{InMemorySession, InMemoryStore, InMemoryStoreBuilder, Operation, StoreStats};
}

/// MongoDB storage backend implementations.
///
/// This module is only available when the `mongodb` feature is enabled.
#[cfg(feature = "mongodb")]
pub mod mongodb {
    pub use mongolayer_mongodb::{MongoDbConfig, MongoDbSession, MongoDbStore, MongoDbStoreBuilder};
}
