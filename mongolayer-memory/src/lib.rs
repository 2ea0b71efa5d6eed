//! In-memory document storage backend for mongolayer.
//!
//! This crate provides a thread-safe, in-memory implementation of the `StoreBackend` and
//! `TransactionalBackend` traits. It interprets MongoDB-style filter and update documents,
//! so code written against the MongoDB backend runs unchanged against it.
//!
//! # Features
//!
//! - **Mongo-style filters** - Equality, comparison, set membership, existence and `$near`
//! - **Transactions** - Session snapshots published atomically on commit
//! - **Instrumentation** - Per-operation call counters and one-shot failure injection
//!
//! # Quick Start
//!
//! ```ignore
//! use mongolayer::{memory::InMemoryStore, store::DocumentStore, backend::StoreBackendBuilder};
//! use bson::doc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let backend = InMemoryStore::builder()
//!         .with_documents("users", vec![doc! { "name": "Alice" }])
//!         .build()
//!         .await?;
//!     let store = DocumentStore::new(backend);
//!
//!     let users = store.repository::<UserSchema>("users");
//!     let page = users.get_paginated_list(doc! {}, None, Some(10)).await?;
//!     assert_eq!(page.total, 1);
//!
//!     Ok(())
//! }
//! ```

#[allow(unused_extern_crates)]
extern crate self as mongolayer_memory;

mod evaluator;
pub mod store;

pub use store::{InMemorySession, InMemoryStore, InMemoryStoreBuilder, Operation, StoreStats};
