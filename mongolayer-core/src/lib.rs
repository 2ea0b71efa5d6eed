//! A typed repository and keyset pagination layer over MongoDB-style document stores.
//!
//! This crate is the core of the mongolayer project and provides:
//!
//! - **Identifiers** ([`id`]) - Conversion and validation between hex strings and `ObjectId`s
//! - **Store backend abstraction** ([`backend`]) - The capability interface every backend implements
//! - **Query building** ([`query`]) - [`MongoQuery`](query::MongoQuery), sort specs and filter helpers
//! - **Pagination** ([`paginate`], [`page`]) - Over-fetch-by-one executor and the page envelope
//! - **Collections** ([`collection`]) - Untyped record operations on a named collection
//! - **Repositories** ([`repository`]) - Typed lookups returning domain models
//! - **Schemas** ([`schema`]) - Storage-shaped records and their model mapping
//! - **Transactions** ([`transaction`]) - Session-scoped units of work with commit or abort
//! - **Document store** ([`store`]) - Entry point owning a backend
//! - **Update documents** ([`update`]) - Partial `$set` bodies from patch structs
//! - **Geospatial queries** ([`location`]) - GeoJSON points and `$near` filters
//! - **Error handling** ([`error`]) - Error and result types
//!
//! # Example
//!
//! ```ignore
//! use mongolayer::{schema::IntoModel, store::DocumentStore};
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
//! impl IntoModel for UserSchema {
//!     type Model = Self;
//!
//!     fn into_model(self) -> Self {
//!         self
//!     }
//! }
//!
//! let store = DocumentStore::new(backend);
//! let page = store
//!     .repository::<UserSchema>("users")
//!     .get_paginated_list(doc! {}, None, Some(20))
//!     .await?;
//! ```

#[allow(unused_extern_crates)]
extern crate self as mongolayer_core;

pub mod backend;
pub mod collection;
pub mod error;
pub mod id;
pub mod location;
pub mod page;
pub mod paginate;
pub mod query;
pub mod repository;
pub mod schema;
pub mod store;
pub mod transaction;
pub mod update;
