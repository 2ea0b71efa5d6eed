//! MongoDB backend implementation for mongolayer.
//!
//! This crate provides a MongoDB-based implementation of the `StoreBackend` and
//! `TransactionalBackend` traits on top of the official async driver. Filters, sorts and
//! update documents are passed to the server as they are.
//!
//! To use this backend, include the `mongodb` feature in your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! mongolayer = { version = "x.y.z", features = ["mongodb"] }
//! ```
//!
//! Transactions need a replica set or sharded cluster; a standalone server rejects
//! `start_transaction`.
//!
//! # Example
//!
//! ```ignore
//! use mongolayer::{backend::StoreBackendBuilder, mongodb::{MongoDbConfig, MongoDbStoreBuilder}};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = MongoDbStoreBuilder::from_config(MongoDbConfig::new("mongodb://localhost:27017", "app"))
//!         .build()
//!         .await?;
//!
//!     Ok(())
//! }
//! ```

#[allow(unused_extern_crates)]
extern crate self as mongolayer_mongodb;

pub mod config;
mod options;
pub mod store;

pub use config::MongoDbConfig;
pub use store::{MongoDbSession, MongoDbStore, MongoDbStoreBuilder};
