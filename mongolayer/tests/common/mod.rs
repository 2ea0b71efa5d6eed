#![allow(dead_code)]

use mongolayer::{
    backend::StoreBackendBuilder,
    bson::{Document, doc, oid::ObjectId},
    memory::InMemoryStore,
    schema::IntoModel,
};
use serde::{Deserialize, Serialize};

pub const ITEMS: &str = "items";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemSchema {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub name: String,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    pub id: String,
    pub name: String,
    pub status: String,
}

impl IntoModel for ItemSchema {
    type Model = Item;

    fn into_model(self) -> Item {
        Item {
            id: self.id.to_hex(),
            name: self.name,
            status: self.status,
        }
    }
}

/// Deterministic, increasing identifiers: `oid(1) < oid(2) < ...`.
pub fn oid(n: u32) -> ObjectId {
    ObjectId::parse_str(format!("{n:024x}")).unwrap()
}

pub fn item(n: u32, status: &str) -> Document {
    doc! { "_id": oid(n), "name": format!("item-{n}"), "status": status }
}

/// A store holding items 1..=count, all with status "active".
pub async fn seeded_store(count: u32) -> InMemoryStore {
    InMemoryStore::builder()
        .with_documents(ITEMS, (1..=count).map(|n| item(n, "active")).collect())
        .build()
        .await
        .unwrap()
}

pub fn ids(items: &[Item]) -> Vec<String> {
    items.iter().map(|item| item.id.clone()).collect()
}

pub fn hex(ns: &[u32]) -> Vec<String> {
    ns.iter().map(|n| oid(*n).to_hex()).collect()
}
