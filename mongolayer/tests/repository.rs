mod common;

use common::{ITEMS, ItemSchema, hex, ids, oid, seeded_store};
use mongolayer::{
    bson::{doc, oid::ObjectId},
    error::DocumentStoreError,
    location::{LocationParameters, ObjectLocation, RawLocation},
    query::{Filter, ListOptions, Sort},
    schema::IntoModel,
    store::DocumentStore,
    update::build_update_doc,
};
use serde::{Deserialize, Serialize};

#[tokio::test]
async fn get_one_miss_is_none_not_an_error() {
    let store = DocumentStore::new(seeded_store(2).await);
    let repo = store.repository::<ItemSchema>(ITEMS);

    let found = repo.get_one_by_id(&oid(1).to_hex()).await.unwrap();
    assert_eq!(found.map(|item| item.name), Some("item-1".to_string()));

    assert_eq!(repo.get_one_by_id(&oid(99).to_hex()).await.unwrap(), None);
    assert_eq!(repo.get_one(doc! { "status": "archived" }).await.unwrap(), None);
}

#[tokio::test]
async fn malformed_ids_are_rejected() {
    let store = DocumentStore::new(seeded_store(1).await);
    let repo = store.repository::<ItemSchema>(ITEMS);

    assert!(matches!(
        repo.get_one_by_id("not-an-id").await,
        Err(DocumentStoreError::InvalidIdentifier { .. })
    ));
    assert!(matches!(
        repo.get_by_id_list(&[oid(1).to_hex(), "xyz".to_string()]).await,
        Err(DocumentStoreError::InvalidIdentifier { .. })
    ));
}

#[tokio::test]
async fn id_list_skips_unknown_ids() {
    let store = DocumentStore::new(seeded_store(3).await);
    let repo = store.repository::<ItemSchema>(ITEMS);

    let found = repo
        .get_by_id_list(&[oid(3).to_hex(), oid(42).to_hex(), oid(1).to_hex()])
        .await
        .unwrap();

    let mut found = ids(&found);
    found.sort();
    assert_eq!(found, hex(&[1, 3]));
}

#[tokio::test]
async fn typed_and_counted_lists_honour_options() {
    let store = DocumentStore::new(seeded_store(5).await);
    let repo = store.repository::<ItemSchema>(ITEMS);
    let options = ListOptions::new()
        .with_skip(1)
        .with_limit(2)
        .with_sort(vec![Sort::desc("_id")]);

    let listed = repo.get_typed_list(doc! {}, &options).await.unwrap();
    assert_eq!(ids(&listed), hex(&[4, 3]));

    let (listed, total) = repo
        .get_counted_list(Filter::gte("_id", oid(2)), &options)
        .await
        .unwrap();
    assert_eq!(ids(&listed), hex(&[4, 3]));
    assert_eq!(total, 4);
}

#[tokio::test]
async fn paginated_list_applies_the_filter() {
    let store = DocumentStore::new(seeded_store(4).await);
    store
        .collection(ITEMS)
        .update_one(Filter::id(oid(3)), doc! { "$set": { "status": "archived" } })
        .await
        .unwrap();

    let page = store
        .repository::<ItemSchema>(ITEMS)
        .get_paginated_list(Filter::eq("status", "active"), None, Some(2))
        .await
        .unwrap();

    assert_eq!(ids(&page.items), hex(&[4, 2]));
    assert!(page.has_more);
    assert_eq!(page.total, 3);
}

#[tokio::test]
async fn single_record_mutations_check_counts() {
    let store = DocumentStore::new(seeded_store(2).await);
    let items = store.collection(ITEMS);

    let missing = items
        .update_one(Filter::id(oid(9)), doc! { "$set": { "status": "x" } })
        .await
        .unwrap_err();
    assert!(matches!(
        missing,
        DocumentStoreError::MutationCountMismatch { operation: "modified", expected: 1, actual: 0 }
    ));
    assert_eq!(missing.to_string(), "Incorrect modified count should be 1 got 0");

    // matched but unchanged still counts as a mismatch
    assert!(items
        .update_one(Filter::id(oid(1)), doc! { "$set": { "status": "active" } })
        .await
        .is_err());

    items.delete_one(Filter::id(oid(1))).await.unwrap();
    assert!(matches!(
        items.delete_one(Filter::id(oid(1))).await,
        Err(DocumentStoreError::MutationCountMismatch { operation: "deleted", actual: 0, .. })
    ));
    assert_eq!(items.count(doc! {}).await.unwrap(), 1);
}

#[tokio::test]
async fn get_list_returns_records_and_total() {
    let store = DocumentStore::new(seeded_store(5).await);

    let (records, total) = store
        .collection(ITEMS)
        .get_list(doc! {}, &ListOptions::new().with_limit(2).with_skip(2).with_sort(vec![Sort::asc("_id")]))
        .await
        .unwrap();

    let found: Vec<ObjectId> = records.iter().map(|r| r.get_object_id("_id").unwrap()).collect();
    assert_eq!(found, vec![oid(3), oid(4)]);
    assert_eq!(total, 5);
}

#[derive(Serialize, Default)]
struct ItemPatch {
    name: String,
    status: String,
}

#[tokio::test]
async fn partial_updates_leave_unset_fields_alone() {
    let store = DocumentStore::new(seeded_store(1).await);
    let patch = ItemPatch { name: "renamed".into(), ..ItemPatch::default() };

    store
        .collection(ITEMS)
        .update_one(Filter::id(oid(1)), doc! { "$set": build_update_doc(&patch).unwrap() })
        .await
        .unwrap();

    let item = store
        .repository::<ItemSchema>(ITEMS)
        .get_one_by_id(&oid(1).to_hex())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(item.name, "renamed");
    assert_eq!(item.status, "active");
}

#[derive(Debug, Serialize, Deserialize)]
struct PlaceSchema {
    #[serde(rename = "_id")]
    id: ObjectId,
    name: String,
    location: ObjectLocation,
}

impl IntoModel for PlaceSchema {
    type Model = String;

    fn into_model(self) -> String {
        self.name
    }
}

#[tokio::test]
async fn near_query_finds_places_within_range() {
    let store = DocumentStore::new(mongolayer::memory::InMemoryStore::new());
    let places = store.collection("places");

    for (name, lat, lng) in [("office", 59.9139, 10.7522), ("cafe", 59.9149, 10.7522), ("cabin", 61.1153, 10.4662)] {
        let place = PlaceSchema {
            id: ObjectId::new(),
            name: name.to_string(),
            location: ObjectLocation::new(lat, lng),
        };
        places.insert(&place).await.unwrap();
    }

    let raw = RawLocation {
        longitude: Some("10.7522"),
        latitude: Some("59.9139"),
        max_distance: Some("1000"),
        ..RawLocation::default()
    };
    let params = LocationParameters::from_raw(raw, 50_000).unwrap().unwrap();

    let (mut names, total) = store
        .repository::<PlaceSchema>("places")
        .get_counted_list(params.to_filter("location"), &ListOptions::new())
        .await
        .unwrap();
    names.sort();

    assert_eq!(names, vec!["cafe".to_string(), "office".to_string()]);
    assert_eq!(total, 2);
}
