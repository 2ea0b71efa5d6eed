mod common;

use common::{ITEMS, ItemSchema, item, oid, seeded_store};
use mongolayer::{
    bson::doc,
    collection::Collection,
    error::DocumentStoreError,
    memory::{InMemoryStore, Operation},
    query::Filter,
    repository::TypedRepository,
    store::DocumentStore,
    transaction::{TransactionSession, in_transaction},
};

#[tokio::test]
async fn committed_writes_become_visible() {
    let store = DocumentStore::new(InMemoryStore::new());

    let id = store
        .in_transaction(async |session| {
            let items = Collection::new(ITEMS, session);
            items.insert_one(item(1, "active")).await?;
            items.insert_one(item(2, "active")).await
        })
        .await
        .unwrap();

    assert_eq!(id, oid(2));
    assert_eq!(store.collection(ITEMS).count(doc! {}).await.unwrap(), 2);
}

#[tokio::test]
async fn failed_unit_rolls_back_and_returns_its_error() {
    let store = DocumentStore::new(seeded_store(1).await);

    let result = store
        .in_transaction(async |session| {
            let items = Collection::new(ITEMS, session);
            items.insert_one(item(2, "active")).await?;
            items.delete_one(Filter::id(oid(1))).await?;
            Err::<(), _>(DocumentStoreError::InvalidQuery("business rule violated".into()))
        })
        .await;

    assert!(matches!(result, Err(DocumentStoreError::InvalidQuery(msg)) if msg == "business rule violated"));

    let remaining = TypedRepository::<_, ItemSchema>::new(ITEMS, store.backend())
        .get_typed_list(doc! {}, &Default::default())
        .await
        .unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].id, oid(1).to_hex());
}

#[tokio::test]
async fn mutation_mismatch_inside_unit_aborts() {
    let backend = seeded_store(1).await;

    let result = in_transaction(&backend, async |session| {
        let items = Collection::new(ITEMS, session);
        items
            .update_one(Filter::id(oid(1)), doc! { "$set": { "status": "archived" } })
            .await?;
        items
            .update_one(Filter::id(oid(7)), doc! { "$set": { "status": "archived" } })
            .await
    })
    .await;

    assert!(matches!(result, Err(DocumentStoreError::MutationCountMismatch { .. })));

    let unchanged = Collection::new(ITEMS, &backend)
        .find_one(Filter::id(oid(1)))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(unchanged.get_str("status").unwrap(), "active");
}

#[tokio::test]
async fn reads_inside_the_unit_see_its_own_writes() {
    let store = DocumentStore::new(InMemoryStore::new());

    let seen = store
        .in_transaction(async |session| {
            let repo = TypedRepository::<_, ItemSchema>::new(ITEMS, session);
            repo.collection().insert_one(item(1, "active")).await?;
            let page = repo.get_paginated_list(doc! {}, None, Some(10)).await?;
            Ok(page.total)
        })
        .await
        .unwrap();

    assert_eq!(seen, 1);
}

#[tokio::test]
async fn backend_failure_inside_unit_aborts() {
    let backend = InMemoryStore::new();
    backend.fail_next(Operation::Update).await;

    let result = in_transaction(&backend, async |session| {
        let items = Collection::new(ITEMS, session);
        items.insert_one(item(1, "active")).await?;
        items
            .update_one(Filter::id(oid(1)), doc! { "$set": { "status": "archived" } })
            .await
    })
    .await;

    assert!(matches!(result, Err(DocumentStoreError::Backend(_))));
    assert_eq!(Collection::new(ITEMS, &backend).count(doc! {}).await.unwrap(), 0);
}

#[tokio::test]
async fn commit_conflict_is_returned_and_nothing_is_published() {
    let backend = seeded_store(1).await;

    let result = in_transaction(&backend, async |session| {
        let items = Collection::new(ITEMS, session);
        items.insert_one(item(2, "active")).await?;
        items
            .update_one(Filter::id(oid(1)), doc! { "$set": { "status": "archived" } })
            .await?;

        Collection::new(ITEMS, &backend).delete_one(Filter::id(oid(1))).await
    })
    .await;

    assert!(matches!(result, Err(DocumentStoreError::Transaction(_))));
    assert_eq!(Collection::new(ITEMS, &backend).count(doc! {}).await.unwrap(), 0);
}

#[tokio::test]
async fn failed_abort_keeps_the_unit_error() {
    let backend = seeded_store(1).await;

    let result = in_transaction(&backend, async |session| {
        Collection::new(ITEMS, session).delete_one(Filter::id(oid(1))).await?;
        session.abort_transaction().await?;
        Err::<(), _>(DocumentStoreError::InvalidQuery("unit failed".into()))
    })
    .await;

    assert!(matches!(result, Err(DocumentStoreError::InvalidQuery(msg)) if msg == "unit failed"));
    assert_eq!(Collection::new(ITEMS, &backend).count(doc! {}).await.unwrap(), 1);
}
