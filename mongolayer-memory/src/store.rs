//! In-memory storage implementation.
//!
//! Documents are kept per collection in insertion order behind an async-aware
//! read-write lock. Every operation is counted, and a one-shot failure can be queued for
//! any operation, which makes the store usable as an instrumented test double.

use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

use async_trait::async_trait;
use bson::{Bson, Document, oid::ObjectId};
use mea::rwlock::RwLock;
use tracing::{debug, warn};

use mongolayer_core::{
    backend::{StoreBackend, StoreBackendBuilder, UpdateOutcome},
    error::{DocumentStoreError, DocumentStoreResult},
    query::{FindOptions, ID_FIELD},
    transaction::{TransactionSession, TransactionalBackend},
};

use crate::evaluator::{apply_update, compare_by, matches, parse_sort};

type CollectionData = Vec<Document>;
type StoreMap = HashMap<String, CollectionData>;

/// A backend operation, used to address counters and injected failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Find,
    FindOne,
    Count,
    Insert,
    Update,
    Delete,
}

/// Snapshot of how many times each operation has been issued.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreStats {
    pub finds: u64,
    pub find_ones: u64,
    pub counts: u64,
    pub inserts: u64,
    pub updates: u64,
    pub deletes: u64,
}

#[derive(Debug, Default)]
struct Counters {
    finds: AtomicU64,
    find_ones: AtomicU64,
    counts: AtomicU64,
    inserts: AtomicU64,
    updates: AtomicU64,
    deletes: AtomicU64,
}

impl Counters {
    fn counter(&self, operation: Operation) -> &AtomicU64 {
        match operation {
            Operation::Find => &self.finds,
            Operation::FindOne => &self.find_ones,
            Operation::Count => &self.counts,
            Operation::Insert => &self.inserts,
            Operation::Update => &self.updates,
            Operation::Delete => &self.deletes,
        }
    }

    fn snapshot(&self) -> StoreStats {
        StoreStats {
            finds: self.finds.load(Ordering::Relaxed),
            find_ones: self.find_ones.load(Ordering::Relaxed),
            counts: self.counts.load(Ordering::Relaxed),
            inserts: self.inserts.load(Ordering::Relaxed),
            updates: self.updates.load(Ordering::Relaxed),
            deletes: self.deletes.load(Ordering::Relaxed),
        }
    }

    fn reset(&self) {
        for operation in [
            Operation::Find,
            Operation::FindOne,
            Operation::Count,
            Operation::Insert,
            Operation::Update,
            Operation::Delete,
        ] {
            self.counter(operation).store(0, Ordering::Relaxed);
        }
    }
}

#[derive(Debug, Default)]
struct Shared {
    data: RwLock<StoreMap>,
    counters: Counters,
    faults: RwLock<Vec<Operation>>,
}

/// Thread-safe in-memory document storage backend.
///
/// `InMemoryStore` is cloneable and uses an `Arc`-wrapped internal state; clones share
/// the same data, counters and queued failures.
///
/// Queries scan every document in a collection. There are no indexes, and no unique
/// constraint other than on `_id`.
///
/// # Example
///
/// ```ignore
/// use mongolayer_memory::InMemoryStore;
/// use mongolayer::backend::StoreBackend;
/// use bson::doc;
///
/// let store = InMemoryStore::new();
/// let id = store.insert_one("users", doc! { "name": "Alice" }).await?;
/// assert_eq!(store.count("users", doc! {}).await?, 1);
/// assert_eq!(store.stats().inserts, 1);
/// ```
#[derive(Default, Clone, Debug)]
pub struct InMemoryStore {
    shared: Arc<Shared>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory document store.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builder() -> InMemoryStoreBuilder {
        InMemoryStoreBuilder::default()
    }

    /// Returns how many times each operation has been issued, through the store or any
    /// of its sessions.
    pub fn stats(&self) -> StoreStats {
        self.shared.counters.snapshot()
    }

    pub fn reset_stats(&self) {
        self.shared.counters.reset();
    }

    /// Makes the next call of `operation` fail with a backend error.
    pub async fn fail_next(&self, operation: Operation) {
        self.shared.faults.write().await.push(operation);
    }

    /// Counts the call and fires a queued failure, if any.
    async fn begin(&self, operation: Operation) -> DocumentStoreResult<()> {
        self.shared
            .counters
            .counter(operation)
            .fetch_add(1, Ordering::Relaxed);

        let mut faults = self.shared.faults.write().await;
        if let Some(position) = faults.iter().position(|queued| *queued == operation) {
            faults.remove(position);
            warn!(?operation, "injected backend failure");
            return Err(DocumentStoreError::backend(format!("injected {operation:?} failure")));
        }

        Ok(())
    }
}

#[async_trait]
impl StoreBackend for InMemoryStore {
    async fn find(
        &self,
        collection: &str,
        filter: Document,
        options: FindOptions,
    ) -> DocumentStoreResult<Vec<Document>> {
        self.begin(Operation::Find).await?;
        find_in(&*self.shared.data.read().await, collection, &filter, &options)
    }

    async fn find_one(&self, collection: &str, filter: Document) -> DocumentStoreResult<Option<Document>> {
        self.begin(Operation::FindOne).await?;
        find_one_in(&*self.shared.data.read().await, collection, &filter)
    }

    async fn count(&self, collection: &str, filter: Document) -> DocumentStoreResult<u64> {
        self.begin(Operation::Count).await?;
        count_in(&*self.shared.data.read().await, collection, &filter)
    }

    async fn insert_one(&self, collection: &str, document: Document) -> DocumentStoreResult<ObjectId> {
        self.begin(Operation::Insert).await?;
        let (id, document) = prepare_insert(document)?;
        insert_in(&mut *self.shared.data.write().await, collection, id, document)?;

        Ok(id)
    }

    async fn update_one(
        &self,
        collection: &str,
        filter: Document,
        update: Document,
    ) -> DocumentStoreResult<UpdateOutcome> {
        self.begin(Operation::Update).await?;
        update_in(&mut *self.shared.data.write().await, collection, &filter, &update)
    }

    async fn delete_one(&self, collection: &str, filter: Document) -> DocumentStoreResult<u64> {
        self.begin(Operation::Delete).await?;
        delete_in(&mut *self.shared.data.write().await, collection, &filter)
    }
}

#[async_trait]
impl TransactionalBackend for InMemoryStore {
    type Session = InMemorySession;

    async fn start_session(&self) -> DocumentStoreResult<Self::Session> {
        Ok(InMemorySession {
            store: self.clone(),
            transaction: RwLock::new(None),
        })
    }
}

#[derive(Debug)]
enum WriteOp {
    Insert { collection: String, id: ObjectId, document: Document },
    Update { collection: String, filter: Document, update: Document },
    Delete { collection: String, filter: Document },
}

#[derive(Debug)]
struct PendingTransaction {
    snapshot: StoreMap,
    writes: Vec<WriteOp>,
}

/// A session on an [`InMemoryStore`].
///
/// While a transaction is open, reads and writes go to a private snapshot taken when the
/// transaction started, and every write is recorded. Commit replays the recorded writes
/// onto the live data under a single write lock and publishes them all at once; if any
/// write no longer applies (a concurrent insert took the same `_id`, or the record an
/// update or delete touched is gone) nothing is published. Abort, or dropping the session, discards the snapshot.
///
/// Outside a transaction, operations go straight to the live data.
#[derive(Debug)]
pub struct InMemorySession {
    store: InMemoryStore,
    transaction: RwLock<Option<PendingTransaction>>,
}

impl InMemorySession {
    /// Whether a transaction is currently open on this session.
    pub async fn in_transaction(&self) -> bool {
        self.transaction.read().await.is_some()
    }
}

#[async_trait]
impl StoreBackend for InMemorySession {
    async fn find(
        &self,
        collection: &str,
        filter: Document,
        options: FindOptions,
    ) -> DocumentStoreResult<Vec<Document>> {
        let transaction = self.transaction.read().await;
        match &*transaction {
            Some(pending) => {
                self.store.begin(Operation::Find).await?;
                find_in(&pending.snapshot, collection, &filter, &options)
            }
            None => self.store.find(collection, filter, options).await,
        }
    }

    async fn find_one(&self, collection: &str, filter: Document) -> DocumentStoreResult<Option<Document>> {
        let transaction = self.transaction.read().await;
        match &*transaction {
            Some(pending) => {
                self.store.begin(Operation::FindOne).await?;
                find_one_in(&pending.snapshot, collection, &filter)
            }
            None => self.store.find_one(collection, filter).await,
        }
    }

    async fn count(&self, collection: &str, filter: Document) -> DocumentStoreResult<u64> {
        let transaction = self.transaction.read().await;
        match &*transaction {
            Some(pending) => {
                self.store.begin(Operation::Count).await?;
                count_in(&pending.snapshot, collection, &filter)
            }
            None => self.store.count(collection, filter).await,
        }
    }

    async fn insert_one(&self, collection: &str, document: Document) -> DocumentStoreResult<ObjectId> {
        let mut transaction = self.transaction.write().await;
        let Some(pending) = transaction.as_mut() else {
            return self.store.insert_one(collection, document).await;
        };

        self.store.begin(Operation::Insert).await?;
        let (id, document) = prepare_insert(document)?;
        insert_in(&mut pending.snapshot, collection, id, document.clone())?;
        pending.writes.push(WriteOp::Insert { collection: collection.to_string(), id, document });

        Ok(id)
    }

    async fn update_one(
        &self,
        collection: &str,
        filter: Document,
        update: Document,
    ) -> DocumentStoreResult<UpdateOutcome> {
        let mut transaction = self.transaction.write().await;
        let Some(pending) = transaction.as_mut() else {
            return self.store.update_one(collection, filter, update).await;
        };

        self.store.begin(Operation::Update).await?;
        let outcome = update_in(&mut pending.snapshot, collection, &filter, &update)?;
        if outcome.matched > 0 {
            pending.writes.push(WriteOp::Update { collection: collection.to_string(), filter, update });
        }

        Ok(outcome)
    }

    async fn delete_one(&self, collection: &str, filter: Document) -> DocumentStoreResult<u64> {
        let mut transaction = self.transaction.write().await;
        let Some(pending) = transaction.as_mut() else {
            return self.store.delete_one(collection, filter).await;
        };

        self.store.begin(Operation::Delete).await?;
        let deleted = delete_in(&mut pending.snapshot, collection, &filter)?;
        if deleted > 0 {
            pending.writes.push(WriteOp::Delete { collection: collection.to_string(), filter });
        }

        Ok(deleted)
    }
}

#[async_trait]
impl TransactionSession for InMemorySession {
    async fn start_transaction(&self) -> DocumentStoreResult<()> {
        let mut transaction = self.transaction.write().await;
        if transaction.is_some() {
            return Err(DocumentStoreError::Transaction("transaction already in progress".to_string()));
        }

        let snapshot = self.store.shared.data.read().await.clone();
        *transaction = Some(PendingTransaction { snapshot, writes: Vec::new() });

        Ok(())
    }

    async fn commit_transaction(&self) -> DocumentStoreResult<()> {
        let pending = self
            .transaction
            .write()
            .await
            .take()
            .ok_or_else(|| DocumentStoreError::Transaction("no transaction in progress".to_string()))?;

        let mut live = self.store.shared.data.write().await;
        let mut next = live.clone();

        for write in &pending.writes {
            replay(&mut next, write).map_err(|err| {
                DocumentStoreError::Transaction(format!("commit conflict: {err}"))
            })?;
        }

        *live = next;
        debug!(writes = pending.writes.len(), "in-memory transaction committed");

        Ok(())
    }

    async fn abort_transaction(&self) -> DocumentStoreResult<()> {
        let pending = self
            .transaction
            .write()
            .await
            .take()
            .ok_or_else(|| DocumentStoreError::Transaction("no transaction in progress".to_string()))?;

        debug!(writes = pending.writes.len(), "in-memory transaction aborted");

        Ok(())
    }
}

/// Applies one recorded write to `data`. An update or delete that no longer finds the
/// record it touched inside the transaction is a conflict.
fn replay(data: &mut StoreMap, write: &WriteOp) -> DocumentStoreResult<()> {
    let vanished = |operation: &str, collection: &str| {
        DocumentStoreError::Transaction(format!(
            "{operation} in {collection} no longer matches any record"
        ))
    };

    match write {
        WriteOp::Insert { collection, id, document } => insert_in(data, collection, *id, document.clone()),
        WriteOp::Update { collection, filter, update } => {
            if update_in(data, collection, filter, update)?.matched == 0 {
                return Err(vanished("update", collection));
            }
            Ok(())
        }
        WriteOp::Delete { collection, filter } => {
            if delete_in(data, collection, filter)? == 0 {
                return Err(vanished("delete", collection));
            }
            Ok(())
        }
    }
}

fn find_in(
    data: &StoreMap,
    collection: &str,
    filter: &Document,
    options: &FindOptions,
) -> DocumentStoreResult<Vec<Document>> {
    let Some(documents) = data.get(collection) else {
        return Ok(vec![]);
    };

    let mut found = Vec::new();
    for document in documents {
        if matches(document, filter)? {
            found.push(document.clone());
        }
    }

    if let Some(sort) = &options.sort {
        let sort = parse_sort(sort)?;
        found.sort_by(|a, b| compare_by(a, b, &sort));
    }

    // A limit of zero means no limit, as in MongoDB
    let limit = match options.limit {
        Some(0) | None => usize::MAX,
        Some(limit) => limit as usize,
    };

    Ok(found
        .into_iter()
        .skip(options.skip.unwrap_or(0) as usize)
        .take(limit)
        .collect())
}

fn find_one_in(data: &StoreMap, collection: &str, filter: &Document) -> DocumentStoreResult<Option<Document>> {
    let options = FindOptions { limit: Some(1), ..FindOptions::default() };
    Ok(find_in(data, collection, filter, &options)?.into_iter().next())
}

fn count_in(data: &StoreMap, collection: &str, filter: &Document) -> DocumentStoreResult<u64> {
    let Some(documents) = data.get(collection) else {
        return Ok(0);
    };

    let mut count = 0;
    for document in documents {
        if matches(document, filter)? {
            count += 1;
        }
    }

    Ok(count)
}

/// Assigns an `_id` when missing, placing it first as MongoDB does.
fn prepare_insert(document: Document) -> DocumentStoreResult<(ObjectId, Document)> {
    match document.get(ID_FIELD) {
        Some(Bson::ObjectId(id)) => Ok((*id, document)),
        Some(other) => Err(DocumentStoreError::InvalidQuery(format!(
            "_id must be an ObjectId, got {other}"
        ))),
        None => {
            let id = ObjectId::new();
            let mut with_id = Document::new();
            with_id.insert(ID_FIELD, id);
            with_id.extend(document);
            Ok((id, with_id))
        }
    }
}

fn insert_in(data: &mut StoreMap, collection: &str, id: ObjectId, document: Document) -> DocumentStoreResult<()> {
    let documents = data.entry(collection.to_string()).or_default();

    if documents.iter().any(|existing| existing.get(ID_FIELD) == Some(&Bson::ObjectId(id))) {
        return Err(DocumentStoreError::DocumentAlreadyExists(id.to_hex(), collection.to_string()));
    }

    documents.push(document);

    Ok(())
}

fn update_in(
    data: &mut StoreMap,
    collection: &str,
    filter: &Document,
    update: &Document,
) -> DocumentStoreResult<UpdateOutcome> {
    let Some(documents) = data.get_mut(collection) else {
        return Ok(UpdateOutcome::default());
    };

    for document in documents.iter_mut() {
        if matches(document, filter)? {
            let mut updated = document.clone();
            let changed = apply_update(&mut updated, update)?;
            *document = updated;

            return Ok(UpdateOutcome { matched: 1, modified: changed as u64 });
        }
    }

    Ok(UpdateOutcome::default())
}

fn delete_in(data: &mut StoreMap, collection: &str, filter: &Document) -> DocumentStoreResult<u64> {
    let Some(documents) = data.get_mut(collection) else {
        return Ok(0);
    };

    let mut position = None;
    for (index, document) in documents.iter().enumerate() {
        if matches(document, filter)? {
            position = Some(index);
            break;
        }
    }

    Ok(match position {
        Some(index) => {
            documents.remove(index);
            1
        }
        None => 0,
    })
}

/// Builder for constructing [`InMemoryStore`] instances, optionally pre-populated.
///
/// # Example
///
/// ```ignore
/// use mongolayer_memory::InMemoryStore;
/// use mongolayer::backend::StoreBackendBuilder;
///
/// let store = InMemoryStore::builder()
///     .with_documents("users", vec![doc! { "name": "Alice" }])
///     .build()
///     .await?;
/// ```
#[derive(Default, Debug)]
pub struct InMemoryStoreBuilder {
    seed: Vec<(String, Vec<Document>)>,
}

impl InMemoryStoreBuilder {
    /// Inserts `documents` into `collection` when the store is built.
    pub fn with_documents(mut self, collection: impl Into<String>, documents: Vec<Document>) -> Self {
        self.seed.push((collection.into(), documents));
        self
    }
}

#[async_trait]
impl StoreBackendBuilder for InMemoryStoreBuilder {
    type Backend = InMemoryStore;

    /// Builds the store and inserts the seed documents.
    ///
    /// Seeding does not count towards [`InMemoryStore::stats`].
    async fn build(self) -> DocumentStoreResult<Self::Backend> {
        let store = InMemoryStore::new();

        {
            let mut data = store.shared.data.write().await;
            for (collection, documents) in self.seed {
                for document in documents {
                    let (id, document) = prepare_insert(document)?;
                    insert_in(&mut data, &collection, id, document)?;
                }
            }
        }

        Ok(store)
    }
}
