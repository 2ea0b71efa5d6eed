use std::fmt;

use async_trait::async_trait;
use bson::{Document, doc, oid::ObjectId};
use futures::TryStreamExt;
use mea::mutex::Mutex;
use mongodb::{
    Client, ClientSession, Collection as MongoCollection,
    options::ClientOptions,
    results::InsertOneResult,
};
use tracing::debug;

use mongolayer_core::{
    backend::{StoreBackend, StoreBackendBuilder, UpdateOutcome},
    error::{DocumentStoreError, DocumentStoreResult},
    query::FindOptions,
    transaction::{TransactionSession, TransactionalBackend},
};

use crate::{config::MongoDbConfig, options::to_driver_options};

#[derive(Debug, Clone)]
pub struct MongoDbStore {
    client: Client,
    database: String,
}

impl MongoDbStore {
    pub fn new(client: Client, database: String) -> Self {
        Self { client, database }
    }

    pub fn builder(uri: &str, database: &str) -> MongoDbStoreBuilder {
        MongoDbStoreBuilder::new(uri, database)
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    fn get_collection(&self, collection_name: &str) -> MongoCollection<Document> {
        self.client
            .database(&self.database)
            .collection(collection_name)
    }
}

fn inserted_object_id(result: InsertOneResult) -> DocumentStoreResult<ObjectId> {
    result.inserted_id.as_object_id().ok_or_else(|| {
        DocumentStoreError::InvalidQuery(format!(
            "inserted _id is not an ObjectId: {}",
            result.inserted_id
        ))
    })
}

#[async_trait]
impl StoreBackend for MongoDbStore {
    async fn find(
        &self,
        collection: &str,
        filter: Document,
        options: FindOptions,
    ) -> DocumentStoreResult<Vec<Document>> {
        self.get_collection(collection)
            .find(filter)
            .with_options(to_driver_options(options))
            .await
            .map_err(DocumentStoreError::backend)?
            .try_collect::<Vec<Document>>()
            .await
            .map_err(DocumentStoreError::backend)
    }

    async fn find_one(&self, collection: &str, filter: Document) -> DocumentStoreResult<Option<Document>> {
        self.get_collection(collection)
            .find_one(filter)
            .await
            .map_err(DocumentStoreError::backend)
    }

    async fn count(&self, collection: &str, filter: Document) -> DocumentStoreResult<u64> {
        self.get_collection(collection)
            .count_documents(filter)
            .await
            .map_err(DocumentStoreError::backend)
    }

    async fn insert_one(&self, collection: &str, document: Document) -> DocumentStoreResult<ObjectId> {
        let result = self
            .get_collection(collection)
            .insert_one(document)
            .await
            .map_err(DocumentStoreError::backend)?;

        inserted_object_id(result)
    }

    async fn update_one(
        &self,
        collection: &str,
        filter: Document,
        update: Document,
    ) -> DocumentStoreResult<UpdateOutcome> {
        let result = self
            .get_collection(collection)
            .update_one(filter, update)
            .await
            .map_err(DocumentStoreError::backend)?;

        Ok(UpdateOutcome {
            matched: result.matched_count,
            modified: result.modified_count,
        })
    }

    async fn delete_one(&self, collection: &str, filter: Document) -> DocumentStoreResult<u64> {
        let result = self
            .get_collection(collection)
            .delete_one(filter)
            .await
            .map_err(DocumentStoreError::backend)?;

        Ok(result.deleted_count)
    }

    async fn shutdown(self) -> DocumentStoreResult<()> {
        self.client.shutdown().await;

        Ok(())
    }
}

#[async_trait]
impl TransactionalBackend for MongoDbStore {
    type Session = MongoDbSession;

    async fn start_session(&self) -> DocumentStoreResult<Self::Session> {
        let session = self
            .client
            .start_session()
            .await
            .map_err(DocumentStoreError::backend)?;

        Ok(MongoDbSession {
            store: self.clone(),
            session: Mutex::new(session),
        })
    }
}

/// A driver session. Every operation issued through it is bound to the session, and so
/// to its transaction while one is open.
///
/// The driver ends the session on the server when this value is dropped; an open
/// transaction is aborted with it.
pub struct MongoDbSession {
    store: MongoDbStore,
    session: Mutex<ClientSession>,
}

impl fmt::Debug for MongoDbSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MongoDbSession")
            .field("database", &self.store.database)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl StoreBackend for MongoDbSession {
    async fn find(
        &self,
        collection: &str,
        filter: Document,
        options: FindOptions,
    ) -> DocumentStoreResult<Vec<Document>> {
        let mut session = self.session.lock().await;

        self.store
            .get_collection(collection)
            .find(filter)
            .with_options(to_driver_options(options))
            .session(&mut *session)
            .await
            .map_err(DocumentStoreError::backend)?
            .stream(&mut *session)
            .try_collect::<Vec<Document>>()
            .await
            .map_err(DocumentStoreError::backend)
    }

    async fn find_one(&self, collection: &str, filter: Document) -> DocumentStoreResult<Option<Document>> {
        let mut session = self.session.lock().await;

        self.store
            .get_collection(collection)
            .find_one(filter)
            .session(&mut *session)
            .await
            .map_err(DocumentStoreError::backend)
    }

    async fn count(&self, collection: &str, filter: Document) -> DocumentStoreResult<u64> {
        let mut session = self.session.lock().await;

        self.store
            .get_collection(collection)
            .count_documents(filter)
            .session(&mut *session)
            .await
            .map_err(DocumentStoreError::backend)
    }

    async fn insert_one(&self, collection: &str, document: Document) -> DocumentStoreResult<ObjectId> {
        let mut session = self.session.lock().await;

        let result = self
            .store
            .get_collection(collection)
            .insert_one(document)
            .session(&mut *session)
            .await
            .map_err(DocumentStoreError::backend)?;

        inserted_object_id(result)
    }

    async fn update_one(
        &self,
        collection: &str,
        filter: Document,
        update: Document,
    ) -> DocumentStoreResult<UpdateOutcome> {
        let mut session = self.session.lock().await;

        let result = self
            .store
            .get_collection(collection)
            .update_one(filter, update)
            .session(&mut *session)
            .await
            .map_err(DocumentStoreError::backend)?;

        Ok(UpdateOutcome {
            matched: result.matched_count,
            modified: result.modified_count,
        })
    }

    async fn delete_one(&self, collection: &str, filter: Document) -> DocumentStoreResult<u64> {
        let mut session = self.session.lock().await;

        let result = self
            .store
            .get_collection(collection)
            .delete_one(filter)
            .session(&mut *session)
            .await
            .map_err(DocumentStoreError::backend)?;

        Ok(result.deleted_count)
    }
}

#[async_trait]
impl TransactionSession for MongoDbSession {
    async fn start_transaction(&self) -> DocumentStoreResult<()> {
        self.session
            .lock()
            .await
            .start_transaction()
            .await
            .map_err(|e| DocumentStoreError::Transaction(e.to_string()))
    }

    async fn commit_transaction(&self) -> DocumentStoreResult<()> {
        self.session
            .lock()
            .await
            .commit_transaction()
            .await
            .map_err(|e| DocumentStoreError::Transaction(e.to_string()))
    }

    async fn abort_transaction(&self) -> DocumentStoreResult<()> {
        self.session
            .lock()
            .await
            .abort_transaction()
            .await
            .map_err(|e| DocumentStoreError::Transaction(e.to_string()))
    }
}

/// Connects to MongoDB and verifies the deployment is reachable before handing out a
/// store.
pub struct MongoDbStoreBuilder {
    config: MongoDbConfig,
}

impl MongoDbStoreBuilder {
    pub fn new(uri: &str, database: &str) -> Self {
        Self::from_config(MongoDbConfig::new(uri, database))
    }

    pub fn from_config(config: MongoDbConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl StoreBackendBuilder for MongoDbStoreBuilder {
    type Backend = MongoDbStore;

    /// Parses the connection string, connects, and pings the database.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::Initialization`] if the URI is invalid, or if the
    /// ping fails or does not answer within the configured ping timeout.
    async fn build(self) -> DocumentStoreResult<Self::Backend> {
        let mut options = ClientOptions::parse(&self.config.uri)
            .await
            .map_err(|e| DocumentStoreError::Initialization(e.to_string()))?;
        options.connect_timeout = Some(self.config.connect_timeout());

        let client = Client::with_options(options)
            .map_err(|e| DocumentStoreError::Initialization(e.to_string()))?;

        let database = client.database(&self.config.database);
        tokio::time::timeout(self.config.ping_timeout(), async {
            database.run_command(doc! { "ping": 1 }).await
        })
        .await
        .map_err(|_| {
            DocumentStoreError::Initialization(format!(
                "ping timed out after {}ms",
                self.config.ping_timeout_ms
            ))
        })?
        .map_err(|e| DocumentStoreError::Initialization(e.to_string()))?;

        debug!(database = %self.config.database, "connected to MongoDB");

        Ok(MongoDbStore::new(client, self.config.database))
    }
}
