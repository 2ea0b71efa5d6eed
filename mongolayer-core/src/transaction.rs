//! Transaction-scoped execution.
//!
//! A [`TransactionalBackend`] can open sessions; a [`TransactionSession`] is itself a
//! [`StoreBackend`] whose operations all take part in the session's transaction, so
//! collections and repositories can be built on it directly.
//!
//! [`in_transaction`] is the usual entry point: it opens a session, starts a transaction,
//! runs the unit of work, commits on success and aborts on failure. The session is
//! released on every path when it goes out of scope.
//!
//! ```ignore
//! use mongolayer::{collection::Collection, transaction::in_transaction};
//! use bson::doc;
//!
//! let id = in_transaction(&backend, async |session| {
//!     let orders = Collection::new("orders", session);
//!     let id = orders.insert_one(doc! { "total": 10 }).await?;
//!     Collection::new("stock", session)
//!         .update_one(doc! { "sku": "A1" }, doc! { "$inc": { "qty": -1 } })
//!         .await?;
//!     Ok(id)
//! })
//! .await?;
//! ```

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::{backend::StoreBackend, error::DocumentStoreResult};

/// A session whose data operations run inside its current transaction.
#[async_trait]
pub trait TransactionSession: StoreBackend {
    async fn start_transaction(&self) -> DocumentStoreResult<()>;

    /// Makes every write of the current transaction visible.
    async fn commit_transaction(&self) -> DocumentStoreResult<()>;

    /// Discards every write of the current transaction.
    async fn abort_transaction(&self) -> DocumentStoreResult<()>;
}

/// A backend able to open transaction sessions.
#[async_trait]
pub trait TransactionalBackend: StoreBackend {
    type Session: TransactionSession + 'static;

    async fn start_session(&self) -> DocumentStoreResult<Self::Session>;
}

/// Runs `unit` inside a fresh transaction on `backend`.
///
/// On `Ok` the transaction is committed and the value returned; a failed commit is
/// returned as the error. On `Err` the transaction is aborted and the unit's error is
/// returned. If the abort itself fails that failure is logged, the unit's error still
/// wins. Writes made by a failed unit are never visible outside the session.
pub async fn in_transaction<B, T, F>(backend: &B, unit: F) -> DocumentStoreResult<T>
where
    B: TransactionalBackend,
    F: AsyncFnOnce(&B::Session) -> DocumentStoreResult<T>,
{
    let session = backend.start_session().await?;
    session.start_transaction().await?;

    match unit(&session).await {
        Ok(value) => {
            session.commit_transaction().await?;
            debug!("transaction committed");
            Ok(value)
        }
        Err(err) => {
            if let Err(abort_err) = session.abort_transaction().await {
                warn!(error = %abort_err, "failed to abort transaction");
            }
            debug!(error = %err, "transaction aborted");
            Err(err)
        }
    }
}
