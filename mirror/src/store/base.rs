use std::future::Future;

use crate::error::MirrorResult;
use crate::project::UpsertStatement;
use crate::schema::{SchemaCatalog, TableSchema};
use crate::types::CurrentVersion;

/// Trait for stores that can hold the mirrored tables.
///
/// [`StoreGateway`] implementations expose the relational store as a sequence of
/// short transactions. The locking read in [`StoreGateway::current_version`] is the
/// sole concurrency-control mechanism of the system: any two concurrent decisions for
/// the same document id must serialize through it until the surrounding transaction
/// commits or rolls back.
///
/// Implementations should not retry internally; retry belongs to the transport layer
/// above the pipeline.
pub trait StoreGateway {
    /// Transaction handle type. One handle spans one event.
    type Txn: Send;

    /// Begins a new transaction.
    fn begin(&self) -> impl Future<Output = MirrorResult<Self::Txn>> + Send;

    /// Reads the maximum applied version for a document under a row lock.
    ///
    /// Returns `None` if the document has never been written. The lock must be held
    /// until the transaction ends so that concurrent decisions on the same document
    /// id serialize.
    fn current_version(
        &self,
        txn: &mut Self::Txn,
        schema: &TableSchema,
        document_id: &str,
    ) -> impl Future<Output = MirrorResult<Option<CurrentVersion>>> + Send;

    /// Executes one upsert inside the transaction.
    fn execute(
        &self,
        txn: &mut Self::Txn,
        statement: &UpsertStatement,
    ) -> impl Future<Output = MirrorResult<()>> + Send;

    /// Commits the transaction, making its writes visible.
    fn commit(&self, txn: Self::Txn) -> impl Future<Output = MirrorResult<()>> + Send;

    /// Rolls the transaction back, discarding its writes.
    fn rollback(&self, txn: Self::Txn) -> impl Future<Output = MirrorResult<()>> + Send;

    /// Creates the declared tables and indexes if they do not exist.
    ///
    /// Idempotent; run once at environment setup, not in steady-state processing.
    fn bootstrap(
        &self,
        catalog: &SchemaCatalog,
        history_mode: bool,
    ) -> impl Future<Output = MirrorResult<()>> + Send;
}
