use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::debug;

use crate::error::MirrorResult;
use crate::project::{ConflictAction, UpsertStatement};
use crate::schema::{SchemaCatalog, TableSchema};
use crate::store::base::StoreGateway;
use crate::types::{Cell, CurrentVersion};

/// One materialized row held by the in-memory gateway.
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryRow {
    /// Version the row was written at.
    pub version: i64,
    /// Whether the row is a tombstone.
    pub deleted: bool,
    /// Declared column values in schema order.
    pub fields: Vec<(String, Cell)>,
}

#[derive(Debug, Default)]
struct Inner {
    /// Current view: physical table name -> document id -> row.
    current: HashMap<String, HashMap<String, MemoryRow>>,
    /// History log: physical table name -> (document id, version) -> row.
    history: HashMap<String, BTreeMap<(String, i64), MemoryRow>>,
}

/// Transaction handle of the [`MemoryGateway`]: writes are staged and only become
/// visible on commit.
#[derive(Debug, Default)]
pub struct MemoryTxn {
    staged: Vec<UpsertStatement>,
}

/// In-memory store gateway for testing and development purposes.
///
/// [`MemoryGateway`] keeps the mirrored tables in process memory, making it ideal for
/// exercising the reconciliation pipeline without a live Postgres. It provides
/// transactional visibility (staged writes appear only after commit) but not the row
/// locking of the Postgres gateway, so it is not suitable for concurrent writers.
#[derive(Debug, Clone, Default)]
pub struct MemoryGateway {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryGateway {
    /// Creates a new empty in-memory gateway.
    pub fn new() -> MemoryGateway {
        MemoryGateway::default()
    }

    /// Returns the current-view row for a document, if any.
    pub async fn current_row(&self, table: &str, document_id: &str) -> Option<MemoryRow> {
        let inner = self.inner.lock().await;
        inner
            .current
            .get(table)
            .and_then(|rows| rows.get(document_id))
            .cloned()
    }

    /// Returns all history rows of a physical history table, ordered by key.
    pub async fn history_rows(&self, table: &str) -> Vec<((String, i64), MemoryRow)> {
        let inner = self.inner.lock().await;
        inner
            .history
            .get(table)
            .map(|rows| {
                rows.iter()
                    .map(|(key, row)| (key.clone(), row.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }
}

impl StoreGateway for MemoryGateway {
    type Txn = MemoryTxn;

    async fn begin(&self) -> MirrorResult<Self::Txn> {
        Ok(MemoryTxn::default())
    }

    async fn current_version(
        &self,
        txn: &mut Self::Txn,
        schema: &TableSchema,
        document_id: &str,
    ) -> MirrorResult<Option<CurrentVersion>> {
        // Uncommitted staged writes are not visible, matching read-committed
        // visibility across transactions.
        let _ = txn;

        let inner = self.inner.lock().await;
        let version = inner
            .current
            .get(&schema.name)
            .and_then(|rows| rows.get(document_id))
            .map(|row| CurrentVersion {
                version: row.version,
                deleted: row.deleted,
            });

        Ok(version)
    }

    async fn execute(&self, txn: &mut Self::Txn, statement: &UpsertStatement) -> MirrorResult<()> {
        txn.staged.push(statement.clone());
        Ok(())
    }

    async fn commit(&self, txn: Self::Txn) -> MirrorResult<()> {
        let mut inner = self.inner.lock().await;

        for statement in txn.staged {
            let row = MemoryRow {
                version: statement.version(),
                deleted: statement.deleted(),
                fields: statement
                    .fields()
                    .map(|(name, value)| (name.to_string(), value.clone()))
                    .collect(),
            };

            match statement.conflict {
                ConflictAction::ReplaceCurrent => {
                    inner
                        .current
                        .entry(statement.table.clone())
                        .or_default()
                        .insert(statement.document_id().to_string(), row);
                }
                ConflictAction::IgnoreDuplicate => {
                    inner
                        .history
                        .entry(statement.table.clone())
                        .or_default()
                        .entry((statement.document_id().to_string(), statement.version()))
                        .or_insert(row);
                }
            }
        }

        Ok(())
    }

    async fn rollback(&self, txn: Self::Txn) -> MirrorResult<()> {
        debug!("discarding {} staged writes", txn.staged.len());
        Ok(())
    }

    async fn bootstrap(&self, catalog: &SchemaCatalog, history_mode: bool) -> MirrorResult<()> {
        let mut inner = self.inner.lock().await;

        for schema in catalog.tables() {
            inner.current.entry(schema.name.clone()).or_default();
            if history_mode {
                inner.history.entry(schema.history_name()).or_default();
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::project::ConflictAction;

    fn statement(version: i64, conflict: ConflictAction) -> UpsertStatement {
        UpsertStatement {
            table: match conflict {
                ConflictAction::ReplaceCurrent => "person".to_string(),
                ConflictAction::IgnoreDuplicate => "person_history".to_string(),
            },
            columns: vec![
                "document_id".to_string(),
                "version".to_string(),
                "deleted".to_string(),
                "first_name".to_string(),
            ],
            values: vec![
                Cell::String("doc-1".to_string()),
                Cell::I64(version),
                Cell::Bool(false),
                Cell::String(format!("name-v{version}")),
            ],
            conflict,
        }
    }

    #[tokio::test]
    async fn writes_are_invisible_until_commit() {
        let gateway = MemoryGateway::new();

        let mut txn = gateway.begin().await.unwrap();
        gateway
            .execute(&mut txn, &statement(1, ConflictAction::ReplaceCurrent))
            .await
            .unwrap();

        assert!(gateway.current_row("person", "doc-1").await.is_none());

        gateway.commit(txn).await.unwrap();

        let row = gateway.current_row("person", "doc-1").await.unwrap();
        assert_eq!(row.version, 1);
    }

    #[tokio::test]
    async fn rollback_discards_staged_writes() {
        let gateway = MemoryGateway::new();

        let mut txn = gateway.begin().await.unwrap();
        gateway
            .execute(&mut txn, &statement(1, ConflictAction::ReplaceCurrent))
            .await
            .unwrap();
        gateway.rollback(txn).await.unwrap();

        assert!(gateway.current_row("person", "doc-1").await.is_none());
    }

    #[tokio::test]
    async fn history_inserts_never_overwrite() {
        let gateway = MemoryGateway::new();

        let mut txn = gateway.begin().await.unwrap();
        gateway
            .execute(&mut txn, &statement(1, ConflictAction::IgnoreDuplicate))
            .await
            .unwrap();
        gateway.commit(txn).await.unwrap();

        // Redeliver the same version with different contents.
        let mut redelivered = statement(1, ConflictAction::IgnoreDuplicate);
        redelivered.values[3] = Cell::String("changed".to_string());
        let mut txn = gateway.begin().await.unwrap();
        gateway.execute(&mut txn, &redelivered).await.unwrap();
        gateway.commit(txn).await.unwrap();

        let rows = gateway.history_rows("person_history").await;
        assert_eq!(rows.len(), 1);
        assert_eq!(
            rows[0].1.fields[0].1,
            Cell::String("name-v1".to_string())
        );
    }
}
