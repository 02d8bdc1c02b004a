//! End-to-end pipeline scenarios against the in-memory store gateway.

use serde_json::{Value, json};

use config::shared::{ColumnDefinition, ColumnType, PipelineConfig, TableDefinition};
use mirror::error::{ErrorKind, MirrorError, MirrorResult};
use mirror::pipeline::Mirror;
use mirror::project::UpsertStatement;
use mirror::schema::{SchemaCatalog, TableSchema};
use mirror::store::memory::MemoryTxn;
use mirror::store::{MemoryGateway, StoreGateway};
use mirror::types::{Cell, CurrentVersion};
use telemetry::tracing::init_test_tracing;

/// Gateway that simulates a concurrent writer owning one document: every write for
/// that document id fails with a unique violation, as Postgres reports when another
/// transaction inserted the row first.
#[derive(Clone)]
struct ContendedGateway {
    inner: MemoryGateway,
    contended_document: String,
}

impl StoreGateway for ContendedGateway {
    type Txn = MemoryTxn;

    async fn begin(&self) -> MirrorResult<Self::Txn> {
        self.inner.begin().await
    }

    async fn current_version(
        &self,
        txn: &mut Self::Txn,
        schema: &TableSchema,
        document_id: &str,
    ) -> MirrorResult<Option<CurrentVersion>> {
        self.inner.current_version(txn, schema, document_id).await
    }

    async fn execute(&self, txn: &mut Self::Txn, statement: &UpsertStatement) -> MirrorResult<()> {
        if statement.document_id() == self.contended_document {
            return Err(MirrorError::from((
                ErrorKind::UniqueViolation,
                "Row already present in the relational store",
            )));
        }

        self.inner.execute(txn, statement).await
    }

    async fn commit(&self, txn: Self::Txn) -> MirrorResult<()> {
        self.inner.commit(txn).await
    }

    async fn rollback(&self, txn: Self::Txn) -> MirrorResult<()> {
        self.inner.rollback(txn).await
    }

    async fn bootstrap(&self, catalog: &SchemaCatalog, history_mode: bool) -> MirrorResult<()> {
        self.inner.bootstrap(catalog, history_mode).await
    }
}

fn person_catalog() -> SchemaCatalog {
    let definition = TableDefinition {
        name: "person".to_string(),
        columns: vec![
            ColumnDefinition {
                name: "first_name".to_string(),
                column_type: ColumnType::Text,
                indexed: true,
            },
            ColumnDefinition {
                name: "age".to_string(),
                column_type: ColumnType::BigInt,
                indexed: false,
            },
        ],
    };

    SchemaCatalog::from_definitions(&[definition]).unwrap()
}

async fn spawn_mirror(strict_order: bool, history_mode: bool) -> (Mirror<MemoryGateway>, MemoryGateway) {
    init_test_tracing();

    let gateway = MemoryGateway::new();
    let mirror = Mirror::new(
        person_catalog(),
        PipelineConfig {
            strict_order,
            history_mode,
        },
        gateway.clone(),
    );
    mirror.bootstrap().await.unwrap();

    (mirror, gateway)
}

fn data_record(document_id: &str, version: i64, data: Value) -> Value {
    json!({
        "recordType": "REVISION_DETAILS",
        "payload": {
            "tableInfo": { "tableName": "person" },
            "revision": {
                "metadata": { "id": document_id, "version": version },
                "data": data
            }
        }
    })
}

fn tombstone_record(document_id: &str, version: i64) -> Value {
    json!({
        "recordType": "REVISION_DETAILS",
        "payload": {
            "tableInfo": { "tableName": "person" },
            "revision": {
                "metadata": { "id": document_id, "version": version }
            }
        }
    })
}

#[tokio::test]
async fn strict_order_applies_consecutive_versions() {
    let (mirror, gateway) = spawn_mirror(true, false).await;

    let batch = vec![
        data_record("doc-1", 1, json!({ "first_name": "ada", "age": 36 })),
        data_record("doc-1", 2, json!({ "first_name": "ada", "age": 37 })),
    ];

    let processed = mirror.process_batch(&batch).await.unwrap();
    assert_eq!(processed, 2);

    let row = gateway.current_row("person", "doc-1").await.unwrap();
    assert_eq!(row.version, 2);
    assert!(!row.deleted);
    assert_eq!(
        row.fields,
        vec![
            ("first_name".to_string(), Cell::String("ada".to_string())),
            ("age".to_string(), Cell::I64(37)),
        ]
    );
}

#[tokio::test]
async fn strict_order_rejects_version_gap() {
    let (mirror, gateway) = spawn_mirror(true, false).await;

    mirror
        .process_batch(&[data_record("doc-1", 1, json!({ "first_name": "ada" }))])
        .await
        .unwrap();

    let err = mirror
        .process_batch(&[data_record("doc-1", 3, json!({ "first_name": "ada" }))])
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ReconciliationReject);

    // The view is untouched by the rejected revision.
    let row = gateway.current_row("person", "doc-1").await.unwrap();
    assert_eq!(row.version, 1);
}

#[tokio::test]
async fn reject_keeps_earlier_records_of_the_same_batch() {
    let (mirror, gateway) = spawn_mirror(true, false).await;

    // One transaction per event: the in-order record lands before the gap aborts.
    let batch = vec![
        data_record("doc-1", 1, json!({ "first_name": "ada" })),
        data_record("doc-1", 3, json!({ "first_name": "ada" })),
    ];

    let err = mirror.process_batch(&batch).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ReconciliationReject);

    let row = gateway.current_row("person", "doc-1").await.unwrap();
    assert_eq!(row.version, 1);
}

#[tokio::test]
async fn duplicate_key_from_concurrent_writer_is_benign() {
    init_test_tracing();

    let inner = MemoryGateway::new();
    let gateway = ContendedGateway {
        inner: inner.clone(),
        contended_document: "doc-raced".to_string(),
    };
    let mirror = Mirror::new(
        person_catalog(),
        PipelineConfig {
            strict_order: true,
            history_mode: false,
        },
        gateway,
    );
    mirror.bootstrap().await.unwrap();

    let batch = vec![
        data_record("doc-raced", 1, json!({ "first_name": "ada" })),
        data_record("doc-1", 1, json!({ "first_name": "grace" })),
    ];

    // The raced record counts as processed and the batch keeps going.
    let processed = mirror.process_batch(&batch).await.unwrap();
    assert_eq!(processed, 2);

    assert!(inner.current_row("person", "doc-raced").await.is_none());
    let row = inner.current_row("person", "doc-1").await.unwrap();
    assert_eq!(row.version, 1);
}

#[tokio::test]
async fn strict_order_rejects_non_initial_first_version() {
    let (mirror, gateway) = spawn_mirror(true, false).await;

    let err = mirror
        .process_batch(&[data_record("doc-1", 2, json!({ "first_name": "ada" }))])
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ReconciliationReject);

    assert!(gateway.current_row("person", "doc-1").await.is_none());
}

#[tokio::test]
async fn best_effort_skips_stale_versions() {
    let (mirror, gateway) = spawn_mirror(false, false).await;

    let batch = vec![
        data_record("doc-1", 3, json!({ "first_name": "ada", "age": 38 })),
        data_record("doc-1", 1, json!({ "first_name": "ada", "age": 36 })),
    ];

    let processed = mirror.process_batch(&batch).await.unwrap();
    assert_eq!(processed, 2);

    let row = gateway.current_row("person", "doc-1").await.unwrap();
    assert_eq!(row.version, 3);
    assert_eq!(row.fields[1].1, Cell::I64(38));
}

#[tokio::test]
async fn duplicate_redelivery_is_idempotent() {
    let (mirror, gateway) = spawn_mirror(true, true).await;

    let batch = vec![data_record("doc-1", 1, json!({ "first_name": "ada" }))];

    mirror.process_batch(&batch).await.unwrap();
    mirror.process_batch(&batch).await.unwrap();

    let row = gateway.current_row("person", "doc-1").await.unwrap();
    assert_eq!(row.version, 1);
    assert_eq!(gateway.history_rows("person_history").await.len(), 1);
}

#[tokio::test]
async fn tombstone_clears_declared_columns() {
    let (mirror, gateway) = spawn_mirror(true, false).await;

    let batch = vec![
        data_record("doc-1", 1, json!({ "first_name": "ada", "age": 36 })),
        tombstone_record("doc-1", 2),
    ];

    mirror.process_batch(&batch).await.unwrap();

    let row = gateway.current_row("person", "doc-1").await.unwrap();
    assert_eq!(row.version, 2);
    assert!(row.deleted);
    assert_eq!(
        row.fields,
        vec![
            ("first_name".to_string(), Cell::Null),
            ("age".to_string(), Cell::Null),
        ]
    );
}

#[tokio::test]
async fn data_after_tombstone_is_rejected() {
    let (mirror, gateway) = spawn_mirror(false, false).await;

    mirror
        .process_batch(&[
            data_record("doc-1", 1, json!({ "first_name": "ada" })),
            tombstone_record("doc-1", 2),
        ])
        .await
        .unwrap();

    let err = mirror
        .process_batch(&[data_record("doc-1", 3, json!({ "first_name": "ada" }))])
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ReconciliationReject);

    let row = gateway.current_row("person", "doc-1").await.unwrap();
    assert!(row.deleted);
}

#[tokio::test]
async fn tombstone_without_base_is_rejected() {
    let (mirror, _gateway) = spawn_mirror(false, false).await;

    let err = mirror
        .process_batch(&[tombstone_record("doc-1", 1)])
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ReconciliationReject);
}

#[tokio::test]
async fn history_mode_keeps_every_applied_revision() {
    let (mirror, gateway) = spawn_mirror(true, true).await;

    mirror
        .process_batch(&[
            data_record("doc-1", 1, json!({ "first_name": "ada", "age": 36 })),
            data_record("doc-1", 2, json!({ "first_name": "ada", "age": 37 })),
            tombstone_record("doc-1", 3),
        ])
        .await
        .unwrap();

    let history = gateway.history_rows("person_history").await;
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].0, ("doc-1".to_string(), 1));
    assert_eq!(history[1].0, ("doc-1".to_string(), 2));
    assert_eq!(history[1].1.fields[1].1, Cell::I64(37));

    // The current view carries the tombstone; the history log never does.
    let row = gateway.current_row("person", "doc-1").await.unwrap();
    assert!(row.deleted);
    assert_eq!(row.version, 3);
}

#[tokio::test]
async fn malformed_records_are_skipped_without_aborting_the_batch() {
    let (mirror, gateway) = spawn_mirror(true, false).await;

    let batch = vec![
        json!({ "recordType": "CONTROL" }),
        data_record("doc-1", 1, json!({ "first_name": "ada" })),
    ];

    let processed = mirror.process_batch(&batch).await.unwrap();
    assert_eq!(processed, 1);
    assert!(gateway.current_row("person", "doc-1").await.is_some());
}

#[tokio::test]
async fn block_summaries_count_as_processed() {
    let (mirror, _gateway) = spawn_mirror(true, false).await;

    let batch = vec![
        json!({ "recordType": "BLOCK_SUMMARY", "payload": {} }),
        data_record("doc-1", 1, json!({ "first_name": "ada" })),
    ];

    let processed = mirror.process_batch(&batch).await.unwrap();
    assert_eq!(processed, 2);
}

#[tokio::test]
async fn undeclared_table_aborts_the_batch() {
    let (mirror, _gateway) = spawn_mirror(true, false).await;

    let record = json!({
        "recordType": "REVISION_DETAILS",
        "payload": {
            "tableInfo": { "tableName": "vehicle" },
            "revision": {
                "metadata": { "id": "doc-1", "version": 1 },
                "data": { "first_name": "ada" }
            }
        }
    });

    let err = mirror.process_batch(&[record]).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MissingTableSchema);
}

#[tokio::test]
async fn undeclared_field_aborts_the_batch() {
    let (mirror, gateway) = spawn_mirror(true, false).await;

    let err = mirror
        .process_batch(&[data_record("doc-1", 1, json!({ "nickname": "ada" }))])
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::SchemaMismatch);

    assert!(gateway.current_row("person", "doc-1").await.is_none());
}
