//! Per-batch reconciliation pipeline.
//!
//! Drives one batch of decoded change-stream records through normalization,
//! reconciliation, projection, and the store gateway. Events are processed
//! sequentially in arrival order; one transaction spans exactly one event.

use serde_json::Value;
use tracing::{debug, info, warn};

use config::shared::PipelineConfig;

use crate::error::{ErrorKind, MirrorResult};
use crate::mirror_error;
use crate::normalize::normalize_record;
use crate::project::{project, project_history};
use crate::reconcile::{OrderingPolicy, decide};
use crate::schema::{SchemaCatalog, TableSchema};
use crate::store::StoreGateway;
use crate::types::{ReconciliationDecision, RevisionEvent};

/// Reconciles a versioned change stream into the relational store.
///
/// [`Mirror`] holds no per-document state: the store is the single source of truth
/// for what version has been applied, read fresh under a row lock on every decision.
/// Multiple instances may run concurrently against the same store; they serialize per
/// document id through the gateway's locking read.
#[derive(Debug, Clone)]
pub struct Mirror<G: StoreGateway> {
    catalog: SchemaCatalog,
    policy: OrderingPolicy,
    history_mode: bool,
    gateway: G,
}

impl<G: StoreGateway> Mirror<G> {
    /// Creates a mirror over a schema catalog and a store gateway.
    pub fn new(catalog: SchemaCatalog, pipeline: PipelineConfig, gateway: G) -> Mirror<G> {
        Mirror {
            catalog,
            policy: OrderingPolicy {
                strict_order: pipeline.strict_order,
            },
            history_mode: pipeline.history_mode,
            gateway,
        }
    }

    /// Creates the declared tables and indexes if they do not exist.
    ///
    /// Idempotent; intended to run once at environment setup.
    pub async fn bootstrap(&self) -> MirrorResult<()> {
        self.gateway
            .bootstrap(&self.catalog, self.history_mode)
            .await
    }

    /// Processes one ordered batch of decoded change-stream records.
    ///
    /// Returns the number of records processed. Malformed records are skipped with a
    /// warning and the batch continues; a reconciliation reject or a fatal store
    /// error aborts the batch so the transport can redeliver or alert, leaving
    /// already-committed events in place.
    pub async fn process_batch(&self, records: &[Value]) -> MirrorResult<usize> {
        let mut processed = 0;

        for record in records {
            match normalize_record(record) {
                Ok(Some(event)) => {
                    self.process_event(event).await?;
                    processed += 1;
                }
                // Block summaries carry nothing to reconcile but count as processed.
                Ok(None) => processed += 1,
                Err(err) if err.kind() == ErrorKind::DecodeError => {
                    warn!(error = %err, "skipping malformed change-stream record");
                }
                Err(err) => return Err(err),
            }
        }

        info!(processed, "processed change-stream batch");

        Ok(processed)
    }

    /// Runs the decision-and-apply sequence for one event inside one transaction.
    async fn process_event(&self, event: RevisionEvent) -> MirrorResult<()> {
        let Some(schema) = self.catalog.get(&event.table) else {
            return Err(mirror_error!(
                ErrorKind::MissingTableSchema,
                "Event references an undeclared table",
                format!("table `{}` is not in the schema catalog", event.table)
            ));
        };

        let mut txn = self.gateway.begin().await?;

        let current = match self
            .gateway
            .current_version(&mut txn, schema, &event.document_id)
            .await
        {
            Ok(current) => current,
            Err(err) => {
                let _ = self.gateway.rollback(txn).await;
                return Err(err);
            }
        };

        let decision = decide(&event, current, self.policy);
        debug!(
            table = %event.table,
            document_id = %event.document_id,
            version = event.version,
            ?decision,
            "reconciled revision"
        );

        match decision {
            ReconciliationDecision::Apply => match self.apply(&mut txn, &event, schema).await {
                Ok(()) => self.gateway.commit(txn).await,
                Err(err) if err.kind() == ErrorKind::UniqueViolation => {
                    // Another writer applied this row first; the store already holds
                    // the version, so the event is a no-op.
                    warn!(
                        table = %event.table,
                        document_id = %event.document_id,
                        version = event.version,
                        "row already applied, continuing"
                    );
                    self.gateway.rollback(txn).await
                }
                Err(err) => {
                    let _ = self.gateway.rollback(txn).await;
                    Err(err)
                }
            },
            ReconciliationDecision::SkipDuplicate | ReconciliationDecision::SkipOutOfOrder => {
                // Expected steady-state outcomes under at-least-once delivery.
                debug!(
                    table = %event.table,
                    document_id = %event.document_id,
                    version = event.version,
                    ?decision,
                    "skipping revision"
                );
                self.gateway.rollback(txn).await
            }
            ReconciliationDecision::Reject(reason) => {
                let _ = self.gateway.rollback(txn).await;
                Err(mirror_error!(
                    ErrorKind::ReconciliationReject,
                    "Revision violates the ordering policy",
                    format!(
                        "{reason} (table `{}`, document `{}`, version {})",
                        event.table, event.document_id, event.version
                    )
                ))
            }
        }
    }

    /// Executes the projected writes for an applied event.
    async fn apply(
        &self,
        txn: &mut G::Txn,
        event: &RevisionEvent,
        schema: &TableSchema,
    ) -> MirrorResult<()> {
        let statement = project(event, schema)?;
        self.gateway.execute(txn, &statement).await?;

        // The history log records every applied data revision; tombstones only touch
        // the current view.
        if self.history_mode && !event.is_tombstone {
            let history = project_history(event, schema)?;
            self.gateway.execute(txn, &history).await?;
        }

        Ok(())
    }
}
