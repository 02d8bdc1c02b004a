use pg_escape::quote_identifier;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, Row, Transaction};
use tracing::{debug, info};

use crate::error::MirrorResult;
use crate::project::UpsertStatement;
use crate::schema::{
    DELETED_COLUMN, DOCUMENT_ID_COLUMN, SchemaCatalog, TableKind, TableSchema, VERSION_COLUMN,
    create_index_sql, create_table_sql,
};
use crate::store::base::StoreGateway;
use crate::types::{Cell, CurrentVersion};

/// Store gateway backed by a Postgres connection pool.
///
/// The pool is owned by the caller and passed in at construction; the gateway checks
/// a connection out per transaction and releases it on commit or rollback. The
/// `FOR UPDATE` read in [`StoreGateway::current_version`] takes the row lock that
/// serializes concurrent decisions on the same document id.
#[derive(Debug, Clone)]
pub struct PostgresGateway {
    pool: PgPool,
}

impl PostgresGateway {
    /// Creates a gateway over an existing connection pool.
    pub fn new(pool: PgPool) -> PostgresGateway {
        PostgresGateway { pool }
    }
}

impl StoreGateway for PostgresGateway {
    type Txn = Transaction<'static, Postgres>;

    async fn begin(&self) -> MirrorResult<Self::Txn> {
        let txn = self.pool.begin().await?;
        Ok(txn)
    }

    async fn current_version(
        &self,
        txn: &mut Self::Txn,
        schema: &TableSchema,
        document_id: &str,
    ) -> MirrorResult<Option<CurrentVersion>> {
        // The current view holds at most one row per document id, so this locks
        // exactly the row the decision is about.
        let sql = format!(
            "select {version}, {deleted} from {table} where {document_id} = $1 for update",
            version = quote_identifier(VERSION_COLUMN),
            deleted = quote_identifier(DELETED_COLUMN),
            table = quote_identifier(&schema.name),
            document_id = quote_identifier(DOCUMENT_ID_COLUMN),
        );

        let row: Option<PgRow> = sqlx::query(&sql)
            .bind(document_id)
            .fetch_optional(&mut **txn)
            .await?;

        match row {
            Some(row) => Ok(Some(CurrentVersion {
                version: row.try_get(0)?,
                deleted: row.try_get(1)?,
            })),
            None => Ok(None),
        }
    }

    async fn execute(&self, txn: &mut Self::Txn, statement: &UpsertStatement) -> MirrorResult<()> {
        let sql = statement.to_sql();
        debug!(table = %statement.table, document_id = %statement.document_id(), "executing upsert");

        let mut query = sqlx::query(&sql);
        for value in statement.bind_values() {
            query = match value {
                Cell::Bool(value) => query.bind(*value),
                Cell::I64(value) => query.bind(*value),
                Cell::F64(value) => query.bind(*value),
                Cell::String(value) => query.bind(value.as_str()),
                Cell::Json(value) => query.bind(value),
                // NULL cells are rendered as literals and never bound.
                Cell::Null => query,
            };
        }

        query.execute(&mut **txn).await?;

        Ok(())
    }

    async fn commit(&self, txn: Self::Txn) -> MirrorResult<()> {
        txn.commit().await?;
        Ok(())
    }

    async fn rollback(&self, txn: Self::Txn) -> MirrorResult<()> {
        txn.rollback().await?;
        Ok(())
    }

    async fn bootstrap(&self, catalog: &SchemaCatalog, history_mode: bool) -> MirrorResult<()> {
        for schema in catalog.tables() {
            let mut statements = vec![create_table_sql(schema, TableKind::CurrentView)];
            statements.extend(create_index_sql(schema, TableKind::CurrentView));

            if history_mode {
                statements.push(create_table_sql(schema, TableKind::History));
                statements.extend(create_index_sql(schema, TableKind::History));
            }

            for sql in statements {
                sqlx::query(&sql).execute(&self.pool).await?;
            }

            info!(table = %schema.name, history_mode, "bootstrapped table");
        }

        Ok(())
    }
}
