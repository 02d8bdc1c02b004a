//! Idempotent DDL builders for mirrored tables.
//!
//! Every statement is `IF NOT EXISTS` so that bootstrap can run on every process
//! start. The current view is keyed by document id and replaced in place; the history
//! table is keyed by `(document_id, version)` and never overwritten.

use pg_escape::quote_identifier;

use crate::schema::{DELETED_COLUMN, DOCUMENT_ID_COLUMN, TableSchema, VERSION_COLUMN};

/// Which physical rendition of a logical table a statement targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableKind {
    /// Single live row per document id.
    CurrentView,
    /// Append-only log of every applied version.
    History,
}

impl TableKind {
    /// Returns the physical table name for this rendition of the schema.
    pub fn physical_name(&self, schema: &TableSchema) -> String {
        match self {
            TableKind::CurrentView => schema.name.clone(),
            TableKind::History => schema.history_name(),
        }
    }
}

/// Builds the `CREATE TABLE IF NOT EXISTS` statement for one table rendition.
pub fn create_table_sql(schema: &TableSchema, kind: TableKind) -> String {
    let table_name = kind.physical_name(schema);
    let table = quote_identifier(&table_name);

    let mut sql = format!("create table if not exists {table} (");
    sql.push_str(&format!(
        "{} text not null, ",
        quote_identifier(DOCUMENT_ID_COLUMN)
    ));
    sql.push_str(&format!(
        "{} bigint not null, ",
        quote_identifier(VERSION_COLUMN)
    ));
    sql.push_str(&format!(
        "{} boolean not null default false, ",
        quote_identifier(DELETED_COLUMN)
    ));

    for column in &schema.columns {
        sql.push_str(&format!(
            "{} {}, ",
            quote_identifier(&column.name),
            column.column_type.as_sql()
        ));
    }

    let primary_key = match kind {
        TableKind::CurrentView => format!("primary key ({})", quote_identifier(DOCUMENT_ID_COLUMN)),
        TableKind::History => format!(
            "primary key ({}, {})",
            quote_identifier(DOCUMENT_ID_COLUMN),
            quote_identifier(VERSION_COLUMN)
        ),
    };
    sql.push_str(&primary_key);
    sql.push(')');

    sql
}

/// Builds the composite secondary index statement over the indexed columns.
///
/// Returns `None` when the schema flags no columns as indexed.
pub fn create_index_sql(schema: &TableSchema, kind: TableKind) -> Option<String> {
    let indexed: Vec<&str> = schema
        .columns
        .iter()
        .filter(|column| column.indexed)
        .map(|column| column.name.as_str())
        .collect();

    if indexed.is_empty() {
        return None;
    }

    let table_name = kind.physical_name(schema);
    let index_ident = format!("{table_name}_secondary_idx");
    let index_name = quote_identifier(&index_ident);
    let table = quote_identifier(&table_name);
    let columns = indexed
        .iter()
        .map(|name| quote_identifier(name).into_owned())
        .collect::<Vec<_>>()
        .join(", ");

    Some(format!(
        "create index if not exists {index_name} on {table} ({columns})"
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ColumnSchema;
    use config::shared::ColumnType;

    fn person_schema() -> TableSchema {
        TableSchema {
            name: "person".to_string(),
            columns: vec![
                ColumnSchema {
                    name: "first_name".to_string(),
                    column_type: ColumnType::Text,
                    indexed: true,
                },
                ColumnSchema {
                    name: "age".to_string(),
                    column_type: ColumnType::BigInt,
                    indexed: true,
                },
                ColumnSchema {
                    name: "details".to_string(),
                    column_type: ColumnType::Jsonb,
                    indexed: false,
                },
            ],
        }
    }

    #[test]
    fn current_view_table_is_keyed_by_document_id() {
        let sql = create_table_sql(&person_schema(), TableKind::CurrentView);

        assert_eq!(
            sql,
            "create table if not exists person (document_id text not null, \
             version bigint not null, deleted boolean not null default false, \
             first_name text, age bigint, details jsonb, primary key (document_id))"
        );
    }

    #[test]
    fn history_table_is_keyed_by_document_id_and_version() {
        let sql = create_table_sql(&person_schema(), TableKind::History);

        assert!(sql.starts_with("create table if not exists person_history ("));
        assert!(sql.ends_with("primary key (document_id, version))"));
    }

    #[test]
    fn secondary_index_covers_all_flagged_columns() {
        let sql = create_index_sql(&person_schema(), TableKind::CurrentView).unwrap();

        assert_eq!(
            sql,
            "create index if not exists person_secondary_idx on person (first_name, age)"
        );
    }

    #[test]
    fn no_index_without_flagged_columns() {
        let mut schema = person_schema();
        for column in &mut schema.columns {
            column.indexed = false;
        }

        assert!(create_index_sql(&schema, TableKind::CurrentView).is_none());
    }
}
