//! Schema catalog for mirrored tables.
//!
//! The catalog is built once at startup from the declarative table definitions in the
//! configuration and is read-only afterwards. It shapes incoming field sets, drives
//! the relational projection, and provides the idempotent DDL bootstrap.

mod bootstrap;

pub use bootstrap::{create_index_sql, create_table_sql, TableKind};

use std::collections::HashMap;

use config::shared::{ColumnType, TableDefinition};

use crate::bail;
use crate::error::{ErrorKind, MirrorResult};

/// Column holding the ledger-assigned document id.
pub const DOCUMENT_ID_COLUMN: &str = "document_id";

/// Column holding the document version number.
pub const VERSION_COLUMN: &str = "version";

/// Column marking a document as deleted in the current view.
pub const DELETED_COLUMN: &str = "deleted";

/// Suffix appended to a logical table name to form its history table.
pub const HISTORY_TABLE_SUFFIX: &str = "_history";

/// One declared column of a mirrored table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSchema {
    /// Column name, matching the field name in incoming revisions.
    pub name: String,
    /// Declared SQL type.
    pub column_type: ColumnType,
    /// Whether the column participates in the table's secondary index.
    pub indexed: bool,
}

/// The declared shape of one mirrored table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSchema {
    /// Logical table name.
    pub name: String,
    /// Declared columns in order. Does not include the key and bookkeeping columns,
    /// which every mirrored table carries implicitly.
    pub columns: Vec<ColumnSchema>,
}

impl TableSchema {
    /// Returns the name of the history table for this logical table.
    pub fn history_name(&self) -> String {
        format!("{}{HISTORY_TABLE_SUFFIX}", self.name)
    }

    /// Returns the declared column with the given name, if any.
    pub fn column(&self, name: &str) -> Option<&ColumnSchema> {
        self.columns.iter().find(|column| column.name == name)
    }
}

/// Process-wide, read-only catalog of every mirrored table.
#[derive(Debug, Clone)]
pub struct SchemaCatalog {
    tables: HashMap<String, TableSchema>,
}

impl SchemaCatalog {
    /// Builds the catalog from declarative table definitions.
    ///
    /// Fails with [`ErrorKind::ConfigError`] when a declared column collides with one
    /// of the implicit bookkeeping columns, when a column is declared twice, or when
    /// a table is declared twice. These are configuration errors, not per-event
    /// errors.
    pub fn from_definitions(definitions: &[TableDefinition]) -> MirrorResult<SchemaCatalog> {
        let mut tables = HashMap::with_capacity(definitions.len());

        for definition in definitions {
            let mut columns = Vec::with_capacity(definition.columns.len());

            for column in &definition.columns {
                if is_reserved_column(&column.name) {
                    bail!(
                        ErrorKind::ConfigError,
                        "Declared column collides with a bookkeeping column",
                        format!(
                            "column `{}` in table `{}` is reserved",
                            column.name, definition.name
                        )
                    );
                }

                if definition
                    .columns
                    .iter()
                    .filter(|other| other.name == column.name)
                    .count()
                    > 1
                {
                    bail!(
                        ErrorKind::ConfigError,
                        "Column declared more than once",
                        format!(
                            "column `{}` in table `{}` is duplicated",
                            column.name, definition.name
                        )
                    );
                }

                columns.push(ColumnSchema {
                    name: column.name.clone(),
                    column_type: column.column_type,
                    indexed: column.indexed,
                });
            }

            let schema = TableSchema {
                name: definition.name.clone(),
                columns,
            };

            if tables.insert(definition.name.clone(), schema).is_some() {
                bail!(
                    ErrorKind::ConfigError,
                    "Table declared more than once",
                    format!("table `{}` is duplicated", definition.name)
                );
            }
        }

        Ok(SchemaCatalog { tables })
    }

    /// Returns the schema for a logical table name.
    pub fn get(&self, table: &str) -> Option<&TableSchema> {
        self.tables.get(table)
    }

    /// Returns all table schemas, in no particular order.
    pub fn tables(&self) -> impl Iterator<Item = &TableSchema> {
        self.tables.values()
    }

    /// Returns the number of declared tables.
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    /// Returns true when no tables are declared.
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

/// Returns true when the column name is one of the implicit bookkeeping columns.
fn is_reserved_column(name: &str) -> bool {
    name == DOCUMENT_ID_COLUMN || name == VERSION_COLUMN || name == DELETED_COLUMN
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::shared::ColumnDefinition;

    fn person_definition() -> TableDefinition {
        TableDefinition {
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
        }
    }

    #[test]
    fn builds_catalog_from_definitions() {
        let catalog = SchemaCatalog::from_definitions(&[person_definition()]).unwrap();

        let schema = catalog.get("person").unwrap();
        assert_eq!(schema.columns.len(), 2);
        assert_eq!(schema.history_name(), "person_history");
        assert!(schema.column("first_name").unwrap().indexed);
        assert!(catalog.get("vehicle").is_none());
    }

    #[test]
    fn rejects_reserved_column_names() {
        for reserved in [DOCUMENT_ID_COLUMN, VERSION_COLUMN, DELETED_COLUMN] {
            let definition = TableDefinition {
                name: "person".to_string(),
                columns: vec![ColumnDefinition {
                    name: reserved.to_string(),
                    column_type: ColumnType::Text,
                    indexed: false,
                }],
            };

            let err = SchemaCatalog::from_definitions(&[definition]).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::ConfigError);
        }
    }

    #[test]
    fn rejects_duplicate_columns() {
        let mut definition = person_definition();
        definition.columns.push(ColumnDefinition {
            name: "first_name".to_string(),
            column_type: ColumnType::Text,
            indexed: false,
        });

        let err = SchemaCatalog::from_definitions(&[definition]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConfigError);
    }

    #[test]
    fn rejects_duplicate_tables() {
        let err =
            SchemaCatalog::from_definitions(&[person_definition(), person_definition()])
                .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConfigError);
    }
}
