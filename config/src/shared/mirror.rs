use serde::Deserialize;

use crate::shared::{PgConnectionConfig, TableDefinition, ValidationError};

/// Ordering and projection options for the reconciliation pipeline.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct PipelineConfig {
    /// Enables gap/duplicate/out-of-order enforcement.
    ///
    /// Under strict ordering a revision is only applied when its version is exactly
    /// one greater than the highest applied version; otherwise any higher version is
    /// accepted (last write wins).
    #[serde(default)]
    pub strict_order: bool,
    /// Enables the per-version append-only history log alongside the current view.
    #[serde(default)]
    pub history_mode: bool,
}

/// Configuration for one mirror instance.
///
/// Contains the connection to the relational store, the ordering policy, and the
/// declarative schema catalog for every mirrored table.
///
/// This intentionally does not implement `Serialize` to avoid accidentally leaking
/// secrets in the config into serialized forms.
#[derive(Debug, Clone, Deserialize)]
pub struct MirrorConfig {
    /// Connection configuration for the relational store that receives the mirror.
    pub pg_connection: PgConnectionConfig,
    /// Reconciliation pipeline options.
    pub pipeline: PipelineConfig,
    /// Declarative description of every mirrored table.
    pub tables: Vec<TableDefinition>,
}

impl MirrorConfig {
    /// Validates the mirror configuration.
    ///
    /// Checks connection settings and the structural shape of the declared tables.
    /// Column-level invariants (reserved names, duplicates) are enforced when the
    /// schema catalog is built from these definitions.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.pg_connection.tls.validate()?;

        if self.tables.is_empty() {
            return Err(ValidationError::NoTablesDeclared);
        }

        for table in &self.tables {
            if table.name.is_empty() {
                return Err(ValidationError::EmptyIdentifier);
            }

            if table.columns.is_empty() {
                return Err(ValidationError::TableWithoutColumns(table.name.clone()));
            }

            if table.columns.iter().any(|column| column.name.is_empty()) {
                return Err(ValidationError::EmptyIdentifier);
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::{ColumnDefinition, ColumnType, TlsConfig};

    fn test_config(tables: Vec<TableDefinition>) -> MirrorConfig {
        MirrorConfig {
            pg_connection: PgConnectionConfig {
                host: "localhost".to_string(),
                port: 5432,
                name: "mirror".to_string(),
                username: "postgres".to_string(),
                password: None,
                tls: TlsConfig {
                    trusted_root_certs: String::new(),
                    enabled: false,
                },
            },
            pipeline: PipelineConfig {
                strict_order: true,
                history_mode: false,
            },
            tables,
        }
    }

    #[test]
    fn rejects_empty_catalog() {
        let config = test_config(vec![]);
        assert!(matches!(
            config.validate(),
            Err(ValidationError::NoTablesDeclared)
        ));
    }

    #[test]
    fn rejects_table_without_columns() {
        let config = test_config(vec![TableDefinition {
            name: "person".to_string(),
            columns: vec![],
        }]);
        assert!(matches!(
            config.validate(),
            Err(ValidationError::TableWithoutColumns(_))
        ));
    }

    #[test]
    fn accepts_well_formed_catalog() {
        let config = test_config(vec![TableDefinition {
            name: "person".to_string(),
            columns: vec![ColumnDefinition {
                name: "first_name".to_string(),
                column_type: ColumnType::Text,
                indexed: false,
            }],
        }]);
        assert!(config.validate().is_ok());
    }
}
