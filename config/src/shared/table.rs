use serde::{Deserialize, Serialize};

/// SQL type a declared column maps to in the relational store.
///
/// The set is deliberately small: it covers the value shapes that survive the
/// upstream ledger's self-describing document format once decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    Text,
    Integer,
    BigInt,
    DoublePrecision,
    Boolean,
    Jsonb,
}

impl ColumnType {
    /// Returns the Postgres type name used in DDL.
    pub fn as_sql(&self) -> &'static str {
        match self {
            ColumnType::Text => "text",
            ColumnType::Integer => "integer",
            ColumnType::BigInt => "bigint",
            ColumnType::DoublePrecision => "double precision",
            ColumnType::Boolean => "boolean",
            ColumnType::Jsonb => "jsonb",
        }
    }
}

/// Declarative description of one column of a mirrored table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ColumnDefinition {
    /// Column name, matching the field name in incoming revisions.
    pub name: String,
    /// Declared SQL type.
    #[serde(rename = "type")]
    pub column_type: ColumnType,
    /// Whether the column participates in the table's secondary index.
    #[serde(default)]
    pub indexed: bool,
}

/// Declarative description of one mirrored table.
///
/// Loaded once at startup; the schema catalog is read-only afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct TableDefinition {
    /// Logical table name, matching `payload.tableInfo.tableName` in the stream.
    pub name: String,
    /// Declared columns in order.
    pub columns: Vec<ColumnDefinition>,
}
