//! Relational projector.
//!
//! Renders a [`RevisionEvent`]'s field map into a parameterized upsert statement.
//! Column ordering follows the schema's declared order, not the event's field order,
//! so statements are deterministic. Values are bound through placeholders, never
//! concatenated into the SQL text; identifiers are quoted via `pg_escape`.

use pg_escape::quote_identifier;

use config::shared::ColumnType;

use crate::bail;
use crate::error::{ErrorKind, MirrorResult};
use crate::schema::{DELETED_COLUMN, DOCUMENT_ID_COLUMN, TableKind, TableSchema, VERSION_COLUMN};
use crate::types::{Cell, RevisionEvent};

/// How an upsert resolves a conflict on the target table's primary key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictAction {
    /// Replace the existing row in place (current view, keyed by document id).
    ReplaceCurrent,
    /// Leave the existing row untouched (history log, keyed by document id and
    /// version), which makes re-delivery of an applied version idempotent.
    IgnoreDuplicate,
}

/// One renderable, bindable upsert.
///
/// The first three columns are always the bookkeeping columns (document id, version,
/// deleted flag) followed by the declared columns in schema order. The structured
/// form lets the in-memory gateway apply statements without parsing SQL.
#[derive(Debug, Clone, PartialEq)]
pub struct UpsertStatement {
    /// Physical target table name.
    pub table: String,
    /// Column names in statement order.
    pub columns: Vec<String>,
    /// Values in statement order, parallel to `columns`.
    pub values: Vec<Cell>,
    /// Conflict resolution for the target's primary key.
    pub conflict: ConflictAction,
}

impl UpsertStatement {
    /// Returns the document id this statement writes.
    pub fn document_id(&self) -> &str {
        match &self.values[0] {
            Cell::String(id) => id,
            // The projector always places the document id first.
            _ => unreachable!("statement misses its document id"),
        }
    }

    /// Returns the version this statement writes.
    pub fn version(&self) -> i64 {
        match self.values[1] {
            Cell::I64(version) => version,
            _ => unreachable!("statement misses its version"),
        }
    }

    /// Returns whether this statement marks the document deleted.
    pub fn deleted(&self) -> bool {
        match self.values[2] {
            Cell::Bool(deleted) => deleted,
            _ => unreachable!("statement misses its deleted flag"),
        }
    }

    /// Returns the declared (non-bookkeeping) columns and their values.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &Cell)> {
        self.columns
            .iter()
            .map(String::as_str)
            .zip(self.values.iter())
            .skip(3)
    }

    /// Returns the values that must be bound as statement parameters.
    ///
    /// NULL cells are rendered as SQL literals instead of being bound, so parameter
    /// types stay unambiguous for the store's statement preparation.
    pub fn bind_values(&self) -> impl Iterator<Item = &Cell> {
        self.values.iter().filter(|value| !value.is_null())
    }

    /// Renders the parameterized SQL text for this statement.
    pub fn to_sql(&self) -> String {
        let table = quote_identifier(&self.table);

        let column_list = self
            .columns
            .iter()
            .map(|name| quote_identifier(name).into_owned())
            .collect::<Vec<_>>()
            .join(", ");

        let mut placeholder = 0;
        let value_list = self
            .values
            .iter()
            .map(|value| {
                if value.is_null() {
                    "null".to_string()
                } else {
                    placeholder += 1;
                    format!("${placeholder}")
                }
            })
            .collect::<Vec<_>>()
            .join(", ");

        let conflict_clause = match self.conflict {
            ConflictAction::ReplaceCurrent => {
                let assignments = self
                    .columns
                    .iter()
                    .skip(1)
                    .map(|name| {
                        let name = quote_identifier(name);
                        format!("{name} = excluded.{name}")
                    })
                    .collect::<Vec<_>>()
                    .join(", ");

                format!(
                    "on conflict ({}) do update set {assignments}",
                    quote_identifier(DOCUMENT_ID_COLUMN)
                )
            }
            ConflictAction::IgnoreDuplicate => format!(
                "on conflict ({}, {}) do nothing",
                quote_identifier(DOCUMENT_ID_COLUMN),
                quote_identifier(VERSION_COLUMN)
            ),
        };

        format!("insert into {table} ({column_list}) values ({value_list}) {conflict_clause}")
    }
}

/// Projects an event onto the current-view table.
///
/// A data revision writes its coerced field values; a tombstone nulls every declared
/// column and raises the deleted flag, replacing the row in place either way.
pub fn project(event: &RevisionEvent, schema: &TableSchema) -> MirrorResult<UpsertStatement> {
    let values = build_row(event, schema)?;

    Ok(UpsertStatement {
        table: TableKind::CurrentView.physical_name(schema),
        columns: statement_columns(schema),
        values,
        conflict: ConflictAction::ReplaceCurrent,
    })
}

/// Projects an applied data revision onto the history log.
pub fn project_history(
    event: &RevisionEvent,
    schema: &TableSchema,
) -> MirrorResult<UpsertStatement> {
    if event.is_tombstone {
        bail!(
            ErrorKind::InvalidState,
            "Tombstones are not recorded in the history log"
        );
    }

    let values = build_row(event, schema)?;

    Ok(UpsertStatement {
        table: TableKind::History.physical_name(schema),
        columns: statement_columns(schema),
        values,
        conflict: ConflictAction::IgnoreDuplicate,
    })
}

fn statement_columns(schema: &TableSchema) -> Vec<String> {
    let mut columns = Vec::with_capacity(schema.columns.len() + 3);
    columns.push(DOCUMENT_ID_COLUMN.to_string());
    columns.push(VERSION_COLUMN.to_string());
    columns.push(DELETED_COLUMN.to_string());
    columns.extend(schema.columns.iter().map(|column| column.name.clone()));
    columns
}

fn build_row(event: &RevisionEvent, schema: &TableSchema) -> MirrorResult<Vec<Cell>> {
    // Every event field must map to a declared column.
    for (name, _) in &event.fields {
        if schema.column(name).is_none() {
            bail!(
                ErrorKind::SchemaMismatch,
                "Event references an undeclared column",
                format!("column `{name}` is not declared for table `{}`", schema.name)
            );
        }
    }

    let mut values = Vec::with_capacity(schema.columns.len() + 3);
    values.push(Cell::String(event.document_id.clone()));
    values.push(Cell::I64(event.version));
    values.push(Cell::Bool(event.is_tombstone));

    for column in &schema.columns {
        let value = event
            .fields
            .iter()
            .find(|(name, _)| name == &column.name)
            .map(|(_, value)| coerce_cell(value, column.column_type, &schema.name, &column.name))
            .transpose()?
            // Absent declared fields project as NULL, replacing any previous value.
            .unwrap_or(Cell::Null);

        values.push(value);
    }

    Ok(values)
}

/// Coerces a cell to its column's declared SQL type.
///
/// Lossless widenings and text renderings are accepted; anything else is a
/// [`ErrorKind::ConversionError`].
fn coerce_cell(
    value: &Cell,
    column_type: ColumnType,
    table: &str,
    column: &str,
) -> MirrorResult<Cell> {
    let coerced = match (value, column_type) {
        (Cell::Null, _) => Some(Cell::Null),
        (Cell::Bool(value), ColumnType::Boolean) => Some(Cell::Bool(*value)),
        (Cell::I64(value), ColumnType::BigInt | ColumnType::Integer) => Some(Cell::I64(*value)),
        (Cell::I64(value), ColumnType::DoublePrecision) => Some(Cell::F64(*value as f64)),
        (Cell::F64(value), ColumnType::DoublePrecision) => Some(Cell::F64(*value)),
        (Cell::String(value), ColumnType::Text) => Some(Cell::String(value.clone())),
        (Cell::Bool(_) | Cell::I64(_) | Cell::F64(_), ColumnType::Text) => {
            Some(Cell::String(value.to_string()))
        }
        (Cell::Json(value), ColumnType::Jsonb) => Some(Cell::Json(value.clone())),
        (Cell::Json(value), ColumnType::Text) => Some(Cell::String(value.to_string())),
        (
            Cell::Bool(_) | Cell::I64(_) | Cell::F64(_) | Cell::String(_),
            ColumnType::Jsonb,
        ) => {
            let json = match value {
                Cell::Bool(value) => serde_json::Value::Bool(*value),
                Cell::I64(value) => serde_json::Value::from(*value),
                Cell::F64(value) => serde_json::Value::from(*value),
                Cell::String(value) => serde_json::Value::String(value.clone()),
                _ => unreachable!(),
            };
            Some(Cell::Json(json))
        }
        _ => None,
    };

    match coerced {
        Some(coerced) => Ok(coerced),
        None => bail!(
            ErrorKind::ConversionError,
            "Value cannot be coerced to its declared column type",
            format!(
                "value `{value}` does not fit column `{column}` ({}) of table `{table}`",
                column_type.as_sql()
            )
        ),
    }
}
