mod connection;
mod mirror;
mod table;

pub use connection::*;
pub use mirror::*;
pub use table::*;

use thiserror::Error;

/// Errors raised when validating loaded configuration.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// TLS is enabled but no trusted root certificates were provided.
    #[error("trusted root certs must be provided when TLS is enabled")]
    MissingTrustedRootCerts,

    /// The mirror was configured without any target tables.
    #[error("at least one table must be declared in the schema catalog")]
    NoTablesDeclared,

    /// A declared table has no columns.
    #[error("table `{0}` declares no columns")]
    TableWithoutColumns(String),

    /// A declared table or column has an empty name.
    #[error("table and column names must be non-empty")]
    EmptyIdentifier,
}
