//! Error types and result definitions for mirror operations.
//!
//! Provides a classified error type with captured diagnostic metadata. Every fallible
//! operation in this crate returns [`MirrorResult`], and error kinds drive the batch
//! control flow: benign kinds (duplicate keys) let a batch continue, everything else
//! aborts it.

use std::backtrace::Backtrace;
use std::borrow::Cow;
use std::error;
use std::fmt;
use std::panic::Location;
use std::sync::Arc;

/// Convenient result type for mirror operations using [`MirrorError`] as the error type.
pub type MirrorResult<T> = Result<T, MirrorError>;

/// Specific categories of errors that can occur while mirroring a change stream.
///
/// The taxonomy mirrors the fate of the record that caused the error: decode and
/// schema errors are per-record, reconciliation rejects abort the batch, and store
/// errors are split between the benign duplicate-key case and fatal failures.
#[derive(PartialEq, Eq, Copy, Clone, Debug, Hash)]
#[non_exhaustive]
pub enum ErrorKind {
    // Decode & normalization errors
    DecodeError,

    // Schema & mapping errors
    MissingTableSchema,
    SchemaMismatch,
    ConversionError,

    // Reconciliation errors
    ReconciliationReject,

    // Store errors
    UniqueViolation,
    StoreQueryFailed,
    StoreConnectionFailed,

    // Configuration & state errors
    ConfigError,
    InvalidState,

    // Unknown / uncategorized
    Unknown,
}

/// Main error type for mirror operations.
///
/// Carries a classified kind, a static description, optional dynamic detail, an
/// optional source error, and the callsite location plus backtrace captured where the
/// error was created.
#[derive(Debug, Clone)]
pub struct MirrorError {
    kind: ErrorKind,
    description: Cow<'static, str>,
    detail: Option<Cow<'static, str>>,
    source: Option<Arc<dyn error::Error + Send + Sync>>,
    location: &'static Location<'static>,
    backtrace: Arc<Backtrace>,
}

impl MirrorError {
    /// Creates a [`MirrorError`] from its components.
    #[track_caller]
    fn from_components(
        kind: ErrorKind,
        description: Cow<'static, str>,
        detail: Option<Cow<'static, str>>,
        source: Option<Arc<dyn error::Error + Send + Sync>>,
    ) -> Self {
        MirrorError {
            kind,
            description,
            detail,
            source,
            location: Location::caller(),
            backtrace: Arc::new(Backtrace::capture()),
        }
    }

    /// Returns the [`ErrorKind`] of this error.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns the detailed error information if available.
    pub fn detail(&self) -> Option<&str> {
        self.detail.as_deref()
    }

    /// Returns the captured callsite location for this error.
    pub fn location(&self) -> &'static Location<'static> {
        self.location
    }

    /// Returns the captured backtrace for this error.
    pub fn backtrace(&self) -> &Backtrace {
        self.backtrace.as_ref()
    }

    /// Attaches an originating [`error::Error`] to this error and returns the
    /// modified instance.
    ///
    /// The stored source is preserved across clones and exposed via
    /// [`error::Error::source`].
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: error::Error + Send + Sync + 'static,
    {
        self.source = Some(Arc::new(source));
        self
    }
}

impl PartialEq for MirrorError {
    fn eq(&self, other: &MirrorError) -> bool {
        self.kind == other.kind
    }
}

impl fmt::Display for MirrorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        write!(
            f,
            "[{:?}] {} @ {}:{}:{}",
            self.kind,
            self.description,
            self.location.file(),
            self.location.line(),
            self.location.column()
        )?;

        if let Some(detail) = self.detail.as_deref() {
            write!(f, "\n  Detail: {detail}")?;
        }

        Ok(())
    }
}

impl error::Error for MirrorError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|source| source as &(dyn error::Error + 'static))
    }
}

/// Creates a [`MirrorError`] from an error kind and static description.
impl From<(ErrorKind, &'static str)> for MirrorError {
    #[track_caller]
    fn from((kind, desc): (ErrorKind, &'static str)) -> MirrorError {
        MirrorError::from_components(kind, Cow::Borrowed(desc), None, None)
    }
}

/// Creates a [`MirrorError`] from an error kind, static description, and dynamic detail.
impl<D> From<(ErrorKind, &'static str, D)> for MirrorError
where
    D: Into<Cow<'static, str>>,
{
    #[track_caller]
    fn from((kind, desc, detail): (ErrorKind, &'static str, D)) -> MirrorError {
        MirrorError::from_components(kind, Cow::Borrowed(desc), Some(detail.into()), None)
    }
}

/// Converts [`std::io::Error`] to [`MirrorError`] with [`ErrorKind::StoreConnectionFailed`].
impl From<std::io::Error> for MirrorError {
    #[track_caller]
    fn from(err: std::io::Error) -> MirrorError {
        let detail = err.to_string();
        let source = Arc::new(err);
        MirrorError::from_components(
            ErrorKind::StoreConnectionFailed,
            Cow::Borrowed("I/O operation failed"),
            Some(Cow::Owned(detail)),
            Some(source),
        )
    }
}

/// Converts [`serde_json::Error`] to [`MirrorError`] with [`ErrorKind::DecodeError`].
///
/// Change-stream records reach this crate as decoded JSON documents, so any JSON
/// failure is a malformed record.
impl From<serde_json::Error> for MirrorError {
    #[track_caller]
    fn from(err: serde_json::Error) -> MirrorError {
        let detail = err.to_string();
        let source = Arc::new(err);
        MirrorError::from_components(
            ErrorKind::DecodeError,
            Cow::Borrowed("Change-stream record deserialization failed"),
            Some(Cow::Owned(detail)),
            Some(source),
        )
    }
}

/// SQLSTATE class for unique-constraint violations.
const SQLSTATE_UNIQUE_VIOLATION: &str = "23505";

/// SQLSTATE codes for undefined table/column references.
const SQLSTATE_UNDEFINED_COLUMN: &str = "42703";
const SQLSTATE_UNDEFINED_TABLE: &str = "42P01";
const SQLSTATE_SYNTAX_ERROR: &str = "42601";

/// Converts [`sqlx::Error`] to [`MirrorError`] with the appropriate error kind.
///
/// Maps duplicate-key violations to the benign [`ErrorKind::UniqueViolation`] so the
/// batch can treat an already-applied row as a non-error, and classifies
/// unknown-column, syntax, and connection failures separately since those must halt
/// the batch.
impl From<sqlx::Error> for MirrorError {
    #[track_caller]
    fn from(err: sqlx::Error) -> MirrorError {
        let (kind, description) = match &err {
            sqlx::Error::Database(db_err) => match db_err.code().as_deref() {
                Some(SQLSTATE_UNIQUE_VIOLATION) => (
                    ErrorKind::UniqueViolation,
                    "Row already present in the relational store",
                ),
                Some(SQLSTATE_UNDEFINED_COLUMN) | Some(SQLSTATE_UNDEFINED_TABLE) => (
                    ErrorKind::SchemaMismatch,
                    "Statement referenced an undeclared schema object",
                ),
                Some(SQLSTATE_SYNTAX_ERROR) => {
                    (ErrorKind::StoreQueryFailed, "Statement has a syntax error")
                }
                _ => (ErrorKind::StoreQueryFailed, "Store query failed"),
            },
            sqlx::Error::Io(_) => (
                ErrorKind::StoreConnectionFailed,
                "Store connection I/O failed",
            ),
            sqlx::Error::PoolClosed | sqlx::Error::PoolTimedOut => (
                ErrorKind::StoreConnectionFailed,
                "Store connection pool unavailable",
            ),
            _ => (ErrorKind::StoreQueryFailed, "Store operation failed"),
        };

        let detail = err.to_string();
        let source = Arc::new(err);
        MirrorError::from_components(
            kind,
            Cow::Borrowed(description),
            Some(Cow::Owned(detail)),
            Some(source),
        )
    }
}

/// Converts [`config::shared::ValidationError`] to [`MirrorError`] with
/// [`ErrorKind::ConfigError`].
impl From<config::shared::ValidationError> for MirrorError {
    #[track_caller]
    fn from(err: config::shared::ValidationError) -> MirrorError {
        let detail = err.to_string();
        let source = Arc::new(err);
        MirrorError::from_components(
            ErrorKind::ConfigError,
            Cow::Borrowed("Configuration validation failed"),
            Some(Cow::Owned(detail)),
            Some(source),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_carries_kind_and_detail() {
        let err = MirrorError::from((
            ErrorKind::SchemaMismatch,
            "Field not declared",
            "column `nickname` missing from table `person`".to_string(),
        ));

        assert_eq!(err.kind(), ErrorKind::SchemaMismatch);
        assert_eq!(
            err.detail(),
            Some("column `nickname` missing from table `person`")
        );
        assert!(err.to_string().contains("Field not declared"));
    }

    #[test]
    fn errors_compare_by_kind() {
        let a = MirrorError::from((ErrorKind::DecodeError, "one"));
        let b = MirrorError::from((ErrorKind::DecodeError, "two"));
        let c = MirrorError::from((ErrorKind::Unknown, "one"));

        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
