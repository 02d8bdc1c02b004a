use std::fmt;

use crate::types::Cell;

/// One revision of one logical document, extracted from a change-stream record.
///
/// [`RevisionEvent`] is immutable once constructed by the normalizer and is consumed
/// exactly once by the reconciliation engine. A tombstone carries no fields.
#[derive(Debug, Clone, PartialEq)]
pub struct RevisionEvent {
    /// Logical table this document belongs to.
    pub table: String,
    /// Ledger-assigned document id.
    pub document_id: String,
    /// Monotonically increasing version number issued in commit order per document.
    pub version: i64,
    /// Field values in the order they appeared in the decoded revision.
    ///
    /// Empty for tombstones.
    pub fields: Vec<(String, Cell)>,
    /// Whether this revision deletes the document.
    pub is_tombstone: bool,
}

/// The persisted high-water mark for one document id, read under a row lock.
///
/// `deleted` reflects whether the row holding the maximum version is a tombstone,
/// which is what makes delete-then-resurrect detectable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurrentVersion {
    /// Maximum version currently stored for the document.
    pub version: i64,
    /// Whether that version is a tombstone.
    pub deleted: bool,
}

/// Why the reconciliation engine refused to apply an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// A tombstone arrived for a document that was never written.
    TombstoneWithoutBase,
    /// A tombstone arrived with a version at or below the applied maximum.
    StaleTombstone,
    /// Strict ordering requires the first applied version of a document to be 1.
    BaseVersionNotInitial,
    /// Strict ordering detected missing intermediate versions.
    VersionGap,
    /// A data revision arrived after the document was deleted.
    Resurrection,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let description = match self {
            RejectReason::TombstoneWithoutBase => "tombstone for a document never seen",
            RejectReason::StaleTombstone => "tombstone version at or below applied maximum",
            RejectReason::BaseVersionNotInitial => "first applied version must be 1",
            RejectReason::VersionGap => "missing intermediate versions",
            RejectReason::Resurrection => "data revision after deletion",
        };
        f.write_str(description)
    }
}

/// The fate of an incoming event, decided against the persisted maximum version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconciliationDecision {
    /// Write the event to the store.
    Apply,
    /// The exact version was already applied; a no-op under at-least-once delivery.
    SkipDuplicate,
    /// An earlier version arrived after a later one was applied; a no-op.
    SkipOutOfOrder,
    /// A logical ordering violation that must surface to the caller.
    Reject(RejectReason),
}
