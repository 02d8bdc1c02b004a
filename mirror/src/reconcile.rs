//! Reconciliation engine.
//!
//! Decides the fate of one incoming revision against the persisted maximum version of
//! its document. The engine owns no state: the caller obtains the current version
//! under a row lock immediately before the decision, so that concurrent decisions on
//! the same document id serialize through the store.

use crate::types::{CurrentVersion, ReconciliationDecision, RejectReason, RevisionEvent};

/// Ordering-strictness policy for the reconciliation engine.
///
/// Under strict ordering a revision is only applied when its version is exactly one
/// greater than the highest applied version, which catches missing intermediate
/// revisions. Best-effort ordering accepts any version greater than the last applied,
/// trading the gap guarantee for liveness under deep reordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderingPolicy {
    /// Enables gap detection and first-version enforcement.
    pub strict_order: bool,
}

impl OrderingPolicy {
    /// Strict, gapless ordering.
    pub const STRICT: OrderingPolicy = OrderingPolicy { strict_order: true };

    /// Best-effort ordering (last write wins).
    pub const BEST_EFFORT: OrderingPolicy = OrderingPolicy {
        strict_order: false,
    };
}

/// First version a document can be applied at under strict ordering.
const INITIAL_VERSION: i64 = 1;

/// Decides whether to apply, skip, or reject one event.
///
/// `current` is the maximum version currently stored for the event's document id
/// (with its tombstone flag), or `None` if the document has never been written. The
/// decision depends only on its inputs; persisting the outcome is the caller's job.
pub fn decide(
    event: &RevisionEvent,
    current: Option<CurrentVersion>,
    policy: OrderingPolicy,
) -> ReconciliationDecision {
    if event.is_tombstone {
        decide_tombstone(event, current, policy)
    } else {
        decide_data(event, current, policy)
    }
}

fn decide_tombstone(
    event: &RevisionEvent,
    current: Option<CurrentVersion>,
    policy: OrderingPolicy,
) -> ReconciliationDecision {
    let Some(current) = current else {
        // A document that was never written cannot be deleted.
        return ReconciliationDecision::Reject(RejectReason::TombstoneWithoutBase);
    };

    if current.version >= event.version {
        return ReconciliationDecision::Reject(RejectReason::StaleTombstone);
    }

    if policy.strict_order && current.version + 1 != event.version {
        return ReconciliationDecision::Reject(RejectReason::VersionGap);
    }

    ReconciliationDecision::Apply
}

fn decide_data(
    event: &RevisionEvent,
    current: Option<CurrentVersion>,
    policy: OrderingPolicy,
) -> ReconciliationDecision {
    let Some(current) = current else {
        if policy.strict_order && event.version != INITIAL_VERSION {
            return ReconciliationDecision::Reject(RejectReason::BaseVersionNotInitial);
        }

        return ReconciliationDecision::Apply;
    };

    if current.version == event.version {
        return ReconciliationDecision::SkipDuplicate;
    }

    if current.version > event.version {
        return ReconciliationDecision::SkipOutOfOrder;
    }

    // The event is ahead of the stored maximum. A deleted document stays deleted:
    // delete-then-resurrect is out of scope and rejected under both policies.
    if current.deleted {
        return ReconciliationDecision::Reject(RejectReason::Resurrection);
    }

    if policy.strict_order && current.version + 1 != event.version {
        return ReconciliationDecision::Reject(RejectReason::VersionGap);
    }

    ReconciliationDecision::Apply
}
