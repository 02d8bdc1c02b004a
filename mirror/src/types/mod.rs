//! Core data types shared across the mirror pipeline.

mod cell;
mod event;

pub use cell::Cell;
pub use event::{CurrentVersion, ReconciliationDecision, RejectReason, RevisionEvent};
