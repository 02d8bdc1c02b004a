//! Reconciliation of a versioned, append-only document change stream into a
//! relational store.
//!
//! The stream delivers revisions of documents: a table name, a document id, a
//! monotonically increasing version, and either a field map or a tombstone. Delivery
//! is at-least-once and may be out of order. This crate decides, per revision and
//! under a row lock, whether to apply, skip, or reject it, and projects applied
//! revisions into a current-view table (one row per document) and, optionally, a
//! full-history table (one row per applied revision).
//!
//! The entry point is [`pipeline::Mirror`], generic over a [`store::StoreGateway`].
//! [`store::PostgresGateway`] is the production gateway; [`store::MemoryGateway`]
//! backs tests and local development.

pub mod error;
mod macros;
pub mod normalize;
pub mod pipeline;
pub mod project;
pub mod reconcile;
pub mod schema;
pub mod store;
pub mod types;
