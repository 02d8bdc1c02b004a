//! Store gateways.
//!
//! The [`StoreGateway`] trait is the transactional seam between the reconciliation
//! pipeline and the persistence engine: one transaction spans exactly one event's
//! decision-and-apply sequence, serialized per document id by the gateway's locking
//! read.

pub mod base;
pub mod memory;
pub mod postgres;

pub use base::StoreGateway;
pub use memory::MemoryGateway;
pub use postgres::PostgresGateway;
