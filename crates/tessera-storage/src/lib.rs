// Postgres storage layer with sqlx
//
// This crate provides database implementations for core traits:
// - PgEntityStore: implements EntityStore with optimistic revision checks
// - PgAuditStore: implements AuditStore for the append-only transition history

pub mod audit_store;
pub mod entity_store;
pub mod models;
pub mod repositories;

pub use audit_store::PgAuditStore;
pub use entity_store::PgEntityStore;
pub use models::*;
pub use repositories::*;
