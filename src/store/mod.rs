// ============================================================================
// Store - transactional persistence boundary
// ============================================================================
//
// The `OrderRepository` trait is the only way the services touch storage.
// Adapters: Postgres for production, in-memory for tests and the demo.
//
// ============================================================================

pub mod memory;
pub mod outbox;
pub mod postgres;
pub mod repository;

pub use memory::MemoryOrderStore;
pub use outbox::{OutboxEvent, EVENT_ORDER_CREATED, EVENT_STATUS_CHANGED};
pub use postgres::PgOrderStore;
pub use repository::{OrderRepository, ParentCommit, StatusCommit, StoreError};
