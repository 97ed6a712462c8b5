use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::order::Order;

use super::outbox::OutboxEvent;

// ============================================================================
// OrderRepository - transactional persistence boundary
// ============================================================================
//
// Every mutating method is atomic: either all documents (orders, history,
// outbox rows) land, or none do. Optimistic concurrency works the way the
// event store's expected-version check does: the caller states the version
// it read, the store verifies it still holds inside the transaction and
// writes the document back with `version = expected + 1`. A mismatch aborts
// the whole transaction with `VersionConflict` and leaves nothing changed.
//
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("order not found")]
    NotFound,

    #[error("version conflict on order {order_id}")]
    VersionConflict { order_id: Uuid },

    #[error("order number already exists: {0}")]
    DuplicateOrderNumber(String),

    #[error("storage backend error: {0}")]
    Backend(String),
}

/// One atomic status commit: the updated child document, and (for zone
/// children) the reread-and-recomputed parent document. The parent row is
/// always rewritten, so it serializes concurrent sibling commits.
#[derive(Debug, Clone)]
pub struct StatusCommit {
    pub child: Order,
    pub expected_child_version: i64,
    pub parent: Option<ParentCommit>,
}

#[derive(Debug, Clone)]
pub struct ParentCommit {
    pub parent: Order,
    pub expected_parent_version: i64,
}

#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Persist a parent and all its children plus their outbox rows as one
    /// atomic unit. Any failure mid-creation rolls back completely; no
    /// orphan child or half-linked parent is ever observable.
    async fn create_order_family(
        &self,
        parent: Order,
        children: Vec<Order>,
        outbox: Vec<OutboxEvent>,
    ) -> Result<(), StoreError>;

    /// Persist one stand-alone order plus its outbox rows atomically.
    async fn insert_order(&self, order: Order, outbox: Vec<OutboxEvent>) -> Result<(), StoreError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Order>, StoreError>;

    async fn find_by_number(&self, order_number: &str) -> Result<Option<Order>, StoreError>;

    /// All children referencing `parent_id`, ordered by basket sequence.
    async fn children_of(&self, parent_id: Uuid) -> Result<Vec<Order>, StoreError>;

    /// Commit a child status change (and the recomputed parent when given)
    /// plus outbox rows in one transaction under version preconditions.
    async fn commit_status_change(
        &self,
        commit: StatusCommit,
        outbox: Vec<OutboxEvent>,
    ) -> Result<(), StoreError>;

    /// Oldest-first batch of outbox rows that are neither dispatched nor
    /// dead.
    async fn undispatched_outbox(&self, limit: usize) -> Result<Vec<OutboxEvent>, StoreError>;

    async fn mark_outbox_dispatched(&self, id: Uuid) -> Result<(), StoreError>;

    /// Bump the attempt counter; rows reaching `max_attempts` are flagged
    /// dead in place.
    async fn mark_outbox_failed(&self, id: Uuid, max_attempts: i32) -> Result<(), StoreError>;
}
