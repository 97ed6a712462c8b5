use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use uuid::Uuid;

use crate::domain::order::Order;

use super::outbox::OutboxEvent;
use super::repository::{OrderRepository, StatusCommit, StoreError};

// ============================================================================
// In-Memory Order Store
// ============================================================================
//
// Thread-safe adapter for tests, the demo binary, and development without a
// database. Each mutating method takes the single write lock for its whole
// body, which gives it the same all-or-nothing, serialized-commit semantics
// the Postgres adapter gets from real transactions.
//
// ============================================================================

#[derive(Clone, Default)]
pub struct MemoryOrderStore {
    inner: Arc<RwLock<MemoryState>>,
}

#[derive(Default)]
struct MemoryState {
    orders: HashMap<Uuid, Order>,
    numbers: HashMap<String, Uuid>,
    outbox: Vec<OutboxEvent>,
}

impl MemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of orders currently stored. Test helper.
    pub fn order_count(&self) -> usize {
        self.inner.read().expect("store lock poisoned").orders.len()
    }

    /// All outbox rows, including dispatched and dead ones. Test helper.
    pub fn outbox_rows(&self) -> Vec<OutboxEvent> {
        self.inner
            .read()
            .expect("store lock poisoned")
            .outbox
            .clone()
    }
}

impl MemoryState {
    fn insert_checked(&mut self, order: Order) -> Result<(), StoreError> {
        if self.numbers.contains_key(&order.order_number) {
            return Err(StoreError::DuplicateOrderNumber(order.order_number));
        }
        self.numbers.insert(order.order_number.clone(), order.id);
        self.orders.insert(order.id, order);
        Ok(())
    }

    fn replace_versioned(&mut self, mut order: Order, expected: i64) -> Result<(), StoreError> {
        let stored = self
            .orders
            .get(&order.id)
            .ok_or(StoreError::VersionConflict { order_id: order.id })?;
        if stored.version != expected {
            return Err(StoreError::VersionConflict { order_id: order.id });
        }
        order.version = expected + 1;
        self.orders.insert(order.id, order);
        Ok(())
    }
}

#[async_trait]
impl OrderRepository for MemoryOrderStore {
    async fn create_order_family(
        &self,
        parent: Order,
        children: Vec<Order>,
        outbox: Vec<OutboxEvent>,
    ) -> Result<(), StoreError> {
        let mut state = self.inner.write().expect("store lock poisoned");

        // Validate everything before the first insert so a duplicate never
        // leaves a partial family behind.
        let mut numbers: Vec<&str> = vec![&parent.order_number];
        numbers.extend(children.iter().map(|c| c.order_number.as_str()));
        for number in numbers {
            if state.numbers.contains_key(number) {
                return Err(StoreError::DuplicateOrderNumber(number.to_string()));
            }
        }

        state.insert_checked(parent)?;
        for child in children {
            state.insert_checked(child)?;
        }
        state.outbox.extend(outbox);
        Ok(())
    }

    async fn insert_order(&self, order: Order, outbox: Vec<OutboxEvent>) -> Result<(), StoreError> {
        let mut state = self.inner.write().expect("store lock poisoned");
        state.insert_checked(order)?;
        state.outbox.extend(outbox);
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Order>, StoreError> {
        let state = self.inner.read().expect("store lock poisoned");
        Ok(state.orders.get(&id).cloned())
    }

    async fn find_by_number(&self, order_number: &str) -> Result<Option<Order>, StoreError> {
        let state = self.inner.read().expect("store lock poisoned");
        Ok(state
            .numbers
            .get(order_number)
            .and_then(|id| state.orders.get(id))
            .cloned())
    }

    async fn children_of(&self, parent_id: Uuid) -> Result<Vec<Order>, StoreError> {
        let state = self.inner.read().expect("store lock poisoned");
        let mut children: Vec<Order> = state
            .orders
            .values()
            .filter(|o| o.parent_order_id == Some(parent_id))
            .cloned()
            .collect();
        children.sort_by_key(|c| c.trace.sequence);
        Ok(children)
    }

    async fn commit_status_change(
        &self,
        commit: StatusCommit,
        outbox: Vec<OutboxEvent>,
    ) -> Result<(), StoreError> {
        let mut state = self.inner.write().expect("store lock poisoned");

        // Check both preconditions before touching anything.
        let child_ok = state
            .orders
            .get(&commit.child.id)
            .is_some_and(|o| o.version == commit.expected_child_version);
        if !child_ok {
            return Err(StoreError::VersionConflict {
                order_id: commit.child.id,
            });
        }
        if let Some(parent_commit) = &commit.parent {
            let parent_ok = state
                .orders
                .get(&parent_commit.parent.id)
                .is_some_and(|o| o.version == parent_commit.expected_parent_version);
            if !parent_ok {
                return Err(StoreError::VersionConflict {
                    order_id: parent_commit.parent.id,
                });
            }
        }

        state.replace_versioned(commit.child, commit.expected_child_version)?;
        if let Some(parent_commit) = commit.parent {
            state.replace_versioned(parent_commit.parent, parent_commit.expected_parent_version)?;
        }
        state.outbox.extend(outbox);
        Ok(())
    }

    async fn undispatched_outbox(&self, limit: usize) -> Result<Vec<OutboxEvent>, StoreError> {
        let state = self.inner.read().expect("store lock poisoned");
        let mut pending: Vec<OutboxEvent> = state
            .outbox
            .iter()
            .filter(|e| e.dispatched_at.is_none() && !e.dead)
            .cloned()
            .collect();
        pending.sort_by_key(|e| e.created_at);
        pending.truncate(limit);
        Ok(pending)
    }

    async fn mark_outbox_dispatched(&self, id: Uuid) -> Result<(), StoreError> {
        let mut state = self.inner.write().expect("store lock poisoned");
        let event = state
            .outbox
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or(StoreError::NotFound)?;
        event.dispatched_at = Some(Utc::now());
        Ok(())
    }

    async fn mark_outbox_failed(&self, id: Uuid, max_attempts: i32) -> Result<(), StoreError> {
        let mut state = self.inner.write().expect("store lock poisoned");
        let event = state
            .outbox
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or(StoreError::NotFound)?;
        event.attempts += 1;
        if event.attempts >= max_attempts {
            event.dead = true;
        }
        Ok(())
    }
}
