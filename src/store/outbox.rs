use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// Transactional Outbox
// ============================================================================
//
// A row is written in the same transaction as the order mutation that
// produced it, then drained by the dispatcher. This way a crash immediately
// after commit can delay a notification but never lose the fact that one is
// owed.
//
// ============================================================================

pub const EVENT_ORDER_CREATED: &str = "order.created";
pub const EVENT_STATUS_CHANGED: &str = "order.status_changed";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboxEvent {
    pub id: Uuid,
    pub order_id: Uuid,
    pub event_type: String,
    /// Serialized `OrderNotification`.
    pub payload: String,
    pub created_at: DateTime<Utc>,
    pub attempts: i32,
    pub dispatched_at: Option<DateTime<Utc>>,
    /// Set once `attempts` exhausts the configured budget; dead rows are
    /// skipped by the dispatcher and only surface in metrics and logs.
    pub dead: bool,
}

impl OutboxEvent {
    pub fn new(order_id: Uuid, event_type: &str, payload: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            order_id,
            event_type: event_type.to_string(),
            payload,
            created_at: Utc::now(),
            attempts: 0,
            dispatched_at: None,
            dead: false,
        }
    }
}
