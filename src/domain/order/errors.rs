use uuid::Uuid;

use super::status::OrderStatus;

// ============================================================================
// Order Error Taxonomy
// ============================================================================
//
// Every variant carries a stable machine-readable code distinct from its
// human-readable message, so API consumers branch on kind rather than on
// string content.
//
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum OrderError {
    #[error("zone {0} is not accepting orders")]
    ZoneUnavailable(Uuid),

    #[error("item '{item}' cannot be fulfilled: {reason}")]
    ItemUnavailable { item: String, reason: String },

    #[error("no active shop can fulfil any item in this cart")]
    NoEligibleShops,

    #[error("cart contains no items")]
    EmptyCart,

    #[error("invalid quantity {quantity} for item '{item}'")]
    InvalidQuantity { item: String, quantity: u32 },

    #[error("order not found: {0}")]
    OrderNotFound(String),

    #[error("cannot move order from {from} to {to}; allowed next: {allowed:?}")]
    InvalidTransition {
        from: OrderStatus,
        to: OrderStatus,
        allowed: Vec<OrderStatus>,
    },

    #[error("a zone main order's status is derived from its shop orders and cannot be set directly")]
    ParentStatusManaged,

    #[error("order {0} was modified concurrently; refetch and retry")]
    ConcurrentModification(String),

    #[error("persistence failure: {0}")]
    Persistence(String),
}

impl OrderError {
    /// Stable machine-readable code for API consumers.
    pub fn code(&self) -> &'static str {
        match self {
            OrderError::ZoneUnavailable(_) => "ZONE_UNAVAILABLE",
            OrderError::ItemUnavailable { .. } => "ITEM_UNAVAILABLE",
            OrderError::NoEligibleShops => "NO_ELIGIBLE_SHOPS",
            OrderError::EmptyCart => "EMPTY_CART",
            OrderError::InvalidQuantity { .. } => "INVALID_QUANTITY",
            OrderError::OrderNotFound(_) => "ORDER_NOT_FOUND",
            OrderError::InvalidTransition { .. } => "INVALID_TRANSITION",
            OrderError::ParentStatusManaged => "PARENT_STATUS_MANAGED",
            OrderError::ConcurrentModification(_) => "CONCURRENT_MODIFICATION",
            OrderError::Persistence(_) => "PERSISTENCE_FAILURE",
        }
    }

    /// Whether the caller may retry the same request unchanged (after a
    /// refetch in the concurrent-modification case).
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            OrderError::ConcurrentModification(_) | OrderError::Persistence(_)
        )
    }
}
