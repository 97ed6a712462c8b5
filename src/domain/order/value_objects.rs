use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::status::OrderStatus;

// ============================================================================
// Order Value Objects
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderType {
    /// A stand-alone shop order with no parent.
    Single,
    /// The customer-facing aggregate order spanning all shops in one cart.
    ZoneMain,
    /// A shop-scoped fulfillment order derived from one basket of a parent.
    ZoneShop,
}

impl OrderType {
    pub fn as_str(self) -> &'static str {
        match self {
            OrderType::Single => "single",
            OrderType::ZoneMain => "zone_main",
            OrderType::ZoneShop => "zone_shop",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    Card,
    MobileWallet,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Customer {
    pub name: String,
    pub phone: String,
}

/// One line item on an order. Prices are integer minor units (cents).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItem {
    pub catalog_ref: String,
    pub name: String,
    pub quantity: u32,
    pub unit_price: i64,
    #[serde(default)]
    pub modifiers: Vec<String>,
    pub status: OrderStatus,
}

impl OrderItem {
    pub fn line_total(&self) -> i64 {
        self.unit_price * i64::from(self.quantity)
    }
}

/// Append-only entry in an order's status history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusChange {
    pub status: OrderStatus,
    pub actor: String,
    pub at: DateTime<Utc>,
    pub notes: Option<String>,
}

/// Aggregate shop counts, derived from a parent's children. Meaningful only
/// on `zone_main` orders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShopOrderSummary {
    pub total_shops: u32,
    pub completed_shops: u32,
    pub ready_shops: u32,
    pub preparing_shops: u32,
    pub cancelled_shops: u32,
}

impl ShopOrderSummary {
    pub fn from_children(statuses: &[OrderStatus]) -> Self {
        let count = |wanted: OrderStatus| statuses.iter().filter(|s| **s == wanted).count() as u32;
        Self {
            total_shops: statuses.len() as u32,
            completed_shops: count(OrderStatus::Completed),
            ready_shops: count(OrderStatus::Ready),
            preparing_shops: count(OrderStatus::Preparing),
            cancelled_shops: count(OrderStatus::Cancelled),
        }
    }
}

/// Shared trace code correlating a parent with all its children. The parent
/// carries sequence 0; children carry their basket's 1-based sequence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Traceability {
    pub trace_code: String,
    pub sequence: u32,
}

// ============================================================================
// Order Number Derivation
// ============================================================================
//
// One trace code per family. Child numbers are derived from the trace code
// plus the basket sequence, so a child maps back to its parent without a
// join.
//
// ============================================================================

pub fn trace_code_from(id: Uuid) -> String {
    id.simple().to_string()[..8].to_uppercase()
}

pub fn parent_order_number(trace_code: &str) -> String {
    format!("ORD-{trace_code}")
}

pub fn child_order_number(trace_code: &str, sequence: u32) -> String {
    format!("ORD-{trace_code}-S{sequence:02}")
}
