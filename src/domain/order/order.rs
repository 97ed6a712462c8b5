use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::pricing::Pricing;
use super::status::OrderStatus;
use super::value_objects::{
    child_order_number, parent_order_number, Customer, OrderItem, OrderType, PaymentMethod,
    ShopOrderSummary, StatusChange, Traceability,
};

// ============================================================================
// Order Entity
// ============================================================================
//
// One entity type, three roles via `order_type`. A zone family is created
// together in one atomic store operation or not at all; children are mutated
// only by the status coordinator, the parent only as a side effect of a
// child commit.
//
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    pub order_number: String,
    pub order_type: OrderType,

    /// Present only on `zone_shop` orders.
    pub parent_order_id: Option<Uuid>,
    /// Present only on `zone_main` orders; derived, rebuildable via a
    /// children-by-parent query, never the sole source of truth.
    #[serde(default)]
    pub child_order_ids: Vec<Uuid>,

    pub shop_id: Option<Uuid>,
    pub zone_id: Uuid,
    pub table_label: Option<String>,
    pub customer: Customer,

    pub items: Vec<OrderItem>,
    pub pricing: Pricing,
    pub payment_method: PaymentMethod,

    pub status: OrderStatus,
    pub status_history: Vec<StatusChange>,
    pub shop_summary: Option<ShopOrderSummary>,
    pub trace: Traceability,

    /// Optimistic concurrency token; bumped by the store on every committed
    /// write.
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    pub fn new_zone_parent(
        id: Uuid,
        zone_id: Uuid,
        trace_code: String,
        table_label: Option<String>,
        customer: Customer,
        items: Vec<OrderItem>,
        pricing: Pricing,
        payment_method: PaymentMethod,
        child_order_ids: Vec<Uuid>,
    ) -> Self {
        let now = Utc::now();
        let total_shops = child_order_ids.len() as u32;
        Self {
            id,
            order_number: parent_order_number(&trace_code),
            order_type: OrderType::ZoneMain,
            parent_order_id: None,
            child_order_ids,
            shop_id: None,
            zone_id,
            table_label,
            customer,
            items,
            pricing,
            payment_method,
            status: OrderStatus::Pending,
            status_history: vec![StatusChange {
                status: OrderStatus::Pending,
                actor: "customer".to_string(),
                at: now,
                notes: None,
            }],
            shop_summary: Some(ShopOrderSummary {
                total_shops,
                completed_shops: 0,
                ready_shops: 0,
                preparing_shops: 0,
                cancelled_shops: 0,
            }),
            trace: Traceability {
                trace_code,
                sequence: 0,
            },
            version: 1,
            created_at: now,
            updated_at: now,
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub fn new_zone_child(
        parent_order_id: Uuid,
        zone_id: Uuid,
        shop_id: Uuid,
        trace_code: &str,
        sequence: u32,
        table_label: Option<String>,
        customer: Customer,
        items: Vec<OrderItem>,
        pricing: Pricing,
        payment_method: PaymentMethod,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            order_number: child_order_number(trace_code, sequence),
            order_type: OrderType::ZoneShop,
            parent_order_id: Some(parent_order_id),
            child_order_ids: Vec::new(),
            shop_id: Some(shop_id),
            zone_id,
            table_label,
            customer,
            items,
            pricing,
            payment_method,
            status: OrderStatus::Pending,
            status_history: vec![StatusChange {
                status: OrderStatus::Pending,
                actor: "customer".to_string(),
                at: now,
                notes: None,
            }],
            shop_summary: None,
            trace: Traceability {
                trace_code: trace_code.to_string(),
                sequence,
            },
            version: 1,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn new_single(
        zone_id: Uuid,
        shop_id: Uuid,
        table_label: Option<String>,
        customer: Customer,
        items: Vec<OrderItem>,
        pricing: Pricing,
        payment_method: PaymentMethod,
    ) -> Self {
        let id = Uuid::new_v4();
        let trace_code = super::value_objects::trace_code_from(id);
        let now = Utc::now();
        Self {
            id,
            order_number: parent_order_number(&trace_code),
            order_type: OrderType::Single,
            parent_order_id: None,
            child_order_ids: Vec::new(),
            shop_id: Some(shop_id),
            zone_id,
            table_label,
            customer,
            items,
            pricing,
            payment_method,
            status: OrderStatus::Pending,
            status_history: vec![StatusChange {
                status: OrderStatus::Pending,
                actor: "customer".to_string(),
                at: now,
                notes: None,
            }],
            shop_summary: None,
            trace: Traceability {
                trace_code,
                sequence: 0,
            },
            version: 1,
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply a status change in place: set the new status, mirror it onto
    /// every line item, and append a history entry. Transition validity is
    /// the coordinator's job; this method only records.
    pub fn record_status(&mut self, status: OrderStatus, actor: &str, notes: Option<String>) {
        let now = Utc::now();
        self.status = status;
        for item in &mut self.items {
            item.status = status;
        }
        self.status_history.push(StatusChange {
            status,
            actor: actor.to_string(),
            at: now,
            notes,
        });
        self.updated_at = now;
    }

    pub fn is_zone_parent(&self) -> bool {
        self.order_type == OrderType::ZoneMain
    }

    pub fn is_zone_child(&self) -> bool {
        self.order_type == OrderType::ZoneShop
    }
}
