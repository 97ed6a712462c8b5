use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::order::{Order, OrderStatus, Pricing};

// ============================================================================
// Tracking Snapshot
// ============================================================================
//
// Denormalized, read-optimized view of one order family: parent summary,
// every shop order's summary, aggregate progress, and a chronological
// timeline merged from the family's status histories.
//
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackingSnapshot {
    pub order_number: String,
    pub trace_code: String,
    pub zone_id: Uuid,
    pub table_label: Option<String>,
    pub customer_phone: String,
    pub status: OrderStatus,
    pub pricing: Pricing,
    pub progress: TrackingProgress,
    pub shops: Vec<ShopTracking>,
    pub timeline: Vec<TimelineEvent>,
    pub refreshed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackingProgress {
    pub total_shops: u32,
    pub completed_shops: u32,
    pub ready_shops: u32,
    pub preparing_shops: u32,
    pub cancelled_shops: u32,
    /// Share of shop orders that reached a terminal status, 0-100.
    pub percent_settled: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShopTracking {
    pub shop_id: Option<Uuid>,
    pub order_number: String,
    pub status: OrderStatus,
    pub items: Vec<TrackedItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackedItem {
    pub name: String,
    pub quantity: u32,
    pub status: OrderStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimelineEvent {
    pub at: DateTime<Utc>,
    pub order_number: String,
    pub status: OrderStatus,
    pub actor: String,
    pub notes: Option<String>,
}

impl TrackingSnapshot {
    /// Build the view from committed documents. For a stand-alone order
    /// `children` is empty and the order doubles as its own shop row.
    pub fn assemble(parent: &Order, children: &[Order]) -> Self {
        let shop_orders: Vec<&Order> = if children.is_empty() {
            vec![parent]
        } else {
            children.iter().collect()
        };

        let statuses: Vec<OrderStatus> = shop_orders.iter().map(|o| o.status).collect();
        let count = |wanted: OrderStatus| statuses.iter().filter(|s| **s == wanted).count() as u32;
        let total = statuses.len() as u32;
        let settled = statuses.iter().filter(|s| s.is_terminal()).count() as u32;
        let progress = TrackingProgress {
            total_shops: total,
            completed_shops: count(OrderStatus::Completed),
            ready_shops: count(OrderStatus::Ready),
            preparing_shops: count(OrderStatus::Preparing),
            cancelled_shops: count(OrderStatus::Cancelled),
            percent_settled: if total == 0 {
                0
            } else {
                (settled * 100 / total) as u8
            },
        };

        let shops = shop_orders
            .iter()
            .map(|order| ShopTracking {
                shop_id: order.shop_id,
                order_number: order.order_number.clone(),
                status: order.status,
                items: order
                    .items
                    .iter()
                    .map(|item| TrackedItem {
                        name: item.name.clone(),
                        quantity: item.quantity,
                        status: item.status,
                    })
                    .collect(),
            })
            .collect();

        let mut timeline: Vec<TimelineEvent> = parent
            .status_history
            .iter()
            .map(|change| TimelineEvent {
                at: change.at,
                order_number: parent.order_number.clone(),
                status: change.status,
                actor: change.actor.clone(),
                notes: change.notes.clone(),
            })
            .collect();
        for child in children {
            timeline.extend(child.status_history.iter().map(|change| TimelineEvent {
                at: change.at,
                order_number: child.order_number.clone(),
                status: change.status,
                actor: change.actor.clone(),
                notes: change.notes.clone(),
            }));
        }
        timeline.sort_by(|a, b| a.at.cmp(&b.at).then(a.order_number.cmp(&b.order_number)));

        Self {
            order_number: parent.order_number.clone(),
            trace_code: parent.trace.trace_code.clone(),
            zone_id: parent.zone_id,
            table_label: parent.table_label.clone(),
            customer_phone: parent.customer.phone.clone(),
            status: parent.status,
            pricing: parent.pricing,
            progress,
            shops,
            timeline,
            refreshed_at: Utc::now(),
        }
    }
}
