pub mod transport;

use chrono::{DateTime, Utc};
use futures_util::future::join_all;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::order::{Order, OrderStatus, OrderType};
use crate::metrics::Metrics;

pub use transport::{ChannelTransport, MemoryTransport, RedisTransport};

// ============================================================================
// Notification Fan-out
// ============================================================================
//
// Routes order events to three logical channels: the fulfilling shop, the
// zone, and the customer (keyed by phone plus order number so concurrent
// orders from one phone multiplex cleanly). Fire-and-forget: publish
// failures are logged and counted, never surfaced to the caller, and never
// roll back the committed mutation that produced the event.
//
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderNotification {
    pub event: String,
    pub order_id: Uuid,
    pub order_number: String,
    pub parent_order_id: Option<Uuid>,
    pub order_type: OrderType,
    pub zone_id: Uuid,
    pub shop_id: Option<Uuid>,
    pub customer_phone: String,
    pub status: OrderStatus,
    pub actor: String,
    pub notes: Option<String>,
    pub at: DateTime<Utc>,
}

impl OrderNotification {
    pub fn order_created(order: &Order, actor: &str) -> Self {
        Self::from_order(order, crate::store::EVENT_ORDER_CREATED, actor, None)
    }

    pub fn status_changed(order: &Order, actor: &str, notes: Option<String>) -> Self {
        Self::from_order(order, crate::store::EVENT_STATUS_CHANGED, actor, notes)
    }

    fn from_order(order: &Order, event: &str, actor: &str, notes: Option<String>) -> Self {
        Self {
            event: event.to_string(),
            order_id: order.id,
            order_number: order.order_number.clone(),
            parent_order_id: order.parent_order_id,
            order_type: order.order_type,
            zone_id: order.zone_id,
            shop_id: order.shop_id,
            customer_phone: order.customer.phone.clone(),
            status: order.status,
            actor: actor.to_string(),
            notes,
            at: Utc::now(),
        }
    }

    /// Target channels. Parents have no shop of their own, so they skip the
    /// shop channel.
    pub fn channels(&self) -> Vec<String> {
        let mut channels = Vec::with_capacity(3);
        if let Some(shop_id) = self.shop_id {
            channels.push(shop_channel(shop_id));
        }
        channels.push(zone_channel(self.zone_id));
        channels.push(customer_channel(&self.customer_phone, &self.order_number));
        channels
    }
}

pub fn shop_channel(shop_id: Uuid) -> String {
    format!("shop:{shop_id}")
}

pub fn zone_channel(zone_id: Uuid) -> String {
    format!("zone:{zone_id}")
}

pub fn customer_channel(phone: &str, order_number: &str) -> String {
    format!("customer:{phone}:{order_number}")
}

fn channel_kind(channel: &str) -> &'static str {
    match channel.split(':').next() {
        Some("shop") => "shop",
        Some("zone") => "zone",
        Some("customer") => "customer",
        _ => "other",
    }
}

pub struct NotificationFanout {
    transport: Arc<dyn ChannelTransport>,
    metrics: Arc<Metrics>,
}

impl NotificationFanout {
    pub fn new(transport: Arc<dyn ChannelTransport>, metrics: Arc<Metrics>) -> Self {
        Self { transport, metrics }
    }

    /// Publish to every channel, reporting failure if any channel failed.
    /// The dispatcher uses the result for outbox retry bookkeeping.
    pub async fn try_publish(&self, notification: &OrderNotification) -> anyhow::Result<()> {
        let payload = serde_json::to_string(notification)?;
        let channels = notification.channels();

        let outcomes = join_all(channels.iter().map(|channel| {
            let payload = &payload;
            async move {
                let result = self.transport.publish(channel, payload).await;
                (channel.as_str(), result)
            }
        }))
        .await;

        let mut failed = 0usize;
        for (channel, result) in &outcomes {
            let kind = channel_kind(channel);
            match result {
                Ok(()) => self.metrics.record_fanout(kind, true),
                Err(e) => {
                    failed += 1;
                    self.metrics.record_fanout(kind, false);
                    tracing::warn!(
                        channel = %channel,
                        event = %notification.event,
                        order = %notification.order_number,
                        error = %e,
                        "channel publish failed"
                    );
                }
            }
        }

        if failed > 0 {
            anyhow::bail!("{failed} of {} channels failed", outcomes.len());
        }
        Ok(())
    }

    /// Fire-and-forget variant: outcome is logged, never returned.
    pub async fn publish(&self, notification: &OrderNotification) {
        if let Err(e) = self.try_publish(notification).await {
            tracing::warn!(
                event = %notification.event,
                order = %notification.order_number,
                error = %e,
                "notification fan-out incomplete"
            );
        }
    }
}
