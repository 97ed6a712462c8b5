pub mod cache;
pub mod snapshot;

use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::domain::order::{Order, OrderError};
use crate::metrics::Metrics;
use crate::store::{OrderRepository, StoreError};

pub use cache::{MemorySnapshotCache, RedisSnapshotCache, SnapshotCache};
pub use snapshot::{ShopTracking, TimelineEvent, TrackedItem, TrackingProgress, TrackingSnapshot};

// ============================================================================
// Tracking Service
// ============================================================================
//
// Read path for customers following their order. Snapshots populate lazily
// on first read and are refreshed (invalidate-and-repopulate) right after
// every successful status mutation, so the next read never recomputes from
// scratch under load. If the cache backend is down, reads fall back to the
// repository transparently; cache writes never block or fail a mutation.
//
// ============================================================================

pub struct TrackingService {
    repo: Arc<dyn OrderRepository>,
    cache: Arc<dyn SnapshotCache>,
    ttl: Duration,
    metrics: Arc<Metrics>,
}

impl TrackingService {
    pub fn new(
        repo: Arc<dyn OrderRepository>,
        cache: Arc<dyn SnapshotCache>,
        ttl: Duration,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            repo,
            cache,
            ttl,
            metrics,
        }
    }

    /// Fetch the tracking view for a parent or child order number. When a
    /// phone number is supplied it must match the order's customer; a
    /// mismatch reads the same as an unknown order.
    pub async fn get_tracking(
        &self,
        order_number: &str,
        customer_phone: Option<&str>,
    ) -> Result<TrackingSnapshot, OrderError> {
        match self.cache.get(order_number).await {
            Ok(Some(snapshot)) => {
                self.metrics.cache_hits.inc();
                return verify_phone(snapshot, order_number, customer_phone);
            }
            Ok(None) => self.metrics.cache_misses.inc(),
            Err(e) => {
                self.metrics.cache_fallbacks.inc();
                tracing::warn!(order = %order_number, error = %e, "cache read failed, falling back to repository");
            }
        }

        let order = self
            .repo
            .find_by_number(order_number)
            .await
            .map_err(store_err)?
            .ok_or_else(|| OrderError::OrderNotFound(order_number.to_string()))?;

        let (snapshot, keys) = self.assemble_family(order).await?;
        self.store_snapshot(&snapshot, &keys).await;
        verify_phone(snapshot, order_number, customer_phone)
    }

    /// Rebuild and re-store the snapshot for the family containing
    /// `order_id`. Best-effort: called right after a successful mutation and
    /// never allowed to fail it.
    pub async fn refresh_order(&self, order_id: Uuid) {
        if let Err(e) = self.try_refresh(order_id).await {
            tracing::warn!(order_id = %order_id, error = %e, "tracking refresh failed");
        }
    }

    async fn try_refresh(&self, order_id: Uuid) -> Result<(), OrderError> {
        let order = self
            .repo
            .find_by_id(order_id)
            .await
            .map_err(store_err)?
            .ok_or_else(|| OrderError::OrderNotFound(order_id.to_string()))?;
        let (snapshot, keys) = self.assemble_family(order).await?;
        self.store_snapshot(&snapshot, &keys).await;
        Ok(())
    }

    /// Resolve the whole family from any member and assemble the snapshot.
    /// Returns the cache keys the snapshot should live under (parent number
    /// plus every child number).
    async fn assemble_family(
        &self,
        order: Order,
    ) -> Result<(TrackingSnapshot, Vec<String>), OrderError> {
        let parent = if order.is_zone_child() {
            let parent_id = order.parent_order_id.ok_or_else(|| {
                OrderError::Persistence(format!(
                    "child {} has no parent reference",
                    order.order_number
                ))
            })?;
            self.repo
                .find_by_id(parent_id)
                .await
                .map_err(store_err)?
                .ok_or_else(|| {
                    OrderError::Persistence(format!(
                        "parent of {} missing from store",
                        order.order_number
                    ))
                })?
        } else {
            order
        };

        let children = if parent.is_zone_parent() {
            self.repo.children_of(parent.id).await.map_err(store_err)?
        } else {
            Vec::new()
        };

        let mut keys = vec![parent.order_number.clone()];
        keys.extend(children.iter().map(|c| c.order_number.clone()));
        Ok((TrackingSnapshot::assemble(&parent, &children), keys))
    }

    async fn store_snapshot(&self, snapshot: &TrackingSnapshot, keys: &[String]) {
        for key in keys {
            if let Err(e) = self.cache.put(key, snapshot, self.ttl).await {
                tracing::debug!(key = %key, error = %e, "cache write skipped");
            }
        }
    }
}

fn store_err(e: StoreError) -> OrderError {
    OrderError::Persistence(e.to_string())
}

fn verify_phone(
    snapshot: TrackingSnapshot,
    requested: &str,
    customer_phone: Option<&str>,
) -> Result<TrackingSnapshot, OrderError> {
    match customer_phone {
        Some(phone) if snapshot.customer_phone != phone => {
            Err(OrderError::OrderNotFound(requested.to_string()))
        }
        _ => Ok(snapshot),
    }
}
