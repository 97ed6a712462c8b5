use std::sync::Arc;
use uuid::Uuid;

use crate::domain::order::{
    aggregate_parent_status, Order, OrderError, OrderStatus, OrderType, ShopOrderSummary,
};
use crate::fanout::OrderNotification;
use crate::metrics::Metrics;
use crate::store::{
    OrderRepository, OutboxEvent, ParentCommit, StatusCommit, StoreError, EVENT_STATUS_CHANGED,
};
use crate::tracking::TrackingService;
use crate::utils::BackoffSchedule;

// ============================================================================
// Order Status Coordinator
// ============================================================================
//
// Owns every status mutation. A valid child transition commits, in one
// repository transaction: the child's new status + history entry, and the
// parent recomputed over the fresh committed sibling set, so the parent is
// never observably stale relative to its children.
//
// Concurrency: version preconditions on both rows. A race on the same child
// surfaces as ConcurrentModification for the caller to refetch and retry. A
// race on the parent row only (two transitions on different children) is
// retried internally with a short backoff; both callers succeed and each
// recomputation sees the committed union.
//
// ============================================================================

#[derive(Debug, Clone)]
pub struct StatusUpdateOutcome {
    pub child: Order,
    /// The parent document after the commit; `None` for single orders.
    pub parent: Option<Order>,
    pub child_changed: bool,
    pub parent_changed: bool,
}

pub struct StatusCoordinator {
    repo: Arc<dyn OrderRepository>,
    tracking: Arc<TrackingService>,
    metrics: Arc<Metrics>,
    backoff: BackoffSchedule,
}

enum AttemptError {
    /// The parent row moved under us; safe to re-read and retry internally.
    ParentRaced(String),
    Order(OrderError),
}

impl StatusCoordinator {
    pub fn new(
        repo: Arc<dyn OrderRepository>,
        tracking: Arc<TrackingService>,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            repo,
            tracking,
            metrics,
            backoff: BackoffSchedule::quick(),
        }
    }

    pub async fn update_child_status(
        &self,
        child_order_id: Uuid,
        new_status: OrderStatus,
        actor: &str,
        notes: Option<String>,
    ) -> Result<StatusUpdateOutcome, OrderError> {
        let mut delays = self.backoff.delays();
        loop {
            match self
                .attempt(child_order_id, new_status, actor, notes.clone())
                .await
            {
                Ok(outcome) => return Ok(outcome),
                Err(AttemptError::ParentRaced(order_number)) => {
                    self.metrics.record_version_conflict("parent");
                    match delays.next() {
                        Some(delay) => {
                            tracing::debug!(
                                order = %order_number,
                                delay_ms = delay.as_millis() as u64,
                                "parent raced by a sibling commit, retrying"
                            );
                            tokio::time::sleep(delay).await;
                        }
                        None => {
                            return Err(OrderError::ConcurrentModification(order_number));
                        }
                    }
                }
                Err(AttemptError::Order(e)) => return Err(e),
            }
        }
    }

    async fn attempt(
        &self,
        child_order_id: Uuid,
        new_status: OrderStatus,
        actor: &str,
        notes: Option<String>,
    ) -> Result<StatusUpdateOutcome, AttemptError> {
        let child = self
            .repo
            .find_by_id(child_order_id)
            .await
            .map_err(|e| AttemptError::Order(OrderError::Persistence(e.to_string())))?
            .ok_or_else(|| {
                AttemptError::Order(OrderError::OrderNotFound(child_order_id.to_string()))
            })?;

        if child.order_type == OrderType::ZoneMain {
            self.metrics.record_rejection("PARENT_STATUS_MANAGED");
            return Err(AttemptError::Order(OrderError::ParentStatusManaged));
        }

        if !child.status.can_transition_to(new_status) {
            self.metrics.record_rejection("INVALID_TRANSITION");
            return Err(AttemptError::Order(OrderError::InvalidTransition {
                from: child.status,
                to: new_status,
                allowed: child.status.allowed_next().to_vec(),
            }));
        }

        let mut updated_child = child.clone();
        updated_child.record_status(new_status, actor, notes.clone());

        let (commit, updated_parent, parent_changed) = match child.order_type {
            OrderType::ZoneShop => {
                let parent_id = child.parent_order_id.ok_or_else(|| {
                    AttemptError::Order(OrderError::Persistence(format!(
                        "child {} has no parent reference",
                        child.order_number
                    )))
                })?;
                let parent = self
                    .repo
                    .find_by_id(parent_id)
                    .await
                    .map_err(|e| AttemptError::Order(OrderError::Persistence(e.to_string())))?
                    .ok_or_else(|| {
                        AttemptError::Order(OrderError::Persistence(format!(
                            "parent of {} missing from store",
                            child.order_number
                        )))
                    })?;

                let siblings = self
                    .repo
                    .children_of(parent_id)
                    .await
                    .map_err(|e| AttemptError::Order(OrderError::Persistence(e.to_string())))?;

                // The committed sibling set, with this child's transition
                // applied on top.
                let statuses: Vec<OrderStatus> = siblings
                    .iter()
                    .map(|s| if s.id == child.id { new_status } else { s.status })
                    .collect();

                let computed = aggregate_parent_status(&statuses);
                let parent_changed = computed != parent.status;

                let mut updated_parent = parent.clone();
                if parent_changed {
                    updated_parent.record_status(computed, "system", None);
                }
                updated_parent.shop_summary = Some(ShopOrderSummary::from_children(&statuses));
                updated_parent.updated_at = chrono::Utc::now();

                (
                    StatusCommit {
                        child: updated_child.clone(),
                        expected_child_version: child.version,
                        parent: Some(ParentCommit {
                            parent: updated_parent.clone(),
                            expected_parent_version: parent.version,
                        }),
                    },
                    Some((updated_parent, parent.version)),
                    parent_changed,
                )
            }
            _ => (
                StatusCommit {
                    child: updated_child.clone(),
                    expected_child_version: child.version,
                    parent: None,
                },
                None,
                false,
            ),
        };

        let mut outbox = vec![status_event(&updated_child, actor, notes)
            .map_err(AttemptError::Order)?];
        if parent_changed {
            if let Some((parent_doc, _)) = &updated_parent {
                outbox.push(status_event(parent_doc, "system", None).map_err(AttemptError::Order)?);
            }
        }

        match self.repo.commit_status_change(commit, outbox).await {
            Ok(()) => {
                self.metrics
                    .record_transition(child.status.as_str(), new_status.as_str());
                tracing::info!(
                    order = %updated_child.order_number,
                    from = child.status.as_str(),
                    to = new_status.as_str(),
                    actor = %actor,
                    parent_changed,
                    "✅ status committed"
                );

                // Mirror the store's version bump on the returned documents.
                let mut committed_child = updated_child;
                committed_child.version = child.version + 1;
                let committed_parent = updated_parent.map(|(mut p, expected)| {
                    p.version = expected + 1;
                    p
                });

                let family_anchor = committed_child
                    .parent_order_id
                    .unwrap_or(committed_child.id);
                self.tracking.refresh_order(family_anchor).await;

                Ok(StatusUpdateOutcome {
                    child: committed_child,
                    parent: committed_parent,
                    child_changed: true,
                    parent_changed,
                })
            }
            Err(StoreError::VersionConflict { order_id }) if order_id == child.id => {
                self.metrics.record_version_conflict("child");
                Err(AttemptError::Order(OrderError::ConcurrentModification(
                    child.order_number.clone(),
                )))
            }
            Err(StoreError::VersionConflict { .. }) => {
                Err(AttemptError::ParentRaced(child.order_number.clone()))
            }
            Err(e) => Err(AttemptError::Order(OrderError::Persistence(e.to_string()))),
        }
    }
}

fn status_event(
    order: &Order,
    actor: &str,
    notes: Option<String>,
) -> Result<OutboxEvent, OrderError> {
    let notification = OrderNotification::status_changed(order, actor, notes);
    let payload = serde_json::to_string(&notification)
        .map_err(|e| OrderError::Persistence(format!("event encoding failed: {e}")))?;
    Ok(OutboxEvent::new(order.id, EVENT_STATUS_CHANGED, payload))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{MemoryCatalog, ResolvedItem};
    use crate::directory::{MemoryDirectory, ShopStatus, ZoneStatus};
    use crate::domain::order::{Customer, PaymentMethod, PricingRates};
    use crate::splitter::{CartLine, OrderSplitter, ZoneOrderReceipt, ZoneOrderRequest};
    use crate::store::MemoryOrderStore;
    use crate::tracking::{MemorySnapshotCache, SnapshotCache};
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::time::Duration;

    struct World {
        coordinator: StatusCoordinator,
        store: MemoryOrderStore,
        cache: Arc<MemorySnapshotCache>,
        receipt: ZoneOrderReceipt,
    }

    /// Full wiring: a real split of a two-shop cart, coordinated against the
    /// in-memory store.
    async fn world() -> World {
        let store = MemoryOrderStore::new();
        let catalog = Arc::new(MemoryCatalog::new());
        let directory = Arc::new(MemoryDirectory::new());
        let metrics = Arc::new(Metrics::new().unwrap());
        let cache = Arc::new(MemorySnapshotCache::new());
        let tracking = Arc::new(TrackingService::new(
            Arc::new(store.clone()),
            cache.clone(),
            Duration::from_secs(60),
            metrics.clone(),
        ));

        let zone_id = Uuid::new_v4();
        let shop_x = Uuid::new_v4();
        let shop_y = Uuid::new_v4();
        directory.add_zone(zone_id, ZoneStatus::Open);
        directory.add_shop(zone_id, shop_x, "Wok Station", ShopStatus::Active);
        directory.add_shop(zone_id, shop_y, "Kopi Corner", ShopStatus::Active);
        catalog.insert(
            "satay",
            ResolvedItem {
                shop_id: shop_x,
                name: "Chicken Satay".to_string(),
                available: true,
                unit_price: 850,
            },
        );
        catalog.insert(
            "kopi",
            ResolvedItem {
                shop_id: shop_y,
                name: "Kopi O".to_string(),
                available: true,
                unit_price: 180,
            },
        );

        let splitter = OrderSplitter::new(
            Arc::new(store.clone()),
            catalog,
            directory,
            tracking.clone(),
            PricingRates::default(),
            metrics.clone(),
        );
        let receipt = splitter
            .create_zone_order(ZoneOrderRequest {
                zone_id,
                table_label: Some("T1".to_string()),
                customer: Customer {
                    name: "Mei Lin".to_string(),
                    phone: "+6591234567".to_string(),
                },
                items: vec![
                    CartLine {
                        item: "satay".to_string(),
                        quantity: 2,
                        modifiers: vec![],
                    },
                    CartLine {
                        item: "kopi".to_string(),
                        quantity: 1,
                        modifiers: vec![],
                    },
                ],
                payment_method: PaymentMethod::Card,
            })
            .await
            .unwrap();

        let coordinator =
            StatusCoordinator::new(Arc::new(store.clone()), tracking, metrics.clone());

        World {
            coordinator,
            store,
            cache,
            receipt,
        }
    }

    async fn parent_status(world: &World) -> OrderStatus {
        world
            .store
            .find_by_id(world.receipt.parent.id)
            .await
            .unwrap()
            .unwrap()
            .status
    }

    #[tokio::test]
    async fn test_parent_observes_monotonic_sequence() {
        let w = world().await;
        let c1 = w.receipt.children[0].id;
        let c2 = w.receipt.children[1].id;

        let mut observed = vec![parent_status(&w).await];
        let steps = [
            (c1, OrderStatus::Preparing),
            (c2, OrderStatus::Preparing),
            (c1, OrderStatus::Ready),
            (c2, OrderStatus::Ready),
            (c1, OrderStatus::Completed),
            (c2, OrderStatus::Completed),
        ];
        for (child, status) in steps {
            w.coordinator
                .update_child_status(child, status, "shop", None)
                .await
                .unwrap();
            observed.push(parent_status(&w).await);
        }

        // Collapse consecutive repeats: the poller sees exactly the
        // monotonic sequence with no skips or regressions.
        let mut distinct = vec![observed[0]];
        for status in &observed[1..] {
            if *status != *distinct.last().unwrap() {
                distinct.push(*status);
            }
        }
        assert_eq!(
            distinct,
            vec![
                OrderStatus::Pending,
                OrderStatus::Preparing,
                OrderStatus::Ready,
                OrderStatus::Completed
            ]
        );
    }

    #[tokio::test]
    async fn test_completion_dominates_partial_cancellation() {
        let w = world().await;
        let c1 = w.receipt.children[0].id;
        let c2 = w.receipt.children[1].id;

        w.coordinator
            .update_child_status(c1, OrderStatus::Cancelled, "shop", Some("out of stock".into()))
            .await
            .unwrap();
        // One cancellation alone does not move the parent.
        assert_eq!(parent_status(&w).await, OrderStatus::Pending);

        for status in [OrderStatus::Preparing, OrderStatus::Ready, OrderStatus::Completed] {
            w.coordinator
                .update_child_status(c2, status, "shop", None)
                .await
                .unwrap();
        }
        assert_eq!(parent_status(&w).await, OrderStatus::Completed);

        let parent = w
            .store
            .find_by_id(w.receipt.parent.id)
            .await
            .unwrap()
            .unwrap();
        let summary = parent.shop_summary.unwrap();
        assert_eq!(summary.completed_shops, 1);
        assert_eq!(summary.cancelled_shops, 1);
    }

    #[tokio::test]
    async fn test_all_cancelled_cancels_parent() {
        let w = world().await;
        for child in &w.receipt.children {
            w.coordinator
                .update_child_status(child.id, OrderStatus::Cancelled, "shop", None)
                .await
                .unwrap();
        }
        assert_eq!(parent_status(&w).await, OrderStatus::Cancelled);
    }

    #[tokio::test]
    async fn test_regression_rejected_and_document_untouched() {
        let w = world().await;
        let c1 = w.receipt.children[0].id;

        w.coordinator
            .update_child_status(c1, OrderStatus::Preparing, "shop", None)
            .await
            .unwrap();
        w.coordinator
            .update_child_status(c1, OrderStatus::Ready, "shop", None)
            .await
            .unwrap();

        let before = w.store.find_by_id(c1).await.unwrap().unwrap();

        let err = w
            .coordinator
            .update_child_status(c1, OrderStatus::Pending, "shop", None)
            .await
            .unwrap_err();
        match err {
            OrderError::InvalidTransition { from, to, allowed } => {
                assert_eq!(from, OrderStatus::Ready);
                assert_eq!(to, OrderStatus::Pending);
                assert_eq!(allowed, vec![OrderStatus::Completed, OrderStatus::Cancelled]);
            }
            other => panic!("expected InvalidTransition, got {other:?}"),
        }

        // Stored status, history, and version are unchanged.
        let after = w.store.find_by_id(c1).await.unwrap().unwrap();
        assert_eq!(after.status, before.status);
        assert_eq!(after.status_history.len(), before.status_history.len());
        assert_eq!(after.version, before.version);
    }

    #[tokio::test]
    async fn test_repeating_an_applied_transition_is_rejected() {
        let w = world().await;
        let c1 = w.receipt.children[0].id;

        w.coordinator
            .update_child_status(c1, OrderStatus::Preparing, "shop", None)
            .await
            .unwrap();
        let err = w
            .coordinator
            .update_child_status(c1, OrderStatus::Preparing, "shop", None)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "INVALID_TRANSITION");
    }

    #[tokio::test]
    async fn test_parent_cannot_be_updated_directly() {
        let w = world().await;
        let err = w
            .coordinator
            .update_child_status(w.receipt.parent.id, OrderStatus::Preparing, "shop", None)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "PARENT_STATUS_MANAGED");
    }

    #[tokio::test]
    async fn test_unknown_order_not_found() {
        let w = world().await;
        let err = w
            .coordinator
            .update_child_status(Uuid::new_v4(), OrderStatus::Preparing, "shop", None)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "ORDER_NOT_FOUND");
    }

    #[tokio::test]
    async fn test_outcome_flags_and_versions() {
        let w = world().await;
        let c1 = w.receipt.children[0].id;

        // First transition moves the parent too.
        let outcome = w
            .coordinator
            .update_child_status(c1, OrderStatus::Preparing, "shop", None)
            .await
            .unwrap();
        assert!(outcome.child_changed);
        assert!(outcome.parent_changed);
        assert_eq!(outcome.child.version, 2);
        assert_eq!(outcome.parent.as_ref().unwrap().version, 2);
        assert_eq!(
            outcome.parent.as_ref().unwrap().status,
            OrderStatus::Preparing
        );

        // Ready on one child of two leaves the parent preparing: committed
        // but unchanged.
        let outcome = w
            .coordinator
            .update_child_status(c1, OrderStatus::Ready, "shop", None)
            .await
            .unwrap();
        assert!(outcome.child_changed);
        assert!(!outcome.parent_changed);
        assert_eq!(
            outcome.parent.as_ref().unwrap().status,
            OrderStatus::Preparing
        );
    }

    #[tokio::test]
    async fn test_outbox_rows_skip_unchanged_parent() {
        let w = world().await;
        let c1 = w.receipt.children[0].id;
        let baseline = w.store.outbox_rows().len();

        // Parent changes: two status_changed rows.
        w.coordinator
            .update_child_status(c1, OrderStatus::Preparing, "shop", None)
            .await
            .unwrap();
        assert_eq!(w.store.outbox_rows().len(), baseline + 2);

        // Parent unchanged: one row.
        w.coordinator
            .update_child_status(c1, OrderStatus::Ready, "shop", None)
            .await
            .unwrap();
        assert_eq!(w.store.outbox_rows().len(), baseline + 3);
    }

    #[tokio::test]
    async fn test_cache_refreshed_after_mutation() {
        let w = world().await;
        let c1 = w.receipt.children[0].id;

        w.coordinator
            .update_child_status(c1, OrderStatus::Preparing, "shop", None)
            .await
            .unwrap();

        let snapshot = w
            .cache
            .get(&w.receipt.parent.order_number)
            .await
            .unwrap()
            .expect("snapshot repopulated after mutation");
        assert_eq!(snapshot.status, OrderStatus::Preparing);
        assert_eq!(snapshot.progress.preparing_shops, 1);
    }

    // ------------------------------------------------------------------
    // Race simulation: a delegating store that injects a competing commit
    // between the coordinator's read and its commit.
    // ------------------------------------------------------------------

    enum Race {
        SameChild(Uuid),
        Sibling(Uuid),
    }

    struct RacingStore {
        inner: MemoryOrderStore,
        race: Mutex<Option<Race>>,
    }

    impl RacingStore {
        fn new(inner: MemoryOrderStore, race: Race) -> Self {
            Self {
                inner,
                race: Mutex::new(Some(race)),
            }
        }

        async fn run_race(&self, race: Race) {
            match race {
                Race::SameChild(child_id) => {
                    let child = self.inner.find_by_id(child_id).await.unwrap().unwrap();
                    let mut updated = child.clone();
                    updated.record_status(OrderStatus::Preparing, "rival", None);
                    self.inner
                        .commit_status_change(
                            StatusCommit {
                                child: updated,
                                expected_child_version: child.version,
                                parent: None,
                            },
                            vec![],
                        )
                        .await
                        .unwrap();
                }
                Race::Sibling(sibling_id) => {
                    let sibling = self.inner.find_by_id(sibling_id).await.unwrap().unwrap();
                    let parent_id = sibling.parent_order_id.unwrap();
                    let parent = self.inner.find_by_id(parent_id).await.unwrap().unwrap();
                    let mut updated_sibling = sibling.clone();
                    updated_sibling.record_status(OrderStatus::Preparing, "rival", None);
                    let mut updated_parent = parent.clone();
                    updated_parent.record_status(OrderStatus::Preparing, "system", None);
                    self.inner
                        .commit_status_change(
                            StatusCommit {
                                child: updated_sibling,
                                expected_child_version: sibling.version,
                                parent: Some(ParentCommit {
                                    parent: updated_parent,
                                    expected_parent_version: parent.version,
                                }),
                            },
                            vec![],
                        )
                        .await
                        .unwrap();
                }
            }
        }
    }

    #[async_trait]
    impl OrderRepository for RacingStore {
        async fn create_order_family(
            &self,
            parent: Order,
            children: Vec<Order>,
            outbox: Vec<OutboxEvent>,
        ) -> Result<(), StoreError> {
            self.inner.create_order_family(parent, children, outbox).await
        }
        async fn insert_order(
            &self,
            order: Order,
            outbox: Vec<OutboxEvent>,
        ) -> Result<(), StoreError> {
            self.inner.insert_order(order, outbox).await
        }
        async fn find_by_id(&self, id: Uuid) -> Result<Option<Order>, StoreError> {
            self.inner.find_by_id(id).await
        }
        async fn find_by_number(&self, order_number: &str) -> Result<Option<Order>, StoreError> {
            self.inner.find_by_number(order_number).await
        }
        async fn children_of(&self, parent_id: Uuid) -> Result<Vec<Order>, StoreError> {
            // The coordinator reads siblings right before committing; this
            // is where a concurrent writer sneaks in.
            let race = self.race.lock().unwrap().take();
            if let Some(race) = race {
                self.run_race(race).await;
            }
            self.inner.children_of(parent_id).await
        }
        async fn commit_status_change(
            &self,
            commit: StatusCommit,
            outbox: Vec<OutboxEvent>,
        ) -> Result<(), StoreError> {
            self.inner.commit_status_change(commit, outbox).await
        }
        async fn undispatched_outbox(&self, limit: usize) -> Result<Vec<OutboxEvent>, StoreError> {
            self.inner.undispatched_outbox(limit).await
        }
        async fn mark_outbox_dispatched(&self, id: Uuid) -> Result<(), StoreError> {
            self.inner.mark_outbox_dispatched(id).await
        }
        async fn mark_outbox_failed(&self, id: Uuid, max_attempts: i32) -> Result<(), StoreError> {
            self.inner.mark_outbox_failed(id, max_attempts).await
        }
    }

    fn racing_coordinator(store: &MemoryOrderStore, race: Race) -> StatusCoordinator {
        let metrics = Arc::new(Metrics::new().unwrap());
        let racing = Arc::new(RacingStore::new(store.clone(), race));
        let tracking = Arc::new(TrackingService::new(
            racing.clone(),
            Arc::new(MemorySnapshotCache::new()),
            Duration::from_secs(60),
            metrics.clone(),
        ));
        StatusCoordinator::new(racing, tracking, metrics)
    }

    #[tokio::test]
    async fn test_same_child_race_surfaces_concurrent_modification() {
        let w = world().await;
        let c1 = &w.receipt.children[0];
        let coordinator = racing_coordinator(&w.store, Race::SameChild(c1.id));

        let err = coordinator
            .update_child_status(c1.id, OrderStatus::Preparing, "shop", None)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "CONCURRENT_MODIFICATION");
        assert!(err.is_retryable());

        // The rival's write stands; no silent overwrite happened.
        let stored = w.store.find_by_id(c1.id).await.unwrap().unwrap();
        assert_eq!(stored.status_history.last().unwrap().actor, "rival");
    }

    #[tokio::test]
    async fn test_sibling_race_is_retried_internally() {
        let w = world().await;
        let c1 = &w.receipt.children[0];
        let c2 = &w.receipt.children[1];
        let coordinator = racing_coordinator(&w.store, Race::Sibling(c2.id));

        // The rival transitions c2 (and the parent) mid-flight; our update
        // to c1 must still succeed without surfacing an error.
        let outcome = coordinator
            .update_child_status(c1.id, OrderStatus::Preparing, "shop", None)
            .await
            .unwrap();
        assert!(outcome.child_changed);
        // The retry re-read the parent the rival had already moved.
        assert!(!outcome.parent_changed);

        let parent = w
            .store
            .find_by_id(w.receipt.parent.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(parent.status, OrderStatus::Preparing);
        let summary = parent.shop_summary.unwrap();
        assert_eq!(summary.preparing_shops, 2);
        for child in [c1, c2] {
            let stored = w.store.find_by_id(child.id).await.unwrap().unwrap();
            assert_eq!(stored.status, OrderStatus::Preparing);
        }
    }

    #[tokio::test]
    async fn test_single_order_path_has_no_parent() {
        let w = world().await;
        let single = Order::new_single(
            Uuid::new_v4(),
            Uuid::new_v4(),
            None,
            Customer {
                name: "Omar".to_string(),
                phone: "+6588887777".to_string(),
            },
            vec![],
            crate::domain::order::Pricing::zero(),
            PaymentMethod::Cash,
        );
        let single_id = single.id;
        w.store.insert_order(single, vec![]).await.unwrap();

        let outcome = w
            .coordinator
            .update_child_status(single_id, OrderStatus::Preparing, "shop", None)
            .await
            .unwrap();
        assert!(outcome.parent.is_none());
        assert!(!outcome.parent_changed);
        assert_eq!(outcome.child.status, OrderStatus::Preparing);
    }
}
