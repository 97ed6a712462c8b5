use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use uuid::Uuid;

use crate::catalog::CatalogLookup;
use crate::directory::{ZoneDirectory, ZoneStatus};
use crate::domain::order::{
    child_pricings, trace_code_from, Customer, Order, OrderError, OrderItem, OrderStatus,
    PaymentMethod, PricingRates,
};
use crate::fanout::OrderNotification;
use crate::metrics::Metrics;
use crate::store::{OrderRepository, OutboxEvent, EVENT_ORDER_CREATED};
use crate::tracking::TrackingService;

// ============================================================================
// Order Splitter
// ============================================================================
//
// Takes one zone cart spanning several shops and materializes it as one
// zone_main parent plus N zone_shop children. Validation is all-or-nothing
// and happens before any write; the family plus its outbox rows commit as a
// single atomic repository operation, so no orphan child or half-linked
// parent is ever observable.
//
// ============================================================================

#[derive(Debug, Clone)]
pub struct CartLine {
    /// Catalog reference of the menu item.
    pub item: String,
    pub quantity: u32,
    pub modifiers: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct ZoneOrderRequest {
    pub zone_id: Uuid,
    pub table_label: Option<String>,
    pub customer: Customer,
    pub items: Vec<CartLine>,
    pub payment_method: PaymentMethod,
}

#[derive(Debug, Clone)]
pub struct ZoneOrderReceipt {
    pub parent: Order,
    pub children: Vec<Order>,
}

pub struct OrderSplitter {
    repo: Arc<dyn OrderRepository>,
    catalog: Arc<dyn CatalogLookup>,
    directory: Arc<dyn ZoneDirectory>,
    tracking: Arc<TrackingService>,
    rates: PricingRates,
    metrics: Arc<Metrics>,
}

impl OrderSplitter {
    pub fn new(
        repo: Arc<dyn OrderRepository>,
        catalog: Arc<dyn CatalogLookup>,
        directory: Arc<dyn ZoneDirectory>,
        tracking: Arc<TrackingService>,
        rates: PricingRates,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            repo,
            catalog,
            directory,
            tracking,
            rates,
            metrics,
        }
    }

    pub async fn create_zone_order(
        &self,
        request: ZoneOrderRequest,
    ) -> Result<ZoneOrderReceipt, OrderError> {
        let baskets = match self.validate(&request).await {
            Ok(baskets) => baskets,
            Err(e) => {
                self.metrics
                    .creation_rejections
                    .with_label_values(&[e.code()])
                    .inc();
                tracing::debug!(zone_id = %request.zone_id, code = e.code(), "zone cart rejected");
                return Err(e);
            }
        };

        let receipt = self.materialize(&request, baskets).await?;

        self.metrics.record_zone_split(receipt.children.len());
        tracing::info!(
            parent_order = %receipt.parent.order_number,
            zone_id = %request.zone_id,
            shop_count = receipt.children.len(),
            total = receipt.parent.pricing.total,
            "✅ zone order created"
        );

        // Prime the tracking cache; best-effort, the order is already
        // committed.
        self.tracking.refresh_order(receipt.parent.id).await;

        Ok(receipt)
    }

    /// All-or-nothing validation: resolve every line, then either fail the
    /// whole request or return per-shop baskets in first-appearance order.
    async fn validate(
        &self,
        request: &ZoneOrderRequest,
    ) -> Result<Vec<(Uuid, Vec<OrderItem>)>, OrderError> {
        if request.items.is_empty() {
            return Err(OrderError::EmptyCart);
        }
        for line in &request.items {
            if line.quantity == 0 {
                return Err(OrderError::InvalidQuantity {
                    item: line.item.clone(),
                    quantity: line.quantity,
                });
            }
        }

        let zone = self
            .directory
            .zone_status(request.zone_id)
            .await
            .map_err(|e| OrderError::Persistence(format!("zone lookup failed: {e}")))?;
        if zone != Some(ZoneStatus::Open) {
            return Err(OrderError::ZoneUnavailable(request.zone_id));
        }

        let active_shops: HashSet<Uuid> = self
            .directory
            .active_shops_in_zone(request.zone_id)
            .await
            .map_err(|e| OrderError::Persistence(format!("shop lookup failed: {e}")))?
            .into_iter()
            .map(|s| s.shop_id)
            .collect();
        if active_shops.is_empty() {
            return Err(OrderError::NoEligibleShops);
        }

        let mut eligible: Vec<(Uuid, OrderItem)> = Vec::with_capacity(request.items.len());
        let mut ineligible: Vec<(String, String)> = Vec::new();

        for line in &request.items {
            let resolved = self
                .catalog
                .resolve_item(&line.item)
                .await
                .map_err(|e| OrderError::Persistence(format!("catalog lookup failed: {e}")))?;

            match resolved {
                None => ineligible.push((line.item.clone(), "not in catalog".to_string())),
                Some(entry) if !entry.available => {
                    ineligible.push((line.item.clone(), "currently unavailable".to_string()));
                }
                Some(entry) if !active_shops.contains(&entry.shop_id) => {
                    ineligible.push((line.item.clone(), "shop not active in this zone".to_string()));
                }
                Some(entry) => eligible.push((
                    entry.shop_id,
                    OrderItem {
                        catalog_ref: line.item.clone(),
                        name: entry.name,
                        quantity: line.quantity,
                        unit_price: entry.unit_price,
                        modifiers: line.modifiers.clone(),
                        status: OrderStatus::Pending,
                    },
                )),
            }
        }

        // A cart where nothing at all can be fulfilled reads as "no eligible
        // shops"; a cart that is only partially fulfillable is rejected on
        // the first bad line, never partially accepted.
        if eligible.is_empty() {
            return Err(OrderError::NoEligibleShops);
        }
        if let Some((item, reason)) = ineligible.into_iter().next() {
            return Err(OrderError::ItemUnavailable { item, reason });
        }

        // Group into one basket per shop, ordered by first appearance.
        let mut basket_index: HashMap<Uuid, usize> = HashMap::new();
        let mut baskets: Vec<(Uuid, Vec<OrderItem>)> = Vec::new();
        for (shop_id, item) in eligible {
            match basket_index.get(&shop_id) {
                Some(&idx) => baskets[idx].1.push(item),
                None => {
                    basket_index.insert(shop_id, baskets.len());
                    baskets.push((shop_id, vec![item]));
                }
            }
        }

        Ok(baskets)
    }

    async fn materialize(
        &self,
        request: &ZoneOrderRequest,
        baskets: Vec<(Uuid, Vec<OrderItem>)>,
    ) -> Result<ZoneOrderReceipt, OrderError> {
        let basket_subtotals: Vec<i64> = baskets
            .iter()
            .map(|(_, items)| items.iter().map(OrderItem::line_total).sum())
            .collect();
        let parent_pricing = self.rates.price(basket_subtotals.iter().sum());
        let pricings = child_pricings(&parent_pricing, &basket_subtotals);

        let parent_id = Uuid::new_v4();
        let trace_code = trace_code_from(parent_id);

        let children: Vec<Order> = baskets
            .into_iter()
            .zip(pricings)
            .enumerate()
            .map(|(idx, ((shop_id, items), pricing))| {
                Order::new_zone_child(
                    parent_id,
                    request.zone_id,
                    shop_id,
                    &trace_code,
                    (idx + 1) as u32,
                    request.table_label.clone(),
                    request.customer.clone(),
                    items,
                    pricing,
                    request.payment_method,
                )
            })
            .collect();

        let parent_items: Vec<OrderItem> = children
            .iter()
            .flat_map(|child| child.items.iter().cloned())
            .collect();

        let parent = Order::new_zone_parent(
            parent_id,
            request.zone_id,
            trace_code,
            request.table_label.clone(),
            request.customer.clone(),
            parent_items,
            parent_pricing,
            request.payment_method,
            children.iter().map(|c| c.id).collect(),
        );

        let mut outbox = Vec::with_capacity(children.len() + 1);
        for order in std::iter::once(&parent).chain(children.iter()) {
            let notification = OrderNotification::order_created(order, "customer");
            let payload = serde_json::to_string(&notification)
                .map_err(|e| OrderError::Persistence(format!("event encoding failed: {e}")))?;
            outbox.push(OutboxEvent::new(order.id, EVENT_ORDER_CREATED, payload));
        }

        self.repo
            .create_order_family(parent.clone(), children.clone(), outbox)
            .await
            .map_err(|e| OrderError::Persistence(e.to_string()))?;

        Ok(ZoneOrderReceipt { parent, children })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{MemoryCatalog, ResolvedItem};
    use crate::directory::{MemoryDirectory, ShopStatus};
    use crate::store::MemoryOrderStore;
    use crate::tracking::MemorySnapshotCache;
    use std::time::Duration;

    struct World {
        splitter: OrderSplitter,
        store: MemoryOrderStore,
        directory: Arc<MemoryDirectory>,
        catalog: Arc<MemoryCatalog>,
        zone_id: Uuid,
        shop_x: Uuid,
        shop_y: Uuid,
    }

    fn world() -> World {
        let store = MemoryOrderStore::new();
        let catalog = Arc::new(MemoryCatalog::new());
        let directory = Arc::new(MemoryDirectory::new());
        let metrics = Arc::new(Metrics::new().unwrap());
        let tracking = Arc::new(TrackingService::new(
            Arc::new(store.clone()),
            Arc::new(MemorySnapshotCache::new()),
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
            "laksa",
            ResolvedItem {
                shop_id: shop_x,
                name: "Curry Laksa".to_string(),
                available: true,
                unit_price: 780,
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
            catalog.clone(),
            directory.clone(),
            tracking,
            PricingRates::default(),
            metrics,
        );

        World {
            splitter,
            store,
            directory,
            catalog,
            zone_id,
            shop_x,
            shop_y,
        }
    }

    fn line(item: &str, quantity: u32) -> CartLine {
        CartLine {
            item: item.to_string(),
            quantity,
            modifiers: vec![],
        }
    }

    fn request(world: &World, lines: Vec<CartLine>) -> ZoneOrderRequest {
        ZoneOrderRequest {
            zone_id: world.zone_id,
            table_label: Some("T7".to_string()),
            customer: Customer {
                name: "Mei Lin".to_string(),
                phone: "+6591234567".to_string(),
            },
            items: lines,
            payment_method: PaymentMethod::Card,
        }
    }

    fn item_multiset(items: &[OrderItem]) -> Vec<(String, u32, i64)> {
        let mut set: Vec<(String, u32, i64)> = items
            .iter()
            .map(|i| (i.catalog_ref.clone(), i.quantity, i.unit_price))
            .collect();
        set.sort();
        set
    }

    #[tokio::test]
    async fn test_two_shops_yield_one_parent_two_children() {
        let w = world();
        let receipt = w
            .splitter
            .create_zone_order(request(&w, vec![line("satay", 2), line("laksa", 1), line("kopi", 1)]))
            .await
            .unwrap();

        assert_eq!(receipt.children.len(), 2);
        let parent = &receipt.parent;
        assert_eq!(parent.shop_summary.unwrap().total_shops, 2);
        assert_eq!(
            parent.child_order_ids,
            receipt.children.iter().map(|c| c.id).collect::<Vec<_>>()
        );

        // Baskets keep first-appearance order: shop X first, then shop Y.
        assert_eq!(receipt.children[0].shop_id, Some(w.shop_x));
        assert_eq!(receipt.children[1].shop_id, Some(w.shop_y));
        assert_eq!(receipt.children[0].trace.sequence, 1);
        assert_eq!(receipt.children[1].trace.sequence, 2);

        // Child numbers derive from the shared trace code.
        let trace = &parent.trace.trace_code;
        assert_eq!(parent.order_number, format!("ORD-{trace}"));
        assert_eq!(receipt.children[0].order_number, format!("ORD-{trace}-S01"));

        // Every child points back at the parent.
        assert!(receipt
            .children
            .iter()
            .all(|c| c.parent_order_id == Some(parent.id)));

        // 3 documents + 3 created-events in the outbox, atomically.
        assert_eq!(w.store.order_count(), 3);
        assert_eq!(w.store.outbox_rows().len(), 3);
    }

    #[tokio::test]
    async fn test_items_partition_exactly() {
        let w = world();
        let receipt = w
            .splitter
            .create_zone_order(request(&w, vec![line("satay", 2), line("kopi", 3), line("laksa", 1)]))
            .await
            .unwrap();

        let child_items: Vec<OrderItem> = receipt
            .children
            .iter()
            .flat_map(|c| c.items.iter().cloned())
            .collect();
        assert_eq!(
            item_multiset(&receipt.parent.items),
            item_multiset(&child_items)
        );
    }

    #[tokio::test]
    async fn test_child_totals_sum_to_parent_total() {
        let w = world();
        let receipt = w
            .splitter
            .create_zone_order(request(&w, vec![line("satay", 3), line("laksa", 2), line("kopi", 7)]))
            .await
            .unwrap();

        let parent = &receipt.parent.pricing;
        assert_eq!(
            parent.subtotal,
            3 * 850 + 2 * 780 + 7 * 180,
        );
        assert_eq!(parent.total, parent.subtotal + parent.tax + parent.service_fee);
        assert_eq!(
            receipt.children.iter().map(|c| c.pricing.total).sum::<i64>(),
            parent.total
        );
    }

    #[tokio::test]
    async fn test_closed_or_unknown_zone_rejected_before_any_write() {
        let w = world();
        let err = w
            .splitter
            .create_zone_order(ZoneOrderRequest {
                zone_id: Uuid::new_v4(),
                ..request(&w, vec![line("satay", 1)])
            })
            .await
            .unwrap_err();
        assert_eq!(err.code(), "ZONE_UNAVAILABLE");

        w.directory
            .add_zone(w.zone_id, crate::directory::ZoneStatus::Closed);
        let err = w
            .splitter
            .create_zone_order(request(&w, vec![line("satay", 1)]))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "ZONE_UNAVAILABLE");
        assert_eq!(w.store.order_count(), 0);
    }

    #[tokio::test]
    async fn test_one_bad_item_fails_the_whole_cart() {
        let w = world();
        w.catalog.mark_unavailable("laksa");

        let err = w
            .splitter
            .create_zone_order(request(&w, vec![line("satay", 1), line("laksa", 1), line("kopi", 1)]))
            .await
            .unwrap_err();

        match err {
            OrderError::ItemUnavailable { item, .. } => assert_eq!(item, "laksa"),
            other => panic!("expected ItemUnavailable, got {other:?}"),
        }
        // Partial acceptance is disallowed: nothing persisted.
        assert_eq!(w.store.order_count(), 0);
        assert!(w.store.outbox_rows().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_item_fails_the_whole_cart() {
        let w = world();
        let err = w
            .splitter
            .create_zone_order(request(&w, vec![line("satay", 1), line("durian-shake", 1)]))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "ITEM_UNAVAILABLE");
        assert_eq!(w.store.order_count(), 0);
    }

    #[tokio::test]
    async fn test_zero_eligible_shops_boundary() {
        let w = world();
        w.directory.set_shop_status(w.shop_x, ShopStatus::Inactive);
        w.directory.set_shop_status(w.shop_y, ShopStatus::Inactive);

        let err = w
            .splitter
            .create_zone_order(request(&w, vec![line("satay", 1), line("kopi", 1)]))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "NO_ELIGIBLE_SHOPS");
        assert_eq!(w.store.order_count(), 0);
    }

    #[tokio::test]
    async fn test_all_lines_ineligible_reads_as_no_eligible_shops() {
        let w = world();
        w.directory.set_shop_status(w.shop_x, ShopStatus::Inactive);

        // Shop Y is still active, but every submitted line belongs to X.
        let err = w
            .splitter
            .create_zone_order(request(&w, vec![line("satay", 1), line("laksa", 2)]))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "NO_ELIGIBLE_SHOPS");
        assert_eq!(w.store.order_count(), 0);
    }

    #[tokio::test]
    async fn test_empty_cart_and_zero_quantity() {
        let w = world();
        let err = w
            .splitter
            .create_zone_order(request(&w, vec![]))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "EMPTY_CART");

        let err = w
            .splitter
            .create_zone_order(request(&w, vec![line("satay", 0)]))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "INVALID_QUANTITY");
    }

    #[tokio::test]
    async fn test_single_shop_cart_still_splits() {
        let w = world();
        let receipt = w
            .splitter
            .create_zone_order(request(&w, vec![line("satay", 1), line("laksa", 1)]))
            .await
            .unwrap();
        assert_eq!(receipt.children.len(), 1);
        assert_eq!(receipt.parent.shop_summary.unwrap().total_shops, 1);
        assert_eq!(receipt.children[0].pricing.total, receipt.parent.pricing.total);
    }
}
