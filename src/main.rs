use actix::Actor;
use std::sync::Arc;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use uuid::Uuid;

use zone_orders::actors::{Shutdown, SupervisorActor};
use zone_orders::catalog::{MemoryCatalog, ResolvedItem};
use zone_orders::config::AppConfig;
use zone_orders::coordinator::StatusCoordinator;
use zone_orders::directory::{MemoryDirectory, ShopStatus, ZoneStatus};
use zone_orders::domain::order::{Customer, OrderStatus, PaymentMethod};
use zone_orders::fanout::{NotificationFanout, RedisTransport};
use zone_orders::metrics::{start_metrics_server, Metrics};
use zone_orders::splitter::{CartLine, OrderSplitter, ZoneOrderRequest};
use zone_orders::store::{OrderRepository, PgOrderStore};
use zone_orders::tracking::{RedisSnapshotCache, TrackingService};

#[actix::main]
async fn main() -> anyhow::Result<()> {
    // Initialize structured logging with environment-based filtering
    // Default to INFO level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(true))
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,zone_orders=debug")),
        )
        .init();

    tracing::info!("🚀 Starting zone order engine");

    let config = AppConfig::from_env();

    // === 1. Persistence ===
    tracing::info!("Connecting to Postgres...");
    let store = PgOrderStore::connect(&config.database_url, config.statement_timeout_ms).await?;
    store.migrate().await?;
    let repo: Arc<dyn OrderRepository> = Arc::new(store);

    // === 2. Redis: tracking cache + notification transport ===
    tracing::info!("Connecting to Redis...");
    let transport = Arc::new(RedisTransport::connect(&config.redis_url).await?);
    let cache = Arc::new(RedisSnapshotCache::connect(&config.redis_url).await?);

    // === 3. Metrics ===
    let metrics = Arc::new(Metrics::new()?);
    let registry = Arc::new(metrics.registry().clone());
    let metrics_port = config.metrics_port;
    std::thread::spawn(move || {
        let rt = tokio::runtime::Runtime::new().expect("metrics runtime");
        rt.block_on(async {
            if let Err(e) = start_metrics_server(registry, metrics_port).await {
                tracing::error!("Metrics server error: {}", e);
            }
        });
    });

    // === 4. Services ===
    let tracking = Arc::new(TrackingService::new(
        repo.clone(),
        cache,
        config.cache_ttl,
        metrics.clone(),
    ));
    let fanout = Arc::new(NotificationFanout::new(transport.clone(), metrics.clone()));

    // Demo collaborators: a seeded in-memory food court. Real deployments
    // wire the platform's catalog and directory services here.
    let (catalog, directory, zone_id) = demo_food_court();

    let splitter = OrderSplitter::new(
        repo.clone(),
        catalog,
        directory,
        tracking.clone(),
        config.pricing_rates(),
        metrics.clone(),
    );
    let coordinator = StatusCoordinator::new(repo.clone(), tracking.clone(), metrics.clone());

    // === 5. Infrastructure actors ===
    let supervisor = SupervisorActor::new(
        repo.clone(),
        fanout,
        Some(transport),
        metrics.clone(),
        config.dispatcher_config(),
    )
    .start();

    // === 6. Demonstrate a zone order lifecycle ===
    tracing::info!("📝 Splitting a two-shop zone cart");

    let receipt = splitter
        .create_zone_order(ZoneOrderRequest {
            zone_id,
            table_label: Some("T7".to_string()),
            customer: Customer {
                name: "Mei Lin".to_string(),
                phone: "+6591234567".to_string(),
            },
            items: vec![
                CartLine {
                    item: "satay".to_string(),
                    quantity: 2,
                    modifiers: vec!["extra peanut sauce".to_string()],
                },
                CartLine {
                    item: "laksa".to_string(),
                    quantity: 1,
                    modifiers: vec![],
                },
                CartLine {
                    item: "kopi".to_string(),
                    quantity: 2,
                    modifiers: vec!["less sugar".to_string()],
                },
            ],
            payment_method: PaymentMethod::Card,
        })
        .await?;

    tracing::info!(
        parent = %receipt.parent.order_number,
        children = receipt.children.len(),
        total = receipt.parent.pricing.total,
        "✅ Zone order created"
    );

    // Each shop progresses independently; the parent status follows.
    for status in [
        OrderStatus::Preparing,
        OrderStatus::Ready,
        OrderStatus::Completed,
    ] {
        for child in &receipt.children {
            let outcome = coordinator
                .update_child_status(child.id, status, "shop-counter", None)
                .await?;
            tracing::info!(
                child = %outcome.child.order_number,
                status = %outcome.child.status,
                parent_changed = outcome.parent_changed,
                "shop order advanced"
            );
        }
        tokio::time::sleep(std::time::Duration::from_secs(1)).await;
    }

    let snapshot = tracking
        .get_tracking(&receipt.parent.order_number, None)
        .await?;
    tracing::info!(
        order = %snapshot.order_number,
        status = %snapshot.status,
        percent_settled = snapshot.progress.percent_settled,
        timeline_events = snapshot.timeline.len(),
        "📦 Tracking snapshot"
    );

    // Let the dispatcher drain the remaining outbox rows.
    tracing::info!("⏳ Waiting for outbox dispatcher...");
    tokio::time::sleep(std::time::Duration::from_secs(5)).await;

    let _ = supervisor.send(Shutdown).await;
    tracing::info!("🎉 Demo complete!");

    Ok(())
}

/// A small seeded venue: one zone, two active shops, three menu items.
fn demo_food_court() -> (Arc<MemoryCatalog>, Arc<MemoryDirectory>, Uuid) {
    let catalog = Arc::new(MemoryCatalog::new());
    let directory = Arc::new(MemoryDirectory::new());

    let zone_id = Uuid::new_v4();
    let wok_station = Uuid::new_v4();
    let kopi_corner = Uuid::new_v4();

    directory.add_zone(zone_id, ZoneStatus::Open);
    directory.add_shop(zone_id, wok_station, "Wok Station", ShopStatus::Active);
    directory.add_shop(zone_id, kopi_corner, "Kopi Corner", ShopStatus::Active);

    catalog.insert(
        "satay",
        ResolvedItem {
            shop_id: wok_station,
            name: "Chicken Satay".to_string(),
            available: true,
            unit_price: 850,
        },
    );
    catalog.insert(
        "laksa",
        ResolvedItem {
            shop_id: wok_station,
            name: "Curry Laksa".to_string(),
            available: true,
            unit_price: 780,
        },
    );
    catalog.insert(
        "kopi",
        ResolvedItem {
            shop_id: kopi_corner,
            name: "Kopi O".to_string(),
            available: true,
            unit_price: 180,
        },
    );

    (catalog, directory, zone_id)
}
