// Private module declaration
mod server;

use prometheus::{Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry};

// Re-export for public API
pub use server::start_metrics_server;

// ============================================================================
// Metrics - Prometheus instrumentation
// ============================================================================
//
// Covers the order pipeline end to end:
// - creation (orders by type, children per zone split)
// - status transitions (accepted, rejected, version conflicts)
// - tracking cache behavior (hits, misses, backend fallbacks)
// - outbox and fan-out outcomes
//
// All metrics register with one Registry, scraped via /metrics.
// ============================================================================

pub struct Metrics {
    registry: Registry,

    // Creation
    pub orders_created: IntCounterVec,
    pub zone_split_children: Histogram,
    pub creation_rejections: IntCounterVec,

    // Status pipeline
    pub status_transitions: IntCounterVec,
    pub transition_rejections: IntCounterVec,
    pub version_conflicts: IntCounterVec,

    // Tracking cache
    pub cache_hits: IntCounter,
    pub cache_misses: IntCounter,
    pub cache_fallbacks: IntCounter,

    // Outbox + fan-out
    pub outbox_dispatched: IntCounter,
    pub outbox_failed: IntCounter,
    pub outbox_dead: IntCounter,
    pub fanout_published: IntCounterVec,
    pub fanout_failures: IntCounterVec,
}

impl Metrics {
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let orders_created = IntCounterVec::new(
            Opts::new("orders_created_total", "Orders persisted, by order type"),
            &["order_type"],
        )?;
        registry.register(Box::new(orders_created.clone()))?;

        let zone_split_children = Histogram::with_opts(
            HistogramOpts::new(
                "zone_split_children",
                "Shop orders produced per zone cart split",
            )
            .buckets(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 8.0, 10.0]),
        )?;
        registry.register(Box::new(zone_split_children.clone()))?;

        let creation_rejections = IntCounterVec::new(
            Opts::new(
                "order_creation_rejections_total",
                "Zone cart submissions rejected before any write",
            ),
            &["code"],
        )?;
        registry.register(Box::new(creation_rejections.clone()))?;

        let status_transitions = IntCounterVec::new(
            Opts::new(
                "order_status_transitions_total",
                "Committed status transitions",
            ),
            &["from", "to"],
        )?;
        registry.register(Box::new(status_transitions.clone()))?;

        let transition_rejections = IntCounterVec::new(
            Opts::new(
                "order_transition_rejections_total",
                "Status transitions rejected by the state machine",
            ),
            &["code"],
        )?;
        registry.register(Box::new(transition_rejections.clone()))?;

        let version_conflicts = IntCounterVec::new(
            Opts::new(
                "order_version_conflicts_total",
                "Optimistic concurrency conflicts, by document role",
            ),
            &["role"],
        )?;
        registry.register(Box::new(version_conflicts.clone()))?;

        let cache_hits = IntCounter::new("tracking_cache_hits_total", "Tracking cache hits")?;
        registry.register(Box::new(cache_hits.clone()))?;

        let cache_misses = IntCounter::new("tracking_cache_misses_total", "Tracking cache misses")?;
        registry.register(Box::new(cache_misses.clone()))?;

        let cache_fallbacks = IntCounter::new(
            "tracking_cache_fallbacks_total",
            "Reads served from the repository because the cache backend errored",
        )?;
        registry.register(Box::new(cache_fallbacks.clone()))?;

        let outbox_dispatched = IntCounter::new(
            "outbox_dispatched_total",
            "Outbox events successfully published",
        )?;
        registry.register(Box::new(outbox_dispatched.clone()))?;

        let outbox_failed = IntCounter::new(
            "outbox_failed_total",
            "Outbox publish attempts that failed and will be retried",
        )?;
        registry.register(Box::new(outbox_failed.clone()))?;

        let outbox_dead =
            IntCounter::new("outbox_dead_total", "Outbox events dead-lettered in place")?;
        registry.register(Box::new(outbox_dead.clone()))?;

        let fanout_published = IntCounterVec::new(
            Opts::new(
                "fanout_published_total",
                "Channel publishes, by channel kind",
            ),
            &["channel"],
        )?;
        registry.register(Box::new(fanout_published.clone()))?;

        let fanout_failures = IntCounterVec::new(
            Opts::new(
                "fanout_failures_total",
                "Channel publish failures, by channel kind",
            ),
            &["channel"],
        )?;
        registry.register(Box::new(fanout_failures.clone()))?;

        Ok(Self {
            registry,
            orders_created,
            zone_split_children,
            creation_rejections,
            status_transitions,
            transition_rejections,
            version_conflicts,
            cache_hits,
            cache_misses,
            cache_fallbacks,
            outbox_dispatched,
            outbox_failed,
            outbox_dead,
            fanout_published,
            fanout_failures,
        })
    }

    /// Get the Prometheus registry for exposing metrics via HTTP
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn record_zone_split(&self, child_count: usize) {
        self.orders_created.with_label_values(&["zone_main"]).inc();
        self.orders_created
            .with_label_values(&["zone_shop"])
            .inc_by(child_count as u64);
        self.zone_split_children.observe(child_count as f64);
    }

    pub fn record_transition(&self, from: &str, to: &str) {
        self.status_transitions.with_label_values(&[from, to]).inc();
    }

    pub fn record_rejection(&self, code: &str) {
        self.transition_rejections.with_label_values(&[code]).inc();
    }

    pub fn record_version_conflict(&self, role: &str) {
        self.version_conflicts.with_label_values(&[role]).inc();
    }

    pub fn record_fanout(&self, channel_kind: &str, ok: bool) {
        if ok {
            self.fanout_published
                .with_label_values(&[channel_kind])
                .inc();
        } else {
            self.fanout_failures
                .with_label_values(&[channel_kind])
                .inc();
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new().expect("Failed to create metrics")
    }
}
