use actix::prelude::*;
use std::sync::Arc;
use std::time::Duration;

use crate::fanout::{NotificationFanout, OrderNotification};
use crate::metrics::Metrics;
use crate::store::OrderRepository;

// ============================================================================
// Outbox Dispatcher Actor
// ============================================================================
//
// Polls the outbox for undispatched rows and hands each one to the fan-out.
// A publish failure bumps the row's attempt counter and leaves it for the
// next poll; rows exceeding the attempt budget are dead-lettered in place.
// Order mutations never wait on this loop.
//
// ============================================================================

#[derive(Clone, Debug)]
pub struct DispatcherConfig {
    pub poll_interval: Duration,
    pub batch_size: usize,
    pub max_attempts: i32,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(2),
            batch_size: 32,
            max_attempts: 5,
        }
    }
}

pub struct OutboxDispatcher {
    repo: Arc<dyn OrderRepository>,
    fanout: Arc<NotificationFanout>,
    metrics: Arc<Metrics>,
    config: DispatcherConfig,
}

impl OutboxDispatcher {
    pub fn new(
        repo: Arc<dyn OrderRepository>,
        fanout: Arc<NotificationFanout>,
        metrics: Arc<Metrics>,
        config: DispatcherConfig,
    ) -> Self {
        Self {
            repo,
            fanout,
            metrics,
            config,
        }
    }
}

impl Actor for OutboxDispatcher {
    type Context = Context<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        tracing::info!(
            poll_interval_ms = self.config.poll_interval.as_millis() as u64,
            batch_size = self.config.batch_size,
            "OutboxDispatcher started"
        );

        ctx.run_interval(self.config.poll_interval, |act, _ctx| {
            let repo = act.repo.clone();
            let fanout = act.fanout.clone();
            let metrics = act.metrics.clone();
            let config = act.config.clone();

            actix::spawn(async move {
                if let Err(e) = drain_outbox_once(&repo, &fanout, &metrics, &config).await {
                    tracing::error!(error = %e, "outbox drain failed");
                }
            });
        });
    }
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct DrainStats {
    pub dispatched: usize,
    pub failed: usize,
}

/// One drain pass over the outbox. Free function so it can be exercised
/// without the actor runtime.
pub async fn drain_outbox_once(
    repo: &Arc<dyn OrderRepository>,
    fanout: &NotificationFanout,
    metrics: &Metrics,
    config: &DispatcherConfig,
) -> anyhow::Result<DrainStats> {
    let batch = repo.undispatched_outbox(config.batch_size).await?;
    let mut stats = DrainStats::default();

    for event in batch {
        let notification: OrderNotification = match serde_json::from_str(&event.payload) {
            Ok(n) => n,
            Err(e) => {
                // Undecodable payloads can never succeed; dead-letter at
                // once.
                tracing::error!(
                    event_id = %event.id,
                    event_type = %event.event_type,
                    error = %e,
                    "undecodable outbox payload, dead-lettering"
                );
                repo.mark_outbox_failed(event.id, 1).await?;
                metrics.outbox_dead.inc();
                stats.failed += 1;
                continue;
            }
        };

        match fanout.try_publish(&notification).await {
            Ok(()) => {
                repo.mark_outbox_dispatched(event.id).await?;
                metrics.outbox_dispatched.inc();
                stats.dispatched += 1;
            }
            Err(e) => {
                repo.mark_outbox_failed(event.id, config.max_attempts).await?;
                metrics.outbox_failed.inc();
                stats.failed += 1;
                if event.attempts + 1 >= config.max_attempts {
                    metrics.outbox_dead.inc();
                    tracing::error!(
                        event_id = %event.id,
                        order = %notification.order_number,
                        attempts = event.attempts + 1,
                        error = %e,
                        "outbox event dead-lettered"
                    );
                } else {
                    tracing::warn!(
                        event_id = %event.id,
                        order = %notification.order_number,
                        attempts = event.attempts + 1,
                        error = %e,
                        "outbox publish failed, will retry"
                    );
                }
            }
        }
    }

    if stats.dispatched > 0 {
        tracing::debug!(
            dispatched = stats.dispatched,
            failed = stats.failed,
            "outbox drain pass complete"
        );
    }
    Ok(stats)
}
