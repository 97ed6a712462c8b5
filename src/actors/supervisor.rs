use actix::prelude::*;
use std::sync::Arc;

use crate::fanout::{NotificationFanout, RedisTransport};
use crate::metrics::Metrics;
use crate::store::OrderRepository;

use super::dispatcher::{DispatcherConfig, OutboxDispatcher};
use super::health::{HealthMonitorActor, HealthStatus, UpdateHealth};

// ============================================================================
// Supervisor Actor
// ============================================================================
//
// Owns the lifecycle of the infrastructure actors:
//
//   SupervisorActor
//   ├── OutboxDispatcher
//   └── HealthMonitorActor
//
// Domain services (splitter, coordinator, tracking) are plain async structs;
// actors are reserved for background infrastructure concerns.
//
// ============================================================================

pub struct SupervisorActor {
    repo: Arc<dyn OrderRepository>,
    fanout: Arc<NotificationFanout>,
    transport: Option<Arc<RedisTransport>>,
    metrics: Arc<Metrics>,
    dispatcher_config: DispatcherConfig,
    dispatcher: Option<Addr<OutboxDispatcher>>,
    health: Option<Addr<HealthMonitorActor>>,
}

impl SupervisorActor {
    pub fn new(
        repo: Arc<dyn OrderRepository>,
        fanout: Arc<NotificationFanout>,
        transport: Option<Arc<RedisTransport>>,
        metrics: Arc<Metrics>,
        dispatcher_config: DispatcherConfig,
    ) -> Self {
        Self {
            repo,
            fanout,
            transport,
            metrics,
            dispatcher_config,
            dispatcher: None,
            health: None,
        }
    }

    fn start_children(&mut self) {
        tracing::info!("starting supervised infrastructure actors");

        let health = HealthMonitorActor::new(self.transport.clone()).start();
        self.health = Some(health.clone());

        let dispatcher = OutboxDispatcher::new(
            self.repo.clone(),
            self.fanout.clone(),
            self.metrics.clone(),
            self.dispatcher_config.clone(),
        )
        .start();
        self.dispatcher = Some(dispatcher);

        health.do_send(UpdateHealth {
            component: "outbox_dispatcher".to_string(),
            status: HealthStatus::Healthy,
            details: Some("dispatcher started".to_string()),
        });

        tracing::info!("✅ supervised actors started");
    }
}

impl Actor for SupervisorActor {
    type Context = Context<Self>;

    fn started(&mut self, _ctx: &mut Self::Context) {
        tracing::info!("🎯 SupervisorActor started");
        self.start_children();
    }

    fn stopping(&mut self, _: &mut Self::Context) -> Running {
        tracing::info!("🛑 SupervisorActor stopping");
        Running::Stop
    }

    fn stopped(&mut self, _: &mut Self::Context) {
        tracing::info!("🛑 SupervisorActor stopped");
    }
}

// ============================================================================
// Messages
// ============================================================================

#[derive(Message)]
#[rtype(result = "()")]
pub struct Shutdown;

impl Handler<Shutdown> for SupervisorActor {
    type Result = ();

    fn handle(&mut self, _msg: Shutdown, ctx: &mut Self::Context) {
        tracing::info!("received shutdown signal");

        if let Some(dispatcher) = &self.dispatcher {
            dispatcher.do_send(StopActor);
        }
        if let Some(health) = &self.health {
            health.do_send(StopActor);
        }
        ctx.stop();
    }
}

/// Message to gracefully stop an actor
#[derive(Message)]
#[rtype(result = "()")]
struct StopActor;

impl Handler<StopActor> for OutboxDispatcher {
    type Result = ();

    fn handle(&mut self, _: StopActor, ctx: &mut Self::Context) {
        tracing::info!("OutboxDispatcher received stop signal");
        ctx.stop();
    }
}

impl Handler<StopActor> for HealthMonitorActor {
    type Result = ();

    fn handle(&mut self, _: StopActor, ctx: &mut Self::Context) {
        tracing::info!("HealthMonitorActor received stop signal");
        ctx.stop();
    }
}

// ============================================================================
// Public API for accessing child actors
// ============================================================================

#[derive(Message)]
#[rtype(result = "Option<Addr<HealthMonitorActor>>")]
pub struct GetHealthMonitor;

impl Handler<GetHealthMonitor> for SupervisorActor {
    type Result = Option<Addr<HealthMonitorActor>>;

    fn handle(&mut self, _: GetHealthMonitor, _: &mut Self::Context) -> Self::Result {
        self.health.clone()
    }
}
