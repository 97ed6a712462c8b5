use actix::prelude::*;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;

use crate::fanout::RedisTransport;
use crate::utils::BreakerState;

// ============================================================================
// Health Monitor Actor
// ============================================================================
//
// Tracks per-component health and aggregates a system-wide view. The
// notification transport is probed periodically through its circuit breaker
// state; other components push their own updates.
//
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum HealthStatus {
    Healthy,
    Degraded(String),
    Unhealthy(String),
}

#[derive(Debug, Clone)]
pub struct ComponentHealth {
    pub name: String,
    pub status: HealthStatus,
    pub last_check: DateTime<Utc>,
    pub details: Option<String>,
}

#[derive(Message)]
#[rtype(result = "()")]
pub struct UpdateHealth {
    pub component: String,
    pub status: HealthStatus,
    pub details: Option<String>,
}

#[derive(Message)]
#[rtype(result = "SystemHealth")]
pub struct GetSystemHealth;

#[derive(Debug, Clone)]
pub struct SystemHealth {
    pub overall_status: HealthStatus,
    pub components: HashMap<String, ComponentHealth>,
    pub check_time: DateTime<Utc>,
}

/// Aggregate component healths: any unhealthy component makes the system
/// unhealthy, any degraded one degrades it.
pub fn overall_status(components: &HashMap<String, ComponentHealth>) -> HealthStatus {
    let mut degraded = false;
    let mut unhealthy: Vec<String> = Vec::new();

    for (name, health) in components {
        match &health.status {
            HealthStatus::Unhealthy(msg) => unhealthy.push(format!("{name}: {msg}")),
            HealthStatus::Degraded(_) => degraded = true,
            HealthStatus::Healthy => {}
        }
    }

    if !unhealthy.is_empty() {
        unhealthy.sort();
        HealthStatus::Unhealthy(unhealthy.join(", "))
    } else if degraded {
        HealthStatus::Degraded("some components degraded".to_string())
    } else {
        HealthStatus::Healthy
    }
}

fn transport_health(transport: &RedisTransport) -> HealthStatus {
    match transport.breaker_state() {
        BreakerState::Closed => HealthStatus::Healthy,
        BreakerState::HalfOpen => HealthStatus::Degraded("transport circuit half-open".to_string()),
        BreakerState::Open => HealthStatus::Unhealthy("transport circuit open".to_string()),
    }
}

pub struct HealthMonitorActor {
    components: HashMap<String, ComponentHealth>,
    transport: Option<Arc<RedisTransport>>,
}

impl HealthMonitorActor {
    pub fn new(transport: Option<Arc<RedisTransport>>) -> Self {
        Self {
            components: HashMap::new(),
            transport,
        }
    }

    fn apply_update(&mut self, update: UpdateHealth) {
        tracing::debug!(
            component = %update.component,
            status = ?update.status,
            "component health updated"
        );
        self.components.insert(
            update.component.clone(),
            ComponentHealth {
                name: update.component,
                status: update.status,
                last_check: Utc::now(),
                details: update.details,
            },
        );
    }
}

impl Actor for HealthMonitorActor {
    type Context = Context<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        tracing::info!("HealthMonitorActor started");

        ctx.run_interval(std::time::Duration::from_secs(10), |act, _ctx| {
            if let Some(transport) = &act.transport {
                let status = transport_health(transport);
                if status != HealthStatus::Healthy {
                    tracing::warn!(status = ?status, "notification transport degraded");
                }
                act.apply_update(UpdateHealth {
                    component: "notification_transport".to_string(),
                    status,
                    details: None,
                });
            }
        });
    }
}

impl Handler<UpdateHealth> for HealthMonitorActor {
    type Result = ();

    fn handle(&mut self, msg: UpdateHealth, _: &mut Self::Context) {
        self.apply_update(msg);
    }
}

impl Handler<GetSystemHealth> for HealthMonitorActor {
    type Result = MessageResult<GetSystemHealth>;

    fn handle(&mut self, _msg: GetSystemHealth, _: &mut Self::Context) -> Self::Result {
        MessageResult(SystemHealth {
            overall_status: overall_status(&self.components),
            components: self.components.clone(),
            check_time: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn component(name: &str, status: HealthStatus) -> (String, ComponentHealth) {
        (
            name.to_string(),
            ComponentHealth {
                name: name.to_string(),
                status,
                last_check: Utc::now(),
                details: None,
            },
        )
    }

    #[test]
    fn test_overall_status_aggregation() {
        let mut components = HashMap::new();
        assert_eq!(overall_status(&components), HealthStatus::Healthy);

        components.extend([component("dispatcher", HealthStatus::Healthy)]);
        assert_eq!(overall_status(&components), HealthStatus::Healthy);

        components.extend([component(
            "transport",
            HealthStatus::Degraded("half-open".to_string()),
        )]);
        assert!(matches!(
            overall_status(&components),
            HealthStatus::Degraded(_)
        ));

        components.extend([component(
            "store",
            HealthStatus::Unhealthy("down".to_string()),
        )]);
        match overall_status(&components) {
            HealthStatus::Unhealthy(msg) => assert!(msg.contains("store: down")),
            other => panic!("expected unhealthy, got {other:?}"),
        }
    }

    #[test]
    fn test_apply_update_replaces_component_entry() {
        let mut actor = HealthMonitorActor::new(None);
        actor.apply_update(UpdateHealth {
            component: "dispatcher".to_string(),
            status: HealthStatus::Healthy,
            details: None,
        });
        actor.apply_update(UpdateHealth {
            component: "dispatcher".to_string(),
            status: HealthStatus::Degraded("slow".to_string()),
            details: Some("poll lag".to_string()),
        });

        assert_eq!(actor.components.len(), 1);
        let entry = &actor.components["dispatcher"];
        assert!(matches!(entry.status, HealthStatus::Degraded(_)));
        assert_eq!(entry.details.as_deref(), Some("poll lag"));
    }
}
