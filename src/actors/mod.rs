// ============================================================================
// Actors Module
// ============================================================================
//
// Actor-based infrastructure for background, asynchronous concerns.
//
// Structure:
// - dispatcher  - drains the transactional outbox into the fan-out
// - health      - component health registry + transport probe
// - supervisor  - starts and stops the infrastructure actors
//
// Note: domain logic (splitting, status coordination, tracking) lives in
// plain async services, NOT actors. Actors are reserved for infrastructure
// concerns only.
//
// ============================================================================

mod dispatcher;
mod health;
mod supervisor;

pub use dispatcher::{drain_outbox_once, DispatcherConfig, DrainStats, OutboxDispatcher};
pub use health::{
    overall_status, ComponentHealth, GetSystemHealth, HealthMonitorActor, HealthStatus,
    SystemHealth, UpdateHealth,
};
pub use supervisor::{GetHealthMonitor, Shutdown, SupervisorActor};
