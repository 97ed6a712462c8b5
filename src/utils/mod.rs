pub mod circuit_breaker;
pub mod retry;

pub use circuit_breaker::{BreakerConfig, BreakerState, CircuitBreaker};
pub use retry::{retry_if, BackoffSchedule};
