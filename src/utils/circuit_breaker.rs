use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

// ============================================================================
// Circuit Breaker
// ============================================================================
//
// Guard-style breaker around an unreliable collaborator (the notification
// transport). Callers ask `try_acquire` before the call and report the
// outcome afterwards; the breaker never holds a lock across I/O.
//
// States: Closed (normal), Open (refusing calls until the cooldown passes),
// HalfOpen (letting probe calls through to test recovery).
//
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerState {
    Closed,
    Open,
    HalfOpen,
}

#[derive(Clone, Debug)]
pub struct BreakerConfig {
    /// Consecutive failures before the circuit opens.
    pub failure_threshold: u32,
    /// How long the circuit stays open before probing.
    pub cooldown: Duration,
    /// Probe successes required to close again.
    pub probe_successes: u32,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            cooldown: Duration::from_secs(30),
            probe_successes: 2,
        }
    }
}

#[derive(Clone)]
pub struct CircuitBreaker {
    core: Arc<Mutex<BreakerCore>>,
    config: BreakerConfig,
}

struct BreakerCore {
    state: BreakerState,
    consecutive_failures: u32,
    probe_hits: u32,
    opened_at: Option<Instant>,
}

impl CircuitBreaker {
    pub fn new(config: BreakerConfig) -> Self {
        Self {
            core: Arc::new(Mutex::new(BreakerCore {
                state: BreakerState::Closed,
                consecutive_failures: 0,
                probe_hits: 0,
                opened_at: None,
            })),
            config,
        }
    }

    /// Whether a call may proceed right now. An open circuit whose cooldown
    /// has elapsed moves to HalfOpen and admits the call as a probe.
    pub fn try_acquire(&self) -> bool {
        let mut core = self.core.lock().expect("breaker lock poisoned");
        match core.state {
            BreakerState::Closed | BreakerState::HalfOpen => true,
            BreakerState::Open => {
                let cooled = core
                    .opened_at
                    .is_some_and(|t| t.elapsed() >= self.config.cooldown);
                if cooled {
                    tracing::info!("circuit breaker half-open, probing");
                    core.state = BreakerState::HalfOpen;
                    core.probe_hits = 0;
                    true
                } else {
                    false
                }
            }
        }
    }

    pub fn record_success(&self) {
        let mut core = self.core.lock().expect("breaker lock poisoned");
        match core.state {
            BreakerState::Closed => core.consecutive_failures = 0,
            BreakerState::HalfOpen => {
                core.probe_hits += 1;
                if core.probe_hits >= self.config.probe_successes {
                    tracing::info!(probes = core.probe_hits, "circuit breaker closed");
                    core.state = BreakerState::Closed;
                    core.consecutive_failures = 0;
                    core.probe_hits = 0;
                    core.opened_at = None;
                }
            }
            BreakerState::Open => {}
        }
    }

    pub fn record_failure(&self) {
        let mut core = self.core.lock().expect("breaker lock poisoned");
        core.consecutive_failures += 1;
        match core.state {
            BreakerState::Closed => {
                if core.consecutive_failures >= self.config.failure_threshold {
                    tracing::warn!(
                        failures = core.consecutive_failures,
                        "circuit breaker opened"
                    );
                    core.state = BreakerState::Open;
                    core.opened_at = Some(Instant::now());
                }
            }
            BreakerState::HalfOpen => {
                tracing::warn!("probe failed, circuit breaker reopened");
                core.state = BreakerState::Open;
                core.probe_hits = 0;
                core.opened_at = Some(Instant::now());
            }
            BreakerState::Open => {
                core.opened_at = Some(Instant::now());
            }
        }
    }

    pub fn state(&self) -> BreakerState {
        self.core.lock().expect("breaker lock poisoned").state
    }
}
