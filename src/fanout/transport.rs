use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::utils::{retry_if, BackoffSchedule, BreakerConfig, BreakerState, CircuitBreaker};

// ============================================================================
// Channel Transport
// ============================================================================
//
// The publish primitive over named channels. Best-effort: no ordering or
// delivery guarantee is required of any implementation.
//
// ============================================================================

#[async_trait]
pub trait ChannelTransport: Send + Sync {
    async fn publish(&self, channel: &str, payload: &str) -> anyhow::Result<()>;
}

/// Redis pub/sub transport, guarded by a circuit breaker so a dead broker
/// fails fast instead of stalling the dispatcher.
pub struct RedisTransport {
    conn: ConnectionManager,
    breaker: CircuitBreaker,
}

impl RedisTransport {
    pub async fn connect(url: &str) -> anyhow::Result<Self> {
        let client = redis::Client::open(url)?;
        let conn = retry_if(
            &BackoffSchedule::default(),
            |_attempt| {
                let client = client.clone();
                async move { client.get_connection_manager().await }
            },
            |_| true,
        )
        .await?;

        Ok(Self {
            conn,
            breaker: CircuitBreaker::new(BreakerConfig::default()),
        })
    }

    pub fn breaker_state(&self) -> BreakerState {
        self.breaker.state()
    }
}

#[async_trait]
impl ChannelTransport for RedisTransport {
    async fn publish(&self, channel: &str, payload: &str) -> anyhow::Result<()> {
        if !self.breaker.try_acquire() {
            anyhow::bail!("notification transport circuit open");
        }

        let mut conn = self.conn.clone();
        match conn.publish::<_, _, ()>(channel, payload).await {
            Ok(()) => {
                self.breaker.record_success();
                Ok(())
            }
            Err(e) => {
                self.breaker.record_failure();
                Err(e.into())
            }
        }
    }
}

/// In-memory transport for tests and the demo binary. Records everything it
/// publishes; can be switched into a failing mode.
#[derive(Clone, Default)]
pub struct MemoryTransport {
    messages: Arc<Mutex<Vec<(String, String)>>>,
    failing: Arc<AtomicBool>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn published(&self) -> Vec<(String, String)> {
        self.messages
            .lock()
            .expect("transport lock poisoned")
            .clone()
    }

    pub fn channels(&self) -> Vec<String> {
        self.published().into_iter().map(|(c, _)| c).collect()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl ChannelTransport for MemoryTransport {
    async fn publish(&self, channel: &str, payload: &str) -> anyhow::Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            anyhow::bail!("transport unavailable");
        }
        self.messages
            .lock()
            .expect("transport lock poisoned")
            .push((channel.to_string(), payload.to_string()));
        Ok(())
    }
}
