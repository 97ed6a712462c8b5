use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use super::snapshot::TrackingSnapshot;

// ============================================================================
// Snapshot Cache
// ============================================================================
//
// Key-value backend for tracking snapshots. The cache is an optimization,
// never a source of truth: every method returns a Result and the service
// treats any error as a miss.
//
// ============================================================================

#[async_trait]
pub trait SnapshotCache: Send + Sync {
    async fn get(&self, key: &str) -> anyhow::Result<Option<TrackingSnapshot>>;

    async fn put(
        &self,
        key: &str,
        snapshot: &TrackingSnapshot,
        ttl: Duration,
    ) -> anyhow::Result<()>;

    async fn remove(&self, key: &str) -> anyhow::Result<()>;
}

const KEY_PREFIX: &str = "tracking:";

pub struct RedisSnapshotCache {
    conn: ConnectionManager,
}

impl RedisSnapshotCache {
    pub fn new(conn: ConnectionManager) -> Self {
        Self { conn }
    }

    pub async fn connect(url: &str) -> anyhow::Result<Self> {
        let client = redis::Client::open(url)?;
        Ok(Self::new(client.get_connection_manager().await?))
    }

    fn key(key: &str) -> String {
        format!("{KEY_PREFIX}{key}")
    }
}

#[async_trait]
impl SnapshotCache for RedisSnapshotCache {
    async fn get(&self, key: &str) -> anyhow::Result<Option<TrackingSnapshot>> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = conn.get(Self::key(key)).await?;
        match raw {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    async fn put(
        &self,
        key: &str,
        snapshot: &TrackingSnapshot,
        ttl: Duration,
    ) -> anyhow::Result<()> {
        let mut conn = self.conn.clone();
        let json = serde_json::to_string(snapshot)?;
        conn.set_ex::<_, _, ()>(Self::key(key), json, ttl.as_secs().max(1))
            .await?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> anyhow::Result<()> {
        let mut conn = self.conn.clone();
        conn.del::<_, ()>(Self::key(key)).await?;
        Ok(())
    }
}

/// In-memory TTL cache for tests and the demo binary.
#[derive(Clone, Default)]
pub struct MemorySnapshotCache {
    entries: Arc<Mutex<HashMap<String, CacheEntry>>>,
}

struct CacheEntry {
    expires_at: Instant,
    snapshot: TrackingSnapshot,
}

impl MemorySnapshotCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SnapshotCache for MemorySnapshotCache {
    async fn get(&self, key: &str) -> anyhow::Result<Option<TrackingSnapshot>> {
        let mut entries = self.entries.lock().expect("cache lock poisoned");
        match entries.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => Ok(Some(entry.snapshot.clone())),
            Some(_) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn put(
        &self,
        key: &str,
        snapshot: &TrackingSnapshot,
        ttl: Duration,
    ) -> anyhow::Result<()> {
        self.entries.lock().expect("cache lock poisoned").insert(
            key.to_string(),
            CacheEntry {
                expires_at: Instant::now() + ttl,
                snapshot: snapshot.clone(),
            },
        );
        Ok(())
    }

    async fn remove(&self, key: &str) -> anyhow::Result<()> {
        self.entries
            .lock()
            .expect("cache lock poisoned")
            .remove(key);
        Ok(())
    }
}
