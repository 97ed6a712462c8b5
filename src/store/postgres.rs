use async_trait::async_trait;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, Row, Transaction};
use uuid::Uuid;

use crate::domain::order::Order;

use super::outbox::OutboxEvent;
use super::repository::{OrderRepository, StatusCommit, StoreError};

// ============================================================================
// Postgres Order Store
// ============================================================================
//
// The full document lives in a JSONB column; the hot query fields
// (order_number, parent_order_id, status, version) are lifted into columns.
// Every mutating method runs inside one transaction with a bounded statement
// timeout, so an abort leaves no partial family and no stray outbox row.
// Version preconditions ride on `WHERE id = $n AND version = $m`.
//
// ============================================================================

pub struct PgOrderStore {
    pool: PgPool,
    statement_timeout_ms: u64,
}

const SCHEMA: &str = r"
CREATE TABLE IF NOT EXISTS orders (
    id              UUID PRIMARY KEY,
    order_number    TEXT NOT NULL UNIQUE,
    order_type      TEXT NOT NULL,
    parent_order_id UUID,
    zone_id         UUID NOT NULL,
    shop_id         UUID,
    status          TEXT NOT NULL,
    version         BIGINT NOT NULL,
    doc             JSONB NOT NULL,
    created_at      TIMESTAMPTZ NOT NULL,
    updated_at      TIMESTAMPTZ NOT NULL
);
CREATE INDEX IF NOT EXISTS orders_parent_idx ON orders (parent_order_id);

CREATE TABLE IF NOT EXISTS outbox_events (
    id            UUID PRIMARY KEY,
    order_id      UUID NOT NULL,
    event_type    TEXT NOT NULL,
    payload       TEXT NOT NULL,
    created_at    TIMESTAMPTZ NOT NULL,
    attempts      INT NOT NULL DEFAULT 0,
    dispatched_at TIMESTAMPTZ,
    dead          BOOLEAN NOT NULL DEFAULT FALSE
);
CREATE INDEX IF NOT EXISTS outbox_pending_idx
    ON outbox_events (created_at) WHERE dispatched_at IS NULL AND NOT dead;
";

impl PgOrderStore {
    pub async fn connect(url: &str, statement_timeout_ms: u64) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(url)
            .await
            .map_err(backend)?;
        Ok(Self {
            pool,
            statement_timeout_ms,
        })
    }

    /// Apply the schema. Idempotent.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        for statement in SCHEMA.split(';').filter(|s| !s.trim().is_empty()) {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(backend)?;
        }
        Ok(())
    }

    async fn begin(&self) -> Result<Transaction<'static, Postgres>, StoreError> {
        let mut tx = self.pool.begin().await.map_err(backend)?;
        sqlx::query(&format!(
            "SET LOCAL statement_timeout = {}",
            self.statement_timeout_ms
        ))
        .execute(&mut *tx)
        .await
        .map_err(backend)?;
        Ok(tx)
    }
}

fn backend(e: sqlx::Error) -> StoreError {
    StoreError::Backend(e.to_string())
}

fn map_insert_err(e: sqlx::Error, order_number: &str) -> StoreError {
    if let sqlx::Error::Database(db) = &e {
        // 23505 = unique_violation
        if db.code().as_deref() == Some("23505") {
            return StoreError::DuplicateOrderNumber(order_number.to_string());
        }
    }
    backend(e)
}

fn order_from_row(row: &PgRow) -> Result<Order, StoreError> {
    let Json(order): Json<Order> = row.try_get("doc").map_err(backend)?;
    Ok(order)
}

async fn insert_order_tx(
    tx: &mut Transaction<'static, Postgres>,
    order: &Order,
) -> Result<(), StoreError> {
    sqlx::query(
        "INSERT INTO orders \
         (id, order_number, order_type, parent_order_id, zone_id, shop_id, \
          status, version, doc, created_at, updated_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
    )
    .bind(order.id)
    .bind(&order.order_number)
    .bind(order.order_type.as_str())
    .bind(order.parent_order_id)
    .bind(order.zone_id)
    .bind(order.shop_id)
    .bind(order.status.as_str())
    .bind(order.version)
    .bind(Json(order))
    .bind(order.created_at)
    .bind(order.updated_at)
    .execute(&mut **tx)
    .await
    .map_err(|e| map_insert_err(e, &order.order_number))?;
    Ok(())
}

async fn update_versioned_tx(
    tx: &mut Transaction<'static, Postgres>,
    order: &Order,
    expected_version: i64,
) -> Result<(), StoreError> {
    let mut updated = order.clone();
    updated.version = expected_version + 1;

    let result = sqlx::query(
        "UPDATE orders SET status = $1, version = $2, doc = $3, updated_at = $4 \
         WHERE id = $5 AND version = $6",
    )
    .bind(updated.status.as_str())
    .bind(updated.version)
    .bind(Json(&updated))
    .bind(updated.updated_at)
    .bind(updated.id)
    .bind(expected_version)
    .execute(&mut **tx)
    .await
    .map_err(backend)?;

    if result.rows_affected() == 0 {
        return Err(StoreError::VersionConflict { order_id: order.id });
    }
    Ok(())
}

async fn insert_outbox_tx(
    tx: &mut Transaction<'static, Postgres>,
    events: &[OutboxEvent],
) -> Result<(), StoreError> {
    for event in events {
        sqlx::query(
            "INSERT INTO outbox_events \
             (id, order_id, event_type, payload, created_at, attempts, dispatched_at, dead) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(event.id)
        .bind(event.order_id)
        .bind(&event.event_type)
        .bind(&event.payload)
        .bind(event.created_at)
        .bind(event.attempts)
        .bind(event.dispatched_at)
        .bind(event.dead)
        .execute(&mut **tx)
        .await
        .map_err(backend)?;
    }
    Ok(())
}

#[async_trait]
impl OrderRepository for PgOrderStore {
    async fn create_order_family(
        &self,
        parent: Order,
        children: Vec<Order>,
        outbox: Vec<OutboxEvent>,
    ) -> Result<(), StoreError> {
        let mut tx = self.begin().await?;
        insert_order_tx(&mut tx, &parent).await?;
        for child in &children {
            insert_order_tx(&mut tx, child).await?;
        }
        insert_outbox_tx(&mut tx, &outbox).await?;
        tx.commit().await.map_err(backend)?;

        tracing::info!(
            parent_order = %parent.order_number,
            child_count = children.len(),
            "order family committed"
        );
        Ok(())
    }

    async fn insert_order(&self, order: Order, outbox: Vec<OutboxEvent>) -> Result<(), StoreError> {
        let mut tx = self.begin().await?;
        insert_order_tx(&mut tx, &order).await?;
        insert_outbox_tx(&mut tx, &outbox).await?;
        tx.commit().await.map_err(backend)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Order>, StoreError> {
        let row = sqlx::query("SELECT doc FROM orders WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?;
        row.as_ref().map(order_from_row).transpose()
    }

    async fn find_by_number(&self, order_number: &str) -> Result<Option<Order>, StoreError> {
        let row = sqlx::query("SELECT doc FROM orders WHERE order_number = $1")
            .bind(order_number)
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?;
        row.as_ref().map(order_from_row).transpose()
    }

    async fn children_of(&self, parent_id: Uuid) -> Result<Vec<Order>, StoreError> {
        let rows = sqlx::query("SELECT doc FROM orders WHERE parent_order_id = $1")
            .bind(parent_id)
            .fetch_all(&self.pool)
            .await
            .map_err(backend)?;
        let mut children = rows
            .iter()
            .map(order_from_row)
            .collect::<Result<Vec<_>, _>>()?;
        children.sort_by_key(|c| c.trace.sequence);
        Ok(children)
    }

    async fn commit_status_change(
        &self,
        commit: StatusCommit,
        outbox: Vec<OutboxEvent>,
    ) -> Result<(), StoreError> {
        let mut tx = self.begin().await?;
        update_versioned_tx(&mut tx, &commit.child, commit.expected_child_version).await?;
        if let Some(parent_commit) = &commit.parent {
            update_versioned_tx(
                &mut tx,
                &parent_commit.parent,
                parent_commit.expected_parent_version,
            )
            .await?;
        }
        insert_outbox_tx(&mut tx, &outbox).await?;
        tx.commit().await.map_err(backend)
    }

    async fn undispatched_outbox(&self, limit: usize) -> Result<Vec<OutboxEvent>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, order_id, event_type, payload, created_at, attempts, dispatched_at, dead \
             FROM outbox_events \
             WHERE dispatched_at IS NULL AND NOT dead \
             ORDER BY created_at ASC \
             LIMIT $1",
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;

        rows.iter()
            .map(|row| {
                Ok(OutboxEvent {
                    id: row.try_get("id").map_err(backend)?,
                    order_id: row.try_get("order_id").map_err(backend)?,
                    event_type: row.try_get("event_type").map_err(backend)?,
                    payload: row.try_get("payload").map_err(backend)?,
                    created_at: row.try_get("created_at").map_err(backend)?,
                    attempts: row.try_get("attempts").map_err(backend)?,
                    dispatched_at: row.try_get("dispatched_at").map_err(backend)?,
                    dead: row.try_get("dead").map_err(backend)?,
                })
            })
            .collect()
    }

    async fn mark_outbox_dispatched(&self, id: Uuid) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE outbox_events SET dispatched_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(backend)?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn mark_outbox_failed(&self, id: Uuid, max_attempts: i32) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE outbox_events \
             SET attempts = attempts + 1, dead = attempts + 1 >= $2 \
             WHERE id = $1",
        )
        .bind(id)
        .bind(max_attempts)
        .execute(&self.pool)
        .await
        .map_err(backend)?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}

// ============================================================================
// Integration Test Notes
// ============================================================================
//
// The Postgres adapter is exercised end-to-end only against a real database:
// - create_order_family atomicity (abort mid-batch leaves zero rows)
// - version precondition aborts rolling back the sibling write
// - statement_timeout expiry leaving parent and child untouched
// - unique_violation mapping to DuplicateOrderNumber
//
// The shared repository semantics (preconditions, outbox bookkeeping,
// children ordering) are covered by the MemoryOrderStore tests, which
// implement the same contract.
//
// ============================================================================
