//! Snapshot store: idempotent key→blob persistence keyed by room id.
//!
//! The store is the source of truth across process restarts. The contract is
//! deliberately small — single-key atomic replace, point read, delete, and an
//! enumeration of live keys — not a general repository layer. It is exposed
//! as an `#[async_trait]` trait object so the actor and registry take any
//! backend by injection: the Postgres implementation backs production, the
//! in-memory one backs tests and ephemeral single-process deployments.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use sqlx::{PgPool, Row};
use thiserror::Error;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Atomically replace the blob stored under `room_id`.
    async fn save(&self, room_id: &str, snapshot: &[u8]) -> StoreResult<()>;

    /// Latest saved blob, or None if the room was never saved or deleted.
    async fn load(&self, room_id: &str) -> StoreResult<Option<Vec<u8>>>;

    async fn delete(&self, room_id: &str) -> StoreResult<()>;

    /// Ids of every persisted room.
    async fn list_active(&self) -> StoreResult<Vec<String>>;
}

/// Postgres-backed store: one row per room, upserted on save.
pub struct PgSnapshotStore {
    pool: PgPool,
}

impl PgSnapshotStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SnapshotStore for PgSnapshotStore {
    async fn save(&self, room_id: &str, snapshot: &[u8]) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO room_snapshots (room_id, snapshot, updated_at)
             VALUES ($1, $2, now())
             ON CONFLICT (room_id)
             DO UPDATE SET snapshot = EXCLUDED.snapshot, updated_at = now()",
        )
        .bind(room_id)
        .bind(snapshot)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn load(&self, room_id: &str) -> StoreResult<Option<Vec<u8>>> {
        let row = sqlx::query("SELECT snapshot FROM room_snapshots WHERE room_id = $1")
            .bind(room_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| r.get("snapshot")))
    }

    async fn delete(&self, room_id: &str) -> StoreResult<()> {
        sqlx::query("DELETE FROM room_snapshots WHERE room_id = $1")
            .bind(room_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn list_active(&self) -> StoreResult<Vec<String>> {
        let rows = sqlx::query("SELECT room_id FROM room_snapshots")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(|r| r.get("room_id")).collect())
    }
}

/// In-memory store for tests and single-process ephemeral use.
#[derive(Default)]
pub struct MemorySnapshotStore {
    blobs: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SnapshotStore for MemorySnapshotStore {
    async fn save(&self, room_id: &str, snapshot: &[u8]) -> StoreResult<()> {
        self.blobs
            .lock()
            .expect("snapshot map poisoned")
            .insert(room_id.to_string(), snapshot.to_vec());
        Ok(())
    }

    async fn load(&self, room_id: &str) -> StoreResult<Option<Vec<u8>>> {
        Ok(self
            .blobs
            .lock()
            .expect("snapshot map poisoned")
            .get(room_id)
            .cloned())
    }

    async fn delete(&self, room_id: &str) -> StoreResult<()> {
        self.blobs
            .lock()
            .expect("snapshot map poisoned")
            .remove(room_id);
        Ok(())
    }

    async fn list_active(&self) -> StoreResult<Vec<String>> {
        let mut ids: Vec<String> = self
            .blobs
            .lock()
            .expect("snapshot map poisoned")
            .keys()
            .cloned()
            .collect();
        ids.sort();
        Ok(ids)
    }
}
