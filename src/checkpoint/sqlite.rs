//! SQLite-backed checkpoint store.
//!
//! One row per (thread, version); the live state of a thread is the row
//! with the highest version. `put` allocates `max(version) + 1` inside a
//! transaction, which is what makes versions monotonic per thread. Writes
//! from different threads interleave freely; same-thread writers are
//! serialized by the caller, not here.

use std::path::PathBuf;

use async_trait::async_trait;
use serde_json::Value;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};

use crate::core::errors::PipelineError;

use super::{Checkpoint, CheckpointStore, Snapshot};

pub struct SqliteCheckpointStore {
    pool: SqlitePool,
}

impl SqliteCheckpointStore {
    pub async fn new(db_path: PathBuf) -> Result<Self, PipelineError> {
        let options = SqliteConnectOptions::new()
            .filename(&db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(PipelineError::storage)?;

        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    async fn init_schema(&self) -> Result<(), PipelineError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS checkpoints (
                thread_id TEXT NOT NULL,
                version INTEGER NOT NULL,
                snapshot TEXT NOT NULL,
                metadata TEXT,
                created_at TEXT NOT NULL DEFAULT (STRFTIME('%Y-%m-%dT%H:%M:%fZ', 'now')),
                PRIMARY KEY (thread_id, version)
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(PipelineError::storage)?;

        Ok(())
    }
}

#[async_trait]
impl CheckpointStore for SqliteCheckpointStore {
    async fn get(&self, thread_id: &str) -> Result<Option<Checkpoint>, PipelineError> {
        let row = sqlx::query(
            "SELECT thread_id, version, snapshot, created_at
             FROM checkpoints
             WHERE thread_id = ?1
             ORDER BY version DESC
             LIMIT 1",
        )
        .bind(thread_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| PipelineError::checkpoint_read(thread_id, e))?;

        let Some(row) = row else {
            return Ok(None);
        };

        let raw: String = row.get("snapshot");
        let snapshot: Snapshot = serde_json::from_str(&raw)
            .map_err(|e| PipelineError::checkpoint_read(thread_id, e))?;

        Ok(Some(Checkpoint {
            thread_id: row.get("thread_id"),
            version: row.get("version"),
            snapshot,
            created_at: row.get("created_at"),
        }))
    }

    async fn put(
        &self,
        thread_id: &str,
        snapshot: Snapshot,
        metadata: Value,
    ) -> Result<i64, PipelineError> {
        let raw = serde_json::to_string(&snapshot)
            .map_err(|e| PipelineError::checkpoint_write(thread_id, e))?;
        let metadata_raw = metadata.to_string();
        let now = chrono::Utc::now().to_rfc3339();

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| PipelineError::checkpoint_write(thread_id, e))?;

        let version: i64 = sqlx::query(
            "SELECT COALESCE(MAX(version), 0) + 1 FROM checkpoints WHERE thread_id = ?1",
        )
        .bind(thread_id)
        .fetch_one(&mut *tx)
        .await
        .map(|r| r.get(0))
        .map_err(|e| PipelineError::checkpoint_write(thread_id, e))?;

        sqlx::query(
            "INSERT INTO checkpoints (thread_id, version, snapshot, metadata, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(thread_id)
        .bind(version)
        .bind(&raw)
        .bind(&metadata_raw)
        .bind(&now)
        .execute(&mut *tx)
        .await
        .map_err(|e| PipelineError::checkpoint_write(thread_id, e))?;

        tx.commit()
            .await
            .map_err(|e| PipelineError::checkpoint_write(thread_id, e))?;

        Ok(version)
    }

    async fn clear(&self, thread_id: &str) -> Result<(), PipelineError> {
        self.put(
            thread_id,
            Snapshot::empty(),
            serde_json::json!({ "source": "clear" }),
        )
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkpoint::Turn;

    async fn temp_store() -> (tempfile::TempDir, SqliteCheckpointStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteCheckpointStore::new(dir.path().join("checkpoints.db"))
            .await
            .unwrap();
        (dir, store)
    }

    fn snapshot_with_turns(turns: Vec<Turn>) -> Snapshot {
        Snapshot {
            turns,
            ..Snapshot::empty()
        }
    }

    #[tokio::test]
    async fn get_on_unknown_thread_is_none() {
        let (_dir, store) = temp_store().await;
        assert!(store.get("t-missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn versions_are_monotonic_per_thread() {
        let (_dir, store) = temp_store().await;

        let v1 = store
            .put("t1", snapshot_with_turns(vec![Turn::user("q1")]), Value::Null)
            .await
            .unwrap();
        let v2 = store
            .put("t1", snapshot_with_turns(vec![Turn::user("q2")]), Value::Null)
            .await
            .unwrap();
        let other = store
            .put("t2", Snapshot::empty(), Value::Null)
            .await
            .unwrap();

        assert_eq!(v1, 1);
        assert_eq!(v2, 2);
        assert_eq!(other, 1);

        let latest = store.get("t1").await.unwrap().unwrap();
        assert_eq!(latest.version, 2);
        assert_eq!(latest.snapshot.turns[0].content, "q2");
    }

    #[tokio::test]
    async fn clear_resets_messages_but_keeps_identity() {
        let (_dir, store) = temp_store().await;

        store
            .put("t1", snapshot_with_turns(vec![Turn::user("q")]), Value::Null)
            .await
            .unwrap();
        store.clear("t1").await.unwrap();

        let latest = store.get("t1").await.unwrap().unwrap();
        assert!(latest.snapshot.turns.is_empty());
        assert_eq!(latest.version, 2);

        // Subsequent put keeps incrementing.
        let v3 = store
            .put("t1", snapshot_with_turns(vec![Turn::user("again")]), Value::Null)
            .await
            .unwrap();
        assert_eq!(v3, 3);
    }
}
