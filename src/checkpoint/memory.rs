//! In-memory checkpoint store for tests.
//!
//! Same version semantics as the SQLite store, without durability.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use crate::core::errors::PipelineError;

use super::{Checkpoint, CheckpointStore, Snapshot};

#[derive(Default)]
pub struct InMemoryCheckpointStore {
    threads: RwLock<HashMap<String, Vec<Checkpoint>>>,
}

impl InMemoryCheckpointStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CheckpointStore for InMemoryCheckpointStore {
    async fn get(&self, thread_id: &str) -> Result<Option<Checkpoint>, PipelineError> {
        let threads = self.threads.read().await;
        Ok(threads
            .get(thread_id)
            .and_then(|versions| versions.last())
            .cloned())
    }

    async fn put(
        &self,
        thread_id: &str,
        snapshot: Snapshot,
        _metadata: Value,
    ) -> Result<i64, PipelineError> {
        let mut threads = self.threads.write().await;
        let versions = threads.entry(thread_id.to_string()).or_default();
        let version = versions.last().map(|c| c.version).unwrap_or(0) + 1;
        versions.push(Checkpoint {
            thread_id: thread_id.to_string(),
            version,
            snapshot,
            created_at: chrono::Utc::now().to_rfc3339(),
        });
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
