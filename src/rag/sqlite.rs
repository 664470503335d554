//! SQLite-backed chunk store.
//!
//! In-process vector store using SQLite for chunk rows and brute-force
//! cosine similarity for search. Embeddings are stored as little-endian
//! f32 BLOBs.

use std::path::PathBuf;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};

use crate::core::errors::PipelineError;

use super::store::{ChunkMatch, ChunkStore, StoredChunk};
use super::{cosine_similarity, sort_matches};

pub struct SqliteChunkStore {
    pool: SqlitePool,
}

impl SqliteChunkStore {
    pub async fn new(db_path: PathBuf) -> Result<Self, PipelineError> {
        let options = SqliteConnectOptions::new()
            .filename(&db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(PipelineError::storage)?;

        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    async fn init_schema(&self) -> Result<(), PipelineError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS document_chunks (
                chunk_id TEXT PRIMARY KEY,
                document_id TEXT NOT NULL,
                chunk_index INTEGER NOT NULL,
                content TEXT NOT NULL,
                embedding BLOB,
                created_at TEXT NOT NULL DEFAULT (STRFTIME('%Y-%m-%dT%H:%M:%fZ', 'now'))
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(PipelineError::storage)?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_chunks_document ON document_chunks(document_id)",
        )
        .execute(&self.pool)
        .await
        .map_err(PipelineError::storage)?;

        Ok(())
    }

    fn serialize_embedding(embedding: &[f32]) -> Vec<u8> {
        embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
    }

    fn deserialize_embedding(bytes: &[u8]) -> Vec<f32> {
        bytes
            .chunks_exact(4)
            .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect()
    }

    fn row_to_chunk(row: &sqlx::sqlite::SqliteRow) -> StoredChunk {
        StoredChunk {
            chunk_id: row.get("chunk_id"),
            document_id: row.get("document_id"),
            chunk_index: row.get("chunk_index"),
            content: row.get("content"),
        }
    }
}

#[async_trait]
impl ChunkStore for SqliteChunkStore {
    async fn insert(&self, chunk: StoredChunk, embedding: Vec<f32>) -> Result<(), PipelineError> {
        let blob = Self::serialize_embedding(&embedding);

        sqlx::query(
            "INSERT OR REPLACE INTO document_chunks (chunk_id, document_id, chunk_index, content, embedding)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(&chunk.chunk_id)
        .bind(&chunk.document_id)
        .bind(chunk.chunk_index)
        .bind(&chunk.content)
        .bind(&blob)
        .execute(&self.pool)
        .await
        .map_err(PipelineError::storage)?;

        Ok(())
    }

    async fn insert_batch(
        &self,
        items: Vec<(StoredChunk, Vec<f32>)>,
    ) -> Result<(), PipelineError> {
        if items.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await.map_err(PipelineError::storage)?;

        for (chunk, embedding) in &items {
            let blob = Self::serialize_embedding(embedding);

            sqlx::query(
                "INSERT OR REPLACE INTO document_chunks (chunk_id, document_id, chunk_index, content, embedding)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )
            .bind(&chunk.chunk_id)
            .bind(&chunk.document_id)
            .bind(chunk.chunk_index)
            .bind(&chunk.content)
            .bind(&blob)
            .execute(&mut *tx)
            .await
            .map_err(PipelineError::storage)?;
        }

        tx.commit().await.map_err(PipelineError::storage)?;
        Ok(())
    }

    async fn search(
        &self,
        query_embedding: &[f32],
        top_k: usize,
        document_id: Option<&str>,
    ) -> Result<Vec<ChunkMatch>, PipelineError> {
        if top_k == 0 {
            return Ok(Vec::new());
        }

        let rows = if let Some(document_id) = document_id {
            sqlx::query(
                "SELECT chunk_id, document_id, chunk_index, content, embedding
                 FROM document_chunks
                 WHERE document_id = ?1",
            )
            .bind(document_id)
            .fetch_all(&self.pool)
            .await
            .map_err(PipelineError::retrieval)?
        } else {
            sqlx::query(
                "SELECT chunk_id, document_id, chunk_index, content, embedding
                 FROM document_chunks",
            )
            .fetch_all(&self.pool)
            .await
            .map_err(PipelineError::retrieval)?
        };

        let mut scored: Vec<ChunkMatch> = rows
            .iter()
            .filter_map(|row| {
                let embedding_bytes: Vec<u8> = row.get("embedding");
                if embedding_bytes.is_empty() {
                    return None;
                }
                let stored = Self::deserialize_embedding(&embedding_bytes);
                let similarity = cosine_similarity(query_embedding, &stored);

                Some(ChunkMatch {
                    chunk: Self::row_to_chunk(row),
                    similarity,
                })
            })
            .collect();

        sort_matches(&mut scored);
        scored.truncate(top_k);

        Ok(scored)
    }

    async fn count(&self, document_id: Option<&str>) -> Result<usize, PipelineError> {
        let count: i64 = if let Some(document_id) = document_id {
            sqlx::query("SELECT COUNT(*) FROM document_chunks WHERE document_id = ?1")
                .bind(document_id)
                .fetch_one(&self.pool)
                .await
                .map(|r| r.get(0))
                .map_err(PipelineError::storage)?
        } else {
            sqlx::query("SELECT COUNT(*) FROM document_chunks")
                .fetch_one(&self.pool)
                .await
                .map(|r| r.get(0))
                .map_err(PipelineError::storage)?
        };

        Ok(count as usize)
    }

    async fn delete_document(&self, document_id: &str) -> Result<usize, PipelineError> {
        let result = sqlx::query("DELETE FROM document_chunks WHERE document_id = ?1")
            .bind(document_id)
            .execute(&self.pool)
            .await
            .map_err(PipelineError::storage)?;

        Ok(result.rows_affected() as usize)
    }
}
