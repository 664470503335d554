//! ChunkStore trait — abstract interface for chunk storage backends.
//!
//! Chunks and their embeddings are written once at ingestion time and are
//! read-only for this core; the retriever only searches them.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::core::errors::PipelineError;

/// A stored document chunk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredChunk {
    /// Unique chunk identifier.
    pub chunk_id: String,
    /// Document that owns this chunk.
    pub document_id: String,
    /// Ordinal position of the chunk within its document.
    pub chunk_index: i64,
    /// The text content of the chunk.
    pub content: String,
}

/// Result of a similarity search. The score is ephemeral — computed per
/// query and never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkMatch {
    pub chunk: StoredChunk,
    /// Similarity in the metric's bounded range (`1 - distance`); higher is
    /// closer.
    pub similarity: f32,
}

/// Abstract trait for chunk storage backends.
///
/// `search` returns matches ordered by similarity descending, ties broken by
/// chunk index ascending then chunk id ascending, capped at `top_k`. An
/// empty corpus (or `top_k == 0`) yields an empty Vec, never an error.
#[async_trait]
pub trait ChunkStore: Send + Sync {
    /// Insert a chunk with its embedding vector.
    async fn insert(&self, chunk: StoredChunk, embedding: Vec<f32>) -> Result<(), PipelineError>;

    /// Insert multiple chunks in one batch.
    async fn insert_batch(
        &self,
        items: Vec<(StoredChunk, Vec<f32>)>,
    ) -> Result<(), PipelineError>;

    /// Nearest-neighbor search, optionally restricted to one document.
    async fn search(
        &self,
        query_embedding: &[f32],
        top_k: usize,
        document_id: Option<&str>,
    ) -> Result<Vec<ChunkMatch>, PipelineError>;

    /// Chunk count, optionally filtered to one document.
    async fn count(&self, document_id: Option<&str>) -> Result<usize, PipelineError>;

    /// Delete all chunks of a document; returns how many were removed.
    async fn delete_document(&self, document_id: &str) -> Result<usize, PipelineError>;
}
