//! In-memory chunk store for tests and small corpora.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::core::errors::PipelineError;

use super::store::{ChunkMatch, ChunkStore, StoredChunk};
use super::{cosine_similarity, sort_matches};

#[derive(Default)]
pub struct InMemoryChunkStore {
    chunks: RwLock<HashMap<String, (StoredChunk, Vec<f32>)>>,
}

impl InMemoryChunkStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ChunkStore for InMemoryChunkStore {
    async fn insert(&self, chunk: StoredChunk, embedding: Vec<f32>) -> Result<(), PipelineError> {
        let mut chunks = self.chunks.write().await;
        chunks.insert(chunk.chunk_id.clone(), (chunk, embedding));
        Ok(())
    }

    async fn insert_batch(
        &self,
        items: Vec<(StoredChunk, Vec<f32>)>,
    ) -> Result<(), PipelineError> {
        let mut chunks = self.chunks.write().await;
        for (chunk, embedding) in items {
            chunks.insert(chunk.chunk_id.clone(), (chunk, embedding));
        }
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

        let chunks = self.chunks.read().await;
        let mut scored: Vec<ChunkMatch> = chunks
            .values()
            .filter(|(chunk, _)| {
                document_id.map_or(true, |doc| chunk.document_id == doc)
            })
            .map(|(chunk, embedding)| ChunkMatch {
                chunk: chunk.clone(),
                similarity: cosine_similarity(query_embedding, embedding),
            })
            .collect();

        sort_matches(&mut scored);
        scored.truncate(top_k);

        Ok(scored)
    }

    async fn count(&self, document_id: Option<&str>) -> Result<usize, PipelineError> {
        let chunks = self.chunks.read().await;
        Ok(chunks
            .values()
            .filter(|(chunk, _)| document_id.map_or(true, |doc| chunk.document_id == doc))
            .count())
    }

    async fn delete_document(&self, document_id: &str) -> Result<usize, PipelineError> {
        let mut chunks = self.chunks.write().await;
        let before = chunks.len();
        chunks.retain(|_, (chunk, _)| chunk.document_id != document_id);
        Ok(before - chunks.len())
    }
}
