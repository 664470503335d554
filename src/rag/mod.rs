//! Retrieval module: chunk storage, nearest-neighbor search, the relevance
//! decision table and bounded context assembly.

pub mod context_builder;
pub mod decision;
pub mod memory;
pub mod sqlite;
pub mod store;

pub use context_builder::build_context;
pub use decision::{decide, DecisionReason, RetrievalDecision};
pub use memory::InMemoryChunkStore;
pub use sqlite::SqliteChunkStore;
pub use store::{ChunkMatch, ChunkStore, StoredChunk};

/// Cosine similarity between two equal-length vectors.
///
/// With unit-normalized embeddings this equals `1 - cosine_distance`, the
/// similarity the retriever reports. Mismatched or empty inputs score 0.
pub(crate) fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    let denom = norm_a * norm_b;

    if denom <= f32::EPSILON {
        0.0
    } else {
        (dot / denom).clamp(-1.0, 1.0)
    }
}

/// Sort matches by similarity descending, breaking ties by chunk index
/// ascending and finally chunk id ascending, so retrieval order is
/// deterministic for equal scores.
pub(crate) fn sort_matches(matches: &mut [ChunkMatch]) {
    matches.sort_by(|a, b| {
        b.similarity
            .partial_cmp(&a.similarity)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.chunk.chunk_index.cmp(&b.chunk.chunk_index))
            .then_with(|| a.chunk.chunk_id.cmp(&b.chunk.chunk_id))
    });
}

#[cfg(test)]
mod tests {
    use super::store::{ChunkMatch, StoredChunk};
    use super::*;

    fn chunk(id: &str, index: i64) -> StoredChunk {
        StoredChunk {
            chunk_id: id.to_string(),
            document_id: "doc".to_string(),
            chunk_index: index,
            content: String::new(),
        }
    }

    #[test]
    fn cosine_of_identical_vectors_is_one() {
        let v = vec![0.6, 0.8];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn cosine_of_orthogonal_vectors_is_zero() {
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]), 0.0);
    }

    #[test]
    fn cosine_handles_mismatch_and_zero() {
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 2.0]), 0.0);
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
    }

    #[test]
    fn equal_similarity_breaks_ties_by_chunk_index() {
        let mut matches = vec![
            ChunkMatch {
                chunk: chunk("c", 2),
                similarity: 0.5,
            },
            ChunkMatch {
                chunk: chunk("a", 0),
                similarity: 0.5,
            },
            ChunkMatch {
                chunk: chunk("b", 1),
                similarity: 0.9,
            },
        ];
        sort_matches(&mut matches);

        let ids: Vec<&str> = matches.iter().map(|m| m.chunk.chunk_id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a", "c"]);
    }
}
