//! Relevance decision table.
//!
//! Pure function over the retrieved chunks deciding whether they ground the
//! answer. Precedence is fixed: document binding first, empty set second,
//! threshold last. Reordering these rules changes observable behavior, so
//! don't.

use serde::{Deserialize, Serialize};

use super::store::ChunkMatch;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionReason {
    DocumentBasedConversation,
    NoRelevantChunks,
    RelevantChunksFound,
    LowSimilarity,
}

impl DecisionReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DecisionReason::DocumentBasedConversation => "document_based_conversation",
            DecisionReason::NoRelevantChunks => "no_relevant_chunks",
            DecisionReason::RelevantChunksFound => "relevant_chunks_found",
            DecisionReason::LowSimilarity => "low_similarity",
        }
    }
}

/// Outcome of the decision table, computed fresh per invocation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetrievalDecision {
    pub use_chunks: bool,
    pub max_similarity: f32,
    pub reason: DecisionReason,
}

/// Decide whether retrieved chunks ground the answer.
///
/// 1. Document-bound threads always use their chunks, even an empty set.
/// 2. An empty chunk set on an open thread never grounds.
/// 3. Otherwise the best similarity is compared against `threshold`.
pub fn decide(
    document_id: Option<&str>,
    matches: &[ChunkMatch],
    threshold: f32,
) -> RetrievalDecision {
    // Cosine spans [-1, 1]; the true best score is reported, 0.0 only when
    // there is nothing to score.
    let max_similarity = if matches.is_empty() {
        0.0
    } else {
        matches
            .iter()
            .map(|m| m.similarity)
            .fold(f32::NEG_INFINITY, f32::max)
    };

    if document_id.is_some() {
        return RetrievalDecision {
            use_chunks: true,
            max_similarity,
            reason: DecisionReason::DocumentBasedConversation,
        };
    }

    if matches.is_empty() {
        return RetrievalDecision {
            use_chunks: false,
            max_similarity: 0.0,
            reason: DecisionReason::NoRelevantChunks,
        };
    }

    if max_similarity >= threshold {
        RetrievalDecision {
            use_chunks: true,
            max_similarity,
            reason: DecisionReason::RelevantChunksFound,
        }
    } else {
        RetrievalDecision {
            use_chunks: false,
            max_similarity,
            reason: DecisionReason::LowSimilarity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rag::store::StoredChunk;

    const THRESHOLD: f32 = 0.7;

    fn matches(similarities: &[f32]) -> Vec<ChunkMatch> {
        similarities
            .iter()
            .enumerate()
            .map(|(i, &similarity)| ChunkMatch {
                chunk: StoredChunk {
                    chunk_id: format!("c{}", i),
                    document_id: "d".to_string(),
                    chunk_index: i as i64,
                    content: String::new(),
                },
                similarity,
            })
            .collect()
    }

    #[test]
    fn document_binding_overrides_similarity() {
        let decision = decide(Some("d"), &matches(&[0.9, 0.4]), THRESHOLD);
        assert!(decision.use_chunks);
        assert_eq!(decision.reason, DecisionReason::DocumentBasedConversation);
        assert_eq!(decision.max_similarity, 0.9);
    }

    #[test]
    fn document_binding_holds_even_with_no_chunks() {
        let decision = decide(Some("d"), &[], THRESHOLD);
        assert!(decision.use_chunks);
        assert_eq!(decision.reason, DecisionReason::DocumentBasedConversation);
        assert_eq!(decision.max_similarity, 0.0);
    }

    #[test]
    fn empty_chunks_on_open_thread_never_ground() {
        let decision = decide(None, &[], THRESHOLD);
        assert!(!decision.use_chunks);
        assert_eq!(decision.reason, DecisionReason::NoRelevantChunks);
        assert_eq!(decision.max_similarity, 0.0);
    }

    #[test]
    fn below_threshold_is_low_similarity() {
        let decision = decide(None, &matches(&[0.5]), THRESHOLD);
        assert!(!decision.use_chunks);
        assert_eq!(decision.reason, DecisionReason::LowSimilarity);
        assert_eq!(decision.max_similarity, 0.5);
    }

    #[test]
    fn at_or_above_threshold_grounds() {
        let decision = decide(None, &matches(&[0.8]), THRESHOLD);
        assert!(decision.use_chunks);
        assert_eq!(decision.reason, DecisionReason::RelevantChunksFound);
        assert_eq!(decision.max_similarity, 0.8);

        let exact = decide(None, &matches(&[0.7]), THRESHOLD);
        assert!(exact.use_chunks);
    }

    #[test]
    fn negative_best_similarity_is_reported_verbatim() {
        let decision = decide(None, &matches(&[-0.3, -0.8]), THRESHOLD);
        assert!(!decision.use_chunks);
        assert_eq!(decision.reason, DecisionReason::LowSimilarity);
        assert_eq!(decision.max_similarity, -0.3);

        let bound = decide(Some("d"), &matches(&[-0.5]), THRESHOLD);
        assert!(bound.use_chunks);
        assert_eq!(bound.max_similarity, -0.5);
    }

    #[test]
    fn max_similarity_is_the_best_of_several() {
        let decision = decide(None, &matches(&[0.2, 0.95, 0.6]), THRESHOLD);
        assert_eq!(decision.max_similarity, 0.95);
        assert!(decision.use_chunks);
    }

    #[test]
    fn reason_wire_strings() {
        assert_eq!(
            DecisionReason::DocumentBasedConversation.as_str(),
            "document_based_conversation"
        );
        assert_eq!(DecisionReason::NoRelevantChunks.as_str(), "no_relevant_chunks");
        assert_eq!(
            DecisionReason::RelevantChunksFound.as_str(),
            "relevant_chunks_found"
        );
        assert_eq!(DecisionReason::LowSimilarity.as_str(), "low_similarity");

        let json = serde_json::to_string(&DecisionReason::LowSimilarity).unwrap();
        assert_eq!(json, "\"low_similarity\"");
    }
}
