//! Shared pipeline state.

use serde::{Deserialize, Serialize};

use crate::llm::{ChatMessage, TokenUsage};
use crate::prompts::UserLevel;
use crate::rag::DecisionReason;

/// Bounded view of a retrieved chunk kept in state: id, a short content
/// preview and the query-time score. The full chunk text lives only in the
/// context string.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkSummary {
    pub chunk_id: String,
    pub content: String,
    pub similarity: f32,
}

/// The record every stage reads and writes. Created per invocation from the
/// request and the prior checkpoint, discarded after the new checkpoint is
/// written.
#[derive(Debug, Clone)]
pub struct ConversationState {
    // Inputs
    pub thread_id: String,
    pub question: String,
    pub document_id: Option<String>,
    pub user_level: UserLevel,

    // History loaded from the prior checkpoint; the generate stage appends
    // the new user/assistant pair.
    pub messages: Vec<ChatMessage>,

    // Retrieval stage output
    pub query_embedding: Option<Vec<f32>>,
    pub retrieved_chunks: Vec<ChunkSummary>,
    pub context: String,
    pub use_chunks: bool,
    pub decision_reason: Option<DecisionReason>,
    pub max_similarity: f32,

    // Generation stage output
    pub answer: Option<String>,
    pub model_version: String,
    pub token_usage: TokenUsage,

    // Follow-up stage output
    pub follow_up_questions: Vec<String>,

    // Metadata
    pub latency_ms: u64,
    pub error: Option<String>,
}

impl ConversationState {
    pub fn new(
        thread_id: impl Into<String>,
        question: impl Into<String>,
        document_id: Option<String>,
        user_level: UserLevel,
        messages: Vec<ChatMessage>,
    ) -> Self {
        Self {
            thread_id: thread_id.into(),
            question: question.into(),
            document_id,
            user_level,
            messages,
            query_embedding: None,
            retrieved_chunks: Vec::new(),
            context: String::new(),
            use_chunks: false,
            decision_reason: None,
            max_similarity: 0.0,
            answer: None,
            model_version: String::new(),
            token_usage: TokenUsage::default(),
            follow_up_questions: Vec::new(),
            latency_ms: 0,
            error: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_state_initializes_correctly() {
        let state = ConversationState::new(
            "t1",
            "what moved the market?",
            Some("d1".to_string()),
            UserLevel::Intermediate,
            vec![ChatMessage::user("earlier question")],
        );

        assert_eq!(state.thread_id, "t1");
        assert_eq!(state.question, "what moved the market?");
        assert_eq!(state.document_id.as_deref(), Some("d1"));
        assert_eq!(state.user_level, UserLevel::Intermediate);
        assert_eq!(state.messages.len(), 1);
        assert!(state.query_embedding.is_none());
        assert!(state.retrieved_chunks.is_empty());
        assert!(state.context.is_empty());
        assert!(!state.use_chunks);
        assert!(state.decision_reason.is_none());
        assert_eq!(state.max_similarity, 0.0);
        assert!(state.answer.is_none());
        assert!(state.follow_up_questions.is_empty());
        assert_eq!(state.latency_ms, 0);
        assert!(state.error.is_none());
    }
}
