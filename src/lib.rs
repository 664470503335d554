//! finqa-core — retrieval-decision and conversation-orchestration core for
//! financial Q&A.
//!
//! Given a question and a conversation thread, the core decides whether
//! retrieved document chunks should ground the answer, assembles a bounded
//! context, drives a fixed three-stage pipeline (retrieve -> generate ->
//! followup) and durably checkpoints the thread so later turns resume
//! correctly. HTTP transport, document ingestion and prompt wording are the
//! host's concern.

pub mod checkpoint;
pub mod core;
pub mod graph;
pub mod llm;
pub mod logging;
pub mod prompts;
pub mod rag;
pub mod service;

pub use crate::core::config::Settings;
pub use crate::core::errors::PipelineError;
pub use crate::checkpoint::{
    Checkpoint, CheckpointStore, InMemoryCheckpointStore, Role, Snapshot, SqliteCheckpointStore,
    Turn,
};
pub use crate::graph::{build_conversation_graph, ConversationState, GraphRuntime};
pub use crate::llm::{ChatCompletion, ChatMessage, ChatRequest, LlmProvider, TokenUsage, UpstageProvider};
pub use crate::prompts::UserLevel;
pub use crate::rag::{
    build_context, decide, ChunkMatch, ChunkStore, DecisionReason, InMemoryChunkStore,
    RetrievalDecision, SqliteChunkStore, StoredChunk,
};
pub use crate::service::{ConversationOutcome, ConversationService, ReferenceMetadata};
