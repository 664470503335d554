//! Conversation service: the exposed surface of the core.
//!
//! Owns the pipeline runtime and its collaborators, built once at process
//! start and shared by reference — no module-level singletons. Per-thread
//! mutual exclusion lives here: the checkpoint store does not serialize
//! same-thread writers, so the service does, with one async mutex per
//! thread id. Distinct threads run concurrently on the runtime, bounded by
//! the stores' connection pools.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::Mutex;

use crate::checkpoint::{CheckpointStore, Snapshot, Turn};
use crate::core::config::Settings;
use crate::core::errors::PipelineError;
use crate::graph::{build_conversation_graph, ConversationState, GraphRuntime, NodeContext};
use crate::llm::{LlmProvider, TokenUsage};
use crate::prompts::UserLevel;
use crate::rag::{ChunkStore, DecisionReason};

/// Retrieval bookkeeping returned with every answer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferenceMetadata {
    pub chunks_used: usize,
    pub max_similarity: f32,
    pub decision_reason: DecisionReason,
    pub document_id: Option<String>,
}

/// Result of one pipeline invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationOutcome {
    pub answer: String,
    pub follow_up_questions: Vec<String>,
    pub cited_chunk_ids: Vec<String>,
    pub reference: ReferenceMetadata,
    pub model_version: String,
    pub token_usage: TokenUsage,
    pub latency_ms: u64,
}

pub struct ConversationService {
    graph: GraphRuntime,
    provider: Arc<dyn LlmProvider>,
    chunks: Arc<dyn ChunkStore>,
    checkpoints: Arc<dyn CheckpointStore>,
    settings: Settings,
    thread_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl ConversationService {
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        chunks: Arc<dyn ChunkStore>,
        checkpoints: Arc<dyn CheckpointStore>,
        settings: Settings,
    ) -> Result<Self, PipelineError> {
        settings.validate()?;
        Ok(Self {
            graph: build_conversation_graph()?,
            provider,
            chunks,
            checkpoints,
            settings,
            thread_locks: Mutex::new(HashMap::new()),
        })
    }

    /// Run one conversation turn.
    ///
    /// Loads the prior checkpoint, drives retrieve -> generate -> followup,
    /// then writes exactly one new checkpoint version appending the user
    /// and assistant turns. Retrieval and generation errors abort with no
    /// write; a checkpoint write failure after generation is logged and
    /// returned as `CheckpointWrite` so operators can reconcile the lost
    /// turn.
    pub async fn invoke(
        &self,
        thread_id: &str,
        question: &str,
        document_id: Option<&str>,
        user_level: UserLevel,
    ) -> Result<ConversationOutcome, PipelineError> {
        if question.trim().is_empty() {
            return Err(PipelineError::InvalidInput(
                "question must not be empty".to_string(),
            ));
        }

        let lock = self.thread_lock(thread_id).await;
        let outcome = {
            let _guard = lock.lock().await;
            self.invoke_locked(thread_id, question, document_id, user_level)
                .await
        };
        drop(lock);
        self.evict_thread_lock(thread_id).await;
        outcome
    }

    async fn invoke_locked(
        &self,
        thread_id: &str,
        question: &str,
        document_id: Option<&str>,
        user_level: UserLevel,
    ) -> Result<ConversationOutcome, PipelineError> {
        let started = Instant::now();

        let prior = self
            .checkpoints
            .get(thread_id)
            .await?
            .map(|checkpoint| checkpoint.snapshot);

        // A thread bound to a document stays bound: the caller's id wins,
        // otherwise the binding persisted in the snapshot applies.
        let bound_document = document_id
            .map(str::to_string)
            .or_else(|| prior.as_ref().and_then(|s| s.document_id.clone()));

        let history = prior
            .as_ref()
            .map(|snapshot| snapshot.turns.iter().map(Turn::as_chat_message).collect())
            .unwrap_or_default();

        let mut state = ConversationState::new(
            thread_id,
            question,
            bound_document,
            user_level,
            history,
        );

        let ctx = NodeContext {
            provider: self.provider.as_ref(),
            chunks: self.chunks.as_ref(),
            settings: &self.settings,
        };

        self.graph.run(&mut state, &ctx).await?;

        state.latency_ms = started.elapsed().as_millis() as u64;

        let answer = state.answer.clone().ok_or_else(|| {
            PipelineError::Generation("pipeline finished without an answer".to_string())
        })?;

        let cited_chunk_ids: Vec<String> = if state.use_chunks {
            state
                .retrieved_chunks
                .iter()
                .map(|c| c.chunk_id.clone())
                .collect()
        } else {
            Vec::new()
        };

        let decision_reason = state
            .decision_reason
            .unwrap_or(DecisionReason::NoRelevantChunks);

        let mut turns = prior.map(|snapshot| snapshot.turns).unwrap_or_default();
        turns.push(Turn::user(question));
        turns.push(Turn {
            cited_chunk_ids: cited_chunk_ids.clone(),
            follow_up_questions: state.follow_up_questions.clone(),
            model_version: Some(state.model_version.clone()),
            token_usage: Some(state.token_usage),
            latency_ms: Some(state.latency_ms),
            ..Turn::assistant(answer.clone())
        });

        let snapshot = Snapshot {
            schema_version: crate::checkpoint::SNAPSHOT_SCHEMA_VERSION,
            turns,
            document_id: state.document_id.clone(),
            user_level,
        };
        let metadata = json!({
            "source": "invoke",
            "latency_ms": state.latency_ms,
            "decision_reason": decision_reason,
        });

        match self.checkpoints.put(thread_id, snapshot, metadata).await {
            Ok(version) => {
                tracing::debug!(thread_id, version, "checkpoint written");
            }
            Err(err) => {
                // The answer exists but this turn is not durable; surfaced
                // distinctly from generation errors for reconciliation.
                tracing::error!(
                    thread_id,
                    error = %err,
                    "checkpoint write failed after answer generation"
                );
                return Err(err);
            }
        }

        Ok(ConversationOutcome {
            answer,
            follow_up_questions: state.follow_up_questions,
            cited_chunk_ids,
            reference: ReferenceMetadata {
                chunks_used: if state.use_chunks {
                    state.retrieved_chunks.len()
                } else {
                    0
                },
                max_similarity: state.max_similarity,
                decision_reason,
                document_id: state.document_id,
            },
            model_version: state.model_version,
            token_usage: state.token_usage,
            latency_ms: state.latency_ms,
        })
    }

    /// Reset a thread's message history, preserving its identity for
    /// future turns.
    pub async fn clear(&self, thread_id: &str) -> Result<(), PipelineError> {
        let lock = self.thread_lock(thread_id).await;
        let result = {
            let _guard = lock.lock().await;
            self.checkpoints.clear(thread_id).await
        };
        drop(lock);
        self.evict_thread_lock(thread_id).await;

        result?;
        tracing::info!(thread_id, "conversation cleared");
        Ok(())
    }

    /// Mint a fresh thread id for callers starting a new conversation.
    pub fn new_thread_id() -> String {
        uuid::Uuid::new_v4().to_string()
    }

    async fn thread_lock(&self, thread_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.thread_locks.lock().await;
        locks
            .entry(thread_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Drop the lock entry once no caller holds a clone, so the map stays
    /// bounded by the number of threads currently in flight.
    async fn evict_thread_lock(&self, thread_id: &str) {
        let mut locks = self.thread_locks.lock().await;
        if let Some(lock) = locks.get(thread_id) {
            if Arc::strong_count(lock) == 1 {
                locks.remove(thread_id);
            }
        }
    }
}
