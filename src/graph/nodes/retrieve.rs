// Retrieve stage
// Embed the question, search the chunk store, run the relevance decision,
// assemble the bounded context.

use std::time::Instant;

use async_trait::async_trait;

use crate::core::errors::PipelineError;
use crate::graph::node::{Node, NodeContext, NodeOutput};
use crate::graph::state::{ChunkSummary, ConversationState};
use crate::rag::{build_context, decide};

pub struct RetrieveNode;

impl RetrieveNode {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RetrieveNode {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Node for RetrieveNode {
    fn id(&self) -> &'static str {
        "retrieve"
    }

    fn name(&self) -> &'static str {
        "Retrieve Node"
    }

    async fn execute(
        &self,
        state: &mut ConversationState,
        ctx: &NodeContext<'_>,
    ) -> Result<NodeOutput, PipelineError> {
        let start = Instant::now();

        let embedding = ctx
            .provider
            .embed(
                std::slice::from_ref(&state.question),
                &ctx.settings.embedding_model,
            )
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| {
                PipelineError::Embedding("provider returned no embedding".to_string())
            })?;

        // Every invocation searches: document-bound threads within their
        // document, open threads across the whole corpus. The decision
        // table gates whether the results ground the answer.
        let matches = ctx
            .chunks
            .search(&embedding, ctx.settings.top_k, state.document_id.as_deref())
            .await?;

        let decision = decide(
            state.document_id.as_deref(),
            &matches,
            ctx.settings.similarity_threshold,
        );

        let context = if decision.use_chunks {
            build_context(&matches, ctx.settings.max_context_length)
        } else {
            String::new()
        };

        state.retrieved_chunks = matches
            .iter()
            .map(|m| ChunkSummary {
                chunk_id: m.chunk.chunk_id.clone(),
                content: m
                    .chunk
                    .content
                    .chars()
                    .take(ctx.settings.chunk_preview_chars)
                    .collect(),
                similarity: m.similarity,
            })
            .collect();
        state.query_embedding = Some(embedding);
        state.context = context;
        state.use_chunks = decision.use_chunks;
        state.decision_reason = Some(decision.reason);
        state.max_similarity = decision.max_similarity;

        tracing::info!(
            elapsed_ms = start.elapsed().as_millis() as u64,
            chunks = state.retrieved_chunks.len(),
            use_chunks = state.use_chunks,
            reason = decision.reason.as_str(),
            max_similarity = state.max_similarity,
            "retrieve stage complete"
        );

        Ok(NodeOutput::Continue)
    }
}
