use async_trait::async_trait;

use crate::core::errors::PipelineError;

use super::types::{ChatCompletion, ChatRequest};

/// External LLM collaborator: chat completion plus query embedding.
///
/// Both calls block the pipeline stage that issues them; there is no
/// internal retry or timeout. Implementations map their transport errors
/// to `PipelineError::Generation` (chat) and `PipelineError::Embedding`
/// (embed) so the stages can propagate them unchanged.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Provider name (e.g. "upstage", "lmstudio").
    fn name(&self) -> &str;

    /// Chat completion (non-streaming).
    async fn chat(
        &self,
        request: ChatRequest,
        model_id: &str,
    ) -> Result<ChatCompletion, PipelineError>;

    /// Embed each input text into a fixed-length vector, one per input,
    /// in input order. Deterministic for a given model and input.
    async fn embed(
        &self,
        inputs: &[String],
        model_id: &str,
    ) -> Result<Vec<Vec<f32>>, PipelineError>;
}
