//! Node trait and types — base abstraction for pipeline stages.

use async_trait::async_trait;

use crate::core::config::Settings;
use crate::core::errors::PipelineError;
use crate::llm::LlmProvider;
use crate::rag::ChunkStore;

use super::state::ConversationState;

/// Collaborators handed to every stage. Built once per invocation from the
/// service's owned components; nodes themselves stay stateless.
pub struct NodeContext<'a> {
    pub provider: &'a dyn LlmProvider,
    pub chunks: &'a dyn ChunkStore,
    pub settings: &'a Settings,
}

/// A stage's routing decision, returned explicitly rather than hardcoded in
/// the runtime, so future branching stages slot in without reshaping the
/// engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeOutput {
    /// Follow this stage's outgoing edge.
    Continue,
    /// Pipeline complete.
    Final,
}

/// A pipeline stage. Stage errors use the pipeline taxonomy directly and
/// propagate unchanged to the caller.
#[async_trait]
pub trait Node: Send + Sync {
    /// Unique identifier for this node.
    fn id(&self) -> &'static str;

    /// Human-readable name for display.
    fn name(&self) -> &'static str {
        self.id()
    }

    /// Execute the stage, mutating the shared state.
    async fn execute(
        &self,
        state: &mut ConversationState,
        ctx: &NodeContext<'_>,
    ) -> Result<NodeOutput, PipelineError>;
}
