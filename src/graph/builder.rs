// Graph builder
// Wires the fixed three-stage conversation pipeline.

use crate::core::errors::PipelineError;

use super::nodes::{FollowUpNode, GenerateNode, RetrieveNode};
use super::runtime::{GraphBuilder, GraphRuntime};

/// Build the conversation pipeline:
///
///     retrieve -> generate -> followup -> done
///
/// Single entry, single terminal, no branches or loops.
pub fn build_conversation_graph() -> Result<GraphRuntime, PipelineError> {
    GraphBuilder::new()
        .entry("retrieve")
        .max_steps(8)
        .node(Box::new(RetrieveNode::new()))
        .node(Box::new(GenerateNode::new()))
        .node(Box::new(FollowUpNode::new()))
        .edge("retrieve", "generate")
        .edge("generate", "followup")
        .build()
}
