// Follow-up stage
// Ask the generator for follow-up suggestions and parse them. This stage is
// non-critical: provider or parse failures degrade to an empty list instead
// of failing the turn.

use std::time::Instant;

use async_trait::async_trait;

use crate::core::errors::PipelineError;
use crate::graph::node::{Node, NodeContext, NodeOutput};
use crate::graph::state::ConversationState;
use crate::llm::ChatRequest;
use crate::prompts::{followup_messages, parse_follow_ups};

pub struct FollowUpNode;

impl FollowUpNode {
    pub fn new() -> Self {
        Self
    }
}

impl Default for FollowUpNode {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Node for FollowUpNode {
    fn id(&self) -> &'static str {
        "followup"
    }

    fn name(&self) -> &'static str {
        "Follow-up Node"
    }

    async fn execute(
        &self,
        state: &mut ConversationState,
        ctx: &NodeContext<'_>,
    ) -> Result<NodeOutput, PipelineError> {
        let start = Instant::now();

        let answer = state.answer.clone().unwrap_or_default();
        let context_prefix: String = state
            .context
            .chars()
            .take(ctx.settings.followup_context_chars)
            .collect();

        let messages = followup_messages(
            &state.question,
            &answer,
            &context_prefix,
            state.user_level,
            ctx.settings.followup_count,
        );
        let request = ChatRequest::new(messages).with_temperature(ctx.settings.temperature);

        state.follow_up_questions = match ctx.provider.chat(request, &ctx.settings.chat_model).await
        {
            Ok(completion) => parse_follow_ups(&completion.content, ctx.settings.followup_count),
            Err(err) => {
                tracing::warn!(
                    thread_id = %state.thread_id,
                    error = %err,
                    "follow-up generation failed, degrading to empty list"
                );
                state.error = Some(format!("follow-up generation failed: {}", err));
                Vec::new()
            }
        };

        tracing::info!(
            elapsed_ms = start.elapsed().as_millis() as u64,
            count = state.follow_up_questions.len(),
            "follow-up stage complete"
        );

        Ok(NodeOutput::Final)
    }
}
