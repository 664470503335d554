// Generate stage
// Select the prompt variant, compose the generator input from the recent
// history window, invoke the LLM and append the new turn pair to history.

use std::time::Instant;

use async_trait::async_trait;

use crate::core::errors::PipelineError;
use crate::graph::node::{Node, NodeContext, NodeOutput};
use crate::graph::state::ConversationState;
use crate::llm::{ChatMessage, ChatRequest};
use crate::prompts::{conversation_messages, select_variant};

pub struct GenerateNode;

impl GenerateNode {
    pub fn new() -> Self {
        Self
    }
}

impl Default for GenerateNode {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Node for GenerateNode {
    fn id(&self) -> &'static str {
        "generate"
    }

    fn name(&self) -> &'static str {
        "Generate Node"
    }

    async fn execute(
        &self,
        state: &mut ConversationState,
        ctx: &NodeContext<'_>,
    ) -> Result<NodeOutput, PipelineError> {
        let start = Instant::now();

        let variant = select_variant(state.document_id.as_deref(), &state.context);
        let messages = conversation_messages(
            &variant,
            state.user_level,
            &state.messages,
            &state.context,
            &state.question,
            ctx.settings.history_window,
        );

        let request = ChatRequest::new(messages)
            .with_temperature(ctx.settings.temperature)
            .with_max_tokens(ctx.settings.max_tokens);

        let completion = ctx.provider.chat(request, &ctx.settings.chat_model).await?;
        let answer = completion.content.trim().to_string();

        // History keeps the raw question only; the context block exists
        // solely in the generator input and must never replay next turn.
        state.messages.push(ChatMessage::user(state.question.clone()));
        state.messages.push(ChatMessage::assistant(answer.clone()));

        state.model_version = if completion.model_version.is_empty() {
            ctx.settings.chat_model.clone()
        } else {
            completion.model_version
        };
        state.token_usage = completion.usage;
        state.answer = Some(answer);

        tracing::info!(
            elapsed_ms = start.elapsed().as_millis() as u64,
            tokens = state.token_usage.total,
            model = %state.model_version,
            "generate stage complete"
        );

        Ok(NodeOutput::Continue)
    }
}
