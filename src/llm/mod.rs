pub mod provider;
pub mod types;
pub mod upstage;

pub use provider::LlmProvider;
pub use types::{ChatCompletion, ChatMessage, ChatRequest, TokenUsage};
pub use upstage::UpstageProvider;
