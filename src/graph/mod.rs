// Conversation pipeline module
// Linear state machine: retrieve -> generate -> followup

pub mod builder;
pub mod node;
pub mod nodes;
pub mod runtime;
pub mod state;

pub use builder::build_conversation_graph;
pub use node::{Node, NodeContext, NodeOutput};
pub use runtime::{GraphBuilder, GraphRuntime};
pub use state::{ChunkSummary, ConversationState};
