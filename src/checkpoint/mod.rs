//! Durable per-thread conversation snapshots.
//!
//! Each successful pipeline invocation writes exactly one new snapshot
//! version appending two turns (user, then assistant). Versions are
//! monotonic per thread. The store guarantees per-write durability but not
//! cross-thread transactionality; serializing same-thread writers is the
//! caller's job (the service holds a per-thread lock).

pub mod memory;
pub mod sqlite;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::errors::PipelineError;
use crate::llm::{ChatMessage, TokenUsage};
use crate::prompts::UserLevel;

pub use memory::InMemoryCheckpointStore;
pub use sqlite::SqliteCheckpointStore;

/// Bump when the snapshot layout changes; readers migrate by deserializing
/// older versions with serde defaults.
pub const SNAPSHOT_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
        }
    }
}

/// One persisted conversation turn.
///
/// User turns hold only the raw question — never the injected retrieval
/// context — so replaying history cannot duplicate context across turns.
/// The optional metadata fields are populated on assistant turns only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cited_chunk_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub follow_up_questions: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_usage: Option<TokenUsage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
}

impl Turn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            cited_chunk_ids: Vec::new(),
            follow_up_questions: Vec::new(),
            model_version: None,
            token_usage: None,
            latency_ms: None,
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            cited_chunk_ids: Vec::new(),
            follow_up_questions: Vec::new(),
            model_version: None,
            token_usage: None,
            latency_ms: None,
        }
    }

    pub fn as_chat_message(&self) -> ChatMessage {
        ChatMessage {
            role: self.role.as_str().to_string(),
            content: self.content.clone(),
        }
    }
}

/// A thread's accumulated state: message history plus the scalar fields
/// needed to resume later turns correctly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub schema_version: u32,
    pub turns: Vec<Turn>,
    /// Document this thread is bound to, if any. Once set, later turns
    /// resume the binding without the caller re-passing it.
    #[serde(default)]
    pub document_id: Option<String>,
    #[serde(default)]
    pub user_level: UserLevel,
}

impl Snapshot {
    pub fn empty() -> Self {
        Self {
            schema_version: SNAPSHOT_SCHEMA_VERSION,
            turns: Vec::new(),
            document_id: None,
            user_level: UserLevel::default(),
        }
    }
}

/// A stored snapshot together with its version.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkpoint {
    pub thread_id: String,
    pub version: i64,
    pub snapshot: Snapshot,
    pub created_at: String,
}

/// Durable key-value checkpoint backend addressed by thread id.
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    /// Latest checkpoint for the thread, `None` if it has never been
    /// written.
    async fn get(&self, thread_id: &str) -> Result<Option<Checkpoint>, PipelineError>;

    /// Persist a new snapshot version; returns the version it was assigned.
    async fn put(
        &self,
        thread_id: &str,
        snapshot: Snapshot,
        metadata: Value,
    ) -> Result<i64, PipelineError>;

    /// Reset the thread's message list to empty while preserving its
    /// identity: implemented as a new version holding an empty snapshot, so
    /// subsequent `put`s keep the version sequence monotonic.
    async fn clear(&self, thread_id: &str) -> Result<(), PipelineError>;
}
