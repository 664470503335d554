use thiserror::Error;

/// Error taxonomy for the conversation core.
///
/// `Embedding`, `Retrieval` and `Generation` are fatal for the invocation
/// that raised them: no partial checkpoint is written and the error reaches
/// the caller unchanged. `CheckpointWrite` is the one consistency-sensitive
/// case: the answer was already produced but could not be persisted, so the
/// service logs it separately before propagating. No retries happen inside
/// the core; retry policy belongs to the caller.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("embedding failed: {0}")]
    Embedding(String),
    #[error("retrieval failed: {0}")]
    Retrieval(String),
    #[error("generation failed: {0}")]
    Generation(String),
    #[error("checkpoint read failed for thread {thread_id}: {message}")]
    CheckpointRead { thread_id: String, message: String },
    #[error("checkpoint write failed for thread {thread_id}: {message}")]
    CheckpointWrite { thread_id: String, message: String },
    #[error("storage error: {0}")]
    Storage(String),
    #[error("graph error: {0}")]
    Graph(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl PipelineError {
    pub fn embedding<E: std::fmt::Display>(err: E) -> Self {
        PipelineError::Embedding(err.to_string())
    }

    pub fn retrieval<E: std::fmt::Display>(err: E) -> Self {
        PipelineError::Retrieval(err.to_string())
    }

    pub fn generation<E: std::fmt::Display>(err: E) -> Self {
        PipelineError::Generation(err.to_string())
    }

    pub fn storage<E: std::fmt::Display>(err: E) -> Self {
        PipelineError::Storage(err.to_string())
    }

    pub fn checkpoint_read<E: std::fmt::Display>(thread_id: &str, err: E) -> Self {
        PipelineError::CheckpointRead {
            thread_id: thread_id.to_string(),
            message: err.to_string(),
        }
    }

    pub fn checkpoint_write<E: std::fmt::Display>(thread_id: &str, err: E) -> Self {
        PipelineError::CheckpointWrite {
            thread_id: thread_id.to_string(),
            message: err.to_string(),
        }
    }
}
