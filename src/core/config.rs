//! Pipeline settings.
//!
//! All tunable constants of the retrieval-decision core live here. The
//! defaults mirror production values; a TOML file can override any subset.
//! There are no module-level globals: the host process builds one `Settings`
//! and hands it to the service at startup.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::errors::PipelineError;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Chat completion model id.
    pub chat_model: String,
    /// Embedding model id.
    pub embedding_model: String,
    /// Sampling temperature for answer generation.
    pub temperature: f64,
    /// Completion token cap for answer generation.
    pub max_tokens: i32,
    /// Number of chunks requested from the vector store.
    pub top_k: usize,
    /// Minimum similarity for grounding an open (non-document) thread.
    pub similarity_threshold: f32,
    /// Hard cap on the assembled context string, in characters.
    pub max_context_length: usize,
    /// Recent-history window passed to the generator, in messages
    /// (10 messages = 5 user/assistant exchanges).
    pub history_window: usize,
    /// Number of follow-up suggestions requested per turn.
    pub followup_count: usize,
    /// Context prefix length handed to the follow-up generator, in characters.
    pub followup_context_chars: usize,
    /// Stored-chunk preview length kept in pipeline state, in characters.
    pub chunk_preview_chars: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            chat_model: "solar-pro2".to_string(),
            embedding_model: "embedding-query".to_string(),
            temperature: 0.2,
            max_tokens: 512,
            top_k: 3,
            similarity_threshold: 0.7,
            max_context_length: 700,
            history_window: 10,
            followup_count: 3,
            followup_context_chars: 300,
            chunk_preview_chars: 200,
        }
    }
}

impl Settings {
    /// Load settings from a TOML file, falling back to defaults for any
    /// field the file does not set.
    pub fn from_toml_file(path: &Path) -> Result<Self, PipelineError> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            PipelineError::InvalidInput(format!("cannot read {}: {}", path.display(), e))
        })?;
        let settings: Settings = toml::from_str(&raw).map_err(|e| {
            PipelineError::InvalidInput(format!("cannot parse {}: {}", path.display(), e))
        })?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.chat_model.trim().is_empty() {
            return Err(PipelineError::InvalidInput(
                "chat_model must not be empty".to_string(),
            ));
        }
        if self.embedding_model.trim().is_empty() {
            return Err(PipelineError::InvalidInput(
                "embedding_model must not be empty".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.similarity_threshold) {
            return Err(PipelineError::InvalidInput(format!(
                "similarity_threshold must be within 0.0..=1.0, got {}",
                self.similarity_threshold
            )));
        }
        if self.top_k == 0 {
            return Err(PipelineError::InvalidInput(
                "top_k must be at least 1".to_string(),
            ));
        }
        if self.max_context_length == 0 {
            return Err(PipelineError::InvalidInput(
                "max_context_length must be at least 1".to_string(),
            ));
        }
        if self.followup_count == 0 {
            return Err(PipelineError::InvalidInput(
                "followup_count must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let settings = Settings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.top_k, 3);
        assert_eq!(settings.similarity_threshold, 0.7);
        assert_eq!(settings.max_context_length, 700);
        assert_eq!(settings.followup_count, 3);
    }

    #[test]
    fn out_of_range_threshold_rejected() {
        let settings = Settings {
            similarity_threshold: 1.5,
            ..Settings::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn zero_top_k_rejected() {
        let settings = Settings {
            top_k: 0,
            ..Settings::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn partial_toml_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        std::fs::write(&path, "top_k = 5\nsimilarity_threshold = 0.6\n").unwrap();

        let settings = Settings::from_toml_file(&path).unwrap();
        assert_eq!(settings.top_k, 5);
        assert_eq!(settings.similarity_threshold, 0.6);
        // Everything else keeps its default.
        assert_eq!(settings.chat_model, "solar-pro2");
        assert_eq!(settings.max_context_length, 700);
    }

    #[test]
    fn invalid_toml_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        std::fs::write(&path, "top_k = \"not a number\"").unwrap();
        assert!(Settings::from_toml_file(&path).is_err());
    }
}
