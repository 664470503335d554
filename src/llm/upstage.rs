//! Upstage provider (OpenAI-compatible chat/embeddings API).

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use crate::core::errors::PipelineError;

use super::provider::LlmProvider;
use super::types::{ChatCompletion, ChatRequest, TokenUsage};

pub const DEFAULT_BASE_URL: &str = "https://api.upstage.ai/v1";

#[derive(Clone)]
pub struct UpstageProvider {
    base_url: String,
    api_key: String,
    client: Client,
}

impl UpstageProvider {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            client: Client::new(),
        }
    }

    /// Build a provider from `UPSTAGE_API_KEY` (and optionally
    /// `UPSTAGE_BASE_URL`) in the environment.
    pub fn from_env() -> Result<Self, PipelineError> {
        let api_key = std::env::var("UPSTAGE_API_KEY").map_err(|_| {
            PipelineError::InvalidInput("UPSTAGE_API_KEY is not set".to_string())
        })?;
        let base_url =
            std::env::var("UPSTAGE_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        Ok(Self::new(base_url, api_key))
    }

    fn parse_usage(payload: &Value) -> TokenUsage {
        let usage = &payload["usage"];
        TokenUsage {
            prompt: usage["prompt_tokens"].as_u64().unwrap_or(0) as u32,
            completion: usage["completion_tokens"].as_u64().unwrap_or(0) as u32,
            total: usage["total_tokens"].as_u64().unwrap_or(0) as u32,
        }
    }
}

#[async_trait]
impl LlmProvider for UpstageProvider {
    fn name(&self) -> &str {
        "upstage"
    }

    async fn chat(
        &self,
        request: ChatRequest,
        model_id: &str,
    ) -> Result<ChatCompletion, PipelineError> {
        let url = format!("{}/chat/completions", self.base_url);

        let mut body = json!({
            "model": model_id,
            "messages": request.messages,
            "stream": false,
        });

        if let Some(obj) = body.as_object_mut() {
            if let Some(t) = request.temperature {
                obj.insert("temperature".to_string(), json!(t));
            }
            if let Some(t) = request.max_tokens {
                obj.insert("max_tokens".to_string(), json!(t));
            }
            if let Some(s) = request.stop {
                obj.insert("stop".to_string(), json!(s));
            }
        }

        let res = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(PipelineError::generation)?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(PipelineError::Generation(format!(
                "chat completion returned {}: {}",
                status, text
            )));
        }

        let payload: Value = res.json().await.map_err(PipelineError::generation)?;

        let content = payload["choices"][0]["message"]["content"]
            .as_str()
            .unwrap_or_default()
            .to_string();
        let model_version = payload["model"].as_str().unwrap_or(model_id).to_string();

        Ok(ChatCompletion {
            content,
            model_version,
            usage: Self::parse_usage(&payload),
        })
    }

    async fn embed(
        &self,
        inputs: &[String],
        model_id: &str,
    ) -> Result<Vec<Vec<f32>>, PipelineError> {
        let url = format!("{}/embeddings", self.base_url);

        let body = json!({
            "model": model_id,
            "input": inputs,
        });

        let res = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(PipelineError::embedding)?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(PipelineError::Embedding(format!(
                "embeddings returned {}: {}",
                status, text
            )));
        }

        let payload: Value = res.json().await.map_err(PipelineError::embedding)?;

        let mut embeddings = Vec::new();
        if let Some(data) = payload["data"].as_array() {
            for item in data {
                if let Some(vals) = item["embedding"].as_array() {
                    let vec: Vec<f32> = vals
                        .iter()
                        .filter_map(|v| v.as_f64().map(|f| f as f32))
                        .collect();
                    embeddings.push(vec);
                }
            }
        }

        if embeddings.len() != inputs.len() {
            return Err(PipelineError::Embedding(format!(
                "expected {} embeddings, provider returned {}",
                inputs.len(),
                embeddings.len()
            )));
        }

        Ok(embeddings)
    }
}
