use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use crate::config::AppConfig;
use crate::providers::traits::{
    CompletionProvider, EmbeddingError, EmbeddingProvider, GenerationError,
};
use crate::providers::ProviderError;

/// OpenAI-compatible backend for both chat completions and embeddings.
#[derive(Clone)]
pub struct OpenAiProvider {
    api_key: String,
    base_url: String,
    client: Client,
    chat_model: String,
    embedding_model: String,
    embedding_dimension: usize,
    timeout_secs: u64,
}

impl OpenAiProvider {
    pub fn from_config(config: &AppConfig) -> Result<Self, ProviderError> {
        let api_key = config
            .openai_api_key
            .clone()
            .ok_or_else(|| ProviderError::MissingApiKey("OPENAI_API_KEY".to_string()))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| ProviderError::ClientBuild(e.to_string()))?;

        Ok(Self {
            api_key,
            base_url: config.openai_api_url.clone(),
            client,
            chat_model: config.chat_model.clone(),
            embedding_model: config.embedding_model.clone(),
            embedding_dimension: config.embedding_dimension,
            timeout_secs: config.request_timeout_secs,
        })
    }
}

#[async_trait]
impl CompletionProvider for OpenAiProvider {
    async fn complete(&self, prompt: &str) -> Result<String, GenerationError> {
        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&json!({
                "model": self.chat_model,
                "messages": [
                    { "role": "user", "content": prompt }
                ],
                "temperature": 0.15
            }))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    GenerationError::Timeout(self.timeout_secs)
                } else {
                    GenerationError::Backend(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GenerationError::Backend(format!(
                "status {}: {}",
                status, body
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| GenerationError::Backend(e.to_string()))?;

        body.get("choices")
            .and_then(|choices| choices.get(0))
            .and_then(|choice| choice.get("message"))
            .and_then(|message| message.get("content"))
            .and_then(|content| content.as_str())
            .map(|s| s.to_string())
            .ok_or_else(|| {
                GenerationError::MalformedResponse(format!(
                    "no message content in completion response: {}",
                    body
                ))
            })
    }

    fn model_id(&self) -> &str {
        &self.chat_model
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        if text.trim().is_empty() {
            return Err(EmbeddingError::EmptyInput);
        }

        let response = self
            .client
            .post(format!("{}/embeddings", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&json!({
                "model": self.embedding_model,
                "input": text
            }))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    EmbeddingError::Timeout(self.timeout_secs)
                } else {
                    EmbeddingError::Backend(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EmbeddingError::Backend(format!(
                "status {}: {}",
                status, body
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| EmbeddingError::Backend(e.to_string()))?;

        let vector: Vec<f32> = body
            .get("data")
            .and_then(|data| data.get(0))
            .and_then(|entry| entry.get("embedding"))
            .and_then(|embedding| embedding.as_array())
            .ok_or_else(|| EmbeddingError::Backend("no embedding in response".to_string()))?
            .iter()
            .filter_map(|v| v.as_f64().map(|f| f as f32))
            .collect();

        if vector.len() != self.embedding_dimension {
            return Err(EmbeddingError::DimensionMismatch {
                expected: self.embedding_dimension,
                got: vector.len(),
            });
        }

        Ok(vector)
    }

    fn dimension(&self) -> usize {
        self.embedding_dimension
    }

    fn model_id(&self) -> &str {
        &self.embedding_model
    }
}
