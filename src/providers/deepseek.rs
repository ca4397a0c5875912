use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use crate::config::AppConfig;
use crate::providers::traits::{CompletionProvider, GenerationError};
use crate::providers::ProviderError;

/// DeepSeek chat completions. Embeddings still come from the OpenAI-compatible
/// endpoint; this backend only generates text.
#[derive(Clone)]
pub struct DeepSeekProvider {
    api_key: String,
    api_url: String,
    client: Client,
    model: String,
    timeout_secs: u64,
}

impl DeepSeekProvider {
    pub fn from_config(config: &AppConfig) -> Result<Self, ProviderError> {
        let api_key = config
            .deepseek_api_key
            .clone()
            .ok_or_else(|| ProviderError::MissingApiKey("DEEPSEEK_API_KEY".to_string()))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| ProviderError::ClientBuild(e.to_string()))?;

        Ok(Self {
            api_key,
            api_url: config.deepseek_api_url.clone(),
            client,
            model: config.chat_model.clone(),
            timeout_secs: config.request_timeout_secs,
        })
    }
}

#[async_trait]
impl CompletionProvider for DeepSeekProvider {
    async fn complete(&self, prompt: &str) -> Result<String, GenerationError> {
        let response = self
            .client
            .post(&self.api_url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&json!({
                "model": self.model,
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

        if let Some(error) = body.get("error") {
            return Err(GenerationError::Backend(error.to_string()));
        }

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
        &self.model
    }
}
