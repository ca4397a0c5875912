pub mod deepseek;
pub mod openai;
pub mod traits;

use std::sync::Arc;

use thiserror::Error;

use crate::config::AppConfig;
use deepseek::DeepSeekProvider;
use openai::OpenAiProvider;
use traits::{CompletionProvider, EmbeddingProvider};

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("unknown completion provider: {0} (expected \"openai\" or \"deepseek\")")]
    UnknownProvider(String),
    #[error("missing API key: set {0}")]
    MissingApiKey(String),
    #[error("failed to build HTTP client: {0}")]
    ClientBuild(String),
}

/// Resolves the configured completion backend by name.
pub fn completion_provider(
    config: &AppConfig,
) -> Result<Arc<dyn CompletionProvider>, ProviderError> {
    match config.completion_provider.as_str() {
        "openai" => Ok(Arc::new(OpenAiProvider::from_config(config)?)),
        "deepseek" => Ok(Arc::new(DeepSeekProvider::from_config(config)?)),
        other => Err(ProviderError::UnknownProvider(other.to_string())),
    }
}

/// Embeddings always go through the OpenAI-compatible endpoint; the index
/// enforces that the same model embeds both chunks and queries.
pub fn embedding_provider(
    config: &AppConfig,
) -> Result<Arc<dyn EmbeddingProvider>, ProviderError> {
    Ok(Arc::new(OpenAiProvider::from_config(config)?))
}
