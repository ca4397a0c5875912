use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EmbeddingError {
    #[error("embedding backend failure: {0}")]
    Backend(String),
    #[error("embedding request timed out after {0}s")]
    Timeout(u64),
    #[error("embedding dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },
    #[error("cannot embed empty text")]
    EmptyInput,
}

#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("language model backend failure: {0}")]
    Backend(String),
    #[error("language model request timed out after {0}s")]
    Timeout(u64),
    #[error("model response did not match the expected contract: {0}")]
    MalformedResponse(String),
}

/// Prompt in, text out. The caller decides whether a failure is retried;
/// implementations never retry silently.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, GenerationError>;

    fn model_id(&self) -> &str;
}

/// Text in, vector out. Index and queries must share one implementation so
/// similarity scores stay comparable.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;

    /// Expected vector dimensionality; anything else from the backend is
    /// rejected as malformed.
    fn dimension(&self) -> usize;

    fn model_id(&self) -> &str;
}
