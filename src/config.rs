use std::env;

/// Runtime configuration, resolved once from the environment (`.env` is
/// loaded by `main` before this runs). Credentials never live in the core
/// pipeline; they are read here and handed to the providers.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Which chat backend answers questions: "openai" or "deepseek".
    pub completion_provider: String,
    pub chat_model: String,
    pub embedding_model: String,
    pub embedding_dimension: usize,

    pub openai_api_key: Option<String>,
    pub openai_api_url: String,
    pub deepseek_api_key: Option<String>,
    pub deepseek_api_url: String,

    /// gRPC URL of a Qdrant instance; unset means the in-memory store.
    pub qdrant_url: Option<String>,
    /// Where the in-memory store persists between runs.
    pub index_path: String,

    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub retrieval_k: usize,
    pub similarity_floor: f32,
    pub request_timeout_secs: u64,

    pub bind_addr: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            completion_provider: env::var("COMPLETION_PROVIDER")
                .unwrap_or_else(|_| "openai".to_string()),
            chat_model: env::var("CHAT_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string()),
            embedding_model: env::var("EMBEDDING_MODEL")
                .unwrap_or_else(|_| "text-embedding-3-small".to_string()),
            embedding_dimension: parse_env("EMBEDDING_DIMENSION", 1536),
            openai_api_key: env::var("OPENAI_API_KEY").ok(),
            openai_api_url: env::var("OPENAI_API_URL")
                .unwrap_or_else(|_| "https://api.openai.com/v1".to_string()),
            deepseek_api_key: env::var("DEEPSEEK_API_KEY").ok(),
            deepseek_api_url: env::var("DEEPSEEK_API_URL")
                .unwrap_or_else(|_| "https://api.deepseek.com/v1/chat/completions".to_string()),
            qdrant_url: env::var("QDRANT_URL").ok(),
            index_path: env::var("INDEX_PATH").unwrap_or_else(|_| "data/index.json".to_string()),
            chunk_size: parse_env("CHUNK_SIZE", 1000),
            chunk_overlap: parse_env("CHUNK_OVERLAP", 200),
            retrieval_k: parse_env("RETRIEVAL_K", 5),
            similarity_floor: parse_env("SIMILARITY_FLOOR", 0.25),
            request_timeout_secs: parse_env("REQUEST_TIMEOUT_SECS", 60),
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string()),
        }
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
