pub mod memory;
pub mod qdrant;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::document::Chunk;
use crate::providers::traits::{EmbeddingError, EmbeddingProvider};

pub use memory::MemoryStore;
pub use qdrant::QdrantStore;

#[derive(Error, Debug)]
pub enum IndexError {
    #[error(transparent)]
    Embedding(#[from] EmbeddingError),
    #[error("k must be at least 1")]
    InvalidK,
    #[error("vector store operation failed: {0}")]
    Store(String),
    #[error("index is unavailable: {0}")]
    Unavailable(String),
}

/// One indexed chunk with its embedding. Keyed by chunk id; upserting the
/// same id replaces the entry, which is what makes re-ingestion idempotent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexEntry {
    pub chunk: Chunk,
    pub vector: Vec<f32>,
}

/// A retrieval hit: a chunk and its similarity to the query.
#[derive(Debug, Clone)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    pub similarity: f32,
}

#[async_trait]
pub trait VectorStore: Send + Sync {
    async fn upsert(&mut self, entries: Vec<IndexEntry>) -> Result<(), IndexError>;

    /// Nearest neighbours by cosine similarity, best first. Ties keep
    /// insertion order.
    async fn search(&self, vector: &[f32], k: usize) -> Result<Vec<ScoredChunk>, IndexError>;

    async fn len(&self) -> Result<usize, IndexError>;

    async fn remove_document(&mut self, document_id: &str) -> Result<(), IndexError>;

    /// Flushes to durable storage. Stores that are already durable (Qdrant)
    /// keep the default no-op.
    async fn persist(&self, _path: &std::path::Path) -> Result<(), IndexError> {
        Ok(())
    }
}

/// Embeds chunks and queries with one shared provider and delegates vector
/// storage to the configured backend. Using different models for indexing
/// and querying is a configuration error this type makes impossible.
pub struct EmbeddingIndex {
    store: Box<dyn VectorStore>,
    embedder: Arc<dyn EmbeddingProvider>,
}

impl EmbeddingIndex {
    pub fn new(store: Box<dyn VectorStore>, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self { store, embedder }
    }

    pub fn embedding_model(&self) -> &str {
        self.embedder.model_id()
    }

    /// Embeds and upserts every chunk. Fails fast on the first backend or
    /// dimensionality error; nothing is silently skipped.
    pub async fn add_chunks(&mut self, chunks: &[Chunk]) -> Result<usize, IndexError> {
        let mut entries = Vec::with_capacity(chunks.len());
        for chunk in chunks {
            let vector = self.embedder.embed(&chunk.text).await?;
            if vector.len() != self.embedder.dimension() {
                return Err(EmbeddingError::DimensionMismatch {
                    expected: self.embedder.dimension(),
                    got: vector.len(),
                }
                .into());
            }
            entries.push(IndexEntry {
                chunk: chunk.clone(),
                vector,
            });
        }

        let count = entries.len();
        self.store.upsert(entries).await?;
        log::info!("indexed {} chunks", count);
        Ok(count)
    }

    /// Embeds `text` with the indexing model and returns up to k nearest
    /// chunks, highest similarity first. A corpus smaller than k returns
    /// everything.
    pub async fn query(&self, text: &str, k: usize) -> Result<Vec<ScoredChunk>, IndexError> {
        if k == 0 {
            return Err(IndexError::InvalidK);
        }
        let vector = self.embedder.embed(text).await?;
        self.store.search(&vector, k).await
    }

    pub async fn len(&self) -> Result<usize, IndexError> {
        self.store.len().await
    }

    pub async fn is_empty(&self) -> Result<bool, IndexError> {
        Ok(self.store.len().await? == 0)
    }

    pub async fn remove_document(&mut self, document_id: &str) -> Result<(), IndexError> {
        self.store.remove_document(document_id).await
    }

    pub async fn persist(&self, path: &std::path::Path) -> Result<(), IndexError> {
        self.store.persist(path).await
    }
}

pub(crate) fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}
