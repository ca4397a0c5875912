//! Deterministic offline stand-ins for the network backends, used by unit
//! tests so retrieval ranking can be exercised without an embedding service.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use async_trait::async_trait;

use crate::document::{chunk_document, ChunkConfig, Document, Page};
use crate::index::{EmbeddingIndex, MemoryStore};
use crate::providers::traits::{EmbeddingError, EmbeddingProvider};
use std::sync::Arc;

const DIMENSION: usize = 256;

/// Bag-of-words hashing embedder: token overlap drives cosine similarity,
/// which is enough to rank passages for tests. Tokens are lowercased and
/// truncated to six chars so "neutrality" and "neutral" land together.
pub(crate) struct HashEmbedder;

fn stem(token: &str) -> String {
    token.chars().take(6).collect()
}

#[async_trait]
impl EmbeddingProvider for HashEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        if text.trim().is_empty() {
            return Err(EmbeddingError::EmptyInput);
        }
        let mut vector = vec![0.0f32; DIMENSION];
        for token in text
            .to_lowercase()
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let mut hasher = DefaultHasher::new();
            stem(token).hash(&mut hasher);
            vector[(hasher.finish() % DIMENSION as u64) as usize] += 1.0;
        }
        Ok(vector)
    }

    fn dimension(&self) -> usize {
        DIMENSION
    }

    fn model_id(&self) -> &str {
        "hash-embedder"
    }
}

pub(crate) fn document_from_pages(id: &str, pages: &[&str]) -> Document {
    Document {
        id: id.to_string(),
        source_file: format!("{id}.pdf"),
        pages: pages
            .iter()
            .enumerate()
            .map(|(i, text)| Page {
                number: (i + 1) as u32,
                text: text.to_string(),
            })
            .collect(),
    }
}

/// Chunks and indexes a synthetic document into a fresh in-memory index.
pub(crate) async fn indexed_document(id: &str, pages: &[&str]) -> EmbeddingIndex {
    let document = document_from_pages(id, pages);
    let chunks = chunk_document(&document, &ChunkConfig::default()).unwrap();
    let mut index = EmbeddingIndex::new(Box::new(MemoryStore::new()), Arc::new(HashEmbedder));
    index.add_chunks(&chunks).await.unwrap();
    index
}
