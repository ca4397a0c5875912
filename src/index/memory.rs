use std::path::Path;

use async_trait::async_trait;

use crate::index::{cosine_similarity, IndexEntry, IndexError, ScoredChunk, VectorStore};

/// Vec-backed vector store. Default backend for single-report sessions; can
/// persist itself to a JSON file so an ingested report survives restarts.
#[derive(Default)]
pub struct MemoryStore {
    entries: Vec<IndexEntry>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Round-trips (chunk id, text, page, offsets, vector) losslessly.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, IndexError> {
        let bytes = std::fs::read(path.as_ref())
            .map_err(|e| IndexError::Unavailable(format!("{}: {}", path.as_ref().display(), e)))?;
        let entries: Vec<IndexEntry> =
            serde_json::from_slice(&bytes).map_err(|e| IndexError::Store(e.to_string()))?;
        Ok(Self { entries })
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), IndexError> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent).map_err(|e| IndexError::Store(e.to_string()))?;
        }
        let bytes =
            serde_json::to_vec(&self.entries).map_err(|e| IndexError::Store(e.to_string()))?;
        std::fs::write(path.as_ref(), bytes).map_err(|e| IndexError::Store(e.to_string()))
    }
}

#[async_trait]
impl VectorStore for MemoryStore {
    async fn upsert(&mut self, entries: Vec<IndexEntry>) -> Result<(), IndexError> {
        for entry in entries {
            match self
                .entries
                .iter_mut()
                .find(|e| e.chunk.id == entry.chunk.id)
            {
                Some(existing) => *existing = entry,
                None => self.entries.push(entry),
            }
        }
        Ok(())
    }

    async fn search(&self, vector: &[f32], k: usize) -> Result<Vec<ScoredChunk>, IndexError> {
        let mut scored: Vec<ScoredChunk> = self
            .entries
            .iter()
            .map(|entry| ScoredChunk {
                chunk: entry.chunk.clone(),
                similarity: cosine_similarity(vector, &entry.vector),
            })
            .collect();

        // Stable sort: equal similarities keep insertion order.
        scored.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(k);
        Ok(scored)
    }

    async fn len(&self) -> Result<usize, IndexError> {
        Ok(self.entries.len())
    }

    async fn remove_document(&mut self, document_id: &str) -> Result<(), IndexError> {
        self.entries.retain(|e| e.chunk.document_id != document_id);
        Ok(())
    }

    async fn persist(&self, path: &Path) -> Result<(), IndexError> {
        self.save(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Chunk;

    fn entry(id: &str, doc: &str, vector: Vec<f32>) -> IndexEntry {
        IndexEntry {
            chunk: Chunk {
                id: id.to_string(),
                document_id: doc.to_string(),
                page: 1,
                start: 0,
                end: 4,
                text: "text".to_string(),
            },
            vector,
        }
    }

    #[tokio::test]
    async fn upsert_replaces_by_chunk_id() {
        let mut store = MemoryStore::new();
        store
            .upsert(vec![entry("a", "d", vec![1.0, 0.0])])
            .await
            .unwrap();
        store
            .upsert(vec![entry("a", "d", vec![0.0, 1.0])])
            .await
            .unwrap();
        assert_eq!(store.len().await.unwrap(), 1);
        assert_eq!(store.entries[0].vector, vec![0.0, 1.0]);
    }

    #[tokio::test]
    async fn search_returns_corpus_when_smaller_than_k() {
        let mut store = MemoryStore::new();
        store
            .upsert(vec![
                entry("a", "d", vec![1.0, 0.0]),
                entry("b", "d", vec![0.9, 0.1]),
                entry("c", "d", vec![0.0, 1.0]),
            ])
            .await
            .unwrap();

        let hits = store.search(&[1.0, 0.0], 5).await.unwrap();
        assert_eq!(hits.len(), 3);
        for pair in hits.windows(2) {
            assert!(pair[0].similarity >= pair[1].similarity);
        }
        assert_eq!(hits[0].chunk.id, "a");
    }

    #[tokio::test]
    async fn ties_keep_insertion_order() {
        let mut store = MemoryStore::new();
        store
            .upsert(vec![
                entry("first", "d", vec![1.0, 0.0]),
                entry("second", "d", vec![1.0, 0.0]),
            ])
            .await
            .unwrap();
        let hits = store.search(&[1.0, 0.0], 2).await.unwrap();
        assert_eq!(hits[0].chunk.id, "first");
        assert_eq!(hits[1].chunk.id, "second");
    }

    #[tokio::test]
    async fn remove_document_drops_only_that_document() {
        let mut store = MemoryStore::new();
        store
            .upsert(vec![
                entry("a", "one", vec![1.0, 0.0]),
                entry("b", "two", vec![0.0, 1.0]),
            ])
            .await
            .unwrap();
        store.remove_document("one").await.unwrap();
        assert_eq!(store.len().await.unwrap(), 1);
        assert_eq!(store.entries[0].chunk.document_id, "two");
    }

    #[tokio::test]
    async fn save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.json");

        let mut store = MemoryStore::new();
        store
            .upsert(vec![entry("a", "d", vec![0.25, 0.75])])
            .await
            .unwrap();
        store.save(&path).unwrap();

        let loaded = MemoryStore::load(&path).unwrap();
        assert_eq!(loaded.len().await.unwrap(), 1);
        assert_eq!(loaded.entries[0].chunk.id, "a");
        assert_eq!(loaded.entries[0].vector, vec![0.25, 0.75]);
    }
}
