use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tokio::sync::RwLock;

use crate::analysis::{
    CancelFlag, GreenwashingAnalyzer, GreenwashingFinding, MetricCatalog, RuleSet, ScanError,
    ScoringEngine, ScoringError, SustainabilityScore,
};
use crate::config::AppConfig;
use crate::document::{
    chunk_document, load_pdf, load_pdf_bytes, ChunkConfig, ChunkConfigError, Document, LoadError,
};
use crate::index::{EmbeddingIndex, IndexError, MemoryStore, QdrantStore};
use crate::providers::traits::{CompletionProvider, GenerationError};
use crate::providers::{completion_provider, embedding_provider, ProviderError};
use crate::rag::{Answer, AnswerGenerator, Retriever};

#[derive(Error, Debug)]
pub enum SessionError {
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error(transparent)]
    Chunk(#[from] ChunkConfigError),
    #[error(transparent)]
    Index(#[from] IndexError),
    #[error(transparent)]
    Generation(#[from] GenerationError),
    #[error(transparent)]
    Scan(#[from] ScanError),
    #[error(transparent)]
    Scoring(#[from] ScoringError),
    #[error(transparent)]
    Provider(#[from] ProviderError),
}

/// Tuning knobs the session hands to retrieval and the analyzers.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub chunk: ChunkConfig,
    pub retrieval_k: usize,
    pub similarity_floor: f32,
    /// Where the in-memory store flushes after ingestion; None disables
    /// persistence.
    pub index_path: Option<PathBuf>,
}

impl SessionOptions {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            chunk: ChunkConfig {
                chunk_size: config.chunk_size,
                overlap: config.chunk_overlap,
            },
            retrieval_k: config.retrieval_k,
            similarity_floor: config.similarity_floor,
            index_path: match config.qdrant_url {
                Some(_) => None,
                None => Some(PathBuf::from(&config.index_path)),
            },
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct IngestSummary {
    pub document_id: String,
    pub source_file: String,
    pub pages: usize,
    pub chunks: usize,
}

/// The single core handle behind every front-end: owns the index, the
/// backends and the loaded documents, and exposes ingest / ask / scan /
/// score. Ingestion takes the write lock; everything else reads, so
/// concurrent queries against an ingested report run without coordination.
pub struct AnalysisSession {
    options: SessionOptions,
    index: RwLock<EmbeddingIndex>,
    documents: RwLock<HashMap<String, (Document, IngestSummary)>>,
    generator: AnswerGenerator,
    analyzer: GreenwashingAnalyzer,
    scorer: ScoringEngine,
}

impl AnalysisSession {
    /// Builds a session from environment configuration: resolves providers
    /// by name and picks Qdrant or the persisted in-memory store.
    pub async fn connect(config: &AppConfig) -> Result<Self, SessionError> {
        let embedder = embedding_provider(config)?;
        let completion = completion_provider(config)?;

        let index = match &config.qdrant_url {
            Some(url) => {
                let store =
                    QdrantStore::connect(url, "esg_chunks", config.embedding_dimension as u64)
                        .await?;
                EmbeddingIndex::new(Box::new(store), embedder)
            }
            None => {
                let store = if Path::new(&config.index_path).exists() {
                    MemoryStore::load(&config.index_path)?
                } else {
                    MemoryStore::new()
                };
                EmbeddingIndex::new(Box::new(store), embedder)
            }
        };

        log::info!(
            "session ready (embedding model {}, store {})",
            index.embedding_model(),
            if config.qdrant_url.is_some() {
                "qdrant"
            } else {
                "memory"
            }
        );

        Ok(Self::from_parts(
            SessionOptions::from_config(config),
            index,
            completion,
        ))
    }

    /// Explicit assembly for callers that already hold an index and a
    /// completion backend.
    pub fn from_parts(
        options: SessionOptions,
        index: EmbeddingIndex,
        completion: Arc<dyn CompletionProvider>,
    ) -> Self {
        let analyzer =
            GreenwashingAnalyzer::new(RuleSet::default(), options.retrieval_k, options.similarity_floor);
        let scorer = ScoringEngine::new(
            MetricCatalog::default(),
            options.retrieval_k,
            options.similarity_floor,
        );
        Self {
            options,
            index: RwLock::new(index),
            documents: RwLock::new(HashMap::new()),
            generator: AnswerGenerator::new(completion),
            analyzer,
            scorer,
        }
    }

    pub async fn ingest(&self, path: impl AsRef<Path>) -> Result<IngestSummary, SessionError> {
        let document = load_pdf(path)?;
        self.ingest_document(document).await
    }

    pub async fn ingest_bytes(
        &self,
        bytes: &[u8],
        source_file: &str,
    ) -> Result<IngestSummary, SessionError> {
        let document = load_pdf_bytes(bytes, source_file)?;
        self.ingest_document(document).await
    }

    /// Replace semantics: any previously indexed chunks of the same document
    /// are dropped before the new ones go in, so re-ingestion never leaves
    /// duplicates or stale entries behind.
    pub async fn ingest_document(&self, document: Document) -> Result<IngestSummary, SessionError> {
        let chunks = chunk_document(&document, &self.options.chunk)?;

        let mut index = self.index.write().await;
        index.remove_document(&document.id).await?;
        let indexed = index.add_chunks(&chunks).await?;

        if let Some(path) = &self.options.index_path {
            index.persist(path).await?;
        }
        drop(index);

        let summary = IngestSummary {
            document_id: document.id.clone(),
            source_file: document.source_file.clone(),
            pages: document.pages.len(),
            chunks: indexed,
        };
        self.documents
            .write()
            .await
            .insert(document.id.clone(), (document, summary.clone()));

        log::info!(
            "ingested {} ({} pages, {} chunks)",
            summary.source_file,
            summary.pages,
            summary.chunks
        );
        Ok(summary)
    }

    pub async fn ask(&self, question: &str) -> Result<Answer, SessionError> {
        let index = self.index.read().await;
        let retriever = Retriever::new(&index);
        let retrieved = retriever
            .retrieve(question, self.options.retrieval_k, self.options.similarity_floor)
            .await?;
        let answer = self.generator.answer(question, &retrieved).await?;
        Ok(answer)
    }

    pub async fn scan(
        &self,
        cancel: &CancelFlag,
    ) -> Result<Vec<GreenwashingFinding>, SessionError> {
        let index = self.index.read().await;
        Ok(self.analyzer.scan(&index, cancel).await?)
    }

    pub async fn score(&self, cancel: &CancelFlag) -> Result<SustainabilityScore, SessionError> {
        let index = self.index.read().await;
        Ok(self.scorer.score(&index, cancel).await?)
    }

    pub async fn indexed_chunks(&self) -> Result<usize, SessionError> {
        Ok(self.index.read().await.len().await?)
    }

    pub async fn documents(&self) -> Vec<IngestSummary> {
        let mut summaries: Vec<IngestSummary> = self
            .documents
            .read()
            .await
            .values()
            .map(|(_, summary)| summary.clone())
            .collect();
        summaries.sort_by(|a, b| a.document_id.cmp(&b.document_id));
        summaries
    }

    /// Verifies a citation against the loaded source: the excerpt must be a
    /// substring of the cited page.
    pub async fn verify_citation(&self, citation: &crate::document::Citation) -> bool {
        let documents = self.documents.read().await;
        documents
            .get(&citation.document_id)
            .and_then(|(document, _)| document.page(citation.page))
            .map(|page| page.text.contains(&citation.excerpt))
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::MemoryStore;
    use crate::providers::traits::CompletionProvider;
    use crate::testutil::{document_from_pages, HashEmbedder};
    use async_trait::async_trait;

    struct CannedProvider(String);

    #[async_trait]
    impl CompletionProvider for CannedProvider {
        async fn complete(&self, _prompt: &str) -> Result<String, GenerationError> {
            Ok(self.0.clone())
        }

        fn model_id(&self) -> &str {
            "canned"
        }
    }

    fn session(reply: &str) -> AnalysisSession {
        let index = EmbeddingIndex::new(Box::new(MemoryStore::new()), Arc::new(HashEmbedder));
        AnalysisSession::from_parts(
            SessionOptions {
                chunk: ChunkConfig::default(),
                retrieval_k: 5,
                similarity_floor: 0.1,
                index_path: None,
            },
            index,
            Arc::new(CannedProvider(reply.to_string())),
        )
    }

    #[tokio::test]
    async fn reingesting_the_same_document_does_not_duplicate() {
        let s = session("{}");
        let document = document_from_pages(
            "report",
            &["Scope 1 emissions were 12 tonnes.", "Board of directors."],
        );

        let first = s.ingest_document(document.clone()).await.unwrap();
        let second = s.ingest_document(document).await.unwrap();

        assert_eq!(first.chunks, second.chunks);
        assert_eq!(s.indexed_chunks().await.unwrap(), second.chunks);
    }

    #[tokio::test]
    async fn answer_citations_verify_against_the_source_pages() {
        let reply = r#"{"answer": "Emissions were 12 tonnes.", "citations": [1]}"#;
        let s = session(reply);
        s.ingest_document(document_from_pages(
            "report",
            &["Scope 1 emissions were 12 tonnes in 2023."],
        ))
        .await
        .unwrap();

        let answer = s.ask("what were scope 1 emissions?").await.unwrap();
        for citation in &answer.citations {
            assert!(s.verify_citation(citation).await);
        }

        let fabricated = crate::document::Citation {
            document_id: "report".to_string(),
            page: 1,
            excerpt: "text that never appeared in the report".to_string(),
        };
        assert!(!s.verify_citation(&fabricated).await);
    }

    #[tokio::test]
    async fn ask_returns_cited_answer_from_ingested_report() {
        let reply = r#"{"answer": "Emissions were 12 tonnes.", "citations": [1]}"#;
        let s = session(reply);
        s.ingest_document(document_from_pages(
            "report",
            &["Scope 1 emissions were 12 tonnes in 2023."],
        ))
        .await
        .unwrap();

        let answer = s.ask("what were scope 1 emissions?").await.unwrap();
        assert!(!answer.insufficient_context);
        assert_eq!(answer.citations.len(), 1);
        assert_eq!(answer.citations[0].document_id, "report");
    }

    #[tokio::test]
    async fn ask_with_no_relevant_context_is_explicit() {
        let s = session("{}");
        s.ingest_document(document_from_pages("report", &["Purely financial disclosures."]))
            .await
            .unwrap();

        let answer = s.ask("zzz unrelated question qqq").await.unwrap();
        assert!(answer.insufficient_context);
        assert!(answer.citations.is_empty());
    }

    #[tokio::test]
    async fn scan_and_score_run_against_the_shared_index() {
        let s = session("{}");
        s.ingest_document(document_from_pages(
            "report",
            &["We are committed to being carbon neutral by an unspecified future date."],
        ))
        .await
        .unwrap();

        let findings = s.scan(&CancelFlag::new()).await.unwrap();
        assert!(!findings.is_empty());

        let score = s.score(&CancelFlag::new()).await.unwrap();
        assert!(score.overall >= 0.0 && score.overall <= 100.0);
    }
}
