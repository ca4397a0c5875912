pub mod generator;
pub mod retriever;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::document::Citation;
use crate::index::ScoredChunk;

pub use generator::AnswerGenerator;
pub use retriever::Retriever;

/// Ranked retrieval hits for one query, best first. An empty result is a
/// designed outcome ("nothing relevant found"), not an error.
#[derive(Debug, Clone, Default)]
pub struct RetrievalResult {
    pub query: String,
    pub hits: Vec<ScoredChunk>,
}

impl RetrievalResult {
    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    pub fn len(&self) -> usize {
        self.hits.len()
    }
}

/// A generated answer with the citations that back it. Every citation maps
/// to a chunk that was in the retrieval set handed to the generator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Answer {
    pub query: String,
    pub text: String,
    pub citations: Vec<Citation>,
    pub insufficient_context: bool,
    pub generated_at: DateTime<Utc>,
}
