pub mod chunker;
pub mod loader;

use serde::{Deserialize, Serialize};

pub use chunker::{chunk_document, ChunkConfig, ChunkConfigError};
pub use loader::{load_pdf, load_pdf_bytes, LoadError};

/// A loaded report. Immutable once constructed by the loader.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub source_file: String,
    pub pages: Vec<Page>,
}

impl Document {
    pub fn page(&self, number: u32) -> Option<&Page> {
        self.pages.iter().find(|p| p.number == number)
    }

    pub fn char_count(&self) -> usize {
        self.pages.iter().map(|p| p.text.chars().count()).sum()
    }
}

/// One physical page, 1-indexed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page {
    pub number: u32,
    pub text: String,
}

/// A bounded passage of one page, the unit of retrieval.
///
/// The offset range always slices back to `text` within the owning page,
/// so every citation can be verified against the source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    pub id: String,
    pub document_id: String,
    pub page: u32,
    pub start: usize,
    pub end: usize,
    pub text: String,
}

impl Chunk {
    pub fn citation(&self) -> Citation {
        Citation {
            document_id: self.document_id.clone(),
            page: self.page,
            excerpt: self.text.clone(),
        }
    }
}

/// (document, page, excerpt) triple surfaced to justify an answer or finding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Citation {
    pub document_id: String,
    pub page: u32,
    pub excerpt: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_citation_carries_provenance() {
        let chunk = Chunk {
            id: "report:p4:0".to_string(),
            document_id: "report".to_string(),
            page: 4,
            start: 0,
            end: 11,
            text: "some claims".to_string(),
        };
        let citation = chunk.citation();
        assert_eq!(citation.document_id, "report");
        assert_eq!(citation.page, 4);
        assert_eq!(citation.excerpt, "some claims");
    }
}
