use thiserror::Error;

use crate::document::{Chunk, Document, Page};

#[derive(Error, Debug)]
pub enum ChunkConfigError {
    #[error("chunk_size must be greater than zero")]
    ZeroChunkSize,
    #[error("overlap ({overlap}) must be smaller than chunk_size ({chunk_size})")]
    OverlapTooLarge { chunk_size: usize, overlap: usize },
}

/// Chunk sizes are in characters. Overlap is carried between consecutive
/// chunks of the same page; chunks never cross a page boundary.
#[derive(Debug, Clone, Copy)]
pub struct ChunkConfig {
    pub chunk_size: usize,
    pub overlap: usize,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            overlap: 200,
        }
    }
}

impl ChunkConfig {
    pub fn validate(&self) -> Result<(), ChunkConfigError> {
        if self.chunk_size == 0 {
            return Err(ChunkConfigError::ZeroChunkSize);
        }
        if self.overlap >= self.chunk_size {
            return Err(ChunkConfigError::OverlapTooLarge {
                chunk_size: self.chunk_size,
                overlap: self.overlap,
            });
        }
        Ok(())
    }
}

/// Splits every page of a document into overlapping chunks with stable
/// (document, page, char-offset) provenance. Purely deterministic: the same
/// document and config always produce the same sequence.
pub fn chunk_document(
    document: &Document,
    config: &ChunkConfig,
) -> Result<Vec<Chunk>, ChunkConfigError> {
    config.validate()?;

    let mut chunks = Vec::new();
    for page in &document.pages {
        chunk_page(&document.id, page, config, &mut chunks);
    }

    log::debug!(
        "chunked {} into {} chunks (size={}, overlap={})",
        document.id,
        chunks.len(),
        config.chunk_size,
        config.overlap
    );

    Ok(chunks)
}

fn chunk_page(document_id: &str, page: &Page, config: &ChunkConfig, out: &mut Vec<Chunk>) {
    let chars: Vec<char> = page.text.chars().collect();
    let len = chars.len();
    let mut start = 0usize;

    while start < len {
        let mut end = (start + config.chunk_size).min(len);

        // Prefer to cut at the last sentence or paragraph break, as long as
        // it lies past the middle of the window.
        if end < len {
            let window = &chars[start..end];
            let break_at = window
                .iter()
                .rposition(|&c| c == '.' || c == '\n')
                .filter(|&pos| pos > config.chunk_size / 2);
            if let Some(pos) = break_at {
                end = start + pos + 1;
            }
        }

        // Shrink to the non-whitespace core so offsets stay exact without
        // storing padded text.
        let mut text_start = start;
        let mut text_end = end;
        while text_start < text_end && chars[text_start].is_whitespace() {
            text_start += 1;
        }
        while text_end > text_start && chars[text_end - 1].is_whitespace() {
            text_end -= 1;
        }

        if text_start < text_end {
            let text: String = chars[text_start..text_end].iter().collect();
            out.push(Chunk {
                id: format!("{}:p{}:{}", document_id, page.number, text_start),
                document_id: document_id.to_string(),
                page: page.number,
                start: text_start,
                end: text_end,
                text,
            });
        }

        if end >= len {
            break;
        }
        let next = end.saturating_sub(config.overlap);
        if next <= start {
            // Overlap would stall the window on short tail segments.
            start = end;
        } else {
            start = next;
        }
    }
}
