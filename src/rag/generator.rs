use std::sync::Arc;

use chrono::Utc;
use serde::Deserialize;

use crate::providers::traits::{CompletionProvider, GenerationError};
use crate::rag::{Answer, RetrievalResult};

const INSUFFICIENT_MESSAGE: &str =
    "The indexed report does not contain enough information to answer this question.";

/// What the model must return. Anything that does not parse into this shape
/// is a `GenerationError::MalformedResponse`, never best-effort scraping.
#[derive(Debug, Deserialize)]
struct ModelReply {
    answer: String,
    #[serde(default)]
    citations: Vec<usize>,
    #[serde(default)]
    insufficient_context: bool,
}

/// Turns a query plus pre-fetched context into a grounded, cited answer.
/// Has no dependency on retrieval internals; the caller supplies the hits.
pub struct AnswerGenerator {
    provider: Arc<dyn CompletionProvider>,
}

impl AnswerGenerator {
    pub fn new(provider: Arc<dyn CompletionProvider>) -> Self {
        Self { provider }
    }

    pub async fn answer(
        &self,
        query: &str,
        retrieved: &RetrievalResult,
    ) -> Result<Answer, GenerationError> {
        if retrieved.is_empty() {
            // Nothing cleared the similarity floor; say so instead of asking
            // the model to improvise.
            return Ok(insufficient_answer(query));
        }

        let prompt = build_prompt(query, retrieved);
        let raw = self.provider.complete(&prompt).await?;
        parse_response(query, &raw, retrieved)
    }
}

pub(crate) fn build_prompt(query: &str, retrieved: &RetrievalResult) -> String {
    let mut context = String::new();
    for (i, hit) in retrieved.hits.iter().enumerate() {
        let chunk = &hit.chunk;
        context.push_str(&format!(
            "[S{}] ({}, page {}): {}\n\n",
            i + 1,
            chunk.document_id,
            chunk.page,
            chunk.text
        ));
    }

    format!(
        "You are an ESG report analyst. Answer the question using ONLY the numbered \
         context passages below. Do not use outside knowledge and do not make up \
         information.\n\n\
         Context passages:\n{context}\
         Question: {query}\n\n\
         Respond with a single JSON object and nothing else:\n\
         {{\"answer\": \"<your answer>\", \"citations\": [<numbers of the passages you used>], \
         \"insufficient_context\": <true if the passages do not answer the question>}}"
    )
}

pub(crate) fn parse_response(
    query: &str,
    raw: &str,
    retrieved: &RetrievalResult,
) -> Result<Answer, GenerationError> {
    let cleaned = strip_code_fences(raw);
    let reply: ModelReply = serde_json::from_str(cleaned)
        .map_err(|e| GenerationError::MalformedResponse(format!("{}: {}", e, cleaned)))?;

    if reply.insufficient_context {
        return Ok(insufficient_answer(query));
    }

    // Citations are 1-based [S{n}] tags; anything outside the supplied
    // context is a fabrication and gets dropped.
    let mut citations = Vec::new();
    for n in reply.citations {
        match n.checked_sub(1).and_then(|i| retrieved.hits.get(i)) {
            Some(hit) => citations.push(hit.chunk.citation()),
            None => log::warn!("model cited [S{}] which is not in the supplied context", n),
        }
    }

    Ok(Answer {
        query: query.to_string(),
        text: reply.answer,
        citations,
        insufficient_context: false,
        generated_at: Utc::now(),
    })
}

fn insufficient_answer(query: &str) -> Answer {
    Answer {
        query: query.to_string(),
        text: INSUFFICIENT_MESSAGE.to_string(),
        citations: Vec::new(),
        insufficient_context: true,
        generated_at: Utc::now(),
    }
}

fn strip_code_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let trimmed = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    trimmed.strip_suffix("```").unwrap_or(trimmed).trim()
}
