use crate::index::{EmbeddingIndex, IndexError};
use crate::rag::RetrievalResult;

/// Thin contract over the embedding index: rank, then drop anything below
/// the similarity floor so irrelevant context never reaches the generator.
pub struct Retriever<'a> {
    index: &'a EmbeddingIndex,
}

impl<'a> Retriever<'a> {
    pub fn new(index: &'a EmbeddingIndex) -> Self {
        Self { index }
    }

    pub async fn retrieve(
        &self,
        query: &str,
        k: usize,
        similarity_floor: f32,
    ) -> Result<RetrievalResult, IndexError> {
        let mut hits = self.index.query(query, k).await?;
        hits.retain(|hit| hit.similarity >= similarity_floor);

        log::debug!(
            "retrieve {:?}: {} hits above floor {}",
            query,
            hits.len(),
            similarity_floor
        );

        Ok(RetrievalResult {
            query: query.to_string(),
            hits,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::indexed_document;

    #[tokio::test]
    async fn floor_keeps_only_sufficiently_similar_hits() {
        let index = indexed_document(
            "report",
            &[
                "Scope 1 emissions fell to 12,000 tonnes CO2e this year.",
                "Board diversity targets were reviewed by the committee.",
            ],
        )
        .await;
        let retriever = Retriever::new(&index);

        let result = retriever
            .retrieve("scope 1 emissions tonnes", 5, 0.2)
            .await
            .unwrap();
        assert!(!result.hits.is_empty());
        assert!(result.hits.iter().all(|h| h.similarity >= 0.2));
        assert_eq!(result.hits[0].chunk.page, 1);
    }

    #[tokio::test]
    async fn unreachable_floor_yields_empty_result_not_error() {
        let index = indexed_document("report", &["Water usage declined year over year."]).await;
        let retriever = Retriever::new(&index);

        let result = retriever
            .retrieve("entirely unrelated topic", 5, 0.99)
            .await
            .unwrap();
        assert!(result.hits.is_empty());
        assert_eq!(result.query, "entirely unrelated topic");
    }
}
