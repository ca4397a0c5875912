use chrono::Utc;
use regex::Regex;
use thiserror::Error;

use crate::analysis::{CancelFlag, CategoryScore, EsgCategory, SustainabilityScore};
use crate::index::{EmbeddingIndex, IndexError};
use crate::rag::Retriever;

#[derive(Error, Debug)]
pub enum ScoringError {
    #[error("invalid metric catalog: {0}")]
    InvalidCatalog(String),
    #[error("index unavailable: {0}")]
    IndexUnavailable(String),
    #[error(transparent)]
    Index(#[from] IndexError),
    #[error("scoring run cancelled")]
    Cancelled,
}

/// One disclosure the catalog looks for, expressed as a retrieval probe.
#[derive(Debug, Clone)]
pub struct MetricProbe {
    pub name: String,
    pub query: String,
}

impl MetricProbe {
    fn new(name: &str, query: &str) -> Self {
        Self {
            name: name.to_string(),
            query: query.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CategorySpec {
    pub category: EsgCategory,
    pub weight: f32,
    pub probes: Vec<MetricProbe>,
}

/// The declared scoring formula: per category, a probe list and a weight.
/// Sub-score = 100 * mean probe attainment (0 none, 0.5 mention, 1 figures);
/// overall = weighted sum of sub-scores. Nothing else feeds the number.
#[derive(Debug, Clone)]
pub struct MetricCatalog {
    pub categories: Vec<CategorySpec>,
}

impl Default for MetricCatalog {
    fn default() -> Self {
        Self {
            categories: vec![
                CategorySpec {
                    category: EsgCategory::Environment,
                    weight: 0.40,
                    probes: vec![
                        MetricProbe::new("scope 1 emissions", "scope 1 emissions"),
                        MetricProbe::new("scope 2 emissions", "scope 2 emissions"),
                        MetricProbe::new("scope 3 emissions", "scope 3 emissions"),
                        MetricProbe::new("renewable energy share", "renewable energy percentage"),
                        MetricProbe::new("water usage", "water usage"),
                        MetricProbe::new("waste recycling", "waste recycled percentage"),
                    ],
                },
                CategorySpec {
                    category: EsgCategory::Social,
                    weight: 0.30,
                    probes: vec![
                        MetricProbe::new("workforce diversity", "women in workforce"),
                        MetricProbe::new("leadership diversity", "women in leadership roles"),
                        MetricProbe::new("safety record", "safety incident rate"),
                        MetricProbe::new("employee development", "employee training hours"),
                        MetricProbe::new("community impact", "community investment programs"),
                    ],
                },
                CategorySpec {
                    category: EsgCategory::Governance,
                    weight: 0.30,
                    probes: vec![
                        MetricProbe::new("board independence", "independent directors"),
                        MetricProbe::new("board size", "board of directors size"),
                        MetricProbe::new("esg oversight", "ESG committee oversight"),
                        MetricProbe::new("ethics reporting", "ethics violations reported"),
                    ],
                },
            ],
        }
    }
}

impl MetricCatalog {
    pub fn validate(&self) -> Result<(), ScoringError> {
        if self.categories.is_empty() {
            return Err(ScoringError::InvalidCatalog("no categories".to_string()));
        }
        let total: f32 = self.categories.iter().map(|c| c.weight).sum();
        if (total - 1.0).abs() > 1e-3 {
            return Err(ScoringError::InvalidCatalog(format!(
                "category weights sum to {total}, expected 1.0"
            )));
        }
        for spec in &self.categories {
            if spec.probes.is_empty() {
                return Err(ScoringError::InvalidCatalog(format!(
                    "category {} has no probes",
                    spec.category.as_str()
                )));
            }
        }
        Ok(())
    }
}

pub struct ScoringEngine {
    catalog: MetricCatalog,
    k: usize,
    similarity_floor: f32,
    quantified: Regex,
}

impl ScoringEngine {
    pub fn new(catalog: MetricCatalog, k: usize, similarity_floor: f32) -> Self {
        Self {
            catalog,
            k,
            similarity_floor,
            quantified: Regex::new(r"\d+(?:[.,]\d+)?").expect("numeric pattern"),
        }
    }

    /// Scores the full indexed corpus. Absence of evidence lands at the
    /// bottom of the range with an empty citation set; only an empty or
    /// unreachable index is an error.
    pub async fn score(
        &self,
        index: &EmbeddingIndex,
        cancel: &CancelFlag,
    ) -> Result<SustainabilityScore, ScoringError> {
        self.catalog.validate()?;

        if index.is_empty().await? {
            return Err(ScoringError::IndexUnavailable(
                "no chunks indexed".to_string(),
            ));
        }

        let retriever = Retriever::new(index);
        let mut categories = Vec::with_capacity(self.catalog.categories.len());
        let mut overall = 0.0f32;

        for spec in &self.catalog.categories {
            let mut attained = 0.0f32;
            let mut citations = Vec::new();
            let mut notes = Vec::new();

            for probe in &spec.probes {
                if cancel.is_cancelled() {
                    // Partial sub-scores are discarded, never surfaced.
                    return Err(ScoringError::Cancelled);
                }

                let retrieved = retriever
                    .retrieve(&probe.query, self.k, self.similarity_floor)
                    .await?;

                match self.best_evidence(&retrieved.hits) {
                    Some((hit, true)) => {
                        attained += 1.0;
                        notes.push(format!("{}: disclosed with figures", probe.name));
                        citations.push(hit.chunk.citation());
                    }
                    Some((hit, false)) => {
                        attained += 0.5;
                        notes.push(format!("{}: mentioned without figures", probe.name));
                        citations.push(hit.chunk.citation());
                    }
                    None => notes.push(format!("{}: no disclosure found", probe.name)),
                }
            }

            let score = (100.0 * attained / spec.probes.len() as f32).clamp(0.0, 100.0);
            let insufficient_evidence = citations.is_empty();
            overall += score * spec.weight;

            categories.push(CategoryScore {
                category: spec.category,
                score: round1(score),
                citations,
                insufficient_evidence,
                notes,
            });
        }

        let score = SustainabilityScore {
            overall: round1(overall.clamp(0.0, 100.0)),
            categories,
            generated_at: Utc::now(),
        };

        log::info!(
            "sustainability score {:.1} ({})",
            score.overall,
            score
                .categories
                .iter()
                .map(|c| format!("{} {:.1}", c.category.as_str(), c.score))
                .collect::<Vec<_>>()
                .join(", ")
        );

        Ok(score)
    }

    /// The strongest hit for a probe: prefer an excerpt carrying numbers
    /// (quantified disclosure) over a bare mention.
    fn best_evidence<'a>(
        &self,
        hits: &'a [crate::index::ScoredChunk],
    ) -> Option<(&'a crate::index::ScoredChunk, bool)> {
        if let Some(hit) = hits.iter().find(|h| self.quantified.is_match(&h.chunk.text)) {
            return Some((hit, true));
        }
        hits.first().map(|hit| (hit, false))
    }
}

fn round1(x: f32) -> f32 {
    (x * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::{EmbeddingIndex, MemoryStore};
    use crate::testutil::{indexed_document, HashEmbedder};
    use std::sync::Arc;

    #[test]
    fn weights_must_sum_to_one() {
        let mut catalog = MetricCatalog::default();
        catalog.categories[0].weight = 0.9;
        let engine = ScoringEngine::new(catalog, 3, 0.2);
        assert!(matches!(
            engine.catalog.validate(),
            Err(ScoringError::InvalidCatalog(_))
        ));
    }

    #[test]
    fn default_catalog_is_valid() {
        assert!(MetricCatalog::default().validate().is_ok());
    }

    #[tokio::test]
    async fn empty_index_is_unavailable() {
        let index = EmbeddingIndex::new(Box::new(MemoryStore::new()), Arc::new(HashEmbedder));
        let engine = ScoringEngine::new(MetricCatalog::default(), 3, 0.2);
        let err = engine.score(&index, &CancelFlag::new()).await.unwrap_err();
        assert!(matches!(err, ScoringError::IndexUnavailable(_)));
    }

    #[tokio::test]
    async fn missing_environmental_evidence_scores_minimum_without_error() {
        let index = indexed_document(
            "report",
            &[
                "Our workforce is made up of many women, and women hold leadership roles.",
                "The board has ten directors, half independent, plus an ethics committee.",
            ],
        )
        .await;

        let engine = ScoringEngine::new(MetricCatalog::default(), 3, 0.2);
        let score = engine.score(&index, &CancelFlag::new()).await.unwrap();

        let env = score.category(EsgCategory::Environment).unwrap();
        assert_eq!(env.score, 0.0);
        assert!(env.citations.is_empty());
        assert!(env.insufficient_evidence);
        assert!(env.notes.iter().all(|n| n.ends_with("no disclosure found")));
    }

    #[tokio::test]
    async fn quantified_disclosures_earn_more_than_mentions() {
        let index = indexed_document(
            "report",
            &[
                "Scope 1 emissions totalled 450,000 tonnes CO2e against our 2020 baseline.",
                "Renewable energy percentage reached 65 percent of operations.",
                "We discuss water usage in general terms without numbers here.",
            ],
        )
        .await;

        let engine = ScoringEngine::new(MetricCatalog::default(), 3, 0.2);
        let score = engine.score(&index, &CancelFlag::new()).await.unwrap();

        let env = score.category(EsgCategory::Environment).unwrap();
        assert!(env.score > 0.0);
        assert!(!env.citations.is_empty());
        assert!(!env.insufficient_evidence);
        assert!(env
            .notes
            .iter()
            .any(|n| n.contains("disclosed with figures")));
        assert!(score.overall > 0.0 && score.overall <= 100.0);
    }

    #[tokio::test]
    async fn scoring_is_reproducible() {
        let index = indexed_document(
            "report",
            &["Scope 1 emissions were 1,200 tonnes. The board has 10 directors."],
        )
        .await;

        let engine = ScoringEngine::new(MetricCatalog::default(), 3, 0.2);
        let first = engine.score(&index, &CancelFlag::new()).await.unwrap();
        let second = engine.score(&index, &CancelFlag::new()).await.unwrap();
        assert_eq!(first.overall, second.overall);
        for (a, b) in first.categories.iter().zip(&second.categories) {
            assert_eq!(a.score, b.score);
            assert_eq!(a.citations.len(), b.citations.len());
        }
    }

    #[tokio::test]
    async fn cancelled_run_discards_partial_scores() {
        let index = indexed_document("report", &["Scope 1 emissions were 12 tonnes."]).await;
        let cancel = CancelFlag::new();
        cancel.cancel();

        let engine = ScoringEngine::new(MetricCatalog::default(), 3, 0.2);
        let err = engine.score(&index, &cancel).await.unwrap_err();
        assert!(matches!(err, ScoringError::Cancelled));
    }
}
