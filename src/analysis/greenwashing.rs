use std::collections::HashSet;

use regex::Regex;
use thiserror::Error;

use crate::analysis::{CancelFlag, FindingCategory, GreenwashingFinding};
use crate::index::{EmbeddingIndex, IndexError};
use crate::rag::Retriever;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error(transparent)]
    Index(#[from] IndexError),
    #[error("scan cancelled")]
    Cancelled,
}

/// One linguistic pattern. The weight seeds the severity of a finding.
pub struct Rule {
    pub category: FindingCategory,
    pub pattern: Regex,
    pub weight: u8,
}

/// The configurable rule set the scan applies. Entirely regex-driven, so a
/// scan over the same corpus and rules is reproducible; no model call is
/// involved anywhere in this path.
pub struct RuleSet {
    rules: Vec<Rule>,
    numeric_claim: Regex,
    methodology: Regex,
    contradiction_claim: Regex,
    contradiction_counter: Regex,
}

const VAGUE_PATTERN: &str = r"(?i)\b(committed to|commitment to|striv(?:e|ing) (?:to|for)|aims? to|aiming (?:to|for)|aspire to|exploring (?:sustainable|green)|eco-friendly|environmentally friendly|sustainable solutions|greener future|better tomorrow|unspecified future date|in the coming years|at some point|as soon as practicable|do our part)\b";

const UNVERIFIABLE_PATTERN: &str = r"(?i)\b(100% (?:sustainable|green|renewable)|fully carbon neutral|completely (?:green|sustainable|carbon neutral)|zero (?:environmental )?(?:impact|harm)|world's most sustainable|industry[- ]leading sustainability|entirely offset)\b";

const NUMERIC_CLAIM_PATTERN: &str =
    r"(?i)\d+(?:[.,]\d+)?\s*(?:%|percent|tons?|tonnes?|tco2e?|co2e?|mwh|gwh|kwh|litres?|liters?)";

const METHODOLOGY_PATTERN: &str = r"(?i)\b(baseline|methodology|ghg protocol|iso \d+|sbti|science[- ]based|audited|verified|assured|third[- ]party|restated|scope [123] boundary)\b";

const CONTRADICTION_CLAIM_PATTERN: &str = r"(?i)\b(carbon neutral|net[- ]zero|climate leader)\b";
const CONTRADICTION_COUNTER_PATTERN: &str = r"(?i)\b(emissions (?:rose|grew|increased)|increased emissions|expanded (?:coal|oil|gas)|more fossil fuel|without offsets)\b";

impl Default for RuleSet {
    fn default() -> Self {
        // Patterns are compile-time literals; a test asserts they build.
        let rule = |category, pattern: &str, weight| Rule {
            category,
            pattern: Regex::new(pattern).expect("default rule pattern"),
            weight,
        };
        Self {
            rules: vec![
                rule(FindingCategory::VagueClaim, VAGUE_PATTERN, 2),
                rule(FindingCategory::UnverifiableClaim, UNVERIFIABLE_PATTERN, 3),
            ],
            numeric_claim: Regex::new(NUMERIC_CLAIM_PATTERN).expect("numeric pattern"),
            methodology: Regex::new(METHODOLOGY_PATTERN).expect("methodology pattern"),
            contradiction_claim: Regex::new(CONTRADICTION_CLAIM_PATTERN)
                .expect("contradiction pattern"),
            contradiction_counter: Regex::new(CONTRADICTION_COUNTER_PATTERN)
                .expect("contradiction pattern"),
        }
    }
}

impl RuleSet {
    /// Applies every rule to one excerpt. Returns (category, matched
    /// fragment, base weight) per rule that fired.
    pub fn apply(&self, text: &str) -> Vec<(FindingCategory, String, u8)> {
        let mut hits = Vec::new();

        for rule in &self.rules {
            if let Some(m) = rule.pattern.find(text) {
                hits.push((rule.category, m.as_str().to_string(), rule.weight));
            }
        }

        // A quantified claim with no methodology, baseline or assurance
        // reference anywhere in the excerpt.
        if let Some(m) = self.numeric_claim.find(text) {
            if !self.methodology.is_match(text) {
                hits.push((
                    FindingCategory::MissingMethodology,
                    m.as_str().to_string(),
                    3,
                ));
            }
        }

        // A neutrality claim sitting next to an admission that cuts against it.
        if let (Some(claim), Some(counter)) = (
            self.contradiction_claim.find(text),
            self.contradiction_counter.find(text),
        ) {
            hits.push((
                FindingCategory::Contradiction,
                format!("{} / {}", claim.as_str(), counter.as_str()),
                4,
            ));
        }

        hits
    }
}

/// Default probe queries: the sustainability phrases most worth auditing.
pub fn default_probes() -> Vec<String> {
    [
        "carbon neutral commitment",
        "net zero target",
        "carbon offsets",
        "renewable energy claims",
        "sustainable and eco-friendly products",
        "emissions reduction targets",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

pub struct GreenwashingAnalyzer {
    probes: Vec<String>,
    rules: RuleSet,
    k: usize,
    similarity_floor: f32,
}

impl GreenwashingAnalyzer {
    pub fn new(rules: RuleSet, k: usize, similarity_floor: f32) -> Self {
        Self {
            probes: default_probes(),
            rules,
            k,
            similarity_floor,
        }
    }

    pub fn with_probes(mut self, probes: Vec<String>) -> Self {
        self.probes = probes;
        self
    }

    /// Retrieves top matches per probe and flags excerpts against the rule
    /// set, severity-ranked. Cancellation is checked between probes; a
    /// cancelled scan returns no partial findings.
    pub async fn scan(
        &self,
        index: &EmbeddingIndex,
        cancel: &CancelFlag,
    ) -> Result<Vec<GreenwashingFinding>, ScanError> {
        let retriever = Retriever::new(index);
        let mut findings: Vec<GreenwashingFinding> = Vec::new();
        let mut seen: HashSet<(String, FindingCategory)> = HashSet::new();

        for probe in &self.probes {
            if cancel.is_cancelled() {
                return Err(ScanError::Cancelled);
            }

            let retrieved = retriever
                .retrieve(probe, self.k, self.similarity_floor)
                .await?;

            for hit in &retrieved.hits {
                let rule_hits = self.rules.apply(&hit.chunk.text);
                // Multiple rule categories firing on one excerpt escalates
                // each finding by one step.
                let escalation = u8::from(rule_hits.len() > 1);

                for (category, matched, weight) in rule_hits {
                    if !seen.insert((hit.chunk.id.clone(), category)) {
                        continue;
                    }
                    findings.push(GreenwashingFinding {
                        citation: hit.chunk.citation(),
                        category,
                        severity: (weight + escalation).clamp(1, 5),
                        matched,
                        probe: probe.clone(),
                    });
                }
            }
        }

        findings.sort_by(|a, b| {
            b.severity
                .cmp(&a.severity)
                .then(a.citation.page.cmp(&b.citation.page))
                .then(a.citation.excerpt.cmp(&b.citation.excerpt))
        });

        log::info!(
            "greenwashing scan: {} findings across {} probes",
            findings.len(),
            self.probes.len()
        );

        Ok(findings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::indexed_document;

    #[test]
    fn default_rules_compile() {
        let _ = RuleSet::default();
    }

    #[test]
    fn vague_qualifiers_are_flagged() {
        let rules = RuleSet::default();
        let hits =
            rules.apply("We are committed to exploring sustainable solutions for a better tomorrow.");
        assert!(hits
            .iter()
            .any(|(c, _, _)| *c == FindingCategory::VagueClaim));
    }

    #[test]
    fn absolute_claims_are_unverifiable() {
        let rules = RuleSet::default();
        let hits = rules.apply("Our packaging is 100% sustainable and fully carbon neutral.");
        assert!(hits
            .iter()
            .any(|(c, _, _)| *c == FindingCategory::UnverifiableClaim));
    }

    #[test]
    fn numbers_without_methodology_are_flagged() {
        let rules = RuleSet::default();
        let hits = rules.apply("We cut emissions by 45% across all operations.");
        assert!(hits
            .iter()
            .any(|(c, _, _)| *c == FindingCategory::MissingMethodology));
    }

    #[test]
    fn numbers_with_a_baseline_are_not_flagged() {
        let rules = RuleSet::default();
        let hits = rules.apply(
            "We cut emissions by 45% against our 2020 baseline, verified by a third-party auditor.",
        );
        assert!(!hits
            .iter()
            .any(|(c, _, _)| *c == FindingCategory::MissingMethodology));
    }

    #[test]
    fn neutrality_claim_next_to_an_admission_contradicts() {
        let rules = RuleSet::default();
        let hits =
            rules.apply("We remain carbon neutral even though emissions rose 12% this year.");
        assert!(hits
            .iter()
            .any(|(c, _, _)| *c == FindingCategory::Contradiction));
    }

    fn ten_page_report() -> Vec<&'static str> {
        vec![
            "Chairman letter about company growth and markets.",
            "Financial overview of revenue and operating segments.",
            "Employee wellbeing programs and community outreach.",
            "We are committed to being carbon neutral by an unspecified future date.",
            "Board composition and committee structure details.",
            "Supply chain overview and procurement practices.",
            "Product quality and customer satisfaction results.",
            "Data privacy and information security policies.",
            "Risk management framework and internal audit notes.",
            "Closing statement and forward looking remarks.",
        ]
    }

    #[tokio::test]
    async fn vague_carbon_pledge_is_top_hit_and_flagged() {
        let index = indexed_document("report", &ten_page_report()).await;

        let retriever = Retriever::new(&index);
        let retrieved = retriever
            .retrieve("carbon neutrality commitment", 3, 0.0)
            .await
            .unwrap();
        assert_eq!(retrieved.hits[0].chunk.page, 4);

        let analyzer = GreenwashingAnalyzer::new(RuleSet::default(), 3, 0.0);
        let findings = analyzer.scan(&index, &CancelFlag::new()).await.unwrap();

        let flagged = findings
            .iter()
            .find(|f| f.citation.page == 4 && f.category == FindingCategory::VagueClaim)
            .expect("page 4 pledge should be flagged as vague");
        assert!(flagged.severity > 0);
    }

    #[tokio::test]
    async fn findings_are_ordered_by_severity() {
        let index = indexed_document(
            "report",
            &[
                "We aim to do our part for a greener future.",
                "We stay carbon neutral although emissions rose 20% without offsets.",
            ],
        )
        .await;

        let analyzer = GreenwashingAnalyzer::new(RuleSet::default(), 5, 0.0);
        let findings = analyzer.scan(&index, &CancelFlag::new()).await.unwrap();
        assert!(findings.len() >= 2);
        for pair in findings.windows(2) {
            assert!(pair[0].severity >= pair[1].severity);
        }
    }

    #[tokio::test]
    async fn cancelled_scan_returns_no_partial_findings() {
        let index = indexed_document("report", &["We are committed to a better tomorrow."]).await;
        let cancel = CancelFlag::new();
        cancel.cancel();

        let analyzer = GreenwashingAnalyzer::new(RuleSet::default(), 5, 0.0);
        let err = analyzer.scan(&index, &cancel).await.unwrap_err();
        assert!(matches!(err, ScanError::Cancelled));
    }
}
