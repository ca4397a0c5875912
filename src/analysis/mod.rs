pub mod greenwashing;
pub mod scoring;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::document::Citation;

pub use greenwashing::{GreenwashingAnalyzer, RuleSet, ScanError};
pub use scoring::{MetricCatalog, ScoringEngine, ScoringError};

/// Cooperative cancellation for long scans. Checked between probes; a
/// cancelled run discards partial results instead of returning them.
#[derive(Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FindingCategory {
    VagueClaim,
    UnverifiableClaim,
    MissingMethodology,
    Contradiction,
}

impl FindingCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            FindingCategory::VagueClaim => "vague claim",
            FindingCategory::UnverifiableClaim => "unverifiable claim",
            FindingCategory::MissingMethodology => "numeric claim without methodology",
            FindingCategory::Contradiction => "contradiction",
        }
    }
}

/// A flagged excerpt. Severity is 1 (mild) to 5 (severe).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GreenwashingFinding {
    pub citation: Citation,
    pub category: FindingCategory,
    pub severity: u8,
    /// The text fragment the rule matched.
    pub matched: String,
    /// The probe query that surfaced the excerpt.
    pub probe: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EsgCategory {
    Environment,
    Social,
    Governance,
}

impl EsgCategory {
    pub const ALL: [EsgCategory; 3] = [
        EsgCategory::Environment,
        EsgCategory::Social,
        EsgCategory::Governance,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            EsgCategory::Environment => "Environment",
            EsgCategory::Social => "Social",
            EsgCategory::Governance => "Governance",
        }
    }
}

/// Sub-score for one ESG category, 0-100, with the evidence that produced it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryScore {
    pub category: EsgCategory,
    pub score: f32,
    pub citations: Vec<Citation>,
    /// True when no probe found any evidence; the score is then the minimum
    /// of the range, not an error.
    pub insufficient_evidence: bool,
    pub notes: Vec<String>,
}

/// Overall sustainability score, always derived fresh from the full corpus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SustainabilityScore {
    pub overall: f32,
    pub categories: Vec<CategoryScore>,
    pub generated_at: DateTime<Utc>,
}

impl SustainabilityScore {
    pub fn category(&self, category: EsgCategory) -> Option<&CategoryScore> {
        self.categories.iter().find(|c| c.category == category)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancel_flag_flips_once() {
        let flag = CancelFlag::new();
        assert!(!flag.is_cancelled());
        flag.cancel();
        assert!(flag.is_cancelled());
        let clone = flag.clone();
        assert!(clone.is_cancelled());
    }
}
