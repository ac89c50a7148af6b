//! Pre-flight safety gate.
//!
//! Evaluated once per category before any mutation in that category. The
//! whole category proceeds or none of it does.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::Thresholds;
use crate::reconciliation::Category;

/// Outcome of a gate evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum GateDecision {
    /// Candidate count is below the threshold.
    Proceed,
    /// Candidate count reached the threshold; nothing in the category runs.
    Abort {
        threshold: usize,
        /// Every candidate account in the category.
        candidates: Vec<String>,
    },
}

impl GateDecision {
    /// Check if the category may proceed.
    #[must_use]
    pub fn is_proceed(&self) -> bool {
        matches!(self, GateDecision::Proceed)
    }
}

/// Circuit breaker with an independent threshold per category.
#[derive(Debug, Clone, Copy)]
pub struct SafetyGate {
    thresholds: Thresholds,
}

impl SafetyGate {
    /// Create a gate with the given thresholds.
    #[must_use]
    pub fn new(thresholds: Thresholds) -> Self {
        Self { thresholds }
    }

    /// Evaluate `candidates` for `category`. Aborts when `count >= threshold`.
    #[must_use]
    pub fn evaluate(&self, category: Category, candidates: &[String]) -> GateDecision {
        let threshold = self.thresholds.for_category(category);
        let count = candidates.len();

        if count >= threshold {
            warn!(
                category = %category,
                count,
                threshold,
                "Safety gate tripped, skipping category"
            );
            return GateDecision::Abort {
                threshold,
                candidates: candidates.to_vec(),
            };
        }

        info!(category = %category, count, threshold, "Safety gate passed");
        GateDecision::Proceed
    }
}
