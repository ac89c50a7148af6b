//! Run results and report.
//!
//! One [`MutationResult`] per input record, grouped into a [`CategoryReport`]
//! per category. [`SyncReport`] is what a run returns and what the CLI
//! exports.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};
use uuid::Uuid;

use crate::reconciliation::{Category, ChangeRecord};

/// Outcome code of one mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Created,
    CreatedWithSuffix,
    Duplicate,
    Updated,
    Quarantined,
    Deleted,
    /// Error detail.
    Failed(String),
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Outcome::Created => f.write_str("Created"),
            Outcome::CreatedWithSuffix => f.write_str("Created-WithSuffix"),
            Outcome::Duplicate => f.write_str("Duplicate"),
            Outcome::Updated => f.write_str("Updated"),
            Outcome::Quarantined => f.write_str("Quarantined"),
            Outcome::Deleted => f.write_str("Deleted"),
            Outcome::Failed(detail) => f.write_str(detail),
        }
    }
}

impl Serialize for Outcome {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Result of processing one record.
#[derive(Debug, Clone, Serialize)]
pub struct MutationResult {
    pub category: Category,
    pub account_name: String,
    pub success: bool,
    pub outcome: Outcome,
    pub dry_run: bool,
    pub executed_at: DateTime<Utc>,
}

impl MutationResult {
    /// Create a successful result.
    pub fn success(
        category: Category,
        account_name: impl Into<String>,
        outcome: Outcome,
        dry_run: bool,
    ) -> Self {
        Self {
            category,
            account_name: account_name.into(),
            success: true,
            outcome,
            dry_run,
            executed_at: Utc::now(),
        }
    }

    /// Create a failure result.
    pub fn failure(
        category: Category,
        account_name: impl Into<String>,
        error: impl Into<String>,
        dry_run: bool,
    ) -> Self {
        Self {
            category,
            account_name: account_name.into(),
            success: false,
            outcome: Outcome::Failed(error.into()),
            dry_run,
            executed_at: Utc::now(),
        }
    }

    /// Duplicates are reported as failures so operators see them.
    pub fn duplicate(category: Category, account_name: impl Into<String>, dry_run: bool) -> Self {
        let mut result = Self::success(category, account_name, Outcome::Duplicate, dry_run);
        result.success = false;
        result
    }
}

/// How a category ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CategoryStatus {
    /// No candidates; the gate was not consulted.
    Empty,
    /// Gate passed and every candidate was processed.
    Completed,
    /// Gate tripped; nothing was attempted.
    Aborted {
        threshold: usize,
        candidates: Vec<String>,
    },
}

/// Results for one category.
#[derive(Debug, Clone, Serialize)]
pub struct CategoryReport {
    pub category: Category,
    pub status: CategoryStatus,
    /// Change records that drove the category (update only).
    pub changes: Vec<ChangeRecord>,
    pub results: Vec<MutationResult>,
}

impl CategoryReport {
    /// Create an empty report for `category`.
    #[must_use]
    pub fn new(category: Category) -> Self {
        Self {
            category,
            status: CategoryStatus::Empty,
            changes: Vec::new(),
            results: Vec::new(),
        }
    }

    /// Failed results.
    pub fn failures(&self) -> impl Iterator<Item = &MutationResult> {
        self.results.iter().filter(|r| !r.success)
    }

    /// Check if the gate aborted this category.
    #[must_use]
    pub fn is_aborted(&self) -> bool {
        matches!(self.status, CategoryStatus::Aborted { .. })
    }
}

/// Summary counters for a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStatistics {
    pub source_records: usize,
    pub target_records: usize,
    pub matched: usize,
    pub to_add: usize,
    pub to_remove: usize,
    pub exempt: usize,
    pub changes: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub aborted_categories: usize,
    /// Results broken down by outcome code (failures under "Failed").
    pub outcomes: BTreeMap<String, usize>,
    pub duration_ms: u64,
}

impl RunStatistics {
    /// Fold one category's results into the counters.
    pub fn record_category(&mut self, report: &CategoryReport) {
        self.changes += report.changes.len();
        if report.is_aborted() {
            self.aborted_categories += 1;
        }
        for result in &report.results {
            if result.success {
                self.succeeded += 1;
            } else {
                self.failed += 1;
            }
            let key = match &result.outcome {
                Outcome::Failed(_) => "Failed".to_string(),
                other => other.to_string(),
            };
            *self.outcomes.entry(key).or_insert(0) += 1;
        }
    }

    /// Count for an outcome code.
    #[must_use]
    pub fn outcome_count(&self, outcome: &str) -> usize {
        self.outcomes.get(outcome).copied().unwrap_or(0)
    }
}

/// Complete result of one run.
#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub dry_run: bool,
    pub categories: Vec<CategoryReport>,
    pub statistics: RunStatistics,
}

impl SyncReport {
    /// Report for `category`, if the run reached it.
    #[must_use]
    pub fn category(&self, category: Category) -> Option<&CategoryReport> {
        self.categories.iter().find(|c| c.category == category)
    }

    /// Every result of the run in processing order.
    pub fn results(&self) -> impl Iterator<Item = &MutationResult> {
        self.categories.iter().flat_map(|c| c.results.iter())
    }

    /// Label used for export file names: UTC start time plus run id.
    #[must_use]
    pub fn run_label(&self) -> String {
        format!("{}-{}", self.started_at.format("%Y%m%dT%H%M%SZ"), self.run_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_codes() {
        assert_eq!(Outcome::Created.to_string(), "Created");
        assert_eq!(Outcome::CreatedWithSuffix.to_string(), "Created-WithSuffix");
        assert_eq!(Outcome::Failed("LDAP error".into()).to_string(), "LDAP error");
        assert_eq!(
            serde_json::to_string(&Outcome::Quarantined).unwrap(),
            "\"Quarantined\""
        );
    }

    #[test]
    fn test_duplicate_counts_as_failure() {
        let result = MutationResult::duplicate(Category::Add, "jsmith", true);
        assert!(!result.success);
        assert_eq!(result.outcome, Outcome::Duplicate);
        assert!(result.dry_run);
    }

    #[test]
    fn test_statistics_fold() {
        let mut report = CategoryReport::new(Category::Add);
        report.status = CategoryStatus::Completed;
        report.results = vec![
            MutationResult::success(Category::Add, "a", Outcome::Created, false),
            MutationResult::success(Category::Add, "b", Outcome::CreatedWithSuffix, false),
            MutationResult::failure(Category::Add, "c", "boom", false),
            MutationResult::duplicate(Category::Add, "d", false),
        ];
        assert_eq!(report.failures().count(), 2);

        let mut stats = RunStatistics::default();
        stats.record_category(&report);
        assert_eq!(stats.succeeded, 2);
        assert_eq!(stats.failed, 2);
        assert_eq!(stats.outcome_count("Created-WithSuffix"), 1);
        assert_eq!(stats.outcome_count("Failed"), 1);
        assert_eq!(stats.outcome_count("Duplicate"), 1);
    }

    #[test]
    fn test_aborted_category_counts() {
        let mut report = CategoryReport::new(Category::Remove);
        report.status = CategoryStatus::Aborted {
            threshold: 1,
            candidates: vec!["x".into()],
        };
        let mut stats = RunStatistics::default();
        stats.record_category(&report);
        assert_eq!(stats.aborted_categories, 1);
    }
}
