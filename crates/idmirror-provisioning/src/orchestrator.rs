//! Sync run orchestration.
//!
//! ```text
//!  extract source ─┐
//!                  ├─► reconcile ─► update ─► add ─► remove ─► report
//!  extract target ─┘                 (each category: gate, apply, notify)
//! ```
//!
//! Extraction and snapshot validation failures are fatal. Each category is
//! gated independently, and per-record failures are captured in the report
//! without stopping the run.

use std::collections::BTreeMap;
use std::time::Instant;

use chrono::Utc;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use idmirror_connector::attributes::{ENABLED, PATH};
use idmirror_connector::error::DirectoryResult;
use idmirror_connector::identity::IdentityRecord;
use idmirror_connector::traits::{SnapshotOp, TargetDirectory};

use crate::config::SyncConfig;
use crate::dry_run::DryRunDirectory;
use crate::error::{SyncError, SyncResult};
use crate::lifecycle::LifecycleEngine;
use crate::notify::{notify_logged, Notifier};
use crate::provisioner::IdentityProvisioner;
use crate::reconciliation::{reconcile, AttributeDiffer, Category, ChangeRecord, Reconciliation};
use crate::report::{CategoryReport, CategoryStatus, MutationResult, Outcome, RunStatistics, SyncReport};
use crate::safety::{GateDecision, SafetyGate};

/// Whether mutations reach the target directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunMode {
    /// Compute and report everything, mutate nothing.
    #[default]
    DryRun,
    /// Execute mutations.
    Apply,
}

impl RunMode {
    /// Check if this is a dry run.
    #[must_use]
    pub fn is_dry_run(&self) -> bool {
        matches!(self, RunMode::DryRun)
    }
}

/// Runs one reconciliation pass between a source and a target directory.
#[derive(Debug, Clone)]
pub struct SyncOrchestrator {
    config: SyncConfig,
    mode: RunMode,
    differ: AttributeDiffer,
    gate: SafetyGate,
    lifecycle: LifecycleEngine,
}

impl SyncOrchestrator {
    /// Create an orchestrator. Validates `config`.
    pub fn new(config: SyncConfig, mode: RunMode) -> SyncResult<Self> {
        config.validate()?;
        Ok(Self {
            differ: AttributeDiffer::from_config(&config),
            gate: SafetyGate::new(config.thresholds),
            lifecycle: LifecycleEngine::new(
                config.leavers_container.clone(),
                config.settle_delay(),
                mode.is_dry_run(),
            ),
            config,
            mode,
        })
    }

    /// Run mode.
    #[must_use]
    pub fn mode(&self) -> RunMode {
        self.mode
    }

    /// Execute a full run.
    ///
    /// Returns `Err` only for fatal pre-flight failures, after notifying.
    #[instrument(skip_all, fields(dry_run = self.mode.is_dry_run()))]
    pub async fn run<S, T, N>(&self, source: &S, target: &T, notifier: &N) -> SyncResult<SyncReport>
    where
        S: SnapshotOp + ?Sized,
        T: SnapshotOp + TargetDirectory + ?Sized,
        N: Notifier + ?Sized,
    {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let clock = Instant::now();
        info!(run_id = %run_id, source = source.display_name(), target = target.display_name(), "Starting sync run");

        let source_records = self.extract("source", source, notifier).await?;
        let target_records = self.extract("target", target, notifier).await?;

        let reconciliation = match reconcile(
            &source_records,
            &target_records,
            &self.config.exemption_sentinel,
        ) {
            Ok(reconciliation) => reconciliation,
            Err(e) => {
                error!(error = %e, "Snapshot validation failed");
                let err = SyncError::from(e);
                notify_logged(notifier, &self.subject("sync aborted: invalid snapshot"), &err.to_string())
                    .await;
                return Err(err);
            }
        };

        info!(
            matched = reconciliation.matched.len(),
            to_add = reconciliation.to_add.len(),
            to_remove = reconciliation.to_remove_eligible.len(),
            exempt = reconciliation.exempt.len(),
            "Reconciled snapshots"
        );

        let categories = if self.mode.is_dry_run() {
            let dir = DryRunDirectory::new(target);
            self.execute(&dir, &reconciliation, &target_records, notifier)
                .await
        } else {
            self.execute(target, &reconciliation, &target_records, notifier)
                .await
        };

        let mut statistics = RunStatistics {
            source_records: source_records.len(),
            target_records: target_records.len(),
            matched: reconciliation.matched.len(),
            to_add: reconciliation.to_add.len(),
            to_remove: reconciliation.to_remove_eligible.len(),
            exempt: reconciliation.exempt.len(),
            ..RunStatistics::default()
        };
        for report in &categories {
            statistics.record_category(report);
        }
        statistics.duration_ms = u64::try_from(clock.elapsed().as_millis()).unwrap_or(u64::MAX);

        info!(
            run_id = %run_id,
            succeeded = statistics.succeeded,
            failed = statistics.failed,
            aborted_categories = statistics.aborted_categories,
            duration_ms = statistics.duration_ms,
            "Sync run completed"
        );

        Ok(SyncReport {
            run_id,
            started_at,
            completed_at: Utc::now(),
            dry_run: self.mode.is_dry_run(),
            categories,
            statistics,
        })
    }

    async fn extract<D, N>(&self, domain: &str, dir: &D, notifier: &N) -> SyncResult<Vec<IdentityRecord>>
    where
        D: SnapshotOp + ?Sized,
        N: Notifier + ?Sized,
    {
        match dir.snapshot().await {
            Ok(records) => {
                debug!(domain, records = records.len(), "Extracted snapshot");
                Ok(records)
            }
            Err(source) => {
                error!(domain, error = %source, "Snapshot extraction failed");
                let err = SyncError::extraction(domain, source);
                notify_logged(
                    notifier,
                    &self.subject(&format!("sync aborted: {domain} extraction failed")),
                    &err.to_string(),
                )
                .await;
                Err(err)
            }
        }
    }

    async fn execute<D, N>(
        &self,
        dir: &D,
        reconciliation: &Reconciliation,
        target_records: &[IdentityRecord],
        notifier: &N,
    ) -> Vec<CategoryReport>
    where
        D: TargetDirectory + ?Sized,
        N: Notifier + ?Sized,
    {
        let mut reports = Vec::with_capacity(Category::PROCESSING_ORDER.len());
        for category in Category::PROCESSING_ORDER {
            let report = match category {
                Category::Update => self.run_update(dir, reconciliation, notifier).await,
                Category::Add => self.run_add(dir, reconciliation, target_records, notifier).await,
                Category::Remove => self.run_remove(dir, reconciliation, notifier).await,
            };
            self.notify_failures(&report, notifier).await;
            reports.push(report);
        }
        reports
    }

    async fn run_update<D, N>(
        &self,
        dir: &D,
        reconciliation: &Reconciliation,
        notifier: &N,
    ) -> CategoryReport
    where
        D: TargetDirectory + ?Sized,
        N: Notifier + ?Sized,
    {
        let mut report = CategoryReport::new(Category::Update);

        let planned: Vec<(&IdentityRecord, Vec<ChangeRecord>)> = reconciliation
            .matched
            .iter()
            .map(|pair| (&pair.target, self.differ.diff(&pair.source, &pair.target)))
            .filter(|(_, changes)| !changes.is_empty())
            .collect();
        report.changes = planned.iter().flat_map(|(_, c)| c.iter().cloned()).collect();

        let candidates: Vec<String> = planned
            .iter()
            .map(|(target, _)| target.account_name.clone())
            .collect();
        if !self.admit(&mut report, &candidates, notifier).await {
            return report;
        }

        for (target, changes) in &planned {
            let result = match self.apply_changes(dir, target, changes).await {
                Ok(outcome) => self.success(Category::Update, &target.account_name, outcome),
                Err(e) => {
                    warn!(account = %target.account_name, error = %e, "Update failed");
                    self.failure(Category::Update, &target.account_name, e.to_string())
                }
            };
            report.results.push(result);
        }
        report
    }

    async fn apply_changes<D>(
        &self,
        dir: &D,
        target: &IdentityRecord,
        changes: &[ChangeRecord],
    ) -> DirectoryResult<Outcome>
    where
        D: TargetDirectory + ?Sized,
    {
        let mut replace = BTreeMap::new();
        let mut clear = Vec::new();
        let mut disable = false;
        let mut leaver = false;

        for change in changes {
            match change.attribute.as_str() {
                ENABLED => disable = true,
                PATH => leaver = true,
                name if change.new_value.is_empty() => clear.push(name.to_string()),
                name => {
                    replace.insert(name.to_string(), change.new_value.clone());
                }
            }
        }

        let path = target.path.as_str();
        if !replace.is_empty() {
            dir.replace_attributes(path, &replace).await?;
        }
        if !clear.is_empty() {
            dir.clear_attributes(path, &clear).await?;
        }

        let mut current = target.clone();
        if disable {
            dir.disable(path).await?;
            current.enabled = false;
        }

        if leaver {
            self.lifecycle
                .quarantine(dir, &current, "leaver in source")
                .await?;
            return Ok(Outcome::Quarantined);
        }
        Ok(Outcome::Updated)
    }

    async fn run_add<D, N>(
        &self,
        dir: &D,
        reconciliation: &Reconciliation,
        target_records: &[IdentityRecord],
        notifier: &N,
    ) -> CategoryReport
    where
        D: TargetDirectory + ?Sized,
        N: Notifier + ?Sized,
    {
        let mut report = CategoryReport::new(Category::Add);
        let candidates: Vec<String> = reconciliation
            .to_add
            .iter()
            .map(|r| r.account_name.clone())
            .collect();
        if !self.admit(&mut report, &candidates, notifier).await {
            return report;
        }

        let mut provisioner = IdentityProvisioner::new(
            self.config.provisioning.clone(),
            self.config.inactive_container.clone(),
            target_records,
        );

        for record in &reconciliation.to_add {
            let result = match provisioner.provision(dir, record).await {
                Ok(Outcome::Duplicate) => MutationResult::duplicate(
                    Category::Add,
                    &record.account_name,
                    self.mode.is_dry_run(),
                ),
                Ok(outcome) => self.success(Category::Add, &record.account_name, outcome),
                Err(e) => {
                    warn!(account = %record.account_name, error = %e, "Provisioning failed");
                    self.failure(Category::Add, &record.account_name, e.to_string())
                }
            };
            report.results.push(result);
        }

        if provisioner.allocator().is_some_and(|a| a.is_degraded()) {
            warn!("Numeric ids in this run were allocated from the fallback baseline");
        }
        report
    }

    async fn run_remove<D, N>(
        &self,
        dir: &D,
        reconciliation: &Reconciliation,
        notifier: &N,
    ) -> CategoryReport
    where
        D: TargetDirectory + ?Sized,
        N: Notifier + ?Sized,
    {
        let mut report = CategoryReport::new(Category::Remove);
        let candidates: Vec<String> = reconciliation
            .to_remove_eligible
            .iter()
            .map(|r| r.account_name.clone())
            .collect();
        if !self.admit(&mut report, &candidates, notifier).await {
            return report;
        }

        for record in &reconciliation.to_remove_eligible {
            let result = match self.lifecycle.remove(dir, record).await {
                Ok(outcome) => self.success(Category::Remove, &record.account_name, outcome),
                Err(e) => {
                    warn!(account = %record.account_name, error = %e, "Removal failed");
                    self.failure(Category::Remove, &record.account_name, e.to_string())
                }
            };
            report.results.push(result);
        }
        report
    }

    /// Consult the gate. Returns whether the category may run.
    async fn admit<N>(&self, report: &mut CategoryReport, candidates: &[String], notifier: &N) -> bool
    where
        N: Notifier + ?Sized,
    {
        if candidates.is_empty() {
            debug!(category = %report.category, "No candidates");
            report.status = CategoryStatus::Empty;
            return false;
        }

        match self.gate.evaluate(report.category, candidates) {
            GateDecision::Proceed => {
                report.status = CategoryStatus::Completed;
                true
            }
            GateDecision::Abort {
                threshold,
                candidates,
            } => {
                let subject = self.subject(&format!(
                    "{} aborted by safety gate ({} candidates, threshold {threshold})",
                    report.category,
                    candidates.len()
                ));
                notify_logged(notifier, &subject, &candidates.join("\n")).await;
                report.status = CategoryStatus::Aborted {
                    threshold,
                    candidates,
                };
                false
            }
        }
    }

    async fn notify_failures<N>(&self, report: &CategoryReport, notifier: &N)
    where
        N: Notifier + ?Sized,
    {
        let lines: Vec<String> = report
            .failures()
            .map(|r| format!("{}: {}", r.account_name, r.outcome))
            .collect();
        if lines.is_empty() {
            return;
        }
        let subject = self.subject(&format!("{} failed {} operation(s)", report.category, lines.len()));
        notify_logged(notifier, &subject, &lines.join("\n")).await;
    }

    fn subject(&self, message: &str) -> String {
        if self.mode.is_dry_run() {
            format!("idmirror [dry-run]: {message}")
        } else {
            format!("idmirror: {message}")
        }
    }

    fn success(&self, category: Category, account_name: &str, outcome: Outcome) -> MutationResult {
        MutationResult::success(category, account_name, outcome, self.mode.is_dry_run())
    }

    fn failure(&self, category: Category, account_name: &str, error: String) -> MutationResult {
        MutationResult::failure(category, account_name, error, self.mode.is_dry_run())
    }
}
