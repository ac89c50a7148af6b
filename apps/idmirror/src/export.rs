//! CSV audit export.
//!
//! Per run and category, writes `changes-<run>-<category>.csv` (update only)
//! and `results-<run>-<category>.csv` into the export directory.

use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::info;

use idmirror_provisioning::{CategoryReport, ChangeRecord, MutationResult, SyncReport};

use crate::error::{CliError, CliResult};

#[derive(Debug, Serialize)]
struct CsvResultRecord<'a> {
    category: &'a str,
    account_name: &'a str,
    success: bool,
    outcome: String,
    dry_run: bool,
    executed_at: String,
}

impl<'a> From<&'a MutationResult> for CsvResultRecord<'a> {
    fn from(result: &'a MutationResult) -> Self {
        Self {
            category: result.category.as_str(),
            account_name: &result.account_name,
            success: result.success,
            outcome: result.outcome.to_string(),
            dry_run: result.dry_run,
            executed_at: result.executed_at.to_rfc3339(),
        }
    }
}

/// Write change records as CSV.
pub fn write_changes_csv<W: Write>(changes: &[ChangeRecord], writer: W) -> CliResult<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    for change in changes {
        wtr.serialize(change)
            .map_err(|e| CliError::Export(format!("CSV write error: {e}")))?;
    }
    wtr.flush()
        .map_err(|e| CliError::Export(format!("Failed to flush CSV: {e}")))
}

/// Write mutation results as CSV.
pub fn write_results_csv<W: Write>(results: &[MutationResult], writer: W) -> CliResult<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    for result in results {
        wtr.serialize(CsvResultRecord::from(result))
            .map_err(|e| CliError::Export(format!("CSV write error: {e}")))?;
    }
    wtr.flush()
        .map_err(|e| CliError::Export(format!("Failed to flush CSV: {e}")))
}

/// Export every non-empty category of `report` into `directory`.
///
/// Returns the paths written.
pub fn export_report(report: &SyncReport, directory: &Path) -> CliResult<Vec<PathBuf>> {
    std::fs::create_dir_all(directory).map_err(|e| {
        CliError::Export(format!("cannot create {}: {e}", directory.display()))
    })?;

    let label = report.run_label();
    let mut written = Vec::new();
    for category in &report.categories {
        written.extend(export_category(category, &label, directory)?);
    }

    info!(
        files = written.len(),
        directory = %directory.display(),
        "Exported run report"
    );
    Ok(written)
}

fn export_category(
    report: &CategoryReport,
    label: &str,
    directory: &Path,
) -> CliResult<Vec<PathBuf>> {
    let category = report.category.as_str();
    let mut written = Vec::new();

    if !report.changes.is_empty() {
        let path = directory.join(format!("changes-{label}-{category}.csv"));
        write_changes_csv(&report.changes, create(&path)?)?;
        written.push(path);
    }
    if !report.results.is_empty() {
        let path = directory.join(format!("results-{label}-{category}.csv"));
        write_results_csv(&report.results, create(&path)?)?;
        written.push(path);
    }
    Ok(written)
}

fn create(path: &Path) -> CliResult<std::fs::File> {
    std::fs::File::create(path)
        .map_err(|e| CliError::Export(format!("cannot create {}: {e}", path.display())))
}
