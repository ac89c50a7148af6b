//! idmirror - directory-to-directory identity reconciliation
//!
//! One invocation performs one run:
//! - extract both directories and reconcile them
//! - bring matched identities in line with the source
//! - create missing identities, disabled
//! - quarantine, then delete, identities absent from the source
//!
//! Nothing is changed unless `--apply` is given.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};

use idmirror_connector_ldap::LdapDirectory;
use idmirror_provisioning::{RunMode, SyncOrchestrator, SyncReport};

mod config;
mod error;
mod export;
mod logging;
mod notify;

use config::AppConfig;
use error::CliResult;
use notify::AppNotifier;

/// Reconcile a target directory against an authoritative source directory
#[derive(Parser, Debug)]
#[command(name = "idmirror")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the YAML configuration file
    #[arg(
        long,
        env = "IDMIRROR_CONFIG",
        default_value = "./config/idmirror.yaml"
    )]
    config: PathBuf,

    /// Execute mutations (default is a dry run)
    #[arg(long)]
    apply: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "idmirror run failed");
            eprintln!("Error: {e}");
            ExitCode::from(u8::try_from(e.exit_code()).unwrap_or(1))
        }
    }
}

async fn run(cli: Cli) -> CliResult<()> {
    let config = AppConfig::load(&cli.config)?;
    logging::init_logging(&config.logging)?;

    let mode = if cli.apply {
        RunMode::Apply
    } else {
        RunMode::DryRun
    };
    info!(
        config = %cli.config.display(),
        dry_run = mode.is_dry_run(),
        "Starting idmirror"
    );

    let source = LdapDirectory::new("source", config.source.clone())?;
    let target = LdapDirectory::new("target", config.target.clone())?;
    let notifier = AppNotifier::from_config(&config.notify)?;
    let orchestrator = SyncOrchestrator::new(config.sync.clone(), mode)?;

    let report = orchestrator.run(&source, &target, &notifier).await?;

    // The run has completed; output failures no longer affect the exit code.
    publish_report(&report, &config.export.directory);
    Ok(())
}

/// Export the CSV audit files and print the run statistics.
///
/// Failures are logged. Returns whether every output was produced.
fn publish_report(report: &SyncReport, export_directory: &Path) -> bool {
    let mut complete = true;

    if let Err(e) = export::export_report(report, export_directory) {
        error!(
            error = %e,
            run_id = %report.run_id,
            directory = %export_directory.display(),
            "Failed to export run report"
        );
        complete = false;
    }

    match serde_json::to_string_pretty(&report.statistics) {
        Ok(summary) => println!("{summary}"),
        Err(e) => {
            error!(error = %e, run_id = %report.run_id, "Failed to render run summary");
            complete = false;
        }
    }

    complete
}
