//! CLI error types and exit codes

use thiserror::Error;

use idmirror_connector::error::DirectoryError;
use idmirror_provisioning::SyncError;

/// Exit codes for the CLI
/// - 0: Run completed (including safety-gate aborts and per-record failures)
/// - 1: Fatal pre-flight failure
/// - 2: Configuration error
pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to read {path}: {message}")]
    ConfigFile { path: String, message: String },

    #[error("Directory setup failed: {0}")]
    Directory(#[from] DirectoryError),

    #[error(transparent)]
    Sync(#[from] SyncError),

    #[error("Export failed: {0}")]
    Export(String),
}

impl CliError {
    /// Process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Config(_) | CliError::ConfigFile { .. } => 2,
            CliError::Directory(DirectoryError::InvalidConfiguration { .. }) => 2,
            CliError::Sync(SyncError::Configuration { .. }) => 2,
            CliError::Directory(_) | CliError::Sync(_) | CliError::Export(_) => 1,
        }
    }
}
