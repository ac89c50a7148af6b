//! Error types for the sync engine.
//!
//! Only [`SyncError`] escapes a run. Per-record failures are folded into
//! failed mutation results and never propagate.

use thiserror::Error;

use idmirror_connector::error::DirectoryError;

/// Invalid snapshot detected while reconciling.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReconcileError {
    /// Two records in one snapshot share a correlation identifier.
    #[error("duplicate correlation identifier '{id}' in {collection} snapshot")]
    DuplicateIdentifier { collection: String, id: String },

    /// A record carries an empty correlation identifier.
    #[error("record '{account_name}' in {collection} snapshot has no correlation identifier")]
    MissingIdentifier {
        collection: String,
        account_name: String,
    },
}

/// Errors while provisioning one new identity.
#[derive(Debug, Error)]
pub enum ProvisionError {
    /// Directory call failed.
    #[error(transparent)]
    Directory(#[from] DirectoryError),

    /// Every suffixed variant of the account name is taken.
    #[error("no free account name for '{base}' up to suffix {max_suffix:02}")]
    NameSpaceExhausted { base: String, max_suffix: u32 },

    /// Source record has no usable account name.
    #[error("record '{correlation_id}' has no account name")]
    MissingAccountName { correlation_id: String },

    /// Account created but the counter could not be written back.
    #[error("account '{account_name}' created but counter write-back failed: {source}")]
    CounterWriteBack {
        account_name: String,
        #[source]
        source: DirectoryError,
    },
}

/// Run-level errors that abort the whole sync.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Snapshot extraction failed for one domain.
    #[error("extraction from {domain} failed: {source}")]
    Extraction {
        domain: String,
        #[source]
        source: DirectoryError,
    },

    /// A snapshot failed validation.
    #[error(transparent)]
    Reconcile(#[from] ReconcileError),

    /// Configuration error.
    #[error("configuration error: {message}")]
    Configuration { message: String },
}

impl SyncError {
    /// Create an extraction error.
    pub fn extraction(domain: impl Into<String>, source: DirectoryError) -> Self {
        Self::Extraction {
            domain: domain.into(),
            source,
        }
    }

    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Get an error code for classification.
    pub fn error_code(&self) -> &'static str {
        match self {
            SyncError::Extraction { .. } => "EXTRACTION_FAILED",
            SyncError::Reconcile(_) => "INVALID_SNAPSHOT",
            SyncError::Configuration { .. } => "INVALID_CONFIG",
        }
    }
}

/// Notification delivery failure.
#[derive(Debug, Error)]
pub enum NotifyError {
    /// Transport-level failure reaching the notification endpoint.
    #[error("notification transport failed: {message}")]
    Transport {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Endpoint answered with a non-success status.
    #[error("notification rejected with status {status}")]
    Rejected { status: u16 },
}

impl NotifyError {
    /// Create a transport error with source.
    pub fn transport(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Transport {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}

/// Result type for sync runs.
pub type SyncResult<T> = Result<T, SyncError>;
