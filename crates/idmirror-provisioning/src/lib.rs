//! # Sync Engine
//!
//! Reconciliation, provisioning and removal lifecycle for idmirror.
//!
//! A run compares an authoritative source directory against a target
//! directory and converges the target:
//!
//! - new source identities are created in the target, disabled
//! - matched identities get their tracked attributes brought in line
//! - target identities missing from the source are quarantined, then
//!   deleted on a later run
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐     ┌──────────────┐     ┌──────────────┐
//! │   Source     │────►│  Reconciler  │◄────│   Target     │
//! │  (snapshot)  │     │   + Differ   │     │  (snapshot)  │
//! └──────────────┘     └──────┬───────┘     └──────▲───────┘
//!                             │                    │
//!                     ┌───────▼───────┐            │
//!                     │  Safety Gate  │            │
//!                     │ (per category)│            │
//!                     └───────┬───────┘            │
//!          ┌──────────────────┼──────────────────┐ │
//!          ▼                  ▼                  ▼ │
//!    ┌──────────┐      ┌─────────────┐     ┌──────────┐
//!    │  Update  │      │ Provisioner │     │ Lifecycle│
//!    └────┬─────┘      └──────┬──────┘     └────┬─────┘
//!         └───────────────────┴─────────────────┘
//!                  (dry-run decorator when not applying)
//! ```
//!
//! ## Example
//!
//! ```ignore
//! use idmirror_provisioning::{RunMode, SyncConfig, SyncOrchestrator, TracingNotifier};
//!
//! let config = SyncConfig::new(
//!     "OU=Inactive,DC=corp,DC=local",
//!     "OU=Leavers,DC=corp,DC=local",
//!     "corp.example",
//! );
//! let orchestrator = SyncOrchestrator::new(config, RunMode::DryRun)?;
//! let report = orchestrator.run(&source, &target, &TracingNotifier).await?;
//! ```

pub mod config;
pub mod dry_run;
pub mod error;
pub mod lifecycle;
pub mod notify;
pub mod orchestrator;
pub mod provisioner;
pub mod reconciliation;
pub mod report;
pub mod safety;

pub use config::{PasswordPolicy, ProvisioningConfig, SyncConfig, Thresholds};
pub use dry_run::DryRunDirectory;
pub use error::{NotifyError, ProvisionError, ReconcileError, SyncError, SyncResult};
pub use lifecycle::{LifecycleEngine, RemovalStage};
pub use notify::{Notifier, TracingNotifier};
pub use orchestrator::{RunMode, SyncOrchestrator};
pub use provisioner::IdentityProvisioner;
pub use reconciliation::{reconcile, AttributeDiffer, Category, ChangeRecord, Reconciliation};
pub use report::{
    CategoryReport, CategoryStatus, MutationResult, Outcome, RunStatistics, SyncReport,
};
pub use safety::{GateDecision, SafetyGate};
