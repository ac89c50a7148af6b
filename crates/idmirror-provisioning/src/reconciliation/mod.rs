//! # Reconciliation
//!
//! Pure comparison of two directory snapshots.
//!
//! ```text
//!  source snapshot ─┐                 ┌─► to_add ──────────► provisioner
//!                   ├─► reconcile() ──┼─► matched ─► differ ─► change records
//!  target snapshot ─┘                 └─► to_remove_eligible ─► lifecycle
//! ```
//!
//! Nothing here touches a directory; the orchestrator feeds the results to
//! the mutation stages.

pub mod differ;
pub mod reconciler;
pub mod types;

pub use differ::AttributeDiffer;
pub use reconciler::reconcile;
pub use types::{Category, ChangeRecord, MatchedPair, Reconciliation};
