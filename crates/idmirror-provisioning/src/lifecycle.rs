//! Two-stage removal lifecycle.
//!
//! ```text
//!  (not removed) ──quarantine──► Quarantined ──delete──► Deleted
//!                 disable           (under the leavers container)
//!                 strip groups
//!                 audit note
//!                 settle, move
//! ```
//!
//! The stage is chosen from the record's path at the start of the run, so an
//! identity needs two runs to go from active to deleted.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, info};

use idmirror_connector::attributes::{format_timestamp, INFO};
use idmirror_connector::dn;
use idmirror_connector::error::DirectoryResult;
use idmirror_connector::identity::IdentityRecord;
use idmirror_connector::traits::{LookupOp, MutationOp};

use crate::report::Outcome;

/// Removal transition for one record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemovalStage {
    /// Not under the leavers container yet.
    Quarantine,
    /// Already under the leavers container.
    Delete,
}

/// Drives quarantine and delete transitions.
#[derive(Debug, Clone)]
pub struct LifecycleEngine {
    leavers_container: String,
    settle_delay: Duration,
    dry_run: bool,
}

impl LifecycleEngine {
    /// Create an engine. The settle delay is skipped when `dry_run` is set.
    pub fn new(leavers_container: impl Into<String>, settle_delay: Duration, dry_run: bool) -> Self {
        Self {
            leavers_container: leavers_container.into(),
            settle_delay,
            dry_run,
        }
    }

    /// Choose the transition for `record`.
    #[must_use]
    pub fn plan(&self, record: &IdentityRecord) -> RemovalStage {
        if dn::is_within(&record.path, &self.leavers_container) {
            RemovalStage::Delete
        } else {
            RemovalStage::Quarantine
        }
    }

    /// Run the planned transition for a remove-eligible record.
    pub async fn remove<D>(&self, dir: &D, record: &IdentityRecord) -> DirectoryResult<Outcome>
    where
        D: LookupOp + MutationOp + ?Sized,
    {
        match self.plan(record) {
            RemovalStage::Quarantine => {
                self.quarantine(dir, record, "absent from source").await?;
                Ok(Outcome::Quarantined)
            }
            RemovalStage::Delete => {
                self.delete(dir, record).await?;
                Ok(Outcome::Deleted)
            }
        }
    }

    /// Disable, strip groups, annotate, settle, then move to the leavers
    /// container. Returns the new path.
    pub async fn quarantine<D>(
        &self,
        dir: &D,
        record: &IdentityRecord,
        reason: &str,
    ) -> DirectoryResult<String>
    where
        D: LookupOp + MutationOp + ?Sized,
    {
        let path = record.path.as_str();
        info!(account = %record.account_name, dn = %path, reason, "Quarantining identity");

        if record.enabled {
            dir.disable(path).await?;
        }

        let groups = dir.group_memberships(path).await?;
        if !groups.is_empty() {
            debug!(account = %record.account_name, groups = groups.len(), "Stripping group memberships");
            dir.remove_group_membership(path, &groups).await?;
        }

        let note = format!("quarantined by idmirror: {reason}");
        self.annotate(dir, record, &note).await?;
        self.settle().await;

        dir.move_to(path, &self.leavers_container).await
    }

    /// Annotate, settle, then permanently delete.
    pub async fn delete<D>(&self, dir: &D, record: &IdentityRecord) -> DirectoryResult<()>
    where
        D: MutationOp + ?Sized,
    {
        info!(account = %record.account_name, dn = %record.path, "Deleting quarantined identity");

        self.annotate(dir, record, "deleted by idmirror after quarantine")
            .await?;
        self.settle().await;

        dir.delete(&record.path).await
    }

    async fn annotate<D>(&self, dir: &D, record: &IdentityRecord, note: &str) -> DirectoryResult<()>
    where
        D: MutationOp + ?Sized,
    {
        let info = append_note(&record.info, &audit_note(note));
        let values = BTreeMap::from([(INFO.to_string(), info)]);
        dir.replace_attributes(&record.path, &values).await
    }

    async fn settle(&self) {
        if self.dry_run || self.settle_delay.is_zero() {
            return;
        }
        tokio::time::sleep(self.settle_delay).await;
    }
}

/// Timestamped audit note.
#[must_use]
pub fn audit_note(message: &str) -> String {
    format!("[{}] {message}", format_timestamp(Utc::now()))
}

/// Append `note` to an info field on its own line.
#[must_use]
pub fn append_note(existing: &str, note: &str) -> String {
    let existing = existing.trim_end();
    if existing.is_empty() {
        note.to_string()
    } else {
        format!("{existing}\n{note}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use idmirror_connector::memory::{DirectoryCall, InMemoryDirectory, OperationKind};

    const LEAVERS: &str = "OU=Leavers,DC=corp,DC=local";

    fn engine() -> LifecycleEngine {
        LifecycleEngine::new(LEAVERS, Duration::ZERO, false)
    }

    fn active() -> IdentityRecord {
        IdentityRecord::new("2", "adoe")
            .with_enabled(true)
            .with_path("CN=adoe,OU=Users,DC=corp,DC=local")
    }

    #[test]
    fn test_plan() {
        assert_eq!(engine().plan(&active()), RemovalStage::Quarantine);
        let quarantined = active().with_path("CN=adoe,ou=leavers,dc=corp,dc=local");
        assert_eq!(engine().plan(&quarantined), RemovalStage::Delete);
    }

    #[test]
    fn test_append_note() {
        assert_eq!(append_note("", "b"), "b");
        assert_eq!(append_note("a\n", "b"), "a\nb");
    }

    #[tokio::test]
    async fn test_quarantine_sequence() {
        let record = active();
        let dir = InMemoryDirectory::new("target")
            .with_member_record(record.clone(), &["CN=Staff,OU=Groups,DC=corp,DC=local"]);

        let outcome = engine().remove(&dir, &record).await.unwrap();
        assert_eq!(outcome, Outcome::Quarantined);

        let calls = dir.calls();
        assert!(matches!(calls[0], DirectoryCall::Disable { .. }));
        assert!(matches!(calls[1], DirectoryCall::RemoveGroupMembership { .. }));
        assert!(matches!(calls[2], DirectoryCall::ReplaceAttributes { .. }));
        assert!(matches!(calls[3], DirectoryCall::Move { .. }));
        assert_eq!(calls.len(), 4);

        let after = dir.record("2").unwrap();
        assert!(!after.enabled);
        assert_eq!(after.path, "CN=adoe,OU=Leavers,DC=corp,DC=local");
        assert!(after.info.contains("quarantined by idmirror"));
        assert!(dir.groups_of(&after.path).is_empty());
    }

    #[tokio::test]
    async fn test_quarantine_skips_empty_group_strip_and_disabled_accounts() {
        let record = active().with_enabled(false);
        let dir = InMemoryDirectory::new("target").with_record(record.clone());

        engine().remove(&dir, &record).await.unwrap();
        let calls = dir.calls();
        assert_eq!(calls.len(), 2);
        assert!(matches!(calls[0], DirectoryCall::ReplaceAttributes { .. }));
        assert!(matches!(calls[1], DirectoryCall::Move { .. }));
    }

    #[tokio::test]
    async fn test_delete_from_leavers() {
        let record = active().with_enabled(false).with_path("CN=adoe,OU=Leavers,DC=corp,DC=local");
        let dir = InMemoryDirectory::new("target").with_record(record.clone());

        let outcome = engine().remove(&dir, &record).await.unwrap();
        assert_eq!(outcome, Outcome::Deleted);
        assert!(dir.record("2").is_none());
        assert!(matches!(dir.calls()[0], DirectoryCall::ReplaceAttributes { .. }));
    }

    #[tokio::test]
    async fn test_failure_stops_the_transition() {
        let record = active();
        let dir = InMemoryDirectory::new("target")
            .with_record(record.clone())
            .fail_on(OperationKind::Disable, "adoe");

        assert!(engine().remove(&dir, &record).await.is_err());
        assert!(dir.calls().is_empty());
        assert_eq!(dir.record("2").unwrap().path, record.path);
    }

    #[tokio::test(start_paused = true)]
    async fn test_settle_delay_applies_in_apply_mode() {
        let record = active();
        let dir = InMemoryDirectory::new("target").with_record(record.clone());
        let engine = LifecycleEngine::new(LEAVERS, Duration::from_secs(2), false);

        let start = tokio::time::Instant::now();
        engine.remove(&dir, &record).await.unwrap();
        assert!(start.elapsed() >= Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_settle_delay_skipped_in_dry_run() {
        let record = active();
        let dir = InMemoryDirectory::new("target").with_record(record.clone());
        let engine = LifecycleEngine::new(LEAVERS, Duration::from_secs(2), true);

        let start = tokio::time::Instant::now();
        engine.remove(&dir, &record).await.unwrap();
        assert!(start.elapsed() < Duration::from_secs(2));
    }
}
