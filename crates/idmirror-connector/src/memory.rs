//! In-memory directory for tests.
//!
//! Implements every capability over a `BTreeMap` keyed by normalized DN,
//! records each mutating call, and can be told to fail specific operations.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use crate::attributes::write_attribute;
use crate::dn;
use crate::error::{DirectoryError, DirectoryResult};
use crate::identity::{IdentityRecord, NewAccount};
use crate::traits::{CounterStore, Directory, LookupOp, MutationOp, SnapshotOp};

/// Operation kinds that can be made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    Snapshot,
    AccountNameExists,
    GroupMemberships,
    Create,
    ReplaceAttributes,
    ClearAttributes,
    Disable,
    Move,
    Delete,
    RemoveGroupMembership,
    ReadCounter,
    WriteCounter,
}

/// A mutating call observed by the directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectoryCall {
    Create { dn: String, numeric_id: u64 },
    ReplaceAttributes { dn: String, values: BTreeMap<String, String> },
    ClearAttributes { dn: String, names: Vec<String> },
    Disable { dn: String },
    Move { dn: String, container: String },
    Delete { dn: String },
    RemoveGroupMembership { dn: String, groups: Vec<String> },
    WriteCounter { value: u64 },
}

#[derive(Debug, Clone)]
struct Entry {
    record: IdentityRecord,
    groups: Vec<String>,
}

#[derive(Debug, Default)]
struct State {
    entries: BTreeMap<String, Entry>,
    reserved_names: BTreeSet<String>,
    counter: Option<u64>,
    failures: Vec<(OperationKind, String)>,
    calls: Vec<DirectoryCall>,
}

/// Directory held entirely in memory.
#[derive(Debug)]
pub struct InMemoryDirectory {
    name: String,
    state: Mutex<State>,
}

impl InMemoryDirectory {
    /// Create an empty directory.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: Mutex::new(State::default()),
        }
    }

    /// Add a record at its `path`.
    pub fn with_record(self, record: IdentityRecord) -> Self {
        self.insert(record, Vec::new());
        self
    }

    /// Add a record together with its group memberships.
    pub fn with_member_record(self, record: IdentityRecord, groups: &[&str]) -> Self {
        self.insert(record, groups.iter().map(|g| (*g).to_string()).collect());
        self
    }

    /// Reserve an account name that exists outside the managed snapshot.
    pub fn with_reserved_name(self, account_name: &str) -> Self {
        self.lock()
            .reserved_names
            .insert(account_name.to_lowercase());
        self
    }

    /// Initialize the numeric-ID counter object.
    pub fn with_counter(self, value: u64) -> Self {
        self.lock().counter = Some(value);
        self
    }

    /// Fail every `kind` operation whose DN or account name contains `needle`.
    /// An empty needle fails all operations of that kind.
    pub fn fail_on(self, kind: OperationKind, needle: &str) -> Self {
        self.lock().failures.push((kind, needle.to_lowercase()));
        self
    }

    /// Current records, sorted by correlation identifier.
    pub fn records(&self) -> Vec<IdentityRecord> {
        let mut records: Vec<IdentityRecord> = self
            .lock()
            .entries
            .values()
            .map(|e| e.record.clone())
            .collect();
        records.sort_by(|a, b| a.correlation_id.cmp(&b.correlation_id));
        records
    }

    /// Find a record by correlation identifier.
    pub fn record(&self, correlation_id: &str) -> Option<IdentityRecord> {
        self.lock()
            .entries
            .values()
            .find(|e| e.record.correlation_id == correlation_id)
            .map(|e| e.record.clone())
    }

    /// Group memberships of the object at `dn`.
    pub fn groups_of(&self, dn: &str) -> Vec<String> {
        self.lock()
            .entries
            .get(&dn::normalize(dn))
            .map(|e| e.groups.clone())
            .unwrap_or_default()
    }

    /// Current counter value.
    pub fn counter(&self) -> Option<u64> {
        self.lock().counter
    }

    /// Every mutating call received so far.
    pub fn calls(&self) -> Vec<DirectoryCall> {
        self.lock().calls.clone()
    }

    fn insert(&self, record: IdentityRecord, groups: Vec<String>) {
        self.lock()
            .entries
            .insert(dn::normalize(&record.path), Entry { record, groups });
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl State {
    fn check(&self, kind: OperationKind, subject: &str) -> DirectoryResult<()> {
        let subject = subject.to_lowercase();
        let failing = self
            .failures
            .iter()
            .any(|(k, needle)| *k == kind && subject.contains(needle.as_str()));
        if failing {
            return Err(DirectoryError::operation_failed(format!(
                "injected {kind:?} failure for {subject}"
            )));
        }
        Ok(())
    }

    fn entry_mut(&mut self, dn: &str) -> DirectoryResult<&mut Entry> {
        self.entries
            .get_mut(&dn::normalize(dn))
            .ok_or_else(|| DirectoryError::ObjectNotFound {
                identifier: dn.to_string(),
            })
    }
}

#[async_trait]
impl Directory for InMemoryDirectory {
    fn display_name(&self) -> &str {
        &self.name
    }

    async fn test_connection(&self) -> DirectoryResult<()> {
        Ok(())
    }
}

#[async_trait]
impl SnapshotOp for InMemoryDirectory {
    async fn snapshot(&self) -> DirectoryResult<Vec<IdentityRecord>> {
        self.lock().check(OperationKind::Snapshot, "")?;
        Ok(self.records())
    }
}

#[async_trait]
impl LookupOp for InMemoryDirectory {
    async fn account_name_exists(&self, account_name: &str) -> DirectoryResult<bool> {
        let state = self.lock();
        state.check(OperationKind::AccountNameExists, account_name)?;
        let lowered = account_name.to_lowercase();
        Ok(state.reserved_names.contains(&lowered)
            || state
                .entries
                .values()
                .any(|e| e.record.account_name.eq_ignore_ascii_case(account_name)))
    }

    async fn group_memberships(&self, dn: &str) -> DirectoryResult<Vec<String>> {
        let mut state = self.lock();
        state.check(OperationKind::GroupMemberships, dn)?;
        Ok(state.entry_mut(dn)?.groups.clone())
    }
}

#[async_trait]
impl MutationOp for InMemoryDirectory {
    async fn create(&self, account: &NewAccount) -> DirectoryResult<String> {
        let mut state = self.lock();
        state.check(OperationKind::Create, account.dn())?;

        let key = dn::normalize(account.dn());
        let name_taken = state
            .entries
            .values()
            .any(|e| e.record.account_name.eq_ignore_ascii_case(account.account_name()));
        if state.entries.contains_key(&key) || name_taken {
            return Err(DirectoryError::ObjectAlreadyExists {
                identifier: account.dn().to_string(),
            });
        }

        state.calls.push(DirectoryCall::Create {
            dn: account.dn().to_string(),
            numeric_id: account.numeric_id,
        });
        state.entries.insert(
            key,
            Entry {
                record: account.record.clone(),
                groups: Vec::new(),
            },
        );
        Ok(account.dn().to_string())
    }

    async fn replace_attributes(
        &self,
        dn: &str,
        values: &BTreeMap<String, String>,
    ) -> DirectoryResult<()> {
        let mut state = self.lock();
        state.check(OperationKind::ReplaceAttributes, dn)?;
        let entry = state.entry_mut(dn)?;
        for (name, value) in values {
            write_attribute(&mut entry.record, name, Some(value))?;
        }
        state.calls.push(DirectoryCall::ReplaceAttributes {
            dn: dn.to_string(),
            values: values.clone(),
        });
        Ok(())
    }

    async fn clear_attributes(&self, dn: &str, names: &[String]) -> DirectoryResult<()> {
        let mut state = self.lock();
        state.check(OperationKind::ClearAttributes, dn)?;
        let entry = state.entry_mut(dn)?;
        for name in names {
            write_attribute(&mut entry.record, name, None)?;
        }
        state.calls.push(DirectoryCall::ClearAttributes {
            dn: dn.to_string(),
            names: names.to_vec(),
        });
        Ok(())
    }

    async fn disable(&self, dn: &str) -> DirectoryResult<()> {
        let mut state = self.lock();
        state.check(OperationKind::Disable, dn)?;
        state.entry_mut(dn)?.record.enabled = false;
        state.calls.push(DirectoryCall::Disable { dn: dn.to_string() });
        Ok(())
    }

    async fn move_to(&self, dn: &str, container: &str) -> DirectoryResult<String> {
        let mut state = self.lock();
        state.check(OperationKind::Move, dn)?;
        let mut entry = state
            .entries
            .remove(&dn::normalize(dn))
            .ok_or_else(|| DirectoryError::ObjectNotFound {
                identifier: dn.to_string(),
            })?;
        let rdn = dn::leading_rdn(dn).unwrap_or_default();
        let new_dn = format!("{rdn},{container}");
        entry.record.path = new_dn.clone();
        state.entries.insert(dn::normalize(&new_dn), entry);
        state.calls.push(DirectoryCall::Move {
            dn: dn.to_string(),
            container: container.to_string(),
        });
        Ok(new_dn)
    }

    async fn delete(&self, dn: &str) -> DirectoryResult<()> {
        let mut state = self.lock();
        state.check(OperationKind::Delete, dn)?;
        state
            .entries
            .remove(&dn::normalize(dn))
            .ok_or_else(|| DirectoryError::ObjectNotFound {
                identifier: dn.to_string(),
            })?;
        state.calls.push(DirectoryCall::Delete { dn: dn.to_string() });
        Ok(())
    }

    async fn remove_group_membership(&self, dn: &str, groups: &[String]) -> DirectoryResult<()> {
        let mut state = self.lock();
        state.check(OperationKind::RemoveGroupMembership, dn)?;
        let entry = state.entry_mut(dn)?;
        entry
            .groups
            .retain(|g| !groups.iter().any(|r| dn::normalize(r) == dn::normalize(g)));
        state.calls.push(DirectoryCall::RemoveGroupMembership {
            dn: dn.to_string(),
            groups: groups.to_vec(),
        });
        Ok(())
    }
}

#[async_trait]
impl CounterStore for InMemoryDirectory {
    async fn read_counter(&self) -> DirectoryResult<u64> {
        let state = self.lock();
        state.check(OperationKind::ReadCounter, "")?;
        state.counter.ok_or_else(|| DirectoryError::ObjectNotFound {
            identifier: "numeric id counter".to_string(),
        })
    }

    async fn write_counter(&self, value: u64) -> DirectoryResult<()> {
        let mut state = self.lock();
        state.check(OperationKind::WriteCounter, "")?;
        state.counter = Some(value);
        state.calls.push(DirectoryCall::WriteCounter { value });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn directory() -> InMemoryDirectory {
        InMemoryDirectory::new("target").with_member_record(
            IdentityRecord::new("1001", "jsmith")
                .with_enabled(true)
                .with_path("CN=jsmith,OU=Users,DC=corp"),
            &["CN=Staff,OU=Groups,DC=corp", "CN=VPN,OU=Groups,DC=corp"],
        )
    }

    #[tokio::test]
    async fn test_move_rewrites_path() {
        let dir = directory();
        let new_dn = dir
            .move_to("CN=jsmith,OU=Users,DC=corp", "OU=Leavers,DC=corp")
            .await
            .unwrap();
        assert_eq!(new_dn, "CN=jsmith,OU=Leavers,DC=corp");
        assert_eq!(dir.record("1001").unwrap().path, new_dn);
        assert_eq!(dir.groups_of(&new_dn).len(), 2);
    }

    #[tokio::test]
    async fn test_remove_group_membership() {
        let dir = directory();
        dir.remove_group_membership(
            "CN=jsmith,OU=Users,DC=corp",
            &["cn=vpn,ou=groups,dc=corp".to_string()],
        )
        .await
        .unwrap();
        assert_eq!(
            dir.groups_of("CN=jsmith,OU=Users,DC=corp"),
            vec!["CN=Staff,OU=Groups,DC=corp".to_string()]
        );
    }

    #[tokio::test]
    async fn test_injected_failure() {
        let dir = directory().fail_on(OperationKind::Disable, "jsmith");
        let err = dir.disable("CN=jsmith,OU=Users,DC=corp").await.unwrap_err();
        assert_eq!(err.error_code(), "OPERATION_FAILED");
        assert!(dir.calls().is_empty());
    }

    #[tokio::test]
    async fn test_account_name_exists_sees_reserved_names() {
        let dir = directory().with_reserved_name("svc-backup");
        assert!(dir.account_name_exists("JSMITH").await.unwrap());
        assert!(dir.account_name_exists("svc-backup").await.unwrap());
        assert!(!dir.account_name_exists("adoe").await.unwrap());
    }

    #[tokio::test]
    async fn test_missing_counter_is_not_found() {
        let dir = directory();
        assert!(dir.read_counter().await.is_err());
        dir.write_counter(42).await.unwrap();
        assert_eq!(dir.read_counter().await.unwrap(), 42);
    }
}
