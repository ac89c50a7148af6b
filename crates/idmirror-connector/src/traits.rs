//! Directory capability traits
//!
//! Capability-based trait definitions: a directory implements only what it
//! supports. The sync engine needs [`SnapshotOp`] from the source domain and
//! [`TargetDirectory`] (lookup, mutation, counter) from the target domain.

use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::error::DirectoryResult;
use crate::identity::{IdentityRecord, NewAccount};

/// Base trait for all directories.
#[async_trait]
pub trait Directory: Send + Sync {
    /// Display name for this directory instance, used in logs and reports.
    fn display_name(&self) -> &str;

    /// Test the connection to the directory.
    async fn test_connection(&self) -> DirectoryResult<()>;
}

/// Capability for extracting a full snapshot of managed identities.
#[async_trait]
pub trait SnapshotOp: Directory {
    /// Return every managed identity, pre-filtered to exclude test and
    /// service accounts and sorted by correlation identifier.
    async fn snapshot(&self) -> DirectoryResult<Vec<IdentityRecord>>;
}

/// Read-only lookups used while planning mutations.
#[async_trait]
pub trait LookupOp: Directory {
    /// Check whether any object in the directory already uses `account_name`.
    ///
    /// Unlike the snapshot, this sees filtered-out accounts too.
    async fn account_name_exists(&self, account_name: &str) -> DirectoryResult<bool>;

    /// DNs of the groups `dn` is a direct member of.
    async fn group_memberships(&self, dn: &str) -> DirectoryResult<Vec<String>>;
}

/// Capability for changing objects in the directory.
#[async_trait]
pub trait MutationOp: Directory {
    /// Create a new account. Returns the DN of the created object.
    async fn create(&self, account: &NewAccount) -> DirectoryResult<String>;

    /// Replace attribute values on an existing object.
    async fn replace_attributes(
        &self,
        dn: &str,
        values: &BTreeMap<String, String>,
    ) -> DirectoryResult<()>;

    /// Remove all values of the named attributes.
    async fn clear_attributes(&self, dn: &str, names: &[String]) -> DirectoryResult<()>;

    /// Disable the account.
    async fn disable(&self, dn: &str) -> DirectoryResult<()>;

    /// Move the object into `container`. Returns the new DN.
    async fn move_to(&self, dn: &str, container: &str) -> DirectoryResult<String>;

    /// Permanently delete the object.
    async fn delete(&self, dn: &str) -> DirectoryResult<()>;

    /// Remove `dn` from each of `groups`.
    async fn remove_group_membership(&self, dn: &str, groups: &[String]) -> DirectoryResult<()>;
}

/// Shared monotonic numeric-ID counter stored on a directory object.
///
/// # Single writer
///
/// Reads and writes are not atomic with respect to each other and no lock is
/// taken. Correctness depends on the scheduler never running two sync runs
/// against the same counter object at once.
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Read the current counter value.
    async fn read_counter(&self) -> DirectoryResult<u64>;

    /// Persist a new counter value.
    async fn write_counter(&self, value: u64) -> DirectoryResult<()>;
}

/// Everything the sync engine needs from the target domain.
pub trait TargetDirectory: LookupOp + MutationOp + CounterStore {}

impl<T> TargetDirectory for T where T: LookupOp + MutationOp + CounterStore {}
