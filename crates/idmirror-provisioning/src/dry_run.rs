//! Dry-run decorator over a target directory.
//!
//! Reads pass through to the wrapped directory. Mutations are logged and
//! skipped, returning what the real call would have returned, so the engine
//! produces the same results in both modes.

use std::collections::BTreeMap;

use async_trait::async_trait;
use tracing::info;

use idmirror_connector::dn;
use idmirror_connector::error::{DirectoryError, DirectoryResult};
use idmirror_connector::identity::NewAccount;
use idmirror_connector::traits::{CounterStore, Directory, LookupOp, MutationOp, TargetDirectory};

/// Wraps a target directory and suppresses every mutation.
#[derive(Debug)]
pub struct DryRunDirectory<'a, D: ?Sized> {
    inner: &'a D,
}

impl<'a, D> DryRunDirectory<'a, D>
where
    D: TargetDirectory + ?Sized,
{
    /// Wrap `inner`.
    pub fn new(inner: &'a D) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<'a, D> Directory for DryRunDirectory<'a, D>
where
    D: TargetDirectory + ?Sized,
{
    fn display_name(&self) -> &str {
        self.inner.display_name()
    }

    async fn test_connection(&self) -> DirectoryResult<()> {
        self.inner.test_connection().await
    }
}

#[async_trait]
impl<'a, D> LookupOp for DryRunDirectory<'a, D>
where
    D: TargetDirectory + ?Sized,
{
    async fn account_name_exists(&self, account_name: &str) -> DirectoryResult<bool> {
        self.inner.account_name_exists(account_name).await
    }

    async fn group_memberships(&self, dn: &str) -> DirectoryResult<Vec<String>> {
        self.inner.group_memberships(dn).await
    }
}

#[async_trait]
impl<'a, D> MutationOp for DryRunDirectory<'a, D>
where
    D: TargetDirectory + ?Sized,
{
    async fn create(&self, account: &NewAccount) -> DirectoryResult<String> {
        info!(
            dry_run = true,
            dn = %account.dn(),
            numeric_id = account.numeric_id,
            "Would create account"
        );
        Ok(account.dn().to_string())
    }

    async fn replace_attributes(
        &self,
        dn: &str,
        values: &BTreeMap<String, String>,
    ) -> DirectoryResult<()> {
        let names: Vec<&str> = values.keys().map(String::as_str).collect();
        info!(dry_run = true, dn, attributes = ?names, "Would replace attributes");
        Ok(())
    }

    async fn clear_attributes(&self, dn: &str, names: &[String]) -> DirectoryResult<()> {
        info!(dry_run = true, dn, attributes = ?names, "Would clear attributes");
        Ok(())
    }

    async fn disable(&self, dn: &str) -> DirectoryResult<()> {
        info!(dry_run = true, dn, "Would disable account");
        Ok(())
    }

    async fn move_to(&self, dn: &str, container: &str) -> DirectoryResult<String> {
        let rdn = dn::leading_rdn(dn).ok_or_else(|| DirectoryError::InvalidValue {
            attribute: "distinguishedName".to_string(),
            message: format!("cannot move '{dn}': no RDN"),
        })?;
        let new_dn = format!("{rdn},{container}");
        info!(dry_run = true, dn, new_dn = %new_dn, "Would move object");
        Ok(new_dn)
    }

    async fn delete(&self, dn: &str) -> DirectoryResult<()> {
        info!(dry_run = true, dn, "Would delete object");
        Ok(())
    }

    async fn remove_group_membership(&self, dn: &str, groups: &[String]) -> DirectoryResult<()> {
        info!(dry_run = true, dn, groups = groups.len(), "Would remove group memberships");
        Ok(())
    }
}

#[async_trait]
impl<'a, D> CounterStore for DryRunDirectory<'a, D>
where
    D: TargetDirectory + ?Sized,
{
    async fn read_counter(&self) -> DirectoryResult<u64> {
        self.inner.read_counter().await
    }

    async fn write_counter(&self, value: u64) -> DirectoryResult<()> {
        info!(dry_run = true, value, "Would write numeric id counter");
        Ok(())
    }
}
