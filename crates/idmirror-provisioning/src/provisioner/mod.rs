//! Identity provisioning.
//!
//! Creates target accounts for source identities the target lacks. Every
//! account is created disabled inside the inactive container under a
//! collision-free name, with a generated password and a numeric ID taken from
//! the shared counter.

pub mod allocator;
pub mod naming;
pub mod password;

use std::collections::HashSet;

use tracing::{info, instrument, warn};

use idmirror_connector::dn;
use idmirror_connector::identity::{IdentityRecord, NewAccount};
use idmirror_connector::traits::TargetDirectory;

use crate::config::ProvisioningConfig;
use crate::error::ProvisionError;
use crate::lifecycle::audit_note;
use crate::report::Outcome;

pub use allocator::IdAllocator;
pub use naming::{resolve_account_name, ResolvedName};
pub use password::{generate_password, generate_password_with};

/// Provisions new identities for one run.
///
/// Holds the run-scoped state: alternate-key indexes over the target
/// snapshot, names allocated so far, and the numeric-ID allocator, which is
/// loaded on the first creation attempt.
#[derive(Debug)]
pub struct IdentityProvisioner {
    config: ProvisioningConfig,
    inactive_container: String,
    known_mail: HashSet<String>,
    known_ids: HashSet<String>,
    allocated_names: HashSet<String>,
    allocator: Option<IdAllocator>,
}

impl IdentityProvisioner {
    /// Create a provisioner indexing the `existing` target snapshot.
    pub fn new(
        config: ProvisioningConfig,
        inactive_container: impl Into<String>,
        existing: &[IdentityRecord],
    ) -> Self {
        let known_mail = existing
            .iter()
            .filter_map(|r| mail_key(&r.mail))
            .collect();
        let known_ids = existing
            .iter()
            .map(|r| r.correlation_id.clone())
            .collect();

        Self {
            config,
            inactive_container: inactive_container.into(),
            known_mail,
            known_ids,
            allocated_names: HashSet::new(),
            allocator: None,
        }
    }

    /// Numeric-ID allocator state, once loaded.
    #[must_use]
    pub fn allocator(&self) -> Option<&IdAllocator> {
        self.allocator.as_ref()
    }

    /// Whether `record` already exists in the target under an alternate key.
    #[must_use]
    pub fn is_duplicate(&self, record: &IdentityRecord) -> bool {
        self.known_ids.contains(&record.correlation_id)
            || mail_key(&record.mail).is_some_and(|mail| self.known_mail.contains(&mail))
    }

    /// Provision one source record.
    #[instrument(skip(self, dir, record), fields(account = %record.account_name))]
    pub async fn provision<D>(
        &mut self,
        dir: &D,
        record: &IdentityRecord,
    ) -> Result<Outcome, ProvisionError>
    where
        D: TargetDirectory + ?Sized,
    {
        if self.is_duplicate(record) {
            warn!(
                correlation_id = %record.correlation_id,
                mail = %record.mail,
                "Identity already present in target under an alternate key"
            );
            return Ok(Outcome::Duplicate);
        }

        let desired = record.account_name.trim();
        if desired.is_empty() {
            return Err(ProvisionError::MissingAccountName {
                correlation_id: record.correlation_id.clone(),
            });
        }

        let resolved = resolve_account_name(
            dir,
            desired,
            &self.allocated_names,
            self.config.max_name_suffix,
        )
        .await?;

        let mut allocator = match self.allocator {
            Some(allocator) => allocator,
            None => IdAllocator::load(dir, self.config.id_counter_baseline).await,
        };
        self.allocator = Some(allocator);

        let account = self.build_account(record, &resolved, allocator.current())?;
        let created_dn = dir.create(&account).await?;
        info!(
            dn = %created_dn,
            numeric_id = account.numeric_id,
            suffixed = resolved.suffixed,
            "Created account"
        );

        self.allocated_names.insert(resolved.name.to_lowercase());
        self.known_ids.insert(record.correlation_id.clone());
        if let Some(mail) = mail_key(&record.mail) {
            self.known_mail.insert(mail);
        }

        let committed = allocator.commit(dir).await;
        self.allocator = Some(allocator);
        committed.map_err(|source| ProvisionError::CounterWriteBack {
            account_name: resolved.name.clone(),
            source,
        })?;

        Ok(if resolved.suffixed {
            Outcome::CreatedWithSuffix
        } else {
            Outcome::Created
        })
    }

    fn build_account(
        &self,
        source: &IdentityRecord,
        resolved: &ResolvedName,
        numeric_id: u64,
    ) -> Result<NewAccount, ProvisionError> {
        let mut record = source.clone();
        record.account_name = resolved.name.clone();
        record.enabled = false;
        record.path = dn::build_user_dn(&resolved.name, &self.inactive_container)?;
        record.exemption = None;
        record.info = audit_note("created by idmirror");

        let password = generate_password(&self.config.password);
        Ok(NewAccount::new(
            record,
            self.config.user_principal_name(&resolved.name),
            self.config.home_directory(&resolved.name),
            numeric_id,
            password,
        ))
    }
}

fn mail_key(mail: &str) -> Option<String> {
    let mail = mail.trim();
    (!mail.is_empty()).then(|| mail.to_lowercase())
}
