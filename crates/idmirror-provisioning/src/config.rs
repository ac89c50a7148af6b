//! Sync engine configuration.
//!
//! Immutable for the duration of a run. Deserialized from the `sync` section
//! of the application config file.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use idmirror_connector::attributes;
use idmirror_connector::dn;

use crate::error::{SyncError, SyncResult};
use crate::reconciliation::Category;

/// Names the differ and orchestrator interpret themselves; a significant
/// attribute with one of these names would be applied as a disable, a leaver
/// move or an overwrite of the audit notes.
const RESERVED_ATTRIBUTES: [&str; 3] = [attributes::PATH, attributes::ENABLED, attributes::INFO];

/// Safety-gate thresholds per category.
///
/// A category aborts when its candidate count reaches the threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thresholds {
    #[serde(default = "default_add_threshold")]
    pub add: usize,
    #[serde(default = "default_update_threshold")]
    pub update: usize,
    #[serde(default = "default_remove_threshold")]
    pub remove: usize,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            add: default_add_threshold(),
            update: default_update_threshold(),
            remove: default_remove_threshold(),
        }
    }
}

impl Thresholds {
    /// Threshold for `category`.
    #[must_use]
    pub fn for_category(&self, category: Category) -> usize {
        match category {
            Category::Add => self.add,
            Category::Update => self.update,
            Category::Remove => self.remove,
        }
    }
}

/// Character-class composition of generated passwords.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PasswordPolicy {
    #[serde(default = "default_lowercase")]
    pub lowercase: usize,
    #[serde(default = "default_uppercase")]
    pub uppercase: usize,
    #[serde(default = "default_digits")]
    pub digits: usize,
    #[serde(default = "default_symbols")]
    pub symbols: usize,
    /// Symbols drawn from for the symbol class.
    #[serde(default = "default_symbol_set")]
    pub symbol_set: String,
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self {
            lowercase: default_lowercase(),
            uppercase: default_uppercase(),
            digits: default_digits(),
            symbols: default_symbols(),
            symbol_set: default_symbol_set(),
        }
    }
}

impl PasswordPolicy {
    /// Total generated length.
    #[must_use]
    pub fn length(&self) -> usize {
        self.lowercase + self.uppercase + self.digits + self.symbols
    }
}

/// Settings for creating new accounts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvisioningConfig {
    /// Suffix appended to the account name to form the userPrincipalName.
    pub upn_suffix: String,

    /// Home directory template; `{account}` is replaced by the resolved name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub home_directory_template: Option<String>,

    /// Numeric ID used when the counter object cannot be read.
    #[serde(default = "default_id_counter_baseline")]
    pub id_counter_baseline: u64,

    /// Highest numeric suffix probed when an account name is taken.
    #[serde(default = "default_max_name_suffix")]
    pub max_name_suffix: u32,

    #[serde(default)]
    pub password: PasswordPolicy,
}

impl ProvisioningConfig {
    /// Create provisioning settings with defaults.
    pub fn new(upn_suffix: impl Into<String>) -> Self {
        Self {
            upn_suffix: upn_suffix.into(),
            home_directory_template: None,
            id_counter_baseline: default_id_counter_baseline(),
            max_name_suffix: default_max_name_suffix(),
            password: PasswordPolicy::default(),
        }
    }

    /// userPrincipalName for `account_name`.
    #[must_use]
    pub fn user_principal_name(&self, account_name: &str) -> String {
        format!("{account_name}@{}", self.upn_suffix)
    }

    /// Home directory for `account_name`, if a template is configured.
    #[must_use]
    pub fn home_directory(&self, account_name: &str) -> Option<String> {
        self.home_directory_template
            .as_ref()
            .map(|template| template.replace("{account}", account_name))
    }
}

/// Configuration for one sync run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConfig {
    #[serde(default)]
    pub thresholds: Thresholds,

    /// Container new accounts are created in, disabled.
    pub inactive_container: String,

    /// Container quarantined accounts are moved to.
    pub leavers_container: String,

    /// Path component marking a source identity as a leaver.
    #[serde(default = "default_source_leavers_marker")]
    pub source_leavers_marker: String,

    /// Exemption attribute value that protects a target record from removal.
    #[serde(default = "default_exemption_sentinel")]
    pub exemption_sentinel: String,

    /// Extension attributes compared after the tracked attributes, in order.
    #[serde(default)]
    pub significant_attributes: Vec<String>,

    /// Pause before moves and deletes, in milliseconds.
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,

    pub provisioning: ProvisioningConfig,
}

impl SyncConfig {
    /// Create a config with the required containers and default settings.
    pub fn new(
        inactive_container: impl Into<String>,
        leavers_container: impl Into<String>,
        upn_suffix: impl Into<String>,
    ) -> Self {
        Self {
            thresholds: Thresholds::default(),
            inactive_container: inactive_container.into(),
            leavers_container: leavers_container.into(),
            source_leavers_marker: default_source_leavers_marker(),
            exemption_sentinel: default_exemption_sentinel(),
            significant_attributes: Vec::new(),
            settle_delay_ms: default_settle_delay_ms(),
            provisioning: ProvisioningConfig::new(upn_suffix),
        }
    }

    /// Settle delay as a duration.
    #[must_use]
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> SyncResult<()> {
        if self.inactive_container.trim().is_empty() {
            return Err(SyncError::configuration("inactive_container is required"));
        }
        if self.leavers_container.trim().is_empty() {
            return Err(SyncError::configuration("leavers_container is required"));
        }
        if dn::normalize(&self.inactive_container) == dn::normalize(&self.leavers_container) {
            return Err(SyncError::configuration(
                "leavers_container must differ from inactive_container",
            ));
        }
        if dn::is_within(&self.inactive_container, &self.leavers_container) {
            return Err(SyncError::configuration(
                "inactive_container must not be inside leavers_container",
            ));
        }
        for category in Category::PROCESSING_ORDER {
            if self.thresholds.for_category(category) == 0 {
                return Err(SyncError::configuration(format!(
                    "{category} threshold must be at least 1"
                )));
            }
        }
        for name in &self.significant_attributes {
            if attributes::tracked(name).is_some() {
                return Err(SyncError::configuration(format!(
                    "significant attribute '{name}' is already tracked"
                )));
            }
            if RESERVED_ATTRIBUTES
                .iter()
                .any(|reserved| reserved.eq_ignore_ascii_case(name))
            {
                return Err(SyncError::configuration(format!(
                    "significant attribute '{name}' is managed by the sync engine"
                )));
            }
        }
        if self.provisioning.upn_suffix.trim().is_empty() {
            return Err(SyncError::configuration("provisioning.upn_suffix is required"));
        }
        if self.provisioning.max_name_suffix == 0 || self.provisioning.max_name_suffix > 99 {
            return Err(SyncError::configuration(
                "provisioning.max_name_suffix must be between 1 and 99",
            ));
        }
        let policy = &self.provisioning.password;
        if policy.length() == 0 {
            return Err(SyncError::configuration("password policy yields empty passwords"));
        }
        if policy.symbols > 0 && policy.symbol_set.is_empty() {
            return Err(SyncError::configuration(
                "password.symbol_set is empty but symbols are required",
            ));
        }
        if policy
            .symbol_set
            .chars()
            .any(|c| c.is_ascii_alphanumeric() || c.is_whitespace())
        {
            return Err(SyncError::configuration(
                "password.symbol_set must not contain letters, digits or whitespace",
            ));
        }
        Ok(())
    }
}

fn default_add_threshold() -> usize {
    50
}

fn default_update_threshold() -> usize {
    200
}

fn default_remove_threshold() -> usize {
    25
}

fn default_lowercase() -> usize {
    6
}

fn default_uppercase() -> usize {
    4
}

fn default_digits() -> usize {
    3
}

fn default_symbols() -> usize {
    2
}

fn default_symbol_set() -> String {
    "!#$%&*+-=?@".to_string()
}

fn default_id_counter_baseline() -> u64 {
    10_000
}

fn default_max_name_suffix() -> u32 {
    99
}

fn default_source_leavers_marker() -> String {
    "OU=Leavers".to_string()
}

fn default_exemption_sentinel() -> String {
    "NoAutoRemove".to_string()
}

fn default_settle_delay_ms() -> u64 {
    2_000
}
