//! Identity records as extracted from a directory snapshot.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One user account as seen in a single directory snapshot.
///
/// Text attributes use the empty string for "not set"; the directory layer
/// never distinguishes an absent attribute from an empty one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityRecord {
    /// Cross-domain identifier used to correlate the same person in both domains.
    pub correlation_id: String,
    /// Logon name (sAMAccountName).
    pub account_name: String,
    #[serde(default)]
    pub mail: String,
    #[serde(default)]
    pub given_name: String,
    #[serde(default)]
    pub surname: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub office: String,
    #[serde(default)]
    pub department: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub country: String,
    /// Whether the account is enabled.
    #[serde(default)]
    pub enabled: bool,
    /// Account expiration, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    /// Distinguished name of the object.
    #[serde(default)]
    pub path: String,
    /// Raw value of the exemption attribute.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exemption: Option<String>,
    /// Free-text info field that receives audit notes.
    #[serde(default)]
    pub info: String,
    /// Extension attributes keyed by directory attribute name.
    #[serde(default)]
    pub extension_attributes: BTreeMap<String, String>,
}

impl IdentityRecord {
    /// Create a record with the two required keys; everything else is empty.
    pub fn new(correlation_id: impl Into<String>, account_name: impl Into<String>) -> Self {
        Self {
            correlation_id: correlation_id.into(),
            account_name: account_name.into(),
            ..Self::default()
        }
    }

    /// Set mail using builder pattern.
    pub fn with_mail(mut self, mail: impl Into<String>) -> Self {
        self.mail = mail.into();
        self
    }

    /// Set given name and surname.
    pub fn with_name(mut self, given_name: impl Into<String>, surname: impl Into<String>) -> Self {
        self.given_name = given_name.into();
        self.surname = surname.into();
        self
    }

    /// Set the directory path.
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    /// Set the enabled flag.
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Set the exemption attribute value.
    pub fn with_exemption(mut self, value: impl Into<String>) -> Self {
        self.exemption = Some(value.into());
        self
    }

    /// Set an extension attribute.
    pub fn with_extension(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.extension_attributes.insert(name.into(), value.into());
        self
    }

    /// Whether the exemption attribute carries `sentinel`.
    ///
    /// Comparison ignores case and surrounding whitespace. An empty sentinel
    /// never matches.
    #[must_use]
    pub fn is_exempt(&self, sentinel: &str) -> bool {
        let sentinel = sentinel.trim();
        if sentinel.is_empty() {
            return false;
        }
        self.exemption
            .as_deref()
            .is_some_and(|value| value.trim().eq_ignore_ascii_case(sentinel))
    }

    /// Display name used for the CN of new objects.
    #[must_use]
    pub fn display_name(&self) -> String {
        let full = format!("{} {}", self.given_name.trim(), self.surname.trim());
        let full = full.trim();
        if full.is_empty() {
            self.account_name.clone()
        } else {
            full.to_string()
        }
    }
}

/// A fully resolved account ready to be created in the target directory.
#[derive(Clone)]
pub struct NewAccount {
    /// Record as it will exist after creation (resolved name, DN, disabled).
    pub record: IdentityRecord,
    /// userPrincipalName derived from the resolved account name.
    pub user_principal_name: String,
    /// Home directory derived from the resolved account name.
    pub home_directory: Option<String>,
    /// Allocated numeric identifier.
    pub numeric_id: u64,
    password: String,
}

impl NewAccount {
    /// Create a new account description.
    pub fn new(
        record: IdentityRecord,
        user_principal_name: impl Into<String>,
        home_directory: Option<String>,
        numeric_id: u64,
        password: impl Into<String>,
    ) -> Self {
        Self {
            record,
            user_principal_name: user_principal_name.into(),
            home_directory,
            numeric_id,
            password: password.into(),
        }
    }

    /// Initial password for the account.
    #[must_use]
    pub fn password(&self) -> &str {
        &self.password
    }

    /// Distinguished name the account will be created at.
    #[must_use]
    pub fn dn(&self) -> &str {
        &self.record.path
    }

    /// Resolved account name.
    #[must_use]
    pub fn account_name(&self) -> &str {
        &self.record.account_name
    }
}

impl std::fmt::Debug for NewAccount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NewAccount")
            .field("record", &self.record)
            .field("user_principal_name", &self.user_principal_name)
            .field("home_directory", &self.home_directory)
            .field("numeric_id", &self.numeric_id)
            .field("password", &"***REDACTED***")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_exempt_matches_sentinel_loosely() {
        let record = IdentityRecord::new("1001", "jsmith").with_exemption("  noautoremove ");
        assert!(record.is_exempt("NoAutoRemove"));
        assert!(!record.is_exempt("Keep"));
        assert!(!record.is_exempt(""));
    }

    #[test]
    fn test_is_exempt_without_marker() {
        let record = IdentityRecord::new("1001", "jsmith");
        assert!(!record.is_exempt("NoAutoRemove"));
    }

    #[test]
    fn test_display_name_falls_back_to_account_name() {
        let record = IdentityRecord::new("1001", "jsmith");
        assert_eq!(record.display_name(), "jsmith");

        let record = record.with_name("John", "Smith");
        assert_eq!(record.display_name(), "John Smith");
    }

    #[test]
    fn test_new_account_debug_redacts_password() {
        let account = NewAccount::new(
            IdentityRecord::new("1001", "jsmith"),
            "jsmith@corp.example",
            None,
            10_000,
            "S3cret!pass",
        );
        let debug = format!("{account:?}");
        assert!(!debug.contains("S3cret!pass"));
        assert!(debug.contains("REDACTED"));
        assert_eq!(account.password(), "S3cret!pass");
    }

    #[test]
    fn test_record_deserializes_with_defaults() {
        let record: IdentityRecord = serde_json::from_str(
            r#"{"correlation_id": "1001", "account_name": "jsmith", "mail": "j@x"}"#,
        )
        .unwrap();
        assert_eq!(record.mail, "j@x");
        assert!(!record.enabled);
        assert!(record.extension_attributes.is_empty());
    }
}
