//! Attribute differ for matched identity pairs.
//!
//! Compares the tracked attributes in table order, then the configured
//! significant extension attributes, then applies the two one-way rules:
//! disable-only propagation of the enabled flag, and the leaver move.

use idmirror_connector::attributes::{read_attribute, ENABLED, PATH, TRACKED_ATTRIBUTES};
use idmirror_connector::dn;
use idmirror_connector::identity::IdentityRecord;

use super::types::ChangeRecord;
use crate::config::SyncConfig;

/// Computes change records for matched pairs.
#[derive(Debug, Clone)]
pub struct AttributeDiffer {
    significant_attributes: Vec<String>,
    source_leavers_marker: String,
    leavers_container: String,
}

impl AttributeDiffer {
    /// Create a differ.
    pub fn new(
        significant_attributes: Vec<String>,
        source_leavers_marker: impl Into<String>,
        leavers_container: impl Into<String>,
    ) -> Self {
        Self {
            significant_attributes,
            source_leavers_marker: source_leavers_marker.into(),
            leavers_container: leavers_container.into(),
        }
    }

    /// Create a differ from the sync configuration.
    #[must_use]
    pub fn from_config(config: &SyncConfig) -> Self {
        Self::new(
            config.significant_attributes.clone(),
            config.source_leavers_marker.clone(),
            config.leavers_container.clone(),
        )
    }

    /// Diff one matched pair. An empty result means the target is in sync.
    #[must_use]
    pub fn diff(&self, source: &IdentityRecord, target: &IdentityRecord) -> Vec<ChangeRecord> {
        let mut changes = Vec::new();

        let names = TRACKED_ATTRIBUTES
            .iter()
            .map(|attr| attr.name)
            .chain(self.significant_attributes.iter().map(String::as_str));

        for name in names {
            let new_value = read_attribute(source, name);
            let old_value = read_attribute(target, name);
            if new_value != old_value {
                changes.push(ChangeRecord::new(
                    target,
                    name,
                    new_value.unwrap_or_default(),
                    old_value.unwrap_or_default(),
                ));
            }
        }

        if !source.enabled && target.enabled {
            changes.push(ChangeRecord::new(target, ENABLED, "false", "true"));
        }

        if self.is_leaver(source) && !dn::is_within(&target.path, &self.leavers_container) {
            changes.push(ChangeRecord::new(
                target,
                PATH,
                self.leavers_container.clone(),
                target.path.clone(),
            ));
        }

        changes
    }

    /// Whether the source path carries the leavers marker as a component.
    #[must_use]
    pub fn is_leaver(&self, source: &IdentityRecord) -> bool {
        let marker = dn::normalize(&self.source_leavers_marker);
        if marker.is_empty() {
            return false;
        }
        let path = dn::normalize(&source.path);
        format!(",{path},").contains(&format!(",{marker},"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    const LEAVERS: &str = "OU=Leavers,DC=corp,DC=local";

    fn differ() -> AttributeDiffer {
        AttributeDiffer::new(
            vec!["extensionAttribute1".to_string(), "extensionAttribute7".to_string()],
            "OU=Leavers",
            LEAVERS,
        )
    }

    fn pair() -> (IdentityRecord, IdentityRecord) {
        let source = IdentityRecord::new("3", "jsmith")
            .with_name("John", "Smith")
            .with_mail("john.smith@corp.example")
            .with_enabled(true)
            .with_path("CN=John Smith,OU=Staff,DC=source,DC=local");
        let target = source
            .clone()
            .with_path("CN=jsmith,OU=Users,DC=corp,DC=local");
        (source, target)
    }

    #[test]
    fn test_identical_pair_has_no_changes() {
        let (source, target) = pair();
        assert!(differ().diff(&source, &target).is_empty());
    }

    #[test]
    fn test_single_mail_change() {
        let (mut source, mut target) = pair();
        source.mail = "new@x".to_string();
        target.mail = "old@x".to_string();

        let changes = differ().diff(&source, &target);
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].attribute, "mail");
        assert_eq!(changes[0].new_value, "new@x");
        assert_eq!(changes[0].old_value, "old@x");
        assert_eq!(changes[0].account_name, "jsmith");
        assert_eq!(changes[0].path, "CN=jsmith,OU=Users,DC=corp,DC=local");
    }

    #[test]
    fn test_changes_follow_table_order_then_extensions() {
        let (mut source, target) = pair();
        source.country = "GB".to_string();
        source.given_name = "Jon".to_string();
        source.expires_at = Some(Utc.with_ymd_and_hms(2030, 1, 31, 0, 0, 0).unwrap());
        source = source
            .with_extension("extensionAttribute7", "B")
            .with_extension("extensionAttribute1", "A")
            .with_extension("extensionAttribute2", "ignored");

        let attrs: Vec<String> = differ()
            .diff(&source, &target)
            .into_iter()
            .map(|c| c.attribute)
            .collect();
        assert_eq!(
            attrs,
            vec![
                "givenName",
                "co",
                "accountExpires",
                "extensionAttribute1",
                "extensionAttribute7"
            ]
        );
    }

    #[test]
    fn test_one_side_empty_is_a_change() {
        let (source, mut target) = pair();
        target.title = "Engineer".to_string();
        let changes = differ().diff(&source, &target);
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].attribute, "title");
        assert_eq!(changes[0].new_value, "");
        assert_eq!(changes[0].old_value, "Engineer");
    }

    #[test]
    fn test_absent_extension_equals_empty() {
        let (source, target) = pair();
        let target = target.with_extension("extensionAttribute1", "");
        assert!(differ().diff(&source, &target).is_empty());
    }

    #[test]
    fn test_disable_propagates() {
        let (source, target) = pair();
        let source = source.with_enabled(false);
        let changes = differ().diff(&source, &target);
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].attribute, "enabled");
        assert_eq!(changes[0].new_value, "false");
        assert_eq!(changes[0].old_value, "true");
    }

    #[test]
    fn test_enable_never_propagates() {
        let (source, target) = pair();
        let target = target.with_enabled(false);
        assert!(differ().diff(&source, &target).is_empty());
    }

    #[test]
    fn test_leaver_emits_move_to_leavers_container() {
        let (source, target) = pair();
        let source = source.with_path("CN=John Smith,OU=Leavers,OU=Staff,DC=source,DC=local");
        let changes = differ().diff(&source, &target);
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].attribute, "distinguishedName");
        assert_eq!(changes[0].new_value, LEAVERS);
        assert_eq!(changes[0].old_value, "CN=jsmith,OU=Users,DC=corp,DC=local");
    }

    #[test]
    fn test_leaver_already_in_leavers_container() {
        let (source, target) = pair();
        let source = source.with_path("CN=John Smith,ou=leavers,DC=source,DC=local");
        let target = target.with_path("CN=jsmith,OU=Leavers,DC=corp,DC=local");
        assert!(differ().diff(&source, &target).is_empty());
    }

    #[test]
    fn test_marker_must_be_a_whole_component() {
        let (source, _) = pair();
        let source = source.with_path("CN=John Smith,OU=FormerLeavers,DC=source");
        assert!(!differ().is_leaver(&source));
    }

    #[test]
    fn test_differ_is_idempotent_after_applying_changes() {
        let (mut source, target) = pair();
        source.department = "Finance".to_string();
        source.office = "Leeds 3F".to_string();
        let changes = differ().diff(&source, &target);
        assert_eq!(changes.len(), 2);

        let mut updated = target.clone();
        for change in &changes {
            idmirror_connector::attributes::write_attribute(
                &mut updated,
                &change.attribute,
                Some(&change.new_value),
            )
            .unwrap();
        }
        assert!(differ().diff(&source, &updated).is_empty());
    }
}
