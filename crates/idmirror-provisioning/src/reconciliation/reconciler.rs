//! Snapshot reconciler.
//!
//! Partitions the source and target snapshots by correlation identifier using
//! a hash index over the target, so matching is O(n + m).

use std::collections::{HashMap, HashSet};

use tracing::debug;

use idmirror_connector::identity::IdentityRecord;

use super::types::{MatchedPair, Reconciliation};
use crate::error::ReconcileError;

/// Partition `source` and `target` into matched, to-add and remove-eligible.
///
/// Pure and deterministic: outputs follow input order. A target record
/// carrying `exemption_sentinel` never becomes remove-eligible.
pub fn reconcile(
    source: &[IdentityRecord],
    target: &[IdentityRecord],
    exemption_sentinel: &str,
) -> Result<Reconciliation, ReconcileError> {
    let source_ids = index(source, "source")?;
    let target_index = index(target, "target")?;

    let mut result = Reconciliation::default();

    for record in source {
        match target_index.get(record.correlation_id.as_str()) {
            Some(&position) => result.matched.push(MatchedPair {
                source: record.clone(),
                target: target[position].clone(),
            }),
            None => result.to_add.push(record.clone()),
        }
    }

    let source_ids: HashSet<&str> = source_ids.into_keys().collect();
    for record in target {
        if source_ids.contains(record.correlation_id.as_str()) {
            continue;
        }
        if record.is_exempt(exemption_sentinel) {
            debug!(account = %record.account_name, "Target-only record is exempt from removal");
            result.exempt.push(record.clone());
        } else {
            result.to_remove_eligible.push(record.clone());
        }
    }

    Ok(result)
}

/// Index records by correlation identifier, rejecting empty and duplicate keys.
fn index<'a>(
    records: &'a [IdentityRecord],
    collection: &str,
) -> Result<HashMap<&'a str, usize>, ReconcileError> {
    let mut index = HashMap::with_capacity(records.len());
    for (position, record) in records.iter().enumerate() {
        let id = record.correlation_id.as_str();
        if id.trim().is_empty() {
            return Err(ReconcileError::MissingIdentifier {
                collection: collection.to_string(),
                account_name: record.account_name.clone(),
            });
        }
        if index.insert(id, position).is_some() {
            return Err(ReconcileError::DuplicateIdentifier {
                collection: collection.to_string(),
                id: id.to_string(),
            });
        }
    }
    Ok(index)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SENTINEL: &str = "NoAutoRemove";

    fn rec(id: &str) -> IdentityRecord {
        IdentityRecord::new(id, format!("user{id}"))
    }

    fn ids(records: &[IdentityRecord]) -> Vec<&str> {
        records.iter().map(|r| r.correlation_id.as_str()).collect()
    }

    #[test]
    fn test_new_source_record_is_added() {
        let source = vec![rec("1").with_mail("a@x")];
        let result = reconcile(&source, &[], SENTINEL).unwrap();
        assert_eq!(ids(&result.to_add), vec!["1"]);
        assert!(result.matched.is_empty());
        assert!(result.to_remove_eligible.is_empty());
    }

    #[test]
    fn test_target_only_record_is_remove_eligible_unless_exempt() {
        let target = vec![rec("2")];
        let result = reconcile(&[], &target, SENTINEL).unwrap();
        assert_eq!(ids(&result.to_remove_eligible), vec!["2"]);

        let target = vec![rec("2").with_exemption("noautoremove")];
        let result = reconcile(&[], &target, SENTINEL).unwrap();
        assert!(result.to_remove_eligible.is_empty());
        assert_eq!(ids(&result.exempt), vec!["2"]);
    }

    #[test]
    fn test_exempt_matched_record_is_still_matched() {
        let source = vec![rec("3")];
        let target = vec![rec("3").with_exemption(SENTINEL)];
        let result = reconcile(&source, &target, SENTINEL).unwrap();
        assert_eq!(result.matched.len(), 1);
        assert!(result.exempt.is_empty());
    }

    #[test]
    fn test_partition_covers_every_identifier_once() {
        let source = vec![rec("1"), rec("2"), rec("3"), rec("5")];
        let target = vec![
            rec("2"),
            rec("4"),
            rec("5"),
            rec("6").with_exemption(SENTINEL),
        ];
        let result = reconcile(&source, &target, SENTINEL).unwrap();

        let matched: Vec<&str> = result
            .matched
            .iter()
            .map(|p| p.source.correlation_id.as_str())
            .collect();
        assert_eq!(matched, vec!["2", "5"]);
        assert_eq!(ids(&result.to_add), vec!["1", "3"]);
        assert_eq!(ids(&result.to_remove_eligible), vec!["4"]);

        let mut all: Vec<&str> = matched;
        all.extend(ids(&result.to_add));
        all.extend(ids(&result.to_remove_eligible));
        all.extend(ids(&result.exempt));
        all.sort_unstable();
        assert_eq!(all, vec!["1", "2", "3", "4", "5", "6"]);
    }

    #[test]
    fn test_matched_pair_carries_both_sides() {
        let source = vec![rec("3").with_mail("new@x")];
        let target = vec![rec("3").with_mail("old@x")];
        let result = reconcile(&source, &target, SENTINEL).unwrap();
        assert_eq!(result.matched[0].source.mail, "new@x");
        assert_eq!(result.matched[0].target.mail, "old@x");
    }

    #[test]
    fn test_duplicate_identifier_is_rejected() {
        let target = vec![rec("7"), rec("7")];
        let err = reconcile(&[], &target, SENTINEL).unwrap_err();
        assert_eq!(
            err,
            ReconcileError::DuplicateIdentifier {
                collection: "target".to_string(),
                id: "7".to_string(),
            }
        );
    }

    #[test]
    fn test_empty_identifier_is_rejected() {
        let source = vec![IdentityRecord::new("", "ghost")];
        let err = reconcile(&source, &[], SENTINEL).unwrap_err();
        assert!(matches!(err, ReconcileError::MissingIdentifier { .. }));
    }

    #[test]
    fn test_deterministic() {
        let source = vec![rec("9"), rec("1")];
        let target = vec![rec("8"), rec("1")];
        let first = reconcile(&source, &target, SENTINEL).unwrap();
        let second = reconcile(&source, &target, SENTINEL).unwrap();
        assert_eq!(first, second);
        assert_eq!(ids(&first.to_add), vec!["9"]);
    }
}
