//! Reconciliation types.

use serde::{Deserialize, Serialize};

use idmirror_connector::identity::IdentityRecord;

/// Mutation category. Each category passes the safety gate independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Add,
    Update,
    Remove,
}

impl Category {
    /// Order in which a run processes categories.
    pub const PROCESSING_ORDER: [Category; 3] = [Category::Update, Category::Add, Category::Remove];

    /// Lowercase name used in logs and file names.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Add => "add",
            Category::Update => "update",
            Category::Remove => "remove",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One differing attribute on a matched identity.
///
/// Empty strings stand for "no value" on either side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeRecord {
    /// Target path of the identity.
    pub path: String,
    /// Target account name.
    pub account_name: String,
    /// Attribute name.
    pub attribute: String,
    /// Value taken from the source.
    pub new_value: String,
    /// Current target value.
    pub old_value: String,
}

impl ChangeRecord {
    /// Create a change record for `target`.
    pub fn new(
        target: &IdentityRecord,
        attribute: impl Into<String>,
        new_value: impl Into<String>,
        old_value: impl Into<String>,
    ) -> Self {
        Self {
            path: target.path.clone(),
            account_name: target.account_name.clone(),
            attribute: attribute.into(),
            new_value: new_value.into(),
            old_value: old_value.into(),
        }
    }
}

/// A source record and its target counterpart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchedPair {
    pub source: IdentityRecord,
    pub target: IdentityRecord,
}

/// Partition of two snapshots by correlation identifier.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reconciliation {
    /// Identities present in both domains, in source order.
    pub matched: Vec<MatchedPair>,
    /// Source identities missing from the target, in source order.
    pub to_add: Vec<IdentityRecord>,
    /// Non-exempt target identities missing from the source, in target order.
    pub to_remove_eligible: Vec<IdentityRecord>,
    /// Target identities kept only because of the exemption marker.
    pub exempt: Vec<IdentityRecord>,
}
