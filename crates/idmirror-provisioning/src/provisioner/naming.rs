//! Account-name collision resolution.

use std::collections::HashSet;

use tracing::debug;

use idmirror_connector::traits::LookupOp;

use crate::error::ProvisionError;

/// A free account name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedName {
    pub name: String,
    /// Whether a numeric suffix was appended.
    pub suffixed: bool,
}

/// Find a free account name for `desired`.
///
/// A name is taken when the directory already has it or it was allocated
/// earlier in this run (`allocated` holds lowercase names). Probes `desired`,
/// then `desired01`, `desired02`, … up to `max_suffix`.
pub async fn resolve_account_name<L>(
    lookup: &L,
    desired: &str,
    allocated: &HashSet<String>,
    max_suffix: u32,
) -> Result<ResolvedName, ProvisionError>
where
    L: LookupOp + ?Sized,
{
    if is_free(lookup, desired, allocated).await? {
        return Ok(ResolvedName {
            name: desired.to_string(),
            suffixed: false,
        });
    }

    for suffix in 1..=max_suffix {
        let candidate = format!("{desired}{suffix:02}");
        if is_free(lookup, &candidate, allocated).await? {
            debug!(desired = %desired, resolved = %candidate, "Resolved account name collision");
            return Ok(ResolvedName {
                name: candidate,
                suffixed: true,
            });
        }
    }

    Err(ProvisionError::NameSpaceExhausted {
        base: desired.to_string(),
        max_suffix,
    })
}

async fn is_free<L>(
    lookup: &L,
    candidate: &str,
    allocated: &HashSet<String>,
) -> Result<bool, ProvisionError>
where
    L: LookupOp + ?Sized,
{
    if allocated.contains(&candidate.to_lowercase()) {
        return Ok(false);
    }
    Ok(!lookup.account_name_exists(candidate).await?)
}
