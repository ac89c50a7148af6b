//! Distinguished Name helpers.
//!
//! Directory paths are compared case-insensitively and component-wise, so
//! `CN=a,OU=Leavers,DC=corp` is inside `ou=leavers, dc=corp`.

use crate::error::{DirectoryError, DirectoryResult};

/// Normalize a DN for comparison: trim each RDN and lowercase.
#[must_use]
pub fn normalize(dn: &str) -> String {
    split_rdns(dn)
        .iter()
        .map(|rdn| rdn.trim().to_lowercase())
        .collect::<Vec<_>>()
        .join(",")
}

/// Check whether `path` is the container itself or any object below it.
#[must_use]
pub fn is_within(path: &str, container: &str) -> bool {
    let path = normalize(path);
    let container = normalize(container);
    if container.is_empty() {
        return false;
    }
    path == container || path.ends_with(&format!(",{container}"))
}

/// Return the leading RDN (`CN=jsmith`) of a DN.
#[must_use]
pub fn leading_rdn(dn: &str) -> Option<String> {
    split_rdns(dn).first().map(|rdn| rdn.trim().to_string())
}

/// Return the parent container of a DN.
#[must_use]
pub fn parent(dn: &str) -> Option<String> {
    let rdns = split_rdns(dn);
    if rdns.len() < 2 {
        return None;
    }
    Some(
        rdns[1..]
            .iter()
            .map(|rdn| rdn.trim())
            .collect::<Vec<_>>()
            .join(","),
    )
}

/// Build the DN for a user object named `cn` inside `container`.
pub fn build_user_dn(cn: &str, container: &str) -> DirectoryResult<String> {
    if cn.is_empty() {
        return Err(DirectoryError::invalid_configuration(
            "common name cannot be empty for DN construction",
        ));
    }
    if container.is_empty() {
        return Err(DirectoryError::invalid_configuration(
            "container cannot be empty for DN construction",
        ));
    }
    Ok(format!("CN={},{}", escape_value(cn), container))
}

/// Escape special characters in a DN attribute value per RFC 4514.
#[must_use]
pub fn escape_value(value: &str) -> String {
    let char_count = value.chars().count();
    let mut result = String::with_capacity(value.len() * 2);

    for (i, ch) in value.chars().enumerate() {
        let is_first = i == 0;
        let is_last = i + 1 == char_count;

        match ch {
            ',' | '+' | '"' | '\\' | '<' | '>' | ';' | '=' => {
                result.push('\\');
                result.push(ch);
            }
            '\0' => result.push_str("\\00"),
            ' ' if is_first || is_last => result.push_str("\\20"),
            '#' if is_first => result.push_str("\\23"),
            _ => result.push(ch),
        }
    }

    result
}

/// Split a DN on unescaped commas.
fn split_rdns(dn: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut escaped = false;

    for (i, ch) in dn.char_indices() {
        match ch {
            '\\' if !escaped => escaped = true,
            ',' if !escaped => {
                parts.push(&dn[start..i]);
                start = i + 1;
            }
            _ => escaped = false,
        }
    }
    let tail = &dn[start..];
    if !tail.trim().is_empty() {
        parts.push(tail);
    }
    parts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_within_case_and_spacing() {
        assert!(is_within(
            "CN=jsmith,OU=Leavers,DC=corp,DC=local",
            "ou=leavers, dc=corp, dc=local"
        ));
        assert!(is_within("OU=Leavers,DC=corp", "OU=Leavers,DC=corp"));
    }

    #[test]
    fn test_is_within_rejects_sibling_with_common_suffix() {
        assert!(!is_within(
            "CN=jsmith,OU=FormerLeavers,DC=corp",
            "OU=Leavers,DC=corp"
        ));
        assert!(!is_within("CN=jsmith,OU=Users,DC=corp", "OU=Leavers,DC=corp"));
        assert!(!is_within("CN=jsmith,OU=Users,DC=corp", ""));
    }

    #[test]
    fn test_escaped_comma_is_not_a_separator() {
        let dn = "CN=Smith\\, John,OU=Users,DC=corp";
        assert_eq!(leading_rdn(dn).as_deref(), Some("CN=Smith\\, John"));
        assert_eq!(parent(dn).as_deref(), Some("OU=Users,DC=corp"));
    }

    #[test]
    fn test_parent_of_single_rdn() {
        assert_eq!(parent("DC=local"), None);
    }

    #[test]
    fn test_build_user_dn_escapes() {
        let dn = build_user_dn("Smith, John", "OU=Pending,DC=corp").unwrap();
        assert_eq!(dn, "CN=Smith\\, John,OU=Pending,DC=corp");
        assert!(build_user_dn("", "OU=Pending").is_err());
        assert!(build_user_dn("jsmith", "").is_err());
    }

    #[test]
    fn test_escape_value_edges() {
        assert_eq!(escape_value(" lead"), "\\20lead");
        assert_eq!(escape_value("trail "), "trail\\20");
        assert_eq!(escape_value("#hash"), "\\23hash");
        assert_eq!(escape_value("a=b"), "a\\=b");
        assert_eq!(escape_value(""), "");
    }
}
