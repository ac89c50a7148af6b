//! Active Directory encoding helpers.
//!
//! - `userAccountControl` flag arithmetic
//! - `unicodePwd` encoding (quoted, UTF-16LE)
//! - `accountExpires` FILETIME conversion
//! - RFC 4515 filter escaping

use chrono::{DateTime, Utc};

use idmirror_connector::error::{DirectoryError, DirectoryResult};

/// ACCOUNTDISABLE flag.
pub const UAC_ACCOUNT_DISABLE: u32 = 0x2;
/// NORMAL_ACCOUNT flag.
pub const UAC_NORMAL_ACCOUNT: u32 = 0x200;

/// `accountExpires` value meaning "never" (also `0`).
pub const FILETIME_NEVER: i64 = 0x7FFF_FFFF_FFFF_FFFF;

/// Seconds between 1601-01-01 and 1970-01-01.
const FILETIME_EPOCH_OFFSET_SECS: i64 = 11_644_473_600;
const FILETIME_TICKS_PER_SEC: i64 = 10_000_000;

/// Compute the userAccountControl value for a newly created user.
#[must_use]
pub fn new_account_uac(disabled: bool) -> u32 {
    let mut uac = UAC_NORMAL_ACCOUNT;
    if disabled {
        uac |= UAC_ACCOUNT_DISABLE;
    }
    uac
}

/// Set the disable bit, preserving every other flag.
#[must_use]
pub fn disable_uac(uac: u32) -> u32 {
    uac | UAC_ACCOUNT_DISABLE
}

/// Whether the disable bit is set.
#[must_use]
pub fn is_disabled(uac: u32) -> bool {
    uac & UAC_ACCOUNT_DISABLE != 0
}

/// Encode a plaintext password for AD's unicodePwd attribute.
pub fn encode_password(password: &str) -> DirectoryResult<Vec<u8>> {
    if password.is_empty() {
        return Err(DirectoryError::invalid_configuration(
            "password cannot be empty",
        ));
    }
    let quoted = format!("\"{password}\"");
    Ok(quoted.encode_utf16().flat_map(u16::to_le_bytes).collect())
}

/// Convert an `accountExpires` FILETIME into a timestamp.
///
/// `0` and [`FILETIME_NEVER`] both mean the account never expires.
#[must_use]
pub fn filetime_to_datetime(filetime: i64) -> Option<DateTime<Utc>> {
    if filetime <= 0 || filetime == FILETIME_NEVER {
        return None;
    }
    let secs = filetime / FILETIME_TICKS_PER_SEC - FILETIME_EPOCH_OFFSET_SECS;
    let nanos = (filetime % FILETIME_TICKS_PER_SEC) * 100;
    DateTime::from_timestamp(secs, u32::try_from(nanos).ok()?)
}

/// Convert a timestamp into an `accountExpires` FILETIME.
#[must_use]
pub fn datetime_to_filetime(ts: DateTime<Utc>) -> i64 {
    (ts.timestamp() + FILETIME_EPOCH_OFFSET_SECS) * FILETIME_TICKS_PER_SEC
        + i64::from(ts.timestamp_subsec_nanos() / 100)
}

/// Escape special characters in LDAP filter values (RFC 4515).
#[must_use]
pub fn escape_filter_value(value: &str) -> String {
    value
        .replace('\\', "\\5c")
        .replace('*', "\\2a")
        .replace('(', "\\28")
        .replace(')', "\\29")
        .replace('\0', "\\00")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_new_account_uac() {
        assert_eq!(new_account_uac(false), 0x200);
        assert_eq!(new_account_uac(true), 0x202);
    }

    #[test]
    fn test_disable_preserves_other_flags() {
        let uac = 0x200 | 0x10000; // NORMAL_ACCOUNT | DONT_EXPIRE_PASSWORD
        let disabled = disable_uac(uac);
        assert_eq!(disabled, 0x200 | 0x2 | 0x10000);
        assert!(is_disabled(disabled));
        assert_eq!(disable_uac(disabled), disabled);
        assert!(!is_disabled(uac));
    }

    #[test]
    fn test_encode_password() {
        let encoded = encode_password("Ab1!").unwrap();
        // "Ab1!" with quotes, 6 UTF-16 code units
        assert_eq!(encoded.len(), 12);
        assert_eq!(&encoded[..4], &[b'"', 0, b'A', 0]);
        assert!(encode_password("").is_err());
    }

    #[test]
    fn test_filetime_never() {
        assert_eq!(filetime_to_datetime(0), None);
        assert_eq!(filetime_to_datetime(FILETIME_NEVER), None);
    }

    #[test]
    fn test_filetime_conversion() {
        let ts = Utc.with_ymd_and_hms(2030, 1, 31, 0, 0, 0).unwrap();
        let ft = datetime_to_filetime(ts);
        assert_eq!(filetime_to_datetime(ft), Some(ts));

        // Unix epoch
        let epoch = Utc.with_ymd_and_hms(1970, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(datetime_to_filetime(epoch), 116_444_736_000_000_000);
    }

    #[test]
    fn test_escape_filter_value() {
        assert_eq!(escape_filter_value("j*smith"), "j\\2asmith");
        assert_eq!(escape_filter_value("a(b)"), "a\\28b\\29");
        assert_eq!(escape_filter_value("back\\slash"), "back\\5cslash");
    }
}
