//! Declarative table of tracked identity attributes.
//!
//! Every attribute the differ compares and the directory writes is listed
//! here once, with a reader and a writer on [`IdentityRecord`]. Attributes not
//! in the table are extension attributes and live in the record's map.

use chrono::{DateTime, SecondsFormat, Utc};

use crate::error::{DirectoryError, DirectoryResult};
use crate::identity::IdentityRecord;

pub const GIVEN_NAME: &str = "givenName";
pub const SURNAME: &str = "sn";
pub const MAIL: &str = "mail";
pub const TITLE: &str = "title";
pub const OFFICE: &str = "physicalDeliveryOfficeName";
pub const DEPARTMENT: &str = "department";
pub const CITY: &str = "l";
pub const COUNTRY: &str = "co";
pub const ACCOUNT_EXPIRES: &str = "accountExpires";
pub const INFO: &str = "info";

/// Pseudo-attribute carrying the enabled flag in change records.
pub const ENABLED: &str = "enabled";
/// Pseudo-attribute carrying the directory path in change records.
pub const PATH: &str = "distinguishedName";

/// Reader and writer for one tracked attribute.
pub struct TrackedAttribute {
    /// Directory attribute name.
    pub name: &'static str,
    /// Current value, `None` when empty.
    pub read: fn(&IdentityRecord) -> Option<String>,
    /// Set (`Some`) or clear (`None`) the value.
    pub write: fn(&mut IdentityRecord, Option<&str>) -> DirectoryResult<()>,
}

impl std::fmt::Debug for TrackedAttribute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrackedAttribute")
            .field("name", &self.name)
            .finish()
    }
}

/// Compared attributes, in comparison order.
pub static TRACKED_ATTRIBUTES: &[TrackedAttribute] = &[
    TrackedAttribute {
        name: GIVEN_NAME,
        read: |r| non_empty(&r.given_name),
        write: |r, v| {
            r.given_name = owned(v);
            Ok(())
        },
    },
    TrackedAttribute {
        name: SURNAME,
        read: |r| non_empty(&r.surname),
        write: |r, v| {
            r.surname = owned(v);
            Ok(())
        },
    },
    TrackedAttribute {
        name: MAIL,
        read: |r| non_empty(&r.mail),
        write: |r, v| {
            r.mail = owned(v);
            Ok(())
        },
    },
    TrackedAttribute {
        name: TITLE,
        read: |r| non_empty(&r.title),
        write: |r, v| {
            r.title = owned(v);
            Ok(())
        },
    },
    TrackedAttribute {
        name: OFFICE,
        read: |r| non_empty(&r.office),
        write: |r, v| {
            r.office = owned(v);
            Ok(())
        },
    },
    TrackedAttribute {
        name: DEPARTMENT,
        read: |r| non_empty(&r.department),
        write: |r, v| {
            r.department = owned(v);
            Ok(())
        },
    },
    TrackedAttribute {
        name: CITY,
        read: |r| non_empty(&r.city),
        write: |r, v| {
            r.city = owned(v);
            Ok(())
        },
    },
    TrackedAttribute {
        name: COUNTRY,
        read: |r| non_empty(&r.country),
        write: |r, v| {
            r.country = owned(v);
            Ok(())
        },
    },
    TrackedAttribute {
        name: ACCOUNT_EXPIRES,
        read: |r| r.expires_at.map(format_timestamp),
        write: |r, v| {
            r.expires_at = match v.filter(|s| !s.is_empty()) {
                Some(s) => Some(parse_timestamp(ACCOUNT_EXPIRES, s)?),
                None => None,
            };
            Ok(())
        },
    },
];

/// Look up a tracked attribute by name (case-insensitive).
#[must_use]
pub fn tracked(name: &str) -> Option<&'static TrackedAttribute> {
    TRACKED_ATTRIBUTES
        .iter()
        .find(|attr| attr.name.eq_ignore_ascii_case(name))
}

/// Read any attribute: tracked, `info`, or extension.
#[must_use]
pub fn read_attribute(record: &IdentityRecord, name: &str) -> Option<String> {
    if let Some(attr) = tracked(name) {
        return (attr.read)(record);
    }
    if name.eq_ignore_ascii_case(INFO) {
        return non_empty(&record.info);
    }
    record
        .extension_attributes
        .get(name)
        .and_then(|v| non_empty(v))
}

/// Write any attribute: tracked, `info`, or extension. `None` clears it.
pub fn write_attribute(
    record: &mut IdentityRecord,
    name: &str,
    value: Option<&str>,
) -> DirectoryResult<()> {
    if let Some(attr) = tracked(name) {
        return (attr.write)(record, value);
    }
    if name.eq_ignore_ascii_case(INFO) {
        record.info = owned(value);
        return Ok(());
    }
    match value.filter(|v| !v.is_empty()) {
        Some(v) => {
            record
                .extension_attributes
                .insert(name.to_string(), v.to_string());
        }
        None => {
            record.extension_attributes.remove(name);
        }
    }
    Ok(())
}

/// Canonical text form of a timestamp in change records.
#[must_use]
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Parse the canonical text form back into a timestamp.
pub fn parse_timestamp(attribute: &str, value: &str) -> DirectoryResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| DirectoryError::InvalidValue {
            attribute: attribute.to_string(),
            message: e.to_string(),
        })
}

fn non_empty(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

fn owned(value: Option<&str>) -> String {
    value.unwrap_or_default().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_table_order_is_stable() {
        let names: Vec<&str> = TRACKED_ATTRIBUTES.iter().map(|a| a.name).collect();
        assert_eq!(
            names,
            vec![
                GIVEN_NAME,
                SURNAME,
                MAIL,
                TITLE,
                OFFICE,
                DEPARTMENT,
                CITY,
                COUNTRY,
                ACCOUNT_EXPIRES
            ]
        );
    }

    #[test]
    fn test_every_tracked_attribute_round_trips_through_writer() {
        for attr in TRACKED_ATTRIBUTES {
            let mut record = IdentityRecord::new("1", "a");
            let value = if attr.name == ACCOUNT_EXPIRES {
                "2030-01-31T00:00:00Z"
            } else {
                "value"
            };
            (attr.write)(&mut record, Some(value)).unwrap();
            assert_eq!((attr.read)(&record).as_deref(), Some(value), "{}", attr.name);

            (attr.write)(&mut record, None).unwrap();
            assert_eq!((attr.read)(&record), None, "{}", attr.name);
        }
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        assert_eq!(tracked("MAIL").map(|a| a.name), Some(MAIL));
        assert!(tracked("extensionAttribute1").is_none());
    }

    #[test]
    fn test_extension_attributes_go_to_map() {
        let mut record = IdentityRecord::new("1", "a");
        write_attribute(&mut record, "extensionAttribute3", Some("cost-centre-9")).unwrap();
        assert_eq!(
            read_attribute(&record, "extensionAttribute3").as_deref(),
            Some("cost-centre-9")
        );
        write_attribute(&mut record, "extensionAttribute3", None).unwrap();
        assert!(record.extension_attributes.is_empty());
    }

    #[test]
    fn test_invalid_expiration_is_rejected() {
        let mut record = IdentityRecord::new("1", "a");
        let err = write_attribute(&mut record, ACCOUNT_EXPIRES, Some("next tuesday")).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_VALUE");
    }

    #[test]
    fn test_timestamp_format() {
        let ts = Utc.with_ymd_and_hms(2031, 6, 30, 12, 0, 0).unwrap();
        assert_eq!(format_timestamp(ts), "2031-06-30T12:00:00Z");
    }
}
