//! LDAP directory implementation
//!
//! Implements every directory capability for LDAP/Active Directory.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use ldap3::adapters::{Adapter, EntriesOnly, PagedResults};
use ldap3::{Ldap, LdapConnAsync, LdapConnSettings, LdapResult, Mod, Scope, SearchEntry};
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};

use idmirror_connector::attributes::{self, ACCOUNT_EXPIRES, INFO, TRACKED_ATTRIBUTES};
use idmirror_connector::dn;
use idmirror_connector::error::{DirectoryError, DirectoryResult};
use idmirror_connector::identity::{IdentityRecord, NewAccount};
use idmirror_connector::traits::{CounterStore, Directory, LookupOp, MutationOp, SnapshotOp};

use crate::ad;
use crate::config::LdapConfig;

const SAM_ACCOUNT_NAME: &str = "sAMAccountName";
const USER_ACCOUNT_CONTROL: &str = "userAccountControl";
const MEMBER_OF: &str = "memberOf";

type BinaryAttributes = Vec<(Vec<u8>, HashSet<Vec<u8>>)>;

/// LDAP/Active Directory domain.
pub struct LdapDirectory {
    /// Configuration.
    config: LdapConfig,

    /// Display name for this directory instance.
    display_name: String,

    /// Cached LDAP connection (lazily initialized).
    connection: Arc<RwLock<Option<Ldap>>>,
}

impl LdapDirectory {
    /// Create a new LDAP directory with the given configuration.
    pub fn new(name: &str, config: LdapConfig) -> DirectoryResult<Self> {
        config.validate()?;

        let display_name = format!("{name}: {}", config.host);

        Ok(Self {
            config,
            display_name,
            connection: Arc::new(RwLock::new(None)),
        })
    }

    /// Get an LDAP connection, creating one if necessary.
    async fn get_connection(&self) -> DirectoryResult<Ldap> {
        {
            let conn_guard = self.connection.read().await;
            if let Some(ref conn) = *conn_guard {
                return Ok(conn.clone());
            }
        }

        let conn = self.create_connection().await?;

        {
            let mut conn_guard = self.connection.write().await;
            *conn_guard = Some(conn.clone());
        }

        Ok(conn)
    }

    /// Create a new LDAP connection.
    async fn create_connection(&self) -> DirectoryResult<Ldap> {
        let url = self.config.url();

        debug!(url = %url, "Connecting to LDAP server");

        let settings = LdapConnSettings::new()
            .set_conn_timeout(std::time::Duration::from_secs(
                self.config.connection_timeout_secs,
            ))
            .set_starttls(self.config.use_starttls);

        let (conn, mut ldap) = LdapConnAsync::with_settings(settings, &url)
            .await
            .map_err(|e| {
                DirectoryError::connection_failed_with_source(
                    format!("Failed to connect to LDAP server at {url}"),
                    e,
                )
            })?;

        tokio::spawn(async move {
            if let Err(e) = conn.drive().await {
                warn!(error = %e, "LDAP connection driver error");
            }
        });

        let bind_dn = &self.config.bind_dn;
        let bind_password = self.config.bind_password.as_deref().unwrap_or("");

        debug!(bind_dn = %bind_dn, "Performing LDAP bind");

        let result = ldap
            .simple_bind(bind_dn, bind_password)
            .await
            .map_err(|e| {
                DirectoryError::connection_failed_with_source(
                    format!("LDAP bind failed for {bind_dn}"),
                    e,
                )
            })?;

        if result.rc != 0 {
            if result.rc == 49 {
                return Err(DirectoryError::AuthenticationFailed);
            }
            return Err(DirectoryError::connection_failed(format!(
                "LDAP bind failed with code {}: {}",
                result.rc, result.text
            )));
        }

        info!(host = %self.config.host, "LDAP connection established");

        Ok(ldap)
    }

    /// Run a search and return the constructed entries.
    async fn search(
        &self,
        base: &str,
        scope: Scope,
        filter: &str,
        attrs: Vec<String>,
    ) -> DirectoryResult<Vec<SearchEntry>> {
        let mut ldap = self.get_connection().await?;

        debug!(base = %base, filter = %filter, "Searching LDAP");

        let ldap3::SearchResult(entries, result) = ldap
            .search(base, scope, filter, attrs)
            .await
            .map_err(|e| {
                DirectoryError::operation_failed_with_source(
                    format!("LDAP search failed under {base}"),
                    e,
                )
            })?;
        check_result(result, "search", base)?;

        Ok(entries.into_iter().map(SearchEntry::construct).collect())
    }

    /// Run a subtree search with the simple paged results control.
    ///
    /// Pages of `page_size` entries are requested until the server signals
    /// the end, so result sets larger than the server's size limit are read
    /// in full. Referrals are dropped.
    async fn paged_search(
        &self,
        base: &str,
        filter: &str,
        attrs: Vec<String>,
    ) -> DirectoryResult<Vec<SearchEntry>> {
        let mut ldap = self.get_connection().await?;

        debug!(
            base = %base,
            filter = %filter,
            page_size = self.config.page_size,
            "Paged LDAP search"
        );

        let adapters: Vec<Box<dyn Adapter<_, _>>> = vec![
            Box::new(EntriesOnly::new()),
            Box::new(PagedResults::new(self.config.page_size)),
        ];
        let mut stream = ldap
            .streaming_search_with(adapters, base, Scope::Subtree, filter, attrs)
            .await
            .map_err(|e| {
                DirectoryError::operation_failed_with_source(
                    format!("LDAP search failed under {base}"),
                    e,
                )
            })?;

        let mut entries = Vec::new();
        while let Some(entry) = stream.next().await.map_err(|e| {
            DirectoryError::operation_failed_with_source(
                format!("LDAP paged search failed under {base}"),
                e,
            )
        })? {
            entries.push(SearchEntry::construct(entry));
        }
        check_result(stream.finish().await, "search", base)?;

        Ok(entries)
    }

    /// Read a single entry by DN.
    async fn read_entry(&self, dn: &str, attrs: &[&str]) -> DirectoryResult<SearchEntry> {
        let attrs = attrs.iter().map(|a| (*a).to_string()).collect();
        self.search(dn, Scope::Base, "(objectClass=*)", attrs)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| DirectoryError::ObjectNotFound {
                identifier: dn.to_string(),
            })
    }

    /// Apply modifications to one entry.
    async fn modify(&self, dn: &str, mods: Vec<Mod<String>>, operation: &str) -> DirectoryResult<()> {
        if mods.is_empty() {
            return Ok(());
        }
        let mut ldap = self.get_connection().await?;
        let result = ldap.modify(dn, mods).await.map_err(|e| {
            DirectoryError::operation_failed_with_source(format!("Failed to {operation}: {dn}"), e)
        })?;
        check_result(result, operation, dn)
    }

    /// Attributes requested for every snapshot entry.
    fn snapshot_attributes(&self) -> Vec<String> {
        let mut attrs: Vec<String> = TRACKED_ATTRIBUTES
            .iter()
            .map(|attr| attr.name.to_string())
            .collect();
        attrs.extend(
            [
                SAM_ACCOUNT_NAME,
                USER_ACCOUNT_CONTROL,
                INFO,
                self.config.correlation_attribute.as_str(),
                self.config.exemption_attribute.as_str(),
            ]
            .iter()
            .map(|s| (*s).to_string()),
        );
        attrs.extend(self.config.extension_attributes.iter().cloned());
        attrs
    }

    /// Convert a search entry into an identity record.
    ///
    /// Returns `None` for entries without a correlation identifier.
    fn entry_to_record(&self, entry: &SearchEntry) -> DirectoryResult<Option<IdentityRecord>> {
        let Some(correlation_id) = first_value(entry, &self.config.correlation_attribute) else {
            return Ok(None);
        };
        let account_name = first_value(entry, SAM_ACCOUNT_NAME).unwrap_or_default();

        let mut record = IdentityRecord::new(correlation_id, account_name).with_path(&entry.dn);

        for attr in TRACKED_ATTRIBUTES {
            if attr.name == ACCOUNT_EXPIRES {
                continue;
            }
            (attr.write)(&mut record, first_value(entry, attr.name).as_deref())?;
        }

        record.expires_at = match first_value(entry, ACCOUNT_EXPIRES) {
            Some(raw) => {
                let filetime = raw.parse::<i64>().map_err(|e| DirectoryError::InvalidValue {
                    attribute: ACCOUNT_EXPIRES.to_string(),
                    message: e.to_string(),
                })?;
                ad::filetime_to_datetime(filetime)
            }
            None => None,
        };

        record.enabled = match first_value(entry, USER_ACCOUNT_CONTROL) {
            Some(raw) => {
                let uac = raw.parse::<u32>().map_err(|e| DirectoryError::InvalidValue {
                    attribute: USER_ACCOUNT_CONTROL.to_string(),
                    message: e.to_string(),
                })?;
                !ad::is_disabled(uac)
            }
            None => true,
        };

        record.exemption = first_value(entry, &self.config.exemption_attribute);
        record.info = first_value(entry, INFO).unwrap_or_default();

        for name in &self.config.extension_attributes {
            if let Some(value) = first_value(entry, name) {
                record.extension_attributes.insert(name.clone(), value);
            }
        }

        Ok(Some(record))
    }

    /// Build the attribute list for adding a new account.
    fn account_attributes(&self, account: &NewAccount) -> DirectoryResult<BinaryAttributes> {
        if !self.config.use_ssl {
            return Err(DirectoryError::invalid_configuration(
                "LDAPS (SSL) connection required to set the initial password",
            ));
        }

        let record = &account.record;
        let mut attrs: BTreeMap<String, Vec<Vec<u8>>> = BTreeMap::new();
        let mut put = |name: &str, value: String| {
            if !value.is_empty() {
                attrs.insert(name.to_string(), vec![value.into_bytes()]);
            }
        };

        put(SAM_ACCOUNT_NAME, record.account_name.clone());
        put("userPrincipalName", account.user_principal_name.clone());
        put("displayName", record.display_name());
        put(&self.config.correlation_attribute, record.correlation_id.clone());
        put(
            &self.config.numeric_id_attribute,
            account.numeric_id.to_string(),
        );
        put(
            USER_ACCOUNT_CONTROL,
            ad::new_account_uac(!record.enabled).to_string(),
        );
        put(INFO, record.info.clone());
        if let Some(home) = &account.home_directory {
            put("homeDirectory", home.clone());
        }
        for attr in TRACKED_ATTRIBUTES {
            if let Some(value) = (attr.read)(record) {
                put(attr.name, ldap_value(attr.name, &value)?);
            }
        }
        for (name, value) in &record.extension_attributes {
            put(name, value.clone());
        }

        let mut result: BinaryAttributes = attrs
            .into_iter()
            .map(|(name, values)| (name.into_bytes(), values.into_iter().collect()))
            .collect();

        result.push((
            b"objectClass".to_vec(),
            ["top", "person", "organizationalPerson", "user"]
                .iter()
                .map(|oc| oc.as_bytes().to_vec())
                .collect(),
        ));

        result.push((
            b"unicodePwd".to_vec(),
            HashSet::from([ad::encode_password(account.password())?]),
        ));

        Ok(result)
    }
}

/// First value of an attribute, matched case-insensitively.
fn first_value(entry: &SearchEntry, name: &str) -> Option<String> {
    entry
        .attrs
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .and_then(|(_, values)| values.first())
        .filter(|value| !value.is_empty())
        .cloned()
}

/// Convert a canonical attribute value into its LDAP wire form.
fn ldap_value(name: &str, value: &str) -> DirectoryResult<String> {
    if name.eq_ignore_ascii_case(ACCOUNT_EXPIRES) {
        let ts = attributes::parse_timestamp(ACCOUNT_EXPIRES, value)?;
        return Ok(ad::datetime_to_filetime(ts).to_string());
    }
    Ok(value.to_string())
}

/// Map an LDAP result code onto a directory error.
fn check_result(result: LdapResult, operation: &str, dn: &str) -> DirectoryResult<()> {
    match result.rc {
        0 => Ok(()),
        19 => Err(DirectoryError::ConstraintViolation {
            message: format!("{operation} on {dn}: {}", result.text),
        }),
        32 => Err(DirectoryError::ObjectNotFound {
            identifier: dn.to_string(),
        }),
        50 => Err(DirectoryError::AuthorizationFailed {
            operation: operation.to_string(),
        }),
        51 | 52 => Err(DirectoryError::Unavailable {
            message: result.text,
        }),
        68 => Err(DirectoryError::ObjectAlreadyExists {
            identifier: dn.to_string(),
        }),
        rc => Err(DirectoryError::operation_failed(format!(
            "LDAP {operation} failed with code {rc}: {}",
            result.text
        ))),
    }
}

#[async_trait]
impl Directory for LdapDirectory {
    fn display_name(&self) -> &str {
        &self.display_name
    }

    #[instrument(skip(self))]
    async fn test_connection(&self) -> DirectoryResult<()> {
        let entries = self
            .search(
                &self.config.base_dn,
                Scope::Base,
                "(objectClass=*)",
                vec!["dn".to_string()],
            )
            .await?;
        if entries.is_empty() {
            return Err(DirectoryError::connection_failed(format!(
                "Base DN '{}' not found or not accessible",
                self.config.base_dn
            )));
        }
        info!("LDAP connection test successful");
        Ok(())
    }
}

#[async_trait]
impl SnapshotOp for LdapDirectory {
    #[instrument(skip(self), fields(directory = %self.display_name))]
    async fn snapshot(&self) -> DirectoryResult<Vec<IdentityRecord>> {
        let entries = self
            .paged_search(
                self.config.search_base(),
                &self.config.user_filter,
                self.snapshot_attributes(),
            )
            .await?;

        let total = entries.len();
        let mut records = Vec::with_capacity(total);
        for entry in &entries {
            match self.entry_to_record(entry)? {
                Some(record) => records.push(record),
                None => debug!(dn = %entry.dn, "Skipping entry without correlation identifier"),
            }
        }
        records.sort_by(|a, b| a.correlation_id.cmp(&b.correlation_id));

        info!(
            total_found = total,
            returned = records.len(),
            "LDAP snapshot completed"
        );
        Ok(records)
    }
}

#[async_trait]
impl LookupOp for LdapDirectory {
    #[instrument(skip(self))]
    async fn account_name_exists(&self, account_name: &str) -> DirectoryResult<bool> {
        let filter = format!(
            "({SAM_ACCOUNT_NAME}={})",
            ad::escape_filter_value(account_name)
        );
        let entries = self
            .search(
                &self.config.base_dn,
                Scope::Subtree,
                &filter,
                vec!["1.1".to_string()],
            )
            .await?;
        Ok(!entries.is_empty())
    }

    #[instrument(skip(self))]
    async fn group_memberships(&self, dn: &str) -> DirectoryResult<Vec<String>> {
        let entry = self.read_entry(dn, &[MEMBER_OF]).await?;
        Ok(entry
            .attrs
            .into_iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(MEMBER_OF))
            .map(|(_, values)| values)
            .unwrap_or_default())
    }
}

#[async_trait]
impl MutationOp for LdapDirectory {
    #[instrument(skip(self, account), fields(dn = %account.dn()))]
    async fn create(&self, account: &NewAccount) -> DirectoryResult<String> {
        let attrs = self.account_attributes(account)?;
        let dn = account.dn();

        let mut ldap = self.get_connection().await?;
        let result = ldap.add(dn, attrs).await.map_err(|e| {
            DirectoryError::operation_failed_with_source(format!("Failed to create entry: {dn}"), e)
        })?;
        check_result(result, "add", dn)?;

        info!(dn = %dn, "LDAP entry created");
        Ok(dn.to_string())
    }

    #[instrument(skip(self, values))]
    async fn replace_attributes(
        &self,
        dn: &str,
        values: &BTreeMap<String, String>,
    ) -> DirectoryResult<()> {
        let mut mods = Vec::with_capacity(values.len());
        for (name, value) in values {
            mods.push(Mod::Replace(
                name.clone(),
                HashSet::from([ldap_value(name, value)?]),
            ));
        }
        self.modify(dn, mods, "replace attributes").await?;
        debug!(dn = %dn, count = values.len(), "Attributes replaced");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn clear_attributes(&self, dn: &str, names: &[String]) -> DirectoryResult<()> {
        let mods = names
            .iter()
            .map(|name| {
                if name.eq_ignore_ascii_case(ACCOUNT_EXPIRES) {
                    Mod::Replace(name.clone(), HashSet::from(["0".to_string()]))
                } else {
                    Mod::Delete(name.clone(), HashSet::new())
                }
            })
            .collect();
        self.modify(dn, mods, "clear attributes").await
    }

    #[instrument(skip(self))]
    async fn disable(&self, dn: &str) -> DirectoryResult<()> {
        let entry = self.read_entry(dn, &[USER_ACCOUNT_CONTROL]).await?;
        let uac = first_value(&entry, USER_ACCOUNT_CONTROL)
            .map(|raw| raw.parse::<u32>())
            .transpose()
            .map_err(|e| DirectoryError::InvalidValue {
                attribute: USER_ACCOUNT_CONTROL.to_string(),
                message: e.to_string(),
            })?
            .unwrap_or(ad::UAC_NORMAL_ACCOUNT);

        let mods = vec![Mod::Replace(
            USER_ACCOUNT_CONTROL.to_string(),
            HashSet::from([ad::disable_uac(uac).to_string()]),
        )];
        self.modify(dn, mods, "disable account").await?;
        info!(dn = %dn, "Account disabled");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn move_to(&self, dn: &str, container: &str) -> DirectoryResult<String> {
        let rdn = dn::leading_rdn(dn).ok_or_else(|| DirectoryError::InvalidValue {
            attribute: "distinguishedName".to_string(),
            message: format!("cannot extract RDN from '{dn}'"),
        })?;

        let mut ldap = self.get_connection().await?;
        let result = ldap
            .modifydn(dn, &rdn, true, Some(container))
            .await
            .map_err(|e| {
                DirectoryError::operation_failed_with_source(format!("Failed to move entry: {dn}"), e)
            })?;
        check_result(result, "move", dn)?;

        let new_dn = format!("{rdn},{container}");
        info!(dn = %dn, new_dn = %new_dn, "LDAP entry moved");
        Ok(new_dn)
    }

    #[instrument(skip(self))]
    async fn delete(&self, dn: &str) -> DirectoryResult<()> {
        let mut ldap = self.get_connection().await?;
        let result = ldap.delete(dn).await.map_err(|e| {
            DirectoryError::operation_failed_with_source(format!("Failed to delete entry: {dn}"), e)
        })?;
        check_result(result, "delete", dn)?;

        info!(dn = %dn, "LDAP entry deleted");
        Ok(())
    }

    #[instrument(skip(self, groups), fields(groups = groups.len()))]
    async fn remove_group_membership(&self, dn: &str, groups: &[String]) -> DirectoryResult<()> {
        for group in groups {
            let mods = vec![Mod::Delete(
                "member".to_string(),
                HashSet::from([dn.to_string()]),
            )];
            self.modify(group, mods, "remove group member").await?;
            debug!(dn = %dn, group = %group, "Removed group membership");
        }
        Ok(())
    }
}

#[async_trait]
impl CounterStore for LdapDirectory {
    #[instrument(skip(self))]
    async fn read_counter(&self) -> DirectoryResult<u64> {
        let counter = self.config.counter.as_ref().ok_or_else(|| {
            DirectoryError::invalid_configuration("no counter object configured")
        })?;
        let entry = self
            .read_entry(&counter.dn, &[counter.attribute.as_str()])
            .await?;
        let raw = first_value(&entry, &counter.attribute).ok_or_else(|| {
            DirectoryError::ObjectNotFound {
                identifier: format!("{} on {}", counter.attribute, counter.dn),
            }
        })?;
        raw.parse::<u64>().map_err(|e| DirectoryError::InvalidValue {
            attribute: counter.attribute.clone(),
            message: e.to_string(),
        })
    }

    #[instrument(skip(self))]
    async fn write_counter(&self, value: u64) -> DirectoryResult<()> {
        let counter = self.config.counter.as_ref().ok_or_else(|| {
            DirectoryError::invalid_configuration("no counter object configured")
        })?;
        let mods = vec![Mod::Replace(
            counter.attribute.clone(),
            HashSet::from([value.to_string()]),
        )];
        self.modify(&counter.dn, mods, "write counter").await
    }
}

impl std::fmt::Debug for LdapDirectory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LdapDirectory")
            .field("display_name", &self.display_name)
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use std::collections::HashMap;

    fn test_config() -> LdapConfig {
        let mut config = LdapConfig::new("dc01.corp.local", "DC=corp,DC=local", "CN=svc,DC=corp,DC=local")
            .with_password("secret")
            .with_ssl();
        config.extension_attributes = vec!["extensionAttribute1".to_string()];
        config
    }

    fn entry(attrs: &[(&str, &str)]) -> SearchEntry {
        let attrs: HashMap<String, Vec<String>> = attrs
            .iter()
            .map(|(k, v)| ((*k).to_string(), vec![(*v).to_string()]))
            .collect();
        SearchEntry {
            dn: "CN=jsmith,OU=Users,DC=corp,DC=local".to_string(),
            attrs,
            bin_attrs: HashMap::new(),
        }
    }

    #[test]
    fn test_entry_to_record_maps_attributes() {
        let dir = LdapDirectory::new("target", test_config()).unwrap();
        let expires = Utc.with_ymd_and_hms(2030, 1, 31, 0, 0, 0).unwrap();
        let filetime = ad::datetime_to_filetime(expires).to_string();
        let e = entry(&[
            ("employeeID", "1001"),
            ("sAMAccountName", "jsmith"),
            ("mail", "john.smith@corp.example"),
            ("givenName", "John"),
            ("sn", "Smith"),
            ("l", "Leeds"),
            ("userAccountControl", "514"),
            ("accountExpires", filetime.as_str()),
            ("extensionAttribute15", "NoAutoRemove"),
            ("extensionAttribute1", "CC-42"),
        ]);

        let record = dir.entry_to_record(&e).unwrap().unwrap();
        assert_eq!(record.correlation_id, "1001");
        assert_eq!(record.account_name, "jsmith");
        assert_eq!(record.city, "Leeds");
        assert!(!record.enabled);
        assert_eq!(record.expires_at, Some(expires));
        assert!(record.is_exempt("noautoremove"));
        assert_eq!(
            record.extension_attributes.get("extensionAttribute1").map(String::as_str),
            Some("CC-42")
        );
        assert_eq!(record.path, "CN=jsmith,OU=Users,DC=corp,DC=local");
    }

    #[test]
    fn test_entry_without_correlation_id_is_skipped() {
        let dir = LdapDirectory::new("target", test_config()).unwrap();
        let e = entry(&[("sAMAccountName", "svc-backup")]);
        assert!(dir.entry_to_record(&e).unwrap().is_none());
    }

    #[test]
    fn test_never_expiring_account() {
        let dir = LdapDirectory::new("target", test_config()).unwrap();
        let e = entry(&[
            ("employeeID", "1001"),
            ("accountExpires", "9223372036854775807"),
            ("userAccountControl", "512"),
        ]);
        let record = dir.entry_to_record(&e).unwrap().unwrap();
        assert_eq!(record.expires_at, None);
        assert!(record.enabled);
    }

    #[test]
    fn test_account_attributes_disabled_with_password() {
        let dir = LdapDirectory::new("target", test_config()).unwrap();
        let record = IdentityRecord::new("1001", "jsmith01")
            .with_name("John", "Smith")
            .with_path("CN=jsmith01,OU=Pending,DC=corp,DC=local");
        let account = NewAccount::new(record, "jsmith01@corp.local", None, 10_500, "Xy7!abcdEF");

        let attrs = dir.account_attributes(&account).unwrap();
        let get = |name: &str| {
            attrs
                .iter()
                .find(|(k, _)| k.as_slice() == name.as_bytes())
                .map(|(_, v)| v.clone())
        };
        assert_eq!(
            get("userAccountControl"),
            Some(HashSet::from([b"514".to_vec()]))
        );
        assert_eq!(get("uidNumber"), Some(HashSet::from([b"10500".to_vec()])));
        assert!(get("unicodePwd").is_some());
        assert!(get("mail").is_none());
    }

    #[test]
    fn test_account_attributes_require_ssl() {
        let mut config = test_config();
        config.use_ssl = false;
        let dir = LdapDirectory::new("target", config).unwrap();
        let account = NewAccount::new(
            IdentityRecord::new("1001", "jsmith").with_path("CN=jsmith,OU=Pending,DC=corp"),
            "jsmith@corp",
            None,
            1,
            "pw",
        );
        assert!(dir.account_attributes(&account).is_err());
    }

    #[test]
    fn test_ldap_value_converts_expiration() {
        let value = ldap_value("accountExpires", "1970-01-01T00:00:00Z").unwrap();
        assert_eq!(value, "116444736000000000");
        assert_eq!(ldap_value("title", "Engineer").unwrap(), "Engineer");
    }

    #[test]
    fn test_rejects_zero_page_size() {
        let mut config = test_config();
        config.page_size = 0;
        assert!(LdapDirectory::new("target", config).is_err());
    }

    #[test]
    fn test_debug_redacts_password() {
        let dir = LdapDirectory::new("target", test_config()).unwrap();
        let debug = format!("{dir:?}");
        assert!(!debug.contains("secret"));
    }
}
