//! LDAP directory configuration
//!
//! One [`LdapConfig`] per domain. The source and target domains share the
//! same shape; only the target needs a counter object.

use serde::{Deserialize, Serialize};

use idmirror_connector::error::{DirectoryError, DirectoryResult};

/// Location of the shared numeric-ID counter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterConfig {
    /// DN of the object holding the counter.
    pub dn: String,

    /// Attribute holding the counter value.
    #[serde(default = "default_counter_attribute")]
    pub attribute: String,
}

/// Configuration for one LDAP/Active Directory domain.
#[derive(Clone, Serialize, Deserialize)]
pub struct LdapConfig {
    /// LDAP server hostname or IP address.
    pub host: String,

    /// LDAP server port (389 for LDAP, 636 for LDAPS).
    #[serde(default = "default_ldap_port")]
    pub port: u16,

    /// Use SSL/TLS (LDAPS). Required when creating accounts with a password.
    #[serde(default)]
    pub use_ssl: bool,

    /// Use STARTTLS upgrade on plain LDAP connection.
    #[serde(default)]
    pub use_starttls: bool,

    /// Domain root (e.g., "DC=corp,DC=example,DC=com").
    pub base_dn: String,

    /// Bind DN for authentication.
    pub bind_dn: String,

    /// Bind password.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bind_password: Option<String>,

    /// Connection timeout in seconds.
    #[serde(default = "default_connection_timeout_secs")]
    pub connection_timeout_secs: u64,

    /// Subtree searched for managed users. Defaults to `base_dn`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_search_base: Option<String>,

    /// Entries requested per page in snapshot searches.
    ///
    /// Must not exceed the server's MaxPageSize (1000 on Active Directory).
    #[serde(default = "default_page_size")]
    pub page_size: i32,

    /// Filter selecting managed users, excluding test and service accounts.
    #[serde(default = "default_user_filter")]
    pub user_filter: String,

    /// Attribute carrying the cross-domain identifier.
    #[serde(default = "default_correlation_attribute")]
    pub correlation_attribute: String,

    /// Attribute carrying the exemption marker.
    #[serde(default = "default_exemption_attribute")]
    pub exemption_attribute: String,

    /// Extension attributes fetched into each record.
    #[serde(default)]
    pub extension_attributes: Vec<String>,

    /// Attribute that receives the allocated numeric ID on create.
    #[serde(default = "default_numeric_id_attribute")]
    pub numeric_id_attribute: String,

    /// Numeric-ID counter object (target domain only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub counter: Option<CounterConfig>,
}

impl std::fmt::Debug for LdapConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LdapConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("use_ssl", &self.use_ssl)
            .field("use_starttls", &self.use_starttls)
            .field("base_dn", &self.base_dn)
            .field("bind_dn", &self.bind_dn)
            .field(
                "bind_password",
                &self.bind_password.as_ref().map(|_| "***REDACTED***"),
            )
            .field("connection_timeout_secs", &self.connection_timeout_secs)
            .field("user_search_base", &self.user_search_base)
            .field("page_size", &self.page_size)
            .field("user_filter", &self.user_filter)
            .field("correlation_attribute", &self.correlation_attribute)
            .field("exemption_attribute", &self.exemption_attribute)
            .field("extension_attributes", &self.extension_attributes)
            .field("numeric_id_attribute", &self.numeric_id_attribute)
            .field("counter", &self.counter)
            .finish()
    }
}

fn default_ldap_port() -> u16 {
    389
}

fn default_connection_timeout_secs() -> u64 {
    30
}

fn default_page_size() -> i32 {
    500
}

fn default_user_filter() -> String {
    "(&(objectCategory=person)(objectClass=user))".to_string()
}

fn default_correlation_attribute() -> String {
    "employeeID".to_string()
}

fn default_exemption_attribute() -> String {
    "extensionAttribute15".to_string()
}

fn default_numeric_id_attribute() -> String {
    "uidNumber".to_string()
}

fn default_counter_attribute() -> String {
    "msSFU30MaxUidNumber".to_string()
}

impl LdapConfig {
    /// Create a new LDAP config with required fields.
    pub fn new(
        host: impl Into<String>,
        base_dn: impl Into<String>,
        bind_dn: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            port: default_ldap_port(),
            use_ssl: false,
            use_starttls: false,
            base_dn: base_dn.into(),
            bind_dn: bind_dn.into(),
            bind_password: None,
            connection_timeout_secs: default_connection_timeout_secs(),
            user_search_base: None,
            page_size: default_page_size(),
            user_filter: default_user_filter(),
            correlation_attribute: default_correlation_attribute(),
            exemption_attribute: default_exemption_attribute(),
            extension_attributes: Vec::new(),
            numeric_id_attribute: default_numeric_id_attribute(),
            counter: None,
        }
    }

    /// Set bind password.
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.bind_password = Some(password.into());
        self
    }

    /// Enable SSL (LDAPS).
    #[must_use]
    pub fn with_ssl(mut self) -> Self {
        self.use_ssl = true;
        self.port = 636;
        self
    }

    /// Set the numeric-ID counter object.
    pub fn with_counter(mut self, dn: impl Into<String>, attribute: impl Into<String>) -> Self {
        self.counter = Some(CounterConfig {
            dn: dn.into(),
            attribute: attribute.into(),
        });
        self
    }

    /// Get the LDAP URL.
    #[must_use]
    pub fn url(&self) -> String {
        let scheme = if self.use_ssl { "ldaps" } else { "ldap" };
        format!("{}://{}:{}", scheme, self.host, self.port)
    }

    /// Subtree searched for managed users.
    #[must_use]
    pub fn search_base(&self) -> &str {
        self.user_search_base.as_deref().unwrap_or(&self.base_dn)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> DirectoryResult<()> {
        if self.host.is_empty() {
            return Err(DirectoryError::invalid_configuration("host is required"));
        }
        if self.base_dn.is_empty() {
            return Err(DirectoryError::invalid_configuration("base_dn is required"));
        }
        if self.bind_dn.is_empty() {
            return Err(DirectoryError::invalid_configuration("bind_dn is required"));
        }
        if self.use_ssl && self.use_starttls {
            return Err(DirectoryError::invalid_configuration(
                "cannot use both SSL and STARTTLS",
            ));
        }
        if self.page_size < 1 {
            return Err(DirectoryError::invalid_configuration(
                "page_size must be at least 1",
            ));
        }
        if self.correlation_attribute.is_empty() {
            return Err(DirectoryError::invalid_configuration(
                "correlation_attribute is required",
            ));
        }
        if let Some(counter) = &self.counter {
            if counter.dn.is_empty() || counter.attribute.is_empty() {
                return Err(DirectoryError::invalid_configuration(
                    "counter requires both dn and attribute",
                ));
            }
        }
        Ok(())
    }
}
