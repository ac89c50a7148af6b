//! Application configuration loaded from a YAML file.
//!
//! Bind passwords may be kept out of the file and supplied through
//! `IDMIRROR_SOURCE_BIND_PASSWORD` / `IDMIRROR_TARGET_BIND_PASSWORD`.

use std::env;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use idmirror_connector_ldap::LdapConfig;
use idmirror_provisioning::SyncConfig;

use crate::error::{CliError, CliResult};

/// Environment variable overriding the source bind password.
pub const SOURCE_PASSWORD_ENV: &str = "IDMIRROR_SOURCE_BIND_PASSWORD";
/// Environment variable overriding the target bind password.
pub const TARGET_PASSWORD_ENV: &str = "IDMIRROR_TARGET_BIND_PASSWORD";

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Json,
    Pretty,
}

/// Logging settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Filter directive, overridden by `RUST_LOG`.
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

/// Notification settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NotifyConfig {
    /// Webhook receiving notifications. Notifications are only logged when unset.
    #[serde(default)]
    pub webhook_url: Option<String>,
    /// Prepended to every subject.
    #[serde(default = "default_subject_prefix")]
    pub subject_prefix: String,
    #[serde(default = "default_webhook_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            webhook_url: None,
            subject_prefix: default_subject_prefix(),
            timeout_secs: default_webhook_timeout_secs(),
        }
    }
}

/// CSV export settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ExportConfig {
    #[serde(default = "default_export_directory")]
    pub directory: PathBuf,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            directory: default_export_directory(),
        }
    }
}

/// Complete application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Authoritative directory.
    pub source: LdapConfig,
    /// Directory being converged.
    pub target: LdapConfig,
    pub sync: SyncConfig,
    #[serde(default)]
    pub notify: NotifyConfig,
    #[serde(default)]
    pub export: ExportConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load, apply environment overrides, and validate.
    pub fn load(path: &Path) -> CliResult<Self> {
        let mut config = Self::from_file(path)?;
        config.apply_env_overrides(|key| env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Parse a configuration file without overrides or validation.
    pub fn from_file(path: &Path) -> CliResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| CliError::ConfigFile {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from YAML text.
    pub fn from_yaml(content: &str) -> CliResult<Self> {
        serde_yaml::from_str(content).map_err(|e| CliError::Config(e.to_string()))
    }

    /// Replace bind passwords with values from `lookup` when present.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(password) = lookup(SOURCE_PASSWORD_ENV).filter(|p| !p.is_empty()) {
            self.source.bind_password = Some(password);
        }
        if let Some(password) = lookup(TARGET_PASSWORD_ENV).filter(|p| !p.is_empty()) {
            self.target.bind_password = Some(password);
        }
    }

    /// Validate every section.
    pub fn validate(&self) -> CliResult<()> {
        self.source
            .validate()
            .map_err(|e| CliError::Config(format!("source: {e}")))?;
        self.target
            .validate()
            .map_err(|e| CliError::Config(format!("target: {e}")))?;
        if self.target.counter.is_none() {
            return Err(CliError::Config(
                "target.counter is required for numeric id allocation".to_string(),
            ));
        }
        self.sync
            .validate()
            .map_err(|e| CliError::Config(format!("sync: {e}")))?;
        for name in &self.sync.significant_attributes {
            for (side, ldap) in [("source", &self.source), ("target", &self.target)] {
                let fetched = ldap
                    .extension_attributes
                    .iter()
                    .any(|attr| attr.eq_ignore_ascii_case(name));
                if !fetched {
                    return Err(CliError::Config(format!(
                        "sync: significant attribute '{name}' is not in {side}.extension_attributes"
                    )));
                }
            }
        }
        if let Some(url) = &self.notify.webhook_url {
            if !(url.starts_with("https://") || url.starts_with("http://")) {
                return Err(CliError::Config(format!(
                    "notify.webhook_url must be an http(s) URL, got '{url}'"
                )));
            }
        }
        Ok(())
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_subject_prefix() -> String {
    "[idmirror]".to_string()
}

fn default_webhook_timeout_secs() -> u64 {
    10
}

fn default_export_directory() -> PathBuf {
    PathBuf::from("./exports")
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
source:
  host: dc1.source.local
  base_dn: DC=source,DC=local
  bind_dn: CN=svc-idmirror,OU=Service,DC=source,DC=local
target:
  host: dc1.corp.local
  use_ssl: true
  port: 636
  base_dn: DC=corp,DC=local
  bind_dn: CN=svc-idmirror,OU=Service,DC=corp,DC=local
  counter:
    dn: CN=corp,CN=ypservers,CN=ypServ30,CN=RpcServices,CN=System,DC=corp,DC=local
sync:
  inactive_container: OU=Inactive,DC=corp,DC=local
  leavers_container: OU=Leavers,DC=corp,DC=local
  provisioning:
    upn_suffix: corp.example
"#;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config = AppConfig::from_yaml(MINIMAL).unwrap();
        assert_eq!(config.source.port, 389);
        assert_eq!(config.sync.thresholds.remove, 25);
        assert_eq!(config.sync.settle_delay_ms, 2000);
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.logging.level, "info");
        assert!(config.notify.webhook_url.is_none());
        assert_eq!(config.export.directory, PathBuf::from("./exports"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_overrides_bind_passwords() {
        let mut config = AppConfig::from_yaml(MINIMAL).unwrap();
        config.apply_env_overrides(|key| match key {
            SOURCE_PASSWORD_ENV => Some("source-secret".to_string()),
            TARGET_PASSWORD_ENV => Some(String::new()),
            _ => None,
        });
        assert_eq!(config.source.bind_password.as_deref(), Some("source-secret"));
        assert!(config.target.bind_password.is_none());
    }

    #[test]
    fn test_same_containers_rejected() {
        let yaml = MINIMAL.replace(
            "leavers_container: OU=Leavers,DC=corp,DC=local",
            "leavers_container: OU=Inactive,DC=corp,DC=local",
        );
        let config = AppConfig::from_yaml(&yaml).unwrap();
        let err = config.validate().unwrap_err();
        assert_eq!(err.exit_code(), 2);
        assert!(err.to_string().contains("sync"));
    }

    #[test]
    fn test_missing_counter_rejected() {
        let yaml = MINIMAL.replace(
            "  counter:\n    dn: CN=corp,CN=ypservers,CN=ypServ30,CN=RpcServices,CN=System,DC=corp,DC=local\n",
            "",
        );
        let config = AppConfig::from_yaml(&yaml).unwrap();
        assert!(config.target.counter.is_none());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_significant_attribute_must_be_fetched_on_both_sides() {
        let yaml = MINIMAL.replace(
            "sync:\n",
            "sync:\n  significant_attributes:\n    - extensionAttribute1\n",
        );
        let config = AppConfig::from_yaml(&yaml).unwrap();
        let err = config.validate().unwrap_err();
        assert_eq!(err.exit_code(), 2);
        assert!(err.to_string().contains("source.extension_attributes"));

        let mut config = AppConfig::from_yaml(&yaml).unwrap();
        config.source.extension_attributes = vec!["extensionAttribute1".to_string()];
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("target.extension_attributes"));

        config.target.extension_attributes = vec!["EXTENSIONATTRIBUTE1".to_string()];
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_webhook_url_rejected() {
        let yaml = format!("{MINIMAL}notify:\n  webhook_url: ftp://example\n");
        let config = AppConfig::from_yaml(&yaml).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_malformed_yaml_is_config_error() {
        let err = AppConfig::from_yaml("source: [").unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_missing_file() {
        let err = AppConfig::from_file(Path::new("/nonexistent/idmirror.yaml")).unwrap_err();
        assert!(matches!(err, CliError::ConfigFile { .. }));
    }

    #[test]
    fn test_debug_redacts_passwords() {
        let mut config = AppConfig::from_yaml(MINIMAL).unwrap();
        config.source.bind_password = Some("hunter2".to_string());
        assert!(!format!("{config:?}").contains("hunter2"));
    }
}
