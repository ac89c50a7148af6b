//! # LDAP Directory
//!
//! LDAP/Active Directory backend for the idmirror sync engine.
//!
//! [`LdapDirectory`] implements every capability trait from
//! `idmirror-connector`, so the same type serves as the source extractor and
//! as the target that receives mutations.
//!
//! ## Example
//!
//! ```ignore
//! use idmirror_connector::prelude::*;
//! use idmirror_connector_ldap::{LdapConfig, LdapDirectory};
//!
//! let config = LdapConfig::new(
//!     "dc01.corp.example.com",
//!     "DC=corp,DC=example,DC=com",
//!     "CN=svc-idmirror,OU=Service,DC=corp,DC=example,DC=com",
//! )
//! .with_password("secret")
//! .with_ssl();
//!
//! let target = LdapDirectory::new("target", config)?;
//! target.test_connection().await?;
//! ```

pub mod ad;
pub mod config;
pub mod connector;

// Re-exports
pub use config::{CounterConfig, LdapConfig};
pub use connector::LdapDirectory;
