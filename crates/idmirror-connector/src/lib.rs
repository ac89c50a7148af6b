//! # Directory Connector Model
//!
//! Core abstractions shared by the idmirror sync engine and the directory
//! backends it talks to.
//!
//! ## Architecture
//!
//! Directories expose capabilities through small traits:
//!
//! - [`Directory`](traits::Directory) - Base trait all directories implement
//! - [`SnapshotOp`](traits::SnapshotOp) - Full extraction of managed identities
//! - [`LookupOp`](traits::LookupOp) - Name probing and group lookups
//! - [`MutationOp`](traits::MutationOp) - Create, update, disable, move, delete
//! - [`CounterStore`](traits::CounterStore) - Shared numeric-ID counter
//!
//! ## Crate Organization
//!
//! - [`identity`] - Identity records and accounts to create
//! - [`attributes`] - The tracked attribute table
//! - [`dn`] - Distinguished Name helpers
//! - [`error`] - Error types with transient/permanent classification
//! - [`traits`] - Directory capability traits
//! - `memory` - In-memory directory (`test-support` feature)

pub mod attributes;
pub mod dn;
pub mod error;
pub mod identity;
#[cfg(any(test, feature = "test-support"))]
pub mod memory;
pub mod traits;

/// Prelude module for convenient imports.
///
/// ```
/// use idmirror_connector::prelude::*;
/// ```
pub mod prelude {
    pub use crate::error::{DirectoryError, DirectoryResult};
    pub use crate::identity::{IdentityRecord, NewAccount};
    pub use crate::traits::{
        CounterStore, Directory, LookupOp, MutationOp, SnapshotOp, TargetDirectory,
    };
}

// Re-export async_trait for directory implementors
pub use async_trait::async_trait;
