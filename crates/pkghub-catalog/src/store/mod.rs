//! Persistence collaborator of the catalog
//!
//! The manager holds no state of its own: every read and write goes through a
//! [`RepositoryStore`]. Name uniqueness per owner scope is the store's job.

mod sqlite;

pub use sqlite::SqliteStore;

use async_trait::async_trait;
use pkghub_core::{OwnerScope, Repository, RepositoryId, RepositoryKind};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::Result;

/// A catalog user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub user_id: String,
    pub alias: String,
    #[serde(default)]
    pub email: String,
}

/// An organization owning repositories
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organization {
    pub organization_id: String,
    pub name: String,
    #[serde(default)]
    pub display_name: String,
}

/// Selection of repositories to list
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepositoryFilter {
    All,
    Kind(RepositoryKind),
    /// Every repository with this name, in any owner scope
    Name(String),
    /// Repositories owned by a user id
    OwnedByUser(String),
    /// Repositories owned by an organization name
    OwnedByOrg(String),
}

/// Durable storage of repositories and the identities owning them
///
/// Single-record mutators fail with `NotFound` when the id is unknown.
/// Writes that would give two repositories the same name in one owner scope
/// fail with `NameConflict`.
#[async_trait]
pub trait RepositoryStore: Send + Sync {
    async fn insert_repository(&self, repo: &Repository) -> Result<()>;

    /// Persist the user-editable fields of an existing repository
    async fn update_repository(&self, repo: &Repository) -> Result<()>;

    async fn delete_repository(&self, id: RepositoryId) -> Result<()>;

    async fn set_owner(&self, id: RepositoryId, owner: &OwnerScope) -> Result<()>;

    async fn get_repository(&self, id: RepositoryId) -> Result<Option<Repository>>;

    async fn list_repositories(&self, filter: &RepositoryFilter) -> Result<Vec<Repository>>;

    async fn set_last_tracking_errors(&self, id: RepositoryId, errors: &str) -> Result<()>;

    async fn set_verified_publisher(&self, id: RepositoryId, verified: bool) -> Result<()>;

    async fn get_packages_digest(&self, id: RepositoryId) -> Result<HashMap<String, String>>;

    /// Replace the whole digest map in one transaction
    async fn replace_packages_digest(
        &self,
        id: RepositoryId,
        digests: &HashMap<String, String>,
    ) -> Result<()>;

    async fn get_user(&self, user_id: &str) -> Result<Option<User>>;

    async fn get_organization(&self, name: &str) -> Result<Option<Organization>>;

    async fn is_member(&self, user_id: &str, organization_id: &str) -> Result<bool>;

    /// Whether `value` is still free for `resource_kind`
    ///
    /// Unknown resource kinds fail with `InvalidInput`.
    async fn check_availability(&self, resource_kind: &str, value: &str) -> Result<bool>;
}
