//! Catalog record for a tracked package repository

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::{CoreError, Result};
use crate::kind::RepositoryKind;

/// URL prefix marking a repository stored in an OCI registry
pub const OCI_PREFIX: &str = "oci://";

static NAME_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-z0-9-]+$").expect("valid regex"));

/// Validate a repository name
pub fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(CoreError::InvalidName {
            name: name.to_string(),
            reason: "name is required".to_string(),
        });
    }
    if !NAME_RE.is_match(name) {
        return Err(CoreError::InvalidName {
            name: name.to_string(),
            reason: "only lowercase letters, digits and '-' are allowed".to_string(),
        });
    }
    Ok(())
}

/// Stable internal identifier of a repository
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RepositoryId(Uuid);

impl RepositoryId {
    /// Generate a fresh random id
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RepositoryId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RepositoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

impl FromStr for RepositoryId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| CoreError::InvalidRepositoryId {
                value: s.to_string(),
                reason: e.to_string(),
            })
    }
}

/// Owner of a repository: a single user or a single organization
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum OwnerScope {
    User {
        user_id: String,
        user_alias: String,
    },
    Organization {
        organization_id: String,
        organization_name: String,
        organization_display_name: String,
    },
}

impl OwnerScope {
    pub fn user(user_id: impl Into<String>, user_alias: impl Into<String>) -> Self {
        OwnerScope::User {
            user_id: user_id.into(),
            user_alias: user_alias.into(),
        }
    }

    pub fn organization(
        organization_id: impl Into<String>,
        organization_name: impl Into<String>,
        organization_display_name: impl Into<String>,
    ) -> Self {
        OwnerScope::Organization {
            organization_id: organization_id.into(),
            organization_name: organization_name.into(),
            organization_display_name: organization_display_name.into(),
        }
    }

    /// Build a scope from the flat ownership fields of a record
    ///
    /// Exactly one of the user id or the organization id must be present.
    pub fn from_parts(
        user_id: Option<String>,
        user_alias: Option<String>,
        organization_id: Option<String>,
        organization_name: Option<String>,
        organization_display_name: Option<String>,
    ) -> Result<Self> {
        let user_id = user_id.filter(|s| !s.is_empty());
        let organization_id = organization_id.filter(|s| !s.is_empty());

        match (user_id, organization_id) {
            (Some(user_id), None) => Ok(OwnerScope::User {
                user_id,
                user_alias: user_alias.unwrap_or_default(),
            }),
            (None, Some(organization_id)) => Ok(OwnerScope::Organization {
                organization_id,
                organization_name: organization_name.unwrap_or_default(),
                organization_display_name: organization_display_name.unwrap_or_default(),
            }),
            (Some(_), Some(_)) => Err(CoreError::InvalidOwnership {
                message: "both user and organization ownership are set".to_string(),
            }),
            (None, None) => Err(CoreError::InvalidOwnership {
                message: "neither user nor organization ownership is set".to_string(),
            }),
        }
    }

    /// Key used for name uniqueness (`user:<id>` or `org:<id>`)
    pub fn scope_key(&self) -> String {
        match self {
            OwnerScope::User { user_id, .. } => format!("user:{}", user_id),
            OwnerScope::Organization {
                organization_id, ..
            } => format!("org:{}", organization_id),
        }
    }

    /// Whether two scopes designate the same owner, ignoring display fields
    pub fn same_owner(&self, other: &OwnerScope) -> bool {
        self.scope_key() == other.scope_key()
    }

    pub fn user_id(&self) -> Option<&str> {
        match self {
            OwnerScope::User { user_id, .. } => Some(user_id),
            OwnerScope::Organization { .. } => None,
        }
    }

    pub fn organization_id(&self) -> Option<&str> {
        match self {
            OwnerScope::Organization {
                organization_id, ..
            } => Some(organization_id),
            OwnerScope::User { .. } => None,
        }
    }

    pub fn organization_name(&self) -> Option<&str> {
        match self {
            OwnerScope::Organization {
                organization_name, ..
            } => Some(organization_name),
            OwnerScope::User { .. } => None,
        }
    }
}

impl fmt::Display for OwnerScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OwnerScope::User { user_alias, .. } => write!(f, "user {}", user_alias),
            OwnerScope::Organization {
                organization_name, ..
            } => write!(f, "organization {}", organization_name),
        }
    }
}

/// A tracked package repository
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RepositoryRecord", into = "RepositoryRecord")]
pub struct Repository {
    pub repository_id: RepositoryId,
    pub name: String,
    pub display_name: String,
    pub url: String,
    pub private: bool,
    pub auth_user: String,
    pub auth_pass: String,
    pub kind: RepositoryKind,
    pub owner: OwnerScope,
    pub last_tracking_errors: String,
    pub verified_publisher: bool,
    pub official: bool,
}

impl Repository {
    /// Check if the repository lives in an OCI registry
    pub fn is_oci(&self) -> bool {
        self.url.starts_with(OCI_PREFIX)
    }

    pub fn has_credentials(&self) -> bool {
        !self.auth_user.is_empty() || !self.auth_pass.is_empty()
    }

    /// Zero the stored credentials
    pub fn clear_credentials(&mut self) {
        self.auth_user.clear();
        self.auth_pass.clear();
    }

    /// Copy of this repository with credentials zeroed
    pub fn without_credentials(&self) -> Self {
        let mut repo = self.clone();
        repo.clear_credentials();
        repo
    }
}

/// Flat wire form of a repository
///
/// Ownership is spread over five optional fields here; converting into a
/// `Repository` rejects records with both or neither owner set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepositoryRecord {
    pub repository_id: RepositoryId,
    pub name: String,
    #[serde(default)]
    pub display_name: String,
    pub url: String,
    #[serde(default)]
    pub private: bool,
    #[serde(default)]
    pub auth_user: String,
    #[serde(default)]
    pub auth_pass: String,
    pub kind: RepositoryKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_alias: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization_display_name: Option<String>,
    #[serde(default)]
    pub last_tracking_errors: String,
    #[serde(default)]
    pub verified_publisher: bool,
    #[serde(default)]
    pub official: bool,
}

impl TryFrom<RepositoryRecord> for Repository {
    type Error = CoreError;

    fn try_from(r: RepositoryRecord) -> Result<Self> {
        let owner = OwnerScope::from_parts(
            r.user_id,
            r.user_alias,
            r.organization_id,
            r.organization_name,
            r.organization_display_name,
        )?;

        Ok(Repository {
            repository_id: r.repository_id,
            name: r.name,
            display_name: r.display_name,
            url: r.url,
            private: r.private,
            auth_user: r.auth_user,
            auth_pass: r.auth_pass,
            kind: r.kind,
            owner,
            last_tracking_errors: r.last_tracking_errors,
            verified_publisher: r.verified_publisher,
            official: r.official,
        })
    }
}

impl From<Repository> for RepositoryRecord {
    fn from(r: Repository) -> Self {
        let (user_id, user_alias, organization_id, organization_name, organization_display_name) =
            match r.owner {
                OwnerScope::User {
                    user_id,
                    user_alias,
                } => (Some(user_id), Some(user_alias), None, None, None),
                OwnerScope::Organization {
                    organization_id,
                    organization_name,
                    organization_display_name,
                } => (
                    None,
                    None,
                    Some(organization_id),
                    Some(organization_name),
                    Some(organization_display_name),
                ),
            };

        RepositoryRecord {
            repository_id: r.repository_id,
            name: r.name,
            display_name: r.display_name,
            url: r.url,
            private: r.private,
            auth_user: r.auth_user,
            auth_pass: r.auth_pass,
            kind: r.kind,
            user_id,
            user_alias,
            organization_id,
            organization_name,
            organization_display_name,
            last_tracking_errors: r.last_tracking_errors,
            verified_publisher: r.verified_publisher,
            official: r.official,
        }
    }
}

/// Input for registering a repository in the catalog
///
/// Carries neither id nor owner: both are assigned when the repository is added.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewRepository {
    pub name: String,
    #[serde(default)]
    pub display_name: String,
    pub url: String,
    #[serde(default)]
    pub private: bool,
    #[serde(default)]
    pub auth_user: String,
    #[serde(default)]
    pub auth_pass: String,
    pub kind: RepositoryKind,
}

impl NewRepository {
    pub fn new(name: impl Into<String>, kind: RepositoryKind, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            display_name: String::new(),
            url: url.into(),
            private: false,
            auth_user: String::new(),
            auth_pass: String::new(),
            kind,
        }
    }

    pub fn is_oci(&self) -> bool {
        self.url.starts_with(OCI_PREFIX)
    }

    pub fn has_credentials(&self) -> bool {
        !self.auth_user.is_empty() || !self.auth_pass.is_empty()
    }

    /// Bind the repository to an id and owner
    pub fn into_repository(self, repository_id: RepositoryId, owner: OwnerScope) -> Repository {
        Repository {
            repository_id,
            name: self.name,
            display_name: self.display_name,
            url: self.url,
            private: self.private,
            auth_user: self.auth_user,
            auth_pass: self.auth_pass,
            kind: self.kind,
            owner,
            last_tracking_errors: String::new(),
            verified_publisher: false,
            official: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Repository {
        NewRepository {
            auth_user: "bot".to_string(),
            auth_pass: "s3cret".to_string(),
            private: true,
            ..NewRepository::new("repo1", RepositoryKind::Helm, "https://charts.example.com")
        }
        .into_repository(RepositoryId::new(), OwnerScope::user("u1", "alice"))
    }

    #[test]
    fn test_validate_name() {
        assert!(validate_name("my-charts-2").is_ok());
        assert!(validate_name("").is_err());
        assert!(validate_name("My_Charts").is_err());
        assert!(validate_name("charts/x").is_err());
    }

    #[test]
    fn test_repository_id_parse() {
        let id = RepositoryId::new();
        let parsed: RepositoryId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
        assert!("not-a-uuid".parse::<RepositoryId>().is_err());
    }

    #[test]
    fn test_owner_from_parts() {
        let user = OwnerScope::from_parts(Some("u1".into()), Some("alice".into()), None, None, None)
            .unwrap();
        assert_eq!(user.user_id(), Some("u1"));
        assert_eq!(user.scope_key(), "user:u1");

        let org = OwnerScope::from_parts(
            None,
            None,
            Some("o1".into()),
            Some("acme".into()),
            Some("Acme Inc".into()),
        )
        .unwrap();
        assert_eq!(org.organization_name(), Some("acme"));
        assert_eq!(org.scope_key(), "org:o1");

        // Empty strings count as unset
        assert!(OwnerScope::from_parts(Some(String::new()), None, None, None, None).is_err());
        assert!(
            OwnerScope::from_parts(Some("u1".into()), None, Some("o1".into()), None, None).is_err()
        );
    }

    #[test]
    fn test_same_owner_ignores_display_fields() {
        let a = OwnerScope::organization("o1", "acme", "Acme");
        let b = OwnerScope::organization("o1", "acme", "Acme Renamed");
        assert!(a.same_owner(&b));
        assert!(!a.same_owner(&OwnerScope::user("o1", "o1")));
    }

    #[test]
    fn test_json_wire_form() {
        let repo = sample();
        let json = serde_json::to_value(&repo).unwrap();
        assert_eq!(json["name"], "repo1");
        assert_eq!(json["kind"], 0);
        assert_eq!(json["user_id"], "u1");
        assert_eq!(json["user_alias"], "alice");
        assert!(json.get("organization_id").is_none());

        let back: Repository = serde_json::from_value(json).unwrap();
        assert_eq!(back, repo);
    }

    #[test]
    fn test_deserialize_rejects_double_ownership() {
        let json = serde_json::json!({
            "repository_id": RepositoryId::new().to_string(),
            "name": "repo1",
            "url": "https://charts.example.com",
            "kind": 0,
            "user_id": "u1",
            "organization_id": "o1",
        });
        assert!(serde_json::from_value::<Repository>(json).is_err());
    }

    #[test]
    fn test_deserialize_rejects_missing_ownership() {
        let json = serde_json::json!({
            "repository_id": RepositoryId::new().to_string(),
            "name": "repo1",
            "url": "https://charts.example.com",
            "kind": 1,
        });
        assert!(serde_json::from_value::<Repository>(json).is_err());
    }

    #[test]
    fn test_without_credentials() {
        let repo = sample();
        assert!(repo.has_credentials());
        let clean = repo.without_credentials();
        assert!(clean.auth_user.is_empty());
        assert!(clean.auth_pass.is_empty());
        assert!(!clean.has_credentials());
        assert_eq!(clean.name, repo.name);
    }

    #[test]
    fn test_is_oci() {
        let mut repo = sample();
        assert!(!repo.is_oci());
        repo.url = "oci://registry.example.com/charts/foo".to_string();
        assert!(repo.is_oci());
    }
}
