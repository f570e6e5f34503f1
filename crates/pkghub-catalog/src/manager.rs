//! Repository manager
//!
//! All catalog operations go through [`RepositoryManager`]. It validates
//! input, resolves owners and permissions, and delegates persistence to a
//! [`RepositoryStore`] and content access to the [`TransportRegistry`].

use pkghub_core::{
    NewRepository, OwnerScope, Repository, RepositoryId, RepositoryKind, RepositoryMetadata,
};
use pkghub_transport::TransportRegistry;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use crate::context::RequestContext;
use crate::error::{CatalogError, Result};
use crate::store::{RepositoryFilter, RepositoryStore, User};
use crate::validate::validate_fields;

/// Catalog operations over a store and a set of transports
pub struct RepositoryManager<S: RepositoryStore> {
    store: Arc<S>,
    transports: Arc<TransportRegistry>,
}

impl<S: RepositoryStore> Clone for RepositoryManager<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            transports: self.transports.clone(),
        }
    }
}

impl<S: RepositoryStore> RepositoryManager<S> {
    pub fn new(store: Arc<S>, transports: Arc<TransportRegistry>) -> Self {
        Self { store, transports }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn transports(&self) -> &Arc<TransportRegistry> {
        &self.transports
    }

    // ============ Mutations ============

    /// Register a repository owned by the caller, or by `org_name` if given
    pub async fn add(
        &self,
        ctx: &RequestContext,
        org_name: Option<&str>,
        repo: NewRepository,
    ) -> Result<Repository> {
        let user_id = ctx.require_user()?;
        validate_fields(
            repo.kind,
            &repo.name,
            &repo.url,
            repo.private,
            repo.has_credentials(),
        )?;

        let owner = self.resolve_owner(user_id, org_name).await?;
        let repo = repo.into_repository(RepositoryId::new(), owner);
        self.store.insert_repository(&repo).await?;

        tracing::info!(
            id = %repo.repository_id,
            name = %repo.name,
            kind = %repo.kind,
            owner = %repo.owner,
            "added repository"
        );
        Ok(repo)
    }

    /// Whether `value` is still available for `resource_kind`
    pub async fn check_availability(
        &self,
        _ctx: &RequestContext,
        resource_kind: &str,
        value: &str,
    ) -> Result<bool> {
        self.store.check_availability(resource_kind, value).await
    }

    /// Take over a repository by proving control of its content
    ///
    /// The repository's sidecar must carry the catalog id of the repository
    /// and list the caller's email among its owners.
    pub async fn claim_ownership(
        &self,
        ctx: &RequestContext,
        name: &str,
        org_name: Option<&str>,
    ) -> Result<()> {
        let user_id = ctx.require_user()?;
        let user = self.require_user_record(user_id).await?;
        let repo = self.resolve_global(name).await?;

        let md = self.fetch_metadata(ctx, &repo).await?;
        if md.repository_id != repo.repository_id.to_string() {
            return Err(CatalogError::OwnershipVerificationFailed {
                message: format!(
                    "repository id in metadata file ('{}') does not match '{}'",
                    md.repository_id, repo.repository_id
                ),
            });
        }
        if !md.has_owner_email(&user.email) {
            return Err(CatalogError::OwnershipVerificationFailed {
                message: "caller's email is not listed among the repository owners".to_string(),
            });
        }

        self.transfer_resolved(user_id, &repo, org_name).await
    }

    /// Move a repository to the caller, or to `org_name` if given
    pub async fn transfer(
        &self,
        ctx: &RequestContext,
        name: &str,
        org_name: Option<&str>,
        ownership_claim: bool,
    ) -> Result<()> {
        let user_id = ctx.require_user()?;
        let repo = if ownership_claim {
            self.resolve_global(name).await?
        } else {
            match self.resolve_manageable(user_id, name).await {
                Err(CatalogError::NotFound { .. }) => {
                    let exists = !self
                        .list(&RepositoryFilter::Name(name.to_string()))
                        .await?
                        .is_empty();
                    return Err(if exists {
                        CatalogError::permission_denied(format!(
                            "user cannot transfer repository '{}'",
                            name
                        ))
                    } else {
                        CatalogError::repository_not_found(name)
                    });
                }
                other => other?,
            }
        };
        self.transfer_resolved(user_id, &repo, org_name).await
    }

    /// Delete one of the caller's repositories
    pub async fn delete(&self, ctx: &RequestContext, name: &str) -> Result<()> {
        let user_id = ctx.require_user()?;
        let repo = self.resolve_manageable(user_id, name).await?;
        self.store.delete_repository(repo.repository_id).await?;
        tracing::info!(id = %repo.repository_id, name = %repo.name, "deleted repository");
        Ok(())
    }

    /// Update the editable fields of a repository
    ///
    /// Tracking state and flags are kept from the stored record. A record
    /// read without credentials keeps the stored ones: empty credentials
    /// only replace stored values when `private` changes.
    pub async fn update(&self, ctx: &RequestContext, repo: Repository) -> Result<()> {
        let user_id = ctx.require_user()?;
        let stored = self
            .store
            .get_repository(repo.repository_id)
            .await?
            .ok_or_else(|| CatalogError::repository_not_found(repo.repository_id))?;

        if !self.can_manage(user_id, &stored).await? {
            return Err(CatalogError::permission_denied(format!(
                "user cannot update repository '{}'",
                stored.name
            )));
        }
        if stored.kind != repo.kind {
            return Err(CatalogError::ImmutableFieldChanged { field: "kind" });
        }
        if !stored.owner.same_owner(&repo.owner) {
            return Err(CatalogError::ImmutableFieldChanged { field: "owner" });
        }

        let (auth_user, auth_pass) = if !repo.has_credentials() && repo.private == stored.private {
            (stored.auth_user.clone(), stored.auth_pass.clone())
        } else {
            (repo.auth_user, repo.auth_pass)
        };
        validate_fields(
            repo.kind,
            &repo.name,
            &repo.url,
            repo.private,
            !auth_user.is_empty() || !auth_pass.is_empty(),
        )?;

        let updated = Repository {
            name: repo.name,
            display_name: repo.display_name,
            url: repo.url,
            private: repo.private,
            auth_user,
            auth_pass,
            ..stored
        };
        self.store.update_repository(&updated).await?;
        tracing::info!(id = %updated.repository_id, name = %updated.name, "updated repository");
        Ok(())
    }

    /// Record the outcome of the last tracking pass (empty for a clean pass)
    pub async fn set_last_tracking_results(
        &self,
        _ctx: &RequestContext,
        id: RepositoryId,
        errs: &str,
    ) -> Result<()> {
        self.store.set_last_tracking_errors(id, errs).await
    }

    pub async fn set_verified_publisher(
        &self,
        _ctx: &RequestContext,
        id: RepositoryId,
        verified: bool,
    ) -> Result<()> {
        self.store.set_verified_publisher(id, verified).await?;
        tracing::info!(%id, verified, "updated verified publisher flag");
        Ok(())
    }

    pub async fn get_packages_digest(
        &self,
        _ctx: &RequestContext,
        id: RepositoryId,
    ) -> Result<HashMap<String, String>> {
        self.store.get_packages_digest(id).await
    }

    /// Replace the stored digest map of a repository
    pub async fn update_packages_digest(
        &self,
        _ctx: &RequestContext,
        id: RepositoryId,
        digests: &HashMap<String, String>,
    ) -> Result<()> {
        self.store.replace_packages_digest(id, digests).await
    }

    // ============ Reads ============

    pub async fn get_all(
        &self,
        _ctx: &RequestContext,
        include_credentials: bool,
    ) -> Result<Vec<Repository>> {
        let repos = self.list(&RepositoryFilter::All).await?;
        Ok(redact_all(repos, include_credentials))
    }

    pub async fn get_all_json(
        &self,
        ctx: &RequestContext,
        include_credentials: bool,
    ) -> Result<String> {
        to_json(&self.get_all(ctx, include_credentials).await?)
    }

    pub async fn get_by_id(
        &self,
        _ctx: &RequestContext,
        id: RepositoryId,
        include_credentials: bool,
    ) -> Result<Repository> {
        let repo = self
            .store
            .get_repository(id)
            .await?
            .ok_or_else(|| CatalogError::repository_not_found(id))?;
        Ok(redact(repo, include_credentials))
    }

    pub async fn get_by_kind(
        &self,
        _ctx: &RequestContext,
        kind: RepositoryKind,
        include_credentials: bool,
    ) -> Result<Vec<Repository>> {
        let repos = self.list(&RepositoryFilter::Kind(kind)).await?;
        Ok(redact_all(repos, include_credentials))
    }

    pub async fn get_by_kind_json(
        &self,
        ctx: &RequestContext,
        kind: RepositoryKind,
        include_credentials: bool,
    ) -> Result<String> {
        to_json(&self.get_by_kind(ctx, kind, include_credentials).await?)
    }

    /// The repository called `name`
    ///
    /// When several owners use the name, the one the caller manages wins.
    pub async fn get_by_name(
        &self,
        ctx: &RequestContext,
        name: &str,
        include_credentials: bool,
    ) -> Result<Repository> {
        let mut candidates = self.list(&RepositoryFilter::Name(name.to_string())).await?;
        let repo = match candidates.len() {
            0 => return Err(CatalogError::repository_not_found(name)),
            1 => candidates.remove(0),
            _ => {
                let user_id = ctx.user_id.as_deref().unwrap_or_default();
                let mut manageable = self.filter_manageable(user_id, candidates).await?;
                if manageable.len() != 1 {
                    return Err(CatalogError::NameConflict {
                        name: name.to_string(),
                    });
                }
                manageable.remove(0)
            }
        };
        Ok(redact(repo, include_credentials))
    }

    /// Repositories owned by an organization the caller belongs to
    pub async fn get_owned_by_org_json(
        &self,
        ctx: &RequestContext,
        org_name: &str,
        include_credentials: bool,
    ) -> Result<String> {
        let user_id = ctx.require_user()?;
        self.resolve_owner(user_id, Some(org_name)).await?;
        let repos = self
            .list(&RepositoryFilter::OwnedByOrg(org_name.to_string()))
            .await?;
        to_json(&redact_all(repos, include_credentials))
    }

    /// Repositories owned by the calling user
    pub async fn get_owned_by_user_json(
        &self,
        ctx: &RequestContext,
        include_credentials: bool,
    ) -> Result<String> {
        let user_id = ctx.require_user()?;
        let repos = self
            .list(&RepositoryFilter::OwnedByUser(user_id.to_string()))
            .await?;
        to_json(&redact_all(repos, include_credentials))
    }

    /// Read a metadata sidecar from disk
    pub fn get_metadata(&self, md_file: &Path) -> Result<RepositoryMetadata> {
        Ok(pkghub_core::get_metadata(md_file)?)
    }

    /// Fetch a repository's sidecar through its transport
    pub async fn fetch_metadata(
        &self,
        ctx: &RequestContext,
        repo: &Repository,
    ) -> Result<RepositoryMetadata> {
        let fetcher = self
            .transports
            .metadata_fetcher_for(repo)
            .map_err(|e| CatalogError::from_transport(e, repo))?;
        tracing::debug!(
            name = %repo.name,
            transport = %fetcher.transport(),
            "fetching repository metadata"
        );
        fetcher
            .fetch_metadata(&ctx.cancel, repo)
            .await
            .map_err(|e| CatalogError::from_transport(e, repo))
    }

    // ============ Ownership helpers ============

    async fn list(&self, filter: &RepositoryFilter) -> Result<Vec<Repository>> {
        self.store.list_repositories(filter).await
    }

    async fn require_user_record(&self, user_id: &str) -> Result<User> {
        self.store
            .get_user(user_id)
            .await?
            .ok_or_else(|| CatalogError::NotFound {
                entity: "user",
                key: user_id.to_string(),
            })
    }

    /// Owner scope for the caller, or for an organization the caller belongs to
    async fn resolve_owner(&self, user_id: &str, org_name: Option<&str>) -> Result<OwnerScope> {
        match org_name.filter(|n| !n.is_empty()) {
            None => {
                let user = self.require_user_record(user_id).await?;
                Ok(OwnerScope::user(user.user_id, user.alias))
            }
            Some(org_name) => {
                let org = self
                    .store
                    .get_organization(org_name)
                    .await?
                    .ok_or_else(|| CatalogError::NotFound {
                        entity: "organization",
                        key: org_name.to_string(),
                    })?;
                if !self.store.is_member(user_id, &org.organization_id).await? {
                    return Err(CatalogError::permission_denied(format!(
                        "user is not a member of organization '{}'",
                        org.name
                    )));
                }
                Ok(OwnerScope::organization(
                    org.organization_id,
                    org.name,
                    org.display_name,
                ))
            }
        }
    }

    async fn can_manage(&self, user_id: &str, repo: &Repository) -> Result<bool> {
        match &repo.owner {
            OwnerScope::User { user_id: owner, .. } => Ok(owner == user_id),
            OwnerScope::Organization {
                organization_id, ..
            } => self.store.is_member(user_id, organization_id).await,
        }
    }

    async fn filter_manageable(
        &self,
        user_id: &str,
        repos: Vec<Repository>,
    ) -> Result<Vec<Repository>> {
        let mut manageable = Vec::new();
        for repo in repos {
            if !user_id.is_empty() && self.can_manage(user_id, &repo).await? {
                manageable.push(repo);
            }
        }
        Ok(manageable)
    }

    /// The single repository called `name` that the caller manages
    async fn resolve_manageable(&self, user_id: &str, name: &str) -> Result<Repository> {
        let candidates = self.list(&RepositoryFilter::Name(name.to_string())).await?;
        let mut manageable = self.filter_manageable(user_id, candidates).await?;
        match manageable.len() {
            0 => Err(CatalogError::repository_not_found(name)),
            1 => Ok(manageable.remove(0)),
            _ => Err(CatalogError::NameConflict {
                name: name.to_string(),
            }),
        }
    }

    /// The single repository called `name`, whoever owns it
    async fn resolve_global(&self, name: &str) -> Result<Repository> {
        let mut candidates = self.list(&RepositoryFilter::Name(name.to_string())).await?;
        match candidates.len() {
            0 => Err(CatalogError::repository_not_found(name)),
            1 => Ok(candidates.remove(0)),
            _ => Err(CatalogError::NameConflict {
                name: name.to_string(),
            }),
        }
    }

    async fn transfer_resolved(
        &self,
        user_id: &str,
        repo: &Repository,
        org_name: Option<&str>,
    ) -> Result<()> {
        let target = self.resolve_owner(user_id, org_name).await?;
        if repo.owner.same_owner(&target) {
            tracing::debug!(
                name = %repo.name,
                owner = %target,
                "repository already owned by target"
            );
            return Ok(());
        }
        self.store.set_owner(repo.repository_id, &target).await?;
        tracing::info!(
            id = %repo.repository_id,
            name = %repo.name,
            from = %repo.owner,
            to = %target,
            "transferred repository"
        );
        Ok(())
    }
}

fn redact(repo: Repository, include_credentials: bool) -> Repository {
    if include_credentials {
        repo
    } else {
        repo.without_credentials()
    }
}

fn redact_all(repos: Vec<Repository>, include_credentials: bool) -> Vec<Repository> {
    repos
        .into_iter()
        .map(|r| redact(r, include_credentials))
        .collect()
}

fn to_json(repos: &[Repository]) -> Result<String> {
    Ok(serde_json::to_string(repos)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{Organization, SqliteStore};
    use pkghub_transport::TransportOptions;

    fn manager() -> RepositoryManager<SqliteStore> {
        let store = SqliteStore::open_memory().unwrap();
        for (id, alias) in [("u1", "alice"), ("u2", "bob")] {
            store
                .upsert_user(&User {
                    user_id: id.to_string(),
                    alias: alias.to_string(),
                    email: format!("{}@example.com", alias),
                })
                .unwrap();
        }
        store
            .upsert_organization(&Organization {
                organization_id: "o1".to_string(),
                name: "acme".to_string(),
                display_name: "Acme".to_string(),
            })
            .unwrap();
        store.add_member("u1", "o1").unwrap();

        RepositoryManager::new(
            Arc::new(store),
            Arc::new(TransportRegistry::standard(TransportOptions::default())),
        )
    }

    fn alice() -> RequestContext {
        RequestContext::for_user("u1")
    }

    fn bob() -> RequestContext {
        RequestContext::for_user("u2")
    }

    fn helm(name: &str) -> NewRepository {
        NewRepository::new(name, RepositoryKind::Helm, "https://charts.example.com")
    }

    #[tokio::test]
    async fn test_add_assigns_id_and_owner() {
        let m = manager();
        let repo = m.add(&alice(), None, helm("repo1")).await.unwrap();
        assert_eq!(repo.owner, OwnerScope::user("u1", "alice"));
        assert!(repo.last_tracking_errors.is_empty());

        let other = m.add(&alice(), Some("acme"), helm("repo2")).await.unwrap();
        assert_ne!(repo.repository_id, other.repository_id);
        assert_eq!(other.owner.organization_name(), Some("acme"));
    }

    #[tokio::test]
    async fn test_add_requires_user() {
        let m = manager();
        let err = m
            .add(&RequestContext::anonymous(), None, helm("repo1"))
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::PermissionDenied { .. }));
    }

    #[tokio::test]
    async fn test_add_org_checks() {
        let m = manager();
        assert!(matches!(
            m.add(&bob(), Some("acme"), helm("repo1")).await,
            Err(CatalogError::PermissionDenied { .. })
        ));
        assert!(matches!(
            m.add(&alice(), Some("nope"), helm("repo1")).await,
            Err(CatalogError::NotFound { entity: "organization", .. })
        ));
    }

    #[tokio::test]
    async fn test_add_validates_input() {
        let m = manager();
        assert!(matches!(
            m.add(&alice(), None, helm("Bad Name")).await,
            Err(CatalogError::InvalidInput { .. })
        ));
        assert!(matches!(
            m.add(
                &alice(),
                None,
                NewRepository::new("rules", RepositoryKind::Falco, "oci://ghcr.io/org/rules")
            )
            .await,
            Err(CatalogError::InvalidUrl { .. })
        ));

        let mut public_with_creds = helm("repo1");
        public_with_creds.auth_user = "user".to_string();
        assert!(matches!(
            m.add(&alice(), None, public_with_creds).await,
            Err(CatalogError::InvalidInput { .. })
        ));
    }

    #[tokio::test]
    async fn test_name_conflict_is_per_scope() {
        let m = manager();
        m.add(&alice(), None, helm("repo1")).await.unwrap();
        assert!(matches!(
            m.add(&alice(), None, helm("repo1")).await,
            Err(CatalogError::NameConflict { .. })
        ));
        m.add(&bob(), None, helm("repo1")).await.unwrap();
        m.add(&alice(), Some("acme"), helm("repo1")).await.unwrap();
    }

    #[tokio::test]
    async fn test_reads_hide_credentials() {
        let m = manager();
        let mut new = helm("private");
        new.private = true;
        new.auth_user = "user".to_string();
        new.auth_pass = "secret".to_string();
        let repo = m.add(&alice(), None, new).await.unwrap();

        for r in m.get_all(&alice(), false).await.unwrap() {
            assert!(r.auth_user.is_empty() && r.auth_pass.is_empty());
        }
        let json = m.get_all_json(&alice(), false).await.unwrap();
        assert!(!json.contains("secret"));

        let full = m.get_by_id(&alice(), repo.repository_id, true).await.unwrap();
        assert_eq!(full.auth_pass, "secret");
        let hidden = m.get_by_name(&alice(), "private", false).await.unwrap();
        assert_eq!(hidden.auth_pass, "");
    }

    #[tokio::test]
    async fn test_get_by_name_prefers_manageable() {
        let m = manager();
        let mine = m.add(&alice(), None, helm("shared")).await.unwrap();
        let theirs = m.add(&bob(), None, helm("shared")).await.unwrap();

        let got = m.get_by_name(&alice(), "shared", false).await.unwrap();
        assert_eq!(got.repository_id, mine.repository_id);
        let got = m.get_by_name(&bob(), "shared", false).await.unwrap();
        assert_eq!(got.repository_id, theirs.repository_id);

        assert!(matches!(
            m.get_by_name(&RequestContext::anonymous(), "shared", false).await,
            Err(CatalogError::NameConflict { .. })
        ));
        assert!(matches!(
            m.get_by_name(&alice(), "missing", false).await,
            Err(CatalogError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_transfer() {
        let m = manager();
        m.add(&alice(), None, helm("repo1")).await.unwrap();

        // Already owned by the target: no-op
        m.transfer(&alice(), "repo1", None, false).await.unwrap();

        m.transfer(&alice(), "repo1", Some("acme"), false).await.unwrap();
        let repo = m.get_by_name(&alice(), "repo1", false).await.unwrap();
        assert_eq!(repo.owner.organization_name(), Some("acme"));

        assert!(matches!(
            m.transfer(&bob(), "repo1", None, false).await,
            Err(CatalogError::PermissionDenied { .. })
        ));
        assert!(matches!(
            m.transfer(&alice(), "missing", None, false).await,
            Err(CatalogError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_transfer_ambiguous_name() {
        let m = manager();
        m.add(&alice(), Some("acme"), helm("dup")).await.unwrap();
        m.add(&alice(), None, helm("dup")).await.unwrap();

        // Two manageable repositories are called "dup"
        assert!(matches!(
            m.transfer(&alice(), "dup", Some("acme"), false).await,
            Err(CatalogError::NameConflict { .. })
        ));
    }

    #[tokio::test]
    async fn test_delete() {
        let m = manager();
        m.add(&alice(), None, helm("repo1")).await.unwrap();
        assert!(matches!(
            m.delete(&bob(), "repo1").await,
            Err(CatalogError::NotFound { .. })
        ));
        m.delete(&alice(), "repo1").await.unwrap();
        assert!(m.get_all(&alice(), false).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update() {
        let m = manager();
        let repo = m.add(&alice(), None, helm("repo1")).await.unwrap();
        m.set_last_tracking_results(&alice(), repo.repository_id, "index unreachable")
            .await
            .unwrap();

        let mut changed = repo.clone();
        changed.display_name = "Repo One".to_string();
        changed.url = "https://charts.example.org".to_string();
        changed.last_tracking_errors = String::new();
        m.update(&alice(), changed).await.unwrap();

        let stored = m.get_by_id(&alice(), repo.repository_id, false).await.unwrap();
        assert_eq!(stored.display_name, "Repo One");
        assert_eq!(stored.url, "https://charts.example.org");
        assert_eq!(stored.last_tracking_errors, "index unreachable");
    }

    #[tokio::test]
    async fn test_update_rejects_immutable_fields() {
        let m = manager();
        let repo = m.add(&alice(), None, helm("repo1")).await.unwrap();

        let mut kind = repo.clone();
        kind.kind = RepositoryKind::Olm;
        assert!(matches!(
            m.update(&alice(), kind).await,
            Err(CatalogError::ImmutableFieldChanged { field: "kind" })
        ));

        let mut owner = repo.clone();
        owner.owner = OwnerScope::user("u2", "bob");
        assert!(matches!(
            m.update(&alice(), owner).await,
            Err(CatalogError::ImmutableFieldChanged { field: "owner" })
        ));

        assert!(matches!(
            m.update(&bob(), repo.clone()).await,
            Err(CatalogError::PermissionDenied { .. })
        ));

        // Permission is checked before the immutable fields
        let mut foreign = repo.clone();
        foreign.kind = RepositoryKind::Olm;
        assert!(matches!(
            m.update(&bob(), foreign).await,
            Err(CatalogError::PermissionDenied { .. })
        ));

        let mut unknown = repo;
        unknown.repository_id = RepositoryId::new();
        assert!(matches!(
            m.update(&alice(), unknown).await,
            Err(CatalogError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_update_keeps_redacted_credentials() {
        let m = manager();
        let mut new = helm("private");
        new.private = true;
        new.auth_user = "user".to_string();
        new.auth_pass = "secret".to_string();
        let repo = m.add(&alice(), None, new).await.unwrap();

        let mut redacted = m.get_by_id(&alice(), repo.repository_id, false).await.unwrap();
        redacted.display_name = "Private".to_string();
        m.update(&alice(), redacted).await.unwrap();

        let stored = m.get_by_id(&alice(), repo.repository_id, true).await.unwrap();
        assert_eq!(stored.display_name, "Private");
        assert_eq!(stored.auth_user, "user");
        assert_eq!(stored.auth_pass, "secret");

        // Making the repository public drops them
        let mut public = stored.without_credentials();
        public.private = false;
        m.update(&alice(), public).await.unwrap();
        let stored = m.get_by_id(&alice(), repo.repository_id, true).await.unwrap();
        assert!(!stored.has_credentials());
    }

    #[tokio::test]
    async fn test_flags_and_digests() {
        let m = manager();
        let repo = m.add(&alice(), None, helm("repo1")).await.unwrap();
        let id = repo.repository_id;

        m.set_verified_publisher(&alice(), id, true).await.unwrap();
        assert!(m.get_by_id(&alice(), id, false).await.unwrap().verified_publisher);

        let digests: HashMap<String, String> =
            [("nginx@1.0.0".to_string(), "sha256:abc".to_string())].into();
        m.update_packages_digest(&alice(), id, &digests).await.unwrap();
        assert_eq!(m.get_packages_digest(&alice(), id).await.unwrap(), digests);
    }

    #[tokio::test]
    async fn test_owned_by_json() {
        let m = manager();
        m.add(&alice(), None, helm("mine")).await.unwrap();
        m.add(&alice(), Some("acme"), helm("ours")).await.unwrap();

        let user_json: serde_json::Value =
            serde_json::from_str(&m.get_owned_by_user_json(&alice(), false).await.unwrap())
                .unwrap();
        assert_eq!(user_json.as_array().unwrap().len(), 1);
        assert_eq!(user_json[0]["name"], "mine");
        assert_eq!(user_json[0]["user_alias"], "alice");

        let org_json: serde_json::Value =
            serde_json::from_str(&m.get_owned_by_org_json(&alice(), "acme", false).await.unwrap())
                .unwrap();
        assert_eq!(org_json[0]["name"], "ours");
        assert_eq!(org_json[0]["organization_name"], "acme");
        assert!(org_json[0].get("user_id").is_none());
    }

    #[tokio::test]
    async fn test_owned_by_org_requires_membership() {
        let m = manager();
        let mut new = helm("ours");
        new.private = true;
        new.auth_user = "bot".to_string();
        new.auth_pass = "hunter2".to_string();
        m.add(&alice(), Some("acme"), new).await.unwrap();

        assert!(matches!(
            m.get_owned_by_org_json(&RequestContext::anonymous(), "acme", true).await,
            Err(CatalogError::PermissionDenied { .. })
        ));
        assert!(matches!(
            m.get_owned_by_org_json(&bob(), "acme", true).await,
            Err(CatalogError::PermissionDenied { .. })
        ));
        assert!(matches!(
            m.get_owned_by_org_json(&alice(), "nope", false).await,
            Err(CatalogError::NotFound { entity: "organization", .. })
        ));

        let json = m.get_owned_by_org_json(&alice(), "acme", true).await.unwrap();
        assert!(json.contains("hunter2"));
    }

    #[tokio::test]
    async fn test_check_availability() {
        let m = manager();
        m.add(&alice(), None, helm("repo1")).await.unwrap();
        assert!(!m.check_availability(&alice(), "repositoryName", "repo1").await.unwrap());
        assert!(m.check_availability(&alice(), "repositoryName", "repo2").await.unwrap());
        assert!(matches!(
            m.check_availability(&alice(), "bogus", "x").await,
            Err(CatalogError::InvalidInput { .. })
        ));
    }
}
