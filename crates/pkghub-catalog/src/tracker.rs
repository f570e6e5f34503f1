//! Incremental tracking passes
//!
//! A pass fetches a repository's current content, digests every package and
//! compares the result with the digests stored by the previous pass. The
//! catalog is only read before and written after the fetch.

use pkghub_core::{Repository, RepositoryId};
use pkghub_transport::{TransportError, packages_digest_from_dir};
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;

use crate::context::RequestContext;
use crate::error::{CatalogError, Result};
use crate::manager::RepositoryManager;
use crate::store::RepositoryStore;

/// Package changes between two passes, keys sorted
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DigestDiff {
    pub added: Vec<String>,
    pub changed: Vec<String>,
    pub removed: Vec<String>,
    pub unchanged: usize,
}

impl DigestDiff {
    pub fn compute(previous: &HashMap<String, String>, current: &HashMap<String, String>) -> Self {
        let mut diff = DigestDiff::default();
        let keys: BTreeSet<&String> = previous.keys().chain(current.keys()).collect();

        for key in keys {
            match (previous.get(key), current.get(key)) {
                (None, Some(_)) => diff.added.push(key.clone()),
                (Some(_), None) => diff.removed.push(key.clone()),
                (Some(old), Some(new)) if old != new => diff.changed.push(key.clone()),
                _ => diff.unchanged += 1,
            }
        }
        diff
    }

    pub fn has_changes(&self) -> bool {
        !(self.added.is_empty() && self.changed.is_empty() && self.removed.is_empty())
    }
}

/// Outcome of a successful pass
#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    pub repository_id: RepositoryId,
    pub name: String,
    /// Packages found by this pass
    pub packages: usize,
    pub diff: DigestDiff,
}

/// Runs tracking passes through a manager
pub struct Tracker<S: RepositoryStore> {
    manager: RepositoryManager<S>,
}

impl<S: RepositoryStore> Tracker<S> {
    pub fn new(manager: RepositoryManager<S>) -> Self {
        Self { manager }
    }

    /// Sync one repository
    ///
    /// Transport failures are recorded as the repository's tracking errors
    /// before being returned. Cancellation writes nothing.
    pub async fn sync(&self, ctx: &RequestContext, id: RepositoryId) -> Result<SyncReport> {
        let repo = self.manager.get_by_id(ctx, id, true).await?;
        tracing::debug!(name = %repo.name, kind = %repo.kind, "starting tracking pass");

        let current = match self.fetch_digests(&ctx.cancel, &repo).await {
            Ok(digests) => digests,
            Err(e) => {
                let err = CatalogError::from_transport(e, &repo);
                if !err.is_canceled() {
                    tracing::warn!(name = %repo.name, error = %err, "tracking pass failed");
                    self.manager
                        .set_last_tracking_results(ctx, id, &err.to_string())
                        .await?;
                }
                return Err(err);
            }
        };

        let previous = self.manager.get_packages_digest(ctx, id).await?;
        let diff = DigestDiff::compute(&previous, &current);
        self.manager.update_packages_digest(ctx, id, &current).await?;
        self.manager.set_last_tracking_results(ctx, id, "").await?;

        tracing::info!(
            name = %repo.name,
            packages = current.len(),
            added = diff.added.len(),
            changed = diff.changed.len(),
            removed = diff.removed.len(),
            "tracking pass complete"
        );
        Ok(SyncReport {
            repository_id: id,
            name: repo.name,
            packages: current.len(),
            diff,
        })
    }

    /// Sync every repository in the catalog, one after another
    ///
    /// Stops at the first cancellation.
    pub async fn sync_all(
        &self,
        ctx: &RequestContext,
    ) -> Result<Vec<(String, Result<SyncReport>)>> {
        let mut results = Vec::new();
        for repo in self.manager.get_all(ctx, false).await? {
            let res = self.sync(ctx, repo.repository_id).await;
            if matches!(res, Err(CatalogError::Canceled)) {
                return Err(CatalogError::Canceled);
            }
            results.push((repo.name, res));
        }
        Ok(results)
    }

    /// Fetch content with the first capability bound for the repository:
    /// index loader, then cloner, then exporter
    async fn fetch_digests(
        &self,
        cancel: &CancellationToken,
        repo: &Repository,
    ) -> std::result::Result<HashMap<String, String>, TransportError> {
        let transports = self.manager.transports();

        if let Ok(loader) = transports.index_loader_for(repo) {
            let index = loader.load_index(cancel, repo).await?;
            return Ok(index.packages_digest());
        }

        if let Ok(cloner) = transports.cloner_for(repo) {
            let cloned = cloner.clone_repository(cancel, repo).await?;
            let digests = digest_dir(cloned.packages_path().to_path_buf()).await;
            drop(cloned);
            return digests;
        }

        let exporter = transports.exporter_for(repo)?;
        let exported = exporter.export_repository(cancel, repo).await?;
        let digests = digest_dir(exported.path().to_path_buf()).await;
        drop(exported);
        digests
    }
}

async fn digest_dir(path: PathBuf) -> std::result::Result<HashMap<String, String>, TransportError> {
    tokio::task::spawn_blocking(move || packages_digest_from_dir(&path))
        .await
        .map_err(|e| TransportError::Io(std::io::Error::other(e)))?
}
