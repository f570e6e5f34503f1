//! Capability traits implemented by transport strategies
//!
//! A kind/transport pair registers only the capabilities it needs:
//!
//! - [`Cloner`]: materialize the package tree in a temporary directory
//! - [`Exporter`]: same contract, for content produced by transformation
//! - [`HelmIndexLoader`]: fetch the pre-built index of a Helm repository
//! - [`MetadataFetcher`]: retrieve the ownership sidecar

use async_trait::async_trait;
use pkghub_core::{Repository, RepositoryMetadata};
use std::future::Future;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

use crate::error::{Result, TransportError};
use crate::index::IndexFile;
use crate::transport::Transport;

/// A repository materialized in a temporary directory
///
/// The directory is removed when this value is dropped, unless [`keep`](Self::keep)
/// hands it over to the caller.
#[derive(Debug)]
pub struct ClonedRepository {
    tmp_dir: TempDir,
    packages_path: PathBuf,
}

impl ClonedRepository {
    pub fn new(tmp_dir: TempDir, packages_path: PathBuf) -> Self {
        Self {
            tmp_dir,
            packages_path,
        }
    }

    /// Root of the temporary directory
    pub fn tmp_dir(&self) -> &Path {
        self.tmp_dir.path()
    }

    /// Directory holding the packages (may be a subdirectory of the root)
    pub fn packages_path(&self) -> &Path {
        &self.packages_path
    }

    /// Stop managing the directory and return `(tmp_dir, packages_path)`
    pub fn keep(self) -> (PathBuf, PathBuf) {
        (self.tmp_dir.keep(), self.packages_path)
    }
}

/// Clones a repository's package tree
#[async_trait]
pub trait Cloner: Send + Sync {
    fn transport(&self) -> Transport;

    async fn clone_repository(
        &self,
        cancel: &CancellationToken,
        repo: &Repository,
    ) -> Result<ClonedRepository>;
}

/// Exports a repository's content by transformation (e.g. unpacking bundle images)
#[async_trait]
pub trait Exporter: Send + Sync {
    fn transport(&self) -> Transport;

    async fn export_repository(
        &self,
        cancel: &CancellationToken,
        repo: &Repository,
    ) -> Result<TempDir>;
}

/// Loads the index of a Helm repository
#[async_trait]
pub trait HelmIndexLoader: Send + Sync {
    async fn load_index(&self, cancel: &CancellationToken, repo: &Repository)
    -> Result<IndexFile>;
}

/// Fetches the ownership sidecar of a repository
#[async_trait]
pub trait MetadataFetcher: Send + Sync {
    fn transport(&self) -> Transport;

    async fn fetch_metadata(
        &self,
        cancel: &CancellationToken,
        repo: &Repository,
    ) -> Result<RepositoryMetadata>;
}

/// Run a fetch, aborting with [`TransportError::Canceled`] when the token fires
pub(crate) async fn run_cancellable<T, F>(cancel: &CancellationToken, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    if cancel.is_cancelled() {
        return Err(TransportError::Canceled);
    }
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(TransportError::Canceled),
        res = fut => res,
    }
}

/// Remove a temporary directory after a failed fetch
///
/// Failures are logged only: the fetch error is what the caller needs to see.
pub(crate) fn discard(tmp: TempDir) {
    let path = tmp.path().to_path_buf();
    if let Err(e) = tmp.close() {
        tracing::warn!(path = %path.display(), error = %e, "failed to remove temporary directory");
    }
}

/// Populate a fresh temporary directory, removing it if `fill` fails
pub(crate) async fn fill_temp_dir<F, Fut>(
    cancel: &CancellationToken,
    tmp: TempDir,
    fill: F,
) -> Result<TempDir>
where
    F: FnOnce(PathBuf) -> Fut,
    Fut: Future<Output = Result<()>>,
{
    let dest = tmp.path().to_path_buf();
    match run_cancellable(cancel, fill(dest)).await {
        Ok(()) => Ok(tmp),
        Err(e) => {
            discard(tmp);
            Err(e)
        }
    }
}
