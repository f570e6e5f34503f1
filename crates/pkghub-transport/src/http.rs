//! HTTP Helm repository access
//!
//! Helm repositories publish a pre-built `index.yaml`, so they are never
//! cloned: the index is enough to detect which chart versions changed.

use async_trait::async_trait;
use pkghub_core::{
    CoreError, METADATA_EXTENSIONS, REPOSITORY_METADATA_FILE, Repository, RepositoryMetadata,
};
use tokio_util::sync::CancellationToken;

use crate::credentials::SecureHttpClient;
use crate::error::{Result, TransportError};
use crate::index::IndexFile;
use crate::strategy::{HelmIndexLoader, MetadataFetcher, run_cancellable};
use crate::transport::{Transport, TransportOptions};

/// Loads Helm indexes and sidecars over HTTP(S)
pub struct HttpIndexLoader {
    options: TransportOptions,
}

impl HttpIndexLoader {
    pub fn new(options: TransportOptions) -> Self {
        Self { options }
    }

    fn client_for(&self, repo: &Repository) -> Result<SecureHttpClient> {
        SecureHttpClient::for_repository(repo, self.options.http_timeout)
    }

    /// URL of the index document
    pub fn index_url(repo: &Repository) -> String {
        format!("{}/index.yaml", repo.url.trim_end_matches('/'))
    }

    /// Candidate URLs of the metadata sidecar, in lookup order
    pub fn metadata_urls(repo: &Repository) -> Vec<String> {
        let base = repo.url.trim_end_matches('/');
        METADATA_EXTENSIONS
            .iter()
            .map(|ext| format!("{}/{}.{}", base, REPOSITORY_METADATA_FILE, ext))
            .collect()
    }
}

#[async_trait]
impl HelmIndexLoader for HttpIndexLoader {
    async fn load_index(&self, cancel: &CancellationToken, repo: &Repository) -> Result<IndexFile> {
        let client = self.client_for(repo)?;
        let url = Self::index_url(repo);
        tracing::debug!(repository = %repo.name, %url, "loading helm index");

        let data = run_cancellable(cancel, async {
            client.get_bytes(&url).await.map_err(|e| match e {
                TransportError::HttpError { status: 404, .. } => {
                    TransportError::IndexNotFound { url: url.clone() }
                }
                other => other,
            })
        })
        .await?;

        IndexFile::from_bytes(&data)
    }
}

#[async_trait]
impl MetadataFetcher for HttpIndexLoader {
    fn transport(&self) -> Transport {
        Transport::Git
    }

    async fn fetch_metadata(
        &self,
        cancel: &CancellationToken,
        repo: &Repository,
    ) -> Result<RepositoryMetadata> {
        let client = self.client_for(repo)?;
        let urls = Self::metadata_urls(repo);

        for url in &urls {
            let fetched = run_cancellable(cancel, client.get_bytes(url)).await;
            match fetched {
                Ok(data) => {
                    let content = String::from_utf8_lossy(&data);
                    return Ok(RepositoryMetadata::from_yaml(&content, url)?);
                }
                Err(TransportError::HttpError { status: 404, .. }) => {
                    tracing::debug!(%url, "metadata sidecar not found");
                }
                Err(e) => return Err(e),
            }
        }

        Err(CoreError::MetadataNotFound {
            path: urls.join(", "),
        }
        .into())
    }
}
