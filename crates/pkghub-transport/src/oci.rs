//! OCI registry strategies
//!
//! - Helm charts stored as OCI artifacts are cloned tag by tag
//! - Operator bundle images are exported by unpacking their layers
//! - The ownership sidecar is an artifact pushed under the `artifacthub.io` tag

use async_trait::async_trait;
use oci_distribution::Reference;
use oci_distribution::client::{Client, ClientConfig, ClientProtocol, ImageLayer};
use oci_distribution::secrets::RegistryAuth;
use pkghub_core::{CoreError, OCI_PREFIX, Repository, RepositoryMetadata};
use semver::Version;
use std::path::Path;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

use crate::archive::{extract_tar, extract_tar_gz};
use crate::credentials::RepositoryAuth;
use crate::error::{Result, TransportError};
use crate::strategy::{
    ClonedRepository, Cloner, Exporter, MetadataFetcher, fill_temp_dir, run_cancellable,
};
use crate::transport::{OciProtocol, Transport, TransportOptions};

/// Media types of the artifacts handled here
pub mod media_types {
    /// Helm chart config
    pub const HELM_CONFIG: &str = "application/vnd.cncf.helm.config.v1+json";
    /// Helm chart content layer
    pub const HELM_CONTENT: &str = "application/vnd.cncf.helm.chart.content.v1.tar+gzip";
    /// Repository ownership sidecar
    pub const REPOSITORY_METADATA: &str =
        "application/vnd.cncf.artifacthub.repository-metadata.layer.v1.yaml";
    /// Compressed image layer
    pub const IMAGE_LAYER_GZIP: &str = "application/vnd.oci.image.layer.v1.tar+gzip";
    /// Uncompressed image layer
    pub const IMAGE_LAYER: &str = "application/vnd.oci.image.layer.v1.tar";
    /// Compressed image layer, Docker schema 2
    pub const DOCKER_LAYER_GZIP: &str = "application/vnd.docker.image.rootfs.diff.tar.gzip";
}

/// Tag under which the ownership sidecar is pushed
pub const METADATA_TAG: &str = "artifacthub.io";

/// Parse an OCI reference string
///
/// Format: oci://registry/repo:tag or registry/repo:tag
pub fn parse_reference(reference: &str) -> Result<Reference> {
    let clean = reference
        .trim_start_matches(OCI_PREFIX)
        .trim_start_matches("https://")
        .trim_start_matches("http://");

    Reference::try_from(clean).map_err(|e| TransportError::InvalidOciReference {
        reference: format!("{}: {}", reference, e),
    })
}

/// OCI reference helper
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OciReference {
    pub registry: String,
    pub repository: String,
    pub tag: Option<String>,
    pub digest: Option<String>,
}

impl OciReference {
    pub fn parse(s: &str) -> Result<Self> {
        let clean = s.trim_start_matches(OCI_PREFIX).trim_end_matches('/');

        let (registry, rest) =
            clean
                .split_once('/')
                .ok_or_else(|| TransportError::InvalidOciReference {
                    reference: s.to_string(),
                })?;
        if registry.is_empty() || rest.is_empty() {
            return Err(TransportError::InvalidOciReference {
                reference: s.to_string(),
            });
        }

        let (repo_tag, digest) = match rest.rsplit_once('@') {
            Some((r, d)) => (r, Some(d.to_string())),
            None => (rest, None),
        };

        // A ':' after the last '/' is a tag separator, not a port
        let (repository, tag) = match repo_tag.rsplit_once(':') {
            Some((r, t)) if !t.contains('/') => (r.to_string(), Some(t.to_string())),
            _ => (repo_tag.to_string(), None),
        };

        Ok(Self {
            registry: registry.to_string(),
            repository,
            tag,
            digest,
        })
    }

    /// Same repository, pointing at another tag
    pub fn with_tag(&self, tag: &str) -> Self {
        Self {
            registry: self.registry.clone(),
            repository: self.repository.clone(),
            tag: Some(tag.to_string()),
            digest: None,
        }
    }

    pub fn to_oci_string(&self) -> String {
        let mut s = format!("{}/{}", self.registry, self.repository);
        if let Some(tag) = &self.tag {
            s.push(':');
            s.push_str(tag);
        }
        if let Some(digest) = &self.digest {
            s.push('@');
            s.push_str(digest);
        }
        s
    }

    fn to_reference(&self) -> Result<Reference> {
        parse_reference(&self.to_oci_string())
    }
}

/// Registry session for one repository
struct OciRegistry {
    client: Client,
    auth: RegistryAuth,
    base: OciReference,
}

impl OciRegistry {
    fn for_repository(repo: &Repository, options: &TransportOptions) -> Result<Self> {
        let auth = match RepositoryAuth::from_repository(repo) {
            Some(auth) => {
                RegistryAuth::Basic(auth.username().to_string(), auth.password().to_string())
            }
            None => RegistryAuth::Anonymous,
        };

        let protocol = match options.oci_protocol {
            OciProtocol::Https => ClientProtocol::Https,
            OciProtocol::Http => ClientProtocol::Http,
        };
        let client = Client::new(ClientConfig {
            protocol,
            ..Default::default()
        });

        Ok(Self {
            client,
            auth,
            base: OciReference::parse(&repo.url)?,
        })
    }

    async fn list_tags(&self) -> Result<Vec<String>> {
        let reference = self.base.with_tag("latest").to_reference()?;
        let response = self
            .client
            .list_tags(&reference, &self.auth, None, None)
            .await
            .map_err(|e| map_oci_error(&reference, e))?;
        Ok(response.tags)
    }

    async fn pull(&self, reference: &OciReference, accepted: Vec<&str>) -> Result<Vec<ImageLayer>> {
        let reference = reference.to_reference()?;
        tracing::debug!(reference = %reference, "pulling oci artifact");
        let image = self
            .client
            .pull(&reference, &self.auth, accepted)
            .await
            .map_err(|e| map_oci_error(&reference, e))?;
        Ok(image.layers)
    }
}

fn map_oci_error(
    reference: &Reference,
    e: oci_distribution::errors::OciDistributionError,
) -> TransportError {
    let message = e.to_string();
    let lower = message.to_lowercase();
    if lower.contains("not found") || lower.contains("manifest unknown") || lower.contains("404") {
        TransportError::OciManifestNotFound {
            reference: reference.whole(),
        }
    } else if lower.contains("unauthorized") || lower.contains("401") {
        TransportError::AuthFailed { message }
    } else {
        TransportError::OciError { message }
    }
}

/// Chart version tags, newest first, at most `max`
///
/// Helm stores `+` build metadata as `_` in tags.
pub fn select_chart_tags(tags: &[String], max: usize) -> Vec<String> {
    let mut versions: Vec<(Version, &String)> = tags
        .iter()
        .filter_map(|t| Version::parse(&t.replace('_', "+")).ok().map(|v| (v, t)))
        .collect();
    versions.sort_by(|a, b| b.0.cmp(&a.0));
    versions
        .into_iter()
        .take(max)
        .map(|(_, t)| t.clone())
        .collect()
}

/// Clones Helm chart repositories stored in an OCI registry
///
/// Each selected tag is extracted to `<tmp>/<tag>`.
pub struct OciCloner {
    options: TransportOptions,
}

impl OciCloner {
    pub fn new(options: TransportOptions) -> Self {
        Self { options }
    }

    async fn pull_tags(&self, repo: &Repository, dest: &Path) -> Result<()> {
        let registry = OciRegistry::for_repository(repo, &self.options)?;
        let tags = select_chart_tags(&registry.list_tags().await?, self.options.max_oci_tags);
        tracing::debug!(repository = %repo.name, tags = tags.len(), "cloning oci chart repository");

        for tag in tags {
            let layers = registry
                .pull(
                    &registry.base.with_tag(&tag),
                    vec![media_types::HELM_CONFIG, media_types::HELM_CONTENT],
                )
                .await?;
            let content = layers
                .iter()
                .find(|l| l.media_type == media_types::HELM_CONTENT)
                .ok_or_else(|| TransportError::OciError {
                    message: format!("No chart content layer found for tag {}", tag),
                })?;
            extract_tar_gz(&content.data, &dest.join(&tag))?;
        }
        Ok(())
    }
}

#[async_trait]
impl Cloner for OciCloner {
    fn transport(&self) -> Transport {
        Transport::Oci
    }

    async fn clone_repository(
        &self,
        cancel: &CancellationToken,
        repo: &Repository,
    ) -> Result<ClonedRepository> {
        if cancel.is_cancelled() {
            return Err(TransportError::Canceled);
        }
        let tmp = self.options.create_temp_dir()?;
        let tmp = fill_temp_dir(cancel, tmp, |dest| async move {
            self.pull_tags(repo, &dest).await
        })
        .await?;
        let packages_path = tmp.path().to_path_buf();
        Ok(ClonedRepository::new(tmp, packages_path))
    }
}

/// Exports operator bundle images by unpacking their layers
pub struct OciBundleExporter {
    options: TransportOptions,
}

impl OciBundleExporter {
    pub fn new(options: TransportOptions) -> Self {
        Self { options }
    }

    async fn unpack_image(&self, repo: &Repository, dest: &Path) -> Result<()> {
        let registry = OciRegistry::for_repository(repo, &self.options)?;
        let reference = if registry.base.tag.is_some() || registry.base.digest.is_some() {
            registry.base.clone()
        } else {
            registry.base.with_tag("latest")
        };

        let layers = registry
            .pull(
                &reference,
                vec![
                    media_types::IMAGE_LAYER_GZIP,
                    media_types::IMAGE_LAYER,
                    media_types::DOCKER_LAYER_GZIP,
                ],
            )
            .await?;

        // Layers apply in manifest order
        for layer in &layers {
            if layer.media_type == media_types::IMAGE_LAYER {
                extract_tar(&layer.data, dest)?;
            } else {
                extract_tar_gz(&layer.data, dest)?;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl Exporter for OciBundleExporter {
    fn transport(&self) -> Transport {
        Transport::Oci
    }

    async fn export_repository(
        &self,
        cancel: &CancellationToken,
        repo: &Repository,
    ) -> Result<TempDir> {
        if cancel.is_cancelled() {
            return Err(TransportError::Canceled);
        }
        let tmp = self.options.create_temp_dir()?;
        fill_temp_dir(cancel, tmp, |dest| async move {
            self.unpack_image(repo, &dest).await
        })
        .await
    }
}

/// Fetches the ownership sidecar pushed next to an OCI repository
pub struct OciMetadataFetcher {
    options: TransportOptions,
}

impl OciMetadataFetcher {
    pub fn new(options: TransportOptions) -> Self {
        Self { options }
    }
}

#[async_trait]
impl MetadataFetcher for OciMetadataFetcher {
    fn transport(&self) -> Transport {
        Transport::Oci
    }

    async fn fetch_metadata(
        &self,
        cancel: &CancellationToken,
        repo: &Repository,
    ) -> Result<RepositoryMetadata> {
        let registry = OciRegistry::for_repository(repo, &self.options)?;
        let reference = registry.base.with_tag(METADATA_TAG);
        let source = reference.to_oci_string();

        let layers = run_cancellable(cancel, async {
            registry
                .pull(&reference, vec![media_types::REPOSITORY_METADATA])
                .await
                .map_err(|e| match e {
                    TransportError::OciManifestNotFound { .. } => {
                        CoreError::MetadataNotFound {
                            path: source.clone(),
                        }
                        .into()
                    }
                    other => other,
                })
        })
        .await?;

        let layer = layers
            .iter()
            .find(|l| l.media_type == media_types::REPOSITORY_METADATA)
            .ok_or_else(|| CoreError::MetadataNotFound {
                path: source.clone(),
            })?;
        let content = String::from_utf8_lossy(&layer.data);
        Ok(RepositoryMetadata::from_yaml(&content, &source)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_oci_reference_parse() {
        let ref1 = OciReference::parse("oci://ghcr.io/myorg/charts/nginx:1.0.0").unwrap();
        assert_eq!(ref1.registry, "ghcr.io");
        assert_eq!(ref1.repository, "myorg/charts/nginx");
        assert_eq!(ref1.tag, Some("1.0.0".to_string()));
        assert!(ref1.digest.is_none());

        let ref2 = OciReference::parse("ghcr.io/myorg/nginx:1.0@sha256:abc123").unwrap();
        assert_eq!(ref2.repository, "myorg/nginx");
        assert_eq!(ref2.tag, Some("1.0".to_string()));
        assert_eq!(ref2.digest, Some("sha256:abc123".to_string()));

        let ref3 = OciReference::parse("oci://localhost:5000/operators/bundle").unwrap();
        assert_eq!(ref3.registry, "localhost:5000");
        assert_eq!(ref3.repository, "operators/bundle");
        assert!(ref3.tag.is_none());

        assert!(OciReference::parse("oci://ghcr.io").is_err());
    }

    #[test]
    fn test_with_tag() {
        let base = OciReference::parse("oci://ghcr.io/myorg/nginx").unwrap();
        assert_eq!(
            base.with_tag(METADATA_TAG).to_oci_string(),
            "ghcr.io/myorg/nginx:artifacthub.io"
        );
        let pinned = OciReference::parse("oci://ghcr.io/myorg/nginx:1.0@sha256:abc").unwrap();
        assert_eq!(pinned.with_tag("2.0").to_oci_string(), "ghcr.io/myorg/nginx:2.0");
    }

    #[test]
    fn test_parse_reference() {
        let reference = parse_reference("oci://ghcr.io/myorg/nginx:1.0.0").unwrap();
        assert_eq!(reference.registry(), "ghcr.io");
        assert_eq!(reference.repository(), "myorg/nginx");
        assert_eq!(reference.tag(), Some("1.0.0"));
    }

    #[test]
    fn test_select_chart_tags() {
        let tags: Vec<String> = [
            "1.0.0",
            "latest",
            "2.0.0",
            "1.10.0",
            "2.0.0_build.1",
            "sha256-abc",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();

        assert_eq!(
            select_chart_tags(&tags, 10),
            vec!["2.0.0_build.1", "2.0.0", "1.10.0", "1.0.0"]
        );
        assert_eq!(select_chart_tags(&tags, 2).len(), 2);
        assert!(select_chart_tags(&[], 5).is_empty());
    }

    mod cancellation {
        use super::*;
        use pkghub_core::{NewRepository, OwnerScope, RepositoryId, RepositoryKind};
        use std::time::Duration;
        use wiremock::{Mock, MockServer, ResponseTemplate};

        fn oci_repo(kind: RepositoryKind, url: &str) -> Repository {
            NewRepository::new("oci-repo", kind, url)
                .into_repository(RepositoryId::new(), OwnerScope::user("u1", "alice"))
        }

        fn options(root: &TempDir) -> TransportOptions {
            TransportOptions {
                temp_root: Some(root.path().to_path_buf()),
                oci_protocol: OciProtocol::Http,
                ..Default::default()
            }
        }

        /// Registry that answers every request after five seconds
        async fn slow_registry() -> MockServer {
            let server = MockServer::start().await;
            Mock::given(wiremock::matchers::any())
                .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
                .mount(&server)
                .await;
            server
        }

        fn cancel_soon() -> CancellationToken {
            let cancel = CancellationToken::new();
            let trigger = cancel.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(100)).await;
                trigger.cancel();
            });
            cancel
        }

        fn is_empty(root: &TempDir) -> bool {
            std::fs::read_dir(root.path()).map_or(true, |mut d| d.next().is_none())
        }

        #[tokio::test]
        async fn test_precanceled_clone() {
            let root = TempDir::new().unwrap();
            let cancel = CancellationToken::new();
            cancel.cancel();

            let repo = oci_repo(RepositoryKind::Helm, "oci://ghcr.io/acme/charts");
            let err = OciCloner::new(options(&root))
                .clone_repository(&cancel, &repo)
                .await
                .unwrap_err();

            assert!(err.is_canceled());
            assert!(is_empty(&root));
        }

        #[tokio::test]
        async fn test_precanceled_export() {
            let root = TempDir::new().unwrap();
            let cancel = CancellationToken::new();
            cancel.cancel();

            let repo = oci_repo(RepositoryKind::Olm, "oci://quay.io/acme/bundle");
            let err = OciBundleExporter::new(options(&root))
                .export_repository(&cancel, &repo)
                .await
                .unwrap_err();

            assert!(err.is_canceled());
            assert!(is_empty(&root));
        }

        #[tokio::test]
        async fn test_clone_canceled_while_pulling() {
            let server = slow_registry().await;
            let root = TempDir::new().unwrap();
            let url = format!("oci://{}/acme/charts", server.address());

            let repo = oci_repo(RepositoryKind::Helm, &url);
            let err = OciCloner::new(options(&root))
                .clone_repository(&cancel_soon(), &repo)
                .await
                .unwrap_err();

            assert!(err.is_canceled());
            assert!(is_empty(&root));
        }

        #[tokio::test]
        async fn test_export_canceled_while_pulling() {
            let server = slow_registry().await;
            let root = TempDir::new().unwrap();
            let url = format!("oci://{}/acme/bundle:v1", server.address());

            let repo = oci_repo(RepositoryKind::Olm, &url);
            let err = OciBundleExporter::new(options(&root))
                .export_repository(&cancel_soon(), &repo)
                .await
                .unwrap_err();

            assert!(err.is_canceled());
            assert!(is_empty(&root));
        }
    }
}
