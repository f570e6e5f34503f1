//! Strategy registry keyed by repository kind and transport

use pkghub_core::{Repository, RepositoryKind};
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{Result, TransportError};
use crate::git::GitCloner;
use crate::http::HttpIndexLoader;
use crate::oci::{OciBundleExporter, OciCloner, OciMetadataFetcher};
use crate::strategy::{Cloner, Exporter, HelmIndexLoader, MetadataFetcher};
use crate::transport::{Transport, TransportOptions};

/// Capabilities registered for one kind/transport pair
#[derive(Clone, Default)]
pub struct Strategies {
    pub cloner: Option<Arc<dyn Cloner>>,
    pub exporter: Option<Arc<dyn Exporter>>,
    pub index_loader: Option<Arc<dyn HelmIndexLoader>>,
    pub metadata_fetcher: Option<Arc<dyn MetadataFetcher>>,
}

impl Strategies {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cloner(mut self, cloner: Arc<dyn Cloner>) -> Self {
        self.cloner = Some(cloner);
        self
    }

    pub fn with_exporter(mut self, exporter: Arc<dyn Exporter>) -> Self {
        self.exporter = Some(exporter);
        self
    }

    pub fn with_index_loader(mut self, loader: Arc<dyn HelmIndexLoader>) -> Self {
        self.index_loader = Some(loader);
        self
    }

    pub fn with_metadata_fetcher(mut self, fetcher: Arc<dyn MetadataFetcher>) -> Self {
        self.metadata_fetcher = Some(fetcher);
        self
    }
}

/// Selects the strategy serving a repository
#[derive(Clone, Default)]
pub struct TransportRegistry {
    bindings: HashMap<(RepositoryKind, Transport), Strategies>,
}

impl TransportRegistry {
    pub fn builder() -> TransportRegistryBuilder {
        TransportRegistryBuilder::default()
    }

    /// Default bindings
    ///
    /// | kind  | git                        | oci                      |
    /// |-------|----------------------------|--------------------------|
    /// | helm  | index loader, sidecar      | cloner, sidecar          |
    /// | falco | cloner, sidecar            | -                        |
    /// | opa   | cloner, sidecar            | -                        |
    /// | olm   | cloner, sidecar            | exporter, sidecar        |
    pub fn standard(options: TransportOptions) -> Self {
        let git = Arc::new(GitCloner::new(options.clone()));
        let http = Arc::new(HttpIndexLoader::new(options.clone()));
        let oci_metadata: Arc<dyn MetadataFetcher> =
            Arc::new(OciMetadataFetcher::new(options.clone()));

        let git_tree = Strategies::new()
            .with_cloner(git.clone())
            .with_metadata_fetcher(git);

        Self::builder()
            .bind(
                RepositoryKind::Helm,
                Transport::Git,
                Strategies::new()
                    .with_index_loader(http.clone())
                    .with_metadata_fetcher(http),
            )
            .bind(
                RepositoryKind::Helm,
                Transport::Oci,
                Strategies::new()
                    .with_cloner(Arc::new(OciCloner::new(options.clone())))
                    .with_metadata_fetcher(oci_metadata.clone()),
            )
            .bind(RepositoryKind::Falco, Transport::Git, git_tree.clone())
            .bind(RepositoryKind::Opa, Transport::Git, git_tree.clone())
            .bind(RepositoryKind::Olm, Transport::Git, git_tree)
            .bind(
                RepositoryKind::Olm,
                Transport::Oci,
                Strategies::new()
                    .with_exporter(Arc::new(OciBundleExporter::new(options)))
                    .with_metadata_fetcher(oci_metadata),
            )
            .build()
    }

    /// Strategies bound to a kind/transport pair
    pub fn strategies(&self, kind: RepositoryKind, transport: Transport) -> Option<&Strategies> {
        self.bindings.get(&(kind, transport))
    }

    fn lookup<T: ?Sized>(
        &self,
        repo: &Repository,
        capability: &'static str,
        pick: impl Fn(&Strategies) -> Option<&Arc<T>>,
    ) -> Result<Arc<T>> {
        let transport = Transport::detect(&repo.url);
        self.strategies(repo.kind, transport)
            .and_then(pick)
            .cloned()
            .ok_or_else(|| TransportError::CapabilityUnavailable {
                kind: repo.kind.name().to_string(),
                transport: transport.to_string(),
                capability,
            })
    }

    pub fn cloner_for(&self, repo: &Repository) -> Result<Arc<dyn Cloner>> {
        self.lookup(repo, "cloner", |s| s.cloner.as_ref())
    }

    pub fn exporter_for(&self, repo: &Repository) -> Result<Arc<dyn Exporter>> {
        self.lookup(repo, "exporter", |s| s.exporter.as_ref())
    }

    pub fn index_loader_for(&self, repo: &Repository) -> Result<Arc<dyn HelmIndexLoader>> {
        self.lookup(repo, "index loader", |s| s.index_loader.as_ref())
    }

    pub fn metadata_fetcher_for(&self, repo: &Repository) -> Result<Arc<dyn MetadataFetcher>> {
        self.lookup(repo, "metadata fetcher", |s| s.metadata_fetcher.as_ref())
    }
}

/// Builder for [`TransportRegistry`]
#[derive(Default)]
pub struct TransportRegistryBuilder {
    bindings: HashMap<(RepositoryKind, Transport), Strategies>,
}

impl TransportRegistryBuilder {
    /// Bind strategies to a kind/transport pair, replacing any previous binding
    pub fn bind(
        mut self,
        kind: RepositoryKind,
        transport: Transport,
        strategies: Strategies,
    ) -> Self {
        self.bindings.insert((kind, transport), strategies);
        self
    }

    pub fn build(self) -> TransportRegistry {
        TransportRegistry {
            bindings: self.bindings,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pkghub_core::{NewRepository, OwnerScope, RepositoryId};

    fn repo(kind: RepositoryKind, url: &str) -> Repository {
        NewRepository::new("repo", kind, url)
            .into_repository(RepositoryId::new(), OwnerScope::user("u1", "alice"))
    }

    #[test]
    fn test_oci_helm_routes_to_oci_cloner() {
        let registry = TransportRegistry::standard(TransportOptions::default());
        let cloner = registry
            .cloner_for(&repo(RepositoryKind::Helm, "oci://ghcr.io/org/charts/nginx"))
            .unwrap();
        assert_eq!(cloner.transport(), Transport::Oci);
    }

    #[test]
    fn test_http_helm_has_no_cloner() {
        let registry = TransportRegistry::standard(TransportOptions::default());
        let helm = repo(RepositoryKind::Helm, "https://charts.example.com");

        let err = registry.cloner_for(&helm).err().unwrap();
        assert!(matches!(
            err,
            TransportError::CapabilityUnavailable { capability: "cloner", .. }
        ));
        assert!(registry.index_loader_for(&helm).is_ok());
        assert_eq!(
            registry.metadata_fetcher_for(&helm).unwrap().transport(),
            Transport::Git
        );
    }

    #[test]
    fn test_git_kinds_route_to_git_cloner() {
        let registry = TransportRegistry::standard(TransportOptions::default());
        for kind in [RepositoryKind::Falco, RepositoryKind::Opa, RepositoryKind::Olm] {
            let cloner = registry
                .cloner_for(&repo(kind, "https://github.com/org/repo"))
                .unwrap();
            assert_eq!(cloner.transport(), Transport::Git);
        }
    }

    #[test]
    fn test_olm_oci_exports() {
        let registry = TransportRegistry::standard(TransportOptions::default());
        let olm = repo(RepositoryKind::Olm, "oci://quay.io/org/bundle");
        assert_eq!(
            registry.exporter_for(&olm).unwrap().transport(),
            Transport::Oci
        );
        assert!(registry.cloner_for(&olm).is_err());
        assert!(registry
            .cloner_for(&repo(RepositoryKind::Falco, "oci://ghcr.io/org/rules"))
            .is_err());
    }

    #[test]
    fn test_empty_registry_error_message() {
        let registry = TransportRegistry::builder().build();
        let err = registry
            .index_loader_for(&repo(RepositoryKind::Helm, "https://charts.example.com"))
            .err()
            .unwrap();
        insta::assert_snapshot!(err.to_string(), @"No index loader registered for helm repositories over git");
    }
}
