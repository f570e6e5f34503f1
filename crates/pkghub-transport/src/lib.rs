//! pkghub Transport - fetching repository content
//!
//! Every repository kind is served over one of two transports, detected from
//! its URL:
//!
//! - **Git**: Git remotes, and plain HTTP for Helm repositories with an `index.yaml`
//! - **OCI**: any URL with the `oci://` prefix
//!
//! Strategies implement the capability traits in [`strategy`] and are bound
//! to kind/transport pairs in a [`TransportRegistry`].
//!
//! ## Example
//!
//! ```rust,no_run
//! use pkghub_core::{NewRepository, OwnerScope, RepositoryId, RepositoryKind};
//! use pkghub_transport::{TransportOptions, TransportRegistry};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let repo = NewRepository::new("rules", RepositoryKind::Falco, "https://github.com/org/rules")
//!     .into_repository(RepositoryId::new(), OwnerScope::user("u1", "alice"));
//!
//! let registry = TransportRegistry::standard(TransportOptions::default());
//! let cloned = registry
//!     .cloner_for(&repo)?
//!     .clone_repository(&CancellationToken::new(), &repo)
//!     .await?;
//! println!("packages in {}", cloned.packages_path().display());
//! // The clone is removed here
//! # Ok(())
//! # }
//! ```
//!
//! ## Security Notes
//!
//! - Credentials are NEVER sent after cross-origin redirects
//! - Git credentials are redacted from clone errors

pub mod archive;
pub mod credentials;
pub mod digest;
pub mod error;
pub mod git;
pub mod http;
pub mod index;
pub mod oci;
pub mod registry;
pub mod strategy;
pub mod transport;

pub use credentials::{RepositoryAuth, SecureHttpClient};
pub use digest::{compute_digest, directory_digest, packages_digest_from_dir};
pub use error::{Result, TransportError};
pub use git::{GitCloner, GitRemote};
pub use http::HttpIndexLoader;
pub use index::{ChartVersion, IndexFile};
pub use oci::{OciBundleExporter, OciCloner, OciMetadataFetcher, OciReference};
pub use registry::{Strategies, TransportRegistry, TransportRegistryBuilder};
pub use strategy::{ClonedRepository, Cloner, Exporter, HelmIndexLoader, MetadataFetcher};
pub use transport::{OciProtocol, Transport, TransportOptions};
