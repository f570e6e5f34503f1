//! pkghub Catalog - the repository catalog
//!
//! This crate owns the catalog's business rules:
//!
//! - **Ownership**: every repository belongs to one user or one organization,
//!   and names are unique per owner
//! - **Claims**: repositories change hands when the claimant proves control of
//!   the content through its metadata file
//! - **Tracking**: passes compare package digests with the previous pass
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use pkghub_catalog::{RepositoryManager, RequestContext, SqliteStore};
//! use pkghub_core::{NewRepository, RepositoryKind};
//! use pkghub_transport::{TransportOptions, TransportRegistry};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = Arc::new(SqliteStore::open_memory()?);
//! let transports = Arc::new(TransportRegistry::standard(TransportOptions::default()));
//! let manager = RepositoryManager::new(store, transports);
//!
//! let ctx = RequestContext::for_user("u1");
//! let new = NewRepository::new("charts", RepositoryKind::Helm, "https://charts.example.com");
//! let repo = manager.add(&ctx, None, new).await?;
//! println!("added {}", repo.repository_id);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod context;
pub mod error;
pub mod manager;
pub mod store;
pub mod tracker;
pub mod validate;

pub use config::HubConfig;
pub use context::RequestContext;
pub use error::{CatalogError, Result};
pub use manager::RepositoryManager;
pub use store::{Organization, RepositoryFilter, RepositoryStore, SqliteStore, User};
pub use tracker::{DigestDiff, SyncReport, Tracker};
