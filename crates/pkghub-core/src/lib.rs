//! pkghub Core - Core types for the package-repository catalog
//!
//! This crate provides the foundational types used throughout pkghub:
//! - `RepositoryKind`: The closed set of repository content types and their registry
//! - `Repository`: The catalog record, with its `OwnerScope`
//! - `RepositoryMetadata`: The ownership sidecar published by repository maintainers

pub mod error;
pub mod kind;
pub mod metadata;
pub mod repository;

pub use error::{CoreError, Result};
pub use kind::{KindInfo, RepositoryKind, kind_name};
pub use metadata::{
    METADATA_EXTENSIONS, Owner, REPOSITORY_METADATA_FILE, RepositoryMetadata, get_metadata,
};
pub use repository::{
    NewRepository, OCI_PREFIX, OwnerScope, Repository, RepositoryId, RepositoryRecord,
    validate_name,
};
