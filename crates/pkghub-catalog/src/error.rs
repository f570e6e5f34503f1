//! Error types for catalog operations

use pkghub_core::{CoreError, Repository, RepositoryId, RepositoryKind};
use pkghub_transport::TransportError;
use thiserror::Error;

/// Catalog operation errors
#[derive(Debug, Error)]
pub enum CatalogError {
    // ============ Input Errors ============
    #[error("Invalid repository kind: {name}")]
    InvalidKind { name: String },

    #[error("Invalid repository URL: {url} - {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("Invalid ownership: {message}")]
    InvalidOwnership { message: String },

    // ============ Catalog State Errors ============
    #[error("{entity} not found: {key}")]
    NotFound { entity: &'static str, key: String },

    #[error("Name conflict: '{name}' is already in use")]
    NameConflict { name: String },

    #[error("Permission denied: {message}")]
    PermissionDenied { message: String },

    #[error("Field '{field}' cannot be changed")]
    ImmutableFieldChanged { field: &'static str },

    // ============ Ownership Claims ============
    #[error("Ownership verification failed: {message}")]
    OwnershipVerificationFailed { message: String },

    #[error("Repository metadata file not found: {path}")]
    MetadataNotFound { path: String },

    #[error("Invalid repository metadata in {source_name}: {message}")]
    MetadataInvalid {
        source_name: String,
        message: String,
    },

    // ============ Content Fetching ============
    #[error("Operation canceled")]
    Canceled,

    #[error("Transport failure for {kind} repository {repository_id} ({url}): {source}")]
    TransportFailure {
        repository_id: RepositoryId,
        kind: RepositoryKind,
        url: String,
        source: TransportError,
    },

    // ============ Infrastructure ============
    #[error("Storage error: {message}")]
    Storage { message: String },

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for catalog operations
pub type Result<T> = std::result::Result<T, CatalogError>;

impl CatalogError {
    pub(crate) fn repository_not_found(key: impl ToString) -> Self {
        CatalogError::NotFound {
            entity: "repository",
            key: key.to_string(),
        }
    }

    pub(crate) fn permission_denied(message: impl Into<String>) -> Self {
        CatalogError::PermissionDenied {
            message: message.into(),
        }
    }

    /// Convert a transport error, attaching the repository it happened on
    pub fn from_transport(err: TransportError, repo: &Repository) -> Self {
        match err {
            TransportError::Canceled => CatalogError::Canceled,
            TransportError::InvalidUrl { url, reason } => CatalogError::InvalidUrl {
                url: if url.is_empty() { repo.url.clone() } else { url },
                reason,
            },
            TransportError::InvalidOciReference { reference } => CatalogError::InvalidUrl {
                url: repo.url.clone(),
                reason: format!("invalid OCI reference {}", reference),
            },
            TransportError::Metadata(core) => core.into(),
            source => CatalogError::TransportFailure {
                repository_id: repo.repository_id,
                kind: repo.kind,
                url: repo.url.clone(),
                source,
            },
        }
    }

    pub fn is_canceled(&self) -> bool {
        matches!(self, CatalogError::Canceled)
    }
}

impl From<CoreError> for CatalogError {
    fn from(e: CoreError) -> Self {
        match e {
            CoreError::InvalidKind { name } => CatalogError::InvalidKind { name },
            CoreError::InvalidRepositoryId { value, reason } => CatalogError::InvalidInput {
                message: format!("invalid repository id '{}': {}", value, reason),
            },
            CoreError::InvalidName { name, reason } => CatalogError::InvalidInput {
                message: format!("invalid repository name '{}': {}", name, reason),
            },
            CoreError::InvalidOwnership { message } => CatalogError::InvalidOwnership { message },
            CoreError::MetadataNotFound { path } => CatalogError::MetadataNotFound { path },
            CoreError::MetadataInvalid {
                source_name,
                message,
            } => CatalogError::MetadataInvalid {
                source_name,
                message,
            },
            CoreError::Io(e) => CatalogError::Io(e),
        }
    }
}

impl From<rusqlite::Error> for CatalogError {
    fn from(e: rusqlite::Error) -> Self {
        CatalogError::Storage {
            message: e.to_string(),
        }
    }
}

impl From<serde_json::Error> for CatalogError {
    fn from(e: serde_json::Error) -> Self {
        CatalogError::Serialization(e.to_string())
    }
}

impl From<serde_yaml::Error> for CatalogError {
    fn from(e: serde_yaml::Error) -> Self {
        CatalogError::Serialization(e.to_string())
    }
}

impl From<url::ParseError> for CatalogError {
    fn from(e: url::ParseError) -> Self {
        CatalogError::InvalidUrl {
            url: String::new(),
            reason: e.to_string(),
        }
    }
}
