//! Core error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("invalid repository kind: {name}")]
    InvalidKind { name: String },

    #[error("invalid repository id '{value}': {reason}")]
    InvalidRepositoryId { value: String, reason: String },

    #[error("invalid repository name '{name}': {reason}")]
    InvalidName { name: String, reason: String },

    #[error("repository must be owned by exactly one user or organization: {message}")]
    InvalidOwnership { message: String },

    #[error("repository metadata file not found: {path}")]
    MetadataNotFound { path: String },

    #[error("invalid repository metadata in {source_name}: {message}")]
    MetadataInvalid {
        source_name: String,
        message: String,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CoreError>;
