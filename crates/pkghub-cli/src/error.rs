//! CLI error type with exit code mapping

use miette::Diagnostic;
use pkghub_catalog::CatalogError;
use thiserror::Error;

use crate::exit_codes;

/// Error reported to the user, carrying its exit code
#[derive(Error, Debug, Diagnostic, Clone)]
pub enum CliError {
    /// Invalid input
    #[error("Validation failed: {message}")]
    #[diagnostic(code(pkghub::cli::validation))]
    Validation {
        message: String,
        #[help]
        help: Option<String>,
    },

    #[error("{message}")]
    #[diagnostic(code(pkghub::cli::not_found))]
    NotFound {
        message: String,
        #[help]
        help: Option<String>,
    },

    #[error("Permission denied: {message}")]
    #[diagnostic(code(pkghub::cli::permission))]
    PermissionDenied {
        message: String,
        #[help]
        help: Option<String>,
    },

    #[error("{message}")]
    #[diagnostic(code(pkghub::cli::conflict))]
    Conflict {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// Remote fetch failed
    #[error("{message}")]
    #[diagnostic(code(pkghub::cli::transport))]
    Transport { message: String },

    #[error("IO error: {message}")]
    #[diagnostic(code(pkghub::cli::io))]
    Io { message: String },

    #[error("Interrupted")]
    #[diagnostic(code(pkghub::cli::canceled))]
    Canceled,

    /// Runtime or storage failure
    #[error("Internal error: {message}")]
    #[diagnostic(code(pkghub::cli::internal))]
    Internal { message: String },
}

impl CliError {
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Validation { .. } => exit_codes::VALIDATION_ERROR,
            CliError::NotFound { .. } => exit_codes::NOT_FOUND,
            CliError::PermissionDenied { .. } => exit_codes::PERMISSION_DENIED,
            CliError::Conflict { .. } => exit_codes::CONFLICT,
            CliError::Transport { .. } => exit_codes::TRANSPORT_ERROR,
            CliError::Io { .. } => exit_codes::IO_ERROR,
            CliError::Canceled => exit_codes::CANCELED,
            CliError::Internal { .. } => exit_codes::ERROR,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// User provided invalid input
    pub fn input(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            help: None,
        }
    }

    pub fn with_help(self, text: impl Into<String>) -> Self {
        let text = Some(text.into());
        match self {
            CliError::Validation { message, .. } => CliError::Validation { message, help: text },
            CliError::NotFound { message, .. } => CliError::NotFound { message, help: text },
            CliError::PermissionDenied { message, .. } => {
                CliError::PermissionDenied { message, help: text }
            }
            CliError::Conflict { message, .. } => CliError::Conflict { message, help: text },
            other => other,
        }
    }
}

impl From<CatalogError> for CliError {
    fn from(err: CatalogError) -> Self {
        let message = err.to_string();
        match err {
            CatalogError::InvalidKind { .. }
            | CatalogError::InvalidUrl { .. }
            | CatalogError::InvalidInput { .. }
            | CatalogError::InvalidOwnership { .. }
            | CatalogError::ImmutableFieldChanged { .. }
            | CatalogError::MetadataInvalid { .. } => CliError::input(message),
            CatalogError::NotFound { .. } | CatalogError::MetadataNotFound { .. } => {
                CliError::NotFound {
                    message,
                    help: None,
                }
            }
            CatalogError::PermissionDenied { .. }
            | CatalogError::OwnershipVerificationFailed { .. } => CliError::PermissionDenied {
                message,
                help: None,
            },
            CatalogError::NameConflict { .. } => CliError::Conflict {
                message,
                help: None,
            },
            CatalogError::TransportFailure { .. } => CliError::Transport { message },
            CatalogError::Canceled => CliError::Canceled,
            CatalogError::Io(_) => CliError::Io { message },
            CatalogError::Config { .. }
            | CatalogError::Storage { .. }
            | CatalogError::Serialization(_) => CliError::internal(message),
        }
    }
}

impl From<pkghub_core::CoreError> for CliError {
    fn from(err: pkghub_core::CoreError) -> Self {
        CliError::from(CatalogError::from(err))
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        CliError::Io {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for CliError {
    fn from(err: serde_json::Error) -> Self {
        CliError::internal(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, CliError>;
