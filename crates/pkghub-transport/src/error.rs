//! Error types for transport operations

use pkghub_core::CoreError;
use thiserror::Error;

/// Transport operation errors
#[derive(Debug, Error)]
pub enum TransportError {
    // ============ Selection Errors ============
    #[error("Invalid repository URL: {url} - {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("No {capability} registered for {kind} repositories over {transport}")]
    CapabilityUnavailable {
        kind: String,
        transport: String,
        capability: &'static str,
    },

    // ============ Network Errors ============
    #[error("HTTP error: {status} - {message}")]
    HttpError { status: u16, message: String },

    #[error("Network error: {message}")]
    NetworkError { message: String },

    #[error("Request timeout after {seconds}s")]
    Timeout { seconds: u64 },

    // ============ Authentication Errors ============
    #[error("Authentication required for {url}")]
    AuthRequired { url: String },

    #[error("Authentication failed: {message}")]
    AuthFailed { message: String },

    // ============ Git Errors ============
    #[error("git clone of {url} failed: {message}")]
    GitFailed { url: String, message: String },

    #[error("Packages path '{path}' not found in {url}")]
    PackagesPathNotFound { url: String, path: String },

    // ============ Index Errors ============
    #[error("Index not found at {url}")]
    IndexNotFound { url: String },

    #[error("Index parse error: {message}")]
    IndexParseError { message: String },

    // ============ OCI Errors ============
    #[error("OCI registry error: {message}")]
    OciError { message: String },

    #[error("Invalid OCI reference: {reference}")]
    InvalidOciReference { reference: String },

    #[error("OCI manifest not found: {reference}")]
    OciManifestNotFound { reference: String },

    // ============ Content Errors ============
    #[error(transparent)]
    Metadata(#[from] CoreError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    // ============ Other ============
    #[error("Operation canceled")]
    Canceled,
}

/// Result type for transport operations
pub type Result<T> = std::result::Result<T, TransportError>;

impl TransportError {
    pub fn is_canceled(&self) -> bool {
        matches!(self, TransportError::Canceled)
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            TransportError::Timeout { seconds: 30 }
        } else if e.is_connect() {
            TransportError::NetworkError {
                message: format!("Connection failed: {}", e),
            }
        } else if let Some(status) = e.status() {
            TransportError::HttpError {
                status: status.as_u16(),
                message: e.to_string(),
            }
        } else {
            TransportError::NetworkError {
                message: e.to_string(),
            }
        }
    }
}

impl From<serde_yaml::Error> for TransportError {
    fn from(e: serde_yaml::Error) -> Self {
        TransportError::Serialization(e.to_string())
    }
}

impl From<url::ParseError> for TransportError {
    fn from(e: url::ParseError) -> Self {
        TransportError::InvalidUrl {
            url: String::new(),
            reason: e.to_string(),
        }
    }
}
