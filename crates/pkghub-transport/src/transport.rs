//! Transport detection and shared options

use pkghub_core::OCI_PREFIX;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use tempfile::TempDir;

use crate::error::Result;

/// Protocol family used to fetch a repository's bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    /// Git remote, or plain HTTP for Helm index repositories
    Git,
    /// OCI-compliant registry
    Oci,
}

impl Transport {
    /// Detect the transport from a repository URL
    ///
    /// The `oci://` prefix is the only signal; everything else is Git-style.
    pub fn detect(url: &str) -> Self {
        if url.starts_with(OCI_PREFIX) {
            Transport::Oci
        } else {
            Transport::Git
        }
    }
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Transport::Git => f.write_str("git"),
            Transport::Oci => f.write_str("oci"),
        }
    }
}

/// Protocol used to talk to OCI registries
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OciProtocol {
    #[default]
    Https,
    /// Plain HTTP, for local registries
    Http,
}

/// Settings shared by all transport strategies
#[derive(Debug, Clone)]
pub struct TransportOptions {
    /// Directory under which temporary clones are created (system temp dir if unset)
    pub temp_root: Option<PathBuf>,
    /// Git executable
    pub git_binary: PathBuf,
    /// Timeout for HTTP requests
    pub http_timeout: Duration,
    pub oci_protocol: OciProtocol,
    /// Maximum number of tags pulled when cloning an OCI chart repository
    pub max_oci_tags: usize,
}

impl Default for TransportOptions {
    fn default() -> Self {
        Self {
            temp_root: None,
            git_binary: PathBuf::from("git"),
            http_timeout: Duration::from_secs(30),
            oci_protocol: OciProtocol::Https,
            max_oci_tags: 50,
        }
    }
}

impl TransportOptions {
    /// Create a fresh, empty temporary directory for a fetch
    pub fn create_temp_dir(&self) -> Result<TempDir> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("pkghub-");
        let dir = match &self.temp_root {
            Some(root) => {
                std::fs::create_dir_all(root)?;
                builder.tempdir_in(root)?
            }
            None => builder.tempdir()?,
        };
        Ok(dir)
    }
}
