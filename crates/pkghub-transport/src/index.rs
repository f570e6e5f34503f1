//! Helm repository index types
//!
//! Only the fields the catalog needs for change detection are modelled.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::digest::compute_digest;
use crate::error::{Result, TransportError};

/// Helm repository index (`index.yaml`)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexFile {
    /// API version
    #[serde(default = "default_api_version")]
    pub api_version: String,

    /// When this index was generated
    #[serde(default)]
    pub generated: Option<DateTime<Utc>>,

    /// Chart versions indexed by chart name
    #[serde(default)]
    pub entries: HashMap<String, Vec<ChartVersion>>,
}

fn default_api_version() -> String {
    "v1".to_string()
}

impl Default for IndexFile {
    fn default() -> Self {
        Self {
            api_version: default_api_version(),
            generated: None,
            entries: HashMap::new(),
        }
    }
}

impl IndexFile {
    /// Parse index from YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(|e| TransportError::IndexParseError {
            message: e.to_string(),
        })
    }

    /// Parse index from bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let yaml = std::str::from_utf8(bytes).map_err(|e| TransportError::IndexParseError {
            message: format!("Invalid UTF-8: {}", e),
        })?;
        Self::from_yaml(yaml)
    }

    /// Digest of every chart version, keyed by `<chart>@<version>`
    pub fn packages_digest(&self) -> HashMap<String, String> {
        self.entries
            .values()
            .flatten()
            .map(|cv| (cv.package_key(), cv.content_digest()))
            .collect()
    }
}

/// A chart version listed in the index
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartVersion {
    pub name: String,

    pub version: String,

    #[serde(default)]
    pub app_version: Option<String>,

    #[serde(default)]
    pub description: Option<String>,

    /// URLs to download the chart archive
    #[serde(default)]
    pub urls: Vec<String>,

    /// SHA256 digest of the archive
    #[serde(default)]
    pub digest: Option<String>,

    #[serde(default)]
    pub created: Option<DateTime<Utc>>,

    #[serde(default)]
    pub deprecated: bool,
}

impl ChartVersion {
    /// Key identifying this chart version across sync passes
    pub fn package_key(&self) -> String {
        format!("{}@{}", self.name, self.version)
    }

    /// Published digest, or one derived from the entry when the index has none
    pub fn content_digest(&self) -> String {
        match &self.digest {
            Some(d) if !d.is_empty() => d.clone(),
            _ => {
                let created = self.created.map(|c| c.to_rfc3339()).unwrap_or_default();
                let fingerprint = format!(
                    "{}\n{}\n{}\n{}",
                    self.name,
                    self.version,
                    created,
                    self.urls.join(",")
                );
                compute_digest(fingerprint.as_bytes())
            }
        }
    }
}
