//! Repository metadata sidecar (`artifacthub-repo.yml`)
//!
//! Maintainers publish this file next to their packages to prove control of a
//! repository. It is read during ownership claims and never stored.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::error::{CoreError, Result};

/// Base name of the metadata sidecar, without extension
pub const REPOSITORY_METADATA_FILE: &str = "artifacthub-repo";

/// Extensions tried, in order, when the sidecar path has none
pub const METADATA_EXTENSIONS: [&str; 2] = ["yml", "yaml"];

/// A repository owner listed in the sidecar
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Owner {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
}

/// Metadata published by a repository's maintainers
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryMetadata {
    #[serde(rename = "repositoryID", default)]
    pub repository_id: String,

    #[serde(default)]
    pub owners: Vec<Owner>,
}

impl RepositoryMetadata {
    /// Parse and validate a sidecar document
    ///
    /// `source_name` is only used in error messages.
    pub fn from_yaml(content: &str, source_name: &str) -> Result<Self> {
        let md: RepositoryMetadata =
            serde_yaml::from_str(content).map_err(|e| CoreError::MetadataInvalid {
                source_name: source_name.to_string(),
                message: e.to_string(),
            })?;
        md.validate(source_name)?;
        Ok(md)
    }

    fn validate(&self, source_name: &str) -> Result<()> {
        if !self.repository_id.is_empty() && Uuid::parse_str(&self.repository_id).is_err() {
            return Err(CoreError::MetadataInvalid {
                source_name: source_name.to_string(),
                message: format!("repositoryID '{}' is not a valid id", self.repository_id),
            });
        }
        if let Some(idx) = self.owners.iter().position(|o| o.email.trim().is_empty()) {
            return Err(CoreError::MetadataInvalid {
                source_name: source_name.to_string(),
                message: format!("owner #{} has no email", idx + 1),
            });
        }
        Ok(())
    }

    /// Check whether an email appears among the owners (case-insensitive)
    pub fn has_owner_email(&self, email: &str) -> bool {
        let email = email.trim();
        !email.is_empty()
            && self
                .owners
                .iter()
                .any(|o| o.email.trim().eq_ignore_ascii_case(email))
    }
}

/// Read the metadata sidecar at `md_file`
///
/// The path is tried as given and then with the `.yml` and `.yaml` extensions.
pub fn get_metadata(md_file: &Path) -> Result<RepositoryMetadata> {
    let path = candidates(md_file)
        .into_iter()
        .find(|p| p.is_file())
        .ok_or_else(|| CoreError::MetadataNotFound {
            path: md_file.display().to_string(),
        })?;

    let content = std::fs::read_to_string(&path)?;
    RepositoryMetadata::from_yaml(&content, &path.display().to_string())
}

fn candidates(md_file: &Path) -> Vec<PathBuf> {
    let mut paths = vec![md_file.to_path_buf()];
    for ext in METADATA_EXTENSIONS {
        let mut name = md_file.as_os_str().to_owned();
        name.push(".");
        name.push(ext);
        paths.push(PathBuf::from(name));
    }
    paths
}
