//! Hub configuration
//!
//! Stored in `~/.config/pkghub/config.yaml`. Every field is optional.

use pkghub_transport::{OciProtocol, TransportOptions};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{CatalogError, Result};

/// Configuration file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HubConfig {
    /// Catalog database (default: `~/.local/share/pkghub/catalog.db`)
    pub database: Option<PathBuf>,

    /// Directory for temporary clones (default: system temp dir)
    pub temp_dir: Option<PathBuf>,

    pub git_binary: PathBuf,

    /// HTTP timeout in seconds
    pub http_timeout: u64,

    pub oci_protocol: OciProtocol,

    /// Tags pulled per OCI chart repository in a tracking pass
    pub max_oci_tags: usize,
}

impl Default for HubConfig {
    fn default() -> Self {
        let transport = TransportOptions::default();
        Self {
            database: None,
            temp_dir: None,
            git_binary: transport.git_binary,
            http_timeout: transport.http_timeout.as_secs(),
            oci_protocol: transport.oci_protocol,
            max_oci_tags: transport.max_oci_tags,
        }
    }
}

impl HubConfig {
    /// Load configuration from the default location, or defaults if absent
    pub fn load() -> Result<Self> {
        let path = Self::default_path()?;
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        serde_yaml::from_str(&content).map_err(|e| CatalogError::Config {
            message: format!("{}: {}", path.display(), e),
        })
    }

    /// Save configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_yaml::to_string(self)?)?;
        Ok(())
    }

    /// Get default configuration path
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().ok_or_else(|| CatalogError::Config {
            message: "Could not determine config directory".to_string(),
        })?;
        Ok(config_dir.join("pkghub").join("config.yaml"))
    }

    /// Catalog database path, explicit or default
    pub fn database_path(&self) -> Result<PathBuf> {
        if let Some(path) = &self.database {
            return Ok(path.clone());
        }
        let data_dir = dirs::data_dir().ok_or_else(|| CatalogError::Config {
            message: "Could not determine data directory".to_string(),
        })?;
        Ok(data_dir.join("pkghub").join("catalog.db"))
    }

    pub fn transport_options(&self) -> TransportOptions {
        TransportOptions {
            temp_root: self.temp_dir.clone(),
            git_binary: self.git_binary.clone(),
            http_timeout: Duration::from_secs(self.http_timeout),
            oci_protocol: self.oci_protocol,
            max_oci_tags: self.max_oci_tags,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "httpTimeout: 5\nociProtocol: http\n").unwrap();

        let config = HubConfig::load_from(&path).unwrap();
        assert_eq!(config.http_timeout, 5);
        assert_eq!(config.oci_protocol, OciProtocol::Http);
        assert_eq!(config.git_binary, PathBuf::from("git"));
        assert_eq!(config.max_oci_tags, 50);

        let options = config.transport_options();
        assert_eq!(options.http_timeout, Duration::from_secs(5));
        assert!(options.temp_root.is_none());
    }

    #[test]
    fn test_save_and_reload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested/config.yaml");
        let config = HubConfig {
            database: Some(dir.path().join("catalog.db")),
            max_oci_tags: 10,
            ..Default::default()
        };
        config.save_to(&path).unwrap();
        assert_eq!(HubConfig::load_from(&path).unwrap(), config);
        assert_eq!(
            config.database_path().unwrap(),
            dir.path().join("catalog.db")
        );
    }

    #[test]
    fn test_invalid_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "httpTimeout: soon\n").unwrap();
        assert!(matches!(
            HubConfig::load_from(&path),
            Err(CatalogError::Config { .. })
        ));
    }
}
