//! Content digests for change detection between sync passes

use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::Path;
use walkdir::WalkDir;

use crate::error::{Result, TransportError};

/// Compute SHA256 digest of data
pub fn compute_digest(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("sha256:{}", hex::encode(hasher.finalize()))
}

/// Digest of a directory tree
///
/// Covers relative file paths and contents, visited in sorted order, so the
/// value only depends on what is in the tree. `.git` directories are skipped.
pub fn directory_digest(dir: &Path) -> Result<String> {
    let mut hasher = Sha256::new();

    let walker = WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.file_name() != ".git");

    for entry in walker {
        let entry = entry.map_err(|e| TransportError::Io(e.into()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let rel = entry
            .path()
            .strip_prefix(dir)
            .unwrap_or(entry.path())
            .to_string_lossy()
            .replace('\\', "/");
        hasher.update(rel.as_bytes());
        hasher.update([0u8]);
        hasher.update(std::fs::read(entry.path())?);
        hasher.update([0u8]);
    }

    Ok(format!("sha256:{}", hex::encode(hasher.finalize())))
}

/// Digest of every package directory directly under `root`
///
/// Keys are directory names; hidden directories are ignored.
pub fn packages_digest_from_dir(root: &Path) -> Result<HashMap<String, String>> {
    let mut digests = HashMap::new();

    for entry in std::fs::read_dir(root)? {
        let entry = entry?;
        let path = entry.path();
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with('.') || !path.is_dir() {
            continue;
        }
        digests.insert(name, directory_digest(&path)?);
    }

    Ok(digests)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_compute_digest() {
        let digest = compute_digest(b"hello world");
        assert!(digest.starts_with("sha256:"));
        assert_eq!(digest.len(), 7 + 64);
    }

    #[test]
    fn test_directory_digest_tracks_content() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("rules")).unwrap();
        std::fs::write(dir.path().join("rules/a.yaml"), "a: 1").unwrap();

        let first = directory_digest(dir.path()).unwrap();
        assert_eq!(first, directory_digest(dir.path()).unwrap());

        std::fs::write(dir.path().join("rules/a.yaml"), "a: 2").unwrap();
        let second = directory_digest(dir.path()).unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn test_directory_digest_ignores_git_dir() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("policy.rego"), "package x").unwrap();
        let before = directory_digest(dir.path()).unwrap();

        std::fs::create_dir_all(dir.path().join(".git")).unwrap();
        std::fs::write(dir.path().join(".git/HEAD"), "ref: main").unwrap();
        assert_eq!(before, directory_digest(dir.path()).unwrap());
    }

    #[test]
    fn test_packages_digest_from_dir() {
        let dir = TempDir::new().unwrap();
        for pkg in ["alpha", "beta", ".hidden"] {
            std::fs::create_dir_all(dir.path().join(pkg)).unwrap();
            std::fs::write(dir.path().join(pkg).join("README.md"), pkg).unwrap();
        }
        std::fs::write(dir.path().join("artifacthub-repo.yml"), "owners: []").unwrap();

        let digests = packages_digest_from_dir(dir.path()).unwrap();
        let mut keys: Vec<_> = digests.keys().cloned().collect();
        keys.sort();
        assert_eq!(keys, vec!["alpha", "beta"]);
        assert_ne!(digests["alpha"], digests["beta"]);
    }
}
