//! Repository kind registry
//!
//! The set of kinds is closed, but every lookup goes through the registration
//! table below so that a new kind only needs a variant and a table row.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{CoreError, Result};

/// Content type of a repository
///
/// The discriminant is the persisted and serialized form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "i64", try_from = "i64")]
pub enum RepositoryKind {
    /// Helm charts
    Helm = 0,
    /// Falco rule sets
    Falco = 1,
    /// OPA policy bundles
    Opa = 2,
    /// OLM operator bundles
    Olm = 3,
}

/// Registry entry describing a repository kind
#[derive(Debug)]
pub struct KindInfo {
    pub kind: RepositoryKind,
    /// Canonical lowercase name
    pub name: &'static str,
    /// Human readable name
    pub display_name: &'static str,
    /// URL schemes accepted for repositories of this kind
    pub url_schemes: &'static [&'static str],
}

impl KindInfo {
    /// Whether repositories of this kind may live in an OCI registry
    pub fn supports_oci(&self) -> bool {
        self.url_schemes.contains(&"oci")
    }
}

const GIT_SCHEMES: &[&str] = &["https", "http", "git", "ssh"];
const GIT_OR_OCI_SCHEMES: &[&str] = &["https", "http", "git", "ssh", "oci"];

/// Registration table, indexed by discriminant
///
/// Name and discriminant lookups both read this table.
static KINDS: [KindInfo; 4] = [
    KindInfo {
        kind: RepositoryKind::Helm,
        name: "helm",
        display_name: "Helm charts",
        url_schemes: &["https", "http", "oci"],
    },
    KindInfo {
        kind: RepositoryKind::Falco,
        name: "falco",
        display_name: "Falco rules",
        url_schemes: GIT_SCHEMES,
    },
    KindInfo {
        kind: RepositoryKind::Opa,
        name: "opa",
        display_name: "OPA policies",
        url_schemes: GIT_SCHEMES,
    },
    KindInfo {
        kind: RepositoryKind::Olm,
        name: "olm",
        display_name: "OLM operators",
        url_schemes: GIT_OR_OCI_SCHEMES,
    },
];

impl RepositoryKind {
    /// Every registered kind, in discriminant order
    pub fn all() -> impl Iterator<Item = RepositoryKind> {
        KINDS.iter().map(|info| info.kind)
    }

    /// Registry entry for this kind
    pub fn info(self) -> &'static KindInfo {
        &KINDS[self as usize]
    }

    /// Canonical lowercase name
    pub fn name(self) -> &'static str {
        self.info().name
    }

    /// Look up a kind by its canonical name
    pub fn from_name(name: &str) -> Result<Self> {
        KINDS
            .iter()
            .find(|info| info.name == name)
            .map(|info| info.kind)
            .ok_or_else(|| CoreError::InvalidKind {
                name: name.to_string(),
            })
    }
}

/// Name of a persisted kind value, empty when the value is not registered
pub fn kind_name(raw: i64) -> &'static str {
    RepositoryKind::try_from(raw)
        .map(RepositoryKind::name)
        .unwrap_or("")
}

impl fmt::Display for RepositoryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for RepositoryKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_name(s)
    }
}

impl From<RepositoryKind> for i64 {
    fn from(kind: RepositoryKind) -> Self {
        kind as i64
    }
}

impl TryFrom<i64> for RepositoryKind {
    type Error = CoreError;

    fn try_from(raw: i64) -> Result<Self> {
        KINDS
            .iter()
            .find(|info| info.kind as i64 == raw)
            .map(|info| info.kind)
            .ok_or_else(|| CoreError::InvalidKind {
                name: raw.to_string(),
            })
    }
}
