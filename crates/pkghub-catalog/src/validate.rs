//! Input checks shared by add and update

use pkghub_core::{OCI_PREFIX, RepositoryKind, validate_name};
use url::Url;

use crate::error::{CatalogError, Result};

/// Check the user-editable fields of a repository
pub fn validate_fields(
    kind: RepositoryKind,
    name: &str,
    url: &str,
    private: bool,
    has_credentials: bool,
) -> Result<()> {
    validate_name(name)?;
    validate_url(kind, url)?;
    if has_credentials && !private && !url.starts_with(OCI_PREFIX) {
        return Err(CatalogError::InvalidInput {
            message: "credentials can only be set on private or OCI repositories".to_string(),
        });
    }
    Ok(())
}

/// Check that `url` parses and uses a scheme accepted for `kind`
pub fn validate_url(kind: RepositoryKind, url: &str) -> Result<()> {
    let invalid = |reason: String| CatalogError::InvalidUrl {
        url: url.to_string(),
        reason,
    };

    let parsed = Url::parse(url).map_err(|e| invalid(e.to_string()))?;
    let schemes = kind.info().url_schemes;
    if !schemes.contains(&parsed.scheme()) {
        return Err(invalid(format!(
            "scheme '{}' is not supported for {} repositories (expected one of: {})",
            parsed.scheme(),
            kind,
            schemes.join(", ")
        )));
    }
    if parsed.host_str().is_none_or(str::is_empty) {
        return Err(invalid("missing host".to_string()));
    }
    Ok(())
}
