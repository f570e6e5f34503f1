//! Repository credentials and the HTTP client that carries them
//!
//! Credentials stored on a catalog record are only ever sent to the origin
//! of that record's URL. Redirects are followed by hand so a hop to another
//! host drops the `Authorization` header.

use pkghub_core::Repository;
use std::time::Duration;
use url::Url;

use crate::error::{Result, TransportError};

const MAX_REDIRECTS: u32 = 10;

/// Basic credentials bound to the origin of a repository URL
#[derive(Clone)]
pub struct RepositoryAuth {
    origin: Url,
    username: String,
    password: String,
}

impl std::fmt::Debug for RepositoryAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RepositoryAuth")
            .field("origin", &self.origin.origin().ascii_serialization())
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl RepositoryAuth {
    /// Credentials of a catalog record, if it carries any
    pub fn from_repository(repo: &Repository) -> Option<Self> {
        if !repo.has_credentials() {
            return None;
        }
        let origin = Url::parse(&repo.url).ok()?;
        Some(Self {
            origin,
            username: repo.auth_user.clone(),
            password: repo.auth_pass.clone(),
        })
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    /// Whether `url` shares scheme, host and port with the repository URL
    pub fn applies_to(&self, url: &Url) -> bool {
        self.origin.origin() == url.origin()
    }

    /// `Authorization` header value
    pub fn header_value(&self) -> String {
        let encoded = base64::Engine::encode(
            &base64::engine::general_purpose::STANDARD,
            format!("{}:{}", self.username, self.password),
        );
        format!("Basic {}", encoded)
    }
}

/// HTTP client that never leaks credentials across origins
pub struct SecureHttpClient {
    client: reqwest::Client,
    auth: Option<RepositoryAuth>,
    timeout: Duration,
}

impl SecureHttpClient {
    pub fn new(auth: Option<RepositoryAuth>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::NetworkError {
                message: e.to_string(),
            })?;
        Ok(Self {
            client,
            auth,
            timeout,
        })
    }

    /// Client for one repository, authenticated when the record has credentials
    pub fn for_repository(repo: &Repository, timeout: Duration) -> Result<Self> {
        Self::new(RepositoryAuth::from_repository(repo), timeout)
    }

    /// GET `url`, following redirects and mapping error statuses
    pub async fn get(&self, url: &str) -> Result<reqwest::Response> {
        let mut target = Url::parse(url).map_err(|e| TransportError::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        for _ in 0..=MAX_REDIRECTS {
            let mut request = self.client.get(target.clone());
            match &self.auth {
                Some(auth) if auth.applies_to(&target) => {
                    request = request.header(reqwest::header::AUTHORIZATION, auth.header_value());
                }
                Some(_) => {
                    tracing::warn!(%target, "redirected to another origin, credentials dropped");
                }
                None => {}
            }

            let response = request.send().await.map_err(|e| self.send_error(e))?;
            let status = response.status();

            if status.is_redirection() {
                let location = response
                    .headers()
                    .get(reqwest::header::LOCATION)
                    .and_then(|v| v.to_str().ok())
                    .ok_or_else(|| TransportError::NetworkError {
                        message: format!("redirect from {} without Location header", target),
                    })?;
                target = target.join(location)?;
                continue;
            }

            return match status {
                reqwest::StatusCode::UNAUTHORIZED => Err(TransportError::AuthRequired {
                    url: target.to_string(),
                }),
                reqwest::StatusCode::FORBIDDEN => Err(TransportError::AuthFailed {
                    message: format!("access denied to {}", target),
                }),
                s if !s.is_success() => Err(TransportError::HttpError {
                    status: s.as_u16(),
                    message: format!("GET {} failed", target),
                }),
                _ => Ok(response),
            };
        }

        Err(TransportError::NetworkError {
            message: format!("too many redirects (max {})", MAX_REDIRECTS),
        })
    }

    /// GET `url` and read the whole body
    pub async fn get_bytes(&self, url: &str) -> Result<Vec<u8>> {
        let response = self.get(url).await?;
        let body = response.bytes().await.map_err(|e| self.send_error(e))?;
        Ok(body.to_vec())
    }

    fn send_error(&self, e: reqwest::Error) -> TransportError {
        if e.is_timeout() {
            TransportError::Timeout {
                seconds: self.timeout.as_secs(),
            }
        } else {
            e.into()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pkghub_core::{NewRepository, OwnerScope, RepositoryId, RepositoryKind};

    fn private_repo(url: &str) -> Repository {
        let mut new = NewRepository::new("private", RepositoryKind::Helm, url);
        new.private = true;
        new.auth_user = "user".to_string();
        new.auth_pass = "pass".to_string();
        new.into_repository(RepositoryId::new(), OwnerScope::user("u1", "alice"))
    }

    #[test]
    fn test_auth_scoped_to_origin() {
        let repo = private_repo("https://charts.example.com/stable");
        let auth = RepositoryAuth::from_repository(&repo).unwrap();

        let same = Url::parse("https://charts.example.com:443/other/index.yaml").unwrap();
        let other_host = Url::parse("https://cdn.example.com/index.yaml").unwrap();
        let other_scheme = Url::parse("http://charts.example.com/index.yaml").unwrap();
        assert!(auth.applies_to(&same));
        assert!(!auth.applies_to(&other_host));
        assert!(!auth.applies_to(&other_scheme));
    }

    #[test]
    fn test_header_value() {
        let auth = RepositoryAuth::from_repository(&private_repo("https://charts.example.com"))
            .unwrap();
        assert_eq!(auth.header_value(), "Basic dXNlcjpwYXNz");
        assert!(!format!("{:?}", auth).contains("pass\""));
    }

    #[test]
    fn test_no_credentials() {
        let repo = private_repo("https://charts.example.com").without_credentials();
        assert!(RepositoryAuth::from_repository(&repo).is_none());
    }
}
