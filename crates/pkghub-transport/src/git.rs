//! Git-style repository cloning
//!
//! Repository URLs may point inside a remote, e.g.
//! `https://github.com/org/repo/path/to/rules#main` is cloned from
//! `https://github.com/org/repo` on branch `main`, with packages in
//! `path/to/rules`.

use async_trait::async_trait;
use pkghub_core::{REPOSITORY_METADATA_FILE, Repository, RepositoryMetadata, get_metadata};
use std::path::Path;
use std::process::Stdio;
use tokio::io::AsyncReadExt;
use tokio::process::Child;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::error::{Result, TransportError};
use crate::strategy::{ClonedRepository, Cloner, MetadataFetcher, discard};
use crate::transport::{Transport, TransportOptions};

/// Hosts where the first two path segments name the remote
const KNOWN_HOSTS: [&str; 3] = ["github.com", "gitlab.com", "bitbucket.org"];

/// A repository URL split into remote, branch and packages path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitRemote {
    /// URL passed to `git clone`
    pub url: String,
    /// Branch to check out, default branch if unset
    pub branch: Option<String>,
    /// Path of the packages inside the clone, empty for the root
    pub packages_path: String,
}

impl GitRemote {
    pub fn parse(repo_url: &str) -> Result<Self> {
        let invalid = |reason: &str| TransportError::InvalidUrl {
            url: repo_url.to_string(),
            reason: reason.to_string(),
        };

        let mut url = Url::parse(repo_url).map_err(|e| invalid(&e.to_string()))?;
        if !matches!(url.scheme(), "https" | "http" | "git" | "ssh") {
            return Err(invalid("unsupported scheme for a git remote"));
        }

        let branch = url.fragment().filter(|f| !f.is_empty()).map(String::from);
        url.set_fragment(None);

        let segments: Vec<String> = url
            .path_segments()
            .map(|s| s.filter(|p| !p.is_empty()).map(String::from).collect())
            .unwrap_or_default();

        let host = url.host_str().unwrap_or_default().to_lowercase();
        let split_at = if KNOWN_HOSTS.contains(&host.as_str()) {
            if segments.len() < 2 {
                return Err(invalid("expected <owner>/<repository> in the path"));
            }
            2
        } else {
            segments
                .iter()
                .position(|s| s.ends_with(".git"))
                .map(|i| i + 1)
                .unwrap_or(segments.len())
        };

        let (remote_path, packages) = segments.split_at(split_at);
        url.set_path(&remote_path.join("/"));

        Ok(Self {
            url: url.to_string(),
            branch,
            packages_path: packages.join("/"),
        })
    }

    /// Remote URL with the repository credentials embedded, when it is private
    fn authenticated_url(&self, repo: &Repository) -> Result<String> {
        if !repo.private || !repo.has_credentials() {
            return Ok(self.url.clone());
        }
        let mut url = Url::parse(&self.url)?;
        if matches!(url.scheme(), "https" | "http") {
            let invalid = || TransportError::InvalidUrl {
                url: self.url.clone(),
                reason: "cannot embed credentials".to_string(),
            };
            url.set_username(&repo.auth_user).map_err(|_| invalid())?;
            url.set_password(Some(&repo.auth_pass))
                .map_err(|_| invalid())?;
        }
        Ok(url.to_string())
    }
}

/// Clones Git repositories with the `git` executable
pub struct GitCloner {
    options: TransportOptions,
}

impl GitCloner {
    pub fn new(options: TransportOptions) -> Self {
        Self { options }
    }

    async fn clone_into(
        &self,
        cancel: &CancellationToken,
        repo: &Repository,
        remote: &GitRemote,
        dest: &Path,
    ) -> Result<()> {
        if cancel.is_cancelled() {
            return Err(TransportError::Canceled);
        }

        let mut cmd = tokio::process::Command::new(&self.options.git_binary);
        cmd.arg("clone").arg("--depth").arg("1").arg("--quiet");
        if let Some(branch) = &remote.branch {
            cmd.arg("--branch").arg(branch);
        }
        cmd.arg(remote.authenticated_url(repo)?)
            .arg(dest)
            .env("GIT_TERMINAL_PROMPT", "0")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        #[cfg(unix)]
        cmd.process_group(0);

        tracing::debug!(repository = %repo.name, remote = %remote.url, "cloning git repository");
        let mut child = cmd.spawn()?;
        let mut stderr = child.stderr.take();

        let finished = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            res = async {
                let mut captured = Vec::new();
                if let Some(pipe) = stderr.as_mut() {
                    pipe.read_to_end(&mut captured).await?;
                }
                let status = child.wait().await?;
                Ok::<_, std::io::Error>((status, captured))
            } => Some(res),
        };
        let Some(finished) = finished else {
            terminate(&mut child).await;
            return Err(TransportError::Canceled);
        };
        let (status, stderr) = finished?;

        if !status.success() {
            let mut message = String::from_utf8_lossy(&stderr).trim().to_string();
            if !repo.auth_pass.is_empty() {
                message = message.replace(&repo.auth_pass, "***");
            }
            return Err(TransportError::GitFailed {
                url: remote.url.clone(),
                message,
            });
        }
        Ok(())
    }
}

/// Kill a canceled `git` together with the helpers it forked, then reap it
///
/// The clone directory may only be removed once this returns.
async fn terminate(child: &mut Child) {
    #[cfg(unix)]
    {
        if let Some(pid) = child.id() {
            // git leads its own process group
            unsafe {
                libc::killpg(pid as libc::pid_t, libc::SIGKILL);
            }
        }
    }
    if let Err(e) = child.start_kill() {
        tracing::debug!(error = %e, "git process already exited");
    }
    if let Err(e) = child.wait().await {
        tracing::warn!(error = %e, "failed to reap canceled git process");
    }
}

#[async_trait]
impl Cloner for GitCloner {
    fn transport(&self) -> Transport {
        Transport::Git
    }

    async fn clone_repository(
        &self,
        cancel: &CancellationToken,
        repo: &Repository,
    ) -> Result<ClonedRepository> {
        let remote = GitRemote::parse(&repo.url)?;
        let tmp = self.options.create_temp_dir()?;

        if let Err(e) = self.clone_into(cancel, repo, &remote, tmp.path()).await {
            discard(tmp);
            return Err(e);
        }

        let packages_path = if remote.packages_path.is_empty() {
            tmp.path().to_path_buf()
        } else {
            tmp.path().join(&remote.packages_path)
        };
        if !packages_path.is_dir() {
            discard(tmp);
            return Err(TransportError::PackagesPathNotFound {
                url: remote.url,
                path: remote.packages_path,
            });
        }

        Ok(ClonedRepository::new(tmp, packages_path))
    }
}

#[async_trait]
impl MetadataFetcher for GitCloner {
    fn transport(&self) -> Transport {
        Transport::Git
    }

    async fn fetch_metadata(
        &self,
        cancel: &CancellationToken,
        repo: &Repository,
    ) -> Result<RepositoryMetadata> {
        let cloned = self.clone_repository(cancel, repo).await?;
        let md = get_metadata(&cloned.packages_path().join(REPOSITORY_METADATA_FILE))?;
        Ok(md)
    }
}
