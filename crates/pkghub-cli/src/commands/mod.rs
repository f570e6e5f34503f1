//! CLI commands

pub mod org;
pub mod repo;
pub mod user;

use pkghub_catalog::{HubConfig, RepositoryManager, RequestContext, SqliteStore};
use pkghub_transport::TransportRegistry;
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::error::{CliError, Result};

/// Catalog opened for one command invocation
pub struct Session {
    pub store: Arc<SqliteStore>,
    pub manager: RepositoryManager<SqliteStore>,
    pub ctx: RequestContext,
}

impl Session {
    /// Load configuration, open the catalog and resolve the acting user
    pub fn open(
        config_path: Option<&Path>,
        as_user: Option<&str>,
        cancel: CancellationToken,
    ) -> Result<Self> {
        let config = match config_path {
            Some(path) => HubConfig::load_from(path)?,
            None => HubConfig::load()?,
        };

        let db_path = config.database_path()?;
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        tracing::debug!(database = %db_path.display(), "opening catalog");
        let store = Arc::new(SqliteStore::open_at(&db_path)?);

        let mut ctx = RequestContext::anonymous().with_cancel(cancel);
        if let Some(alias) = as_user {
            let user = store.get_user_by_alias(alias)?.ok_or_else(|| {
                CliError::NotFound {
                    message: format!("User '{}' not found", alias),
                    help: Some(format!("Register it with 'pkghub user add {}'", alias)),
                }
            })?;
            ctx.user_id = Some(user.user_id);
        }

        let transports = Arc::new(TransportRegistry::standard(config.transport_options()));
        let manager = RepositoryManager::new(store.clone(), transports);

        Ok(Self {
            store,
            manager,
            ctx,
        })
    }

    /// Fail early with a hint when no acting user was given
    pub fn require_user(&self) -> Result<()> {
        if self.ctx.user_id.is_none() {
            return Err(CliError::PermissionDenied {
                message: "this command needs an acting user".to_string(),
                help: Some("Pass --as-user <alias> or set PKGHUB_USER".to_string()),
            });
        }
        Ok(())
    }
}
