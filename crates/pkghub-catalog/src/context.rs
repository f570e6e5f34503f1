//! Per-request caller identity and cancellation

use tokio_util::sync::CancellationToken;

use crate::error::{CatalogError, Result};

/// Context passed to every manager operation
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    /// Authenticated caller, if any
    pub user_id: Option<String>,
    /// Aborts in-flight fetches
    pub cancel: CancellationToken,
}

impl RequestContext {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn for_user(user_id: impl Into<String>) -> Self {
        Self {
            user_id: Some(user_id.into()),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// The caller's id, required by every mutation
    pub fn require_user(&self) -> Result<&str> {
        self.user_id
            .as_deref()
            .filter(|id| !id.is_empty())
            .ok_or_else(|| CatalogError::permission_denied("an authenticated user is required"))
    }
}
