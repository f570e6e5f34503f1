//! User registration

use pkghub_catalog::User;

use super::Session;
use crate::error::{CliError, Result};

/// Register a user, or update the email of an existing one
pub fn add(session: &Session, alias: &str, email: &str, id: Option<&str>) -> Result<()> {
    if alias.is_empty() || email.is_empty() {
        return Err(CliError::input("alias and email must not be empty"));
    }

    let user_id = match (id, session.store.get_user_by_alias(alias)?) {
        (Some(id), _) => id.to_string(),
        (None, Some(existing)) => existing.user_id,
        (None, None) => alias.to_string(),
    };

    session.store.upsert_user(&User {
        user_id: user_id.clone(),
        alias: alias.to_string(),
        email: email.to_string(),
    })?;

    println!("User '{}' registered (id: {})", alias, user_id);
    Ok(())
}
