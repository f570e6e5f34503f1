//! Organization management

use pkghub_catalog::{Organization, RepositoryStore};

use super::Session;
use crate::error::{CliError, Result};

/// Register an organization and make the acting user its first member
pub async fn add(session: &Session, name: &str, display_name: Option<&str>) -> Result<()> {
    session.require_user()?;
    if name.is_empty() {
        return Err(CliError::input("organization name must not be empty"));
    }

    let organization_id = match session.store.get_organization(name).await? {
        Some(existing) => existing.organization_id,
        None => name.to_string(),
    };
    session.store.upsert_organization(&Organization {
        organization_id: organization_id.clone(),
        name: name.to_string(),
        display_name: display_name.unwrap_or(name).to_string(),
    })?;

    if let Some(user_id) = &session.ctx.user_id {
        session.store.add_member(user_id, &organization_id)?;
    }

    println!("Organization '{}' registered", name);
    Ok(())
}

/// Add a user to an organization the acting user belongs to
pub async fn add_member(session: &Session, org: &str, alias: &str) -> Result<()> {
    session.require_user()?;

    let organization = session
        .store
        .get_organization(org)
        .await?
        .ok_or_else(|| CliError::NotFound {
            message: format!("Organization '{}' not found", org),
            help: Some(format!("Register it with 'pkghub org add {}'", org)),
        })?;

    let acting = session.ctx.user_id.as_deref().unwrap_or_default();
    if !session
        .store
        .is_member(acting, &organization.organization_id)
        .await?
    {
        return Err(CliError::PermissionDenied {
            message: format!("you are not a member of '{}'", org),
            help: None,
        });
    }

    let user = session
        .store
        .get_user_by_alias(alias)?
        .ok_or_else(|| CliError::NotFound {
            message: format!("User '{}' not found", alias),
            help: Some(format!("Register it with 'pkghub user add {}'", alias)),
        })?;
    session
        .store
        .add_member(&user.user_id, &organization.organization_id)?;

    println!("User '{}' added to organization '{}'", alias, org);
    Ok(())
}
