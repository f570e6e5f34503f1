//! Repository management commands

use console::style;
use pkghub_catalog::{SyncReport, Tracker};
use pkghub_core::{NewRepository, Repository, RepositoryKind, RepositoryRecord};

use super::Session;
use crate::error::{CliError, Result};

/// Options for `repo add`
pub struct AddOptions<'a> {
    pub name: &'a str,
    pub url: &'a str,
    pub kind: &'a str,
    pub display_name: Option<&'a str>,
    pub org: Option<&'a str>,
    pub private: bool,
    pub username: Option<&'a str>,
    pub password: Option<&'a str>,
}

/// Options for `repo update`; unset fields keep their stored value
pub struct UpdateOptions<'a> {
    pub name: &'a str,
    pub url: Option<&'a str>,
    pub display_name: Option<&'a str>,
    pub private: Option<bool>,
    pub username: Option<&'a str>,
    pub password: Option<&'a str>,
}

fn parse_kind(kind: &str) -> Result<RepositoryKind> {
    kind.parse::<RepositoryKind>().map_err(|e| {
        let valid: Vec<&str> = RepositoryKind::all().map(RepositoryKind::name).collect();
        CliError::from(e).with_help(format!("Valid kinds: {}", valid.join(", ")))
    })
}

fn owner_label(record: &RepositoryRecord) -> String {
    match (&record.organization_name, &record.user_alias) {
        (Some(org), _) => format!("org:{}", org),
        (None, Some(alias)) => alias.clone(),
        (None, None) => "-".to_string(),
    }
}

/// Register a repository
pub async fn add(session: &Session, opts: AddOptions<'_>) -> Result<()> {
    session.require_user()?;

    let mut new = NewRepository::new(opts.name, parse_kind(opts.kind)?, opts.url);
    new.display_name = opts.display_name.unwrap_or_default().to_string();
    new.private = opts.private;
    new.auth_user = opts.username.unwrap_or_default().to_string();
    new.auth_pass = opts.password.unwrap_or_default().to_string();

    let repo = session.manager.add(&session.ctx, opts.org, new).await?;

    let transport = if repo.is_oci() { "OCI" } else { "HTTP/Git" };
    println!(
        "\"{}\" has been added to the catalog ({}, {})",
        repo.name,
        repo.kind,
        transport
    );
    println!("  ID: {}", repo.repository_id);
    println!();
    println!("Run 'pkghub repo track {}' to fetch its packages", repo.name);

    Ok(())
}

/// Scope of `repo list`
pub enum ListScope<'a> {
    All,
    Kind(&'a str),
    Org(&'a str),
    Mine,
}

/// List repositories
pub async fn list(
    session: &Session,
    scope: ListScope<'_>,
    json: bool,
    show_auth: bool,
) -> Result<()> {
    let manager = &session.manager;
    let ctx = &session.ctx;

    let payload = match scope {
        ListScope::All => manager.get_all_json(ctx, show_auth).await?,
        ListScope::Kind(kind) => {
            manager
                .get_by_kind_json(ctx, parse_kind(kind)?, show_auth)
                .await?
        }
        ListScope::Org(org) => {
            session.require_user()?;
            manager.get_owned_by_org_json(ctx, org, show_auth).await?
        }
        ListScope::Mine => {
            session.require_user()?;
            manager.get_owned_by_user_json(ctx, show_auth).await?
        }
    };

    if json {
        println!("{}", payload);
        return Ok(());
    }

    let records: Vec<RepositoryRecord> = serde_json::from_str(&payload)?;
    if records.is_empty() {
        println!("No repositories found.");
        return Ok(());
    }

    println!(
        "{:<24} {:<6} {:<16} {:<8} URL",
        "NAME", "KIND", "OWNER", "STATUS"
    );
    for record in &records {
        let status = if !record.last_tracking_errors.is_empty() {
            style(format!("{:<8}", "failing")).red().to_string()
        } else if record.verified_publisher {
            style(format!("{:<8}", "verified")).green().to_string()
        } else {
            format!("{:<8}", "-")
        };
        let auth = if show_auth && !record.auth_user.is_empty() {
            format!(" (user: {})", record.auth_user)
        } else {
            String::new()
        };
        println!(
            "{:<24} {:<6} {:<16} {} {}{}",
            record.name,
            record.kind.name(),
            owner_label(record),
            status,
            record.url,
            auth
        );
    }

    Ok(())
}

/// Show one repository
pub async fn show(session: &Session, name: &str, json: bool, show_auth: bool) -> Result<()> {
    let repo = session
        .manager
        .get_by_name(&session.ctx, name, show_auth)
        .await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&repo)?);
        return Ok(());
    }

    println!("{}", style(&repo.name).cyan().bold());
    println!("  ID:       {}", repo.repository_id);
    if !repo.display_name.is_empty() {
        println!("  Display:  {}", repo.display_name);
    }
    println!("  Kind:     {}", repo.kind);
    println!("  URL:      {}", repo.url);
    println!("  Owner:    {}", repo.owner);
    println!("  Private:  {}", repo.private);
    if show_auth && repo.has_credentials() {
        println!("  Username: {}", repo.auth_user);
        println!("  Password: {}", repo.auth_pass);
    }
    if repo.verified_publisher {
        println!("  {} verified publisher", style("✓").green());
    }
    if repo.official {
        println!("  {} official", style("✓").green());
    }
    if !repo.last_tracking_errors.is_empty() {
        println!("  {} last tracking errors:", style("✗").red());
        for line in repo.last_tracking_errors.lines() {
            println!("    {}", line);
        }
    }

    Ok(())
}

/// Change the user-editable fields of a repository
pub async fn update(session: &Session, opts: UpdateOptions<'_>) -> Result<()> {
    session.require_user()?;

    let mut repo: Repository = session
        .manager
        .get_by_name(&session.ctx, opts.name, true)
        .await?;

    if let Some(url) = opts.url {
        repo.url = url.to_string();
    }
    if let Some(display_name) = opts.display_name {
        repo.display_name = display_name.to_string();
    }
    if let Some(private) = opts.private {
        repo.private = private;
        if !private {
            repo.clear_credentials();
        }
    }
    if let Some(username) = opts.username {
        repo.auth_user = username.to_string();
    }
    if let Some(password) = opts.password {
        repo.auth_pass = password.to_string();
    }

    session.manager.update(&session.ctx, repo).await?;
    println!("Repository '{}' updated", opts.name);
    Ok(())
}

/// Remove a repository from the catalog
pub async fn delete(session: &Session, name: &str) -> Result<()> {
    session.require_user()?;
    session.manager.delete(&session.ctx, name).await?;
    println!("Repository '{}' deleted", name);
    Ok(())
}

/// Move a repository to the caller or one of their organizations
pub async fn transfer(session: &Session, name: &str, org: Option<&str>) -> Result<()> {
    session.require_user()?;
    session
        .manager
        .transfer(&session.ctx, name, org, false)
        .await?;
    match org {
        Some(org) => println!("Repository '{}' transferred to organization '{}'", name, org),
        None => println!("Repository '{}' transferred to you", name),
    }
    Ok(())
}

/// Take over a repository by proving control of its metadata file
pub async fn claim(session: &Session, name: &str, org: Option<&str>) -> Result<()> {
    session.require_user()?;
    session
        .manager
        .claim_ownership(&session.ctx, name, org)
        .await?;
    println!(
        "{} Ownership of '{}' claimed",
        style("✓").green().bold(),
        name
    );
    Ok(())
}

/// Check whether a name or URL is still free
pub async fn available(session: &Session, resource_kind: &str, value: &str) -> Result<()> {
    let free = session
        .manager
        .check_availability(&session.ctx, resource_kind, value)
        .await?;
    if free {
        println!("{} '{}' is available", style("✓").green(), value);
    } else {
        println!("{} '{}' is taken", style("✗").red(), value);
    }
    Ok(())
}

/// Set or clear the verified publisher flag
pub async fn verify(session: &Session, name: &str, revoke: bool) -> Result<()> {
    let repo = session
        .manager
        .get_by_name(&session.ctx, name, false)
        .await?;
    session
        .manager
        .set_verified_publisher(&session.ctx, repo.repository_id, !revoke)
        .await?;
    if revoke {
        println!("Repository '{}' is no longer a verified publisher", name);
    } else {
        println!("Repository '{}' marked as verified publisher", name);
    }
    Ok(())
}

fn print_report(report: &SyncReport) {
    let diff = &report.diff;
    println!(
        "{} {} ({} packages)",
        style("✓").green(),
        style(&report.name).bold(),
        report.packages
    );
    if !diff.has_changes() {
        println!("    no changes");
        return;
    }
    for key in &diff.added {
        println!("    {} {}", style("+").green(), key);
    }
    for key in &diff.changed {
        println!("    {} {}", style("~").yellow(), key);
    }
    for key in &diff.removed {
        println!("    {} {}", style("-").red(), key);
    }
}

/// Run a tracking pass over one repository, or all of them
pub async fn track(session: &Session, name: Option<&str>, json: bool) -> Result<()> {
    let tracker = Tracker::new(session.manager.clone());

    if let Some(name) = name {
        let repo = session
            .manager
            .get_by_name(&session.ctx, name, false)
            .await?;
        let report = tracker.sync(&session.ctx, repo.repository_id).await?;
        if json {
            println!("{}", serde_json::to_string_pretty(&report)?);
        } else {
            print_report(&report);
        }
        return Ok(());
    }

    let results = tracker.sync_all(&session.ctx).await?;
    let mut reports = Vec::new();
    let mut failures = 0;
    for (repo_name, result) in results {
        match result {
            Ok(report) => {
                if !json {
                    print_report(&report);
                }
                reports.push(report);
            }
            Err(e) => {
                failures += 1;
                if !json {
                    println!("{} {}: {}", style("✗").red(), style(&repo_name).bold(), e);
                }
            }
        }
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
    }

    if failures > 0 {
        return Err(CliError::Transport {
            message: format!("{} repository(ies) failed to sync", failures),
        });
    }
    Ok(())
}
