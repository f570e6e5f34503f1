//! pkghub CLI - catalog of package repositories

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

mod commands;
mod error;
mod exit_codes;

use commands::Session;
use commands::repo::{AddOptions, ListScope, UpdateOptions};
use error::{CliError, Result};

#[derive(Parser)]
#[command(name = "pkghub")]
#[command(author = "pkghub Contributors")]
#[command(version)]
#[command(about = "Catalog of Helm, Falco, OPA and OLM package repositories", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (default: ~/.config/pkghub/config.yaml)
    #[arg(long, global = true, env = "PKGHUB_CONFIG")]
    config: Option<PathBuf>,

    /// Act as this user (alias)
    #[arg(long, global = true, env = "PKGHUB_USER")]
    as_user: Option<String>,

    /// Enable debug output
    #[arg(long, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage catalog repositories
    #[command(subcommand)]
    Repo(RepoCommands),

    /// Manage users
    #[command(subcommand)]
    User(UserCommands),

    /// Manage organizations
    #[command(subcommand)]
    Org(OrgCommands),
}

#[derive(Subcommand)]
enum RepoCommands {
    /// Register a repository
    Add {
        /// Repository name
        name: String,

        /// Repository URL
        url: String,

        /// Repository kind (helm, falco, opa, olm)
        #[arg(short, long, default_value = "helm")]
        kind: String,

        /// Human-readable name
        #[arg(long)]
        display_name: Option<String>,

        /// Register under this organization instead of the acting user
        #[arg(long)]
        org: Option<String>,

        /// Repository requires credentials
        #[arg(long)]
        private: bool,

        /// Username for private repositories
        #[arg(long)]
        username: Option<String>,

        /// Password for private repositories
        #[arg(long, env = "PKGHUB_REPO_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },

    /// List repositories
    List {
        /// Only repositories of this kind
        #[arg(short, long, conflicts_with_all = ["org", "mine"])]
        kind: Option<String>,

        /// Only repositories owned by this organization
        #[arg(long, conflicts_with = "mine")]
        org: Option<String>,

        /// Only repositories owned by the acting user
        #[arg(long)]
        mine: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,

        /// Include credentials
        #[arg(long)]
        show_auth: bool,
    },

    /// Show a repository
    Show {
        name: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,

        /// Include credentials
        #[arg(long)]
        show_auth: bool,
    },

    /// Update a repository
    Update {
        name: String,

        #[arg(long)]
        url: Option<String>,

        #[arg(long)]
        display_name: Option<String>,

        /// Mark the repository private or public
        #[arg(long)]
        private: Option<bool>,

        #[arg(long)]
        username: Option<String>,

        #[arg(long, env = "PKGHUB_REPO_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },

    /// Delete a repository
    Delete { name: String },

    /// Transfer a repository to you or one of your organizations
    Transfer {
        name: String,

        #[arg(long)]
        org: Option<String>,
    },

    /// Claim a repository by proving control of its metadata file
    Claim {
        name: String,

        #[arg(long)]
        org: Option<String>,
    },

    /// Check whether a value is still available
    Available {
        /// One of repositoryName, repositoryURL, organizationName, userAlias
        resource_kind: String,

        value: String,
    },

    /// Mark a repository as verified publisher
    Verify {
        name: String,

        /// Clear the flag instead
        #[arg(long)]
        revoke: bool,
    },

    /// Run a tracking pass
    Track {
        /// Repository to track (default: all)
        name: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum UserCommands {
    /// Register a user
    Add {
        alias: String,

        #[arg(long)]
        email: String,

        /// User id (default: the alias)
        #[arg(long)]
        id: Option<String>,
    },
}

#[derive(Subcommand)]
enum OrgCommands {
    /// Register an organization, with the acting user as member
    Add {
        name: String,

        #[arg(long)]
        display_name: Option<String>,
    },

    /// Add a user to an organization
    AddMember {
        org: String,

        /// User alias
        user: String,
    },
}

fn init_tracing(debug: bool) {
    let filter = EnvFilter::try_from_env("PKGHUB_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if debug { "debug" } else { "warn" })
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(debug)
        .init();
}

fn main() {
    miette::set_panic_hook();

    let cli = Cli::parse();
    init_tracing(cli.debug);

    let code = match run(cli) {
        Ok(()) => exit_codes::SUCCESS,
        Err(err) => {
            let code = err.exit_code();
            eprintln!("{:?}", miette::Report::new(err));
            code
        }
    };
    std::process::exit(code);
}

fn run(cli: Cli) -> Result<()> {
    let runtime = tokio::runtime::Runtime::new()
        .map_err(|e| CliError::internal(format!("failed to start runtime: {}", e)))?;

    runtime.block_on(async move {
        let cancel = CancellationToken::new();
        let on_interrupt = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("interrupted, canceling");
                on_interrupt.cancel();
            }
        });

        let session = Session::open(cli.config.as_deref(), cli.as_user.as_deref(), cancel)?;
        dispatch(&session, cli.command).await
    })
}

async fn dispatch(session: &Session, command: Commands) -> Result<()> {
    match command {
        Commands::Repo(cmd) => match cmd {
            RepoCommands::Add {
                name,
                url,
                kind,
                display_name,
                org,
                private,
                username,
                password,
            } => {
                commands::repo::add(
                    session,
                    AddOptions {
                        name: &name,
                        url: &url,
                        kind: &kind,
                        display_name: display_name.as_deref(),
                        org: org.as_deref(),
                        private,
                        username: username.as_deref(),
                        password: password.as_deref(),
                    },
                )
                .await
            }
            RepoCommands::List {
                kind,
                org,
                mine,
                json,
                show_auth,
            } => {
                let scope = match (&kind, &org) {
                    (Some(kind), _) => ListScope::Kind(kind),
                    (None, Some(org)) => ListScope::Org(org),
                    (None, None) if mine => ListScope::Mine,
                    (None, None) => ListScope::All,
                };
                commands::repo::list(session, scope, json, show_auth).await
            }
            RepoCommands::Show {
                name,
                json,
                show_auth,
            } => commands::repo::show(session, &name, json, show_auth).await,
            RepoCommands::Update {
                name,
                url,
                display_name,
                private,
                username,
                password,
            } => {
                commands::repo::update(
                    session,
                    UpdateOptions {
                        name: &name,
                        url: url.as_deref(),
                        display_name: display_name.as_deref(),
                        private,
                        username: username.as_deref(),
                        password: password.as_deref(),
                    },
                )
                .await
            }
            RepoCommands::Delete { name } => commands::repo::delete(session, &name).await,
            RepoCommands::Transfer { name, org } => {
                commands::repo::transfer(session, &name, org.as_deref()).await
            }
            RepoCommands::Claim { name, org } => {
                commands::repo::claim(session, &name, org.as_deref()).await
            }
            RepoCommands::Available {
                resource_kind,
                value,
            } => commands::repo::available(session, &resource_kind, &value).await,
            RepoCommands::Verify { name, revoke } => {
                commands::repo::verify(session, &name, revoke).await
            }
            RepoCommands::Track { name, json } => {
                commands::repo::track(session, name.as_deref(), json).await
            }
        },

        Commands::User(UserCommands::Add { alias, email, id }) => {
            commands::user::add(session, &alias, &email, id.as_deref())
        }

        Commands::Org(cmd) => match cmd {
            OrgCommands::Add { name, display_name } => {
                commands::org::add(session, &name, display_name.as_deref()).await
            }
            OrgCommands::AddMember { org, user } => {
                commands::org::add_member(session, &org, &user).await
            }
        },
    }
}
