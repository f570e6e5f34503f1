//! Embedded SQLite store
//!
//! Features:
//! - WAL mode for concurrent readers
//! - `UNIQUE(name, owner_scope)` enforces per-owner name uniqueness
//! - Digest maps replaced in a single transaction

use async_trait::async_trait;
use chrono::Utc;
use pkghub_core::{OwnerScope, Repository, RepositoryId, RepositoryKind, RepositoryRecord};
use rusqlite::{Connection, OpenFlags, OptionalExtension, params};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use super::{Organization, RepositoryFilter, RepositoryStore, User};
use crate::error::{CatalogError, Result};

const SELECT_REPOSITORY: &str = r#"
    SELECT r.repository_id, r.name, r.display_name, r.url, r.private,
           r.auth_user, r.auth_pass, r.kind,
           r.user_id, u.alias, r.organization_id, o.name, o.display_name,
           r.last_tracking_errors, r.verified_publisher, r.official
    FROM repositories r
    LEFT JOIN users u ON u.user_id = r.user_id
    LEFT JOIN organizations o ON o.organization_id = r.organization_id
"#;

/// Catalog store backed by a single SQLite connection
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open or create the catalog database at `path`
    pub fn open_at(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE,
        )?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;

        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init()?;
        tracing::debug!(path = %path.display(), "opened catalog database");
        Ok(store)
    }

    /// Open an in-memory store (for testing)
    pub fn open_memory() -> Result<Self> {
        let store = Self {
            conn: Mutex::new(Connection::open_in_memory()?),
        };
        store.init()?;
        Ok(store)
    }

    fn init(&self) -> Result<()> {
        let conn = self.lock()?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                user_id TEXT PRIMARY KEY,
                alias TEXT UNIQUE NOT NULL,
                email TEXT NOT NULL DEFAULT ''
            );

            CREATE TABLE IF NOT EXISTS organizations (
                organization_id TEXT PRIMARY KEY,
                name TEXT UNIQUE NOT NULL,
                display_name TEXT NOT NULL DEFAULT ''
            );

            CREATE TABLE IF NOT EXISTS memberships (
                user_id TEXT NOT NULL REFERENCES users(user_id) ON DELETE CASCADE,
                organization_id TEXT NOT NULL
                    REFERENCES organizations(organization_id) ON DELETE CASCADE,
                PRIMARY KEY (user_id, organization_id)
            );

            CREATE TABLE IF NOT EXISTS repositories (
                repository_id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                display_name TEXT NOT NULL DEFAULT '',
                url TEXT NOT NULL,
                private INTEGER NOT NULL DEFAULT 0,
                auth_user TEXT NOT NULL DEFAULT '',
                auth_pass TEXT NOT NULL DEFAULT '',
                kind INTEGER NOT NULL,
                user_id TEXT REFERENCES users(user_id),
                organization_id TEXT REFERENCES organizations(organization_id),
                owner_scope TEXT NOT NULL,
                last_tracking_errors TEXT NOT NULL DEFAULT '',
                verified_publisher INTEGER NOT NULL DEFAULT 0,
                official INTEGER NOT NULL DEFAULT 0,
                created_at INTEGER NOT NULL,
                CHECK ((user_id IS NULL) <> (organization_id IS NULL)),
                UNIQUE (name, owner_scope)
            );

            CREATE TABLE IF NOT EXISTS package_digests (
                repository_id TEXT NOT NULL
                    REFERENCES repositories(repository_id) ON DELETE CASCADE,
                package_key TEXT NOT NULL,
                digest TEXT NOT NULL,
                PRIMARY KEY (repository_id, package_key)
            );

            CREATE INDEX IF NOT EXISTS idx_repositories_name ON repositories(name);
            CREATE INDEX IF NOT EXISTS idx_repositories_kind ON repositories(kind);
            "#,
        )?;
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| CatalogError::Storage {
            message: "catalog connection lock poisoned".to_string(),
        })
    }

    /// Add or update a user
    pub fn upsert_user(&self, user: &User) -> Result<()> {
        self.lock()?.execute(
            r#"
            INSERT INTO users (user_id, alias, email) VALUES (?1, ?2, ?3)
            ON CONFLICT(user_id) DO UPDATE SET
                alias = excluded.alias,
                email = excluded.email
            "#,
            params![user.user_id, user.alias, user.email],
        )
        .map_err(|e| unique_violation(e, &user.alias))?;
        Ok(())
    }

    /// Add or update an organization
    pub fn upsert_organization(&self, org: &Organization) -> Result<()> {
        self.lock()?.execute(
            r#"
            INSERT INTO organizations (organization_id, name, display_name) VALUES (?1, ?2, ?3)
            ON CONFLICT(organization_id) DO UPDATE SET
                name = excluded.name,
                display_name = excluded.display_name
            "#,
            params![org.organization_id, org.name, org.display_name],
        )
        .map_err(|e| unique_violation(e, &org.name))?;
        Ok(())
    }

    /// Make a user a member of an organization
    pub fn add_member(&self, user_id: &str, organization_id: &str) -> Result<()> {
        self.lock()?.execute(
            "INSERT OR IGNORE INTO memberships (user_id, organization_id) VALUES (?1, ?2)",
            params![user_id, organization_id],
        )?;
        Ok(())
    }

    /// Look up a user by alias
    pub fn get_user_by_alias(&self, alias: &str) -> Result<Option<User>> {
        let user = self
            .lock()?
            .query_row(
                "SELECT user_id, alias, email FROM users WHERE alias = ?1",
                [alias],
                |row| {
                    Ok(User {
                        user_id: row.get(0)?,
                        alias: row.get(1)?,
                        email: row.get(2)?,
                    })
                },
            )
            .optional()?;
        Ok(user)
    }

    fn query_repositories(
        conn: &Connection,
        clause: &str,
        param: Option<&dyn rusqlite::ToSql>,
    ) -> Result<Vec<Repository>> {
        let sql = format!("{} {} ORDER BY r.name, r.repository_id", SELECT_REPOSITORY, clause);
        let mut stmt = conn.prepare(&sql)?;
        let params: Vec<&dyn rusqlite::ToSql> = param.into_iter().collect();

        let raw = stmt
            .query_map(params.as_slice(), |row| {
                Ok(RawRepository {
                    repository_id: row.get(0)?,
                    name: row.get(1)?,
                    display_name: row.get(2)?,
                    url: row.get(3)?,
                    private: row.get(4)?,
                    auth_user: row.get(5)?,
                    auth_pass: row.get(6)?,
                    kind: row.get(7)?,
                    user_id: row.get(8)?,
                    user_alias: row.get(9)?,
                    organization_id: row.get(10)?,
                    organization_name: row.get(11)?,
                    organization_display_name: row.get(12)?,
                    last_tracking_errors: row.get(13)?,
                    verified_publisher: row.get(14)?,
                    official: row.get(15)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        raw.into_iter().map(RawRepository::into_repository).collect()
    }

    fn expect_row(affected: usize, id: RepositoryId) -> Result<()> {
        if affected == 0 {
            return Err(CatalogError::repository_not_found(id));
        }
        Ok(())
    }
}

/// A repository row, before validation
struct RawRepository {
    repository_id: String,
    name: String,
    display_name: String,
    url: String,
    private: bool,
    auth_user: String,
    auth_pass: String,
    kind: i64,
    user_id: Option<String>,
    user_alias: Option<String>,
    organization_id: Option<String>,
    organization_name: Option<String>,
    organization_display_name: Option<String>,
    last_tracking_errors: String,
    verified_publisher: bool,
    official: bool,
}

impl RawRepository {
    fn into_repository(self) -> Result<Repository> {
        let record = RepositoryRecord {
            repository_id: self.repository_id.parse()?,
            name: self.name,
            display_name: self.display_name,
            url: self.url,
            private: self.private,
            auth_user: self.auth_user,
            auth_pass: self.auth_pass,
            kind: RepositoryKind::try_from(self.kind)?,
            user_id: self.user_id,
            user_alias: self.user_alias,
            organization_id: self.organization_id,
            organization_name: self.organization_name,
            organization_display_name: self.organization_display_name,
            last_tracking_errors: self.last_tracking_errors,
            verified_publisher: self.verified_publisher,
            official: self.official,
        };
        Ok(Repository::try_from(record)?)
    }
}

/// Map a unique-constraint violation to `NameConflict`
fn unique_violation(e: rusqlite::Error, name: &str) -> CatalogError {
    if let rusqlite::Error::SqliteFailure(ref err, _) = e {
        if err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
            || err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
        {
            return CatalogError::NameConflict {
                name: name.to_string(),
            };
        }
    }
    e.into()
}

fn owner_columns(owner: &OwnerScope) -> (Option<&str>, Option<&str>, String) {
    (owner.user_id(), owner.organization_id(), owner.scope_key())
}

#[async_trait]
impl RepositoryStore for SqliteStore {
    async fn insert_repository(&self, repo: &Repository) -> Result<()> {
        let (user_id, organization_id, scope) = owner_columns(&repo.owner);
        self.lock()?
            .execute(
                r#"
                INSERT INTO repositories (
                    repository_id, name, display_name, url, private, auth_user, auth_pass,
                    kind, user_id, organization_id, owner_scope,
                    last_tracking_errors, verified_publisher, official, created_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
                "#,
                params![
                    repo.repository_id.to_string(),
                    repo.name,
                    repo.display_name,
                    repo.url,
                    repo.private,
                    repo.auth_user,
                    repo.auth_pass,
                    i64::from(repo.kind),
                    user_id,
                    organization_id,
                    scope,
                    repo.last_tracking_errors,
                    repo.verified_publisher,
                    repo.official,
                    Utc::now().timestamp(),
                ],
            )
            .map_err(|e| unique_violation(e, &repo.name))?;
        tracing::debug!(id = %repo.repository_id, name = %repo.name, "inserted repository");
        Ok(())
    }

    async fn update_repository(&self, repo: &Repository) -> Result<()> {
        let affected = self
            .lock()?
            .execute(
                r#"
                UPDATE repositories SET
                    name = ?2, display_name = ?3, url = ?4, private = ?5,
                    auth_user = ?6, auth_pass = ?7
                WHERE repository_id = ?1
                "#,
                params![
                    repo.repository_id.to_string(),
                    repo.name,
                    repo.display_name,
                    repo.url,
                    repo.private,
                    repo.auth_user,
                    repo.auth_pass,
                ],
            )
            .map_err(|e| unique_violation(e, &repo.name))?;
        Self::expect_row(affected, repo.repository_id)
    }

    async fn delete_repository(&self, id: RepositoryId) -> Result<()> {
        let affected = self.lock()?.execute(
            "DELETE FROM repositories WHERE repository_id = ?1",
            [id.to_string()],
        )?;
        Self::expect_row(affected, id)
    }

    async fn set_owner(&self, id: RepositoryId, owner: &OwnerScope) -> Result<()> {
        let conn = self.lock()?;
        let name: Option<String> = conn
            .query_row(
                "SELECT name FROM repositories WHERE repository_id = ?1",
                [id.to_string()],
                |row| row.get(0),
            )
            .optional()?;
        let name = name.ok_or_else(|| CatalogError::repository_not_found(id))?;

        let (user_id, organization_id, scope) = owner_columns(owner);
        conn.execute(
            r#"
            UPDATE repositories SET user_id = ?2, organization_id = ?3, owner_scope = ?4
            WHERE repository_id = ?1
            "#,
            params![id.to_string(), user_id, organization_id, scope],
        )
        .map_err(|e| unique_violation(e, &name))?;
        Ok(())
    }

    async fn get_repository(&self, id: RepositoryId) -> Result<Option<Repository>> {
        let conn = self.lock()?;
        let id = id.to_string();
        let mut repos =
            Self::query_repositories(&conn, "WHERE r.repository_id = ?1", Some(&id))?;
        Ok(repos.pop())
    }

    async fn list_repositories(&self, filter: &RepositoryFilter) -> Result<Vec<Repository>> {
        let conn = self.lock()?;
        match filter {
            RepositoryFilter::All => Self::query_repositories(&conn, "", None),
            RepositoryFilter::Kind(kind) => {
                let kind = i64::from(*kind);
                Self::query_repositories(&conn, "WHERE r.kind = ?1", Some(&kind))
            }
            RepositoryFilter::Name(name) => {
                Self::query_repositories(&conn, "WHERE r.name = ?1", Some(name))
            }
            RepositoryFilter::OwnedByUser(user_id) => {
                Self::query_repositories(&conn, "WHERE r.user_id = ?1", Some(user_id))
            }
            RepositoryFilter::OwnedByOrg(org_name) => {
                Self::query_repositories(&conn, "WHERE o.name = ?1", Some(org_name))
            }
        }
    }

    async fn set_last_tracking_errors(&self, id: RepositoryId, errors: &str) -> Result<()> {
        let affected = self.lock()?.execute(
            "UPDATE repositories SET last_tracking_errors = ?2 WHERE repository_id = ?1",
            params![id.to_string(), errors],
        )?;
        Self::expect_row(affected, id)
    }

    async fn set_verified_publisher(&self, id: RepositoryId, verified: bool) -> Result<()> {
        let affected = self.lock()?.execute(
            "UPDATE repositories SET verified_publisher = ?2 WHERE repository_id = ?1",
            params![id.to_string(), verified],
        )?;
        Self::expect_row(affected, id)
    }

    async fn get_packages_digest(&self, id: RepositoryId) -> Result<HashMap<String, String>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare("SELECT package_key, digest FROM package_digests WHERE repository_id = ?1")?;
        let digests = stmt
            .query_map([id.to_string()], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<std::result::Result<HashMap<String, String>, _>>()?;
        Ok(digests)
    }

    async fn replace_packages_digest(
        &self,
        id: RepositoryId,
        digests: &HashMap<String, String>,
    ) -> Result<()> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        let exists: bool = tx.query_row(
            "SELECT EXISTS(SELECT 1 FROM repositories WHERE repository_id = ?1)",
            [id.to_string()],
            |row| row.get(0),
        )?;
        if !exists {
            return Err(CatalogError::repository_not_found(id));
        }

        tx.execute(
            "DELETE FROM package_digests WHERE repository_id = ?1",
            [id.to_string()],
        )?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO package_digests (repository_id, package_key, digest) VALUES (?1, ?2, ?3)",
            )?;
            for (key, digest) in digests {
                stmt.execute(params![id.to_string(), key, digest])?;
            }
        }
        tx.commit()?;

        tracing::debug!(%id, packages = digests.len(), "replaced packages digest");
        Ok(())
    }

    async fn get_user(&self, user_id: &str) -> Result<Option<User>> {
        let user = self
            .lock()?
            .query_row(
                "SELECT user_id, alias, email FROM users WHERE user_id = ?1",
                [user_id],
                |row| {
                    Ok(User {
                        user_id: row.get(0)?,
                        alias: row.get(1)?,
                        email: row.get(2)?,
                    })
                },
            )
            .optional()?;
        Ok(user)
    }

    async fn get_organization(&self, name: &str) -> Result<Option<Organization>> {
        let org = self
            .lock()?
            .query_row(
                "SELECT organization_id, name, display_name FROM organizations WHERE name = ?1",
                [name],
                |row| {
                    Ok(Organization {
                        organization_id: row.get(0)?,
                        name: row.get(1)?,
                        display_name: row.get(2)?,
                    })
                },
            )
            .optional()?;
        Ok(org)
    }

    async fn is_member(&self, user_id: &str, organization_id: &str) -> Result<bool> {
        let member = self.lock()?.query_row(
            "SELECT EXISTS(SELECT 1 FROM memberships WHERE user_id = ?1 AND organization_id = ?2)",
            params![user_id, organization_id],
            |row| row.get(0),
        )?;
        Ok(member)
    }

    async fn check_availability(&self, resource_kind: &str, value: &str) -> Result<bool> {
        let sql = match resource_kind {
            "repositoryName" => "SELECT NOT EXISTS(SELECT 1 FROM repositories WHERE name = ?1)",
            "repositoryURL" => "SELECT NOT EXISTS(SELECT 1 FROM repositories WHERE url = ?1)",
            "organizationName" => {
                "SELECT NOT EXISTS(SELECT 1 FROM organizations WHERE name = ?1)"
            }
            "userAlias" => "SELECT NOT EXISTS(SELECT 1 FROM users WHERE alias = ?1)",
            other => {
                return Err(CatalogError::InvalidInput {
                    message: format!("resource kind not supported: {}", other),
                });
            }
        };
        let available = self.lock()?.query_row(sql, [value], |row| row.get(0))?;
        Ok(available)
    }
}
