//! User Storage
//! Mission: Persist users and provisioned apps in SQLite behind the storage ports

use crate::auth::{
    models::{App, AppId, NewUser, User, UserId, UserInfo},
    ports::{AppProvider, StoreError, UserProvider, UserSaver},
};
use anyhow::{Context, Result};
use async_trait::async_trait;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// SQLite-backed user and app store
pub struct UserStore {
    db_path: PathBuf,
}

impl UserStore {
    /// Create a new store and initialize the schema
    pub fn new(db_path: impl AsRef<Path>) -> Result<Self> {
        let store = Self {
            db_path: db_path.as_ref().to_path_buf(),
        };
        store.init_db()?;
        Ok(store)
    }

    fn init_db(&self) -> Result<()> {
        let conn = open(&self.db_path)?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                email TEXT NOT NULL UNIQUE,
                pass_hash BLOB NOT NULL,
                role TEXT NOT NULL,
                is_admin INTEGER NOT NULL DEFAULT 0
            );
            CREATE TABLE IF NOT EXISTS apps (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                secret TEXT NOT NULL
            );",
        )
        .context("Failed to create auth schema")?;

        Ok(())
    }

    /// Insert or replace an app. Apps have no registration API; this is the
    /// out-of-band provisioning path.
    pub fn upsert_app(&self, app: &App) -> Result<()> {
        let conn = open(&self.db_path)?;
        conn.execute(
            "INSERT INTO apps (id, name, secret) VALUES (?1, ?2, ?3)
             ON CONFLICT(id) DO UPDATE SET name = excluded.name, secret = excluded.secret",
            params![app.id, app.name, app.secret],
        )
        .context("Failed to upsert app")?;

        info!(app_id = app.id, name = %app.name, "app provisioned");
        Ok(())
    }

    /// Run `f` on a fresh connection on the blocking pool.
    async fn with_conn<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T, StoreError> + Send + 'static,
    {
        let db_path = self.db_path.clone();
        tokio::task::spawn_blocking(move || {
            let conn = open(&db_path)?;
            f(&conn)
        })
        .await
        .context("Storage task panicked")?
    }
}

fn open(db_path: &Path) -> Result<Connection> {
    let conn = Connection::open(db_path)
        .with_context(|| format!("Failed to open {}", db_path.display()))?;
    conn.busy_timeout(BUSY_TIMEOUT)?;
    Ok(conn)
}

fn backend(e: rusqlite::Error) -> StoreError {
    StoreError::Backend(e.into())
}

fn is_unique_violation(e: &rusqlite::Error) -> bool {
    matches!(
        e,
        rusqlite::Error::SqliteFailure(err, _) if err.code == ErrorCode::ConstraintViolation
    )
}

#[async_trait]
impl UserSaver for UserStore {
    async fn save_user(&self, user: NewUser) -> Result<UserId, StoreError> {
        self.with_conn(move |conn| {
            let inserted = conn.execute(
                "INSERT INTO users (name, email, pass_hash, role, is_admin)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    user.name,
                    user.email,
                    user.password_hash,
                    user.role,
                    user.is_admin,
                ],
            );

            match inserted {
                Ok(_) => Ok(conn.last_insert_rowid()),
                Err(e) if is_unique_violation(&e) => Err(StoreError::AlreadyExists),
                Err(e) => Err(backend(e)),
            }
        })
        .await
    }
}

#[async_trait]
impl UserProvider for UserStore {
    async fn user_by_email(&self, email: &str) -> Result<User, StoreError> {
        let email = email.to_owned();
        self.with_conn(move |conn| {
            conn.query_row(
                "SELECT id, name, email, pass_hash, role, is_admin
                 FROM users WHERE email = ?1",
                params![email],
                |row| {
                    Ok(User {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        email: row.get(2)?,
                        password_hash: row.get(3)?,
                        role: row.get(4)?,
                        is_admin: row.get(5)?,
                    })
                },
            )
            .optional()
            .map_err(backend)?
            .ok_or(StoreError::NotFound)
        })
        .await
    }

    async fn user_by_id(&self, user_id: UserId) -> Result<UserInfo, StoreError> {
        self.with_conn(move |conn| {
            conn.query_row(
                "SELECT id, name, email, role FROM users WHERE id = ?1",
                params![user_id],
                |row| {
                    Ok(UserInfo {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        email: row.get(2)?,
                        role: row.get(3)?,
                    })
                },
            )
            .optional()
            .map_err(backend)?
            .ok_or(StoreError::NotFound)
        })
        .await
    }

    async fn is_admin(&self, user_id: UserId) -> Result<bool, StoreError> {
        self.with_conn(move |conn| {
            conn.query_row(
                "SELECT is_admin FROM users WHERE id = ?1",
                params![user_id],
                |row| row.get(0),
            )
            .optional()
            .map_err(backend)?
            .ok_or(StoreError::NotFound)
        })
        .await
    }
}

#[async_trait]
impl AppProvider for UserStore {
    async fn app(&self, app_id: AppId) -> Result<App, StoreError> {
        self.with_conn(move |conn| {
            conn.query_row(
                "SELECT id, name, secret FROM apps WHERE id = ?1",
                params![app_id],
                |row| {
                    Ok(App {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        secret: row.get(2)?,
                    })
                },
            )
            .optional()
            .map_err(backend)?
            .ok_or(StoreError::NotFound)
        })
        .await
    }
}
