//! Storage ports consumed by the auth engine.
//!
//! Any backing store that implements these traits can sit behind
//! `AuthService`; the engine never sees SQL, schemas or connections.

use crate::auth::models::{App, AppId, NewUser, User, UserId, UserInfo};
use async_trait::async_trait;
use thiserror::Error;

/// Failure reported by a storage port. Stores translate their own errors
/// into these kinds before returning.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Unique constraint hit (user email).
    #[error("record already exists")]
    AlreadyExists,

    #[error("record not found")]
    NotFound,

    #[error("storage backend failure: {0:#}")]
    Backend(#[from] anyhow::Error),
}

#[async_trait]
pub trait UserSaver: Send + Sync {
    /// Persist a new user and return its id. Concurrent saves of the same
    /// email must leave exactly one winner; the rest get `AlreadyExists`.
    async fn save_user(&self, user: NewUser) -> Result<UserId, StoreError>;
}

#[async_trait]
pub trait UserProvider: Send + Sync {
    async fn user_by_email(&self, email: &str) -> Result<User, StoreError>;

    async fn user_by_id(&self, user_id: UserId) -> Result<UserInfo, StoreError>;

    async fn is_admin(&self, user_id: UserId) -> Result<bool, StoreError>;
}

#[async_trait]
pub trait AppProvider: Send + Sync {
    async fn app(&self, app_id: AppId) -> Result<App, StoreError>;
}
