//! Engine error taxonomy.
//!
//! Every `AuthService` operation fails with one of these kinds and nothing
//! else. Raw storage or crypto errors never travel inside the value; they
//! are reported to the `AuthObserver` at the point of classification.

use std::fmt;
use thiserror::Error;

/// Record kind a `NotFound` refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    User,
    App,
}

impl Resource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Resource::User => "user",
            Resource::App => "app",
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("user already exists")]
    AlreadyExists,

    #[error("{0} not found")]
    NotFound(Resource),

    /// Unknown email and wrong password are deliberately the same value.
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("invalid token")]
    InvalidToken,

    #[error("internal error")]
    Internal,
}

impl AuthError {
    /// Stable label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            AuthError::AlreadyExists => "already_exists",
            AuthError::NotFound(_) => "not_found",
            AuthError::InvalidCredentials => "invalid_credentials",
            AuthError::InvalidToken => "invalid_token",
            AuthError::Internal => "internal",
        }
    }
}
