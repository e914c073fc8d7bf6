//! Observability hook for the auth engine.
//!
//! The engine reports at three points per call: when an operation starts,
//! whenever a dependency failure is classified into an `AuthError`, and on
//! success. `TracingObserver` is the production sink.

use crate::auth::error::AuthError;
use std::fmt;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Register,
    Login,
    ValidateToken,
    IsAdmin,
    GetUser,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Register => "register",
            Operation::Login => "login",
            Operation::ValidateToken => "validate_token",
            Operation::IsAdmin => "is_admin",
            Operation::GetUser => "get_user",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub trait AuthObserver: Send + Sync {
    /// `subject` is the email or user id the call is about; empty for token checks.
    fn started(&self, op: Operation, subject: &str);

    /// `cause` is the raw internal reason and must not leave the process.
    fn classified(&self, op: Operation, error: AuthError, cause: &dyn fmt::Display);

    fn succeeded(&self, op: Operation);
}

/// Emits structured `tracing` events.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl AuthObserver for TracingObserver {
    fn started(&self, op: Operation, subject: &str) {
        info!(op = op.as_str(), subject, "auth operation started");
    }

    fn classified(&self, op: Operation, error: AuthError, cause: &dyn fmt::Display) {
        match error {
            AuthError::Internal => {
                error!(op = op.as_str(), kind = error.kind(), cause = %cause, "auth operation failed")
            }
            AuthError::InvalidCredentials | AuthError::InvalidToken => {
                warn!(op = op.as_str(), kind = error.kind(), cause = %cause, "auth operation rejected")
            }
            AuthError::AlreadyExists | AuthError::NotFound(_) => {
                info!(op = op.as_str(), kind = error.kind(), cause = %cause, "auth operation refused")
            }
        }
    }

    fn succeeded(&self, op: Operation) {
        debug!(op = op.as_str(), "auth operation succeeded");
    }
}
