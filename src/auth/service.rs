//! Auth Engine
//! Mission: Registration, login, token validation and role lookup over pluggable storage
//!
//! The service is stateless. Each call is one pipeline with no retries: the
//! first failure is classified into an `AuthError`, reported to the observer
//! and returned. Dropping a returned future abandons the pipeline at its
//! current await point.

use crate::auth::{
    error::{AuthError, Resource},
    jwt::TokenCodec,
    models::{AppId, NewUser, User, UserId, UserInfo},
    observer::{AuthObserver, Operation, TracingObserver},
    password::PasswordHasher,
    ports::{AppProvider, StoreError, UserProvider, UserSaver},
};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::spawn_blocking;

pub struct AuthService {
    user_saver: Arc<dyn UserSaver>,
    user_provider: Arc<dyn UserProvider>,
    app_provider: Arc<dyn AppProvider>,
    hasher: PasswordHasher,
    codec: TokenCodec,
    observer: Arc<dyn AuthObserver>,
    token_ttl: Duration,
}

impl AuthService {
    pub fn new(
        user_saver: Arc<dyn UserSaver>,
        user_provider: Arc<dyn UserProvider>,
        app_provider: Arc<dyn AppProvider>,
        token_ttl: Duration,
    ) -> Self {
        Self {
            user_saver,
            user_provider,
            app_provider,
            hasher: PasswordHasher::default(),
            codec: TokenCodec::new(),
            observer: Arc::new(TracingObserver),
            token_ttl,
        }
    }

    pub fn with_hasher(mut self, hasher: PasswordHasher) -> Self {
        self.hasher = hasher;
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn AuthObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Hash the password and persist a new user.
    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
        role: &str,
        is_admin: bool,
    ) -> Result<UserId, AuthError> {
        let op = Operation::Register;
        self.observer.started(op, email);

        let hasher = self.hasher;
        let password = password.to_owned();
        let password_hash = spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|e| self.fail(op, AuthError::Internal, &e))?
            .map_err(|e| self.fail(op, AuthError::Internal, &e))?;

        let new_user = NewUser {
            name: name.to_owned(),
            email: email.to_owned(),
            password_hash,
            role: role.to_owned(),
            is_admin,
        };

        let user_id = match self.user_saver.save_user(new_user).await {
            Ok(id) => id,
            Err(e @ StoreError::AlreadyExists) => {
                return Err(self.fail(op, AuthError::AlreadyExists, &e))
            }
            Err(e) => return Err(self.fail(op, AuthError::Internal, &e)),
        };

        self.observer.succeeded(op);
        Ok(user_id)
    }

    /// Check credentials and issue a token signed with the app's secret.
    pub async fn login(
        &self,
        email: &str,
        password: &str,
        app_id: AppId,
    ) -> Result<String, AuthError> {
        let op = Operation::Login;
        self.observer.started(op, email);

        let hasher = self.hasher;
        let user = match self.user_provider.user_by_email(email).await {
            Ok(user) => user,
            Err(e @ StoreError::NotFound) => {
                let candidate = password.to_owned();
                spawn_blocking(move || hasher.verify_absent(&candidate))
                    .await
                    .map_err(|je| self.fail(op, AuthError::Internal, &je))?;
                return Err(self.fail(op, AuthError::InvalidCredentials, &e));
            }
            Err(e) => return Err(self.fail(op, AuthError::Internal, &e)),
        };

        let stored = user.password_hash.clone();
        let candidate = password.to_owned();
        let matched = spawn_blocking(move || hasher.verify(&stored, &candidate))
            .await
            .map_err(|e| self.fail(op, AuthError::Internal, &e))?;

        match matched {
            Ok(true) => {}
            Ok(false) => {
                return Err(self.fail(op, AuthError::InvalidCredentials, &"password mismatch"))
            }
            // Corrupt hash: same answer to the caller, different log line
            Err(e) => return Err(self.fail(op, AuthError::InvalidCredentials, &e)),
        }

        let app = match self.app_provider.app(app_id).await {
            Ok(app) => app,
            Err(e @ StoreError::NotFound) => {
                return Err(self.fail(op, AuthError::NotFound(Resource::App), &e))
            }
            Err(e) => return Err(self.fail(op, AuthError::Internal, &e)),
        };

        let token = self
            .codec
            .issue(user.id, &user.email, app.id, &app.secret, self.token_ttl)
            .map_err(|e| self.fail(op, AuthError::Internal, &format!("{e:#}")))?;

        self.observer.succeeded(op);
        Ok(token)
    }

    /// Verify a token under the secret of the app it names and return its live user.
    pub async fn validate_token(&self, token: &str) -> Result<User, AuthError> {
        let op = Operation::ValidateToken;
        self.observer.started(op, "");

        let app_id = self
            .codec
            .unverified_app_id(token)
            .map_err(|e| self.fail(op, AuthError::InvalidToken, e.cause()))?;

        let app = match self.app_provider.app(app_id).await {
            Ok(app) => app,
            Err(StoreError::NotFound) => {
                let cause = format!("token names unknown app {app_id}");
                return Err(self.fail(op, AuthError::InvalidToken, &cause));
            }
            Err(e) => return Err(self.fail(op, AuthError::Internal, &e)),
        };

        let claims = self
            .codec
            .verify(token, &app.secret)
            .map_err(|e| self.fail(op, AuthError::InvalidToken, e.cause()))?;

        let user = match self.user_provider.user_by_email(&claims.email).await {
            Ok(user) => user,
            Err(e @ StoreError::NotFound) => {
                return Err(self.fail(op, AuthError::NotFound(Resource::User), &e))
            }
            Err(e) => return Err(self.fail(op, AuthError::Internal, &e)),
        };

        if user.id != claims.uid {
            let cause = format!("token subject {} does not match user {}", claims.uid, user.id);
            return Err(self.fail(op, AuthError::InvalidToken, &cause));
        }

        self.observer.succeeded(op);
        Ok(user)
    }

    pub async fn is_admin(&self, user_id: UserId) -> Result<bool, AuthError> {
        let op = Operation::IsAdmin;
        self.observer.started(op, &user_id.to_string());

        let is_admin = self
            .user_provider
            .is_admin(user_id)
            .await
            .map_err(|e| self.fail_lookup(op, e))?;

        self.observer.succeeded(op);
        Ok(is_admin)
    }

    pub async fn get_user(&self, user_id: UserId) -> Result<UserInfo, AuthError> {
        let op = Operation::GetUser;
        self.observer.started(op, &user_id.to_string());

        let user = self
            .user_provider
            .user_by_id(user_id)
            .await
            .map_err(|e| self.fail_lookup(op, e))?;

        self.observer.succeeded(op);
        Ok(user)
    }

    fn fail_lookup(&self, op: Operation, e: StoreError) -> AuthError {
        let kind = match e {
            StoreError::NotFound => AuthError::NotFound(Resource::User),
            _ => AuthError::Internal,
        };
        self.fail(op, kind, &e)
    }

    fn fail(&self, op: Operation, error: AuthError, cause: &dyn fmt::Display) -> AuthError {
        self.observer.classified(op, error, cause);
        error
    }
}
