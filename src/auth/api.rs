//! Authentication API Endpoints
//! Mission: Expose the auth engine as RPC-style JSON endpoints
//!
//! Request guards run here, before the engine is reached. Engine errors are
//! mapped to coarse statuses; no internal detail is ever written to a body.

use crate::auth::{
    error::{AuthError, Resource},
    models::{AppId, UserId},
    service::AuthService,
};
use crate::middleware::request_logging;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tower_http::timeout::TimeoutLayer;

/// Shared auth state
#[derive(Clone)]
pub struct AuthState {
    pub service: Arc<AuthService>,
}

impl AuthState {
    pub fn new(service: Arc<AuthService>) -> Self {
        Self { service }
    }
}

/// Build the full router. Requests still running after `request_timeout`
/// get a 408 and their engine future is dropped, so no later step is
/// started. A storage write already handed to the blocking pool still
/// commits: a register that times out during its INSERT may have created
/// the user, and a retry then answers 409.
pub fn router(state: AuthState, request_timeout: Duration) -> Router {
    Router::new()
        .route("/api/auth/register", post(register))
        .route("/api/auth/login", post(login))
        .route("/api/auth/is-admin", post(is_admin))
        .route("/api/auth/validate", post(validate_token))
        .route("/api/users/:id", get(get_user))
        .layer(TimeoutLayer::new(request_timeout))
        .with_state(state)
        .route("/health", get(health_check))
        .layer(middleware::from_fn(request_logging))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: String,
    pub is_admin: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub user_id: UserId,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
    pub app_id: AppId,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct IsAdminRequest {
    pub user_id: UserId,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct IsAdminResponse {
    pub is_admin: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ValidateTokenRequest {
    pub token: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ValidateTokenResponse {
    pub user_id: UserId,
    pub is_valid: bool,
}

/// User profile response (sanitized)
#[derive(Debug, Serialize, Deserialize)]
pub struct GetUserResponse {
    pub id: UserId,
    pub name: String,
    pub email: String,
}

/// Register endpoint - POST /api/auth/register
pub async fn register(
    State(state): State<AuthState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<Json<RegisterResponse>, ApiError> {
    if payload.email.is_empty() {
        return Err(ApiError::InvalidArgument("email is required"));
    }
    if payload.password.is_empty() {
        return Err(ApiError::InvalidArgument("password is required"));
    }

    let user_id = state
        .service
        .register(
            &payload.name,
            &payload.email,
            &payload.password,
            &payload.role,
            payload.is_admin,
        )
        .await?;

    Ok(Json(RegisterResponse { user_id }))
}

/// Login endpoint - POST /api/auth/login
pub async fn login(
    State(state): State<AuthState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    if payload.email.is_empty() {
        return Err(ApiError::InvalidArgument("email is required"));
    }
    if payload.password.is_empty() {
        return Err(ApiError::InvalidArgument("password is required"));
    }
    if payload.app_id == 0 {
        return Err(ApiError::InvalidArgument("app_id is required"));
    }

    let token = state
        .service
        .login(&payload.email, &payload.password, payload.app_id)
        .await?;

    Ok(Json(LoginResponse { token }))
}

/// Admin check - POST /api/auth/is-admin
pub async fn is_admin(
    State(state): State<AuthState>,
    Json(payload): Json<IsAdminRequest>,
) -> Result<Json<IsAdminResponse>, ApiError> {
    if payload.user_id == 0 {
        return Err(ApiError::InvalidArgument("user_id is required"));
    }

    let is_admin = state.service.is_admin(payload.user_id).await?;

    Ok(Json(IsAdminResponse { is_admin }))
}

/// Token check - POST /api/auth/validate
/// A bad or expired token is an answer, not an error.
pub async fn validate_token(
    State(state): State<AuthState>,
    Json(payload): Json<ValidateTokenRequest>,
) -> Result<Json<ValidateTokenResponse>, ApiError> {
    if payload.token.is_empty() {
        return Err(ApiError::InvalidArgument("token is required"));
    }

    match state.service.validate_token(&payload.token).await {
        Ok(user) => Ok(Json(ValidateTokenResponse {
            user_id: user.id,
            is_valid: true,
        })),
        Err(AuthError::InvalidToken | AuthError::NotFound(_)) => Ok(Json(ValidateTokenResponse {
            user_id: 0,
            is_valid: false,
        })),
        Err(e) => Err(e.into()),
    }
}

/// User profile - GET /api/users/:id
pub async fn get_user(
    State(state): State<AuthState>,
    Path(user_id): Path<UserId>,
) -> Result<Json<GetUserResponse>, ApiError> {
    let user = state.service.get_user(user_id).await?;

    Ok(Json(GetUserResponse {
        id: user.id,
        name: user.name,
        email: user.email,
    }))
}

async fn health_check() -> &'static str {
    "ok"
}

/// Auth API errors
#[derive(Debug, PartialEq, Eq)]
pub enum ApiError {
    InvalidArgument(&'static str),
    InvalidCredentials,
    InvalidToken,
    UserNotFound,
    AppNotFound,
    UserAlreadyExists,
    InternalError,
}

impl From<AuthError> for ApiError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::AlreadyExists => ApiError::UserAlreadyExists,
            AuthError::NotFound(Resource::User) => ApiError::UserNotFound,
            AuthError::NotFound(Resource::App) => ApiError::AppNotFound,
            AuthError::InvalidCredentials => ApiError::InvalidCredentials,
            AuthError::InvalidToken => ApiError::InvalidToken,
            AuthError::Internal => ApiError::InternalError,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::InvalidArgument(message) => (StatusCode::BAD_REQUEST, message),
            ApiError::InvalidCredentials => (StatusCode::BAD_REQUEST, "invalid email or password"),
            ApiError::InvalidToken => (StatusCode::BAD_REQUEST, "invalid token"),
            ApiError::UserNotFound => (StatusCode::NOT_FOUND, "user not found"),
            ApiError::AppNotFound => (StatusCode::NOT_FOUND, "app not found"),
            ApiError::UserAlreadyExists => (StatusCode::CONFLICT, "user already exists"),
            ApiError::InternalError => (StatusCode::INTERNAL_SERVER_ERROR, "internal error"),
        };

        (status, message).into_response()
    }
}
