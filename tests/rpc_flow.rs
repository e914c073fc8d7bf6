//! Integration tests for the auth RPC endpoints
//!
//! Drives the full router (guards, engine, error mapping, timeout layer)
//! in-process against the in-memory store and against SQLite.

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, StatusCode},
    Router,
};
use chrono::{Duration as ChronoDuration, Utc};
use credential_authority::auth::{
    api::{self, AuthState},
    models::{App, AppId, NewUser, User, UserId, UserInfo},
    password::MIN_COST,
    AppProvider, AuthService, MemoryStore, PasswordHasher, StoreError, TokenCodec, UserProvider,
    UserSaver, UserStore,
};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tempfile::NamedTempFile;
use tower::ServiceExt;

const TTL: Duration = Duration::from_secs(3600);
const TIMEOUT: Duration = Duration::from_secs(5);

fn test_app() -> App {
    App {
        id: 1,
        name: "app1".to_string(),
        secret: "s3cr3t".to_string(),
    }
}

fn service_over<S>(store: Arc<S>) -> AuthService
where
    S: UserSaver + UserProvider + AppProvider + 'static,
{
    AuthService::new(store.clone(), store.clone(), store, TTL)
        .with_hasher(PasswordHasher::new(MIN_COST).unwrap())
}

fn create_test_router() -> Router {
    let store = Arc::new(MemoryStore::new());
    store.insert_app(test_app());
    api::router(AuthState::new(Arc::new(service_over(store))), TIMEOUT)
}

async fn call(router: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => request
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => request.body(Body::empty()).unwrap(),
    };

    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = serde_json::from_slice(&bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));
    (status, value)
}

async fn post(router: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    call(router, Method::POST, uri, Some(body)).await
}

async fn register_alice(router: &Router) -> (StatusCode, Value) {
    post(
        router,
        "/api/auth/register",
        json!({"name": "Alice", "email": "alice@x.com", "password": "pw1"}),
    )
    .await
}

async fn login_alice(router: &Router) -> String {
    let (status, body) = post(
        router,
        "/api/auth/login",
        json!({"email": "alice@x.com", "password": "pw1", "app_id": 1}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    body["token"].as_str().unwrap().to_string()
}

async fn run_full_flow(router: &Router) {
    let (status, body) = register_alice(router).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"user_id": 1}));

    let token = login_alice(router).await;
    assert!(!token.is_empty());

    let (status, body) = post(router, "/api/auth/validate", json!({"token": token})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"user_id": 1, "is_valid": true}));

    let (status, body) = call(router, Method::GET, "/api/users/1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"id": 1, "name": "Alice", "email": "alice@x.com"}));

    let (status, body) = post(router, "/api/auth/is-admin", json!({"user_id": 1})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"is_admin": false}));
}

#[tokio::test]
async fn test_full_flow_in_memory() {
    let router = create_test_router();
    run_full_flow(&router).await;
}

#[tokio::test]
async fn test_full_flow_sqlite() {
    let temp_file = NamedTempFile::new().unwrap();
    let store = Arc::new(UserStore::new(temp_file.path()).unwrap());
    store.upsert_app(&test_app()).unwrap();

    let router = api::router(AuthState::new(Arc::new(service_over(store))), TIMEOUT);
    run_full_flow(&router).await;
}

#[tokio::test]
async fn test_health() {
    let router = create_test_router();
    let (status, body) = call(&router, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!("ok"));
}

#[tokio::test]
async fn test_request_guards() {
    let router = create_test_router();

    let cases = [
        ("/api/auth/register", json!({"name": "Alice", "password": "pw1"})),
        ("/api/auth/register", json!({"email": "alice@x.com"})),
        ("/api/auth/login", json!({"password": "pw1", "app_id": 1})),
        ("/api/auth/login", json!({"email": "alice@x.com", "app_id": 1})),
        ("/api/auth/login", json!({"email": "alice@x.com", "password": "pw1", "app_id": 0})),
        ("/api/auth/is-admin", json!({"user_id": 0})),
        ("/api/auth/validate", json!({"token": ""})),
    ];

    for (uri, body) in cases {
        let (status, _) = post(&router, uri, body.clone()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri} {body}");
    }
}

#[tokio::test]
async fn test_duplicate_registration_conflicts() {
    let router = create_test_router();

    assert_eq!(register_alice(&router).await.0, StatusCode::OK);
    let (status, body) = register_alice(&router).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body, json!("user already exists"));
}

#[tokio::test]
async fn test_login_failures() {
    let router = create_test_router();
    register_alice(&router).await;

    let (wrong_pw, wrong_pw_body) = post(
        &router,
        "/api/auth/login",
        json!({"email": "alice@x.com", "password": "nope", "app_id": 1}),
    )
    .await;
    let (no_user, no_user_body) = post(
        &router,
        "/api/auth/login",
        json!({"email": "ghost@x.com", "password": "pw1", "app_id": 1}),
    )
    .await;

    // Wrong password and unknown email are indistinguishable
    assert_eq!(wrong_pw, StatusCode::BAD_REQUEST);
    assert_eq!(wrong_pw, no_user);
    assert_eq!(wrong_pw_body, no_user_body);

    let (status, body) = post(
        &router,
        "/api/auth/login",
        json!({"email": "alice@x.com", "password": "pw1", "app_id": 9}),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!("app not found"));
}

#[tokio::test]
async fn test_invalid_tokens_are_answers() {
    let router = create_test_router();
    register_alice(&router).await;

    let expired = TokenCodec::new()
        .issue_at(
            1,
            "alice@x.com",
            1,
            "s3cr3t",
            Utc::now() - ChronoDuration::hours(2),
            TTL,
        )
        .unwrap();
    let forged = TokenCodec::new()
        .issue(1, "alice@x.com", 1, "not-the-secret", TTL)
        .unwrap();

    for token in [expired.as_str(), forged.as_str(), "garbage"] {
        let (status, body) = post(&router, "/api/auth/validate", json!({"token": token})).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"user_id": 0, "is_valid": false}));
    }
}

#[tokio::test]
async fn test_unknown_user_lookups() {
    let router = create_test_router();

    let (status, body) = call(&router, Method::GET, "/api/users/42", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!("user not found"));

    let (status, _) = post(&router, "/api/auth/is-admin", json!({"user_id": 42})).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_admin_registration() {
    let router = create_test_router();

    let (_, body) = post(
        &router,
        "/api/auth/register",
        json!({"name": "Root", "email": "root@x.com", "password": "pw", "is_admin": true}),
    )
    .await;
    let user_id = body["user_id"].as_i64().unwrap();

    let (status, body) = post(&router, "/api/auth/is-admin", json!({"user_id": user_id})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"is_admin": true}));
}

/// Store whose user lookups never finish in time.
struct SlowStore {
    inner: MemoryStore,
    delay: Duration,
}

#[async_trait]
impl UserSaver for SlowStore {
    async fn save_user(&self, user: NewUser) -> Result<UserId, StoreError> {
        self.inner.save_user(user).await
    }
}

#[async_trait]
impl UserProvider for SlowStore {
    async fn user_by_email(&self, email: &str) -> Result<User, StoreError> {
        tokio::time::sleep(self.delay).await;
        self.inner.user_by_email(email).await
    }

    async fn user_by_id(&self, user_id: UserId) -> Result<UserInfo, StoreError> {
        tokio::time::sleep(self.delay).await;
        self.inner.user_by_id(user_id).await
    }

    async fn is_admin(&self, user_id: UserId) -> Result<bool, StoreError> {
        tokio::time::sleep(self.delay).await;
        self.inner.is_admin(user_id).await
    }
}

#[async_trait]
impl AppProvider for SlowStore {
    async fn app(&self, app_id: AppId) -> Result<App, StoreError> {
        self.inner.app(app_id).await
    }
}

#[tokio::test]
async fn test_request_deadline() {
    let store = Arc::new(SlowStore {
        inner: MemoryStore::new(),
        delay: Duration::from_secs(30),
    });
    let router = api::router(
        AuthState::new(Arc::new(service_over(store))),
        Duration::from_millis(50),
    );

    let (status, _) = call(&router, Method::GET, "/api/users/1", None).await;
    assert_eq!(status, StatusCode::REQUEST_TIMEOUT);

    // Health is outside the deadline layer
    let (status, _) = call(&router, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_register_timed_out_while_hashing_is_not_saved() {
    let store = Arc::new(MemoryStore::new());
    store.insert_app(test_app());
    let service = AuthService::new(store.clone(), store.clone(), store.clone(), TTL)
        .with_hasher(PasswordHasher::new(8).unwrap());
    let router = api::router(
        AuthState::new(Arc::new(service)),
        Duration::from_millis(1),
    );

    let (status, _) = register_alice(&router).await;
    assert_eq!(status, StatusCode::REQUEST_TIMEOUT);

    // Let the abandoned hash finish on the blocking pool
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert!(matches!(
        store.user_by_email("alice@x.com").await,
        Err(StoreError::NotFound)
    ));
}
