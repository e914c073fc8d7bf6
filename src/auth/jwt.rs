//! JWT Token Codec
//! Mission: Sign and verify per-app session tokens

use crate::auth::models::{AppId, UserId};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Only scheme tokens are signed with or accepted under.
pub const SIGNING_ALGORITHM: Algorithm = Algorithm::HS256;

/// JWT Claims payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub uid: UserId,
    pub email: String,
    pub app_id: AppId,
    pub exp: i64, // expiration timestamp (seconds)
}

/// Rejection for any token that fails verification. Bad signature, wrong
/// algorithm and expiry all look the same to callers.
#[derive(Debug, Error)]
#[error("invalid token")]
pub struct InvalidToken {
    #[source]
    cause: jsonwebtoken::errors::Error,
}

impl InvalidToken {
    /// Underlying rejection reason, for logs only.
    pub fn cause(&self) -> &jsonwebtoken::errors::Error {
        &self.cause
    }
}

impl From<jsonwebtoken::errors::Error> for InvalidToken {
    fn from(cause: jsonwebtoken::errors::Error) -> Self {
        Self { cause }
    }
}

/// Stateless codec; the key is supplied per call since every app signs with its own secret.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokenCodec;

impl TokenCodec {
    pub fn new() -> Self {
        Self
    }

    /// Issue a token that expires `ttl` from now.
    pub fn issue(
        &self,
        uid: UserId,
        email: &str,
        app_id: AppId,
        secret: &str,
        ttl: Duration,
    ) -> Result<String> {
        self.issue_at(uid, email, app_id, secret, Utc::now(), ttl)
    }

    pub fn issue_at(
        &self,
        uid: UserId,
        email: &str,
        app_id: AppId,
        secret: &str,
        issued_at: DateTime<Utc>,
        ttl: Duration,
    ) -> Result<String> {
        let ttl = chrono::Duration::from_std(ttl).context("Token TTL out of range")?;
        let exp = issued_at
            .checked_add_signed(ttl)
            .context("Invalid timestamp")?
            .timestamp();

        let claims = Claims {
            uid,
            email: email.to_string(),
            app_id,
            exp,
        };

        encode(
            &Header::new(SIGNING_ALGORITHM),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .context("Failed to generate JWT")
    }

    /// Check signature, algorithm and expiry under `secret` and return the claims.
    /// Expiry is exact: no clock skew is tolerated.
    pub fn verify(&self, token: &str, secret: &str) -> Result<Claims, InvalidToken> {
        let mut validation = Validation::new(SIGNING_ALGORITHM);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp"]);

        let decoded = decode::<Claims>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &validation,
        )?;

        Ok(decoded.claims)
    }

    /// App id the token claims to belong to. Nothing here is trusted; the
    /// value only selects which secret `verify` must succeed under.
    pub fn unverified_app_id(&self, token: &str) -> Result<AppId, InvalidToken> {
        let mut validation = Validation::new(SIGNING_ALGORITHM);
        validation.insecure_disable_signature_validation();
        validation.validate_exp = false;
        validation.required_spec_claims.clear();

        let decoded = decode::<Claims>(token, &DecodingKey::from_secret(&[]), &validation)?;

        Ok(decoded.claims.app_id)
    }
}
