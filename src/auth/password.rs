//! Password Hashing
//! Mission: One-way, salted, deliberately slow credential storage

use bcrypt::{hash, verify, BcryptError, DEFAULT_COST};
use thiserror::Error;

/// Lowest bcrypt cost accepted.
pub const MIN_COST: u32 = 4;
/// Highest bcrypt cost accepted.
pub const MAX_COST: u32 = 31;

#[derive(Debug, Error)]
pub enum HashError {
    #[error("bcrypt cost {0} outside 4..=31")]
    InvalidCost(u32),

    #[error("failed to hash password")]
    Hashing(#[source] BcryptError),

    /// Stored hash could not be parsed. Distinct from a plain mismatch.
    #[error("stored password hash is malformed")]
    Malformed(#[source] Option<BcryptError>),
}

/// bcrypt hasher with a fixed cost factor.
#[derive(Debug, Clone, Copy)]
pub struct PasswordHasher {
    cost: u32,
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self { cost: DEFAULT_COST }
    }
}

impl PasswordHasher {
    pub fn new(cost: u32) -> Result<Self, HashError> {
        if !(MIN_COST..=MAX_COST).contains(&cost) {
            return Err(HashError::InvalidCost(cost));
        }
        Ok(Self { cost })
    }

    pub fn cost(&self) -> u32 {
        self.cost
    }

    /// Hash a password with a fresh random salt.
    pub fn hash(&self, password: &str) -> Result<Vec<u8>, HashError> {
        hash(password, self.cost)
            .map(String::into_bytes)
            .map_err(HashError::Hashing)
    }

    /// `Ok(false)` on mismatch, `Err(Malformed)` when the hash itself is unusable.
    pub fn verify(&self, password_hash: &[u8], password: &str) -> Result<bool, HashError> {
        let encoded = std::str::from_utf8(password_hash).map_err(|_| HashError::Malformed(None))?;
        verify(password, encoded).map_err(|e| HashError::Malformed(Some(e)))
    }

    /// Spend one bcrypt round at this cost on `password` and drop the result.
    /// Used when there is no stored hash, so a missing account costs as much
    /// as a wrong password.
    pub fn verify_absent(&self, password: &str) {
        let _ = hash(password, self.cost);
    }
}
