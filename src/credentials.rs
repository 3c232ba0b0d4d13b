//! Password verification against the durable user store.
//!
//! Stored digests come in two forms:
//! - Argon2 PHC strings (`$argon2id$...`), written for every new user
//! - legacy unsalted SHA-256 hex digests, accepted so existing user
//!   records keep working

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use sha2::{Digest, Sha256};
use std::sync::OnceLock;
use subtle::ConstantTimeEq;
use thiserror::Error;

use crate::storage::{DurableLog, StoreError};

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("Failed to hash password: {0}")]
    Hashing(String),
    #[error("Invalid username or password")]
    InvalidCredentials,
    #[error("Durable store unavailable: {0}")]
    PersistenceUnavailable(#[from] StoreError),
}

/// Verify `secret` for `username`. Any store failure fails closed.
pub fn verify(log: &dyn DurableLog, username: &str, secret: &str) -> Result<(), CredentialError> {
    let Some(user) = log.find_user(username)? else {
        // Unknown users cost the same hashing work as known ones
        if let Some(decoy) = decoy_digest() {
            let _ = digest_matches(decoy, secret);
        }
        tracing::debug!(username = %username, "Authentication failed: unknown user");
        return Err(CredentialError::InvalidCredentials);
    };

    if digest_matches(&user.password_digest, secret) {
        Ok(())
    } else {
        tracing::debug!(username = %username, "Authentication failed: digest mismatch");
        Err(CredentialError::InvalidCredentials)
    }
}

/// Hash a secret for storage (Argon2id, random salt)
pub fn hash_secret(secret: &str) -> Result<String, CredentialError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(secret.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| CredentialError::Hashing(e.to_string()))
}

/// Unsalted SHA-256 hex digest, the legacy storage format
pub fn legacy_digest(secret: &str) -> String {
    hex::encode(Sha256::digest(secret.as_bytes()))
}

fn digest_matches(stored: &str, secret: &str) -> bool {
    if stored.starts_with('$') {
        match PasswordHash::new(stored) {
            Ok(parsed) => Argon2::default()
                .verify_password(secret.as_bytes(), &parsed)
                .is_ok(),
            Err(e) => {
                tracing::warn!(error = %e, "Stored password hash is malformed");
                false
            }
        }
    } else {
        match hex::decode(stored) {
            Ok(expected) => {
                let actual = Sha256::digest(secret.as_bytes());
                bool::from(expected.as_slice().ct_eq(actual.as_slice()))
            }
            Err(_) => {
                tracing::warn!("Stored legacy digest is not hex");
                false
            }
        }
    }
}

fn decoy_digest() -> Option<&'static str> {
    static DECOY: OnceLock<Option<String>> = OnceLock::new();
    DECOY
        .get_or_init(|| hash_secret("enchat-decoy").ok())
        .as_deref()
}
