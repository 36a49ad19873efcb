//! Factory credential verification.

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::models::Factory;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Unauthorized")]
    Unauthorized,
}

/// Checks a factory's credential before it may touch the queue.
#[async_trait]
pub trait CredentialVerifier: Send + Sync {
    async fn verify(&self, factory: &Factory, credential: &str) -> Result<(), AuthError>;
}

/// Hex SHA-256 of a factory password, as stored in `factories.password_hash`.
pub fn hash_password(password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Verifies the credential against the factory's stored password hash.
///
/// A factory registered without a password accepts any credential.
#[derive(Debug, Clone, Copy, Default)]
pub struct PasswordVerifier;

#[async_trait]
impl CredentialVerifier for PasswordVerifier {
    async fn verify(&self, factory: &Factory, credential: &str) -> Result<(), AuthError> {
        let Some(stored) = factory.password_hash.as_deref() else {
            return Ok(());
        };
        let offered = hash_password(credential);
        if constant_time_eq(stored.as_bytes(), offered.as_bytes()) {
            Ok(())
        } else {
            Err(AuthError::Unauthorized)
        }
    }
}
