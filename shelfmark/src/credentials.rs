//! Password hashing with bcrypt.
//!
//! Hashing and verification are CPU-bound, so both run on tokio's blocking pool and the
//! request task only awaits the result. bcrypt reads 72 bytes including a NUL terminator,
//! so passwords over [`MAX_PASSWORD_BYTES`] are refused instead of silently truncated.

use thiserror::Error;
use tokio::task::{spawn_blocking, JoinError};

pub const DEFAULT_BCRYPT_COST: u32 = 10;
pub const MAX_PASSWORD_BYTES: usize = 71;
const MIN_BCRYPT_COST: u32 = 4;
const MAX_BCRYPT_COST: u32 = 31;

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("bcrypt cost {0} is outside {MIN_BCRYPT_COST}..={MAX_BCRYPT_COST}")]
    InvalidCost(u32),
    #[error("password is {0} bytes; at most {MAX_PASSWORD_BYTES} are allowed")]
    PasswordTooLong(usize),
    #[error("password hashing failed: {0}")]
    Bcrypt(#[from] bcrypt::BcryptError),
    #[error("password hashing task failed: {0}")]
    Task(#[from] JoinError),
}

#[derive(Debug, Clone, Copy)]
pub struct PasswordHasher {
    cost: u32,
}

impl PasswordHasher {
    pub fn new(cost: u32) -> Result<Self, CredentialError> {
        if !(MIN_BCRYPT_COST..=MAX_BCRYPT_COST).contains(&cost) {
            return Err(CredentialError::InvalidCost(cost));
        }
        Ok(Self { cost })
    }

    pub fn cost(&self) -> u32 {
        self.cost
    }

    pub async fn hash(&self, plaintext: String) -> Result<String, CredentialError> {
        if plaintext.len() > MAX_PASSWORD_BYTES {
            return Err(CredentialError::PasswordTooLong(plaintext.len()));
        }
        let cost = self.cost;
        let hash = spawn_blocking(move || bcrypt::non_truncating_hash(plaintext, cost)).await??;
        Ok(hash)
    }

    /// A password longer than [`MAX_PASSWORD_BYTES`] can never have been hashed, so it never matches.
    pub async fn verify(&self, plaintext: String, hash: String) -> Result<bool, CredentialError> {
        if plaintext.len() > MAX_PASSWORD_BYTES {
            return Ok(false);
        }
        let matched =
            spawn_blocking(move || bcrypt::non_truncating_verify(plaintext, &hash)).await??;
        Ok(matched)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use anyhow::Result;

    use super::{CredentialError, PasswordHasher, MAX_PASSWORD_BYTES};

    fn hasher() -> PasswordHasher {
        PasswordHasher::new(4).unwrap()
    }

    #[tokio::test]
    async fn hash_is_salted_and_not_plaintext() -> Result<()> {
        let hasher = hasher();
        let first = hasher.hash(String::from("hunter22")).await?;
        let second = hasher.hash(String::from("hunter22")).await?;

        assert_ne!(first, "hunter22");
        assert_ne!(first, second);
        Ok(())
    }

    #[tokio::test]
    async fn verify_accepts_matching_password() -> Result<()> {
        let hasher = hasher();
        let hash = hasher.hash(String::from("hunter22")).await?;
        assert!(hasher.verify(String::from("hunter22"), hash).await?);
        Ok(())
    }

    #[tokio::test]
    async fn verify_rejects_mutated_password() -> Result<()> {
        let hasher = hasher();
        let hash = hasher.hash(String::from("hunter22")).await?;
        assert!(!hasher.verify(String::from("hunter23"), hash.clone()).await?);
        assert!(!hasher.verify(String::from("Hunter22"), hash).await?);
        Ok(())
    }

    #[tokio::test]
    async fn verify_errors_on_malformed_hash() {
        let result = hasher()
            .verify(String::from("hunter22"), String::from("not-a-hash"))
            .await;
        assert!(matches!(result, Err(CredentialError::Bcrypt(_))));
    }

    #[tokio::test]
    async fn overlong_password_is_refused_not_truncated() -> Result<()> {
        let hasher = hasher();
        let at_limit = "a".repeat(MAX_PASSWORD_BYTES);
        let hash = hasher.hash(at_limit.clone()).await?;

        let over_limit = "a".repeat(MAX_PASSWORD_BYTES + 8);
        assert!(matches!(
            hasher.hash(over_limit.clone()).await,
            Err(CredentialError::PasswordTooLong(_))
        ));
        assert!(!hasher.verify(over_limit, hash.clone()).await?);
        assert!(hasher.verify(at_limit, hash).await?);
        Ok(())
    }

    #[test]
    fn new_rejects_out_of_range_cost() {
        assert!(matches!(
            PasswordHasher::new(3),
            Err(CredentialError::InvalidCost(3))
        ));
        assert!(PasswordHasher::new(32).is_err());
        assert_eq!(PasswordHasher::new(10).unwrap().cost(), 10);
    }
}
