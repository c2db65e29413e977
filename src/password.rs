//! Password hashing using Argon2.

use argon2::{
    Argon2, PasswordHasher,
    password_hash::{PasswordHash, PasswordVerifier, SaltString, rand_core::OsRng},
};

use std::sync::OnceLock;

use crate::error::{AppError, AppResult};

// Verified against when no account matches, so a miss costs one full Argon2 run.
static ABSENT_ACCOUNT_HASH: OnceLock<Option<String>> = OnceLock::new();

/// PasswordService
///
/// Hashes and verifies credentials as PHC strings. The Argon2 work is CPU-bound,
/// so the async wrappers move it onto the blocking pool instead of stalling the
/// request executor.
#[derive(Clone, Default)]
pub struct PasswordService {
    argon2: Argon2<'static>,
}

impl PasswordService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn hash_sync(&self, password: &str) -> AppResult<String> {
        let salt = SaltString::generate(&mut OsRng);
        self.argon2
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| AppError::Internal(format!("password hashing failed: {e}")))
    }

    /// Constant-time comparison of `password` against a stored PHC hash.
    /// A malformed stored hash verifies as `false` rather than erroring, so it
    /// cannot be told apart from a wrong password.
    pub fn verify_sync(&self, password: &str, hash: &str) -> bool {
        match PasswordHash::new(hash) {
            Ok(parsed) => self
                .argon2
                .verify_password(password.as_bytes(), &parsed)
                .is_ok(),
            Err(e) => {
                tracing::warn!("stored password hash is malformed: {}", e);
                false
            }
        }
    }

    pub async fn hash(&self, password: &str) -> AppResult<String> {
        let service = self.clone();
        let password = password.to_owned();
        tokio::task::spawn_blocking(move || service.hash_sync(&password))
            .await
            .map_err(|e| AppError::Internal(format!("hashing task failed: {e}")))?
    }

    pub async fn verify(&self, password: &str, hash: &str) -> AppResult<bool> {
        let service = self.clone();
        let password = password.to_owned();
        let hash = hash.to_owned();
        tokio::task::spawn_blocking(move || service.verify_sync(&password, &hash))
            .await
            .map_err(|e| AppError::Internal(format!("verification task failed: {e}")))
    }

    /// Burns one verification against a fixed hash. Login calls this when the
    /// DNI matches no active account, so both failure paths cost the same.
    pub async fn verify_absent(&self, password: &str) -> AppResult<()> {
        let service = self.clone();
        let password = password.to_owned();
        tokio::task::spawn_blocking(move || {
            let hash = ABSENT_ACCOUNT_HASH
                .get_or_init(|| service.hash_sync("no-such-account").ok());
            if let Some(hash) = hash {
                service.verify_sync(&password, hash);
            }
        })
        .await
        .map_err(|e| AppError::Internal(format!("verification task failed: {e}")))
    }
}
