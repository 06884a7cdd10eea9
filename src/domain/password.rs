//! Argon2 password hashes.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

use crate::config::MIN_PASSWORD_LENGTH;
use crate::errors::{AppError, AppResult};

/// A stored argon2 PHC hash. Plain text never outlives the constructor call.
#[derive(Clone, PartialEq, Eq)]
pub struct Password(String);

impl std::fmt::Debug for Password {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Password([REDACTED])")
    }
}

impl Password {
    /// Hash a password chosen through the API.
    ///
    /// # Errors
    /// [`AppError::Validation`] below `MIN_PASSWORD_LENGTH` characters.
    pub fn new(plain_text: &str) -> AppResult<Self> {
        if plain_text.chars().count() < MIN_PASSWORD_LENGTH as usize {
            return Err(AppError::validation(format!(
                "Password must be at least {} characters",
                MIN_PASSWORD_LENGTH
            )));
        }
        Self::placeholder(plain_text)
    }

    /// Hash without the length policy: the seeded administrator and the
    /// login timing dummy.
    pub fn placeholder(plain_text: &str) -> AppResult<Self> {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(plain_text.as_bytes(), &salt)
            .map(|hash| Self(hash.to_string()))
            .map_err(|e| AppError::internal(format!("password hashing failed: {}", e)))
    }

    /// Wrap a hash loaded from storage.
    pub fn from_hash(hash: String) -> Self {
        Self(hash)
    }

    pub fn into_string(self) -> String {
        self.0
    }

    /// False for a wrong password and for a stored value that is not a PHC string.
    pub fn verify(&self, plain_text: &str) -> bool {
        match PasswordHash::new(&self.0) {
            Ok(parsed) => Argon2::default()
                .verify_password(plain_text.as_bytes(), &parsed)
                .is_ok(),
            Err(e) => {
                tracing::warn!(error = %e, "stored password hash is malformed");
                false
            }
        }
    }
}
