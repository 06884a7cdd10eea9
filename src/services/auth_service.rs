//! Authentication service - Verifies credentials and issues bearer tokens.

use std::sync::Arc;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::auth::TokenAuthority;
use crate::config::TOKEN_TYPE_BEARER;
use crate::domain::Password;
use crate::errors::{AppError, AppResult};
use crate::infra::UserRepository;

/// Hash checked against when the username is unknown, so both failure paths
/// cost one argon2 verification.
static DUMMY_HASH: Lazy<Option<String>> = Lazy::new(|| {
    Password::placeholder("not-a-real-password")
        .map(Password::into_string)
        .ok()
});

/// Token response returned after successful authentication
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TokenResponse {
    /// ES384-signed bearer token
    #[schema(example = "eyJ0eXAiOiJKV1QiLCJhbGciOiJFUzM4NCJ9...")]
    pub token: String,
    /// Token type (always "Bearer")
    #[schema(example = "Bearer")]
    pub token_type: String,
    /// Token lifetime in seconds
    #[schema(example = 86400)]
    pub expires_in: i64,
}

/// Authentication service trait for dependency injection.
#[async_trait]
pub trait AuthService: Send + Sync {
    /// Check credentials and issue a token for the user.
    ///
    /// Unknown users and wrong passwords both fail with
    /// [`AppError::InvalidCredentials`].
    async fn login(&self, username: &str, password: &str) -> AppResult<TokenResponse>;
}

/// Concrete implementation of AuthService
pub struct Authenticator {
    users: Arc<dyn UserRepository>,
    tokens: TokenAuthority,
}

impl Authenticator {
    pub fn new(users: Arc<dyn UserRepository>, tokens: TokenAuthority) -> Self {
        Self { users, tokens }
    }
}

#[async_trait]
impl AuthService for Authenticator {
    async fn login(&self, username: &str, password: &str) -> AppResult<TokenResponse> {
        let user = self.users.get_user(username).await?;

        let stored_hash = match (&user, DUMMY_HASH.as_deref()) {
            (Some(user), _) => user.password_hash.as_str(),
            (None, Some(dummy)) => dummy,
            (None, None) => return Err(AppError::InvalidCredentials),
        };
        let password_valid = Password::from_hash(stored_hash.to_string()).verify(password);

        let user = match user {
            Some(user) if password_valid => user,
            _ => {
                tracing::debug!(username, "login rejected");
                return Err(AppError::InvalidCredentials);
            }
        };

        let token = self.tokens.issue(&user.username)?;
        tracing::info!(username = %user.username, "token issued");

        Ok(TokenResponse {
            token,
            token_type: TOKEN_TYPE_BEARER.to_string(),
            expires_in: self.tokens.lifetime_seconds(),
        })
    }
}

#[cfg(test)]
mod tests {
    use mockall::predicate::eq;

    use super::*;
    use crate::auth::KeyMaterial;
    use crate::domain::User;
    use crate::infra::MockUserRepository;

    fn tokens() -> TokenAuthority {
        TokenAuthority::new(
            KeyMaterial::from_pem(
                include_bytes!("../../tests/fixtures/es384_primary_private.pem"),
                include_bytes!("../../tests/fixtures/es384_primary_public.pem"),
            )
            .unwrap(),
        )
    }

    fn stored_user(username: &str, password: &str) -> User {
        User::new(
            username.to_string(),
            Password::new(password).unwrap().into_string(),
        )
    }

    #[tokio::test]
    async fn test_login_issues_verifiable_token() {
        let mut repo = MockUserRepository::new();
        repo.expect_get_user()
            .with(eq("alice"))
            .returning(|_| Ok(Some(stored_user("alice", "correct-horse"))));

        let tokens = tokens();
        let service = Authenticator::new(Arc::new(repo), tokens.clone());
        let response = service.login("alice", "correct-horse").await.unwrap();

        assert_eq!(response.token_type, "Bearer");
        assert_eq!(response.expires_in, 86400);
        assert_eq!(tokens.verify(&response.token).unwrap(), "alice");
    }

    #[tokio::test]
    async fn test_wrong_password_rejected() {
        let mut repo = MockUserRepository::new();
        repo.expect_get_user()
            .returning(|_| Ok(Some(stored_user("alice", "correct-horse"))));

        let service = Authenticator::new(Arc::new(repo), tokens());
        assert!(matches!(
            service.login("alice", "wrong-horse").await,
            Err(AppError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn test_unknown_user_rejected() {
        let mut repo = MockUserRepository::new();
        repo.expect_get_user().returning(|_| Ok(None));

        let service = Authenticator::new(Arc::new(repo), tokens());
        assert!(matches!(
            service.login("mallory", "not-a-real-password").await,
            Err(AppError::InvalidCredentials)
        ));
    }
}
