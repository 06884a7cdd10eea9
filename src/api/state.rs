//! Application state - Dependency injection container.

use std::sync::Arc;

use axum::extract::FromRef;

use crate::auth::TokenAuthority;
use crate::infra::{ProfileStore, UserRepository};
use crate::services::{AuthService, Authenticator, UserManager, UserService};

/// Application state shared by every handler.
#[derive(Clone)]
pub struct AppState {
    /// Authentication service
    pub auth_service: Arc<dyn AuthService>,
    /// User service
    pub user_service: Arc<dyn UserService>,
    /// Token verification for the access guard
    pub tokens: TokenAuthority,
    /// User storage, pinged by the health check
    pub users: Arc<dyn UserRepository>,
}

impl AppState {
    /// Wire the services over one storage backend.
    pub fn new(
        users: Arc<dyn UserRepository>,
        profiles: Arc<dyn ProfileStore>,
        tokens: TokenAuthority,
    ) -> Self {
        Self {
            auth_service: Arc::new(Authenticator::new(users.clone(), tokens.clone())),
            user_service: Arc::new(UserManager::new(users.clone(), profiles)),
            tokens,
            users,
        }
    }
}

impl FromRef<AppState> for TokenAuthority {
    fn from_ref(state: &AppState) -> Self {
        state.tokens.clone()
    }
}
