//! Application services layer - Use cases and business logic.
//!
//! Services orchestrate domain logic and infrastructure to fulfill
//! application use cases. They depend on the storage traits, never on a
//! concrete backend.

mod auth_service;
mod user_service;

pub use auth_service::{AuthService, Authenticator, TokenResponse};
pub use user_service::{profile_key, UserManager, UserService};
