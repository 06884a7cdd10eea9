//! Domain layer - Core business entities and logic
//!
//! Contains the user entity and the password value object. Nothing here
//! knows about HTTP or a particular storage backend.

pub mod password;
pub mod user;

pub use password::Password;
pub use user::{validate_username, User, UserResponse};
