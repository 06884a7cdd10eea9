//! API middleware.

mod auth;

pub use auth::{access_guard, bearer_token, require_ownership};
