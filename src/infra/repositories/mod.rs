//! Repository layer - Data access abstraction
//!
//! [`UserRepository`] is the storage capability the services depend on.
//! Each backend provides one adapter.

pub(crate) mod entities;
mod user_repository;

pub use user_repository::{SqlUserStore, UserRepository};
pub(crate) use user_repository::{finish_page, start_after};

// Export mock for tests (both unit and integration)
#[cfg(any(test, feature = "test-utils"))]
pub use user_repository::MockUserRepository;
